use core::fmt;
use std::borrow::Cow;
use std::hash::Hash;

/// Represents a namespace in XML, identified by its URI only.
///
/// Prefixes are a serialization concern and live in the alias map of the writer.
#[derive(Debug, Clone, Eq)]
pub struct Namespace<'a> {
    pub url: Cow<'a, str>,
}

impl PartialEq for Namespace<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl fmt::Display for Namespace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

impl Hash for Namespace<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl<'a> Namespace<'a> {
    /// Creates a new instance of `Namespace` with the given URI.
    ///
    /// # Example
    ///
    /// ```
    /// use soapbind_xml::builder::Namespace;
    /// let namespace = Namespace::new("http://example.com");
    /// assert_eq!(namespace.as_str(), "http://example.com");
    /// ```
    pub fn new(uri: impl Into<Cow<'a, str>>) -> Self {
        Namespace { url: uri.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn into_owned(self) -> Namespace<'static> {
        Namespace {
            url: Cow::Owned(self.url.into_owned()),
        }
    }
}

impl<'a> From<&'a str> for Namespace<'a> {
    fn from(uri: &'a str) -> Self {
        Namespace::new(uri)
    }
}

impl From<String> for Namespace<'static> {
    fn from(uri: String) -> Self {
        Namespace::new(uri)
    }
}
