use std::borrow::Cow;

use crate::builder::{AliasMap, Namespace, NamespaceWrite, XmlBuilderError};

/// Represents an XML attribute with a name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// The local name of the attribute.
    name: Cow<'a, str>,
    /// The unescaped value of the attribute.
    value: Cow<'a, str>,

    namespace: Option<Namespace<'a>>,
}

impl<'a> Attribute<'a> {
    /// Creates a new instance of `Attribute`.
    ///
    /// # Example
    ///
    /// ```
    /// use soapbind_xml::builder::Attribute;
    /// let attribute = Attribute::new("name", "value");
    /// assert_eq!(attribute.value(), "value");
    /// ```
    pub fn new(name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
            namespace: None,
        }
    }

    pub fn new_with_namespace(
        name: impl Into<Cow<'a, str>>,
        value: impl Into<Cow<'a, str>>,
        namespace: Option<Namespace<'a>>,
    ) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
            namespace,
        }
    }

    pub fn set_namespace(mut self, namespace: Namespace<'a>) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_ref().map(Namespace::as_str)
    }

    pub fn into_owned(self) -> Attribute<'static> {
        Attribute {
            name: Cow::Owned(self.name.into_owned()),
            value: Cow::Owned(self.value.into_owned()),
            namespace: self.namespace.map(Namespace::into_owned),
        }
    }
}

impl<'a> NamespaceWrite<'a> for Attribute<'a> {
    /// Writes the attribute as ` prefix:name="value"`.
    ///
    /// Unprefixed attributes never pick up the default namespace, so a namespaced
    /// attribute needs a declared, non-empty alias.
    fn ns_write<W: std::io::Write>(
        &self,
        w: &mut W,
        aliases: Option<&AliasMap<'a>>,
    ) -> Result<(), XmlBuilderError> {
        let value = crate::escape(&self.value);

        let Some(namespace) = &self.namespace else {
            write!(w, " {}=\"{}\"", self.name, value)?;
            return Ok(());
        };

        let alias = aliases.and_then(|map| map.get(namespace)).ok_or_else(|| {
            XmlBuilderError::MissingAliasMapForAttribute {
                attr: self.name.to_string(),
                ns: namespace.to_string(),
            }
        })?;

        match alias {
            Some(alias) => write!(w, " {}:{}=\"{}\"", alias, self.name, value)?,
            None => {
                return Err(XmlBuilderError::NamespaceHasNoAlias {
                    tag: self.name.to_string(),
                    ns: namespace.to_string(),
                });
            }
        }

        Ok(())
    }
}
