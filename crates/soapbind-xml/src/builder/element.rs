use std::borrow::Cow;

use crate::builder::{AliasMap, Attribute, Namespace, NamespaceWrite, XmlBuilderError};

/// A piece of element content, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content<'a> {
    /// Character data, stored unescaped.
    Text(Cow<'a, str>),
    /// A child element.
    Element(Element<'a>),
    /// Pre-serialized markup written verbatim.
    Raw(Cow<'a, str>),
}

/// Represents an XML element.
///
/// The same type is produced by the builder API and by [`crate::parser::parse_element`],
/// so typecodes read and write one tree shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    /// The local name of the element.
    name: Cow<'a, str>,
    /// The namespace of the element, if qualified.
    namespace: Option<Namespace<'a>>,
    /// Namespace declarations made on this element: `(uri, prefix)`.
    namespaces_declaration: Vec<(Namespace<'a>, Option<String>)>,
    attributes: Vec<Attribute<'a>>,
    content: Vec<Content<'a>>,
    /// Path from the document root, set by the parser.
    location: Option<String>,
    /// Every `(prefix, uri)` binding in scope, set by the parser.
    in_scope: Vec<(Option<String>, String)>,
}

impl<'a> Element<'a> {
    /// Creates a new instance of `Element` with the given name.
    ///
    /// # Example
    ///
    /// ```
    /// use soapbind_xml::builder::Element;
    /// let element = Element::new("root");
    /// assert_eq!(element.name(), "root");
    /// ```
    pub fn new(name: impl Into<Cow<'a, str>>) -> Self {
        Element {
            name: name.into(),
            namespace: None,
            namespaces_declaration: Vec::new(),
            attributes: Vec::new(),
            content: Vec::new(),
            location: None,
            in_scope: Vec::new(),
        }
    }

    pub fn set_namespace(mut self, namespace: Namespace<'a>) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn set_namespace_optional(mut self, namespace: Option<Namespace<'a>>) -> Self {
        self.namespace = namespace;
        self
    }

    /// Declares `uri` on this element, bound to `alias` or as the default namespace.
    ///
    /// # Example
    ///
    /// ```
    /// use soapbind_xml::builder::{Element, Namespace};
    /// let xml = Element::new("root")
    ///     .set_namespace(Namespace::new("urn:example"))
    ///     .add_namespace_declaration("urn:example", Some("ex"))
    ///     .to_xml_string()
    ///     .unwrap();
    /// assert_eq!(xml, r#"<ex:root xmlns:ex="urn:example"/>"#);
    /// ```
    pub fn add_namespace_declaration(
        mut self,
        uri: impl Into<Cow<'a, str>>,
        alias: Option<&str>,
    ) -> Self {
        let namespace = Namespace::new(uri);
        self.namespaces_declaration
            .retain(|(declared, _)| declared != &namespace);
        self.namespaces_declaration
            .push((namespace, alias.map(str::to_owned)));
        self
    }

    pub fn add_attribute(mut self, attribute: Attribute<'a>) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn add_child(mut self, child: Element<'a>) -> Self {
        self.content.push(Content::Element(child));
        self
    }

    pub fn add_children(mut self, children: Vec<Element<'a>>) -> Self {
        self.content
            .extend(children.into_iter().map(Content::Element));
        self
    }

    /// Replaces the whole content of the element with `text`.
    pub fn set_text(mut self, text: impl Into<Cow<'a, str>>) -> Self {
        self.content = vec![Content::Text(text.into())];
        self
    }

    /// Appends character data after the existing content.
    pub fn add_text(mut self, text: impl Into<Cow<'a, str>>) -> Self {
        self.content.push(Content::Text(text.into()));
        self
    }

    /// Appends already serialized markup, written without escaping.
    pub fn add_raw(mut self, markup: impl Into<Cow<'a, str>>) -> Self {
        self.content.push(Content::Raw(markup.into()));
        self
    }

    pub fn with_text(&mut self, text: impl Into<Cow<'a, str>>) -> &mut Self {
        self.content = vec![Content::Text(text.into())];
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_ref().map(Namespace::as_str)
    }

    /// True when the element has the given local name and namespace.
    pub fn is_named(&self, namespace: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace() == namespace
    }

    pub fn attributes(&self) -> &[Attribute<'a>] {
        &self.attributes
    }

    /// Value of an unqualified attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace().is_none() && attr.name() == name)
            .map(Attribute::value)
    }

    /// Value of a namespace-qualified attribute.
    pub fn attribute_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace() == Some(namespace) && attr.name() == name)
            .map(Attribute::value)
    }

    pub fn content(&self) -> &[Content<'a>] {
        &self.content
    }

    /// Child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = &Element<'a>> {
        self.content.iter().filter_map(|content| match content {
            Content::Element(element) => Some(element),
            Content::Text(_) | Content::Raw(_) => None,
        })
    }

    /// First child element with the given local name, any namespace.
    pub fn child(&self, name: &str) -> Option<&Element<'a>> {
        self.children().find(|child| child.name() == name)
    }

    pub fn has_child_elements(&self) -> bool {
        self.children().next().is_some()
    }

    /// Concatenation of the direct character data of the element.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|content| match content {
                Content::Text(text) => Some(text.as_ref()),
                Content::Element(_) | Content::Raw(_) => None,
            })
            .collect()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub(crate) fn set_location(&mut self, location: String) {
        self.location = Some(location);
    }

    pub(crate) fn set_in_scope(&mut self, in_scope: Vec<(Option<String>, String)>) {
        self.in_scope = in_scope;
    }

    /// Namespace URI bound to `prefix` at this element (`None` is the default namespace).
    pub fn lookup_namespace(&self, prefix: Option<&str>) -> Option<&str> {
        self.namespaces_declaration
            .iter()
            .find(|(_, alias)| alias.as_deref() == prefix)
            .map(|(namespace, _)| namespace.as_str())
            .or_else(|| {
                self.in_scope
                    .iter()
                    .find(|(alias, _)| alias.as_deref() == prefix)
                    .map(|(_, uri)| uri.as_str())
            })
    }

    /// Splits a `prefix:local` value and resolves the prefix in this element's scope.
    pub fn resolve_qname<'s>(&'s self, value: &'s str) -> (Option<&'s str>, &'s str) {
        let value = value.trim();
        match value.split_once(':') {
            Some((prefix, local)) => (self.lookup_namespace(Some(prefix)), local),
            None => (self.lookup_namespace(None), value),
        }
    }

    /// Declares every in-scope binding on the element itself so that the subtree
    /// serializes on its own, outside of the document it was parsed from.
    pub fn into_detached(mut self) -> Self {
        let in_scope = std::mem::take(&mut self.in_scope);
        for (alias, uri) in &in_scope {
            if alias.as_deref() == Some("xml") {
                continue;
            }
            let already_declared = self
                .namespaces_declaration
                .iter()
                .any(|(_, declared)| declared == alias);
            if !already_declared {
                self.namespaces_declaration
                    .push((Namespace::new(Cow::Owned(uri.clone())), alias.clone()));
            }
        }
        self.in_scope = in_scope;
        self
    }

    pub fn into_owned(self) -> Element<'static> {
        Element {
            name: Cow::Owned(self.name.into_owned()),
            namespace: self.namespace.map(Namespace::into_owned),
            namespaces_declaration: self
                .namespaces_declaration
                .into_iter()
                .map(|(namespace, alias)| (namespace.into_owned(), alias))
                .collect(),
            attributes: self
                .attributes
                .into_iter()
                .map(Attribute::into_owned)
                .collect(),
            content: self
                .content
                .into_iter()
                .map(|content| match content {
                    Content::Text(text) => Content::Text(Cow::Owned(text.into_owned())),
                    Content::Element(element) => Content::Element(element.into_owned()),
                    Content::Raw(raw) => Content::Raw(Cow::Owned(raw.into_owned())),
                })
                .collect(),
            location: self.location,
            in_scope: self.in_scope,
        }
    }

    /// Serializes the element using only the namespaces it declares itself.
    pub fn to_xml_string(&self) -> Result<String, XmlBuilderError> {
        let mut buf = Vec::new();
        self.ns_write(&mut buf, None)?;
        Ok(String::from_utf8(buf)?)
    }
}

impl<'a> NamespaceWrite<'a> for Element<'a> {
    fn ns_write<W: std::io::Write>(
        &self,
        w: &mut W,
        aliases: Option<&AliasMap<'a>>,
    ) -> Result<(), XmlBuilderError> {
        let scoped;
        let aliases = if self.namespaces_declaration.is_empty() {
            aliases
        } else {
            let mut map = aliases.cloned().unwrap_or_default();
            for (namespace, alias) in &self.namespaces_declaration {
                map.insert(namespace.clone(), alias.clone());
            }
            scoped = map;
            Some(&scoped)
        };

        let name = match &self.namespace {
            None => self.name.to_string(),
            Some(namespace) => match aliases.and_then(|map| map.get(namespace)) {
                Some(Some(alias)) => format!("{alias}:{}", self.name),
                Some(None) => self.name.to_string(),
                None => {
                    return Err(XmlBuilderError::NamespaceNotDeclared {
                        tag: self.name.to_string(),
                        ns: namespace.to_string(),
                    });
                }
            },
        };

        write!(w, "<{name}")?;

        for (namespace, alias) in &self.namespaces_declaration {
            let url = crate::escape(namespace.as_str());
            match alias {
                Some(alias) => write!(w, " xmlns:{alias}=\"{url}\"")?,
                None => write!(w, " xmlns=\"{url}\"")?,
            }
        }

        for attribute in &self.attributes {
            attribute.ns_write(w, aliases)?;
        }

        if self.content.is_empty() {
            write!(w, "/>")?;
            return Ok(());
        }

        write!(w, ">")?;
        for content in &self.content {
            match content {
                Content::Text(text) => w.write_all(crate::escape(text).as_bytes())?,
                Content::Raw(raw) => w.write_all(raw.as_bytes())?,
                Content::Element(child) => child.ns_write(w, aliases)?,
            }
        }
        write!(w, "</{name}>")?;

        Ok(())
    }
}
