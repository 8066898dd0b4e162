//! Namespace-aware XML writer.
//!
//! Elements carry namespace URIs; prefixes come from declarations made on the element
//! or one of its ancestors and are resolved while writing.
mod attribute;
mod document;
mod declaration;
mod element;
mod namespace;

use std::collections::HashMap;

pub use self::attribute::*;
pub use self::document::*;
pub use self::declaration::*;
pub use self::element::*;
pub use self::namespace::*;

/// Namespace URI to prefix. `None` binds the default namespace.
pub type AliasMap<'a> = HashMap<Namespace<'a>, Option<String>>;

#[derive(Debug, thiserror::Error)]
pub enum XmlBuilderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
    #[error("Missing alias map for element '{tag}' in namespace '{ns}'")]
    MissingAliasMapForElement { tag: String, ns: String },
    #[error("Missing alias map for attribute '{attr}' in namespace '{ns}'")]
    MissingAliasMapForAttribute { attr: String, ns: String },
    #[error("Namespace '{ns}' not declared for tag '{tag}'")]
    NamespaceNotDeclared { tag: String, ns: String },
    #[error("Namespace '{ns}' has no alias for tag '{tag}'")]
    NamespaceHasNoAlias { tag: String, ns: String },
}

pub trait NamespaceWrite<'a> {
    fn ns_write<W: std::io::Write>(
        &self,
        w: &mut W,
        aliases: Option<&AliasMap<'a>>,
    ) -> Result<(), XmlBuilderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! compare_xml {
        ($left:expr, $right:expr) => {{
            let normalize = |s: &str| s.replace('\n', "");
            assert_eq!(normalize($left), normalize($right));
        }};
    }

    #[test]
    fn test_simple_xml() {
        let element = Element::new("root");

        let builder = Builder::new(None, element);
        let xml_string = builder.to_xml_string().unwrap();
        compare_xml!(&xml_string, "<root/>");
    }

    #[test]
    fn test_xml_with_attributes() {
        let element = Element::new("root").add_attribute(Attribute::new("attr1", "value1"));

        let xml_string = Builder::new(None, element).to_xml_string().unwrap();
        compare_xml!(&xml_string, r#"<root attr1="value1"/>"#);
    }

    #[test]
    fn test_xml_with_child_elements() {
        let element = Element::new("root").add_child(Element::new("child"));

        let xml_string = Builder::new(None, element).to_xml_string().unwrap();
        compare_xml!(&xml_string, "<root><child/></root>");
    }

    #[test]
    fn test_envelope_with_declaration() {
        let declaration = Declaration::new("1.0", "utf-8");
        let body = Element::new("Body")
            .set_namespace(Namespace::new("http://schemas.xmlsoap.org/soap/envelope/"))
            .add_child(
                Element::new("echo")
                    .set_namespace(Namespace::new("urn:echo"))
                    .set_text("hi"),
            );
        let envelope = Element::new("Envelope")
            .set_namespace(Namespace::new("http://schemas.xmlsoap.org/soap/envelope/"))
            .add_namespace_declaration("http://schemas.xmlsoap.org/soap/envelope/", Some("soapenv"))
            .add_namespace_declaration("urn:echo", Some("ns1"))
            .add_child(body);

        let xml_string = Builder::new(Some(declaration), envelope)
            .to_xml_string()
            .unwrap();
        assert_eq!(
            xml_string,
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                "\n",
                r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ns1="urn:echo">"#,
                r#"<soapenv:Body><ns1:echo>hi</ns1:echo></soapenv:Body></soapenv:Envelope>"#
            )
        );
    }

    #[test]
    fn test_text_is_escaped_and_raw_is_not() {
        let element = Element::new("root")
            .add_text("a < b & c")
            .add_raw("<inner/>");

        let xml_string = element.to_xml_string().unwrap();
        assert_eq!(xml_string, "<root>a &lt; b &amp; c<inner/></root>");
    }

    #[test]
    fn test_setting_text_overwrites_children() {
        let element = Element::new("container")
            .add_child(Element::new("item"))
            .set_text("New text");

        let xml_string = Builder::new(None, element).to_xml_string().unwrap();
        assert_eq!(xml_string, "<container>New text</container>");
    }

    #[test]
    fn test_with_text_on_mutable_reference() {
        let mut element = Element::new("test");
        element.with_text(String::from("Owned mutable text"));

        assert_eq!(
            element.to_xml_string().unwrap(),
            "<test>Owned mutable text</test>"
        );
    }

    #[test]
    fn test_default_namespace_has_no_prefix() {
        let element = Element::new("root")
            .set_namespace(Namespace::new("urn:default"))
            .add_namespace_declaration("urn:default", None)
            .add_child(Element::new("child").set_namespace(Namespace::new("urn:default")));

        compare_xml!(
            &element.to_xml_string().unwrap(),
            r#"<root xmlns="urn:default"><child/></root>"#
        );
    }

    #[test]
    fn test_undeclared_namespace_is_an_error() {
        let element = Element::new("root").set_namespace(Namespace::new("urn:missing"));

        let err = element.to_xml_string().unwrap_err();
        assert!(matches!(err, XmlBuilderError::NamespaceNotDeclared { .. }));
    }

    #[test]
    fn test_attribute_with_namespace() {
        let attr = Attribute::new_with_namespace("attr", "value", Some(Namespace::new("http://example.com")));
        let element = Element::new("test")
            .add_attribute(attr)
            .add_namespace_declaration("http://example.com", Some("ex"));

        compare_xml!(
            &element.to_xml_string().unwrap(),
            r#"<test xmlns:ex="http://example.com" ex:attr="value"/>"#
        );
    }

    #[test]
    fn test_namespaced_attribute_needs_prefix() {
        let attr = Attribute::new("attr", "value").set_namespace(Namespace::new("urn:default"));
        let element = Element::new("test")
            .add_attribute(attr)
            .add_namespace_declaration("urn:default", None);

        let err = element.to_xml_string().unwrap_err();
        assert!(matches!(err, XmlBuilderError::NamespaceHasNoAlias { .. }));
    }

    #[test]
    fn test_child_declaration_shadows_parent() {
        let child = Element::new("child")
            .set_namespace(Namespace::new("urn:a"))
            .add_namespace_declaration("urn:a", Some("inner"));
        let element = Element::new("root")
            .set_namespace(Namespace::new("urn:a"))
            .add_namespace_declaration("urn:a", Some("outer"))
            .add_child(child);

        compare_xml!(
            &element.to_xml_string().unwrap(),
            r#"<outer:root xmlns:outer="urn:a"><inner:child xmlns:inner="urn:a"/></outer:root>"#
        );
    }

    #[test]
    fn test_namespace_equality_and_hash() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Namespace::new("http://example.com"), "value1");

        assert_eq!(map.get(&Namespace::from("http://example.com")), Some(&"value1"));
        assert_ne!(Namespace::new("http://example.com"), Namespace::new("http://different.com"));
    }

    #[test]
    fn test_declaration_with_standalone() {
        let declaration = Declaration::new("1.0", "UTF-8").with_standalone(false);
        assert_eq!(
            format!("{declaration}"),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#
        );
    }

    #[test]
    fn test_element_accessors() {
        let element = Element::new("root")
            .add_attribute(Attribute::new("id", "7"))
            .add_child(Element::new("first").set_text("1"))
            .add_text("  tail ")
            .add_child(Element::new("second"));

        assert_eq!(element.attribute("id"), Some("7"));
        assert_eq!(element.attribute("missing"), None);
        assert_eq!(element.children().count(), 2);
        assert_eq!(element.child("first").map(Element::text), Some("1".to_owned()));
        assert_eq!(element.text(), "  tail ");
        assert!(element.has_child_elements());
    }
}
