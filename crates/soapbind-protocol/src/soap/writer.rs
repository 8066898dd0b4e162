use soapbind_xml::builder::{Attribute, Builder, Content, Declaration, Element, Namespace};
use uuid::Uuid;

use crate::soap::mime::{self, MimePart};
use crate::typecode::{TypeChecking, TypeCode, TypeCodeError, TypedObject};
use crate::{QName, Value, ns};

/// `Content-Type` of a plain SOAP 1.1 request.
pub const TEXT_XML_UTF8: &str = r#"text/xml; charset="utf-8""#;

/// A request ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub body: Vec<u8>,
    pub content_type: String,
    /// MIME boundary, when the message is `multipart/related`.
    pub boundary: Option<String>,
    /// Content id of the root part, when the message is `multipart/related`.
    pub start_cid: Option<String>,
}

/// Accumulates header and body elements and renders the envelope.
///
/// The writer owns the namespace prefixes: every namespace used through
/// [`SoapWriter::element`], [`SoapWriter::attribute`] or [`SoapWriter::qualified`] is
/// declared once on the `Envelope` element.
#[derive(Debug, Clone)]
pub struct SoapWriter {
    /// `(prefix, uri)` in declaration order.
    namespaces: Vec<(String, String)>,
    /// Caller supplied `(prefix, uri)` preferences.
    preferred: Vec<(String, String)>,
    header: Vec<Element<'static>>,
    body: Vec<Element<'static>>,
    attachments: Vec<MimePart>,
    encoding_style: Option<String>,
    checking: TypeChecking,
    next_prefix: usize,
}

impl SoapWriter {
    pub fn new(checking: TypeChecking) -> Self {
        let mut writer = Self {
            namespaces: Vec::new(),
            preferred: Vec::new(),
            header: Vec::new(),
            body: Vec::new(),
            attachments: Vec::new(),
            encoding_style: None,
            checking,
            next_prefix: 0,
        };
        writer.prefix_for(ns::SOAP_ENV);
        writer
    }

    /// Sets `soapenv:encodingStyle`. Simple typecodes annotate their output with
    /// `xsi:type` while a style is set.
    pub fn with_encoding_style(mut self, encoding_style: Option<String>) -> Self {
        self.encoding_style = encoding_style;
        self
    }

    /// Prefixes to use for the given namespaces, as `(prefix, uri)` pairs.
    pub fn with_namespaces<I, P, U>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = (P, U)>,
        P: Into<String>,
        U: Into<String>,
    {
        self.preferred
            .extend(namespaces.into_iter().map(|(p, u)| (p.into(), u.into())));
        self
    }

    pub fn checking(&self) -> TypeChecking {
        self.checking
    }

    pub fn is_typed(&self) -> bool {
        self.encoding_style.is_some()
    }

    pub fn encoding_style(&self) -> Option<&str> {
        self.encoding_style.as_deref()
    }

    fn prefix_taken(&self, prefix: &str) -> bool {
        self.namespaces.iter().any(|(p, _)| p == prefix)
    }

    /// Prefix bound to `uri`, declaring it on first use.
    pub fn prefix_for(&mut self, uri: &str) -> String {
        if let Some((prefix, _)) = self.namespaces.iter().find(|(_, u)| u == uri) {
            return prefix.clone();
        }

        let candidate = self
            .preferred
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.clone())
            .or_else(|| {
                ns::PREFERRED_PREFIXES
                    .iter()
                    .find(|(u, _)| *u == uri)
                    .map(|(_, p)| (*p).to_owned())
            });

        let prefix = match candidate {
            Some(prefix) if !self.prefix_taken(&prefix) => prefix,
            _ => loop {
                self.next_prefix += 1;
                let prefix = format!("ns{}", self.next_prefix);
                if !self.prefix_taken(&prefix) {
                    break prefix;
                }
            },
        };

        self.namespaces.push((prefix.clone(), uri.to_owned()));
        prefix
    }

    /// `prefix:local` text for QName-valued content such as `xsi:type`.
    pub fn qualified(&mut self, name: &QName) -> String {
        match &name.namespace {
            Some(namespace) => format!("{}:{}", self.prefix_for(namespace), name.local),
            None => name.local.clone(),
        }
    }

    /// An empty element called `name`.
    pub fn element(&mut self, name: &QName) -> Element<'static> {
        let element = Element::new(name.local.clone());
        match &name.namespace {
            Some(namespace) => {
                self.prefix_for(namespace);
                element.set_namespace(Namespace::new(namespace.clone()))
            }
            None => element,
        }
    }

    pub fn attribute(
        &mut self,
        namespace: &str,
        name: &str,
        value: impl Into<String>,
    ) -> Attribute<'static> {
        self.prefix_for(namespace);
        Attribute::new(name.to_owned(), value.into())
            .set_namespace(Namespace::new(namespace.to_owned()))
    }

    /// `xsi:type="prefix:local"`.
    pub fn type_attribute(&mut self, type_name: &QName) -> Attribute<'static> {
        let value = self.qualified(type_name);
        self.attribute(ns::XSI, "type", value)
    }

    /// Serializes `value` with `typecode` into the body.
    pub fn serialize(
        &mut self,
        value: &Value,
        typecode: &dyn TypeCode,
        name: &QName,
    ) -> Result<(), TypeCodeError> {
        let element = typecode.serialize(value, name, self)?;
        self.body.push(element);
        Ok(())
    }

    pub fn serialize_typed(&mut self, object: &TypedObject) -> Result<(), TypeCodeError> {
        let element = object.serialize(self)?;
        self.body.push(element);
        Ok(())
    }

    /// Serializes `value` with `typecode` into the header.
    pub fn serialize_header(
        &mut self,
        value: &Value,
        typecode: &dyn TypeCode,
        name: &QName,
    ) -> Result<(), TypeCodeError> {
        let element = typecode.serialize(value, name, self)?;
        self.header.push(element);
        Ok(())
    }

    /// Adds a prebuilt header element; its namespaces are declared on the envelope.
    pub fn add_header_element(&mut self, element: Element<'static>) {
        self.register_namespaces(&element);
        self.header.push(element);
    }

    /// Adds a prebuilt body element; its namespaces are declared on the envelope.
    pub fn add_body_element(&mut self, element: Element<'static>) {
        self.register_namespaces(&element);
        self.body.push(element);
    }

    fn register_namespaces(&mut self, element: &Element<'_>) {
        if let Some(namespace) = element.namespace() {
            self.prefix_for(namespace);
        }
        for attribute in element.attributes() {
            if let Some(namespace) = attribute.namespace() {
                self.prefix_for(namespace);
            }
        }
        for content in element.content() {
            if let Content::Element(child) = content {
                self.register_namespaces(child);
            }
        }
    }

    /// Queues `data` as a MIME part and returns its content id.
    pub fn add_attachment(&mut self, data: Vec<u8>, content_type: &str) -> String {
        let content_id = format!("{}@soapbind", Uuid::new_v4());
        self.attachments.push(MimePart {
            content_id: content_id.clone(),
            content_type: content_type.to_owned(),
            data,
        });
        content_id
    }

    pub fn attachments(&self) -> &[MimePart] {
        &self.attachments
    }

    pub fn body_elements(&self) -> &[Element<'static>] {
        &self.body
    }

    pub fn header_elements(&self) -> &[Element<'static>] {
        &self.header
    }

    fn envelope_element(&self) -> Element<'static> {
        let mut envelope = Element::new("Envelope").set_namespace(Namespace::new(ns::SOAP_ENV));
        for (prefix, uri) in &self.namespaces {
            envelope = envelope.add_namespace_declaration(uri.clone(), Some(prefix.as_str()));
        }

        if let Some(style) = &self.encoding_style {
            envelope = envelope.add_attribute(
                Attribute::new("encodingStyle", style.clone())
                    .set_namespace(Namespace::new(ns::SOAP_ENV)),
            );
        }

        if !self.header.is_empty() {
            envelope = envelope.add_child(
                Element::new("Header")
                    .set_namespace(Namespace::new(ns::SOAP_ENV))
                    .add_children(self.header.clone()),
            );
        }

        envelope.add_child(
            Element::new("Body")
                .set_namespace(Namespace::new(ns::SOAP_ENV))
                .add_children(self.body.clone()),
        )
    }

    /// The envelope as an XML document.
    pub fn envelope(&self) -> Result<String, TypeCodeError> {
        Builder::new(
            Some(Declaration::new("1.0", "utf-8")),
            self.envelope_element(),
        )
        .to_xml_string()
        .map_err(|e| TypeCodeError::Xml(e.to_string()))
    }

    /// Renders the envelope and frames it with the queued attachments, if any.
    pub fn into_message(self) -> Result<OutboundMessage, TypeCodeError> {
        let envelope = self.envelope()?;

        if self.attachments.is_empty() {
            return Ok(OutboundMessage {
                body: envelope.into_bytes(),
                content_type: TEXT_XML_UTF8.to_owned(),
                boundary: None,
                start_cid: None,
            });
        }

        let boundary = format!("uuid:{}", Uuid::new_v4());
        let start_cid = format!("{}@soapbind", Uuid::new_v4());
        let body = mime::encode(&boundary, &start_cid, envelope.as_bytes(), &self.attachments);
        let content_type = format!(
            r#"multipart/related; boundary="{boundary}"; start="<{start_cid}>"; type="text/xml""#
        );

        Ok(OutboundMessage {
            body,
            content_type,
            boundary: Some(boundary),
            start_cid: Some(start_cid),
        })
    }
}

impl std::fmt::Display for SoapWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let envelope = self.envelope().map_err(|_| std::fmt::Error)?;
        f.write_str(&envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typecode::{AttachmentRef, XsdInt, XsdString};

    #[test]
    fn empty_envelope_declares_only_soapenv() {
        let sw = SoapWriter::new(TypeChecking::Strict);
        assert_eq!(
            sw.envelope().unwrap(),
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                "\n",
                r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body/></soapenv:Envelope>"#
            )
        );
    }

    #[test]
    fn body_namespaces_get_prefixes() {
        let mut sw = SoapWriter::new(TypeChecking::Strict)
            .with_namespaces([("calc", "urn:calc")])
            .with_encoding_style(Some(ns::SOAP_ENC.to_owned()));
        sw.serialize(&Value::from(4), &XsdInt::new(), &QName::new("urn:calc", "a"))
            .unwrap();
        sw.serialize(&Value::from("x"), &XsdString::new(), &QName::new("urn:other", "b"))
            .unwrap();

        let xml = sw.envelope().unwrap();
        assert!(xml.contains(r#"xmlns:calc="urn:calc""#));
        assert!(xml.contains(r#"xmlns:ns1="urn:other""#));
        assert!(xml.contains(r#"soapenv:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/""#));
        assert!(xml.contains(r#"<calc:a xsi:type="xsd:int">4</calc:a>"#));
        assert!(xml.contains(r#"<ns1:b xsi:type="xsd:string">x</ns1:b>"#));
    }

    #[test]
    fn taken_preferred_prefix_falls_back() {
        let mut sw = SoapWriter::new(TypeChecking::Strict);
        assert_eq!(sw.prefix_for(ns::WSA_2004), "wsa");
        assert_eq!(sw.prefix_for(ns::WSA_2005), "ns1");
        assert_eq!(sw.prefix_for(ns::WSA_2004), "wsa");
    }

    #[test]
    fn plain_message_is_text_xml() {
        let message = SoapWriter::new(TypeChecking::Strict).into_message().unwrap();
        assert_eq!(message.content_type, r#"text/xml; charset="utf-8""#);
        assert!(message.boundary.is_none());
    }

    #[test]
    fn attachments_switch_to_multipart() {
        let mut sw = SoapWriter::new(TypeChecking::Strict);
        sw.serialize(
            &Value::Bytes(b"payload".to_vec()),
            &AttachmentRef::new(),
            &QName::local("file"),
        )
        .unwrap();
        let content_id = sw.attachments()[0].content_id.clone();
        let message = sw.into_message().unwrap();

        let boundary = message.boundary.clone().unwrap();
        let start = message.start_cid.clone().unwrap();
        assert_eq!(
            message.content_type,
            format!(r#"multipart/related; boundary="{boundary}"; start="<{start}>"; type="text/xml""#)
        );

        let decoded = mime::decode(&message.content_type, &message.body).unwrap();
        let root = String::from_utf8(decoded.root.data).unwrap();
        assert!(root.contains(&format!(r#"<file href="cid:{content_id}"/>"#)));
        assert_eq!(decoded.attachments[0].data, b"payload");
    }
}
