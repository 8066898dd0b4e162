use soapbind_xml::builder::Element;

use crate::soap::MimePart;
use crate::typecode::{ParseContext, TypeChecking, TypeCode, TypeCodeError};
use crate::{Value, ns};

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error(transparent)]
    Xml(#[from] soapbind_xml::XmlError),

    #[error("expected a SOAP 1.1 Envelope, found {{{namespace}}}{name}")]
    NotAnEnvelope { namespace: String, name: String },

    #[error("SOAP envelope has no Body")]
    MissingBody,
}

/// A received envelope, decoded into an owned element tree.
#[derive(Debug, Clone)]
pub struct ParsedSoap {
    header: Option<Element<'static>>,
    body: Element<'static>,
    attachments: Vec<MimePart>,
    checking: TypeChecking,
}

impl ParsedSoap {
    pub fn parse(xml: &str) -> Result<Self, EnvelopeError> {
        let envelope = soapbind_xml::parser::parse_element(xml)?;

        if !envelope.is_named(Some(ns::SOAP_ENV), "Envelope") {
            return Err(EnvelopeError::NotAnEnvelope {
                namespace: envelope.namespace().unwrap_or_default().to_owned(),
                name: envelope.name().to_owned(),
            });
        }

        let header = envelope
            .children()
            .find(|child| child.is_named(Some(ns::SOAP_ENV), "Header"))
            .cloned();
        let body = envelope
            .children()
            .find(|child| child.is_named(Some(ns::SOAP_ENV), "Body"))
            .cloned()
            .ok_or(EnvelopeError::MissingBody)?;

        Ok(Self {
            header,
            body,
            attachments: Vec::new(),
            checking: TypeChecking::Strict,
        })
    }

    /// MIME parts that arrived with the envelope.
    pub fn with_attachments(mut self, attachments: Vec<MimePart>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_checking(mut self, checking: TypeChecking) -> Self {
        self.checking = checking;
        self
    }

    pub fn header(&self) -> Option<&Element<'static>> {
        self.header.as_ref()
    }

    /// Child elements of the header, empty without a header.
    pub fn header_elements(&self) -> impl Iterator<Item = &Element<'static>> {
        self.header.iter().flat_map(Element::children)
    }

    /// Header element with the given namespace and local name.
    pub fn header_element(&self, namespace: &str, name: &str) -> Option<&Element<'static>> {
        self.header_elements()
            .find(|element| element.is_named(Some(namespace), name))
    }

    pub fn body(&self) -> &Element<'static> {
        &self.body
    }

    /// First element of the body.
    pub fn body_root(&self) -> Option<&Element<'static>> {
        self.body.children().next()
    }

    pub fn attachments(&self) -> &[MimePart] {
        &self.attachments
    }

    pub fn is_a_fault(&self) -> bool {
        self.body_root()
            .is_some_and(|root| root.is_named(Some(ns::SOAP_ENV), "Fault"))
    }

    pub fn context(&self) -> ParseContext<'_> {
        ParseContext::new(self.checking).with_attachments(&self.attachments)
    }

    /// Decodes the first body element with `typecode`.
    pub fn parse_body(&self, typecode: &dyn TypeCode) -> Result<Value, TypeCodeError> {
        let root = self
            .body_root()
            .ok_or_else(|| TypeCodeError::at(&self.body, "SOAP body is empty"))?;
        typecode.parse(root, &self.context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_other_documents() {
        let err = ParsedSoap::parse("<Envelope/>").unwrap_err();
        assert!(matches!(err, EnvelopeError::NotAnEnvelope { .. }));

        let err = ParsedSoap::parse(&format!(r#"<e:Envelope xmlns:e="{}"/>"#, ns::SOAP_ENV))
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingBody));
    }

    #[test]
    fn detects_faults() {
        let xml = format!(
            r#"<e:Envelope xmlns:e="{}"><e:Body><e:Fault><faultcode>e:Server</faultcode><faultstring>x</faultstring></e:Fault></e:Body></e:Envelope>"#,
            ns::SOAP_ENV
        );
        let parsed = ParsedSoap::parse(&xml).unwrap();
        assert!(parsed.is_a_fault());
        assert!(parsed.header().is_none());
        assert_eq!(parsed.header_elements().count(), 0);
    }
}
