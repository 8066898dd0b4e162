use soapbind_xml::builder::{Attribute, Element};

use crate::soap::SoapWriter;
use crate::typecode::{ParseContext, TypeCode, TypeCodeError, is_nil, nil_element, wrong_kind};
use crate::{NativeKind, QName, Value, ns};

/// Binary content carried as a MIME part and referenced with `href="cid:…"`.
#[derive(Debug, Clone)]
pub struct AttachmentRef {
    type_name: QName,
    content_type: String,
}

impl AttachmentRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type announced for the MIME part.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl Default for AttachmentRef {
    fn default() -> Self {
        Self {
            type_name: QName::new(ns::ZSI, "Attachment"),
            content_type: "application/octet-stream".to_owned(),
        }
    }
}

impl TypeCode for AttachmentRef {
    fn type_name(&self) -> &QName {
        &self.type_name
    }

    fn parse_list(&self) -> &[String] {
        &[]
    }

    fn serial_list(&self) -> &[NativeKind] {
        &[NativeKind::Bytes]
    }

    fn parse(&self, element: &Element<'_>, ctx: &ParseContext<'_>) -> Result<Value, TypeCodeError> {
        if is_nil(element) {
            return Ok(Value::Nil);
        }

        let href = element
            .attribute("href")
            .ok_or_else(|| TypeCodeError::at(element, "attachment reference without href"))?;
        let content_id = href.trim().strip_prefix("cid:").ok_or_else(|| {
            TypeCodeError::at(element, format!("attachment href {href:?} is not a cid: URL"))
        })?;

        ctx.attachments
            .iter()
            .find(|part| part.content_id == content_id)
            .map(|part| Value::Bytes(part.data.clone()))
            .ok_or_else(|| TypeCodeError::at(element, format!("no MIME part with content id {content_id:?}")))
    }

    fn serialize(
        &self,
        value: &Value,
        name: &QName,
        sw: &mut SoapWriter,
    ) -> Result<Element<'static>, TypeCodeError> {
        let data = match value {
            Value::Nil => return Ok(nil_element(name, sw)),
            Value::Bytes(data) => data.clone(),
            _ => return Err(wrong_kind(self, value)),
        };

        let content_id = sw.add_attachment(data, &self.content_type);
        Ok(sw
            .element(name)
            .add_attribute(Attribute::new("href", format!("cid:{content_id}"))))
    }
}
