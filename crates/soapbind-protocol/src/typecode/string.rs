use soapbind_xml::builder::Element;

use crate::soap::SoapWriter;
use crate::typecode::{
    ParseContext, TypeChecking, TypeCode, TypeCodeError, check_type, is_nil, nil_element,
    numbers::format_float, simple_element, simple_text, wrong_kind,
};
use crate::{NativeKind, QName, Value, ns};

/// `xsd:string`. Text is kept verbatim, whitespace included.
#[derive(Debug, Clone)]
pub struct XsdString {
    type_name: QName,
    parse_list: Vec<String>,
}

impl XsdString {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for XsdString {
    fn default() -> Self {
        Self {
            type_name: QName::new(ns::XSD, "string"),
            parse_list: vec!["string".to_owned()],
        }
    }
}

impl TypeCode for XsdString {
    fn type_name(&self) -> &QName {
        &self.type_name
    }

    fn parse_list(&self) -> &[String] {
        &self.parse_list
    }

    fn serial_list(&self) -> &[NativeKind] {
        &[NativeKind::Str]
    }

    fn parse(&self, element: &Element<'_>, _ctx: &ParseContext<'_>) -> Result<Value, TypeCodeError> {
        if is_nil(element) {
            return Ok(Value::Nil);
        }
        check_type(self, element)?;
        simple_text(self, element).map(Value::Str)
    }

    fn serialize(
        &self,
        value: &Value,
        name: &QName,
        sw: &mut SoapWriter,
    ) -> Result<Element<'static>, TypeCodeError> {
        let text = match (value, sw.checking()) {
            (Value::Nil, _) => return Ok(nil_element(name, sw)),
            (Value::Str(text), _) => text.clone(),
            (Value::Int(v), TypeChecking::Lenient) => v.to_string(),
            (Value::BigInt(v), TypeChecking::Lenient) => v.to_string(),
            (Value::Float(v), TypeChecking::Lenient) => format_float(*v),
            _ => return Err(wrong_kind(self, value)),
        };

        Ok(simple_element(self, text, name, sw))
    }
}
