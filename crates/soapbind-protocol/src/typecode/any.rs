use soapbind_xml::builder::Element;
use tracing::debug;

use crate::soap::SoapWriter;
use crate::typecode::{
    AttachmentRef, ParseContext, TypeCode, TypeCodeError, is_nil, nil_element, registry, wrong_kind,
    xsi_type,
};
use crate::{NativeKind, QName, Value, ns};

/// Dynamically typed content.
///
/// Parsing follows `xsi:type` when it names a known simple type and otherwise decodes
/// the element structurally: child elements become a struct (or a list with
/// [`AnyType::as_list`]), plain text becomes a string. Serialization picks the typecode
/// from the native kind of the value and always annotates scalars with `xsi:type`.
#[derive(Debug, Clone)]
pub struct AnyType {
    type_name: QName,
    aslist: bool,
}

impl AnyType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes elements with children as [`Value::List`] instead of [`Value::Struct`].
    pub fn as_list() -> Self {
        Self {
            aslist: true,
            ..Self::default()
        }
    }

    fn parse_items(&self, element: &Element<'_>, ctx: &ParseContext<'_>) -> Result<Value, TypeCodeError> {
        let item = Self::new();
        element
            .children()
            .map(|child| item.parse(child, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }
}

impl Default for AnyType {
    fn default() -> Self {
        Self {
            type_name: QName::new(ns::XSD, "anyType"),
            aslist: false,
        }
    }
}

impl TypeCode for AnyType {
    fn type_name(&self) -> &QName {
        &self.type_name
    }

    fn parse_list(&self) -> &[String] {
        &[]
    }

    fn serial_list(&self) -> &[NativeKind] {
        &[]
    }

    fn parse(&self, element: &Element<'_>, ctx: &ParseContext<'_>) -> Result<Value, TypeCodeError> {
        if is_nil(element) {
            return Ok(Value::Nil);
        }

        if let Some((namespace, local)) = xsi_type(element) {
            if local == "Array" && namespace.is_none_or(|n| n == ns::SOAP_ENC) {
                return self.parse_items(element, ctx);
            }
            if let Some(tc) = registry().for_type(namespace, local) {
                return tc.parse(element, ctx);
            }
            debug!(xsi_type = local, "unknown xsi:type, decoding structurally");
        }

        if element.attribute_ns(ns::SOAP_ENC, "arrayType").is_some() {
            return self.parse_items(element, ctx);
        }

        if element
            .attribute("href")
            .is_some_and(|href| href.trim().starts_with("cid:"))
        {
            return AttachmentRef::new().parse(element, ctx);
        }

        if !element.has_child_elements() {
            return Ok(Value::Str(element.text()));
        }

        if self.aslist {
            return self.parse_items(element, ctx);
        }

        let member = Self::new();
        element
            .children()
            .map(|child| -> Result<(String, Value), TypeCodeError> {
                Ok((child.name().to_owned(), member.parse(child, ctx)?))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Struct)
    }

    fn serialize(
        &self,
        value: &Value,
        name: &QName,
        sw: &mut SoapWriter,
    ) -> Result<Element<'static>, TypeCodeError> {
        match value {
            Value::Nil => Ok(nil_element(name, sw)),
            Value::Int(_) | Value::BigInt(_) | Value::Float(_) | Value::Str(_) => {
                let tc = registry()
                    .for_native(value.kind())
                    .ok_or_else(|| wrong_kind(self, value))?;
                let element = tc.serialize(value, name, sw)?;
                if element.attribute_ns(ns::XSI, "type").is_some() {
                    Ok(element)
                } else {
                    Ok(element.add_attribute(sw.type_attribute(tc.type_name())))
                }
            }
            Value::Bytes(_) => AttachmentRef::new().serialize(value, name, sw),
            Value::List(items) => {
                let item_name = QName::local("element");
                let children = items
                    .iter()
                    .map(|item| self.serialize(item, &item_name, sw))
                    .collect::<Result<Vec<_>, _>>()?;
                let array = sw.type_attribute(&QName::new(ns::SOAP_ENC, "Array"));
                Ok(sw.element(name).add_attribute(array).add_children(children))
            }
            Value::Struct(fields) => {
                let children = fields
                    .iter()
                    .map(|(field, member)| self.serialize(member, &QName::local(field.clone()), sw))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(sw.element(name).add_children(children))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use soapbind_xml::parser::parse_element;

    use super::*;
    use crate::TypeChecking;

    fn parse(xml: &str) -> Value {
        let element = parse_element(&format!(
            r#"<r xmlns:xsi="{}" xmlns:xsd="{}" xmlns:soapenc="{}" {xml}"#,
            ns::XSI,
            ns::XSD,
            ns::SOAP_ENC
        ))
        .unwrap();
        AnyType::new()
            .parse(&element, &ParseContext::new(TypeChecking::Strict))
            .unwrap()
    }

    #[test]
    fn known_xsi_type_uses_simple_typecode() {
        assert_eq!(parse(r#"xsi:type="xsd:int">12</r>"#), Value::from(12));
        assert_eq!(parse(r#"xsi:type="xsd:double">1.5</r>"#), Value::from(1.5));
    }

    #[test]
    fn untyped_content_is_decoded_structurally() {
        assert_eq!(parse(">hello</r>"), Value::from("hello"));
        assert_eq!(
            parse("><a>1</a><b xsi:type=\"xsd:int\">2</b></r>"),
            Value::Struct(vec![
                ("a".to_owned(), Value::from("1")),
                ("b".to_owned(), Value::from(2)),
            ])
        );
    }

    #[test]
    fn soap_encoded_arrays_become_lists() {
        assert_eq!(
            parse(
                r#"xsi:type="soapenc:Array"><element xsi:type="xsd:int">1</element><element xsi:nil="true"/></r>"#
            ),
            Value::List(vec![Value::from(1), Value::Nil])
        );
    }

    #[test]
    fn scalars_always_carry_xsi_type() {
        let mut sw = SoapWriter::new(TypeChecking::Strict);
        let element = AnyType::new()
            .serialize(&Value::from(i64::MAX), &QName::local("n"), &mut sw)
            .unwrap();
        assert_eq!(element.attribute_ns(ns::XSI, "type"), Some("xsd:long"));
    }

    #[test]
    fn lists_are_soap_arrays_of_elements() {
        let mut sw = SoapWriter::new(TypeChecking::Strict);
        let element = AnyType::new()
            .serialize(
                &Value::List(vec![Value::from("a"), Value::from(2)]),
                &QName::local("items"),
                &mut sw,
            )
            .unwrap();

        assert_eq!(element.attribute_ns(ns::XSI, "type"), Some("soapenc:Array"));
        let names: Vec<_> = element.children().map(Element::name).collect();
        assert_eq!(names, ["element", "element"]);
    }
}
