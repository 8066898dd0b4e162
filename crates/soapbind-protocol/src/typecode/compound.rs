use std::sync::Arc;

use soapbind_xml::builder::Element;
use tracing::debug;

use crate::soap::SoapWriter;
use crate::typecode::{
    AnyType, ParseContext, TypeChecking, TypeCode, TypeCodeError, check_type, is_nil, nil_element,
    wrong_kind,
};
use crate::{NativeKind, QName, Value, ns};

/// One named member of a [`StructType`].
#[derive(Debug, Clone)]
pub struct Field {
    pub name: QName,
    pub typecode: Arc<dyn TypeCode>,
    pub min_occurs: u32,
}

impl Field {
    pub fn new(name: QName, typecode: Arc<dyn TypeCode>) -> Self {
        Self {
            name,
            typecode,
            min_occurs: 1,
        }
    }

    pub fn optional(mut self) -> Self {
        self.min_occurs = 0;
        self
    }
}

/// Aggregate of named child elements, decoded into [`Value::Struct`].
#[derive(Debug, Clone)]
pub struct StructType {
    type_name: QName,
    parse_list: Vec<String>,
    fields: Vec<Field>,
}

impl StructType {
    pub fn new(type_name: QName, fields: Vec<Field>) -> Self {
        let parse_list = vec![type_name.local.clone()];
        Self {
            type_name,
            parse_list,
            fields,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl TypeCode for StructType {
    fn type_name(&self) -> &QName {
        &self.type_name
    }

    fn parse_list(&self) -> &[String] {
        &self.parse_list
    }

    fn serial_list(&self) -> &[NativeKind] {
        &[]
    }

    fn parse(&self, element: &Element<'_>, ctx: &ParseContext<'_>) -> Result<Value, TypeCodeError> {
        if is_nil(element) {
            return Ok(Value::Nil);
        }
        check_type(self, element)?;

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match element.child(&field.name.local) {
                Some(child) => {
                    values.push((field.name.local.clone(), field.typecode.parse(child, ctx)?));
                }
                None if field.min_occurs > 0 => {
                    return Err(TypeCodeError::at(
                        element,
                        format!("missing required element {}", field.name.local),
                    ));
                }
                None => {}
            }
        }

        for child in element.children() {
            if !self.fields.iter().any(|field| field.name.local == child.name()) {
                debug!(
                    element = child.name(),
                    type_name = %self.type_name,
                    "ignoring undeclared struct member"
                );
            }
        }

        Ok(Value::Struct(values))
    }

    fn serialize(
        &self,
        value: &Value,
        name: &QName,
        sw: &mut SoapWriter,
    ) -> Result<Element<'static>, TypeCodeError> {
        let members = match value {
            Value::Nil => return Ok(nil_element(name, sw)),
            Value::Struct(members) => members,
            _ => return Err(wrong_kind(self, value)),
        };

        for (member, _) in members {
            if !self.fields.iter().any(|field| &field.name.local == member) {
                match sw.checking() {
                    TypeChecking::Strict => {
                        return Err(TypeCodeError::invalid(format!(
                            "{} has no member named {member}",
                            self.type_name.local
                        )));
                    }
                    TypeChecking::Lenient => {
                        debug!(member = member.as_str(), type_name = %self.type_name, "dropping undeclared struct member");
                    }
                }
            }
        }

        let mut children = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match value.field(&field.name.local) {
                Some(member) => children.push(field.typecode.serialize(member, &field.name, sw)?),
                None if field.min_occurs > 0 => {
                    return Err(TypeCodeError::invalid(format!(
                        "missing required member {} of {}",
                        field.name.local, self.type_name.local
                    )));
                }
                None => {}
            }
        }

        let mut element = sw.element(name).add_children(children);
        if sw.is_typed() {
            element = element.add_attribute(sw.type_attribute(&self.type_name));
        }
        Ok(element)
    }
}

/// Anonymous ordered sequence, decoded into [`Value::List`].
///
/// Items are written as `<element>` children; on parse every child element is an item
/// whatever its name.
#[derive(Debug, Clone)]
pub struct ArrayType {
    type_name: QName,
    parse_list: Vec<String>,
    item: Arc<dyn TypeCode>,
    item_name: String,
}

impl ArrayType {
    pub fn new(item: Arc<dyn TypeCode>) -> Self {
        Self {
            type_name: QName::new(ns::SOAP_ENC, "Array"),
            parse_list: vec!["Array".to_owned()],
            item,
            item_name: "element".to_owned(),
        }
    }

    /// Array of dynamically typed items.
    pub fn of_any() -> Self {
        Self::new(Arc::new(AnyType::new()))
    }

    pub fn with_item_name(mut self, item_name: impl Into<String>) -> Self {
        self.item_name = item_name.into();
        self
    }
}

impl TypeCode for ArrayType {
    fn type_name(&self) -> &QName {
        &self.type_name
    }

    fn parse_list(&self) -> &[String] {
        &self.parse_list
    }

    fn serial_list(&self) -> &[NativeKind] {
        &[]
    }

    fn parse(&self, element: &Element<'_>, ctx: &ParseContext<'_>) -> Result<Value, TypeCodeError> {
        if is_nil(element) {
            return Ok(Value::Nil);
        }
        check_type(self, element)?;

        element
            .children()
            .map(|child| self.item.parse(child, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn serialize(
        &self,
        value: &Value,
        name: &QName,
        sw: &mut SoapWriter,
    ) -> Result<Element<'static>, TypeCodeError> {
        let items = match value {
            Value::Nil => return Ok(nil_element(name, sw)),
            Value::List(items) => items,
            _ => return Err(wrong_kind(self, value)),
        };

        let item_name = QName::local(self.item_name.clone());
        let children = items
            .iter()
            .map(|item| self.item.serialize(item, &item_name, sw))
            .collect::<Result<Vec<_>, _>>()?;

        let mut element = sw.element(name).add_children(children);
        if sw.is_typed() {
            element = element.add_attribute(sw.type_attribute(&self.type_name));
        }
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use soapbind_xml::parser::parse_element;

    use super::*;
    use crate::typecode::{XsdInt, XsdString};

    fn person() -> StructType {
        StructType::new(
            QName::new("urn:people", "Person"),
            vec![
                Field::new(QName::local("name"), Arc::new(XsdString::new())),
                Field::new(QName::local("age"), Arc::new(XsdInt::new())).optional(),
            ],
        )
    }

    #[test]
    fn struct_parses_declared_members_in_order() {
        let element = parse_element("<p><age>40</age><name>Ada</name><extra/></p>").unwrap();
        let value = person()
            .parse(&element, &ParseContext::new(TypeChecking::Strict))
            .unwrap();

        assert_eq!(
            value,
            Value::Struct(vec![
                ("name".to_owned(), Value::from("Ada")),
                ("age".to_owned(), Value::from(40)),
            ])
        );
    }

    #[test]
    fn struct_reports_missing_required_member() {
        let element = parse_element("<p><age>40</age></p>").unwrap();
        let err = person()
            .parse(&element, &ParseContext::new(TypeChecking::Strict))
            .unwrap_err();
        assert!(err.message().contains("missing required element name"));
    }

    #[test]
    fn struct_serializes_fields_and_skips_absent_optionals() {
        let mut sw = SoapWriter::new(TypeChecking::Strict);
        let value = Value::Struct(vec![("name".to_owned(), Value::from("Ada"))]);
        let element = person()
            .serialize(&value, &QName::local("p"), &mut sw)
            .unwrap();
        assert_eq!(element.to_xml_string().unwrap(), "<p><name>Ada</name></p>");
    }

    #[test]
    fn strict_struct_rejects_unknown_members() {
        let mut sw = SoapWriter::new(TypeChecking::Strict);
        let value = Value::Struct(vec![
            ("name".to_owned(), Value::from("Ada")),
            ("email".to_owned(), Value::from("ada@example.com")),
        ]);
        assert!(person().serialize(&value, &QName::local("p"), &mut sw).is_err());
    }

    #[test]
    fn array_round_trips_items() {
        let array = ArrayType::new(Arc::new(XsdInt::new()));
        let mut sw = SoapWriter::new(TypeChecking::Strict);
        let element = array
            .serialize(
                &Value::List(vec![Value::from(1), Value::from(2)]),
                &QName::local("numbers"),
                &mut sw,
            )
            .unwrap();
        let xml = element.to_xml_string().unwrap();
        assert_eq!(xml, "<numbers><element>1</element><element>2</element></numbers>");

        let parsed = array
            .parse(&parse_element(&xml).unwrap(), &ParseContext::new(TypeChecking::Strict))
            .unwrap();
        assert_eq!(parsed, Value::List(vec![Value::from(1), Value::from(2)]));
    }
}
