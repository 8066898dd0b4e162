//! What a request carries and how it becomes the body element.
use soapbind_protocol::typecode::AnyType;
use soapbind_protocol::{QName, SoapWriter, TypeCode, TypeCodeError, TypedObject, Value};
use tracing::debug;

/// Request content handed to [`crate::Binding::send`].
#[derive(Debug, Clone)]
pub enum Payload {
    /// A plain value with no typecode of its own.
    Native(Value),
    /// A value with its own typecode and element name.
    Typed(TypedObject),
    Sequence(Vec<Payload>),
}

impl Payload {
    /// The bare value, dropping any typecode.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Native(value) => value.clone(),
            Self::Typed(object) => object.value.clone(),
            Self::Sequence(items) => Value::List(items.iter().map(Self::to_value).collect()),
        }
    }

    fn typed_items(&self) -> Option<Vec<&TypedObject>> {
        let Self::Sequence(items) = self else {
            return None;
        };
        if items.is_empty() {
            return None;
        }
        items
            .iter()
            .map(|item| match item {
                Self::Typed(object) => Some(object),
                _ => None,
            })
            .collect()
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Native(value)
    }
}

impl From<TypedObject> for Payload {
    fn from(object: TypedObject) -> Self {
        Self::Typed(object)
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(items: Vec<Self>) -> Self {
        Self::Sequence(items)
    }
}

/// How a payload is written, in order of precedence.
#[derive(Debug)]
pub(crate) enum Shape<'a> {
    Explicit(&'a dyn TypeCode),
    Own(&'a TypedObject),
    NamedFields(Vec<&'a TypedObject>),
    AnonymousSequence(Vec<Value>),
}

pub(crate) fn select_shape<'a>(payload: &'a Payload, request_typecode: Option<&'a dyn TypeCode>) -> Shape<'a> {
    if let Some(typecode) = request_typecode {
        return Shape::Explicit(typecode);
    }
    if let Payload::Typed(object) = payload {
        return Shape::Own(object);
    }
    if let Some(objects) = payload.typed_items() {
        return Shape::NamedFields(objects);
    }

    match payload.to_value() {
        Value::List(items) => Shape::AnonymousSequence(items),
        value => Shape::AnonymousSequence(vec![value]),
    }
}

/// Writes the body element for `payload` under the operation name.
pub(crate) fn serialize_payload(
    sw: &mut SoapWriter,
    operation: &QName,
    payload: &Payload,
    request_typecode: Option<&dyn TypeCode>,
) -> Result<(), TypeCodeError> {
    match select_shape(payload, request_typecode) {
        Shape::Explicit(typecode) => {
            debug!(type_name = %typecode.type_name(), "serializing with request typecode");
            sw.serialize(&payload.to_value(), typecode, operation)
        }
        Shape::Own(object) => {
            debug!(type_name = %object.typecode.type_name(), "serializing with payload typecode");
            sw.serialize_typed(object)
        }
        Shape::NamedFields(objects) => {
            debug!(fields = objects.len(), "serializing typed sequence as named fields");
            let children = objects
                .iter()
                .map(|object| object.serialize(sw))
                .collect::<Result<Vec<_>, _>>()?;
            let element = sw.element(operation).add_children(children);
            sw.add_body_element(element);
            Ok(())
        }
        Shape::AnonymousSequence(items) => {
            debug!(items = items.len(), "serializing as anonymous sequence");
            sw.serialize(&Value::List(items), &AnyType::as_list(), operation)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use soapbind_protocol::typecode::{XsdInt, XsdString};
    use soapbind_protocol::{TypeChecking, ns};

    use super::*;

    fn typed(name: &str, value: Value) -> Payload {
        let typecode: Arc<dyn TypeCode> = match value {
            Value::Str(_) => Arc::new(XsdString::new()),
            _ => Arc::new(XsdInt::new()),
        };
        Payload::Typed(TypedObject::new(QName::local(name), typecode, value))
    }

    #[test]
    fn bare_value_is_an_anonymous_sequence() {
        let payload = Payload::from(Value::from(5));
        assert!(matches!(
            select_shape(&payload, None),
            Shape::AnonymousSequence(items) if items == vec![Value::from(5)]
        ));

        let mut sw = SoapWriter::new(TypeChecking::Strict);
        serialize_payload(&mut sw, &QName::local("op"), &payload, None).unwrap();
        let body = &sw.body_elements()[0];
        assert_eq!(body.name(), "op");
        assert_eq!(body.attribute_ns(ns::XSI, "type"), Some("soapenc:Array"));
        assert_eq!(body.children().count(), 1);
    }

    #[test]
    fn typed_sequence_is_named_fields() {
        let payload = Payload::Sequence(vec![typed("name", Value::from("vm-1")), typed("count", Value::from(3))]);
        assert!(matches!(select_shape(&payload, None), Shape::NamedFields(ref objects) if objects.len() == 2));

        let mut sw = SoapWriter::new(TypeChecking::Strict);
        serialize_payload(&mut sw, &QName::local("op"), &payload, None).unwrap();
        let names: Vec<_> = sw.body_elements()[0].children().map(|c| c.name().to_owned()).collect();
        assert_eq!(names, ["name", "count"]);
    }

    #[test]
    fn mixed_sequence_is_anonymous() {
        let payload = Payload::Sequence(vec![typed("name", Value::from("vm-1")), Payload::Native(Value::from(1))]);
        assert!(matches!(
            select_shape(&payload, None),
            Shape::AnonymousSequence(items) if items.len() == 2
        ));
    }

    #[test]
    fn explicit_typecode_wins() {
        let payload = typed("count", Value::from(3));
        let override_tc = XsdString::new();
        assert!(matches!(select_shape(&payload, Some(&override_tc)), Shape::Explicit(_)));
        assert!(matches!(select_shape(&payload, None), Shape::Own(_)));
    }
}
