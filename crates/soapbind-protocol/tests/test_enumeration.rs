use std::sync::Arc;

use soapbind_protocol::typecode::{Field, IntEnumeration, StructType, XsdString};
use soapbind_protocol::{ParsedSoap, QName, SoapWriter, TypeChecking, TypeCode, TypeCodeError, Value, ns};

fn set_state(checking: TypeChecking) -> StructType {
    let states = IntEnumeration::from_choices([0, 1, 2], checking).expect("valid choices");
    StructType::new(
        QName::local("setState"),
        vec![
            Field::new(QName::local("vm"), Arc::new(XsdString::new())),
            Field::new(QName::local("state"), Arc::new(states)),
        ],
    )
}

fn request(state: Value, checking: TypeChecking) -> Result<String, TypeCodeError> {
    let mut sw = SoapWriter::new(checking).with_encoding_style(Some(ns::SOAP_ENC.to_owned()));
    let value = Value::Struct(vec![("vm".to_owned(), Value::from("vm-17")), ("state".to_owned(), state)]);
    sw.serialize(&value, &set_state(checking), &QName::local("setState"))?;
    sw.envelope()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn test_enumeration_round_trip() {
        let xml = request(Value::from(2), TypeChecking::Strict).expect("member serializes");
        assert!(xml.contains(r#"<state xsi:type="xsd:integer">2</state>"#));

        let parsed = ParsedSoap::parse(&xml).unwrap();
        let value = parsed.parse_body(&set_state(TypeChecking::Strict)).unwrap();
        assert_eq!(value.field("state"), Some(&Value::Int(2)));
        assert_eq!(value.field("vm").and_then(Value::as_str), Some("vm-17"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_serialize_rejects_non_members() {
        let err = request(Value::from(7), TypeChecking::Strict).unwrap_err();
        assert!(err.message().contains("not in enumeration list"));

        // Numeric text is only coerced when checking is lenient.
        assert!(request(Value::from("1"), TypeChecking::Strict).is_err());
        assert!(request(Value::from("1"), TypeChecking::Lenient).is_ok());
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_parse_reports_location_of_non_member() {
        let xml = format!(
            r#"<e:Envelope xmlns:e="{}"><e:Body><setState><vm>vm-17</vm><state>9</state></setState></e:Body></e:Envelope>"#,
            ns::SOAP_ENV
        );
        let parsed = ParsedSoap::parse(&xml).unwrap();
        let err = parsed.parse_body(&set_state(TypeChecking::Strict)).unwrap_err();

        assert_eq!(err.message(), "value 9 not in enumeration list");
        assert_eq!(err.location(), Some("/Envelope/Body/setState/state"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_typecode_names_follow_base() {
        let states = IntEnumeration::from_choices([0, 1], TypeChecking::Strict).unwrap();
        assert_eq!(states.type_name(), &QName::new(ns::XSD, "integer"));
        assert_eq!(states.choices(), Some(&[Value::from(0), Value::from(1)][..]));
    }
}
