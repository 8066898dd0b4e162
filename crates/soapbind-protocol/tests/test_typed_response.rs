use soapbind_protocol::typecode::AnyType;
use soapbind_protocol::{ParsedSoap, Value};
use std::fs;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn test_any_type_follows_xsi_type_annotations() {
        let xml = fs::read_to_string("tests/resources/typed_response.xml")
            .expect("Failed to read typed_response.xml file");

        let parsed = ParsedSoap::parse(&xml).expect("Failed to parse envelope");
        assert!(!parsed.is_a_fault());

        let value = parsed
            .parse_body(&AnyType::new())
            .expect("Failed to decode body");

        assert_eq!(value.field("state"), Some(&Value::Int(2)));
        assert_eq!(value.field("load").and_then(Value::as_f64), Some(f64::INFINITY));
        assert_eq!(value.field("owner").and_then(Value::as_str), Some("ops team"));
        assert_eq!(
            value.field("tags"),
            Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(value.field("note"), Some(&Value::Nil));
    }
}
