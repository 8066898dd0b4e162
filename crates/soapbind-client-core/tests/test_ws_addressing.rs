mod common;

use std::sync::Arc;

use common::{ScriptedTransport, URL, resource, soap_response};
use soapbind_client_core::{Binding, BindingConfig, Payload, ReceiveOptions, SendOptions, SoapError, TransportFactory};
use soapbind_protocol::{QName, Value, WsAddressingError, ns};

fn binding(transport: &ScriptedTransport, soap_action: Option<&str>) -> Binding {
    let factory: Arc<dyn TransportFactory> = Arc::new(transport.clone());
    let mut config = BindingConfig::builder()
        .url(URL)
        .transport(factory)
        .ws_address_uri(ns::WSA_2005)
        .build();
    config.soap_action = soap_action.map(str::to_owned);
    Binding::new(config).expect("Failed to create binding")
}

fn get_status() -> (QName, Payload, SendOptions) {
    (
        QName::local("getStatus"),
        Payload::from(Value::List(Vec::new())),
        SendOptions::builder().ws_action("urn:inventory/getStatus").build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn test_addressing_headers_round_trip() {
        let transport = ScriptedTransport::default();
        let binding = binding(&transport, None);
        let (operation, payload, options) = get_status();

        let mut call = binding
            .send(None, &operation, &payload, &options)
            .expect("Failed to send");

        let message_id = call.address().expect("address missing").message_id().to_owned();
        assert!(message_id.starts_with("uuid:"));

        let body = transport.last_body();
        assert!(body.contains("<wsa:Action>urn:inventory/getStatus</wsa:Action>"));
        assert!(body.contains(&format!("<wsa:MessageID>{message_id}</wsa:MessageID>")));
        assert!(body.contains("<wsa:To>http://vc.example.com/sdk</wsa:To>"));

        let reply = resource("addressed_response.xml").replace("{message_id}", &message_id);
        transport.push(soap_response(200, &reply));

        let options = ReceiveOptions::builder()
            .ws_action("urn:inventory/getStatusResponse")
            .build();
        let value = binding
            .receive(&mut call, None, &options)
            .expect("Failed to receive");
        assert_eq!(value.field("vm").and_then(Value::as_str), Some("vm-1"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_relates_to_must_name_the_request() {
        let transport = ScriptedTransport::default();
        let binding = binding(&transport, None);
        let (operation, payload, options) = get_status();

        let mut call = binding
            .send(None, &operation, &payload, &options)
            .expect("Failed to send");
        let reply = resource("addressed_response.xml").replace("{message_id}", "uuid:someone-else");
        transport.push(soap_response(200, &reply));

        let err = binding
            .receive(&mut call, None, &ReceiveOptions::default())
            .expect_err("foreign RelatesTo must be rejected");
        assert!(matches!(
            err,
            SoapError::WsAddressing(WsAddressingError::RelatesToMismatch { ref found, .. }) if found == "uuid:someone-else"
        ));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_reply_action_is_checked() {
        let transport = ScriptedTransport::default();
        let binding = binding(&transport, None);
        let (operation, payload, options) = get_status();

        let mut call = binding
            .send(None, &operation, &payload, &options)
            .expect("Failed to send");
        let message_id = call.address().expect("address missing").message_id().to_owned();
        let reply = resource("addressed_response.xml").replace("{message_id}", &message_id);
        transport.push(soap_response(200, &reply));

        let options = ReceiveOptions::builder().ws_action("urn:inventory/other").build();
        let err = binding
            .receive(&mut call, None, &options)
            .expect_err("unexpected Action must be rejected");
        assert!(matches!(err, SoapError::WsAddressing(WsAddressingError::ActionMismatch { .. })));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_soap_action_must_agree_with_ws_action() {
        let transport = ScriptedTransport::default();
        let binding = binding(&transport, Some("\"urn:inventory/setState\""));
        let (operation, payload, options) = get_status();

        let err = binding
            .send(None, &operation, &payload, &options)
            .expect_err("mismatched actions must fail");
        assert!(matches!(
            err,
            SoapError::WsAddressing(WsAddressingError::SoapActionMismatch { .. })
        ));
        assert_eq!(transport.connects(), 0);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_soap_action_stands_in_for_missing_ws_action() {
        let transport = ScriptedTransport::default();
        let binding = binding(&transport, None);
        let options = SendOptions::builder().soap_action("\"urn:inventory/getStatus\"").build();

        let call = binding
            .send(None, &QName::local("getStatus"), &Payload::from(Value::List(Vec::new())), &options)
            .expect("Failed to send");
        assert_eq!(call.request().header("SOAPAction"), Some("\"urn:inventory/getStatus\""));
        assert!(transport.last_body().contains("<wsa:Action>urn:inventory/getStatus</wsa:Action>"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_quoted_soap_action_matches_ws_action() {
        let transport = ScriptedTransport::default();
        let binding = binding(&transport, Some("\"urn:inventory/getStatus\""));
        let (operation, payload, options) = get_status();

        let call = binding
            .send(None, &operation, &payload, &options)
            .expect("Failed to send");
        assert_eq!(call.request().header("SOAPAction"), Some("\"urn:inventory/getStatus\""));
    }
}
