//! WS-Addressing request headers and response checks.
use tracing::debug;
use uuid::Uuid;

use crate::soap::{ParsedSoap, SoapWriter};
use crate::{QName, ns};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WsAddressingError {
    #[error("SOAPAction {soap_action:?} does not match WS-Addressing action {ws_action:?}")]
    SoapActionMismatch {
        soap_action: String,
        ws_action: String,
    },

    #[error("response has no SOAP header, expected WS-Addressing headers")]
    MissingHeader,

    #[error("response has no WS-Addressing {0} header")]
    MissingElement(&'static str),

    #[error("response action {found:?} does not match expected {expected:?}")]
    ActionMismatch { expected: String, found: String },

    #[error("response RelatesTo {found:?} does not match request MessageID {expected:?}")]
    RelatesToMismatch { expected: String, found: String },
}

fn unquote(action: &str) -> &str {
    action.trim_matches(|c| c == '"' || c == '\'')
}

/// Verifies a static SOAPAction agrees with the WS-Addressing action, ignoring quotes.
pub fn check_soap_action(soap_action: &str, ws_action: &str) -> Result<(), WsAddressingError> {
    if unquote(soap_action) == unquote(ws_action) {
        return Ok(());
    }
    Err(WsAddressingError::SoapActionMismatch {
        soap_action: soap_action.to_owned(),
        ws_action: ws_action.to_owned(),
    })
}

/// The addressing record of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsAddress {
    namespace: String,
    to: String,
    action: String,
    message_id: String,
    from: String,
}

impl WsAddress {
    /// A fresh request record with a new `MessageID`.
    pub fn request(namespace: impl Into<String>, to: impl Into<String>, action: &str) -> Self {
        let namespace = namespace.into();
        let from = anonymous_uri(&namespace);
        Self {
            to: to.into(),
            action: unquote(action).to_owned(),
            message_id: format!("uuid:{}", Uuid::new_v4()),
            from,
            namespace,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    /// Adds `Action`, `MessageID`, `To` and `From` to the header.
    pub fn serialize(&self, sw: &mut SoapWriter) {
        let name = |local: &str| QName::new(self.namespace.clone(), local);

        for (local, text) in [
            ("Action", &self.action),
            ("MessageID", &self.message_id),
            ("To", &self.to),
        ] {
            let element = sw.element(&name(local)).set_text(text.clone());
            sw.add_header_element(element);
        }

        let address = sw.element(&name("Address")).set_text(self.from.clone());
        let from = sw.element(&name("From")).add_child(address);
        sw.add_header_element(from);
    }

    /// Checks the response headers against this request.
    ///
    /// `Action` is compared case-sensitively against `expected_action` when one is given.
    /// `RelatesTo` must name this request's `MessageID`.
    pub fn check_response(
        &self,
        parsed: &ParsedSoap,
        expected_action: Option<&str>,
    ) -> Result<(), WsAddressingError> {
        if parsed.header().is_none() {
            return Err(WsAddressingError::MissingHeader);
        }

        let header_text = |local: &'static str| {
            parsed
                .header_element(&self.namespace, local)
                .map(|element| element.text().trim().to_owned())
                .ok_or(WsAddressingError::MissingElement(local))
        };

        let action = header_text("Action")?;
        if let Some(expected) = expected_action {
            let expected = unquote(expected);
            if unquote(&action) != expected {
                return Err(WsAddressingError::ActionMismatch {
                    expected: expected.to_owned(),
                    found: action,
                });
            }
        }

        let relates_to = header_text("RelatesTo")?;
        if relates_to != self.message_id {
            return Err(WsAddressingError::RelatesToMismatch {
                expected: self.message_id.clone(),
                found: relates_to,
            });
        }

        debug!(action = %action, relates_to = %relates_to, "WS-Addressing response accepted");
        Ok(())
    }
}

/// Anonymous endpoint of an addressing namespace.
pub fn anonymous_uri(namespace: &str) -> String {
    if namespace == ns::WSA_2005 {
        format!("{namespace}/anonymous")
    } else {
        format!("{namespace}/role/anonymous")
    }
}
