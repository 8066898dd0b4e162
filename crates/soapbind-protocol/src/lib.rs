pub mod fault;
pub mod soap;
pub mod typecode;
pub mod value;
pub mod ws_addressing;

use std::fmt;

pub use fault::{Fault, FaultCode, FaultDetail};
pub use soap::{EnvelopeError, MimePart, OutboundMessage, ParsedSoap, SoapWriter};
pub use typecode::{ParseContext, TypeChecking, TypeCode, TypeCodeError, TypedObject};
pub use num_bigint::BigInt;
pub use value::{NativeKind, Value};
pub use ws_addressing::{WsAddress, WsAddressingError};

/// Well-known namespace URIs.
pub mod ns {
    pub const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";
    pub const SOAP_ENC: &str = "http://schemas.xmlsoap.org/soap/encoding/";
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema";
    /// Vendor namespace of the fault detail and header authentication elements.
    pub const ZSI: &str = "http://www.zolera.com/schemas/ZSI/";
    pub const WSA_2004: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
    pub const WSA_2005: &str = "http://www.w3.org/2005/08/addressing";

    /// Prefixes the writer uses for the namespaces above.
    pub(crate) const PREFERRED_PREFIXES: &[(&str, &str)] = &[
        (SOAP_ENV, "soapenv"),
        (SOAP_ENC, "soapenc"),
        (XSI, "xsi"),
        (XSD, "xsd"),
        (ZSI, "zsi"),
        (WSA_2004, "wsa"),
        (WSA_2005, "wsa"),
    ];
}

/// An expanded XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// A name with no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{{{namespace}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}
