use soapbind_protocol::soap::MimeError;
use soapbind_protocol::{EnvelopeError, Fault, TypeCodeError, WsAddressingError};

use crate::binding::{AuthStyle, SignatureError};
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("neither transport nor URL supplied")]
    NoTransportOrUrl,

    #[error("no URL to post to")]
    MissingUrl,

    #[error("unsupported URL scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("auth style {0:?} requires a user name and password")]
    MissingCredentials(AuthStyle),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("HTTP Digest Authorization Failed")]
    DigestFailed,

    #[error("server answered 401 Unauthorized and digest authorization is not configured")]
    Unauthorized,

    #[error("expecting a digest authorization challenge, got {0:?}")]
    InvalidChallenge(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("response is {0:?}, not \"text/xml\"")]
    NotSoap(String),

    #[error("received empty response")]
    Empty,

    #[error("expected SOAP fault not found")]
    NotAFault,

    #[error("response is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Mime(#[from] MimeError),
}

#[derive(Debug, thiserror::Error)]
pub enum SoapError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("typecode error: {0}")]
    TypeCode(#[from] TypeCodeError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("SOAP fault {code}: {0}", code = .0.code)]
    Fault(Box<Fault>),

    #[error("WS-Addressing error: {0}")]
    WsAddressing(#[from] WsAddressingError),

    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),
}

impl From<Fault> for SoapError {
    fn from(fault: Fault) -> Self {
        Self::Fault(Box::new(fault))
    }
}

impl SoapError {
    /// The fault, when the server answered with one.
    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}
