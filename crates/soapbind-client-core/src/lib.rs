//! Blocking SOAP 1.1 RPC client.
//!
//! A [`Binding`] describes one endpoint. Requests are written with
//! [`soapbind_protocol::SoapWriter`], sent over HTTP/1.1 or HTTPS, and replies decoded
//! into [`soapbind_protocol::Value`]s or returned as [`soapbind_protocol::Fault`]s.
pub mod binding;
pub mod error;
pub mod transport;

pub use binding::{
    AuthStyle, Binding, BindingConfig, Call, Cookie, CookieJar, Credentials, Operation, Payload, ReceiveOptions,
    ReplyTypes, SendOptions, SignatureError, SignatureHandler,
};
pub use error::{AuthError, ConfigError, DecodeError, SoapError};
pub use transport::{Connection, HttpRequest, HttpResponse, TransportError, TransportFactory, TransportOptions};
