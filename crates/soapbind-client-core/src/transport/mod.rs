//! Blocking HTTP transport.
//!
//! A [`TransportFactory`] opens one [`Connection`] per call. The binding drives the
//! connection strictly as request, then response; interim `1xx` responses are absorbed
//! by [`Connection::drain_interim`] without reconnecting.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use url::Url;

pub mod http;
mod http_client;

pub use http::{HttpRequest, HttpResponse};
pub use http_client::{UreqConnection, UreqTransport};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("HTTP request failed: {0}")]
    Request(#[source] Box<ureq::Error>),

    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(u64),

    #[error("connection used out of order: {0}")]
    OutOfOrder(&'static str),

    #[error("connection closed by peer")]
    Closed,

    #[error("cannot address {0}")]
    InvalidTarget(String),
}

/// Connect and read limits; the only cancellation mechanism a call has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    /// Skip certificate and host name validation for `https`.
    pub accept_invalid_certs: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(30)),
            read_timeout: Some(Duration::from_secs(60)),
            accept_invalid_certs: false,
        }
    }
}

/// One open HTTP connection.
pub trait Connection: Send + fmt::Debug {
    /// Writes a complete request. Fails while a previous response is still unread.
    fn send_request(&mut self, request: &HttpRequest) -> Result<(), TransportError>;

    /// Reads the next response, which may be an interim `1xx` one.
    fn read_response(&mut self) -> Result<HttpResponse, TransportError>;

    /// Whether another request may be sent once the current response is read.
    fn is_open(&self) -> bool {
        true
    }

    /// Reads past any interim responses and returns the final one.
    fn drain_interim(&mut self) -> Result<HttpResponse, TransportError> {
        loop {
            let response = self.read_response()?;
            if !response.is_interim() {
                return Ok(response);
            }
            debug!(status = response.status, "absorbed interim response");
        }
    }
}

/// Opens connections for a URL.
pub trait TransportFactory: Send + Sync + fmt::Debug {
    fn connect(&self, url: &Url, options: &TransportOptions) -> Result<Box<dyn Connection>, TransportError>;
}

/// The built-in factory for `http` or `https`, or `None` for any other scheme.
pub fn for_scheme(scheme: &str) -> Option<Arc<dyn TransportFactory>> {
    match scheme {
        "http" | "https" => Some(Arc::new(UreqTransport)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_selects_factory() {
        assert!(format!("{:?}", for_scheme("http").unwrap()).contains("UreqTransport"));
        assert!(format!("{:?}", for_scheme("https").unwrap()).contains("UreqTransport"));
        assert!(for_scheme("ftp").is_none());
    }
}
