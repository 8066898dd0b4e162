use std::io::Read;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::transport::{Connection, HttpRequest, HttpResponse, TransportError, TransportFactory, TransportOptions};

/// Largest response body accepted, whatever `Content-Length` claims.
const MAX_BODY_LENGTH: u64 = 256 * 1024 * 1024;

/// Request headers ureq derives itself. It writes the body without waiting for
/// `100 Continue`, so `Expect` is not forwarded either.
const DERIVED_HEADERS: &[&str] = &["Host", "Content-Length", "Expect"];

#[derive(Debug)]
enum ConnectionState {
    Idle,
    Answered { response: HttpResponse, keep_alive: bool },
    Closed,
}

/// One logical connection over a [`ureq::Agent`].
///
/// The agent pools sockets per host, so requests sent while the server keeps the
/// connection alive share one socket. The response is read whole when the request is
/// sent and handed out by the next [`Connection::read_response`].
#[derive(Debug)]
pub struct UreqConnection {
    agent: ureq::Agent,
    url: Url,
    state: ConnectionState,
}

impl UreqConnection {
    pub fn new(agent: ureq::Agent, url: Url) -> Self {
        Self {
            agent,
            url,
            state: ConnectionState::Idle,
        }
    }
}

impl Connection for UreqConnection {
    #[instrument(name = "connection.send_request", level = "debug", skip_all, fields(target = %request.target, body_length = request.body.len()), err)]
    fn send_request(&mut self, request: &HttpRequest) -> Result<(), TransportError> {
        match self.state {
            ConnectionState::Idle => {}
            ConnectionState::Answered { .. } => {
                return Err(TransportError::OutOfOrder("request sent while a response is pending"));
            }
            ConnectionState::Closed => return Err(TransportError::Closed),
        }

        let url = self
            .url
            .join(&request.target)
            .map_err(|_| TransportError::InvalidTarget(request.target.clone()))?;

        let mut ureq_request = self.agent.request(request.method, url.as_str());
        for (name, value) in &request.headers {
            if DERIVED_HEADERS.iter().any(|derived| derived.eq_ignore_ascii_case(name)) {
                continue;
            }
            ureq_request = ureq_request.set(name, value);
        }

        // 401 and 500 carry challenges and faults, so error statuses are answers too.
        let response = match ureq_request.send_bytes(&request.body) {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(e) => {
                warn!(error = %e, "request failed");
                self.state = ConnectionState::Closed;
                return Err(TransportError::Request(Box::new(e)));
            }
        };

        let version = response.http_version().to_owned();
        let response = into_response(response)?;
        let keep_alive = keeps_alive(&version, &response);
        debug!(status = response.status, %version, keep_alive, body_length = response.body.len(), "response read");

        self.state = ConnectionState::Answered { response, keep_alive };
        Ok(())
    }

    fn read_response(&mut self) -> Result<HttpResponse, TransportError> {
        match std::mem::replace(&mut self.state, ConnectionState::Closed) {
            ConnectionState::Answered { response, keep_alive } => {
                if keep_alive {
                    self.state = ConnectionState::Idle;
                }
                Ok(response)
            }
            ConnectionState::Idle => {
                self.state = ConnectionState::Idle;
                Err(TransportError::OutOfOrder("no request in flight"))
            }
            ConnectionState::Closed => Err(TransportError::Closed),
        }
    }

    fn is_open(&self) -> bool {
        !matches!(self.state, ConnectionState::Closed)
    }
}

fn into_response(response: ureq::Response) -> Result<HttpResponse, TransportError> {
    let status = response.status();
    let reason = response.status_text().to_owned();

    let mut names: Vec<String> = Vec::new();
    for name in response.headers_names() {
        if !names.iter().any(|seen| seen.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    }
    let headers = names
        .iter()
        .flat_map(|name| {
            response
                .all(name)
                .into_iter()
                .map(|value| (name.clone(), unfold(value)))
                .collect::<Vec<_>>()
        })
        .collect();

    let body = read_body(response.into_reader(), MAX_BODY_LENGTH)?;

    Ok(HttpResponse {
        status,
        reason,
        headers,
        body,
    })
}

/// Joins obsolete line folding (a continuation line starting with whitespace) with one space.
fn unfold(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn read_body(reader: impl Read, limit: u64) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    reader.take(limit + 1).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Err(TransportError::BodyTooLarge(limit));
    }
    Ok(body)
}

/// Whether the server can take another request on the socket that carried `response`.
fn keeps_alive(version: &str, response: &HttpResponse) -> bool {
    let connection_has = |token: &str| {
        response
            .header("Connection")
            .is_some_and(|value| value.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
    };

    if response.closes_connection() {
        return false;
    }
    if version.eq_ignore_ascii_case("HTTP/1.0") && !connection_has("keep-alive") {
        return false;
    }

    let no_body = response.is_interim() || response.status == 204 || response.status == 304;
    let chunked = response
        .header("Transfer-Encoding")
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
    // Otherwise the body ran until the server closed the socket.
    no_body || chunked || response.header("Content-Length").is_some()
}

/// `http` and `https` through ureq, with the platform TLS library for `https`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl TransportFactory for UreqTransport {
    #[instrument(name = "transport.connect", level = "info", skip(self, options), fields(url = %url), err)]
    fn connect(&self, url: &Url, options: &TransportOptions) -> Result<Box<dyn Connection>, TransportError> {
        if url.host_str().is_none() {
            return Err(TransportError::InvalidTarget(url.to_string()));
        }

        let mut builder = ureq::AgentBuilder::new().redirects(0);
        if let Some(timeout) = options.connect_timeout {
            builder = builder.timeout_connect(timeout);
        }
        if let Some(timeout) = options.read_timeout {
            builder = builder.timeout_read(timeout);
        }

        if url.scheme() == "https" {
            if options.accept_invalid_certs {
                warn!("TLS certificate and host name validation disabled");
            }
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(options.accept_invalid_certs)
                .danger_accept_invalid_hostnames(options.accept_invalid_certs)
                .build()
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            builder = builder.tls_connector(Arc::new(connector));
        }

        info!("creating agent");
        Ok(Box::new(UreqConnection::new(builder.build(), url.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(headers: &[(&str, &str)]) -> HttpResponse {
        HttpResponse {
            status: 401,
            reason: "Unauthorized".to_owned(),
            headers: headers
                .iter()
                .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
                .collect(),
            body: Vec::new(),
        }
    }

    #[test]
    fn framed_http11_bodies_keep_the_socket() {
        assert!(keeps_alive("HTTP/1.1", &response(&[("Content-Length", "0")])));
        assert!(keeps_alive("HTTP/1.1", &response(&[("Transfer-Encoding", "chunked")])));
        assert!(!keeps_alive(
            "HTTP/1.1",
            &response(&[("Content-Length", "0"), ("Connection", "close")])
        ));
    }

    #[test]
    fn eof_delimited_bodies_close_the_socket() {
        assert!(!keeps_alive("HTTP/1.1", &response(&[("Content-Type", "text/html")])));
    }

    #[test]
    fn http10_closes_unless_kept_alive() {
        assert!(!keeps_alive("HTTP/1.0", &response(&[("Content-Length", "0")])));
        assert!(keeps_alive(
            "HTTP/1.0",
            &response(&[("Content-Length", "0"), ("Connection", "Keep-Alive")])
        ));
    }

    #[test]
    fn folded_values_are_joined() {
        assert_eq!(unfold("sid=abc;\r\n Path=/x"), "sid=abc; Path=/x");
        assert_eq!(unfold("sid=abc; Path=/x"), "sid=abc; Path=/x");
    }

    #[test]
    fn body_length_is_bounded() {
        assert_eq!(read_body(&b"0123456789"[..], 10).unwrap(), b"0123456789");
        assert!(matches!(
            read_body(&b"0123456789!"[..], 10),
            Err(TransportError::BodyTooLarge(10))
        ));
    }

    #[test]
    fn read_before_send_is_rejected() {
        let url = Url::parse("http://127.0.0.1:9/sdk").unwrap();
        let mut connection = UreqConnection::new(ureq::agent(), url);
        assert!(matches!(connection.read_response(), Err(TransportError::OutOfOrder(_))));
        assert!(connection.is_open());
    }
}
