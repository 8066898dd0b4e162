//! RFC 2617 digest authentication.
use md5::{Digest, Md5};
use tracing::debug;

use crate::binding::Credentials;
use crate::error::AuthError;
use crate::transport::HttpResponse;

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Vec<String>,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
}

fn split_params(params: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut rest = params.trim();

    while !rest.is_empty() {
        let Some((key, tail)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().trim_start_matches(',').trim().to_ascii_lowercase();
        let tail = tail.trim_start();

        let (value, tail) = if let Some(quoted) = tail.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            match tail.find(',') {
                Some(end) => (tail[..end].trim(), &tail[end..]),
                None => (tail.trim(), ""),
            }
        };

        out.push((key, value.to_owned()));
        rest = tail.trim_start().trim_start_matches(',').trim_start();
    }

    out
}

impl Challenge {
    /// Parses a challenge. `None` unless it is a digest challenge with realm, nonce and qop.
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let params = split_params(params);
        let get = |name: &str| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };

        let qop: Vec<String> = get("qop")?
            .split(',')
            .map(|q| q.trim().to_owned())
            .filter(|q| !q.is_empty())
            .collect();
        if qop.is_empty() {
            return None;
        }

        Some(Self {
            realm: get("realm")?,
            nonce: get("nonce")?,
            qop,
            opaque: get("opaque"),
            algorithm: get("algorithm"),
        })
    }
}

fn md5_hex(parts: &[&str]) -> String {
    let mut hasher = Md5::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b":");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// The values that make up a digest `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResponse {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub qop: String,
    pub nc: String,
    pub cnonce: String,
    pub response: String,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestResponse {
    /// Computes the response for `method uri`, first request with this nonce.
    pub fn generate(
        challenge: &Challenge,
        method: &str,
        uri: &str,
        credentials: &Credentials,
        cnonce: &str,
    ) -> Self {
        let nc = "00000001";
        let qop = challenge
            .qop
            .iter()
            .find(|q| q.eq_ignore_ascii_case("auth"))
            .or_else(|| challenge.qop.first())
            .map_or_else(|| "auth".to_owned(), Clone::clone);

        let mut ha1 = md5_hex(&[&credentials.user, &challenge.realm, &credentials.password]);
        if challenge
            .algorithm
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("MD5-sess"))
        {
            ha1 = md5_hex(&[&ha1, &challenge.nonce, cnonce]);
        }
        let ha2 = md5_hex(&[method, uri]);
        let response = md5_hex(&[&ha1, &challenge.nonce, nc, cnonce, &qop, &ha2]);

        Self {
            username: credentials.user.clone(),
            realm: challenge.realm.clone(),
            nonce: challenge.nonce.clone(),
            uri: uri.to_owned(),
            qop,
            nc: nc.to_owned(),
            cnonce: cnonce.to_owned(),
            response,
            opaque: challenge.opaque.clone(),
            algorithm: challenge.algorithm.clone(),
        }
    }

    pub fn authorization(&self) -> String {
        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}""#,
            self.username, self.realm, self.nonce, self.uri, self.response
        );
        if let Some(algorithm) = &self.algorithm {
            header.push_str(&format!(", algorithm={algorithm}"));
        }
        header.push_str(&format!(", qop={}, nc={}, cnonce=\"{}\"", self.qop, self.nc, self.cnonce));
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        header
    }
}

/// Random client nonce.
pub fn new_cnonce() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Digest progress of one call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DigestState {
    #[default]
    Unauthenticated,
    ChallengeReceived(Challenge),
    Retried,
    Authorized,
    Failed,
}

/// What the call has to do after a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestStep {
    /// The response is final for authentication purposes.
    Done,
    /// Resend the original request with this `Authorization` value.
    Resubmit(String),
}

impl DigestState {
    /// Advances on a final response to the request sent to `uri`.
    pub fn on_response(
        &mut self,
        response: &HttpResponse,
        method: &str,
        uri: &str,
        credentials: &Credentials,
    ) -> Result<DigestStep, AuthError> {
        let unauthorized = response.status == 401;

        match (std::mem::take(self), unauthorized) {
            (Self::Unauthenticated, true) => {
                // Servers often offer other schemes ahead of Digest.
                let Some(challenge) = response.headers_named("WWW-Authenticate").find_map(Challenge::parse) else {
                    *self = Self::Failed;
                    let offered: Vec<&str> = response.headers_named("WWW-Authenticate").collect();
                    return Err(AuthError::InvalidChallenge(offered.join(", ")));
                };
                debug!(realm = %challenge.realm, "digest challenge received");
                *self = Self::ChallengeReceived(challenge);
                Ok(self.resubmit(method, uri, credentials))
            }
            (Self::Retried, true) | (Self::Failed, _) => {
                *self = Self::Failed;
                Err(AuthError::DigestFailed)
            }
            (Self::Retried | Self::Authorized, false) => {
                *self = Self::Authorized;
                Ok(DigestStep::Done)
            }
            (state, _) => {
                *self = state;
                Ok(DigestStep::Done)
            }
        }
    }

    fn resubmit(&mut self, method: &str, uri: &str, credentials: &Credentials) -> DigestStep {
        let Self::ChallengeReceived(challenge) = &*self else {
            return DigestStep::Done;
        };
        let response = DigestResponse::generate(challenge, method, uri, credentials, &new_cnonce());
        *self = Self::Retried;
        DigestStep::Resubmit(response.authorization())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unauthorized(challenge: &str) -> HttpResponse {
        HttpResponse {
            status: 401,
            reason: "Unauthorized".to_owned(),
            headers: vec![("WWW-Authenticate".to_owned(), challenge.to_owned())],
            body: Vec::new(),
        }
    }

    fn ok() -> HttpResponse {
        HttpResponse {
            status: 200,
            reason: "OK".to_owned(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    const RFC_CHALLENGE: &str = r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;

    #[test]
    fn challenge_requires_realm_nonce_and_qop() {
        let challenge = Challenge::parse(RFC_CHALLENGE).unwrap();
        assert_eq!(challenge.realm, "testrealm@host.com");
        assert_eq!(challenge.qop, ["auth", "auth-int"]);
        assert_eq!(challenge.opaque.as_deref(), Some("5ccc069c403ebaf9f0171e9517f40e41"));

        assert!(Challenge::parse(r#"Digest realm="r", nonce="n""#).is_none());
        assert!(Challenge::parse(r#"Basic realm="r""#).is_none());
        assert!(Challenge::parse("Digest").is_none());
    }

    #[test]
    fn response_matches_rfc_2617_example() {
        let challenge = Challenge::parse(RFC_CHALLENGE).unwrap();
        let credentials = Credentials::new("Mufasa", "Circle Of Life");
        let digest = DigestResponse::generate(&challenge, "GET", "/dir/index.html", &credentials, "0a4f113b");

        assert_eq!(digest.qop, "auth");
        assert_eq!(digest.response, "6629fae49393a05397450978507c4ef1");
        let header = digest.authorization();
        assert!(header.starts_with(r#"Digest username="Mufasa", realm="testrealm@host.com""#));
        assert!(header.contains(r#"uri="/dir/index.html""#));
        assert!(header.contains(r#"qop=auth, nc=00000001, cnonce="0a4f113b""#));
        assert!(header.ends_with(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
    }

    #[test]
    fn one_resubmission_then_authorized() {
        let credentials = Credentials::new("u", "p");
        let mut state = DigestState::default();

        let step = state
            .on_response(&unauthorized(RFC_CHALLENGE), "POST", "/sdk", &credentials)
            .unwrap();
        assert!(matches!(step, DigestStep::Resubmit(ref auth) if auth.starts_with("Digest ")));
        assert_eq!(state, DigestState::Retried);

        assert_eq!(state.on_response(&ok(), "POST", "/sdk", &credentials).unwrap(), DigestStep::Done);
        assert_eq!(state, DigestState::Authorized);
    }

    #[test]
    fn second_unauthorized_is_fatal() {
        let credentials = Credentials::new("u", "p");
        let mut state = DigestState::default();
        state
            .on_response(&unauthorized(RFC_CHALLENGE), "POST", "/sdk", &credentials)
            .unwrap();

        let err = state
            .on_response(&unauthorized(RFC_CHALLENGE), "POST", "/sdk", &credentials)
            .unwrap_err();
        assert!(matches!(err, AuthError::DigestFailed));
        assert_eq!(state, DigestState::Failed);
    }

    #[test]
    fn unusable_challenge_fails() {
        let credentials = Credentials::new("u", "p");
        let mut state = DigestState::default();
        let err = state
            .on_response(&unauthorized(r#"Basic realm="x""#), "POST", "/sdk", &credentials)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidChallenge(_)));
    }

    #[test]
    fn digest_is_picked_among_offered_schemes() {
        let credentials = Credentials::new("u", "p");
        let mut state = DigestState::default();
        let mut response = unauthorized("Negotiate");
        response.headers.push(("WWW-Authenticate".to_owned(), "NTLM".to_owned()));
        response.headers.push(("www-authenticate".to_owned(), RFC_CHALLENGE.to_owned()));

        let step = state.on_response(&response, "POST", "/sdk", &credentials).unwrap();
        assert!(matches!(step, DigestStep::Resubmit(ref auth) if auth.contains(r#"realm="testrealm@host.com""#)));
        assert_eq!(state, DigestState::Retried);
    }

    #[test]
    fn unusable_challenges_are_all_reported() {
        let credentials = Credentials::new("u", "p");
        let mut state = DigestState::default();
        let mut response = unauthorized("Negotiate");
        response.headers.push(("WWW-Authenticate".to_owned(), r#"Basic realm="x""#.to_owned()));

        let err = state.on_response(&response, "POST", "/sdk", &credentials).unwrap_err();
        assert!(matches!(err, AuthError::InvalidChallenge(ref offered) if offered == r#"Negotiate, Basic realm="x""#));
        assert_eq!(state, DigestState::Failed);
    }

    #[test]
    fn success_without_challenge_stays_unauthenticated() {
        let credentials = Credentials::new("u", "p");
        let mut state = DigestState::default();
        assert_eq!(state.on_response(&ok(), "POST", "/sdk", &credentials).unwrap(), DigestStep::Done);
        assert_eq!(state, DigestState::Unauthenticated);
    }
}
