use std::fmt;

use soapbind_protocol::{ParsedSoap, SoapWriter};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SignatureError(pub String);

/// Message signing hook: signs outgoing envelopes and verifies parsed replies.
pub trait SignatureHandler: Send + Sync + fmt::Debug {
    /// Called after the envelope is complete, before it is rendered.
    fn sign(&self, sw: &mut SoapWriter) -> Result<(), SignatureError>;

    /// Called once per reply, right after the envelope is parsed.
    fn verify(&self, parsed: &ParsedSoap) -> Result<(), SignatureError>;
}
