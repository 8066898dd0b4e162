use std::borrow::Cow;
use std::sync::Arc;

use soapbind_protocol::soap::mime;
use soapbind_protocol::{Fault, MimePart, ParsedSoap, WsAddress};
use tracing::{debug, instrument, trace};
use url::Url;

use crate::binding::Binding;
use crate::binding::digest::{DigestState, DigestStep};
use crate::error::{AuthError, DecodeError, SoapError};
use crate::transport::{Connection, HttpRequest, HttpResponse, TransportFactory};

/// One request in flight and, once read, its response.
///
/// Everything read is cached, so the `receive_*` accessors can be called in any order
/// and any number of times.
#[derive(Debug)]
pub struct Call<'b> {
    binding: &'b Binding,
    url: Url,
    transport: Arc<dyn TransportFactory>,
    connection: Box<dyn Connection>,
    request: HttpRequest,
    boundary: Option<String>,
    start_cid: Option<String>,
    response: Option<HttpResponse>,
    parsed: Option<ParsedSoap>,
    digest: DigestState,
    address: Option<WsAddress>,
}

fn is_soap_content_type(content_type: &str) -> bool {
    match mime::media_type(content_type).as_str() {
        "text/xml" => true,
        "multipart/related" => mime::content_type_parameter(content_type, "type")
            .is_some_and(|root_type| root_type.eq_ignore_ascii_case("text/xml")),
        _ => false,
    }
}

fn decode_soap(response: &HttpResponse, binding: &Binding) -> Result<ParsedSoap, SoapError> {
    let content_type = response.content_type().unwrap_or_default();
    if !is_soap_content_type(content_type) {
        return Err(DecodeError::NotSoap(content_type.to_owned()).into());
    }
    if response.body.is_empty() {
        return Err(DecodeError::Empty.into());
    }

    let (xml, attachments): (Cow<'_, [u8]>, Vec<MimePart>) = if mime::media_type(content_type) == "multipart/related" {
        let message = mime::decode(content_type, &response.body).map_err(DecodeError::from)?;
        debug!(attachments = message.attachments.len(), "multipart response");
        (Cow::Owned(message.root.data), message.attachments)
    } else {
        (Cow::Borrowed(response.body.as_slice()), Vec::new())
    };

    let text = std::str::from_utf8(&xml).map_err(DecodeError::from)?;
    let parsed = ParsedSoap::parse(text)
        .map_err(DecodeError::from)?
        .with_attachments(attachments)
        .with_checking(binding.checking());

    if let Some(signer) = binding.signer() {
        signer.verify(&parsed)?;
    }

    Ok(parsed)
}

impl<'b> Call<'b> {
    pub(crate) fn new(
        binding: &'b Binding,
        url: Url,
        transport: Arc<dyn TransportFactory>,
        connection: Box<dyn Connection>,
        request: HttpRequest,
        address: Option<WsAddress>,
    ) -> Self {
        Self {
            binding,
            url,
            transport,
            connection,
            request,
            boundary: None,
            start_cid: None,
            response: None,
            parsed: None,
            digest: DigestState::default(),
            address,
        }
    }

    /// Records the MIME framing of a multipart request.
    pub(crate) fn with_framing(mut self, boundary: Option<String>, start_cid: Option<String>) -> Self {
        self.boundary = boundary;
        self.start_cid = start_cid;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The request as last sent, including any digest `Authorization`.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Addressing headers written into the request, if the binding uses WS-Addressing.
    pub fn address(&self) -> Option<&WsAddress> {
        self.address.as_ref()
    }

    /// MIME boundary of the request, `None` unless it carried attachments.
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    pub fn start_cid(&self) -> Option<&str> {
        self.start_cid.as_deref()
    }

    pub fn digest_state(&self) -> &DigestState {
        &self.digest
    }

    /// The final HTTP response, read on first use.
    pub fn receive_response(&mut self) -> Result<&HttpResponse, SoapError> {
        let response = match self.response.take() {
            Some(response) => response,
            None => self.read_final_response()?,
        };
        Ok(self.response.insert(response))
    }

    /// Body of the final response.
    pub fn receive_raw(&mut self) -> Result<&[u8], SoapError> {
        Ok(&self.receive_response()?.body)
    }

    /// Whether the response declares a SOAP envelope, plain or as a multipart root.
    pub fn is_soap(&mut self) -> Result<bool, SoapError> {
        if self.parsed.is_some() {
            return Ok(true);
        }
        let content_type = self.receive_response()?.content_type().unwrap_or_default();
        Ok(is_soap_content_type(content_type))
    }

    /// The parsed envelope. Non-SOAP and empty responses are decode errors.
    pub fn receive_soap(&mut self) -> Result<&ParsedSoap, SoapError> {
        let parsed = match self.parsed.take() {
            Some(parsed) => parsed,
            None => {
                let binding = self.binding;
                decode_soap(self.receive_response()?, binding)?
            }
        };
        Ok(self.parsed.insert(parsed))
    }

    pub fn is_a_fault(&mut self) -> Result<bool, SoapError> {
        Ok(self.receive_soap()?.is_a_fault())
    }

    /// The fault carried by the response; an error when there is none.
    pub fn receive_fault(&mut self) -> Result<Fault, SoapError> {
        let parsed = self.receive_soap()?;
        if !parsed.is_a_fault() {
            return Err(DecodeError::NotAFault.into());
        }
        Ok(Fault::from_fault_message(parsed)?)
    }

    #[instrument(name = "call.receive_raw", level = "debug", skip(self), fields(url = %self.url), err)]
    fn read_final_response(&mut self) -> Result<HttpResponse, SoapError> {
        let binding = self.binding;

        loop {
            let response = self.connection.drain_interim()?;
            debug!(status = response.status, reason = %response.reason, "response received");
            trace!(body = %String::from_utf8_lossy(&response.body), "response body");

            binding.merge_cookies(response.headers_named("Set-Cookie"));

            let Some(credentials) = binding.credentials().filter(|_| binding.uses_digest()) else {
                if response.status == 401 {
                    return Err(AuthError::Unauthorized.into());
                }
                return Ok(response);
            };

            match self
                .digest
                .on_response(&response, self.request.method, &self.request.target, credentials)?
            {
                DigestStep::Done => return Ok(response),
                DigestStep::Resubmit(authorization) => self.resubmit(&response, authorization)?,
            }
        }
    }

    /// Sends the request again with a digest answer, on a new connection if the
    /// server closed the old one.
    #[instrument(name = "call.digest_resubmit", level = "debug", skip_all, err)]
    fn resubmit(&mut self, challenged: &HttpResponse, authorization: String) -> Result<(), SoapError> {
        self.request.set_header("Authorization", authorization);
        self.request.set_header("Expect", "100-continue");
        if let Some(cookie) = self.binding.cookie_header() {
            self.request.set_header("Cookie", cookie);
        }

        if challenged.closes_connection() || !self.connection.is_open() {
            debug!("server closed the connection after the digest challenge, reconnecting");
            self.connection = self
                .transport
                .connect(&self.url, self.binding.transport_options())?;
        }

        self.connection.send_request(&self.request)?;
        Ok(())
    }
}
