//! The long-lived binding to one SOAP endpoint.
//!
//! A [`Binding`] holds configuration shared by every call: URL, namespace prefixes,
//! authentication, extra HTTP headers and the cookie jar. [`Binding::send`] writes one
//! request and hands back a [`Call`], which owns the connection and the response; the
//! binding itself is never changed by a call except for the cookie jar.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use soapbind_protocol::typecode::AnyType;
use soapbind_protocol::ws_addressing::check_soap_action;
use soapbind_protocol::{
    ParsedSoap, QName, SoapWriter, TypeChecking, TypeCode, TypeCodeError, TypedObject, Value, WsAddress, ns,
};
use soapbind_xml::builder::Element;
use tracing::{debug, info, instrument, trace};
use typed_builder::TypedBuilder;
use url::Url;

use crate::error::{ConfigError, SoapError};
use crate::transport::{self, HttpRequest, TransportFactory, TransportOptions};

mod auth;
mod call;
mod cookies;
pub mod digest;
mod operation;
mod payload;
mod signature;

pub use auth::{AuthStyle, Credentials};
pub use call::Call;
pub use cookies::{Cookie, CookieJar};
pub use operation::Operation;
pub use payload::Payload;
pub use signature::{SignatureError, SignatureHandler};

/// Reply typecodes by element name, for decoding the children of the reply wrapper.
pub type ReplyTypes = HashMap<String, Arc<dyn TypeCode>>;

/// Everything a [`Binding`] is created from.
#[derive(Debug, Clone, TypedBuilder)]
pub struct BindingConfig {
    /// Endpoint URL, used when a call names none.
    #[builder(default, setter(into, strip_option))]
    pub url: Option<String>,

    /// Namespace of operations created through [`Binding::operation`].
    #[builder(default, setter(into, strip_option))]
    pub namespace: Option<String>,

    /// Preferred `(prefix, uri)` pairs for the envelope.
    #[builder(default)]
    pub namespaces: Vec<(String, String)>,

    /// Overrides the transport derived from the URL scheme.
    #[builder(default, setter(strip_option))]
    pub transport: Option<Arc<dyn TransportFactory>>,

    #[builder(default)]
    pub auth_style: AuthStyle,

    #[builder(default, setter(strip_option))]
    pub credentials: Option<Credentials>,

    /// Extra HTTP headers sent with every request.
    #[builder(default)]
    pub headers: Vec<(String, String)>,

    /// Static `SOAPAction`.
    #[builder(default, setter(into, strip_option))]
    pub soap_action: Option<String>,

    /// WS-Addressing namespace; addressing headers are written when set.
    #[builder(default, setter(into, strip_option))]
    pub ws_address_uri: Option<String>,

    #[builder(default, setter(strip_option))]
    pub signer: Option<Arc<dyn SignatureHandler>>,

    #[builder(default, setter(strip_option))]
    pub reply_types: Option<ReplyTypes>,

    #[builder(default)]
    pub checking: TypeChecking,

    #[builder(default)]
    pub transport_options: TransportOptions,
}

/// Per-request settings.
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct SendOptions {
    /// `SOAPAction` for this request, instead of the binding's.
    #[builder(default, setter(into, strip_option))]
    pub soap_action: Option<String>,

    /// WS-Addressing `Action` of the request.
    #[builder(default, setter(into, strip_option))]
    pub ws_action: Option<String>,

    /// Additional `(prefix, uri)` pairs for this envelope.
    #[builder(default)]
    pub namespaces: Vec<(String, String)>,

    #[builder(default, setter(into, strip_option))]
    pub encoding_style: Option<String>,

    /// Serializes the payload with this typecode whatever the payload carries.
    #[builder(default, setter(strip_option))]
    pub request_typecode: Option<Arc<dyn TypeCode>>,

    /// Objects written into the SOAP header.
    #[builder(default)]
    pub soap_headers: Vec<TypedObject>,
}

/// Per-reply settings.
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct ReceiveOptions {
    /// WS-Addressing `Action` the reply must carry.
    #[builder(default, setter(into, strip_option))]
    pub ws_action: Option<String>,
}

#[derive(Debug)]
pub struct Binding {
    url: Option<String>,
    namespace: Option<String>,
    namespaces: Vec<(String, String)>,
    transport: Option<Arc<dyn TransportFactory>>,
    auth_style: AuthStyle,
    credentials: Option<Credentials>,
    headers: Vec<(String, String)>,
    cookies: Mutex<CookieJar>,
    soap_action: Option<String>,
    ws_address_uri: Option<String>,
    signer: Option<Arc<dyn SignatureHandler>>,
    reply_types: Option<ReplyTypes>,
    checking: TypeChecking,
    transport_options: TransportOptions,
}

fn check_credentials(style: AuthStyle, credentials: Option<&Credentials>) -> Result<(), ConfigError> {
    if !style.is_empty() && credentials.is_none() {
        return Err(ConfigError::MissingCredentials(style));
    }
    Ok(())
}

fn request_target(url: &Url) -> String {
    url.query()
        .map_or_else(|| url.path().to_owned(), |query| format!("{}?{query}", url.path()))
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    url.port()
        .map_or_else(|| host.to_owned(), |port| format!("{host}:{port}"))
}

fn is_array(root: &Element<'_>) -> bool {
    let typed_array = root
        .attribute_ns(ns::XSI, "type")
        .is_some_and(|value| root.resolve_qname(value).1 == "Array");
    typed_array || root.attribute_ns(ns::SOAP_ENC, "arrayType").is_some()
}

impl Binding {
    pub fn new(config: BindingConfig) -> Result<Self, ConfigError> {
        check_credentials(config.auth_style, config.credentials.as_ref())?;

        Ok(Self {
            url: config.url,
            namespace: config.namespace,
            namespaces: config.namespaces,
            transport: config.transport,
            auth_style: config.auth_style,
            credentials: config.credentials,
            headers: config.headers,
            cookies: Mutex::new(CookieJar::new()),
            soap_action: config.soap_action,
            ws_address_uri: config.ws_address_uri,
            signer: config.signer,
            reply_types: config.reply_types,
            checking: config.checking,
            transport_options: config.transport_options,
        })
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn auth_style(&self) -> AuthStyle {
        self.auth_style
    }

    pub fn checking(&self) -> TypeChecking {
        self.checking
    }

    pub(crate) fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub(crate) fn signer(&self) -> Option<&dyn SignatureHandler> {
        self.signer.as_deref()
    }

    pub(crate) fn transport_options(&self) -> &TransportOptions {
        &self.transport_options
    }

    /// Replaces authentication. Credentials are required for any style but `NONE`.
    pub fn set_auth(&mut self, style: AuthStyle, credentials: Option<Credentials>) -> Result<&mut Self, ConfigError> {
        check_credentials(style, credentials.as_ref())?;
        self.auth_style = style;
        self.credentials = credentials;
        Ok(self)
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = Some(url.into());
        self
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn reset_headers(&mut self) -> &mut Self {
        self.headers.clear();
        self
    }

    pub fn reset_cookies(&mut self) -> &mut Self {
        self.cookies
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self
    }

    /// A copy of the current cookie jar.
    pub fn cookies(&self) -> CookieJar {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn merge_cookies<'a>(&self, set_cookies: impl Iterator<Item = &'a str>) {
        let mut jar = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        for set_cookie in set_cookies {
            jar.load(set_cookie);
        }
    }

    pub(crate) fn cookie_header(&self) -> Option<String> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .header_value()
    }

    /// Digest answers 401 challenges unless HTTP Basic already authenticates every request.
    pub(crate) fn uses_digest(&self) -> bool {
        self.auth_style.contains(AuthStyle::HTTP_DIGEST) && !self.auth_style.contains(AuthStyle::HTTP_BASIC)
    }

    /// A proxy for calling `name` in the binding's namespace.
    pub fn operation(&self, name: &str) -> Operation<'_> {
        let name = self
            .namespace
            .as_ref()
            .map_or_else(|| QName::local(name), |namespace| QName::new(namespace.clone(), name));
        Operation::new(self, name)
    }

    fn resolve_url(&self, url: Option<&str>) -> Result<Url, ConfigError> {
        let url = match (url, self.url.as_deref(), &self.transport) {
            (Some(url), _, _) | (None, Some(url), _) => url,
            (None, None, None) => return Err(ConfigError::NoTransportOrUrl),
            (None, None, Some(_)) => return Err(ConfigError::MissingUrl),
        };
        Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
            url: url.to_owned(),
            source,
        })
    }

    fn transport_for(&self, url: &Url) -> Result<Arc<dyn TransportFactory>, ConfigError> {
        if let Some(transport) = &self.transport {
            return Ok(Arc::clone(transport));
        }
        transport::for_scheme(url.scheme()).ok_or_else(|| ConfigError::UnsupportedScheme(url.scheme().to_owned()))
    }

    /// Builds the envelope for `operation` and sends it. Does not wait for the reply.
    #[instrument(name = "binding.send", level = "info", skip_all, fields(operation = %operation), err)]
    pub fn send(
        &self,
        url: Option<&str>,
        operation: &QName,
        payload: &Payload,
        options: &SendOptions,
    ) -> Result<Call<'_>, SoapError> {
        let url = self.resolve_url(url)?;

        let mut sw = SoapWriter::new(self.checking)
            .with_encoding_style(options.encoding_style.clone())
            .with_namespaces(self.namespaces.iter().chain(&options.namespaces).cloned());

        payload::serialize_payload(&mut sw, operation, payload, options.request_typecode.as_deref())?;

        for header in &options.soap_headers {
            let element = header.serialize(&mut sw)?;
            sw.add_header_element(element);
        }

        if self.auth_style.contains(AuthStyle::HEADER_BASIC) {
            let credentials = self
                .credentials
                .as_ref()
                .ok_or(ConfigError::MissingCredentials(self.auth_style))?;
            let element = credentials.header_element(&mut sw);
            sw.add_header_element(element);
        }

        let soap_action = options
            .soap_action
            .as_deref()
            .or(self.soap_action.as_deref())
            .unwrap_or_default()
            .trim_matches('"');

        let address = match &self.ws_address_uri {
            Some(namespace) => {
                // Without an explicit WS action the request's SOAPAction stands in.
                let ws_action = match options.ws_action.as_deref() {
                    Some(ws_action) => {
                        if let Some(static_action) = self.soap_action.as_deref().filter(|a| !a.is_empty()) {
                            check_soap_action(static_action, ws_action)?;
                        }
                        ws_action
                    }
                    None => soap_action,
                };
                let address = WsAddress::request(namespace.clone(), url.as_str(), ws_action);
                address.serialize(&mut sw);
                Some(address)
            }
            None => None,
        };

        if let Some(signer) = &self.signer {
            signer.sign(&mut sw)?;
        }

        let message = sw.into_message()?;
        // header BasicAuth puts the password in the envelope
        if !self.auth_style.contains(AuthStyle::HEADER_BASIC) {
            trace!(envelope = %String::from_utf8_lossy(&message.body), "request");
        }

        let mut request = HttpRequest::post(request_target(&url), message.body)
            .with_header("Host", host_header(&url));
        let content_length = request.body.len().to_string();
        request = request
            .with_header("Content-Length", content_length)
            .with_header("Content-Type", message.content_type);
        if let Some(cookie) = self.cookie_header() {
            request = request.with_header("Cookie", cookie);
        }
        request = request.with_header("SOAPAction", format!("\"{soap_action}\""));
        let basic = self
            .credentials
            .as_ref()
            .filter(|_| self.auth_style.contains(AuthStyle::HTTP_BASIC));
        if let Some(credentials) = basic {
            request = request.with_header("Authorization", credentials.basic_authorization());
        }
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }

        let transport = self.transport_for(&url)?;
        let mut connection = transport.connect(&url, &self.transport_options)?;
        connection.send_request(&request)?;
        info!(url = %url, soap_action, "request sent");

        Ok(Call::new(self, url, transport, connection, request, address)
            .with_framing(message.boundary, message.start_cid))
    }

    /// Decodes the reply of `call`.
    ///
    /// Faults come back as [`SoapError::Fault`]. Without `reply_type`, the children of
    /// the reply wrapper are decoded through the binding's reply types when it has them,
    /// otherwise the whole reply is decoded as `xsd:anyType`.
    #[instrument(name = "binding.receive", level = "info", skip_all, err)]
    pub fn receive(
        &self,
        call: &mut Call<'_>,
        reply_type: Option<&dyn TypeCode>,
        options: &ReceiveOptions,
    ) -> Result<Value, SoapError> {
        let address = call.address().cloned();
        let parsed = call.receive_soap()?;

        if parsed.is_a_fault() {
            let fault = soapbind_protocol::Fault::from_fault_message(parsed)?;
            info!(code = %fault.code, string = %fault.string, "fault received");
            return Err(fault.into());
        }

        let value = match (reply_type, &self.reply_types) {
            (Some(typecode), _) => parsed.parse_body(typecode)?,
            (None, Some(table)) if !parsed.body_root().is_some_and(is_array) => Self::parse_by_table(parsed, table)?,
            (None, _) => parsed.parse_body(&AnyType::new())?,
        };

        if let Some(address) = address {
            address.check_response(parsed, options.ws_action.as_deref())?;
        }

        Ok(value)
    }

    fn parse_by_table(parsed: &ParsedSoap, table: &ReplyTypes) -> Result<Value, TypeCodeError> {
        let root = parsed
            .body_root()
            .ok_or_else(|| TypeCodeError::at(parsed.body(), "SOAP body is empty"))?;
        let ctx = parsed.context();
        let fallback = AnyType::as_list();

        let mut fields = Vec::new();
        for child in root.children() {
            let value = match table.get(child.name()) {
                Some(typecode) => typecode.parse(child, &ctx).or_else(|e| {
                    debug!(element = child.name(), error = %e, "reply type failed, decoding as anyType");
                    fallback.parse(child, &ctx)
                })?,
                None => {
                    debug!(element = child.name(), "no reply type, decoding as anyType");
                    fallback.parse(child, &ctx)?
                }
            };
            fields.push((child.name().to_owned(), value));
        }

        Ok(Value::Struct(fields))
    }

    /// [`Binding::send`] then [`Binding::receive`].
    pub fn rpc(
        &self,
        url: Option<&str>,
        operation: &QName,
        payload: &Payload,
        reply_type: Option<&dyn TypeCode>,
        send_options: &SendOptions,
        receive_options: &ReceiveOptions,
    ) -> Result<Value, SoapError> {
        let mut call = self.send(url, operation, payload, send_options)?;
        self.receive(&mut call, reply_type, receive_options)
    }
}
