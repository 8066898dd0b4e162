//! SOAP 1.1 faults.
//!
//! A [`Fault`] is both the error a client gets back for a `soapenv:Fault` response and
//! the value a service would serialize to report one.
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

use soapbind_xml::builder::Element;

use crate::soap::{ParsedSoap, SoapWriter};
use crate::typecode::{TypeChecking, TypeCodeError};
use crate::{QName, ns};

pub const FAULT_NOT_UNDERSTOOD: &str = "SOAP mustUnderstand not understood";
pub const FAULT_ACTOR: &str = "Cannot process specified actor";
pub const FAULT_UNPARSEABLE: &str = "Unparseable message";
pub const FAULT_PROCESSING: &str = "Processing Failure";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultCode {
    Client,
    Server,
    MustUnderstand,
    /// Any other code, kept as the qualified text found in the message.
    Other(String),
}

impl FaultCode {
    fn from_element(element: &Element<'_>) -> Self {
        let text = element.text();
        let text = text.trim();
        match element.resolve_qname(text) {
            (Some(ns::SOAP_ENV), "Client") => Self::Client,
            (Some(ns::SOAP_ENV), "Server") => Self::Server,
            (Some(ns::SOAP_ENV), "MustUnderstand") => Self::MustUnderstand,
            _ => Self::Other(text.to_owned()),
        }
    }

    fn to_qualified_text(&self, sw: &mut SoapWriter) -> String {
        let local = match self {
            Self::Client => "Client",
            Self::Server => "Server",
            Self::MustUnderstand => "MustUnderstand",
            Self::Other(text) => return text.clone(),
        };
        sw.qualified(&QName::new(ns::SOAP_ENV, local))
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("soapenv:Client"),
            Self::Server => f.write_str("soapenv:Server"),
            Self::MustUnderstand => f.write_str("soapenv:MustUnderstand"),
            Self::Other(text) => f.write_str(text),
        }
    }
}

/// One item of a fault `detail` (or of the header detail).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultDetail {
    /// Plain text content of `detail`.
    Text(String),
    /// `zsi:FaultDetail`: a processing failure and where it happened.
    Processing { string: String, trace: Option<String> },
    /// `zsi:URIFaultDetail`: the header element that was not understood.
    Uri { uri: String, localname: String },
    /// `zsi:ActorFaultDetail`.
    Actor { uri: String },
    /// `zsi:ParseFaultDetail`: why the message could not be decoded.
    Parse { string: String, trace: String },
    /// Any other element, as serialized XML.
    Raw(String),
}

impl FaultDetail {
    fn vendor_element(sw: &mut SoapWriter, name: &str, fields: &[(&str, &str)]) -> Element<'static> {
        let children = fields
            .iter()
            .map(|(field, text)| sw.element(&QName::new(ns::ZSI, *field)).set_text((*text).to_owned()))
            .collect();
        sw.element(&QName::new(ns::ZSI, name)).add_children(children)
    }

    fn append_to(&self, parent: Element<'static>, sw: &mut SoapWriter) -> Element<'static> {
        match self {
            Self::Text(text) => parent.add_text(text.clone()),
            Self::Raw(xml) => parent.add_raw(xml.clone()),
            Self::Processing { string, trace } => {
                let mut fields = vec![("string", string.as_str())];
                if let Some(trace) = trace {
                    fields.push(("trace", trace.as_str()));
                }
                parent.add_child(Self::vendor_element(sw, "FaultDetail", &fields))
            }
            Self::Uri { uri, localname } => parent.add_child(Self::vendor_element(
                sw,
                "URIFaultDetail",
                &[("URI", uri.as_str()), ("localname", localname.as_str())],
            )),
            Self::Actor { uri } => {
                parent.add_child(Self::vendor_element(sw, "ActorFaultDetail", &[("URI", uri.as_str())]))
            }
            Self::Parse { string, trace } => parent.add_child(Self::vendor_element(
                sw,
                "ParseFaultDetail",
                &[("string", string.as_str()), ("trace", trace.as_str())],
            )),
        }
    }

    fn from_element(element: &Element<'_>) -> Result<Self, TypeCodeError> {
        let field = |name: &str| element.child(name).map(Element::text);

        if element.namespace() == Some(ns::ZSI) {
            match element.name() {
                "FaultDetail" => {
                    return Ok(Self::Processing {
                        string: field("string").unwrap_or_default(),
                        trace: field("trace"),
                    });
                }
                "URIFaultDetail" => {
                    return Ok(Self::Uri {
                        uri: field("URI").unwrap_or_default(),
                        localname: field("localname").unwrap_or_default(),
                    });
                }
                "ActorFaultDetail" => {
                    return Ok(Self::Actor {
                        uri: field("URI").unwrap_or_default(),
                    });
                }
                "ParseFaultDetail" => {
                    return Ok(Self::Parse {
                        string: field("string").unwrap_or_default(),
                        trace: field("trace").unwrap_or_default(),
                    });
                }
                _ => {}
            }
        }

        element
            .clone()
            .into_owned()
            .into_detached()
            .to_xml_string()
            .map(Self::Raw)
            .map_err(|e| TypeCodeError::Xml(e.to_string()))
    }

    fn parse_items(detail: &Element<'_>) -> Result<Vec<Self>, TypeCodeError> {
        if !detail.has_child_elements() {
            let text = detail.text();
            return Ok(if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![Self::Text(text)]
            });
        }
        detail.children().map(Self::from_element).collect()
    }
}

impl fmt::Display for FaultDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) | Self::Raw(text) => f.write_str(text),
            Self::Processing { string, trace: None } => f.write_str(string),
            Self::Processing {
                string,
                trace: Some(trace),
            } => write!(f, "{string}\n[trace: {trace}]"),
            Self::Uri { uri, localname } => write!(f, "not understood: {{{uri}}}{localname}"),
            Self::Actor { uri } => write!(f, "actor: {uri}"),
            Self::Parse { string, trace } if trace.is_empty() => f.write_str(string),
            Self::Parse { string, trace } => write!(f, "{string}\n[trace: {trace}]"),
        }
    }
}

/// A SOAP fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: FaultCode,
    pub string: String,
    pub actor: Option<String>,
    pub detail: Option<Vec<FaultDetail>>,
    /// Detail about header processing, carried in the SOAP header as `zsi:detail`.
    pub header_detail: Option<Vec<FaultDetail>>,
}

impl Fault {
    pub fn new(code: FaultCode, string: impl Into<String>) -> Self {
        Self {
            code,
            string: string.into(),
            actor: None,
            detail: None,
            header_detail: None,
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_detail(mut self, detail: Vec<FaultDetail>) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_header_detail(mut self, header_detail: Vec<FaultDetail>) -> Self {
        self.header_detail = Some(header_detail);
        self
    }

    /// A mandatory header element was not understood.
    pub fn not_understood(uri: impl Into<String>, localname: impl Into<String>, actor: Option<String>) -> Self {
        Self::new(FaultCode::MustUnderstand, FAULT_NOT_UNDERSTOOD)
            .with_actor(actor)
            .with_header_detail(vec![FaultDetail::Uri {
                uri: uri.into(),
                localname: localname.into(),
            }])
    }

    /// A header was targeted at an actor this node does not play.
    pub fn from_actor(uri: impl Into<String>, actor: Option<String>) -> Self {
        Self::new(FaultCode::Client, FAULT_ACTOR)
            .with_actor(actor)
            .with_header_detail(vec![FaultDetail::Actor { uri: uri.into() }])
    }

    /// The message could not be decoded.
    pub fn from_parse_error(err: &TypeCodeError, in_header: bool, actor: Option<String>) -> Self {
        let detail = FaultDetail::Parse {
            string: err.message().to_owned(),
            trace: err.location().unwrap_or_default().to_owned(),
        };
        let fault = Self::new(FaultCode::Client, FAULT_UNPARSEABLE).with_actor(actor);
        if in_header {
            fault.with_header_detail(vec![detail])
        } else {
            fault.with_detail(vec![detail])
        }
    }

    /// Processing failed with `err`. The detail names the error type as `module:Type`.
    pub fn from_exception<E>(
        err: &E,
        in_header: bool,
        trace: Option<&Backtrace>,
        actor: Option<String>,
    ) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let type_name = std::any::type_name::<E>();
        let error_name = match type_name.rsplit_once("::") {
            Some((module, name)) => format!("{module}:{name}"),
            None => type_name.to_owned(),
        };

        let detail = FaultDetail::Processing {
            string: format!("{error_name}\n{err}"),
            trace: trace
                .filter(|bt| bt.status() == BacktraceStatus::Captured)
                .map(ToString::to_string),
        };

        let fault = Self::new(FaultCode::Server, FAULT_PROCESSING).with_actor(actor);
        if in_header {
            fault.with_header_detail(vec![detail])
        } else {
            fault.with_detail(vec![detail])
        }
    }

    /// The `soapenv:Fault` body element.
    pub fn to_element(&self, sw: &mut SoapWriter) -> Element<'static> {
        let code = self.code.to_qualified_text(sw);
        let mut fault = sw
            .element(&QName::new(ns::SOAP_ENV, "Fault"))
            .add_child(Element::new("faultcode").set_text(code))
            .add_child(Element::new("faultstring").set_text(self.string.clone()));

        if let Some(actor) = &self.actor {
            fault = fault.add_child(
                sw.element(&QName::new(ns::SOAP_ENV, "faultactor"))
                    .set_text(actor.clone()),
            );
        }

        if let Some(items) = &self.detail {
            let detail = items
                .iter()
                .fold(Element::new("detail"), |detail, item| item.append_to(detail, sw));
            fault = fault.add_child(detail);
        }

        fault
    }

    /// Writes the fault into the body. Header detail is not written.
    pub fn serialize(&self, sw: &mut SoapWriter) {
        let element = self.to_element(sw);
        sw.add_body_element(element);
    }

    /// A complete fault envelope, header detail included.
    pub fn as_soap(&self) -> Result<String, TypeCodeError> {
        let mut sw = SoapWriter::new(TypeChecking::Strict);
        self.serialize(&mut sw);

        if let Some(items) = &self.header_detail {
            let header = sw.element(&QName::new(ns::ZSI, "detail"));
            let header = items
                .iter()
                .fold(header, |header, item| item.append_to(header, &mut sw));
            sw.add_header_element(header);
        }

        sw.envelope()
    }

    /// Rebuilds the fault carried in the body of `parsed`.
    ///
    /// Only the body is read, so header detail is never recovered.
    pub fn from_fault_message(parsed: &ParsedSoap) -> Result<Self, TypeCodeError> {
        let fault = parsed
            .body_root()
            .filter(|root| root.is_named(Some(ns::SOAP_ENV), "Fault"))
            .ok_or_else(|| TypeCodeError::at(parsed.body(), "body does not hold a SOAP fault"))?;

        let code = fault
            .child("faultcode")
            .ok_or_else(|| TypeCodeError::at(fault, "fault without faultcode"))?;
        let string = fault
            .child("faultstring")
            .ok_or_else(|| TypeCodeError::at(fault, "fault without faultstring"))?;

        let detail = fault.child("detail").map(FaultDetail::parse_items).transpose()?;

        Ok(Self {
            code: FaultCode::from_element(code),
            string: string.text(),
            actor: fault.child("faultactor").map(|actor| actor.text().trim().to_owned()),
            detail,
            header_detail: None,
        })
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)?;
        for item in self.detail.iter().flatten() {
            write!(f, "\n{item}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {}
