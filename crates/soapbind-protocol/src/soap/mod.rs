//! SOAP 1.1 envelopes: writing requests, reading responses and MIME multipart framing.
pub mod mime;
mod parsed;
mod writer;

pub use mime::{MimeError, MimePart, MultipartMessage};
pub use parsed::{EnvelopeError, ParsedSoap};
pub use writer::{OutboundMessage, SoapWriter};
