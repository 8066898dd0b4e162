//! Declarative type descriptors that map native values to XML elements and back.
pub mod any;
pub mod attachment;
pub mod compound;
pub mod enumeration;
pub mod numbers;
pub mod registry;
pub mod string;

use std::fmt::Debug;
use std::sync::Arc;

use soapbind_xml::builder::Element;

use crate::soap::{MimePart, SoapWriter};
use crate::{NativeKind, QName, Value, ns};

pub use any::AnyType;
pub use attachment::AttachmentRef;
pub use compound::{ArrayType, Field, StructType};
pub use enumeration::{Enumeration, EnumerationBase, FloatEnumeration, IntEnumeration};
pub use numbers::*;
pub use registry::{Registry, registry};
pub use string::XsdString;

/// How strictly native values and choice sets are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeChecking {
    /// Wrong native kinds are rejected.
    #[default]
    Strict,
    /// Numeric text and integral floats are coerced where a number is expected.
    Lenient,
}

/// State shared by the typecodes while decoding one message.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub checking: TypeChecking,
    /// MIME parts that arrived with the envelope, looked up by content id.
    pub attachments: &'a [MimePart],
}

impl ParseContext<'static> {
    pub fn new(checking: TypeChecking) -> Self {
        Self {
            checking,
            attachments: &[],
        }
    }
}

impl<'a> ParseContext<'a> {
    pub fn with_attachments(mut self, attachments: &'a [MimePart]) -> Self {
        self.attachments = attachments;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeCodeError {
    /// The data does not match the typecode.
    #[error("{message}{}", location_suffix(.location))]
    Validation {
        message: String,
        location: Option<String>,
    },

    /// The typecode itself cannot be used.
    #[error("typecode configuration error: {0}")]
    Configuration(String),

    #[error("XML error: {0}")]
    Xml(String),
}

#[allow(clippy::ref_option)]
fn location_suffix(location: &Option<String>) -> String {
    location
        .as_deref()
        .map(|l| format!(" [{l}]"))
        .unwrap_or_default()
}

impl TypeCodeError {
    /// Validation error located at `element`.
    pub fn at(element: &Element<'_>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            location: element.location().map(str::to_owned),
        }
    }

    /// Validation error raised while serializing, before any element exists.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            location: None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. } => message,
            Self::Configuration(message) | Self::Xml(message) => message,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Validation { location, .. } => location.as_deref(),
            Self::Configuration(_) | Self::Xml(_) => None,
        }
    }
}

/// A type descriptor.
///
/// Typecodes are immutable and shared between threads through `Arc<dyn TypeCode>`.
pub trait TypeCode: Send + Sync + Debug {
    /// Qualified XML Schema type name, emitted as `xsi:type` when typing is on.
    fn type_name(&self) -> &QName;

    /// Local type names accepted in an incoming `xsi:type`.
    fn parse_list(&self) -> &[String];

    /// Native kinds this typecode serializes when no typecode is given explicitly.
    fn serial_list(&self) -> &[NativeKind];

    fn parse(&self, element: &Element<'_>, ctx: &ParseContext<'_>) -> Result<Value, TypeCodeError>;

    fn serialize(
        &self,
        value: &Value,
        name: &QName,
        sw: &mut SoapWriter,
    ) -> Result<Element<'static>, TypeCodeError>;
}

/// A value that carries its own typecode and element name.
#[derive(Debug, Clone)]
pub struct TypedObject {
    pub name: QName,
    pub typecode: Arc<dyn TypeCode>,
    pub value: Value,
}

impl TypedObject {
    pub fn new(name: QName, typecode: Arc<dyn TypeCode>, value: impl Into<Value>) -> Self {
        Self {
            name,
            typecode,
            value: value.into(),
        }
    }

    pub fn serialize(&self, sw: &mut SoapWriter) -> Result<Element<'static>, TypeCodeError> {
        self.typecode.serialize(&self.value, &self.name, sw)
    }
}

pub(crate) fn is_nil(element: &Element<'_>) -> bool {
    matches!(
        element.attribute_ns(ns::XSI, "nil").map(str::trim),
        Some("1" | "true")
    )
}

/// The `xsi:type` of `element`, resolved against its in-scope namespaces.
pub(crate) fn xsi_type<'e>(element: &'e Element<'_>) -> Option<(Option<&'e str>, &'e str)> {
    element
        .attribute_ns(ns::XSI, "type")
        .map(|value| element.resolve_qname(value))
}

/// Rejects an `xsi:type` the typecode does not accept.
pub(crate) fn check_type(tc: &dyn TypeCode, element: &Element<'_>) -> Result<(), TypeCodeError> {
    let Some((_, local)) = xsi_type(element) else {
        return Ok(());
    };

    let accepted = tc.parse_list();
    if accepted.is_empty() || accepted.iter().any(|name| name == local) {
        return Ok(());
    }

    Err(TypeCodeError::at(
        element,
        format!(
            "unexpected xsi:type {local:?} for {}, expected one of {accepted:?}",
            tc.type_name().local
        ),
    ))
}

/// Direct text of a simple-content element.
pub(crate) fn simple_text(tc: &dyn TypeCode, element: &Element<'_>) -> Result<String, TypeCodeError> {
    if element.has_child_elements() {
        return Err(TypeCodeError::at(
            element,
            format!("{} expects simple content, found child elements", tc.type_name().local),
        ));
    }
    Ok(element.text())
}

/// `<name>text</name>`, with `xsi:type` when the writer produces encoded output.
pub(crate) fn simple_element(
    tc: &dyn TypeCode,
    text: String,
    name: &QName,
    sw: &mut SoapWriter,
) -> Element<'static> {
    let element = sw.element(name).set_text(text);
    if sw.is_typed() {
        element.add_attribute(sw.type_attribute(tc.type_name()))
    } else {
        element
    }
}

pub(crate) fn nil_element(name: &QName, sw: &mut SoapWriter) -> Element<'static> {
    let nil = sw.attribute(ns::XSI, "nil", "1");
    sw.element(name).add_attribute(nil)
}

pub(crate) fn wrong_kind(tc: &dyn TypeCode, value: &Value) -> TypeCodeError {
    TypeCodeError::invalid(format!(
        "cannot serialize a {} value as {}",
        value.kind(),
        tc.type_name().local
    ))
}
