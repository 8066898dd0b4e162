//! Numeric typecodes restricted to a fixed set of choices.
use soapbind_xml::builder::Element;

use crate::soap::SoapWriter;
use crate::typecode::numbers::{coerce_float, coerce_integer};
use crate::typecode::{ParseContext, TypeChecking, TypeCode, TypeCodeError, XsdFloat, XsdInteger};
use crate::{NativeKind, QName, Value};

/// Base typecode of an [`Enumeration`]: decodes the value and defines choice equality.
pub trait EnumerationBase: TypeCode + Default {
    /// Name used in error messages, e.g. "an integer".
    const MEMBER_KIND: &'static str;

    /// Whether `value` is an acceptable choice in strict mode.
    fn is_member_kind(value: &Value) -> bool;

    /// `value` converted the way the base would serialize it, if possible.
    fn coerce(value: &Value, checking: TypeChecking) -> Option<Value>;
}

impl EnumerationBase for XsdInteger {
    const MEMBER_KIND: &'static str = "an integer";

    fn is_member_kind(value: &Value) -> bool {
        value.is_integer()
    }

    fn coerce(value: &Value, checking: TypeChecking) -> Option<Value> {
        coerce_integer(value, checking)
    }
}

impl EnumerationBase for XsdFloat {
    const MEMBER_KIND: &'static str = "a floating point number";

    fn is_member_kind(value: &Value) -> bool {
        matches!(value, Value::Float(_))
    }

    fn coerce(value: &Value, checking: TypeChecking) -> Option<Value> {
        coerce_float(value, checking).map(Value::Float)
    }
}

#[derive(Debug, Clone)]
enum Choices {
    Usable(Vec<Value>),
    /// The constructor got something that is not a sequence while checking was off.
    Unusable(NativeKind),
}

/// A numeric value limited to a frozen, ordered set of choices.
#[derive(Debug, Clone)]
pub struct Enumeration<B> {
    base: B,
    choices: Choices,
}

/// `xsd:integer` limited to a set of values.
pub type IntEnumeration = Enumeration<XsdInteger>;

/// `xsd:float` limited to a set of values.
pub type FloatEnumeration = Enumeration<XsdFloat>;

impl<B: EnumerationBase> Enumeration<B> {
    /// Builds the enumeration from a [`Value::List`] of choices.
    ///
    /// With [`TypeChecking::Strict`] a non-list argument or a member of the wrong kind is
    /// rejected. With [`TypeChecking::Lenient`] members are not checked, and a non-list
    /// argument yields an enumeration whose every use fails with a configuration error.
    pub fn new(choices: Value, checking: TypeChecking) -> Result<Self, TypeCodeError> {
        let choices = match (choices, checking) {
            (Value::List(items), _) => items,
            (other, TypeChecking::Strict) => {
                return Err(TypeCodeError::Configuration(format!(
                    "enumeration choices must be a list, not a {}",
                    other.kind()
                )));
            }
            (other, TypeChecking::Lenient) => {
                return Ok(Self {
                    base: B::default(),
                    choices: Choices::Unusable(other.kind()),
                });
            }
        };

        if checking == TypeChecking::Strict {
            if let Some(bad) = choices.iter().find(|c| !B::is_member_kind(c)) {
                return Err(TypeCodeError::Configuration(format!(
                    "enumeration choice {bad} is not {}",
                    B::MEMBER_KIND
                )));
            }
        }

        Ok(Self {
            base: B::default(),
            choices: Choices::Usable(choices),
        })
    }

    /// Builds the enumeration from any sequence of values.
    pub fn from_choices<I, V>(choices: I, checking: TypeChecking) -> Result<Self, TypeCodeError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            Value::List(choices.into_iter().map(Into::into).collect()),
            checking,
        )
    }

    /// The choices, or `None` when the enumeration was built from a non-sequence.
    pub fn choices(&self) -> Option<&[Value]> {
        match &self.choices {
            Choices::Usable(choices) => Some(choices),
            Choices::Unusable(_) => None,
        }
    }

    fn usable(&self) -> Result<&[Value], TypeCodeError> {
        match &self.choices {
            Choices::Usable(choices) => Ok(choices),
            Choices::Unusable(kind) => Err(TypeCodeError::Configuration(format!(
                "enumeration was built from a {kind} instead of a list of choices"
            ))),
        }
    }

    fn contains(choices: &[Value], value: &Value) -> bool {
        choices.iter().any(|choice| match (choice, value) {
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => choice == value,
        })
    }
}

impl<B: EnumerationBase> TypeCode for Enumeration<B> {
    fn type_name(&self) -> &QName {
        self.base.type_name()
    }

    fn parse_list(&self) -> &[String] {
        self.base.parse_list()
    }

    fn serial_list(&self) -> &[NativeKind] {
        &[]
    }

    fn parse(&self, element: &Element<'_>, ctx: &ParseContext<'_>) -> Result<Value, TypeCodeError> {
        let choices = self.usable()?;
        let value = self.base.parse(element, ctx)?;

        if value.is_nil() || Self::contains(choices, &value) {
            return Ok(value);
        }

        Err(TypeCodeError::at(
            element,
            format!("value {value} not in enumeration list"),
        ))
    }

    fn serialize(
        &self,
        value: &Value,
        name: &QName,
        sw: &mut SoapWriter,
    ) -> Result<Element<'static>, TypeCodeError> {
        let choices = self.usable()?;

        if !value.is_nil() {
            let candidate = match sw.checking() {
                TypeChecking::Strict => value.clone(),
                TypeChecking::Lenient => {
                    B::coerce(value, TypeChecking::Lenient).unwrap_or_else(|| value.clone())
                }
            };
            if !Self::contains(choices, &candidate) {
                return Err(TypeCodeError::invalid(format!(
                    "value {value} not in enumeration list"
                )));
            }
        }

        self.base.serialize(value, name, sw)
    }
}
