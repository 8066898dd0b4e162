//! Native values exchanged with typecodes.
use std::fmt;

use num_bigint::BigInt;

/// Classification of a [`Value`] used to pick a typecode when none is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Nil,
    /// Integer within the 32-bit signed range.
    Int,
    /// Integer within the 64-bit signed range, outside the 32-bit one.
    Long,
    /// Any larger integer.
    BigInt,
    Float,
    Str,
    Bytes,
    List,
    Struct,
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nil => "nil",
            Self::Int => "int",
            Self::Long => "long",
            Self::BigInt => "big integer",
            Self::Float => "float",
            Self::Str => "string",
            Self::Bytes => "bytes",
            Self::List => "list",
            Self::Struct => "struct",
        };
        f.write_str(name)
    }
}

/// A native value.
///
/// Integers that fit in `i128` are always held as [`Value::Int`]; [`Value::BigInt`] is
/// reserved for larger magnitudes, so equality between integers is structural.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Int(i128),
    BigInt(BigInt),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Ordered named fields. Names may repeat.
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn kind(&self) -> NativeKind {
        match self {
            Self::Nil => NativeKind::Nil,
            Self::Int(v) if i32::try_from(*v).is_ok() => NativeKind::Int,
            Self::Int(v) if i64::try_from(*v).is_ok() => NativeKind::Long,
            Self::Int(_) | Self::BigInt(_) => NativeKind::BigInt,
            Self::Float(_) => NativeKind::Float,
            Self::Str(_) => NativeKind::Str,
            Self::Bytes(_) => NativeKind::Bytes,
            Self::List(_) => NativeKind::List,
            Self::Struct(_) => NativeKind::Struct,
        }
    }

    /// Parses an XML Schema integer literal, choosing the narrowest representation.
    pub fn integer(text: &str) -> Option<Self> {
        let text = text.trim();
        let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
        // `BigInt` also takes `_` separators, which XML Schema does not.
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse::<BigInt>().ok().map(Self::from)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_) | Self::BigInt(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&[(String, Value)]> {
        match self {
            Self::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// First field called `name` of a struct value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_struct()?
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        i128::try_from(&value).map_or(Self::BigInt(value), Self::Int)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Int(i128::from(v))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&crate::typecode::numbers::format_float(*v)),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Struct(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_kinds_follow_ranges() {
        assert_eq!(Value::from(7).kind(), NativeKind::Int);
        assert_eq!(Value::from(i64::from(i32::MAX) + 1).kind(), NativeKind::Long);
        assert_eq!(Value::from(u64::MAX).kind(), NativeKind::BigInt);
        assert_eq!(
            Value::integer("123456789012345678901234567890123456789012").map(|v| v.kind()),
            Some(NativeKind::BigInt)
        );
    }

    #[test]
    fn integer_literals_are_normalized() {
        assert_eq!(Value::integer(" +0042 "), Some(Value::Int(42)));
        assert_eq!(Value::integer("-0"), Some(Value::Int(0)));
        assert_eq!(Value::integer("4.2"), None);
        assert_eq!(Value::integer(""), None);
    }

    #[test]
    fn integers_beyond_i128_stay_big() {
        let Some(Value::BigInt(big)) = Value::integer("-100000000000000000000000000000000000000000") else {
            panic!("expected a big integer");
        };
        assert!(big < BigInt::from(i128::MIN));
        assert_eq!(Value::from(BigInt::from(-5)), Value::Int(-5));
        assert_eq!(Value::integer("1_000"), None);
        assert_eq!(Value::integer("+-1"), None);
    }

    #[test]
    fn struct_fields_are_looked_up_by_name() {
        let value = Value::Struct(vec![
            ("a".to_owned(), Value::from(1)),
            ("b".to_owned(), Value::from("two")),
        ]);

        assert_eq!(value.field("b"), Some(&Value::from("two")));
        assert_eq!(value.field("c"), None);
        assert_eq!(value.to_string(), r#"{a: 1, b: "two"}"#);
    }
}
