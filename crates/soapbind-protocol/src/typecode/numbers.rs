//! XML Schema numeric types.
//!
//! Every integer type is declared with [`xsd_integer!`] and every floating point type
//! with [`xsd_float!`]; only the bounds and the native kinds they claim differ.
use num_bigint::Sign;
use soapbind_xml::builder::Element;

use crate::soap::SoapWriter;
use crate::typecode::{
    ParseContext, TypeChecking, TypeCode, TypeCodeError, check_type, is_nil, nil_element,
    simple_element, simple_text, wrong_kind,
};
use crate::{NativeKind, QName, Value, ns};

macro_rules! xsd_integer {
    ($xsd:ident, min: $min:expr, max: $max:expr, serial: [$($kind:ident),*]) => {
        paste::paste! {
            #[doc = concat!("`xsd:", stringify!($xsd), "`")]
            #[derive(Debug, Clone)]
            pub struct [<Xsd $xsd:camel>] {
                type_name: QName,
                parse_list: Vec<String>,
            }

            impl [<Xsd $xsd:camel>] {
                pub const MIN: Option<i128> = $min;
                pub const MAX: Option<i128> = $max;

                pub fn new() -> Self {
                    Self::default()
                }
            }

            impl Default for [<Xsd $xsd:camel>] {
                fn default() -> Self {
                    Self {
                        type_name: QName::new(ns::XSD, stringify!($xsd)),
                        parse_list: vec![stringify!($xsd).to_owned()],
                    }
                }
            }

            impl TypeCode for [<Xsd $xsd:camel>] {
                fn type_name(&self) -> &QName {
                    &self.type_name
                }

                fn parse_list(&self) -> &[String] {
                    &self.parse_list
                }

                fn serial_list(&self) -> &[NativeKind] {
                    &[$(NativeKind::$kind),*]
                }

                fn parse(
                    &self,
                    element: &Element<'_>,
                    _ctx: &ParseContext<'_>,
                ) -> Result<Value, TypeCodeError> {
                    parse_integer(self, element, Self::MIN, Self::MAX)
                }

                fn serialize(
                    &self,
                    value: &Value,
                    name: &QName,
                    sw: &mut SoapWriter,
                ) -> Result<Element<'static>, TypeCodeError> {
                    serialize_integer(self, value, name, sw, Self::MIN, Self::MAX)
                }
            }
        }
    };
}

macro_rules! xsd_float {
    ($xsd:ident, max: $max:expr, serial: [$($kind:ident),*]) => {
        paste::paste! {
            #[doc = concat!("`xsd:", stringify!($xsd), "`, including `INF`, `-INF` and `NaN`")]
            #[derive(Debug, Clone)]
            pub struct [<Xsd $xsd:camel>] {
                type_name: QName,
                parse_list: Vec<String>,
            }

            impl [<Xsd $xsd:camel>] {
                pub fn new() -> Self {
                    Self::default()
                }

                fn max() -> f64 {
                    $max
                }
            }

            impl Default for [<Xsd $xsd:camel>] {
                fn default() -> Self {
                    Self {
                        type_name: QName::new(ns::XSD, stringify!($xsd)),
                        parse_list: vec![stringify!($xsd).to_owned()],
                    }
                }
            }

            impl TypeCode for [<Xsd $xsd:camel>] {
                fn type_name(&self) -> &QName {
                    &self.type_name
                }

                fn parse_list(&self) -> &[String] {
                    &self.parse_list
                }

                fn serial_list(&self) -> &[NativeKind] {
                    &[$(NativeKind::$kind),*]
                }

                fn parse(
                    &self,
                    element: &Element<'_>,
                    _ctx: &ParseContext<'_>,
                ) -> Result<Value, TypeCodeError> {
                    parse_float(self, element, Self::max())
                }

                fn serialize(
                    &self,
                    value: &Value,
                    name: &QName,
                    sw: &mut SoapWriter,
                ) -> Result<Element<'static>, TypeCodeError> {
                    serialize_float(self, value, name, sw, Self::max())
                }
            }
        }
    };
}

xsd_integer!(unsignedByte, min: Some(0), max: Some(255), serial: []);
xsd_integer!(unsignedShort, min: Some(0), max: Some(65_535), serial: []);
xsd_integer!(unsignedInt, min: Some(0), max: Some(4_294_967_295), serial: []);
xsd_integer!(unsignedLong, min: Some(0), max: Some(18_446_744_073_709_551_615), serial: []);
xsd_integer!(byte, min: Some(-128), max: Some(127), serial: []);
xsd_integer!(short, min: Some(-32_768), max: Some(32_767), serial: []);
xsd_integer!(int, min: Some(-2_147_483_648), max: Some(2_147_483_647), serial: [Int]);
xsd_integer!(
    long,
    min: Some(-9_223_372_036_854_775_808),
    max: Some(9_223_372_036_854_775_807),
    serial: [Long]
);
xsd_integer!(integer, min: None, max: None, serial: [BigInt]);
xsd_integer!(negativeInteger, min: None, max: Some(-1), serial: []);
xsd_integer!(nonPositiveInteger, min: None, max: Some(0), serial: []);
xsd_integer!(nonNegativeInteger, min: Some(0), max: None, serial: []);
xsd_integer!(positiveInteger, min: Some(1), max: None, serial: []);

xsd_float!(float, max: f64::from(f32::MAX), serial: [Float]);
xsd_float!(double, max: f64::MAX, serial: []);

fn check_integer_range(
    tc: &dyn TypeCode,
    value: &Value,
    min: Option<i128>,
    max: Option<i128>,
) -> Result<(), String> {
    let in_range = match value {
        Value::Int(v) => min.is_none_or(|m| *v >= m) && max.is_none_or(|m| *v <= m),
        // Outside the i128 range, so only an unbounded side can hold it.
        Value::BigInt(big) => {
            if big.sign() == Sign::Minus {
                min.is_none()
            } else {
                max.is_none()
            }
        }
        _ => false,
    };

    if in_range {
        Ok(())
    } else {
        Err(format!(
            "value {value} out of range for {}",
            tc.type_name().local
        ))
    }
}

fn parse_integer(
    tc: &dyn TypeCode,
    element: &Element<'_>,
    min: Option<i128>,
    max: Option<i128>,
) -> Result<Value, TypeCodeError> {
    if is_nil(element) {
        return Ok(Value::Nil);
    }
    check_type(tc, element)?;

    let text = simple_text(tc, element)?;
    let value = Value::integer(&text).ok_or_else(|| {
        TypeCodeError::at(
            element,
            format!("invalid {} value: {:?}", tc.type_name().local, text.trim()),
        )
    })?;

    check_integer_range(tc, &value, min, max).map_err(|message| TypeCodeError::at(element, message))?;
    Ok(value)
}

/// Coerces `value` to an integer the way the writer's checking mode allows.
pub(crate) fn coerce_integer(value: &Value, checking: TypeChecking) -> Option<Value> {
    match (value, checking) {
        (Value::Int(_) | Value::BigInt(_), _) => Some(value.clone()),
        (Value::Str(text), TypeChecking::Lenient) => Value::integer(text),
        #[allow(clippy::cast_possible_truncation)]
        (Value::Float(v), TypeChecking::Lenient)
            if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e38 =>
        {
            Some(Value::Int(*v as i128))
        }
        _ => None,
    }
}

fn serialize_integer(
    tc: &dyn TypeCode,
    value: &Value,
    name: &QName,
    sw: &mut SoapWriter,
    min: Option<i128>,
    max: Option<i128>,
) -> Result<Element<'static>, TypeCodeError> {
    if value.is_nil() {
        return Ok(nil_element(name, sw));
    }

    let integer = coerce_integer(value, sw.checking()).ok_or_else(|| wrong_kind(tc, value))?;
    check_integer_range(tc, &integer, min, max).map_err(TypeCodeError::invalid)?;

    Ok(simple_element(tc, integer.to_string(), name, sw))
}

/// Parses the XML Schema float lexical space.
pub fn parse_float_literal(text: &str) -> Option<f64> {
    match text.trim() {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        // Rust also accepts "inf" and "nan" spellings, the schema does not.
        other
            if !other.is_empty()
                && other
                    .bytes()
                    .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E')) =>
        {
            other.parse().ok()
        }
        _ => None,
    }
}

pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "INF" } else { "-INF" };
        text.to_owned()
    } else {
        format!("{value:?}")
    }
}

fn check_float_range(tc: &dyn TypeCode, value: f64, max: f64) -> Result<(), String> {
    if value.is_finite() && value.abs() > max {
        return Err(format!(
            "value {} out of range for {}",
            format_float(value),
            tc.type_name().local
        ));
    }
    Ok(())
}

fn parse_float(tc: &dyn TypeCode, element: &Element<'_>, max: f64) -> Result<Value, TypeCodeError> {
    if is_nil(element) {
        return Ok(Value::Nil);
    }
    check_type(tc, element)?;

    let text = simple_text(tc, element)?;
    let value = parse_float_literal(&text).ok_or_else(|| {
        TypeCodeError::at(
            element,
            format!("invalid {} value: {:?}", tc.type_name().local, text.trim()),
        )
    })?;

    check_float_range(tc, value, max).map_err(|message| TypeCodeError::at(element, message))?;
    Ok(Value::Float(value))
}

/// Coerces `value` to a float the way the writer's checking mode allows.
pub(crate) fn coerce_float(value: &Value, checking: TypeChecking) -> Option<f64> {
    match (value, checking) {
        (Value::Float(v), _) => Some(*v),
        (Value::Int(_), _) => value.as_f64(),
        (Value::Str(text), TypeChecking::Lenient) => parse_float_literal(text),
        _ => None,
    }
}

fn serialize_float(
    tc: &dyn TypeCode,
    value: &Value,
    name: &QName,
    sw: &mut SoapWriter,
    max: f64,
) -> Result<Element<'static>, TypeCodeError> {
    if value.is_nil() {
        return Ok(nil_element(name, sw));
    }

    let float = coerce_float(value, sw.checking()).ok_or_else(|| wrong_kind(tc, value))?;
    check_float_range(tc, float, max).map_err(TypeCodeError::invalid)?;

    Ok(simple_element(tc, format_float(float), name, sw))
}
