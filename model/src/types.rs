use prost_types::FieldDescriptorProto;
use prost_types::field_descriptor_proto::{Label, Type};

use crate::index::SymbolIndex;
use crate::model::TypeNames;

pub const UNKNOWN_TYPE: &str = "<unknown>";
pub const UNKNOWN_DEFAULT: &str = "Unknown";

pub fn scalar_type_name(ty: Type) -> &'static str {
    match ty {
        Type::Bool => "bool",
        Type::Bytes => "bytes",
        Type::Double => "double",
        Type::Fixed32 => "fixed32",
        Type::Fixed64 => "fixed64",
        Type::Float => "float",
        Type::Int32 => "int32",
        Type::Int64 => "int64",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
        Type::String => "string",
        Type::Uint32 => "uint32",
        Type::Uint64 => "uint64",
        Type::Group | Type::Message | Type::Enum => UNKNOWN_TYPE,
    }
}

pub fn label_name(raw: Option<i32>) -> &'static str {
    match raw.and_then(|l| Label::try_from(l).ok()) {
        Some(Label::Optional) => "optional",
        Some(Label::Required) => "required",
        Some(Label::Repeated) => "repeated",
        None => UNKNOWN_TYPE,
    }
}

fn declared_type(field: &FieldDescriptorProto) -> Option<Type> {
    field.r#type.and_then(|t| Type::try_from(t).ok())
}

/// Short, long and full type of a field. Message and enum types go through
/// the index; scalars use their keyword everywhere.
pub fn field_type(field: &FieldDescriptorProto, index: &SymbolIndex) -> TypeNames {
    match declared_type(field) {
        Some(Type::Message | Type::Group | Type::Enum) => index.type_names(field.type_name()),
        Some(scalar) => TypeNames::scalar(scalar_type_name(scalar)),
        // Unresolved descriptors may carry only a type name.
        None if !field.type_name().is_empty() => index.type_names(field.type_name()),
        None => TypeNames::scalar(UNKNOWN_TYPE),
    }
}

/// Renders the declared default value, or "" when there is none. Defaults
/// that cannot be read for the declared type render as "Unknown".
pub fn default_value(field: &FieldDescriptorProto, index: &SymbolIndex) -> String {
    let Some(raw) = field.default_value.as_deref() else {
        return String::new();
    };
    let rendered = match declared_type(field) {
        Some(Type::String) => Some(format!("\"{raw}\"")),
        Some(Type::Bytes) => Some(format!("0x{}", to_hex(&unescape_bytes(raw)))),
        Some(Type::Bool) => match raw {
            "true" | "false" => Some(raw.to_string()),
            _ => None,
        },
        Some(Type::Float) => raw.parse::<f32>().ok().map(|v| format_float(v.into())),
        Some(Type::Double) => raw.parse::<f64>().ok().map(format_float),
        Some(Type::Int32 | Type::Sint32 | Type::Sfixed32) => canonical::<i32>(raw),
        Some(Type::Int64 | Type::Sint64 | Type::Sfixed64) => canonical::<i64>(raw),
        Some(Type::Uint32 | Type::Fixed32) => canonical::<u32>(raw),
        Some(Type::Uint64 | Type::Fixed64) => canonical::<u64>(raw),
        Some(Type::Enum) => index
            .enum_value(field.type_name(), raw)
            .map(str::to_string),
        Some(Type::Message | Type::Group) | None => None,
    };
    rendered.unwrap_or_else(|| UNKNOWN_DEFAULT.to_string())
}

fn canonical<T: std::str::FromStr + ToString>(raw: &str) -> Option<String> {
    raw.parse::<T>().ok().map(|v| v.to_string())
}

// printf `%g` with six significant digits, plus nan/inf spellings.
fn format_float(value: f64) -> String {
    const PRECISION: i32 = 6;
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Rounding to the target precision can bump the exponent (9.999995 -> 1e1),
    // so the exponent is read back from the rounded scientific form.
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// protoc stores bytes defaults C-escaped.
fn unescape_bytes(raw: &str) -> Vec<u8> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        i += 1;
        match bytes[i] {
            b'0'..=b'7' => {
                let start = i;
                while i < bytes.len() && i - start < 3 && (b'0'..=b'7').contains(&bytes[i]) {
                    i += 1;
                }
                let digits = &raw[start..i];
                out.push(u32::from_str_radix(digits, 8).unwrap_or(0) as u8);
                continue;
            }
            b'x' | b'X' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && end - start < 2 && bytes[end].is_ascii_hexdigit() {
                    end += 1;
                }
                if end == start {
                    out.push(bytes[i]);
                } else {
                    out.push(u8::from_str_radix(&raw[start..end], 16).unwrap_or(0));
                    i = end;
                    continue;
                }
            }
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            other => out.push(other),
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(ty: Type, default: Option<&str>) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some("f".into()),
            r#type: Some(ty as i32),
            default_value: default.map(str::to_string),
            ..Default::default()
        }
    }

    fn render(ty: Type, default: &str) -> String {
        default_value(&field(ty, Some(default)), &SymbolIndex::default())
    }

    #[test]
    fn string_defaults_are_quoted() {
        assert_eq!(render(Type::String, "hello"), "\"hello\"");
    }

    #[test]
    fn bytes_defaults_are_hex() {
        assert_eq!(render(Type::Bytes, "abc"), "0x616263");
        assert_eq!(render(Type::Bytes, "a\\001\\n\\x7f"), "0x61010a7f");
    }

    #[test]
    fn numeric_defaults_are_canonical() {
        assert_eq!(render(Type::Int32, "-42"), "-42");
        assert_eq!(render(Type::Uint64, "18446744073709551615"), "18446744073709551615");
        assert_eq!(render(Type::Double, "1.5"), "1.5");
        assert_eq!(render(Type::Float, "0.1"), "0.1");
        assert_eq!(render(Type::Double, "inf"), "inf");
        assert_eq!(render(Type::Double, "-inf"), "-inf");
        assert_eq!(render(Type::Float, "nan"), "nan");
        assert_eq!(render(Type::Bool, "true"), "true");
    }

    #[test]
    fn float_defaults_use_six_significant_digits() {
        assert_eq!(render(Type::Double, "1e10"), "1e+10");
        assert_eq!(render(Type::Double, "123456789"), "1.23457e+08");
        assert_eq!(render(Type::Double, "0.0001"), "0.0001");
        assert_eq!(render(Type::Double, "0.00001"), "1e-05");
        assert_eq!(render(Type::Double, "100000"), "100000");
        assert_eq!(render(Type::Double, "9.9999996"), "10");
        assert_eq!(render(Type::Double, "-2.50"), "-2.5");
        assert_eq!(render(Type::Double, "0"), "0");
        assert_eq!(render(Type::Float, "3.14159265"), "3.14159");
    }

    #[test]
    fn unreadable_defaults_render_unknown() {
        assert_eq!(render(Type::Int32, "4294967296"), UNKNOWN_DEFAULT);
        assert_eq!(render(Type::Uint32, "-1"), UNKNOWN_DEFAULT);
        assert_eq!(render(Type::Bool, "yes"), UNKNOWN_DEFAULT);
        assert_eq!(render(Type::Message, "{}"), UNKNOWN_DEFAULT);
        assert_eq!(render(Type::Enum, "MISSING"), UNKNOWN_DEFAULT);
    }

    #[test]
    fn absent_default_is_empty() {
        let f = field(Type::String, None);
        assert_eq!(default_value(&f, &SymbolIndex::default()), "");
    }

    #[test]
    fn scalar_keywords() {
        let f = field(Type::Sfixed64, None);
        assert_eq!(
            field_type(&f, &SymbolIndex::default()),
            TypeNames::scalar("sfixed64")
        );

        let mut odd = field(Type::Bool, None);
        odd.r#type = Some(99);
        assert_eq!(field_type(&odd, &SymbolIndex::default()).name, UNKNOWN_TYPE);
    }

    #[test]
    fn labels() {
        assert_eq!(label_name(Some(Label::Repeated as i32)), "repeated");
        assert_eq!(label_name(Some(1)), "optional");
        assert_eq!(label_name(Some(7)), UNKNOWN_TYPE);
        assert_eq!(label_name(None), UNKNOWN_TYPE);
    }
}
