//! Rendered field values shared by payload variants and packet records.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One rendered field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Integer shown as zero-padded hex and decimal.
    Number { value: u64, digits: usize },
    /// Integer with a symbolic name.
    Named {
        value: u64,
        digits: usize,
        name: String,
    },
    Text(String),
    Flag(bool),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn number(value: impl Into<u64>, digits: usize) -> Self {
        FieldValue::Number {
            value: value.into(),
            digits,
        }
    }

    /// Falls back to a plain number when `name` is `None`.
    pub fn named(value: impl Into<u64>, digits: usize, name: Option<&str>) -> Self {
        let value = value.into();
        match name {
            Some(name) => FieldValue::Named {
                value,
                digits,
                name: name.to_string(),
            },
            None => FieldValue::Number { value, digits },
        }
    }

    fn hex(value: u64, digits: usize) -> String {
        format!("0x{value:0digits$X}")
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number { value, digits } => {
                write!(f, "{} ({value})", Self::hex(*value, *digits))
            }
            FieldValue::Named {
                value,
                digits,
                name,
            } => write!(f, "{name} ({})", Self::hex(*value, *digits)),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Flag(flag) => write!(f, "{flag}"),
            FieldValue::Bytes(bytes) => f.write_str(&hex::encode_upper(bytes)),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Number { value, digits } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("hex", &Self::hex(*value, *digits))?;
                map.serialize_entry("dec", value)?;
                map.end()
            }
            FieldValue::Named {
                value,
                digits,
                name,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("hex", &Self::hex(*value, *digits))?;
                map.serialize_entry("dec", value)?;
                map.serialize_entry("name", name)?;
                map.end()
            }
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Flag(flag) => serializer.serialize_bool(*flag),
            FieldValue::Bytes(bytes) => serializer.serialize_str(&hex::encode_upper(bytes)),
        }
    }
}

/// Ordered name/value pairs; serializes as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(&'static str, FieldValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, value: FieldValue) {
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, FieldValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn extend(&mut self, other: Fields) {
        self.entries.extend(other.entries);
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// Per-variant rendering of decoded fields.
pub trait Render {
    fn render(&self, out: &mut Fields);

    fn rendered(&self) -> Fields {
        let mut out = Fields::new();
        self.render(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_show_hex_and_decimal() {
        assert_eq!(FieldValue::number(0x2A_u8, 2).to_string(), "0x2A (42)");
        assert_eq!(
            FieldValue::named(1_u8, 2, Some("admin")).to_string(),
            "admin (0x01)"
        );
        assert_eq!(
            FieldValue::named(9_u8, 2, None),
            FieldValue::Number { value: 9, digits: 2 }
        );
    }

    #[test]
    fn fields_serialize_in_insertion_order() {
        let mut fields = Fields::new();
        fields.push("zeta", FieldValue::Flag(true));
        fields.push("alpha", FieldValue::number(0x1F_u8, 2));
        fields.push("raw", FieldValue::Bytes(vec![0xAB, 0x01]));
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(
            json,
            r#"{"zeta":true,"alpha":{"hex":"0x1F","dec":31},"raw":"AB01"}"#
        );
        assert_eq!(fields.to_string(), "zeta: true, alpha: 0x1F (31), raw: AB01");
    }
}
