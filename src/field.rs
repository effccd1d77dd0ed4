//! Field types and the `Value` enum (spec §3). Grounded on the teacher's
//! `field.rs`/`btree/tuple.rs` `Type`/`IntField` split, generalized to cover
//! both `Int` and `String` kinds named in the spec.

use crate::io::{decode_fixed_string, encode_fixed_string, Decodable, Encodable};
use std::fmt;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int,
    String,
}

impl FieldKind {
    /// Serialized width in bytes for this kind, given the configured string width.
    pub fn width(&self, string_length: usize) -> usize {
        match self {
            FieldKind::Int => 8,
            FieldKind::String => string_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Int(_) => FieldKind::Int,
            Value::Str(_) => FieldKind::String,
        }
    }

    pub fn encode(&self, string_length: usize) -> Vec<u8> {
        match self {
            Value::Int(v) => v.encode(),
            Value::Str(s) => encode_fixed_string(s, string_length),
        }
    }

    pub fn decode(kind: FieldKind, string_length: usize, reader: &mut impl Read) -> Value {
        match kind {
            FieldKind::Int => Value::Int(i64::decode_from(reader)),
            FieldKind::String => {
                let buf = crate::io::read_exact_bytes(reader, string_length);
                Value::Str(decode_fixed_string(&buf))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

/// One named, typed column of a `TupleDesc` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
    pub name: String,
    pub table_qualifier: String,
    pub kind: FieldKind,
}

impl FieldType {
    pub fn new(name: impl Into<String>, table_qualifier: impl Into<String>, kind: FieldKind) -> Self {
        FieldType {
            name: name.into(),
            table_qualifier: table_qualifier.into(),
            kind,
        }
    }

    /// `"qualifier.name"`, or just `name` if there is no qualifier — matches
    /// the display convention in the Go source's `TDItem.String()`.
    pub fn qualified_name(&self) -> String {
        if self.table_qualifier.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.table_qualifier, self.name)
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}
