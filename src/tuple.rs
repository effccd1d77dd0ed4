//! `Tuple` and `RecordId` (spec §3), plus the fixed-width tuple codec
//! (spec §4.5 / §6). Grounded on the teacher's `btree::tuple::Tuple` shape
//! (a descriptor plus a `Vec` of field values) generalized to `Value` instead
//! of `IntField` only, and serialized the way `io.rs`'s `Encodable`/
//! `Decodable` traits compose.

use crate::field::Value;
use crate::io::{Decodable, Encodable};
use crate::schema::TupleDesc;
use std::fmt;
use std::io::Read;

/// `(page_no, slot_no)` — the sole handle used to address a tuple for
/// deletion (spec §3). Not durable across a page flush/reload cycle; see
/// `HeapPage::deserialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_no: u32,
    pub slot_no: u32,
}

impl RecordId {
    pub fn new(page_no: u32, slot_no: u32) -> Self {
        RecordId { page_no, slot_no }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.page_no, self.slot_no)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Value>,
    pub rid: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: TupleDesc, fields: Vec<Value>) -> Self {
        assert_eq!(
            desc.len(),
            fields.len(),
            "tuple field count does not match descriptor"
        );
        Tuple {
            desc,
            fields,
            rid: None,
        }
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn get(&self, i: usize) -> &Value {
        &self.fields[i]
    }

    pub fn set(&mut self, i: usize, v: Value) {
        self.fields[i] = v;
    }

    pub fn with_rid(mut self, rid: RecordId) -> Self {
        self.rid = Some(rid);
        self
    }

    /// Deterministic serialized size in bytes (spec §3).
    pub fn serialized_size(&self, string_length: usize) -> usize {
        self.desc.tuple_size(string_length)
    }

    pub fn encode(&self, string_length: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialized_size(string_length));
        for field in &self.fields {
            buf.extend(field.encode(string_length));
        }
        buf
    }

    pub fn decode(desc: TupleDesc, string_length: usize, reader: &mut impl Read) -> Tuple {
        let mut fields = Vec::with_capacity(desc.len());
        for i in 0..desc.len() {
            fields.push(Value::decode(desc.kind_at(i), string_length, reader));
        }
        Tuple {
            desc,
            fields,
            rid: None,
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldKind, FieldType};

    fn desc() -> TupleDesc {
        TupleDesc::new(vec![
            FieldType::new("a", "t", FieldKind::Int),
            FieldType::new("b", "t", FieldKind::String),
        ])
    }

    #[test]
    fn round_trip_preserves_fields() {
        let t = Tuple::new(desc(), vec![Value::Int(7), Value::Str("hi".into())]);
        let bytes = t.encode(32);
        assert_eq!(bytes.len(), t.serialized_size(32));

        let mut cursor = std::io::Cursor::new(bytes);
        let decoded = Tuple::decode(desc(), 32, &mut cursor);
        assert_eq!(decoded.fields(), t.fields());
    }

    #[test]
    fn string_shorter_than_width_is_stripped_on_read() {
        let t = Tuple::new(desc(), vec![Value::Int(1), Value::Str("x".into())]);
        let bytes = t.encode(32);
        let mut cursor = std::io::Cursor::new(bytes);
        let decoded = Tuple::decode(desc(), 32, &mut cursor);
        assert_eq!(decoded.get(1), &Value::Str("x".to_string()));
    }
}
