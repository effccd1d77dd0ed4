//! `TupleDesc`: an ordered list of `FieldType`s (spec §3).
//!
//! Grounded on the teacher's `TupleScheme`/`RowScheme` (`btree/tuple.rs`), but
//! generalized with name resolution (`AmbiguousName`/`TypeMismatch`) the way
//! `godb/tuple.go`'s `TupleDesc.FieldIdx` works, since the executor boundary
//! (§4.6) needs to resolve fields by qualified name.

use crate::error::StorageError;
use crate::field::{FieldKind, FieldType};
use crate::types::Result;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TupleDesc {
    fields: Vec<FieldType>,
}

impl TupleDesc {
    pub fn new(fields: Vec<FieldType>) -> Self {
        TupleDesc { fields }
    }

    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn kind_at(&self, i: usize) -> FieldKind {
        self.fields[i].kind
    }

    /// Concatenate two descriptors in order (spec §3: `merge(a, b)`).
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut fields = a.fields.clone();
        fields.extend(b.fields.clone());
        TupleDesc { fields }
    }

    /// Resolve a (possibly qualified) field name to its index. Fails with
    /// `AmbiguousName` if more than one field matches and `TypeMismatch` if
    /// none do, matching spec §7's schema-error taxonomy.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        let mut found: Option<usize> = None;
        for (i, f) in self.fields.iter().enumerate() {
            let matches = f.name == name || f.qualified_name() == name;
            if matches {
                if found.is_some() {
                    return Err(StorageError::AmbiguousName {
                        name: name.to_string(),
                    });
                }
                found = Some(i);
            }
        }
        found.ok_or_else(|| StorageError::TypeMismatch {
            expected: name.to_string(),
            found: "<no matching field>".to_string(),
        })
    }

    /// Serialized size in bytes of a tuple matching this descriptor (spec §3).
    pub fn tuple_size(&self, string_length: usize) -> usize {
        self.fields.iter().map(|f| f.kind.width(string_length)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> TupleDesc {
        TupleDesc::new(vec![
            FieldType::new("a", "t", FieldKind::Int),
            FieldType::new("b", "t", FieldKind::String),
        ])
    }

    #[test]
    fn tuple_size_sums_field_widths() {
        assert_eq!(desc().tuple_size(32), 8 + 32);
    }

    #[test]
    fn index_of_resolves_plain_and_qualified_names() {
        let d = desc();
        assert_eq!(d.index_of("a").unwrap(), 0);
        assert_eq!(d.index_of("t.b").unwrap(), 1);
    }

    #[test]
    fn index_of_unknown_name_is_type_mismatch() {
        assert!(matches!(
            desc().index_of("z"),
            Err(StorageError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn merge_concatenates_in_order() {
        let a = TupleDesc::new(vec![FieldType::new("a", "", FieldKind::Int)]);
        let b = TupleDesc::new(vec![FieldType::new("b", "", FieldKind::Int)]);
        let merged = TupleDesc::merge(&a, &b);
        assert_eq!(merged.fields()[0].name, "a");
        assert_eq!(merged.fields()[1].name, "b");
    }

    #[test]
    fn ambiguous_name_when_merge_duplicates_unqualified_field() {
        let a = TupleDesc::new(vec![FieldType::new("x", "t1", FieldKind::Int)]);
        let b = TupleDesc::new(vec![FieldType::new("x", "t2", FieldKind::Int)]);
        let merged = TupleDesc::merge(&a, &b);
        assert!(matches!(
            merged.index_of("x"),
            Err(StorageError::AmbiguousName { .. })
        ));
        // Qualified lookups still disambiguate.
        assert_eq!(merged.index_of("t1.x").unwrap(), 0);
        assert_eq!(merged.index_of("t2.x").unwrap(), 1);
    }
}
