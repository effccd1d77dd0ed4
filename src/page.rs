//! `HeapPage`: in-memory, fixed-size slotted container of tuples (spec §4.1).
//!
//! Grounded on the teacher's `page.rs`/`btree::page::BTreeLeafPage` split
//! between an in-memory occupancy bitmap and a slot array, but generalized
//! from int-only rows to the full `Value` tuple codec in `tuple.rs`. The
//! occupancy bitmap is an in-memory-only `bit_vec::BitVec` exactly as spec
//! §3 requires ("a parallel occupancy bitmap maintained in memory only").

use crate::error::StorageError;
use crate::io::{Decodable, Encodable};
use crate::page_id::{FileId, PageKey};
use crate::schema::TupleDesc;
use crate::tuple::{RecordId, Tuple};
use crate::types::Result;
use bit_vec::BitVec;

/// Bytes consumed by the page header (`num_slots`, `num_used`, both `i32` LE).
const HEADER_BYTES: usize = 8;

pub struct HeapPage {
    desc: TupleDesc,
    page_no: u32,
    file: FileId,
    string_length: usize,
    page_size: usize,
    bytes_per_tuple: usize,
    num_slots: usize,
    num_used: usize,
    used: BitVec,
    slots: Vec<Option<Tuple>>,
    dirty: bool,
}

impl HeapPage {
    /// Compute `num_slots` for a descriptor/page-size/string-length triple
    /// without allocating a page, so `HeapFile` can reason about layout.
    pub fn slots_per_page(desc: &TupleDesc, page_size: usize, string_length: usize) -> Result<usize> {
        let bytes_per_tuple = desc.tuple_size(string_length);
        if bytes_per_tuple == 0 || bytes_per_tuple > page_size - HEADER_BYTES {
            return Err(StorageError::MalformedData {
                detail: format!(
                    "tuple width {} does not fit in a {}-byte page",
                    bytes_per_tuple, page_size
                ),
            });
        }
        Ok((page_size - HEADER_BYTES) / bytes_per_tuple)
    }

    /// A freshly allocated, empty page (spec §4.1 `new`).
    pub fn new(
        desc: TupleDesc,
        page_no: u32,
        file: FileId,
        page_size: usize,
        string_length: usize,
    ) -> Result<Self> {
        let bytes_per_tuple = desc.tuple_size(string_length);
        let num_slots = Self::slots_per_page(&desc, page_size, string_length)?;
        Ok(HeapPage {
            desc,
            page_no,
            file,
            string_length,
            page_size,
            bytes_per_tuple,
            num_slots,
            num_used: 0,
            used: BitVec::from_elem(num_slots, false),
            slots: (0..num_slots).map(|_| None).collect(),
            dirty: false,
        })
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }

    pub fn key(&self) -> PageKey {
        PageKey::new(self.file.clone(), self.page_no)
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn num_used(&self) -> usize {
        self.num_used
    }

    pub fn is_full(&self) -> bool {
        self.num_used == self.num_slots
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Insert into the first free slot, in ascending slot order (spec §4.1).
    pub fn insert(&mut self, mut tuple: Tuple) -> Result<RecordId> {
        let slot_no = (0..self.num_slots)
            .find(|&i| !self.used[i])
            .ok_or(StorageError::PageFull)?;

        let rid = RecordId::new(self.page_no, slot_no as u32);
        tuple.rid = Some(rid);
        self.slots[slot_no] = Some(tuple);
        self.used.set(slot_no, true);
        self.num_used += 1;
        Ok(rid)
    }

    /// Free the slot named by `rid.slot_no` (spec §4.1).
    pub fn delete(&mut self, rid: RecordId) -> Result<()> {
        let slot_no = rid.slot_no as usize;
        if slot_no >= self.num_slots || !self.used[slot_no] {
            return Err(StorageError::InvalidSlot {
                slot_no: rid.slot_no,
            });
        }
        self.slots[slot_no] = None;
        self.used.set(slot_no, false);
        self.num_used -= 1;
        Ok(())
    }

    /// Ascending-slot-order iterator over occupied tuples, cloned out of the
    /// page rather than aliasing its storage (spec §4.1).
    pub fn iter(&self) -> impl Iterator<Item = Tuple> + '_ {
        self.slots.iter().filter_map(|slot| slot.clone())
    }

    /// Header + densely-packed occupied tuples in slot order + zero padding
    /// (spec §6's on-disk format).
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.page_size);
        buf.extend((self.num_slots as i32).encode());
        buf.extend((self.num_used as i32).encode());
        for slot in &self.slots {
            if let Some(tuple) = slot {
                buf.extend(tuple.encode(self.string_length));
            }
        }
        buf.resize(self.page_size, 0);
        assert_eq!(buf.len(), self.page_size);
        buf
    }

    /// Reconstruct a page from `serialize`'s output. Slot numbers are
    /// reassigned `0..num_used` in this pass — spec §9 open question 2: a
    /// `RecordId`'s `slot_no` is not durable across a flush/reload cycle.
    pub fn deserialize(
        buf: &[u8],
        desc: TupleDesc,
        page_no: u32,
        file: FileId,
        page_size: usize,
        string_length: usize,
    ) -> Result<Self> {
        if buf.len() != page_size {
            return Err(StorageError::MalformedData {
                detail: format!("expected {} bytes, got {}", page_size, buf.len()),
            });
        }

        let mut cursor = std::io::Cursor::new(buf);
        let num_slots = i32::decode_from(&mut cursor) as usize;
        let num_used = i32::decode_from(&mut cursor) as usize;

        let bytes_per_tuple = desc.tuple_size(string_length);
        let expected_slots = Self::slots_per_page(&desc, page_size, string_length)?;
        if num_slots != expected_slots {
            return Err(StorageError::MalformedData {
                detail: format!(
                    "page header declares {} slots, descriptor implies {}",
                    num_slots, expected_slots
                ),
            });
        }
        if num_used > num_slots {
            return Err(StorageError::MalformedData {
                detail: format!("num_used {} exceeds num_slots {}", num_used, num_slots),
            });
        }

        let mut used = BitVec::from_elem(num_slots, false);
        let mut slots: Vec<Option<Tuple>> = (0..num_slots).map(|_| None).collect();
        for i in 0..num_used {
            let tuple = Tuple::decode(desc.clone(), string_length, &mut cursor)
                .with_rid(RecordId::new(page_no, i as u32));
            slots[i] = Some(tuple);
            used.set(i, true);
        }

        Ok(HeapPage {
            desc,
            page_no,
            file,
            string_length,
            page_size,
            bytes_per_tuple,
            num_slots,
            num_used,
            used,
            slots,
            dirty: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldKind, FieldType, Value};

    fn desc() -> TupleDesc {
        TupleDesc::new(vec![
            FieldType::new("a", "t", FieldKind::Int),
            FieldType::new("b", "t", FieldKind::String),
        ])
    }

    fn tuple(n: i64) -> Tuple {
        Tuple::new(desc(), vec![Value::Int(n), Value::Str(format!("v{}", n))])
    }

    fn page() -> HeapPage {
        HeapPage::new(desc(), 0, FileId::new("t.db"), 4096, 32).unwrap()
    }

    #[test]
    fn insert_assigns_ascending_slots() {
        let mut p = page();
        let r0 = p.insert(tuple(1)).unwrap();
        let r1 = p.insert(tuple(2)).unwrap();
        assert_eq!(r0.slot_no, 0);
        assert_eq!(r1.slot_no, 1);
        assert_eq!(p.num_used(), 2);
    }

    #[test]
    fn insert_reuses_freed_slot_before_growing() {
        let mut p = page();
        let r0 = p.insert(tuple(1)).unwrap();
        p.insert(tuple(2)).unwrap();
        p.delete(r0).unwrap();
        let r2 = p.insert(tuple(3)).unwrap();
        assert_eq!(r2.slot_no, 0);
    }

    #[test]
    fn insert_into_full_page_fails() {
        let mut p = page();
        let n = p.num_slots();
        for i in 0..n {
            p.insert(tuple(i as i64)).unwrap();
        }
        assert!(matches!(p.insert(tuple(999)), Err(StorageError::PageFull)));
    }

    #[test]
    fn delete_unoccupied_slot_fails() {
        let mut p = page();
        assert!(matches!(
            p.delete(RecordId::new(0, 0)),
            Err(StorageError::InvalidSlot { .. })
        ));
    }

    #[test]
    fn iter_yields_occupied_tuples_in_slot_order() {
        let mut p = page();
        p.insert(tuple(1)).unwrap();
        p.insert(tuple(2)).unwrap();
        let values: Vec<_> = p.iter().map(|t| t.get(0).clone()).collect();
        assert_eq!(values, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn serialize_deserialize_preserves_occupied_tuples() {
        let mut p = page();
        p.insert(tuple(1)).unwrap();
        let r1 = p.insert(tuple(2)).unwrap();
        p.delete(r1).unwrap();
        p.insert(tuple(3)).unwrap();

        let bytes = p.serialize();
        assert_eq!(bytes.len(), 4096);
        let reloaded =
            HeapPage::deserialize(&bytes, desc(), 0, FileId::new("t.db"), 4096, 32).unwrap();

        assert_eq!(reloaded.num_used(), p.num_used());
        let original: Vec<_> = p.iter().map(|t| t.fields().to_vec()).collect();
        let round_tripped: Vec<_> = reloaded.iter().map(|t| t.fields().to_vec()).collect();
        assert_eq!(original, round_tripped);
    }

    #[test]
    fn slot_numbers_are_not_stable_across_flush_reload() {
        let mut p = page();
        let r0 = p.insert(tuple(1)).unwrap();
        p.insert(tuple(2)).unwrap();
        p.delete(r0).unwrap();
        p.insert(tuple(3)).unwrap(); // lands back in slot 0

        let bytes = p.serialize();
        let reloaded =
            HeapPage::deserialize(&bytes, desc(), 0, FileId::new("t.db"), 4096, 32).unwrap();

        // Before flush, tuple `2` sits in slot 1; after a flush/reload it is
        // renumbered starting from 0 because only occupied slots are
        // written densely (spec §9 open question 2).
        let rids: Vec<_> = reloaded.iter().map(|t| t.rid.unwrap().slot_no).collect();
        assert_eq!(rids, vec![0, 1]);
    }

    #[test]
    fn oversized_tuple_is_rejected_at_construction() {
        let wide = TupleDesc::new(vec![FieldType::new("s", "", FieldKind::String)]);
        // string_length * 1 > page_size - 8
        assert!(HeapPage::new(wide, 0, FileId::new("t.db"), 16, 4096).is_err());
    }
}
