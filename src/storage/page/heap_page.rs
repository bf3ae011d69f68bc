use std::sync::Arc;

use bytes::{BufMut, BytesMut};

use crate::common::{DbError, PageId, RecordId, Result, SlotId, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

/// Heap page layout:
///
/// +------------------+
/// | Header bitmap    |  ceil(num_slots / 8) bytes, bit i = slot i used
/// +------------------+
/// | [slot 0]         |  desc.size() bytes each
/// | [slot 1]         |
/// | ...              |
/// +------------------+
/// | Padding          |  zero filled up to the page size
/// +------------------+
///
/// Bits are numbered LSB first within each header byte. Unused slots are
/// written as zeros.
#[derive(Debug, Clone)]
pub struct HeapPage {
    page_id: PageId,
    desc: Arc<TupleDesc>,
    page_size: usize,
    num_slots: usize,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirty: bool,
    dirtier: Option<TransactionId>,
    before_image: Vec<u8>,
}

/// Number of slots a page can hold: each tuple costs its size plus one header bit.
pub fn slots_per_page(page_size: usize, tuple_size: usize) -> usize {
    if tuple_size == 0 {
        return 0;
    }
    (page_size * 8) / (tuple_size * 8 + 1)
}

/// Number of header bytes needed for `num_slots` occupancy bits.
pub fn header_size(num_slots: usize) -> usize {
    num_slots.div_ceil(8)
}

/// Largest slot count a page may have; slot numbers are stored as `u16`.
pub const MAX_SLOTS: usize = u16::MAX as usize + 1;

/// Returns the slot count of the layout, or `DbError::Format` if some slot
/// number would not fit in a `SlotId`.
pub fn check_layout(page_size: usize, tuple_size: usize) -> Result<usize> {
    let num_slots = slots_per_page(page_size, tuple_size);
    if num_slots > MAX_SLOTS {
        return Err(DbError::Format(format!(
            "{} byte pages of {} byte tuples hold {} slots, at most {} are addressable",
            page_size, tuple_size, num_slots, MAX_SLOTS
        )));
    }
    Ok(num_slots)
}

fn slot_id(slot: usize) -> Result<SlotId> {
    u16::try_from(slot)
        .map(SlotId::new)
        .map_err(|_| DbError::Format(format!("slot {} is not addressable", slot)))
}

impl HeapPage {
    /// Returns a zeroed buffer, which decodes as a page with every slot empty.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Creates an empty page without going through the byte encoding.
    pub fn new_empty(page_id: PageId, desc: Arc<TupleDesc>, page_size: usize) -> Self {
        let num_slots = slots_per_page(page_size, desc.size());
        Self {
            page_id,
            desc,
            page_size,
            num_slots,
            header: vec![0u8; header_size(num_slots)],
            tuples: vec![None; num_slots],
            dirty: false,
            dirtier: None,
            before_image: Self::empty_page_data(page_size),
        }
    }

    /// Parses a page from its on-disk bytes.
    pub fn from_bytes(
        page_id: PageId,
        desc: Arc<TupleDesc>,
        page_size: usize,
        data: &[u8],
    ) -> Result<Self> {
        if data.len() != page_size {
            return Err(DbError::Format(format!(
                "{} buffer is {} bytes, expected {}",
                page_id,
                data.len(),
                page_size
            )));
        }

        let num_slots = check_layout(page_size, desc.size())?;
        let header_len = header_size(num_slots);
        let header = data[..header_len].to_vec();

        // Bits past the last slot must be clear
        if num_slots % 8 != 0 {
            let last = header[header_len - 1];
            if last >> (num_slots % 8) != 0 {
                return Err(DbError::Format(format!(
                    "{} header marks slots beyond {}",
                    page_id, num_slots
                )));
            }
        }

        let tuple_size = desc.size();
        let mut tuples = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if header[slot / 8] & (1 << (slot % 8)) == 0 {
                tuples.push(None);
                continue;
            }
            let start = header_len + slot * tuple_size;
            let mut slot_data = &data[start..start + tuple_size];
            let mut tuple = Tuple::read_from(desc.clone(), &mut slot_data)?;
            tuple.set_record_id(Some(RecordId::new(page_id, slot_id(slot)?)));
            tuples.push(Some(tuple));
        }

        Ok(Self {
            page_id,
            desc,
            page_size,
            num_slots,
            header,
            tuples,
            dirty: false,
            dirtier: None,
            before_image: data.to_vec(),
        })
    }

    /// Serializes the page to exactly `page_size` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let tuple_size = self.desc.size();
        let mut buf = BytesMut::with_capacity(self.page_size);
        buf.put_slice(&self.header);

        for slot in &self.tuples {
            match slot {
                Some(tuple) => tuple.write_to(&mut buf)?,
                None => buf.put_bytes(0, tuple_size),
            }
        }

        buf.put_bytes(0, self.page_size - buf.len());
        Ok(buf.to_vec())
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Returns the total number of slots on this page.
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Returns the number of unoccupied slots.
    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots).filter(|&s| !self.is_slot_used(s)).count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots && self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot_used(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Returns the tuple stored in a slot, if the slot is occupied.
    pub fn tuple_at(&self, slot: usize) -> Option<&Tuple> {
        self.tuples.get(slot).and_then(|t| t.as_ref())
    }

    /// Stores `tuple` in the lowest empty slot and assigns its record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        if **tuple.desc() != *self.desc {
            return Err(DbError::SchemaMismatch(self.page_id.table_id));
        }

        let slot = (0..self.num_slots)
            .find(|&s| !self.is_slot_used(s))
            .ok_or(DbError::PageFull(self.page_id))?;

        let record_id = RecordId::new(self.page_id, slot_id(slot)?);
        tuple.set_record_id(Some(record_id));
        self.set_slot_used(slot, true);
        self.tuples[slot] = Some(tuple.clone());
        self.dirty = true;

        Ok(record_id)
    }

    /// Removes the tuple named by `tuple`'s record id from this page.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let record_id = tuple
            .record_id()
            .ok_or_else(|| DbError::TupleNotFound("tuple has no record id".to_string()))?;

        if record_id.page_id != self.page_id {
            return Err(DbError::TupleNotFound(format!(
                "{} is not on {}",
                record_id, self.page_id
            )));
        }

        let slot = record_id.slot_id.as_usize();
        if !self.is_slot_used(slot) {
            return Err(DbError::record_not_found(record_id));
        }

        self.set_slot_used(slot, false);
        self.tuples[slot] = None;
        self.dirty = true;

        Ok(())
    }

    /// Iterates the occupied slots in increasing slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.tuples.iter().filter_map(|t| t.as_ref())
    }

    /// Sets or clears the dirty flag and the transaction that dirtied the page.
    pub fn mark_dirty(&mut self, dirty: bool, tx: Option<TransactionId>) {
        self.dirty = dirty;
        self.dirtier = if dirty { tx } else { None };
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the transaction that last dirtied this page.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// Returns the page as it was when last read from or written to disk.
    pub fn before_image(&self) -> Result<HeapPage> {
        HeapPage::from_bytes(
            self.page_id,
            self.desc.clone(),
            self.page_size,
            &self.before_image,
        )
    }

    /// Captures the current contents as the new before image.
    pub fn set_before_image(&mut self) -> Result<()> {
        self.before_image = self.to_bytes()?;
        Ok(())
    }
}
