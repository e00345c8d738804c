use rustc_hash::FxHashMap;

/// Strand orientation for alignment segments
#[derive(Default, PartialEq, Eq, Clone, Copy, Debug)]
#[repr(u8)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

/// Interns chromosome names to dense u32 ids and back.
pub struct ChromIndex {
    name_to_id: FxHashMap<String, u32>,
    id_to_name: Vec<String>,
}

impl ChromIndex {
    pub fn new() -> Self {
        ChromIndex {
            name_to_id: FxHashMap::default(),
            id_to_name: Vec::new(),
        }
    }

    pub fn get_or_insert_id(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.id_to_name.len() as u32;
        self.name_to_id.insert(name.to_owned(), id);
        self.id_to_name.push(name.to_owned());
        id
    }

    pub fn get_id(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    pub fn get_name(&self, id: u32) -> Option<&str> {
        self.id_to_name.get(id as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }
}

impl Default for ChromIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// One aligned piece of a split read. Immutable once stored.
///
/// Coordinates are 0-based half-open on the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub chrom: u32,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    /// Percent identity to the reference, 0.0..=100.0.
    pub identity: f64,
    pub mapq: f64,
    pub read_id: u32,
    /// Position of this segment within its read's alignment order.
    pub order: u32,
}

impl Segment {
    /// Reference coordinate where the alignment ends in read orientation.
    /// For a reverse-strand segment the read runs off the low end.
    pub fn trailing_pos(&self) -> i64 {
        match self.strand {
            Strand::Forward => self.end,
            Strand::Reverse => self.start,
        }
    }

    /// Reference coordinate where the alignment begins in read orientation.
    pub fn leading_pos(&self) -> i64 {
        match self.strand {
            Strand::Forward => self.start,
            Strand::Reverse => self.end,
        }
    }
}

/// Index of a segment inside the [`SegmentStore`].
pub type SegmentId = u32;

/// A split read: its name and the ids of its segments in alignment order
/// along the read (not genomic order).
#[derive(Debug, Clone)]
pub struct Read {
    pub id: u32,
    pub name: String,
    pub segments: Vec<SegmentId>,
}

/// Arena owning every segment of a parsed batch.
///
/// Segments are append-only and shared read-only across threads during
/// extraction. [`SegmentStore::detach`] removes a segment for the owning
/// breakpoint lifecycle; touching a detached id afterwards is a programming
/// error and panics.
#[derive(Default)]
pub struct SegmentStore {
    slots: Vec<Option<Segment>>,
}

impl SegmentStore {
    pub fn new() -> Self {
        SegmentStore { slots: Vec::new() }
    }

    pub fn push(&mut self, segment: Segment) -> SegmentId {
        let id = self.slots.len() as SegmentId;
        self.slots.push(Some(segment));
        id
    }

    /// Panics if `id` was never issued or its segment has been detached.
    pub fn get(&self, id: SegmentId) -> &Segment {
        self.slots[id as usize]
            .as_ref()
            .unwrap_or_else(|| panic!("segment {id} was detached from the store"))
    }

    /// Non-panicking lookup; `None` for detached segments.
    pub fn try_get(&self, id: SegmentId) -> Option<&Segment> {
        self.slots.get(id as usize).and_then(|s| s.as_ref())
    }

    /// Removes a segment, transferring ownership to the caller. Panics if the
    /// segment was already detached.
    pub fn detach(&mut self, id: SegmentId) -> Segment {
        self.slots[id as usize]
            .take()
            .unwrap_or_else(|| panic!("segment {id} was already detached"))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrom_interning() {
        let mut idx = ChromIndex::new();
        let chr1 = idx.get_or_insert_id("chr1");
        let chr2 = idx.get_or_insert_id("chr2");
        assert_ne!(chr1, chr2);
        assert_eq!(idx.get_or_insert_id("chr1"), chr1);
        assert_eq!(idx.get_id("chr2"), Some(chr2));
        assert_eq!(idx.get_name(chr1), Some("chr1"));
        assert_eq!(idx.get_id("chrM"), None);
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_orientation_aware_positions() {
        let fwd = Segment {
            chrom: 0,
            start: 100,
            end: 200,
            strand: Strand::Forward,
            identity: 99.0,
            mapq: 60.0,
            read_id: 0,
            order: 0,
        };
        assert_eq!(fwd.leading_pos(), 100);
        assert_eq!(fwd.trailing_pos(), 200);

        let rev = Segment {
            strand: Strand::Reverse,
            ..fwd
        };
        assert_eq!(rev.leading_pos(), 200);
        assert_eq!(rev.trailing_pos(), 100);
    }

    #[test]
    fn test_store_detach() {
        let mut store = SegmentStore::new();
        let id = store.push(Segment {
            chrom: 0,
            start: 0,
            end: 50,
            strand: Strand::Forward,
            identity: 100.0,
            mapq: 60.0,
            read_id: 0,
            order: 0,
        });
        assert_eq!(store.get(id).end, 50);

        let owned = store.detach(id);
        assert_eq!(owned.end, 50);
        assert!(store.try_get(id).is_none());
    }

    #[test]
    #[should_panic(expected = "detached")]
    fn test_store_get_after_detach_panics() {
        let mut store = SegmentStore::new();
        let id = store.push(Segment {
            chrom: 0,
            start: 0,
            end: 10,
            strand: Strand::Forward,
            identity: 100.0,
            mapq: 60.0,
            read_id: 0,
            order: 0,
        });
        store.detach(id);
        store.get(id);
    }
}
