//! Mapping between labels and dense tag ids.

use core::fmt::Debug;
use core::hash::Hash;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

use crate::errors::{Result, TrellisError};

/// Bijection between labels and dense tag ids `0..K-1`.
///
/// One id is the distinguished *start* sentinel placed at the fencepost
/// before the first position of every sequence. The index is deduplicated in
/// insertion order and immutable after construction.
pub struct LabelIndex<L> {
    labels: Vec<L>,
    ids: HashMap<L, u32>,
    start: u32,
}

impl<L> LabelIndex<L>
where
    L: Eq + Hash + Clone,
{
    /// Creates a new index from an iterator of labels plus the start symbol.
    ///
    /// Duplicates are dropped, keeping the first occurrence. The start symbol
    /// is appended if the iterator did not already contain it.
    ///
    /// # Arguments
    ///
    ///  - `labels`: Labels in insertion order.
    ///  - `start`: The start sentinel.
    pub fn new<I>(labels: I, start: L) -> Self
    where
        I: IntoIterator<Item = L>,
    {
        let mut index = Self {
            labels: vec![],
            ids: HashMap::new(),
            start: 0,
        };
        for label in labels {
            index.insert(label);
        }
        index.start = index.insert(start);
        index
    }

    fn insert(&mut self, label: L) -> u32 {
        if let Some(&id) = self.ids.get(&label) {
            return id;
        }
        let id = u32::try_from(self.labels.len()).unwrap();
        self.labels.push(label.clone());
        self.ids.insert(label, id);
        id
    }

    /// Returns the number of indexed labels, the start sentinel included.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Checks if the index is empty. It never is: the start symbol is always
    /// present.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the id of the start sentinel.
    #[inline(always)]
    pub const fn start_id(&self) -> u32 {
        self.start
    }

    /// Returns the label mapped to the given id.
    ///
    /// # Panics
    ///
    /// Ids not issued by this index are a caller bug.
    #[inline(always)]
    pub fn get(&self, id: u32) -> &L {
        &self.labels[usize::try_from(id).unwrap()]
    }
}

impl<L> LabelIndex<L>
where
    L: Eq + Hash + Clone + Debug,
{
    /// Returns the tag id of the given label.
    ///
    /// # Errors
    ///
    /// [`TrellisError::UnknownLabel`] is returned when the label was not seen
    /// at construction.
    pub fn tag_id(&self, label: &L) -> Result<u32> {
        self.ids
            .get(label)
            .copied()
            .ok_or_else(|| TrellisError::unknown_label(format!("{label:?}")))
    }

    /// Maps a slice of labels to tag ids.
    ///
    /// # Errors
    ///
    /// [`TrellisError::UnknownLabel`] is returned on the first unindexed
    /// label.
    pub fn tag_ids(&self, labels: &[L]) -> Result<Vec<u32>> {
        labels.iter().map(|l| self.tag_id(l)).collect()
    }
}

impl<L> Decode for LabelIndex<L>
where
    L: Eq + Hash + Clone + Decode + 'static,
{
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let labels: Vec<L> = Decode::decode(decoder)?;
        let start: u32 = Decode::decode(decoder)?;
        let ids = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i as u32))
            .collect();
        Ok(Self { labels, ids, start })
    }
}

impl<L> Encode for LabelIndex<L>
where
    L: Eq + Hash + Clone + Encode + 'static,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.labels, encoder)?;
        Encode::encode(&self.start, encoder)?;
        Ok(())
    }
}
