//! Per-position tag constraints.
//!
//! Typical taggers know from a lexicon that a word can only take a small
//! subset of tags; restricting the trellis to these sets yields large
//! speedups and far fewer bigram parameters. The engine only ever reads
//! constraints, it never mutates them.

use core::hash::Hash;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

use crate::errors::Result;
use crate::label::LabelIndex;

/// Sentence-bound view over allowed tags.
pub trait TagConstraints {
    /// Returns the allowed tag ids at the given position, sorted ascending
    /// and duplicate-free. Only in-range positions are queried; fenceposts
    /// outside the sentence are the engine's business.
    fn allowed_tags(&self, pos: usize) -> &[u32];
}

/// Factory producing a per-sentence [`TagConstraints`] view.
pub trait ConstraintsFactory<W> {
    /// The sentence-bound view.
    type Anchored: TagConstraints;

    /// Binds the constraints to one sentence.
    ///
    /// # Errors
    ///
    /// Implementations may fail, e.g. on words they cannot handle.
    fn anchor(&self, words: &[W]) -> Result<Self::Anchored>;
}

/// Constraints allowing every non-start label at every position.
///
/// This is the "no constraints" default: the start sentinel is excluded so
/// that it can never be emitted at a real position.
#[derive(Clone, Debug, Decode, Encode)]
pub struct UniformConstraints {
    tags: Vec<u32>,
}

impl UniformConstraints {
    /// Creates constraints covering all labels of the index except the start
    /// sentinel.
    pub fn new<L>(label_index: &LabelIndex<L>) -> Self
    where
        L: Eq + Hash + Clone,
    {
        let tags = (0..label_index.len() as u32)
            .filter(|&t| t != label_index.start_id())
            .collect();
        Self { tags }
    }
}

impl TagConstraints for UniformConstraints {
    #[inline(always)]
    fn allowed_tags(&self, _pos: usize) -> &[u32] {
        &self.tags
    }
}

impl<W> ConstraintsFactory<W> for UniformConstraints {
    type Anchored = Self;

    fn anchor(&self, _words: &[W]) -> Result<Self> {
        Ok(self.clone())
    }
}

/// Word-keyed tag constraints with a fallback set for unlisted words.
///
/// Entries are supplied by the caller; building them from corpus counts is an
/// upper layer's job.
pub struct LexiconConstraints<W> {
    entries: HashMap<W, Vec<u32>>,
    default: Vec<u32>,
}

impl<W> LexiconConstraints<W>
where
    W: Eq + Hash,
{
    /// Creates constraints from explicit `word -> tag set` entries.
    ///
    /// Each set is sorted and deduplicated. The fallback set applies to words
    /// without an entry.
    pub fn from_entries<I>(entries: I, mut default: Vec<u32>) -> Self
    where
        I: IntoIterator<Item = (W, Vec<u32>)>,
    {
        let entries = entries
            .into_iter()
            .map(|(w, mut tags)| {
                tags.sort_unstable();
                tags.dedup();
                (w, tags)
            })
            .collect();
        default.sort_unstable();
        default.dedup();
        Self { entries, default }
    }

    /// Returns the allowed set for one word.
    #[inline(always)]
    pub fn tags_for(&self, word: &W) -> &[u32] {
        self.entries.get(word).unwrap_or(&self.default)
    }
}

/// Sentence-bound view of [`LexiconConstraints`].
pub struct AnchoredLexicon {
    sets: Vec<Vec<u32>>,
}

impl TagConstraints for AnchoredLexicon {
    #[inline(always)]
    fn allowed_tags(&self, pos: usize) -> &[u32] {
        &self.sets[pos]
    }
}

impl<W> ConstraintsFactory<W> for LexiconConstraints<W>
where
    W: Eq + Hash,
{
    type Anchored = AnchoredLexicon;

    fn anchor(&self, words: &[W]) -> Result<AnchoredLexicon> {
        let sets = words.iter().map(|w| self.tags_for(w).to_vec()).collect();
        Ok(AnchoredLexicon { sets })
    }
}

impl<W> Decode for LexiconConstraints<W>
where
    W: Eq + Hash + Decode + 'static,
{
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let entries: Vec<(W, Vec<u32>)> = Decode::decode(decoder)?;
        let default = Decode::decode(decoder)?;
        Ok(Self {
            entries: entries.into_iter().collect(),
            default,
        })
    }
}

impl<W> Encode for LexiconConstraints<W>
where
    W: Eq + Hash + Clone + Encode + 'static,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        let entries: Vec<(W, Vec<u32>)> = self
            .entries
            .iter()
            .map(|(w, tags)| (w.clone(), tags.clone()))
            .collect();
        Encode::encode(&entries, encoder)?;
        Encode::encode(&self.default, encoder)?;
        Ok(())
    }
}
