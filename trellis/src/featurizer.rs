//! Global feature index and per-sentence feature tables.

use core::hash::Hash;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

use crate::constraints::{ConstraintsFactory, TagConstraints};
use crate::errors::{Result, TrellisError};
use crate::label::LabelIndex;
use crate::sequence::TaggedSequence;
use crate::surface::{FeatureLevel, SurfaceFeaturizer, SurfaceFeatures};

/// Owner of the global feature index.
///
/// Two sparse tables map surface features to dense feature ids:
/// `label_word[sf][cur]` for unary-label conjunctions and
/// `label_pair[sf][prev*K + cur]` for bigram-label conjunctions. Ids are
/// assigned incrementally in first-touch order during [`build`](Self::build);
/// absent cells mean "not indexed". Bigram ids are only issued at positions
/// with more than one allowed tag, and only for `Minimal`-level surface
/// features, which keeps the parameter count in check.
///
/// The featurizer is immutable after `build` and freely shareable across
/// threads.
pub struct IndexedFeaturizer<C, S> {
    constraints: C,
    surface: S,
    label_word: Vec<HashMap<u32, u32>>,
    label_pair: Vec<HashMap<u32, u32>>,
    num_features: u32,
    num_tags: u32,
    start: u32,
}

impl<C, S> IndexedFeaturizer<C, S> {
    /// Builds the global feature index over a training corpus.
    ///
    /// Gold labels are not consulted; only the constraint sets and surface
    /// features decide which conjunctions exist.
    ///
    /// # Arguments
    ///
    ///  - `constraints`: Per-sentence tag-constraint oracle, kept for later
    ///    anchoring.
    ///  - `surface`: Per-sentence surface-feature oracle, kept for later
    ///    anchoring.
    ///  - `label_index`: Label universe, including the start sentinel.
    ///  - `corpus`: Training data.
    ///
    /// # Errors
    ///
    /// [`TrellisError::EmptyConstraint`] is returned when some position has
    /// no allowed tag.
    pub fn build<L, W>(
        constraints: C,
        surface: S,
        label_index: &LabelIndex<L>,
        corpus: &[TaggedSequence<L, W>],
    ) -> Result<Self>
    where
        L: Eq + Hash + Clone,
        C: ConstraintsFactory<W>,
        S: SurfaceFeaturizer<W>,
    {
        let num_tags = u32::try_from(label_index.len()).unwrap();
        let start = label_index.start_id();
        let start_set = [start];

        let mut label_word: Vec<HashMap<u32, u32>> = vec![];
        let mut label_pair: Vec<HashMap<u32, u32>> = vec![];
        let mut num_features = 0u32;

        for seq in corpus {
            let tag_sets = constraints.anchor(seq.words())?;
            let feats = surface.anchor(seq.words());
            for p in 0..seq.len() {
                let cur_set = tag_sets.allowed_tags(p);
                if cur_set.is_empty() {
                    return Err(TrellisError::empty_constraint(p));
                }
                let ambiguous = cur_set.len() > 1;
                let prev_set: &[u32] = if p == 0 {
                    &start_set
                } else {
                    tag_sets.allowed_tags(p - 1)
                };
                for &cur in cur_set {
                    for &sf in feats.features(p, FeatureLevel::Standard) {
                        grow_to(&mut label_word, sf);
                        label_word[sf as usize].entry(cur).or_insert_with(|| {
                            let id = num_features;
                            num_features += 1;
                            id
                        });
                    }
                    if ambiguous {
                        for &prev in prev_set {
                            for &sf in feats.features(p, FeatureLevel::Minimal) {
                                grow_to(&mut label_pair, sf);
                                label_pair[sf as usize]
                                    .entry(prev * num_tags + cur)
                                    .or_insert_with(|| {
                                        let id = num_features;
                                        num_features += 1;
                                        id
                                    });
                            }
                        }
                    }
                }
            }
        }

        log::debug!(
            "indexed {} features over {} sentences ({} unary tables, {} bigram tables)",
            num_features,
            corpus.len(),
            label_word.len(),
            label_pair.len(),
        );

        Ok(Self {
            constraints,
            surface,
            label_word,
            label_pair,
            num_features,
            num_tags,
            start,
        })
    }

    /// Returns the number of indexed features.
    #[inline(always)]
    pub const fn num_features(&self) -> u32 {
        self.num_features
    }

    /// Returns the number of tags, the start sentinel included.
    #[inline(always)]
    pub const fn num_tags(&self) -> u32 {
        self.num_tags
    }

    /// Returns the id of the start sentinel.
    #[inline(always)]
    pub const fn start_id(&self) -> u32 {
        self.start
    }

    /// Materializes the per-sentence feature table.
    ///
    /// For every `cur` in `A(p)` and `prev` in `A(p-1)` (the start sentinel
    /// when `p == 0`) the cell holds the indexed feature ids of the
    /// transition; all other cells stay empty, marking the transition
    /// forbidden. Surface features never seen at build time are skipped.
    ///
    /// # Errors
    ///
    /// [`TrellisError::EmptyConstraint`] is returned when some position has
    /// no allowed tag.
    pub fn anchor<W>(&self, words: &[W]) -> Result<AnchoredFeatures>
    where
        C: ConstraintsFactory<W>,
        S: SurfaceFeaturizer<W>,
    {
        let n = words.len();
        let k = self.num_tags as usize;
        let tag_sets = self.constraints.anchor(words)?;
        let feats = self.surface.anchor(words);

        let mut valid = Vec::with_capacity(n);
        for p in 0..n {
            let set = tag_sets.allowed_tags(p);
            if set.is_empty() {
                return Err(TrellisError::empty_constraint(p));
            }
            debug_assert!(set.windows(2).all(|w| w[0] < w[1]));
            valid.push(set.to_vec());
        }

        let start_set = [self.start];
        let mut table: Vec<Option<Vec<u32>>> = vec![None; n * k * k];
        let mut unseen = 0usize;
        for (p, cur_set) in valid.iter().enumerate() {
            let ambiguous = cur_set.len() > 1;
            let std_feats = feats.features(p, FeatureLevel::Standard);
            let min_feats = feats.features(p, FeatureLevel::Minimal);
            unseen += std_feats
                .iter()
                .filter(|&&sf| sf as usize >= self.label_word.len())
                .count();
            for &cur in cur_set {
                let mut unary = vec![];
                for &sf in std_feats {
                    if let Some(&f) = self
                        .label_word
                        .get(sf as usize)
                        .and_then(|m| m.get(&cur))
                    {
                        unary.push(f);
                    }
                }
                let prev_set: &[u32] = if p == 0 { &start_set } else { &valid[p - 1] };
                for &prev in prev_set {
                    let mut ids = unary.clone();
                    if ambiguous {
                        for &sf in min_feats {
                            if let Some(&f) = self
                                .label_pair
                                .get(sf as usize)
                                .and_then(|m| m.get(&(prev * self.num_tags + cur)))
                            {
                                ids.push(f);
                            }
                        }
                    }
                    table[(p * k + prev as usize) * k + cur as usize] = Some(ids);
                }
            }
        }
        if unseen > 0 {
            log::debug!("skipped {unseen} surface features unseen at build time");
        }

        Ok(AnchoredFeatures {
            n,
            num_tags: k,
            start_set: [self.start],
            valid,
            table,
        })
    }

    #[cfg(test)]
    pub(crate) fn label_word(&self) -> &[HashMap<u32, u32>] {
        &self.label_word
    }

    #[cfg(test)]
    pub(crate) fn label_pair(&self) -> &[HashMap<u32, u32>] {
        &self.label_pair
    }
}

fn grow_to(maps: &mut Vec<HashMap<u32, u32>>, sf: u32) {
    let need = sf as usize + 1;
    if maps.len() < need {
        maps.resize_with(need, HashMap::new);
    }
}

/// Dense `(position, prev, cur) -> sparse feature vector` table bound to one
/// sentence.
///
/// The table is exclusively owned by the calling task and dropped with it;
/// nothing is cached across sentences.
pub struct AnchoredFeatures {
    n: usize,
    num_tags: usize,
    start_set: [u32; 1],
    valid: Vec<Vec<u32>>,
    table: Vec<Option<Vec<u32>>>,
}

impl AnchoredFeatures {
    /// Returns the number of positions of the bound sentence.
    #[inline(always)]
    pub const fn num_positions(&self) -> usize {
        self.n
    }

    /// Returns the number of tags, the start sentinel included.
    #[inline(always)]
    pub const fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Returns the id of the start sentinel.
    #[inline(always)]
    pub const fn start_id(&self) -> u32 {
        self.start_set[0]
    }

    /// Returns the allowed tag ids at the given position, sorted ascending.
    #[inline(always)]
    pub fn allowed_tags(&self, pos: usize) -> &[u32] {
        &self.valid[pos]
    }

    /// Returns the tag ids a transition into `pos` can depart from: the
    /// start sentinel at the first position, `A(pos-1)` elsewhere.
    #[inline(always)]
    pub fn previous_tags(&self, pos: usize) -> &[u32] {
        if pos == 0 {
            &self.start_set
        } else {
            &self.valid[pos - 1]
        }
    }

    /// Returns the feature ids of a transition, or `None` if it is
    /// forbidden.
    #[inline(always)]
    pub fn sparse_features(&self, pos: usize, prev: u32, cur: u32) -> Option<&[u32]> {
        self.table[self.index(pos, prev, cur)].as_deref()
    }

    #[inline(always)]
    fn index(&self, pos: usize, prev: u32, cur: u32) -> usize {
        debug_assert!(pos < self.n);
        debug_assert!((prev as usize) < self.num_tags);
        debug_assert!((cur as usize) < self.num_tags);
        (pos * self.num_tags + prev as usize) * self.num_tags + cur as usize
    }
}

impl<C, S> Decode for IndexedFeaturizer<C, S>
where
    C: Decode,
    S: Decode,
{
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let constraints = Decode::decode(decoder)?;
        let surface = Decode::decode(decoder)?;
        let label_word: Vec<Vec<(u32, u32)>> = Decode::decode(decoder)?;
        let label_pair: Vec<Vec<(u32, u32)>> = Decode::decode(decoder)?;
        let num_features = Decode::decode(decoder)?;
        let num_tags = Decode::decode(decoder)?;
        let start = Decode::decode(decoder)?;
        Ok(Self {
            constraints,
            surface,
            label_word: label_word
                .into_iter()
                .map(|pairs| pairs.into_iter().collect())
                .collect(),
            label_pair: label_pair
                .into_iter()
                .map(|pairs| pairs.into_iter().collect())
                .collect(),
            num_features,
            num_tags,
            start,
        })
    }
}

impl<C, S> Encode for IndexedFeaturizer<C, S>
where
    C: Encode,
    S: Encode,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.constraints, encoder)?;
        Encode::encode(&self.surface, encoder)?;
        Encode::encode(&sorted_pairs(&self.label_word), encoder)?;
        Encode::encode(&sorted_pairs(&self.label_pair), encoder)?;
        Encode::encode(&self.num_features, encoder)?;
        Encode::encode(&self.num_tags, encoder)?;
        Encode::encode(&self.start, encoder)?;
        Ok(())
    }
}

fn sorted_pairs(maps: &[HashMap<u32, u32>]) -> Vec<Vec<(u32, u32)>> {
    maps.iter()
        .map(|m| {
            let mut pairs: Vec<_> = m.iter().map(|(&k, &v)| (k, v)).collect();
            pairs.sort_unstable_by_key(|&(k, _)| k);
            pairs
        })
        .collect()
}
