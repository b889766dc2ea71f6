//! Model artifact and weight-bound inference.

use core::fmt::Debug;
use core::hash::Hash;

use std::io::{Read, Write};

use bincode::{Decode, Encode};

use crate::anchoring::{Anchoring, Augment, NoAugment};
use crate::common;
use crate::constraints::ConstraintsFactory;
use crate::errors::{Result, TrellisError};
use crate::featurizer::{AnchoredFeatures, IndexedFeaturizer};
use crate::label::LabelIndex;
use crate::marginal::{Marginal, TransitionVisitor};
use crate::surface::SurfaceFeaturizer;
use crate::viterbi::ViterbiPath;

/// Accumulator of a loss value and expected feature counts.
///
/// One accumulator serves one training pass or minibatch and has a single
/// writer; drivers that fan sentences out over threads keep one accumulator
/// per worker and [`merge`](Self::merge) at the end.
pub struct ExpectedCounts {
    /// Accumulated loss.
    pub loss: f64,

    /// Accumulated per-feature counts, indexed by feature id.
    pub counts: Vec<f64>,
}

impl ExpectedCounts {
    /// Creates a zero accumulator for the given number of features.
    pub fn new(num_features: usize) -> Self {
        Self {
            loss: 0.0,
            counts: vec![0.0; num_features],
        }
    }

    /// Adds another accumulator into this one.
    pub fn merge(&mut self, other: &ExpectedCounts) {
        debug_assert_eq!(self.counts.len(), other.counts.len());
        self.loss += other.loss;
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
    }
}

/// A trained linear-chain CRF: label universe, feature index, and weights.
///
/// Immutable during inference and freely shareable across threads. The
/// weight vector is only replaced wholesale through
/// [`set_weights`](Self::set_weights), the seam an external optimizer drives.
pub struct CrfModel<L, C, S> {
    label_index: LabelIndex<L>,
    featurizer: IndexedFeaturizer<C, S>,
    weights: Vec<f64>,
}

impl<L, C, S> CrfModel<L, C, S>
where
    L: Eq + Hash + Clone,
{
    /// Creates a model from its parts.
    ///
    /// # Errors
    ///
    /// [`TrellisError::DimensionMismatch`] is returned when the weight
    /// vector does not cover the feature index exactly, or when the
    /// featurizer was built against a different label universe.
    pub fn new(
        label_index: LabelIndex<L>,
        featurizer: IndexedFeaturizer<C, S>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        if weights.len() != featurizer.num_features() as usize {
            return Err(TrellisError::dimension_mismatch(
                featurizer.num_features() as usize,
                weights.len(),
            ));
        }
        if label_index.len() != featurizer.num_tags() as usize {
            return Err(TrellisError::dimension_mismatch(
                featurizer.num_tags() as usize,
                label_index.len(),
            ));
        }
        if label_index.start_id() != featurizer.start_id() {
            return Err(TrellisError::dimension_mismatch(
                featurizer.start_id() as usize,
                label_index.start_id() as usize,
            ));
        }
        Ok(Self {
            label_index,
            featurizer,
            weights,
        })
    }

    /// Creates a model whose weights are produced per feature id.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_initial_weights<F>(
        label_index: LabelIndex<L>,
        featurizer: IndexedFeaturizer<C, S>,
        mut init: F,
    ) -> Result<Self>
    where
        F: FnMut(u32) -> f64,
    {
        let weights = (0..featurizer.num_features()).map(&mut init).collect();
        Self::new(label_index, featurizer, weights)
    }

    /// Returns the label index.
    #[inline(always)]
    pub const fn label_index(&self) -> &LabelIndex<L> {
        &self.label_index
    }

    /// Returns the feature index.
    #[inline(always)]
    pub const fn featurizer(&self) -> &IndexedFeaturizer<C, S> {
        &self.featurizer
    }

    /// Returns the weight vector.
    #[inline(always)]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Replaces the weight vector.
    ///
    /// # Errors
    ///
    /// [`TrellisError::DimensionMismatch`] is returned when the new vector
    /// does not cover the feature index exactly.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<()> {
        if weights.len() != self.featurizer.num_features() as usize {
            return Err(TrellisError::dimension_mismatch(
                self.featurizer.num_features() as usize,
                weights.len(),
            ));
        }
        self.weights = weights;
        Ok(())
    }

    /// Binds the weights, producing the inference view.
    pub const fn inference(&self) -> CrfInference<'_, L, C, S> {
        CrfInference { model: self }
    }

    /// Exports the model data.
    ///
    /// # Errors
    ///
    /// When bincode generates an error, it will be returned as is.
    pub fn write<W>(&self, mut wtr: W) -> Result<usize>
    where
        W: Write,
        L: Encode + 'static,
        C: Encode,
        S: Encode,
    {
        let num_bytes = bincode::encode_into_std_write(
            (&self.label_index, &self.featurizer, &self.weights),
            &mut wtr,
            common::bincode_config(),
        )?;
        Ok(num_bytes)
    }

    /// Creates a model from a reader.
    ///
    /// # Errors
    ///
    /// When bincode generates an error, it will be returned as is; decoded
    /// data failing the checks of [`new`](Self::new) is reported the same
    /// way as at construction.
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
        L: Decode + 'static,
        C: Decode,
        S: Decode,
    {
        let (label_index, featurizer, weights) =
            bincode::decode_from_std_read(&mut rdr, common::bincode_config())?;
        Self::new(label_index, featurizer, weights)
    }
}

/// Weight-bound inference over a [`CrfModel`].
pub struct CrfInference<'a, L, C, S> {
    model: &'a CrfModel<L, C, S>,
}

impl<L, C, S> CrfInference<'_, L, C, S>
where
    L: Eq + Hash + Clone,
{
    /// Anchors one sentence with the identity augment.
    ///
    /// # Errors
    ///
    /// [`TrellisError::EmptyConstraint`] is returned when some position has
    /// no allowed tag.
    pub fn anchor<W>(&self, words: &[W]) -> Result<Anchoring<NoAugment>>
    where
        C: ConstraintsFactory<W>,
        S: SurfaceFeaturizer<W>,
    {
        self.anchor_with(words, NoAugment)
    }

    /// Anchors one sentence with an external augment composed in, for
    /// constrained decoding or reranking.
    ///
    /// # Errors
    ///
    /// [`TrellisError::EmptyConstraint`] is returned when some position has
    /// no allowed tag.
    pub fn anchor_with<W, A>(&self, words: &[W], augment: A) -> Result<Anchoring<A>>
    where
        C: ConstraintsFactory<W>,
        S: SurfaceFeaturizer<W>,
        A: Augment,
    {
        let feats = self.model.featurizer.anchor(words)?;
        Ok(Anchoring::new(feats, &self.model.weights, augment))
    }

    /// Maps gold labels to tag ids.
    ///
    /// # Errors
    ///
    /// [`TrellisError::UnknownLabel`] is returned on the first label outside
    /// the index.
    pub fn gold_tags(&self, labels: &[L]) -> Result<Vec<u32>>
    where
        L: Debug,
    {
        self.model.label_index.tag_ids(labels)
    }

    /// Creates a zero accumulator sized to the feature index.
    pub fn empty_counts(&self) -> ExpectedCounts {
        ExpectedCounts::new(self.model.featurizer.num_features() as usize)
    }

    /// Accumulates `scale` times the expected feature counts of a posterior.
    ///
    /// The loss field receives `scale * log_partition`. With `scale = 1` on
    /// the model posterior and `scale = -1` on the gold posterior, the
    /// accumulator holds the log-likelihood gradient
    /// `E_model[f] - f(x, y*)` and the negative log-likelihood itself.
    ///
    /// # Errors
    ///
    /// [`TrellisError::MissingFeatures`] is returned when non-zero posterior
    /// mass falls on a transition without a feature vector, which means the
    /// feature cache is inconsistent with the constraints.
    pub fn accumulate<A>(
        &self,
        marginal: &Marginal<'_, A>,
        counts: &mut ExpectedCounts,
        scale: f64,
    ) -> Result<()>
    where
        A: Augment,
    {
        debug_assert_eq!(
            counts.counts.len(),
            self.model.featurizer.num_features() as usize
        );
        counts.loss += marginal.log_partition() * scale;
        let mut visitor = CountVisitor {
            feats: marginal.anchoring().features(),
            counts,
            scale,
        };
        marginal.visit_transitions(&mut visitor)
    }

    /// Posterior decoding: the position-wise argmax of the position
    /// marginals, ties broken toward the lowest tag id.
    pub fn annotate<A>(&self, marginal: &Marginal<'_, A>) -> Vec<L>
    where
        A: Augment,
    {
        let anchoring = marginal.anchoring();
        let mut labels = Vec::with_capacity(anchoring.num_positions());
        for pos in 0..anchoring.num_positions() {
            let mut best = f64::NEG_INFINITY;
            let mut arg = anchoring.allowed_tags(pos)[0];
            for &cur in anchoring.allowed_tags(pos) {
                let mass = marginal.position_marginal(pos, cur);
                if mass > best {
                    best = mass;
                    arg = cur;
                }
            }
            labels.push(self.model.label_index.get(arg).clone());
        }
        labels
    }

    /// Viterbi decoding mapped back to labels.
    ///
    /// # Errors
    ///
    /// [`TrellisError::Infeasible`] is returned when no tag sequence has
    /// finite score.
    pub fn decode<A>(&self, anchoring: &Anchoring<A>) -> Result<(Vec<L>, f64)>
    where
        A: Augment,
    {
        let path: ViterbiPath = anchoring.viterbi()?;
        let labels = path
            .tags()
            .iter()
            .map(|&t| self.model.label_index.get(t).clone())
            .collect();
        Ok((labels, path.score()))
    }
}

struct CountVisitor<'a> {
    feats: &'a AnchoredFeatures,
    counts: &'a mut ExpectedCounts,
    scale: f64,
}

impl TransitionVisitor for CountVisitor<'_> {
    fn visit(&mut self, pos: usize, prev: u32, cur: u32, weight: f64) -> Result<()> {
        let ids = self
            .feats
            .sparse_features(pos, prev, cur)
            .ok_or(TrellisError::missing_features(pos, prev, cur))?;
        for &f in ids {
            self.counts.counts[f as usize] += self.scale * weight;
        }
        Ok(())
    }
}
