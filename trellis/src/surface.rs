//! Surface-feature oracles.
//!
//! Word-shape, affix, and gazetteer featurizers live outside the engine; the
//! core consumes their output as opaque integer arrays at two granularities.

/// Granularity of the surface features fired at a position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeatureLevel {
    /// The full feature set, conjoined with unary labels.
    Standard,

    /// A coarser subset, conjoined with label bigrams to bound the blow-up
    /// of pair parameters.
    Minimal,
}

/// Factory producing a per-sentence [`SurfaceFeatures`] view.
pub trait SurfaceFeaturizer<W> {
    /// The sentence-bound view.
    type Anchored: SurfaceFeatures;

    /// Binds the featurizer to one sentence.
    fn anchor(&self, words: &[W]) -> Self::Anchored;
}

/// Sentence-bound bag of surface-feature ids.
pub trait SurfaceFeatures {
    /// Returns the ids of the surface features fired at the given position.
    fn features(&self, pos: usize, level: FeatureLevel) -> &[u32];
}
