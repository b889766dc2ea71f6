use bincode::{Decode, Encode};

use crate::constraints::{ConstraintsFactory, TagConstraints};
use crate::errors::Result;
use crate::surface::{FeatureLevel, SurfaceFeaturizer, SurfaceFeatures};

macro_rules! hashmap {
    ( $($k:expr => $v:expr,)* ) => {
        {
            #[allow(unused_mut)]
            let mut h = hashbrown::HashMap::new();
            $(
                h.insert($k, $v);
            )*
            h
        }
    };
    ( $($k:expr => $v:expr),* ) => {
        hashmap![$( $k => $v, )*]
    };
}

pub(crate) use hashmap;

/// Fixed per-position tag sets, ignoring the words.
#[derive(Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct FixedConstraints {
    sets: Vec<Vec<u32>>,
}

impl FixedConstraints {
    pub(crate) fn new(sets: Vec<Vec<u32>>) -> Self {
        Self { sets }
    }
}

impl TagConstraints for FixedConstraints {
    fn allowed_tags(&self, pos: usize) -> &[u32] {
        &self.sets[pos]
    }
}

impl<W> ConstraintsFactory<W> for FixedConstraints {
    type Anchored = Self;

    fn anchor(&self, _words: &[W]) -> Result<Self> {
        Ok(self.clone())
    }
}

/// Fixed per-position surface features, ignoring the words.
#[derive(Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct FixedSurface {
    std: Vec<Vec<u32>>,
    min: Vec<Vec<u32>>,
}

impl FixedSurface {
    pub(crate) fn new(std: Vec<Vec<u32>>, min: Vec<Vec<u32>>) -> Self {
        Self { std, min }
    }
}

impl SurfaceFeatures for FixedSurface {
    fn features(&self, pos: usize, level: FeatureLevel) -> &[u32] {
        match level {
            FeatureLevel::Standard => &self.std[pos],
            FeatureLevel::Minimal => &self.min[pos],
        }
    }
}

impl<W> SurfaceFeaturizer<W> for FixedSurface {
    type Anchored = Self;

    fn anchor(&self, _words: &[W]) -> Self {
        self.clone()
    }
}

/// Word-identity surface features over a closed vocabulary.
///
/// Surface id 0 is a bias firing at every position and both levels; words of
/// the vocabulary fire `1 + index` at the `Standard` level only. Unknown
/// words fire the bias alone.
#[derive(Clone, Debug, Decode, Encode)]
pub(crate) struct WordIdFeaturizer {
    vocab: Vec<String>,
}

impl WordIdFeaturizer {
    pub(crate) fn new<I, S>(vocab: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocab: vocab.into_iter().map(Into::into).collect(),
        }
    }
}

impl SurfaceFeaturizer<String> for WordIdFeaturizer {
    type Anchored = FixedSurface;

    fn anchor(&self, words: &[String]) -> FixedSurface {
        let mut std = Vec::with_capacity(words.len());
        let mut min = Vec::with_capacity(words.len());
        for word in words {
            let mut fired = vec![0];
            if let Some(i) = self.vocab.iter().position(|v| v == word) {
                fired.push(1 + i as u32);
            }
            std.push(fired);
            min.push(vec![0]);
        }
        FixedSurface::new(std, min)
    }
}
