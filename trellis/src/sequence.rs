//! Training and decoding datum.

use crate::errors::{Result, TrellisError};

/// A sentence paired with its gold labeling.
pub struct TaggedSequence<L, W> {
    labels: Vec<L>,
    words: Vec<W>,
    id: String,
}

impl<L, W> TaggedSequence<L, W> {
    /// Creates a new datum.
    ///
    /// # Arguments
    ///
    ///  - `labels`: Gold labels, one per word.
    ///  - `words`: Surface tokens.
    ///  - `id`: Opaque identifier used in diagnostics.
    ///
    /// # Errors
    ///
    /// [`TrellisError::InvalidArgument`] is returned when the two slices
    /// differ in length.
    pub fn new<S>(labels: Vec<L>, words: Vec<W>, id: S) -> Result<Self>
    where
        S: Into<String>,
    {
        if labels.len() != words.len() {
            return Err(TrellisError::invalid_argument(
                "labels",
                format!(
                    "must have one label per word: {} labels, {} words",
                    labels.len(),
                    words.len()
                ),
            ));
        }
        Ok(Self {
            labels,
            words,
            id: id.into(),
        })
    }

    /// Returns the gold labels.
    #[inline(always)]
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Returns the surface tokens.
    #[inline(always)]
    pub fn words(&self) -> &[W] {
        &self.words
    }

    /// Returns the identifier.
    #[inline(always)]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the number of positions.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Checks if the sequence has no positions.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
