//! Trellis is a first-order linear-chain conditional random field engine for
//! sequence labeling tasks such as part-of-speech tagging and chunking.
//!
//! Given a sentence and a weight vector over sparse features, the engine
//! computes the most probable tag sequence (Viterbi), per-position and
//! per-transition posterior marginals (forward–backward), the log-partition
//! function, and expected feature counts usable as gradients by an external
//! trainer. Tag lexicons, surface featurizers, and optimizers plug in
//! through the traits of [`constraints`], [`surface`], and
//! [`anchoring::Augment`].
#![deny(missing_docs)]

#[cfg(target_pointer_width = "16")]
compile_error!("`target_pointer_width` must be larger than or equal to 32");

pub mod anchoring;
pub mod common;
pub mod constraints;
pub mod corpus;
pub mod errors;
pub mod featurizer;
pub mod label;
pub mod marginal;
pub mod model;
mod num;
pub mod sequence;
pub mod surface;
pub mod viterbi;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod tests;

pub use crate::label::LabelIndex;
pub use crate::model::{CrfInference, CrfModel, ExpectedCounts};
