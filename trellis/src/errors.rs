//! Definition of errors.

use std::error::Error;
use std::fmt;

/// A specialized Result type for Trellis.
pub type Result<T, E = TrellisError> = std::result::Result<T, E>;

/// The error type for Trellis.
#[derive(Debug)]
pub enum TrellisError {
    /// The error variant for [`InvalidArgumentError`].
    InvalidArgument(InvalidArgumentError),

    /// The error variant for [`UnknownLabelError`].
    UnknownLabel(UnknownLabelError),

    /// The error variant for [`EmptyConstraintError`].
    EmptyConstraint(EmptyConstraintError),

    /// The error variant for [`InfeasibleError`].
    Infeasible(InfeasibleError),

    /// The error variant for [`MissingFeaturesError`].
    MissingFeatures(MissingFeaturesError),

    /// The error variant for [`DimensionMismatchError`].
    DimensionMismatch(DimensionMismatchError),

    /// The error variant for [`DecodeError`](bincode::error::DecodeError).
    BincodeDecode(bincode::error::DecodeError),

    /// The error variant for [`EncodeError`](bincode::error::EncodeError).
    BincodeEncode(bincode::error::EncodeError),

    /// The error variant for [`std::io::Error`].
    StdIo(std::io::Error),
}

impl TrellisError {
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    /// Variant of [`invalid_argument`](Self::invalid_argument) for input
    /// data in a broken format.
    pub(crate) fn invalid_format<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn unknown_label<S>(label: S) -> Self
    where
        S: Into<String>,
    {
        Self::UnknownLabel(UnknownLabelError {
            label: label.into(),
        })
    }

    pub(crate) const fn empty_constraint(pos: usize) -> Self {
        Self::EmptyConstraint(EmptyConstraintError { pos })
    }

    pub(crate) const fn infeasible(pos: usize) -> Self {
        Self::Infeasible(InfeasibleError { pos })
    }

    pub(crate) const fn missing_features(pos: usize, prev: u32, cur: u32) -> Self {
        Self::MissingFeatures(MissingFeaturesError { pos, prev, cur })
    }

    pub(crate) const fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch(DimensionMismatchError { expected, actual })
    }
}

impl fmt::Display for TrellisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::UnknownLabel(e) => e.fmt(f),
            Self::EmptyConstraint(e) => e.fmt(f),
            Self::Infeasible(e) => e.fmt(f),
            Self::MissingFeatures(e) => e.fmt(f),
            Self::DimensionMismatch(e) => e.fmt(f),
            Self::BincodeDecode(e) => e.fmt(f),
            Self::BincodeEncode(e) => e.fmt(f),
            Self::StdIo(e) => e.fmt(f),
        }
    }
}

impl Error for TrellisError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when a label is not registered in the label index.
#[derive(Debug)]
pub struct UnknownLabelError {
    /// Debug rendering of the offending label.
    pub(crate) label: String,
}

impl fmt::Display for UnknownLabelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UnknownLabelError: label not indexed: {}", self.label)
    }
}

impl Error for UnknownLabelError {}

/// Error used when the set of allowed tags at a position is empty.
#[derive(Debug)]
pub struct EmptyConstraintError {
    /// Position with no allowed tag.
    pub(crate) pos: usize,
}

impl fmt::Display for EmptyConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "EmptyConstraintError: no allowed tags at position {}",
            self.pos
        )
    }
}

impl Error for EmptyConstraintError {}

/// Error used when no tag sequence has finite score under the anchoring.
#[derive(Debug)]
pub struct InfeasibleError {
    /// First position whose trellis column is entirely unreachable.
    pub(crate) pos: usize,
}

impl fmt::Display for InfeasibleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "InfeasibleError: all tags unreachable at position {}",
            self.pos
        )
    }
}

impl Error for InfeasibleError {}

/// Error used when posterior mass falls on a transition without features.
#[derive(Debug)]
pub struct MissingFeaturesError {
    /// Position of the transition.
    pub(crate) pos: usize,

    /// Previous tag id.
    pub(crate) prev: u32,

    /// Current tag id.
    pub(crate) cur: u32,
}

impl fmt::Display for MissingFeaturesError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "MissingFeaturesError: non-zero marginal on unfeaturized transition ({}, {}, {})",
            self.pos, self.prev, self.cur
        )
    }
}

impl Error for MissingFeaturesError {}

/// Error used when two sizes that must agree do not, e.g. a weight vector
/// not covering the feature index.
#[derive(Debug)]
pub struct DimensionMismatchError {
    /// The size required.
    pub(crate) expected: usize,

    /// The size actually given.
    pub(crate) actual: usize,
}

impl fmt::Display for DimensionMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "DimensionMismatchError: expected size {}, got {}",
            self.expected, self.actual
        )
    }
}

impl Error for DimensionMismatchError {}

impl From<bincode::error::DecodeError> for TrellisError {
    fn from(error: bincode::error::DecodeError) -> Self {
        Self::BincodeDecode(error)
    }
}

impl From<bincode::error::EncodeError> for TrellisError {
    fn from(error: bincode::error::EncodeError) -> Self {
        Self::BincodeEncode(error)
    }
}

impl From<std::io::Error> for TrellisError {
    fn from(error: std::io::Error) -> Self {
        Self::StdIo(error)
    }
}
