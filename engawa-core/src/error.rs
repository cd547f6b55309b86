//! Error types for the engawa core library.
//!
//! Defines error enums exposed by the public API and a convenient result alias.

use std::fmt;

use thiserror::Error;

/// Stable codes describing [`DatasetError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum DatasetErrorCode {
    /// Dataset contained no rows.
    EmptyData,
    /// Dataset rows must have positive dimension.
    ZeroDimension,
    /// Buffer length did not match the declared shape.
    LengthMismatch,
}

impl DatasetErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyData => "DATASET_EMPTY",
            Self::ZeroDimension => "DATASET_ZERO_DIMENSION",
            Self::LengthMismatch => "DATASET_LENGTH_MISMATCH",
        }
    }
}

impl fmt::Display for DatasetErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error produced while validating a [`DatasetView`](crate::DatasetView).
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DatasetError {
    /// Dataset contained no rows.
    #[error("dataset contains no rows")]
    EmptyData,
    /// Dataset rows must have positive dimension.
    #[error("dataset rows must have positive dimension")]
    ZeroDimension,
    /// Buffer length did not match the declared shape.
    #[error("buffer holds {got} scalars but rows x cols requires {expected}")]
    LengthMismatch {
        /// Number of scalars the declared shape requires.
        expected: usize,
        /// Number of scalars the buffer actually holds.
        got: usize,
    },
}

impl DatasetError {
    /// Retrieve the stable [`DatasetErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> DatasetErrorCode {
        match self {
            Self::EmptyData => DatasetErrorCode::EmptyData,
            Self::ZeroDimension => DatasetErrorCode::ZeroDimension,
            Self::LengthMismatch { .. } => DatasetErrorCode::LengthMismatch,
        }
    }
}

/// Stable codes describing [`EngawaError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum EngawaErrorCode {
    /// The minimum points parameter was below the admissible range.
    InvalidMinPoints,
    /// The dataset did not contain enough points for the configured
    /// minimum points parameter.
    InsufficientPoints,
    /// The dataset buffer failed validation.
    DatasetFailure,
    /// The minimum spanning tree could not be constructed.
    MstFailure,
    /// An operation was attempted in a state that does not permit it.
    InvalidState,
    /// A cluster's point count fell below zero during tree construction.
    NegativePointCount,
}

impl EngawaErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidMinPoints => "ENGAWA_INVALID_MIN_POINTS",
            Self::InsufficientPoints => "ENGAWA_INSUFFICIENT_POINTS",
            Self::DatasetFailure => "ENGAWA_DATASET_FAILURE",
            Self::MstFailure => "ENGAWA_MST_FAILURE",
            Self::InvalidState => "ENGAWA_INVALID_STATE",
            Self::NegativePointCount => "ENGAWA_NEGATIVE_POINT_COUNT",
        }
    }
}

impl fmt::Display for EngawaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type produced when configuring or running [`Engawa`](crate::Engawa).
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EngawaError {
    /// The minimum points parameter was below the admissible range.
    #[error("min_points must be at least 2 (got {got})")]
    InvalidMinPoints {
        /// Value the caller supplied.
        got: usize,
    },
    /// The dataset did not contain enough points for `min_points`.
    #[error("dataset has {points} points but min_points requires {min_points}")]
    InsufficientPoints {
        /// Number of points in the dataset.
        points: usize,
        /// Configured minimum points parameter.
        min_points: usize,
    },
    /// The dataset buffer failed validation.
    #[error("dataset is invalid: {error}")]
    Dataset {
        /// Underlying validation failure.
        #[source]
        error: DatasetError,
    },
    /// The minimum spanning tree could not be constructed.
    #[error("could not construct the minimum spanning tree: {reason}")]
    MstFailure {
        /// Short description of the failure.
        reason: &'static str,
    },
    /// An operation was attempted in a state that does not permit it.
    #[error("invalid state: {detail}")]
    InvalidState {
        /// Short description of the violated precondition.
        detail: &'static str,
    },
    /// A cluster's point count fell below zero during tree construction.
    #[error("cluster {label} dropped to {points} points")]
    NegativePointCount {
        /// Label of the offending cluster.
        label: usize,
        /// The negative point count observed.
        points: i64,
    },
}

impl EngawaError {
    /// Retrieve the stable [`EngawaErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> EngawaErrorCode {
        match self {
            Self::InvalidMinPoints { .. } => EngawaErrorCode::InvalidMinPoints,
            Self::InsufficientPoints { .. } => EngawaErrorCode::InsufficientPoints,
            Self::Dataset { .. } => EngawaErrorCode::DatasetFailure,
            Self::MstFailure { .. } => EngawaErrorCode::MstFailure,
            Self::InvalidState { .. } => EngawaErrorCode::InvalidState,
            Self::NegativePointCount { .. } => EngawaErrorCode::NegativePointCount,
        }
    }

    /// Retrieve the inner [`DatasetErrorCode`] when the error originated in
    /// dataset validation.
    #[must_use]
    pub const fn dataset_code(&self) -> Option<DatasetErrorCode> {
        match self {
            Self::Dataset { error } => Some(error.code()),
            _ => None,
        }
    }
}

impl From<DatasetError> for EngawaError {
    fn from(error: DatasetError) -> Self {
        Self::Dataset { error }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, EngawaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = EngawaError::InvalidMinPoints { got: 1 };
        assert_eq!(err.code(), EngawaErrorCode::InvalidMinPoints);
        assert_eq!(err.code().as_str(), "ENGAWA_INVALID_MIN_POINTS");
        assert_eq!(err.dataset_code(), None);
    }

    #[test]
    fn dataset_errors_surface_their_inner_code() {
        let err = EngawaError::from(DatasetError::LengthMismatch {
            expected: 6,
            got: 4,
        });
        assert_eq!(err.code(), EngawaErrorCode::DatasetFailure);
        assert_eq!(err.dataset_code(), Some(DatasetErrorCode::LengthMismatch));
    }
}
