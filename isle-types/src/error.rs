//! Error types for solver operations.

use thiserror::Error;

/// Errors that can occur while preparing a contact solve.
///
/// All of these are precondition failures detected at island setup; the
/// iteration passes themselves never fail (clamped projections absorb
/// every numerical edge case).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    /// Island with zero bodies or zero contact manifolds.
    #[error("empty island: {bodies} bodies, {manifolds} manifolds")]
    EmptyIsland {
        /// Number of bodies in the island.
        bodies: usize,
        /// Number of contact manifolds in the island.
        manifolds: usize,
    },

    /// Contact manifold that cannot anchor a constraint.
    #[error("degenerate manifold {manifold}: {reason}")]
    DegenerateManifold {
        /// Index of the offending manifold in the island.
        manifold: usize,
        /// Description of what's wrong.
        reason: String,
    },

    /// Non-finite input (`NaN` or `Inf`) detected at setup.
    #[error("numerical invariant violated: {reason}")]
    NumericalInvariant {
        /// Description of the offending quantity.
        reason: String,
    },

    /// Time step that is zero, negative, or non-finite.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// Solver parameters out of range.
    #[error("invalid solver parameters: {reason}")]
    InvalidParams {
        /// Description of the parameter error.
        reason: String,
    },

    /// Velocity buffers shorter than the island's body count.
    #[error("velocity buffer mismatch: island has {expected} bodies, buffers hold {actual}")]
    VelocityBufferMismatch {
        /// Number of bodies in the island.
        expected: usize,
        /// Length of the velocity buffers.
        actual: usize,
    },
}

impl SolverError {
    /// Create a degenerate-manifold error.
    #[must_use]
    pub fn degenerate_manifold(manifold: usize, reason: impl Into<String>) -> Self {
        Self::DegenerateManifold {
            manifold,
            reason: reason.into(),
        }
    }

    /// Create a numerical-invariant error.
    #[must_use]
    pub fn numerical(reason: impl Into<String>) -> Self {
        Self::NumericalInvariant {
            reason: reason.into(),
        }
    }

    /// Create an invalid-parameters error.
    #[must_use]
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    /// Check if this is a degenerate-manifold error.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateManifold { .. })
    }

    /// Check if this is a numerical-invariant error.
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::NumericalInvariant { .. })
    }
}
