//! Solver parameters.
//!
//! All stabilization coefficients live here as explicit configuration
//! passed to the solver, not as process-wide constants. Defaults match
//! the values that work well at interactive time steps (60-240 Hz).

use crate::SolverError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the contact solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverParams {
    /// Baumgarte stabilization factor for the velocity pass (0-1).
    ///
    /// Higher values correct penetration faster but inject energy.
    pub beta: f64,

    /// Baumgarte factor used by the split-impulse position pass (0-1).
    pub beta_split_impulse: f64,

    /// Allowed penetration (m) before Baumgarte correction kicks in.
    pub penetration_slop: f64,

    /// Normal approach speed (m/s) below which restitution is suppressed.
    ///
    /// Contacts slower than this are resting contacts and do not bounce.
    pub restitution_velocity_threshold: f64,

    /// Seed the iteration with impulses cached from the previous step.
    pub warm_starting: bool,

    /// Accumulate the positional correction in separate split velocities
    /// so that penetration recovery does not add kinetic energy.
    pub split_impulse: bool,

    /// Number of velocity iterations for the convenience driver.
    pub velocity_iterations: usize,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            beta: 0.2,
            beta_split_impulse: 0.2,
            penetration_slop: 0.01,
            restitution_velocity_threshold: 1.0,
            warm_starting: true,
            split_impulse: true,
            velocity_iterations: 10,
        }
    }
}

impl SolverParams {
    /// Fast configuration for real-time scenes.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            velocity_iterations: 6,
            ..Default::default()
        }
    }

    /// High-accuracy configuration for stacks and articulated scenes.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            velocity_iterations: 15,
            ..Default::default()
        }
    }

    /// Set the Baumgarte factor.
    #[must_use]
    pub const fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Set the penetration slop.
    #[must_use]
    pub const fn with_penetration_slop(mut self, slop: f64) -> Self {
        self.penetration_slop = slop;
        self
    }

    /// Enable or disable warm starting.
    #[must_use]
    pub const fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    /// Enable or disable split-impulse position correction.
    #[must_use]
    pub const fn with_split_impulse(mut self, enabled: bool) -> Self {
        self.split_impulse = enabled;
        self
    }

    /// Set the iteration count used by the convenience driver.
    #[must_use]
    pub const fn with_velocity_iterations(mut self, iterations: usize) -> Self {
        self.velocity_iterations = iterations;
        self
    }

    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidParams`] if any value is out of range.
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.beta) || !self.beta.is_finite() {
            return Err(SolverError::invalid_params("beta must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.beta_split_impulse) || !self.beta_split_impulse.is_finite() {
            return Err(SolverError::invalid_params(
                "beta_split_impulse must be in [0, 1]",
            ));
        }
        if self.penetration_slop < 0.0 || !self.penetration_slop.is_finite() {
            return Err(SolverError::invalid_params(
                "penetration_slop must be non-negative",
            ));
        }
        if self.restitution_velocity_threshold < 0.0
            || !self.restitution_velocity_threshold.is_finite()
        {
            return Err(SolverError::invalid_params(
                "restitution_velocity_threshold must be non-negative",
            ));
        }
        if self.velocity_iterations == 0 {
            return Err(SolverError::invalid_params(
                "velocity_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}
