//! Per-island velocity buffers.

use isle_types::Island;
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dense velocity buffers for one island, indexed by velocity index.
///
/// The buffers are owned by the caller and borrowed mutably by each
/// solver pass. `linear` and `angular` are the constrained velocities
/// that the caller integrates normally; `split_linear` and
/// `split_angular` accumulate the split-impulse positional correction
/// and must be added to positions separately (and then discarded), so
/// that penetration recovery never feeds back into momentum.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IslandVelocities {
    /// Linear velocities (m/s).
    pub linear: Vec<Vector3<f64>>,
    /// Angular velocities (rad/s).
    pub angular: Vec<Vector3<f64>>,
    /// Split-impulse linear correction velocities.
    pub split_linear: Vec<Vector3<f64>>,
    /// Split-impulse angular correction velocities.
    pub split_angular: Vec<Vector3<f64>>,
}

impl IslandVelocities {
    /// Create zeroed buffers sized for an island.
    #[must_use]
    pub fn for_island(island: &Island) -> Self {
        Self::with_len(island.num_bodies())
    }

    /// Create zeroed buffers of the given length.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self {
            linear: vec![Vector3::zeros(); len],
            angular: vec![Vector3::zeros(); len],
            split_linear: vec![Vector3::zeros(); len],
            split_angular: vec![Vector3::zeros(); len],
        }
    }

    /// Number of bodies covered by the buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.linear.len()
    }

    /// Check if the buffers are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.linear.is_empty()
    }

    /// Zero the split-impulse buffers.
    ///
    /// Call once per step, after the caller has consumed the positional
    /// correction.
    pub fn reset_split(&mut self) {
        for v in &mut self.split_linear {
            *v = Vector3::zeros();
        }
        for v in &mut self.split_angular {
            *v = Vector3::zeros();
        }
    }

    /// Check that every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.linear
            .iter()
            .chain(&self.angular)
            .chain(&self.split_linear)
            .chain(&self.split_angular)
            .all(|v| v.iter().all(|x| x.is_finite()))
    }
}
