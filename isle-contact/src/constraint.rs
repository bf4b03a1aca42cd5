//! Internal constraint records built at island setup.
//!
//! These are plain scratch structures, rebuilt by
//! [`ContactSolver::initialize_for_island`](crate::ContactSolver::initialize_for_island)
//! and released by [`cleanup`](crate::ContactSolver::cleanup). Every
//! cross-reference is a dense index - into the island's velocity arrays,
//! its manifold list, or the solver's own friction-constraint list -
//! so the records are trivially copyable and carry no ownership.

use nalgebra::{Matrix3, Vector3};

/// Non-penetration constraint for one contact point.
///
/// The accumulated impulses `penetration_impulse` and `split_impulse`
/// are projected onto `>= 0` after every update.
#[derive(Debug, Clone, Copy)]
pub struct PenetrationConstraint {
    /// Velocity index of the first body.
    pub body1: usize,
    /// Velocity index of the second body.
    pub body2: usize,
    /// Inverse mass of the first body.
    pub inv_mass1: f64,
    /// Inverse mass of the second body.
    pub inv_mass2: f64,
    /// World-space inverse inertia tensor of the first body.
    pub inv_inertia1: Matrix3<f64>,
    /// World-space inverse inertia tensor of the second body.
    pub inv_inertia2: Matrix3<f64>,
    /// Unit contact normal (body 1 toward body 2).
    pub normal: Vector3<f64>,
    /// Lever arm from body 1's center of mass to the contact point.
    pub r1: Vector3<f64>,
    /// Lever arm from body 2's center of mass to the contact point.
    pub r2: Vector3<f64>,
    /// Cached `r1 x n`.
    pub r1_cross_n: Vector3<f64>,
    /// Cached `r2 x n`.
    pub r2_cross_n: Vector3<f64>,
    /// Inverse of the effective mass along the normal; zero disables the row.
    pub inverse_normal_mass: f64,
    /// Mixed coefficient of restitution for the pair.
    pub restitution: f64,
    /// Restitution velocity bias, computed once from the initial approach speed.
    pub restitution_bias: f64,
    /// Penetration depth at setup, non-negative.
    pub penetration_depth: f64,
    /// Whether the source contact point existed at the previous step.
    pub is_resting_contact: bool,
    /// Accumulated normal impulse, `>= 0`.
    pub penetration_impulse: f64,
    /// Accumulated split (positional) impulse, `>= 0`.
    pub split_impulse: f64,
    /// Index of the parent friction constraint.
    pub friction_index: usize,
    /// Index of the source manifold in the island.
    pub manifold_index: usize,
    /// Index of the source contact point within its manifold.
    pub point_index: usize,
}

/// Friction constraint for one contact manifold, solved at the manifold
/// center.
///
/// Couples two tangential rows, one twist row, and one rolling-resistance
/// row. All four limits scale with `total_penetration_impulse`, the sum
/// of the normal impulses of the manifold's contact points accumulated in
/// the current iteration.
#[derive(Debug, Clone, Copy)]
pub struct FrictionConstraint {
    /// Velocity index of the first body.
    pub body1: usize,
    /// Velocity index of the second body.
    pub body2: usize,
    /// Inverse mass of the first body.
    pub inv_mass1: f64,
    /// Inverse mass of the second body.
    pub inv_mass2: f64,
    /// World-space inverse inertia tensor of the first body.
    pub inv_inertia1: Matrix3<f64>,
    /// World-space inverse inertia tensor of the second body.
    pub inv_inertia2: Matrix3<f64>,
    /// Mixed friction coefficient for the pair.
    pub friction_coefficient: f64,
    /// Mixed rolling resistance coefficient for the pair.
    pub rolling_resistance: f64,
    /// Lever arm from body 1's center of mass to the manifold center.
    pub r1_friction: Vector3<f64>,
    /// Lever arm from body 2's center of mass to the manifold center.
    pub r2_friction: Vector3<f64>,
    /// Averaged unit contact normal.
    pub normal: Vector3<f64>,
    /// First friction tangent; `t1 x t2 = n`.
    pub friction_vector1: Vector3<f64>,
    /// Second friction tangent.
    pub friction_vector2: Vector3<f64>,
    /// First tangent of the previous step, for impulse re-projection.
    pub old_friction_vector1: Vector3<f64>,
    /// Second tangent of the previous step.
    pub old_friction_vector2: Vector3<f64>,
    /// Cached `r1 x t1`.
    pub r1_cross_t1: Vector3<f64>,
    /// Cached `r1 x t2`.
    pub r1_cross_t2: Vector3<f64>,
    /// Cached `r2 x t1`.
    pub r2_cross_t1: Vector3<f64>,
    /// Cached `r2 x t2`.
    pub r2_cross_t2: Vector3<f64>,
    /// Inverse effective mass along `t1`; zero disables the row.
    pub inverse_friction1_mass: f64,
    /// Inverse effective mass along `t2`; zero disables the row.
    pub inverse_friction2_mass: f64,
    /// Inverse effective mass of the twist row; zero disables the row.
    pub inverse_twist_mass: f64,
    /// Inverse effective mass matrix of the rolling row; zero disables it.
    pub inverse_rolling_resistance: Matrix3<f64>,
    /// Accumulated impulse along `t1`.
    pub friction1_impulse: f64,
    /// Accumulated impulse along `t2`.
    pub friction2_impulse: f64,
    /// Accumulated twist impulse about the normal.
    pub friction_twist_impulse: f64,
    /// Accumulated rolling resistance impulse.
    pub rolling_resistance_impulse: Vector3<f64>,
    /// Sum of the children's normal impulses for the current iteration.
    pub total_penetration_impulse: f64,
    /// Whether any child contact point is a resting contact.
    pub has_resting_contact: bool,
    /// Index of the source manifold in the island.
    pub manifold_index: usize,
}
