//! Contact points and contact manifolds.
//!
//! A [`ContactManifold`] groups the coplanar contact points found between
//! one pair of bodies. Besides geometry, both types carry the impulses
//! accumulated by the solver in the previous step: this cache is what
//! makes warm starting work, and it lives here - on the externally owned
//! contact records - rather than inside the solver, so that it survives
//! between solver invocations.

use crate::BodyId;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Typical maximum number of contact points per manifold.
///
/// Narrow-phase reduction usually keeps at most four coplanar points per
/// convex pair. This is a sizing hint, not a hard limit.
pub const MAX_MANIFOLD_POINTS: usize = 4;

/// A single contact point between two bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactPoint {
    /// World-space contact point on the surface of the first body.
    pub point1: Point3<f64>,
    /// World-space contact point on the surface of the second body.
    pub point2: Point3<f64>,
    /// Unit contact normal, pointing from the first body toward the second.
    pub normal: Vector3<f64>,
    /// Penetration depth, non-negative.
    pub penetration_depth: f64,
    /// Whether this contact already existed at the previous step.
    ///
    /// The solver sets this to `true` for every point it sees, so a
    /// surviving contact counts as resting from its second frame onward
    /// and becomes eligible for warm starting.
    pub is_resting_contact: bool,
    /// Accumulated normal impulse from the previous step (warm-start cache).
    pub penetration_impulse: f64,
}

impl ContactPoint {
    /// Create a new contact point.
    ///
    /// The point starts as a fresh (non-resting) contact with no cached
    /// impulse.
    #[must_use]
    pub fn new(
        point1: Point3<f64>,
        point2: Point3<f64>,
        normal: Vector3<f64>,
        penetration_depth: f64,
    ) -> Self {
        Self {
            point1,
            point2,
            normal,
            penetration_depth,
            is_resting_contact: false,
            penetration_impulse: 0.0,
        }
    }

    /// Check that all quantities are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.point1.coords.iter().all(|x| x.is_finite())
            && self.point2.coords.iter().all(|x| x.is_finite())
            && self.normal.iter().all(|x| x.is_finite())
            && self.penetration_depth.is_finite()
            && self.penetration_impulse.is_finite()
    }
}

/// A set of coplanar contact points between one pair of bodies.
///
/// Carries the friction warm-start cache: the tangent basis used at the
/// previous step and the friction, twist, and rolling impulses accumulated
/// in that basis. The solver re-projects the cached impulses into the new
/// basis at setup.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactManifold {
    /// First body of the pair.
    pub body1: BodyId,
    /// Second body of the pair.
    pub body2: BodyId,
    /// Ordered contact points; non-empty for a solvable manifold.
    pub points: Vec<ContactPoint>,
    /// First friction tangent from the previous step.
    pub friction_vector1: Vector3<f64>,
    /// Second friction tangent from the previous step.
    pub friction_vector2: Vector3<f64>,
    /// Accumulated impulse along `friction_vector1`.
    pub friction1_impulse: f64,
    /// Accumulated impulse along `friction_vector2`.
    pub friction2_impulse: f64,
    /// Accumulated twist friction impulse about the contact normal.
    pub friction_twist_impulse: f64,
    /// Accumulated rolling resistance impulse.
    pub rolling_resistance_impulse: Vector3<f64>,
}

impl ContactManifold {
    /// Create an empty manifold for a body pair.
    #[must_use]
    pub fn new(body1: BodyId, body2: BodyId) -> Self {
        Self {
            body1,
            body2,
            points: Vec::with_capacity(MAX_MANIFOLD_POINTS),
            friction_vector1: Vector3::zeros(),
            friction_vector2: Vector3::zeros(),
            friction1_impulse: 0.0,
            friction2_impulse: 0.0,
            friction_twist_impulse: 0.0,
            rolling_resistance_impulse: Vector3::zeros(),
        }
    }

    /// Create a manifold from a body pair and its contact points.
    #[must_use]
    pub fn with_points(body1: BodyId, body2: BodyId, points: Vec<ContactPoint>) -> Self {
        Self {
            points,
            ..Self::new(body1, body2)
        }
    }

    /// Append a contact point.
    pub fn add_point(&mut self, point: ContactPoint) {
        self.points.push(point);
    }

    /// Number of contact points.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Check that all points and caches are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.points.iter().all(ContactPoint::is_finite)
            && self.friction_vector1.iter().all(|x| x.is_finite())
            && self.friction_vector2.iter().all(|x| x.is_finite())
            && self.friction1_impulse.is_finite()
            && self.friction2_impulse.is_finite()
            && self.friction_twist_impulse.is_finite()
            && self.rolling_resistance_impulse.iter().all(|x| x.is_finite())
    }
}
