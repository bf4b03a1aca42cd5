//! Rigid-body solver views and surface materials.
//!
//! The solver does not own full body state. It only needs the quantities
//! that enter the contact Jacobians: the world-space center of mass, the
//! inverse mass, the world-space inverse inertia tensor, and the surface
//! material. Everything else (pose, full velocity state, shapes) stays
//! with the caller.

use nalgebra::{Matrix3, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for BodyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BodyKind {
    /// Moved by physics; receives contact impulses.
    Dynamic,
    /// Moved by user code; pushes dynamic bodies but is never pushed.
    Kinematic,
    /// Never moves.
    Static,
}

/// Surface material of a body.
///
/// Coefficients are clamped non-negative at construction. Pair mixing
/// happens in [`MixedMaterial::mix`] when two bodies touch.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Coefficient of restitution: 0 is perfectly plastic, 1 perfectly elastic.
    pub restitution: f64,
    /// Coulomb friction coefficient.
    pub friction: f64,
    /// Rolling resistance coefficient.
    pub rolling_resistance: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.5,
            friction: 0.3,
            rolling_resistance: 0.0,
        }
    }
}

impl Material {
    /// Create a material with the given coefficients (clamped non-negative).
    #[must_use]
    pub fn new(restitution: f64, friction: f64, rolling_resistance: f64) -> Self {
        Self {
            restitution: restitution.max(0.0),
            friction: friction.max(0.0),
            rolling_resistance: rolling_resistance.max(0.0),
        }
    }

    /// A frictionless, perfectly plastic material.
    #[must_use]
    pub fn frictionless() -> Self {
        Self {
            restitution: 0.0,
            friction: 0.0,
            rolling_resistance: 0.0,
        }
    }

    /// Check that all coefficients are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.restitution.is_finite()
            && self.friction.is_finite()
            && self.rolling_resistance.is_finite()
    }
}

/// Material coefficients mixed for a body pair.
///
/// Mixing is commutative over the pair:
///
/// - `restitution = max(e1, e2)` (the more elastic surface wins)
/// - `friction = sqrt(mu1 * mu2)`
/// - `rolling_resistance = (r1 + r2) / 2`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixedMaterial {
    /// Mixed coefficient of restitution.
    pub restitution: f64,
    /// Mixed friction coefficient.
    pub friction: f64,
    /// Mixed rolling resistance coefficient.
    pub rolling_resistance: f64,
}

impl MixedMaterial {
    /// Mix the materials of two touching bodies.
    #[must_use]
    pub fn mix(a: &Material, b: &Material) -> Self {
        Self {
            restitution: a.restitution.max(b.restitution),
            friction: (a.friction * b.friction).sqrt(),
            rolling_resistance: 0.5 * (a.rolling_resistance + b.rolling_resistance),
        }
    }
}

/// The contact solver's view of a rigid body.
///
/// Read-only during a solve. For static and kinematic bodies the inverse
/// mass is zero and the inverse inertia tensor is the zero matrix, which
/// makes every impulse applied to them a no-op.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBody {
    /// How the body participates in the simulation.
    pub kind: BodyKind,
    /// World-space center of mass.
    pub center_of_mass: Point3<f64>,
    /// Inverse mass (1/kg); zero for static and kinematic bodies.
    pub inv_mass: f64,
    /// World-space inverse inertia tensor; zero unless dynamic.
    pub inv_inertia_world: Matrix3<f64>,
    /// Surface material.
    pub material: Material,
}

impl RigidBody {
    /// Create a dynamic body from its inverse mass properties.
    ///
    /// `inv_inertia_world` is the inertia tensor inverse already rotated
    /// into world space for the current orientation.
    #[must_use]
    pub fn dynamic(
        center_of_mass: Point3<f64>,
        inv_mass: f64,
        inv_inertia_world: Matrix3<f64>,
    ) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            center_of_mass,
            inv_mass,
            inv_inertia_world,
            material: Material::default(),
        }
    }

    /// Create a static (immovable) body.
    #[must_use]
    pub fn static_body(center_of_mass: Point3<f64>) -> Self {
        Self {
            kind: BodyKind::Static,
            center_of_mass,
            inv_mass: 0.0,
            inv_inertia_world: Matrix3::zeros(),
            material: Material::default(),
        }
    }

    /// Create a kinematic body (script-driven, infinite mass).
    #[must_use]
    pub fn kinematic(center_of_mass: Point3<f64>) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            center_of_mass,
            inv_mass: 0.0,
            inv_inertia_world: Matrix3::zeros(),
            material: Material::default(),
        }
    }

    /// Set the surface material.
    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Check if the body is dynamic.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    /// Check that all quantities are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.center_of_mass.coords.iter().all(|x| x.is_finite())
            && self.inv_mass.is_finite()
            && self.inv_inertia_world.iter().all(|x| x.is_finite())
            && self.material.is_finite()
    }
}
