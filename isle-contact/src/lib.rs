//! Sequential-impulse contact solver for simulation islands.
//!
//! This crate resolves interpenetration and Coulomb friction between the
//! rigid bodies of one simulation island. Given the contact manifolds
//! produced by an upstream collision-detection stage, it computes per-body
//! linear and angular velocity corrections such that, after integration,
//! no contact keeps interpenetrating and friction limits are respected.
//!
//! # Algorithm
//!
//! The solver is a Projected Gauss-Seidel (PGS) iteration over four
//! coupled constraint families per contact manifold:
//!
//! 1. **Non-penetration** - one row per contact point, impulse clamped
//!    to `lambda >= 0`
//! 2. **Tangential friction** - two rows per manifold at the manifold
//!    center, box-clamped to `|lambda| <= mu * sum(lambda_n)`
//! 3. **Twist friction** - one angular row about the averaged normal,
//!    clamped to the same limit
//! 4. **Rolling resistance** - one vector row, clamped to a ball of
//!    radius `mu_r * sum(lambda_n)`
//!
//! Velocities are updated in place, so later rows in an iteration see the
//! impulses applied by earlier rows; that ordering is what makes
//! Gauss-Seidel converge. Warm starting seeds each step with the impulses
//! cached on the external contact records, and a split-impulse pass
//! accumulates the Baumgarte positional correction in separate velocities
//! so penetration recovery does not add kinetic energy.
//!
//! # Example
//!
//! ```
//! use isle_contact::{ContactSolver, IslandVelocities};
//! use isle_types::{BodyId, ContactManifold, ContactPoint, Island, RigidBody, SolverParams};
//! use nalgebra::{Matrix3, Point3, Vector3};
//!
//! // A dynamic unit box resting on static ground.
//! let mut island = Island::new();
//! island.add_body(BodyId::new(0), RigidBody::static_body(Point3::origin()));
//! island.add_body(
//!     BodyId::new(1),
//!     RigidBody::dynamic(Point3::new(0.0, 0.5, 0.0), 1.0, Matrix3::identity() * 6.0),
//! );
//! let mut manifold = ContactManifold::new(BodyId::new(0), BodyId::new(1));
//! for (x, z) in [(-0.5, -0.5), (-0.5, 0.5), (0.5, -0.5), (0.5, 0.5)] {
//!     let p = Point3::new(x, 0.0, z);
//!     manifold.add_point(ContactPoint::new(p, p, Vector3::y(), 0.0));
//! }
//! island.add_manifold(manifold);
//!
//! // The box is falling at 1 m/s.
//! let mut velocities = IslandVelocities::for_island(&island);
//! velocities.linear[1] = Vector3::new(0.0, -1.0, 0.0);
//!
//! let mut solver = ContactSolver::new(SolverParams::default());
//! solver.solve(1.0 / 60.0, &mut island, &mut velocities).unwrap();
//!
//! // The downward velocity has been absorbed by the contact.
//! assert!(velocities.linear[1].y.abs() < 1e-3);
//! ```
//!
//! # Scope
//!
//! Collision detection, island partitioning, and position integration are
//! caller concerns. Islands share no bodies, so the caller may solve them
//! in parallel; this solver is serial within one island and holds no
//! global state.

#![doc(html_root_url = "https://docs.rs/isle-contact/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod constraint;
mod math;
mod solver;
mod velocities;

pub use constraint::{FrictionConstraint, PenetrationConstraint};
pub use solver::ContactSolver;
pub use velocities::IslandVelocities;

// Re-export the types the solver operates on
pub use isle_types::{
    BodyId, ContactManifold, ContactPoint, Island, Material, RigidBody, SolverError, SolverParams,
};
