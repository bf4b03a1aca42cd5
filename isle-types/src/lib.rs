//! Core types for island-based rigid-body contact solving.
//!
//! This crate provides the foundational data types shared between a
//! collision-detection stage and an iterative contact solver:
//!
//! - [`RigidBody`] - The solver's view of a body: inverse mass, world-space
//!   inverse inertia, center of mass, material
//! - [`ContactPoint`] / [`ContactManifold`] - Contact geometry plus the
//!   cached impulses that warm-start the next step
//! - [`Island`] - A group of bodies and manifolds solved together, with a
//!   stable body-to-velocity-index mapping
//! - [`SolverParams`] - Stabilization coefficients and solver flags
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no solver logic and no
//! integration. They're the common language between:
//!
//! - Narrow-phase collision detection (produces manifolds)
//! - The contact solver (consumes an island, writes impulses back)
//! - Logging and replay (serialized contact state)
//!
//! All cross-references are small integer indices or [`BodyId`] values,
//! never pointers: an [`Island`] owns its bodies and manifolds, and the
//! solver addresses them through the island's dense index map.
//!
//! # Coordinate System
//!
//! World-space, right-handed, `f64` throughout. Contact normals point from
//! the first body of a pair toward the second.
//!
//! # Example
//!
//! ```
//! use isle_types::{BodyId, ContactManifold, ContactPoint, Island, RigidBody};
//! use nalgebra::{Matrix3, Point3, Vector3};
//!
//! let mut island = Island::new();
//! island.add_body(BodyId::new(0), RigidBody::static_body(Point3::origin()));
//! island.add_body(
//!     BodyId::new(1),
//!     RigidBody::dynamic(Point3::new(0.0, 0.5, 0.0), 1.0, Matrix3::identity() * 6.0),
//! );
//!
//! let mut manifold = ContactManifold::new(BodyId::new(0), BodyId::new(1));
//! manifold.add_point(ContactPoint::new(
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(0.0, 0.0, 0.0),
//!     Vector3::y(),
//!     0.0,
//! ));
//! island.add_manifold(manifold);
//!
//! assert!(island.validate().is_ok());
//! assert_eq!(island.velocity_index(BodyId::new(1)), Some(1));
//! ```

#![doc(html_root_url = "https://docs.rs/isle-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod body;
mod config;
mod contact;
mod error;
mod island;

pub use body::{BodyId, BodyKind, Material, MixedMaterial, RigidBody};
pub use config::SolverParams;
pub use contact::{ContactManifold, ContactPoint, MAX_MANIFOLD_POINTS};
pub use error::SolverError;
pub use island::Island;

// Re-export math types for convenience
pub use nalgebra::{Matrix3, Point3, Vector3};

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;
