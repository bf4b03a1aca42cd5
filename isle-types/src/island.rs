//! Simulation islands.
//!
//! An island is a group of bodies connected by contacts that must be
//! solved together. Islands share no bodies with each other, so a caller
//! may solve them in parallel; within one island the solver is serial.
//!
//! The island owns its bodies and manifolds and exposes a dense
//! body-to-index mapping. The mapping is injective and stable for the
//! lifetime of the island, which is what the solver's velocity buffers
//! and constraint indices rely on.

use crate::{BodyId, ContactManifold, RigidBody, SolverError};
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A group of bodies and contact manifolds solved together.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Island {
    bodies: Vec<RigidBody>,
    body_ids: Vec<BodyId>,
    body_index: HashMap<BodyId, usize>,
    manifolds: Vec<ContactManifold>,
}

impl Island {
    /// Create an empty island.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body and return its velocity index.
    ///
    /// If the ID is already present the stored body is replaced and the
    /// existing index is returned; indices are never invalidated.
    pub fn add_body(&mut self, id: BodyId, body: RigidBody) -> usize {
        if let Some(&index) = self.body_index.get(&id) {
            self.bodies[index] = body;
            return index;
        }
        let index = self.bodies.len();
        self.bodies.push(body);
        self.body_ids.push(id);
        self.body_index.insert(id, index);
        index
    }

    /// Add a contact manifold.
    pub fn add_manifold(&mut self, manifold: ContactManifold) {
        self.manifolds.push(manifold);
    }

    /// The dense velocity index of a body, if it belongs to this island.
    #[must_use]
    pub fn velocity_index(&self, id: BodyId) -> Option<usize> {
        self.body_index.get(&id).copied()
    }

    /// Body at the given velocity index.
    #[must_use]
    pub fn body(&self, index: usize) -> Option<&RigidBody> {
        self.bodies.get(index)
    }

    /// All bodies, in velocity-index order.
    #[must_use]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// All contact manifolds.
    #[must_use]
    pub fn manifolds(&self) -> &[ContactManifold] {
        &self.manifolds
    }

    /// Mutable access to the contact manifolds.
    ///
    /// The solver uses this to flag contact points as resting during
    /// setup and to write accumulated impulses back after a solve.
    pub fn manifolds_mut(&mut self) -> &mut [ContactManifold] {
        &mut self.manifolds
    }

    /// Number of bodies.
    #[must_use]
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// Number of contact manifolds.
    #[must_use]
    pub fn num_manifolds(&self) -> usize {
        self.manifolds.len()
    }

    /// Check the island against the solver's preconditions.
    ///
    /// An island is solvable when it has at least one body and one
    /// manifold, every manifold has at least one contact point and joins
    /// two distinct bodies that belong to the island, and every numeric
    /// input is finite.
    ///
    /// # Errors
    ///
    /// Returns the first violated precondition.
    pub fn validate(&self) -> crate::Result<()> {
        if self.bodies.is_empty() || self.manifolds.is_empty() {
            return Err(SolverError::EmptyIsland {
                bodies: self.bodies.len(),
                manifolds: self.manifolds.len(),
            });
        }

        for (index, body) in self.bodies.iter().enumerate() {
            if !body.is_finite() {
                return Err(SolverError::numerical(format!(
                    "non-finite body at velocity index {index}"
                )));
            }
        }

        for (index, manifold) in self.manifolds.iter().enumerate() {
            if manifold.points.is_empty() {
                return Err(SolverError::degenerate_manifold(
                    index,
                    "no contact points",
                ));
            }
            if manifold.body1 == manifold.body2 {
                return Err(SolverError::degenerate_manifold(
                    index,
                    format!("self-contact on {}", manifold.body1),
                ));
            }
            for id in [manifold.body1, manifold.body2] {
                if !self.body_index.contains_key(&id) {
                    return Err(SolverError::degenerate_manifold(
                        index,
                        format!("{id} is not in the island"),
                    ));
                }
            }
            if !manifold.is_finite() {
                return Err(SolverError::numerical(format!(
                    "non-finite contact data in manifold {index}"
                )));
            }
        }

        Ok(())
    }
}
