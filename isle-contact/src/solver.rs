//! The island contact solver.

use crate::constraint::{FrictionConstraint, PenetrationConstraint};
use crate::math::{clamp_magnitude, one_unit_orthogonal};
use crate::IslandVelocities;
use isle_types::{Island, MixedMaterial, Result, SolverError, SolverParams};
use nalgebra::{Matrix3, Vector3};
use tracing::debug;

/// Sequential-impulse contact solver for one simulation island.
///
/// The solver owns only per-island scratch storage (the constraint
/// arrays); all persistent state - cached impulses and friction bases -
/// lives on the external contact records inside the [`Island`]. The
/// expected call sequence per island and step is:
///
/// ```text
/// initialize_for_island(dt, island, velocities)?
/// warm_start(velocities)
/// repeat N times:
///     reset_total_penetration_impulse()
///     solve_penetration_constraints(velocities)
///     solve_friction_constraints(velocities)
/// store_impulses(island)
/// cleanup()
/// ```
///
/// [`solve`](Self::solve) runs that sequence in one call.
#[derive(Debug, Clone)]
pub struct ContactSolver {
    params: SolverParams,
    dt: f64,
    penetration_constraints: Vec<PenetrationConstraint>,
    friction_constraints: Vec<FrictionConstraint>,
}

impl Default for ContactSolver {
    fn default() -> Self {
        Self::new(SolverParams::default())
    }
}

impl ContactSolver {
    /// Create a solver with the given parameters.
    #[must_use]
    pub fn new(params: SolverParams) -> Self {
        Self {
            params,
            dt: 0.0,
            penetration_constraints: Vec::new(),
            friction_constraints: Vec::new(),
        }
    }

    /// Get the solver parameters.
    #[must_use]
    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Get mutable solver parameters.
    pub fn params_mut(&mut self) -> &mut SolverParams {
        &mut self.params
    }

    /// Enable or disable warm starting. Takes effect at the next setup.
    pub fn set_warm_starting_active(&mut self, active: bool) {
        self.params.warm_starting = active;
    }

    /// Enable or disable split-impulse position correction. Takes effect
    /// at the next iteration.
    pub fn set_split_impulse_active(&mut self, active: bool) {
        self.params.split_impulse = active;
    }

    /// The penetration constraints built by the last setup.
    #[must_use]
    pub fn penetration_constraints(&self) -> &[PenetrationConstraint] {
        &self.penetration_constraints
    }

    /// The friction constraints built by the last setup.
    #[must_use]
    pub fn friction_constraints(&self) -> &[FrictionConstraint] {
        &self.friction_constraints
    }

    /// Build the constraint arrays for an island.
    ///
    /// Allocates one [`FrictionConstraint`] per contact manifold and one
    /// [`PenetrationConstraint`] per contact point, and precomputes every
    /// quantity that does not change between iterations: lever arms,
    /// Jacobian cross products, effective masses, mixed material
    /// coefficients, and the restitution bias (which must use the
    /// relative velocity at the *beginning* of the contact).
    ///
    /// Every contact point seen here is flagged as resting on the
    /// external record, so a contact that survives to the next step
    /// warm-starts from its second frame onward.
    ///
    /// # Errors
    ///
    /// Fails fast on the setup preconditions: invalid parameters or time
    /// step, an empty island, a manifold with no points or an
    /// unresolvable body pair, non-finite inputs, a velocity buffer
    /// shorter than the island, or an averaged contact normal with
    /// near-zero length.
    pub fn initialize_for_island(
        &mut self,
        dt: f64,
        island: &mut Island,
        velocities: &IslandVelocities,
    ) -> Result<()> {
        self.params.validate()?;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SolverError::InvalidTimestep(dt));
        }
        island.validate()?;
        if velocities.len() < island.num_bodies() {
            return Err(SolverError::VelocityBufferMismatch {
                expected: island.num_bodies(),
                actual: velocities.len(),
            });
        }
        if !velocities.is_finite() {
            return Err(SolverError::numerical("non-finite velocity input"));
        }

        self.dt = dt;
        self.penetration_constraints.clear();
        self.friction_constraints.clear();

        // Pre-resolve the body pair of each manifold; `validate` has
        // already proven every pair resolvable and distinct.
        let mut pairs = Vec::with_capacity(island.num_manifolds());
        for (m_index, manifold) in island.manifolds().iter().enumerate() {
            let i1 = island
                .velocity_index(manifold.body1)
                .ok_or_else(|| SolverError::degenerate_manifold(m_index, "unresolvable body"))?;
            let i2 = island
                .velocity_index(manifold.body2)
                .ok_or_else(|| SolverError::degenerate_manifold(m_index, "unresolvable body"))?;
            pairs.push((i1, i2));
        }
        let bodies = island.bodies().to_vec();

        for (m_index, manifold) in island.manifolds_mut().iter_mut().enumerate() {
            let (i1, i2) = pairs[m_index];
            let body1 = &bodies[i1];
            let body2 = &bodies[i2];

            let x1 = body1.center_of_mass;
            let x2 = body2.center_of_mass;
            let inertia1 = body1.inv_inertia_world;
            let inertia2 = body2.inv_inertia_world;

            let v1 = velocities.linear[i1];
            let w1 = velocities.angular[i1];
            let v2 = velocities.linear[i2];
            let w2 = velocities.angular[i2];

            let mixed = MixedMaterial::mix(&body1.material, &body2.material);

            // The rolling row couples only the angular parts, so its
            // effective mass is the sum of the inverse inertias.
            let inverse_rolling = if mixed.rolling_resistance > 0.0
                && (body1.is_dynamic() || body2.is_dynamic())
            {
                (inertia1 + inertia2)
                    .try_inverse()
                    .unwrap_or_else(Matrix3::zeros)
            } else {
                Matrix3::zeros()
            };

            let mut friction = FrictionConstraint {
                body1: i1,
                body2: i2,
                inv_mass1: body1.inv_mass,
                inv_mass2: body2.inv_mass,
                inv_inertia1: inertia1,
                inv_inertia2: inertia2,
                friction_coefficient: mixed.friction,
                rolling_resistance: mixed.rolling_resistance,
                r1_friction: Vector3::zeros(),
                r2_friction: Vector3::zeros(),
                normal: Vector3::zeros(),
                friction_vector1: Vector3::zeros(),
                friction_vector2: Vector3::zeros(),
                old_friction_vector1: manifold.friction_vector1,
                old_friction_vector2: manifold.friction_vector2,
                r1_cross_t1: Vector3::zeros(),
                r1_cross_t2: Vector3::zeros(),
                r2_cross_t1: Vector3::zeros(),
                r2_cross_t2: Vector3::zeros(),
                inverse_friction1_mass: 0.0,
                inverse_friction2_mass: 0.0,
                inverse_twist_mass: 0.0,
                inverse_rolling_resistance: inverse_rolling,
                friction1_impulse: 0.0,
                friction2_impulse: 0.0,
                friction_twist_impulse: 0.0,
                rolling_resistance_impulse: Vector3::zeros(),
                total_penetration_impulse: 0.0,
                has_resting_contact: false,
                manifold_index: m_index,
            };

            if self.params.warm_starting {
                friction.friction1_impulse = manifold.friction1_impulse;
                friction.friction2_impulse = manifold.friction2_impulse;
                friction.friction_twist_impulse = manifold.friction_twist_impulse;
                friction.rolling_resistance_impulse = manifold.rolling_resistance_impulse;
            }

            let mut center1 = Vector3::zeros();
            let mut center2 = Vector3::zeros();
            let mut normal_sum = Vector3::zeros();

            for (p_index, point) in manifold.points.iter_mut().enumerate() {
                let r1 = point.point1 - x1;
                let r2 = point.point2 - x2;
                let normal = point.normal;

                let r1_cross_n = r1.cross(&normal);
                let r2_cross_n = r2.cross(&normal);

                // Effective mass along the normal: K = J M^-1 J^T for
                // J = [-n, -(r1 x n), n, r2 x n].
                let normal_mass = body1.inv_mass
                    + body2.inv_mass
                    + ((inertia1 * r1_cross_n).cross(&r1)).dot(&normal)
                    + ((inertia2 * r2_cross_n).cross(&r2)).dot(&normal);
                let inverse_normal_mass = if normal_mass > 0.0 {
                    1.0 / normal_mass
                } else {
                    0.0
                };

                // Restitution uses the approach speed at the beginning of
                // the contact, and only when the contact is not resting.
                let delta_v = v2 + w2.cross(&r2) - v1 - w1.cross(&r1);
                let normal_speed = delta_v.dot(&normal);
                let restitution_bias =
                    if normal_speed < -self.params.restitution_velocity_threshold {
                        mixed.restitution * normal_speed
                    } else {
                        0.0
                    };

                let penetration_impulse = if self.params.warm_starting {
                    point.penetration_impulse
                } else {
                    0.0
                };

                let is_resting_contact = point.is_resting_contact;
                friction.has_resting_contact |= is_resting_contact;
                // From now on this contact counts as resting: if it
                // survives to the next step it becomes warm-startable.
                point.is_resting_contact = true;

                center1 += point.point1.coords;
                center2 += point.point2.coords;
                normal_sum += normal;

                self.penetration_constraints.push(PenetrationConstraint {
                    body1: i1,
                    body2: i2,
                    inv_mass1: body1.inv_mass,
                    inv_mass2: body2.inv_mass,
                    inv_inertia1: inertia1,
                    inv_inertia2: inertia2,
                    normal,
                    r1,
                    r2,
                    r1_cross_n,
                    r2_cross_n,
                    inverse_normal_mass,
                    restitution: mixed.restitution,
                    restitution_bias,
                    penetration_depth: point.penetration_depth,
                    is_resting_contact,
                    penetration_impulse,
                    split_impulse: 0.0,
                    friction_index: m_index,
                    manifold_index: m_index,
                    point_index: p_index,
                });
            }

            let num_points = manifold.points.len() as f64;
            friction.r1_friction = center1 / num_points - x1.coords;
            friction.r2_friction = center2 / num_points - x2.coords;

            if normal_sum.norm() <= f64::EPSILON {
                return Err(SolverError::degenerate_manifold(
                    m_index,
                    "averaged contact normal has near-zero length",
                ));
            }
            friction.normal = normal_sum.normalize();

            let delta_v_center = v2 + w2.cross(&friction.r2_friction)
                - v1
                - w1.cross(&friction.r1_friction);
            Self::compute_friction_vectors(delta_v_center, &mut friction);

            friction.r1_cross_t1 = friction.r1_friction.cross(&friction.friction_vector1);
            friction.r1_cross_t2 = friction.r1_friction.cross(&friction.friction_vector2);
            friction.r2_cross_t1 = friction.r2_friction.cross(&friction.friction_vector1);
            friction.r2_cross_t2 = friction.r2_friction.cross(&friction.friction_vector2);

            let friction1_mass = body1.inv_mass
                + body2.inv_mass
                + ((inertia1 * friction.r1_cross_t1).cross(&friction.r1_friction))
                    .dot(&friction.friction_vector1)
                + ((inertia2 * friction.r2_cross_t1).cross(&friction.r2_friction))
                    .dot(&friction.friction_vector1);
            let friction2_mass = body1.inv_mass
                + body2.inv_mass
                + ((inertia1 * friction.r1_cross_t2).cross(&friction.r1_friction))
                    .dot(&friction.friction_vector2)
                + ((inertia2 * friction.r2_cross_t2).cross(&friction.r2_friction))
                    .dot(&friction.friction_vector2);
            let twist_mass = friction.normal.dot(&(inertia1 * friction.normal))
                + friction.normal.dot(&(inertia2 * friction.normal));

            friction.inverse_friction1_mass = if friction1_mass > 0.0 {
                1.0 / friction1_mass
            } else {
                0.0
            };
            friction.inverse_friction2_mass = if friction2_mass > 0.0 {
                1.0 / friction2_mass
            } else {
                0.0
            };
            friction.inverse_twist_mass = if twist_mass > 0.0 {
                1.0 / twist_mass
            } else {
                0.0
            };

            self.friction_constraints.push(friction);
        }

        debug!(
            manifolds = self.friction_constraints.len(),
            contact_points = self.penetration_constraints.len(),
            "initialized contact constraints for island"
        );

        Ok(())
    }

    /// Apply the impulses cached from the previous step.
    ///
    /// Seeding the iteration with last step's solution makes PGS converge
    /// in far fewer iterations for persistent contacts. Only resting
    /// contacts are warm-started; accumulators of fresh contacts are
    /// reset to zero. Friction impulses are first re-projected from the
    /// previous step's tangent basis into the current one.
    pub fn warm_start(&mut self, velocities: &mut IslandVelocities) {
        if !self.params.warm_starting {
            return;
        }

        for constraint in &mut self.penetration_constraints {
            if constraint.is_resting_contact {
                let impulse = constraint.normal * constraint.penetration_impulse;

                velocities.linear[constraint.body1] -= constraint.inv_mass1 * impulse;
                velocities.angular[constraint.body1] -= constraint.inv_inertia1
                    * (constraint.r1_cross_n * constraint.penetration_impulse);

                velocities.linear[constraint.body2] += constraint.inv_mass2 * impulse;
                velocities.angular[constraint.body2] += constraint.inv_inertia2
                    * (constraint.r2_cross_n * constraint.penetration_impulse);
            } else {
                constraint.penetration_impulse = 0.0;
            }
        }

        for constraint in &mut self.friction_constraints {
            if constraint.has_resting_contact {
                // Re-project last step's friction impulse into the new
                // tangent basis.
                let old_impulse = constraint.friction1_impulse * constraint.old_friction_vector1
                    + constraint.friction2_impulse * constraint.old_friction_vector2;
                constraint.friction1_impulse = old_impulse.dot(&constraint.friction_vector1);
                constraint.friction2_impulse = old_impulse.dot(&constraint.friction_vector2);

                // First tangent direction.
                let impulse1 = constraint.friction_vector1 * constraint.friction1_impulse;
                velocities.linear[constraint.body1] -= constraint.inv_mass1 * impulse1;
                velocities.angular[constraint.body1] -=
                    constraint.inv_inertia1 * (constraint.r1_cross_t1 * constraint.friction1_impulse);
                velocities.linear[constraint.body2] += constraint.inv_mass2 * impulse1;
                velocities.angular[constraint.body2] +=
                    constraint.inv_inertia2 * (constraint.r2_cross_t1 * constraint.friction1_impulse);

                // Second tangent direction.
                let impulse2 = constraint.friction_vector2 * constraint.friction2_impulse;
                velocities.linear[constraint.body1] -= constraint.inv_mass1 * impulse2;
                velocities.angular[constraint.body1] -=
                    constraint.inv_inertia1 * (constraint.r1_cross_t2 * constraint.friction2_impulse);
                velocities.linear[constraint.body2] += constraint.inv_mass2 * impulse2;
                velocities.angular[constraint.body2] +=
                    constraint.inv_inertia2 * (constraint.r2_cross_t2 * constraint.friction2_impulse);

                // Twist friction about the averaged normal.
                let twist = constraint.normal * constraint.friction_twist_impulse;
                velocities.angular[constraint.body1] -= constraint.inv_inertia1 * twist;
                velocities.angular[constraint.body2] += constraint.inv_inertia2 * twist;

                // Rolling resistance.
                let rolling = constraint.rolling_resistance_impulse;
                velocities.angular[constraint.body1] -= constraint.inv_inertia1 * rolling;
                velocities.angular[constraint.body2] += constraint.inv_inertia2 * rolling;
            } else {
                constraint.friction1_impulse = 0.0;
                constraint.friction2_impulse = 0.0;
                constraint.friction_twist_impulse = 0.0;
                constraint.rolling_resistance_impulse = Vector3::zeros();
            }
        }
    }

    /// Zero the per-manifold sums of normal impulses.
    ///
    /// Must be called before each outer iteration: the friction, twist,
    /// and rolling limits use the normal impulses accumulated in the
    /// *current* iteration only.
    pub fn reset_total_penetration_impulse(&mut self) {
        for constraint in &mut self.friction_constraints {
            constraint.total_penetration_impulse = 0.0;
        }
    }

    /// One PGS sweep over the non-penetration rows.
    ///
    /// Each row drives the relative normal speed at its contact point
    /// toward the bias target, projecting the accumulated impulse onto
    /// `lambda >= 0`. When split impulse is active the velocity pass uses
    /// only the restitution bias; the Baumgarte term is applied to the
    /// split velocities instead, with its own separately clamped
    /// accumulator.
    pub fn solve_penetration_constraints(&mut self, velocities: &mut IslandVelocities) {
        let split_active = self.params.split_impulse;
        let beta = if split_active {
            self.params.beta_split_impulse
        } else {
            self.params.beta
        };
        let slop = self.params.penetration_slop;
        let inv_dt = 1.0 / self.dt;

        let penetration_constraints = &mut self.penetration_constraints;
        let friction_constraints = &mut self.friction_constraints;

        for constraint in penetration_constraints.iter_mut() {
            let v1 = velocities.linear[constraint.body1];
            let w1 = velocities.angular[constraint.body1];
            let v2 = velocities.linear[constraint.body2];
            let w2 = velocities.angular[constraint.body2];

            let delta_v = v2 + w2.cross(&constraint.r2) - v1 - w1.cross(&constraint.r1);
            let jv = delta_v.dot(&constraint.normal);

            let bias_penetration = if constraint.penetration_depth > slop {
                -(beta * inv_dt) * (constraint.penetration_depth - slop)
            } else {
                0.0
            };

            let bias = if split_active {
                constraint.restitution_bias
            } else {
                bias_penetration + constraint.restitution_bias
            };

            let mut delta_lambda = -(jv + bias) * constraint.inverse_normal_mass;
            let new_lambda = (constraint.penetration_impulse + delta_lambda).max(0.0);
            delta_lambda = new_lambda - constraint.penetration_impulse;
            constraint.penetration_impulse = new_lambda;

            friction_constraints[constraint.friction_index].total_penetration_impulse +=
                constraint.penetration_impulse;

            let impulse = constraint.normal * delta_lambda;
            velocities.linear[constraint.body1] -= constraint.inv_mass1 * impulse;
            velocities.angular[constraint.body1] -=
                constraint.inv_inertia1 * (constraint.r1_cross_n * delta_lambda);
            velocities.linear[constraint.body2] += constraint.inv_mass2 * impulse;
            velocities.angular[constraint.body2] +=
                constraint.inv_inertia2 * (constraint.r2_cross_n * delta_lambda);

            if split_active {
                let v1_split = velocities.split_linear[constraint.body1];
                let w1_split = velocities.split_angular[constraint.body1];
                let v2_split = velocities.split_linear[constraint.body2];
                let w2_split = velocities.split_angular[constraint.body2];

                let delta_v_split = v2_split + w2_split.cross(&constraint.r2)
                    - v1_split
                    - w1_split.cross(&constraint.r1);
                let jv_split = delta_v_split.dot(&constraint.normal);

                let mut delta_split =
                    -(jv_split + bias_penetration) * constraint.inverse_normal_mass;
                let new_split = (constraint.split_impulse + delta_split).max(0.0);
                delta_split = new_split - constraint.split_impulse;
                constraint.split_impulse = new_split;

                let split_impulse = constraint.normal * delta_split;
                velocities.split_linear[constraint.body1] -= constraint.inv_mass1 * split_impulse;
                velocities.split_angular[constraint.body1] -=
                    constraint.inv_inertia1 * (constraint.r1_cross_n * delta_split);
                velocities.split_linear[constraint.body2] += constraint.inv_mass2 * split_impulse;
                velocities.split_angular[constraint.body2] +=
                    constraint.inv_inertia2 * (constraint.r2_cross_n * delta_split);
            }
        }
    }

    /// One PGS sweep over the friction rows.
    ///
    /// Solves, per manifold and in order: the two tangential rows at the
    /// manifold center, the twist row about the averaged normal, and the
    /// rolling-resistance row. Tangential and twist impulses are
    /// box-clamped to `mu * sum(lambda_n)`; the rolling impulse is
    /// clamped to the ball of radius `mu_r * sum(lambda_n)`.
    pub fn solve_friction_constraints(&mut self, velocities: &mut IslandVelocities) {
        for constraint in &mut self.friction_constraints {
            let friction_limit =
                constraint.friction_coefficient * constraint.total_penetration_impulse;

            // First tangent direction.
            let delta_v = velocities.linear[constraint.body2]
                + velocities.angular[constraint.body2].cross(&constraint.r2_friction)
                - velocities.linear[constraint.body1]
                - velocities.angular[constraint.body1].cross(&constraint.r1_friction);
            let jv = delta_v.dot(&constraint.friction_vector1);

            let mut delta_lambda = -jv * constraint.inverse_friction1_mass;
            let new_lambda = (constraint.friction1_impulse + delta_lambda)
                .clamp(-friction_limit, friction_limit);
            delta_lambda = new_lambda - constraint.friction1_impulse;
            constraint.friction1_impulse = new_lambda;

            let impulse = constraint.friction_vector1 * delta_lambda;
            velocities.linear[constraint.body1] -= constraint.inv_mass1 * impulse;
            velocities.angular[constraint.body1] -=
                constraint.inv_inertia1 * (constraint.r1_cross_t1 * delta_lambda);
            velocities.linear[constraint.body2] += constraint.inv_mass2 * impulse;
            velocities.angular[constraint.body2] +=
                constraint.inv_inertia2 * (constraint.r2_cross_t1 * delta_lambda);

            // Second tangent direction, seeing the first one's update.
            let delta_v = velocities.linear[constraint.body2]
                + velocities.angular[constraint.body2].cross(&constraint.r2_friction)
                - velocities.linear[constraint.body1]
                - velocities.angular[constraint.body1].cross(&constraint.r1_friction);
            let jv = delta_v.dot(&constraint.friction_vector2);

            let mut delta_lambda = -jv * constraint.inverse_friction2_mass;
            let new_lambda = (constraint.friction2_impulse + delta_lambda)
                .clamp(-friction_limit, friction_limit);
            delta_lambda = new_lambda - constraint.friction2_impulse;
            constraint.friction2_impulse = new_lambda;

            let impulse = constraint.friction_vector2 * delta_lambda;
            velocities.linear[constraint.body1] -= constraint.inv_mass1 * impulse;
            velocities.angular[constraint.body1] -=
                constraint.inv_inertia1 * (constraint.r1_cross_t2 * delta_lambda);
            velocities.linear[constraint.body2] += constraint.inv_mass2 * impulse;
            velocities.angular[constraint.body2] +=
                constraint.inv_inertia2 * (constraint.r2_cross_t2 * delta_lambda);

            // Twist friction about the averaged normal (angular only).
            let jv = (velocities.angular[constraint.body2] - velocities.angular[constraint.body1])
                .dot(&constraint.normal);

            let mut delta_lambda = -jv * constraint.inverse_twist_mass;
            let new_lambda = (constraint.friction_twist_impulse + delta_lambda)
                .clamp(-friction_limit, friction_limit);
            delta_lambda = new_lambda - constraint.friction_twist_impulse;
            constraint.friction_twist_impulse = new_lambda;

            let twist_impulse = constraint.normal * delta_lambda;
            velocities.angular[constraint.body1] -= constraint.inv_inertia1 * twist_impulse;
            velocities.angular[constraint.body2] += constraint.inv_inertia2 * twist_impulse;

            // Rolling resistance (angular only, vector-valued).
            if constraint.rolling_resistance > 0.0 {
                let jv_rolling = velocities.angular[constraint.body2]
                    - velocities.angular[constraint.body1];

                let delta_rolling = constraint.inverse_rolling_resistance * (-jv_rolling);
                let rolling_limit =
                    constraint.rolling_resistance * constraint.total_penetration_impulse;
                let new_rolling = clamp_magnitude(
                    constraint.rolling_resistance_impulse + delta_rolling,
                    rolling_limit,
                );
                let delta_rolling = new_rolling - constraint.rolling_resistance_impulse;
                constraint.rolling_resistance_impulse = new_rolling;

                velocities.angular[constraint.body1] -= constraint.inv_inertia1 * delta_rolling;
                velocities.angular[constraint.body2] += constraint.inv_inertia2 * delta_rolling;
            }
        }
    }

    /// Write the accumulated impulses and the friction basis back to the
    /// external contact records, for next-step warm starting.
    pub fn store_impulses(&self, island: &mut Island) {
        let manifolds = island.manifolds_mut();

        for constraint in &self.penetration_constraints {
            manifolds[constraint.manifold_index].points[constraint.point_index]
                .penetration_impulse = constraint.penetration_impulse;
        }

        for constraint in &self.friction_constraints {
            let manifold = &mut manifolds[constraint.manifold_index];
            manifold.friction1_impulse = constraint.friction1_impulse;
            manifold.friction2_impulse = constraint.friction2_impulse;
            manifold.friction_twist_impulse = constraint.friction_twist_impulse;
            manifold.rolling_resistance_impulse = constraint.rolling_resistance_impulse;
            manifold.friction_vector1 = constraint.friction_vector1;
            manifold.friction_vector2 = constraint.friction_vector2;
        }

        debug!(
            manifolds = self.friction_constraints.len(),
            "stored warm-start impulses"
        );
    }

    /// Release the per-island scratch storage.
    ///
    /// Capacity is retained, so solving islands of similar size does not
    /// reallocate.
    pub fn cleanup(&mut self) {
        self.penetration_constraints.clear();
        self.friction_constraints.clear();
    }

    /// Run the full solve sequence for one island.
    ///
    /// Equivalent to setup, warm start,
    /// [`velocity_iterations`](SolverParams::velocity_iterations)
    /// iterations of the two constraint sweeps (with the penetration
    /// impulse sums reset in between), impulse write-back, and cleanup.
    ///
    /// # Errors
    ///
    /// Propagates setup failures from
    /// [`initialize_for_island`](Self::initialize_for_island); the island
    /// and velocities are left untouched in that case.
    pub fn solve(
        &mut self,
        dt: f64,
        island: &mut Island,
        velocities: &mut IslandVelocities,
    ) -> Result<()> {
        self.initialize_for_island(dt, island, velocities)?;
        self.warm_start(velocities);
        for _ in 0..self.params.velocity_iterations {
            self.reset_total_penetration_impulse();
            self.solve_penetration_constraints(velocities);
            self.solve_friction_constraints(velocities);
        }
        self.store_impulses(island);
        self.cleanup();
        Ok(())
    }

    /// Compute the tangent basis `(t1, t2)` spanning the friction plane.
    ///
    /// `t1` points along the tangential component of the relative
    /// velocity so the first row opposes sliding directly; when there is
    /// no sliding, any unit vector orthogonal to the normal works. The
    /// basis satisfies `t1 x t2 = n`.
    fn compute_friction_vectors(delta_velocity: Vector3<f64>, constraint: &mut FrictionConstraint) {
        let normal_velocity = delta_velocity.dot(&constraint.normal) * constraint.normal;
        let tangent_velocity = delta_velocity - normal_velocity;

        let tangent_speed = tangent_velocity.norm();
        constraint.friction_vector1 = if tangent_speed > f64::EPSILON {
            tangent_velocity / tangent_speed
        } else {
            one_unit_orthogonal(&constraint.normal)
        };

        constraint.friction_vector2 = constraint
            .normal
            .cross(&constraint.friction_vector1)
            .normalize();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use isle_types::{BodyId, ContactManifold, ContactPoint, Material, RigidBody};
    use nalgebra::Point3;

    const DT: f64 = 1.0 / 60.0;

    /// Inverse inertia of a solid unit cube with mass 1: I = m/6 per axis.
    fn unit_box_inv_inertia() -> Matrix3<f64> {
        Matrix3::identity() * 6.0
    }

    /// Static ground (body 0) under a dynamic unit box (body 1) with its
    /// center of mass at `(0, 0.5 - depth, 0)` and four corner contacts.
    fn box_on_ground(depth: f64, material: Material) -> Island {
        let mut island = Island::new();
        island.add_body(
            BodyId::new(0),
            RigidBody::static_body(Point3::origin()).with_material(material),
        );
        island.add_body(
            BodyId::new(1),
            RigidBody::dynamic(
                Point3::new(0.0, 0.5 - depth, 0.0),
                1.0,
                unit_box_inv_inertia(),
            )
            .with_material(material),
        );

        let mut manifold = ContactManifold::new(BodyId::new(0), BodyId::new(1));
        for (x, z) in [(-0.5, -0.5), (-0.5, 0.5), (0.5, -0.5), (0.5, 0.5)] {
            let p = Point3::new(x, 0.0, z);
            manifold.add_point(ContactPoint::new(p, p, Vector3::y(), depth));
        }
        island.add_manifold(manifold);
        island
    }

    #[test]
    fn test_initialize_rejects_empty_island() {
        let mut solver = ContactSolver::default();
        let mut island = Island::new();
        let velocities = IslandVelocities::with_len(0);

        let err = solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap_err();
        assert!(matches!(err, SolverError::EmptyIsland { .. }));
    }

    #[test]
    fn test_initialize_rejects_bad_timestep() {
        let mut solver = ContactSolver::default();
        let mut island = box_on_ground(0.0, Material::default());
        let velocities = IslandVelocities::for_island(&island);

        for dt in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                solver.initialize_for_island(dt, &mut island, &velocities),
                Err(SolverError::InvalidTimestep(_))
            ));
        }
    }

    #[test]
    fn test_initialize_rejects_short_velocity_buffers() {
        let mut solver = ContactSolver::default();
        let mut island = box_on_ground(0.0, Material::default());
        let velocities = IslandVelocities::with_len(1);

        assert!(matches!(
            solver.initialize_for_island(DT, &mut island, &velocities),
            Err(SolverError::VelocityBufferMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_initialize_rejects_degenerate_averaged_normal() {
        let mut island = Island::new();
        island.add_body(BodyId::new(0), RigidBody::static_body(Point3::origin()));
        island.add_body(
            BodyId::new(1),
            RigidBody::dynamic(Point3::new(0.0, 0.5, 0.0), 1.0, unit_box_inv_inertia()),
        );
        let mut manifold = ContactManifold::new(BodyId::new(0), BodyId::new(1));
        manifold.add_point(ContactPoint::new(
            Point3::origin(),
            Point3::origin(),
            Vector3::y(),
            0.0,
        ));
        manifold.add_point(ContactPoint::new(
            Point3::origin(),
            Point3::origin(),
            -Vector3::y(),
            0.0,
        ));
        island.add_manifold(manifold);

        let velocities = IslandVelocities::for_island(&island);
        let mut solver = ContactSolver::default();
        let err = solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap_err();
        assert!(err.is_degenerate());
    }

    #[test]
    fn test_setup_builds_one_constraint_per_point_and_manifold() {
        let mut island = box_on_ground(0.0, Material::default());
        let velocities = IslandVelocities::for_island(&island);
        let mut solver = ContactSolver::default();

        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();

        assert_eq!(solver.penetration_constraints().len(), 4);
        assert_eq!(solver.friction_constraints().len(), 1);
        assert_eq!(solver.penetration_constraints()[0].friction_index, 0);
    }

    #[test]
    fn test_setup_friction_basis_is_right_handed_orthonormal() {
        let mut island = box_on_ground(0.0, Material::default());
        let mut velocities = IslandVelocities::for_island(&island);
        velocities.linear[1] = Vector3::new(1.5, -0.3, 0.7);
        velocities.angular[1] = Vector3::new(0.1, 0.2, -0.1);

        let mut solver = ContactSolver::default();
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();

        let friction = &solver.friction_constraints()[0];
        let (t1, t2, n) = (
            friction.friction_vector1,
            friction.friction_vector2,
            friction.normal,
        );

        assert_relative_eq!(t1.norm(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(t2.norm(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(t1.dot(&t2), 0.0, epsilon = 1e-10);
        assert_relative_eq!(t1.dot(&n), 0.0, epsilon = 1e-10);
        assert_relative_eq!(t2.dot(&n), 0.0, epsilon = 1e-10);
        // Right-handed: t1 x t2 = n
        assert_relative_eq!(t1.cross(&t2).dot(&n), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_setup_basis_falls_back_when_no_sliding() {
        let mut island = box_on_ground(0.0, Material::default());
        let mut velocities = IslandVelocities::for_island(&island);
        // Pure normal approach: no tangential velocity at all.
        velocities.linear[1] = Vector3::new(0.0, -1.0, 0.0);

        let mut solver = ContactSolver::default();
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();

        let friction = &solver.friction_constraints()[0];
        assert_relative_eq!(friction.friction_vector1.norm(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(
            friction.friction_vector1.dot(&friction.normal),
            0.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_setup_forces_points_to_resting() {
        let mut island = box_on_ground(0.0, Material::default());
        let velocities = IslandVelocities::for_island(&island);
        let mut solver = ContactSolver::default();

        assert!(island.manifolds()[0].points.iter().all(|p| !p.is_resting_contact));
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();
        assert!(island.manifolds()[0].points.iter().all(|p| p.is_resting_contact));

        // The constraints still remember the pre-setup state.
        assert!(solver
            .penetration_constraints()
            .iter()
            .all(|c| !c.is_resting_contact));
        assert!(!solver.friction_constraints()[0].has_resting_contact);
    }

    #[test]
    fn test_restitution_bias_respects_threshold() {
        let material = Material::new(0.8, 0.0, 0.0);

        // Slow approach: below the threshold, no restitution.
        let mut island = box_on_ground(0.0, material);
        let mut velocities = IslandVelocities::for_island(&island);
        velocities.linear[1] = Vector3::new(0.0, -0.5, 0.0);
        let mut solver = ContactSolver::default();
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();
        assert_eq!(solver.penetration_constraints()[0].restitution_bias, 0.0);

        // Fast approach: bias is restitution times the approach speed.
        let mut island = box_on_ground(0.0, material);
        velocities.linear[1] = Vector3::new(0.0, -5.0, 0.0);
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();
        assert_relative_eq!(
            solver.penetration_constraints()[0].restitution_bias,
            0.8 * -5.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_effective_normal_mass_for_corner_contact() {
        let mut island = box_on_ground(0.0, Material::default());
        let velocities = IslandVelocities::for_island(&island);
        let mut solver = ContactSolver::default();
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();

        // K = 1/m + (r x n)^T I^-1 (r x n); for any bottom corner of the
        // unit box, |r x n|^2 = 0.5, so K = 1 + 6 * 0.5 = 4.
        let constraint = &solver.penetration_constraints()[0];
        assert_relative_eq!(constraint.inverse_normal_mass, 0.25, epsilon = 1e-10);
    }

    #[test]
    fn test_kinematic_pair_is_inert() {
        let material = Material::new(0.5, 0.5, 0.1);
        let mut island = Island::new();
        island.add_body(
            BodyId::new(0),
            RigidBody::kinematic(Point3::origin()).with_material(material),
        );
        island.add_body(
            BodyId::new(1),
            RigidBody::kinematic(Point3::new(0.0, 1.0, 0.0)).with_material(material),
        );
        let mut manifold = ContactManifold::new(BodyId::new(0), BodyId::new(1));
        let p = Point3::new(0.0, 0.5, 0.0);
        manifold.add_point(ContactPoint::new(p, p, Vector3::y(), 0.05));
        island.add_manifold(manifold);

        let mut velocities = IslandVelocities::for_island(&island);
        velocities.linear[0] = Vector3::new(0.0, 1.0, 0.0);
        velocities.linear[1] = Vector3::new(0.0, -1.0, 0.0);
        let before = velocities.clone();

        let mut solver = ContactSolver::default();
        solver.solve(DT, &mut island, &mut velocities).unwrap();

        // Zero inverse mass on both sides: every row is disabled.
        assert_eq!(velocities.linear, before.linear);
        assert_eq!(velocities.angular, before.angular);
        assert!(velocities.is_finite());
    }

    #[test]
    fn test_penetration_impulse_stays_non_negative() {
        // A separating box: the solver must not pull it back.
        let mut island = box_on_ground(0.0, Material::default());
        let mut velocities = IslandVelocities::for_island(&island);
        velocities.linear[1] = Vector3::new(0.0, 2.0, 0.0);

        let mut solver = ContactSolver::default();
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();
        solver.warm_start(&mut velocities);
        for _ in 0..10 {
            solver.reset_total_penetration_impulse();
            solver.solve_penetration_constraints(&mut velocities);
            solver.solve_friction_constraints(&mut velocities);
        }

        for constraint in solver.penetration_constraints() {
            assert!(constraint.penetration_impulse >= 0.0);
            assert!(constraint.split_impulse >= 0.0);
        }
        // Upward velocity untouched.
        assert_relative_eq!(velocities.linear[1].y, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_warm_start_applies_cached_impulse() {
        let mut island = box_on_ground(0.0, Material::default());
        // Cache the impulse that a previous frame would have stored and
        // mark the points as already-resting.
        for point in &mut island.manifolds_mut()[0].points {
            point.is_resting_contact = true;
            point.penetration_impulse = 0.25;
        }

        let mut velocities = IslandVelocities::for_island(&island);
        let mut solver = ContactSolver::default();
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();
        solver.warm_start(&mut velocities);

        // Four points, each applying 0.25 upward on the box.
        assert_relative_eq!(velocities.linear[1].y, 1.0, epsilon = 1e-10);
        // The corrected body-2 angular term keeps the symmetric corner
        // impulses torque-free.
        assert_relative_eq!(velocities.angular[1].norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_warm_start_skips_fresh_contacts() {
        let mut island = box_on_ground(0.0, Material::default());
        for point in &mut island.manifolds_mut()[0].points {
            point.penetration_impulse = 0.25; // cached, but not resting
        }

        let mut velocities = IslandVelocities::for_island(&island);
        let mut solver = ContactSolver::default();
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();
        solver.warm_start(&mut velocities);

        assert_relative_eq!(velocities.linear[1].norm(), 0.0, epsilon = 1e-12);
        assert!(solver
            .penetration_constraints()
            .iter()
            .all(|c| c.penetration_impulse == 0.0));
    }

    #[test]
    fn test_warm_start_disabled_ignores_cache() {
        let mut island = box_on_ground(0.0, Material::default());
        for point in &mut island.manifolds_mut()[0].points {
            point.is_resting_contact = true;
            point.penetration_impulse = 0.25;
        }

        let mut velocities = IslandVelocities::for_island(&island);
        let mut solver = ContactSolver::new(SolverParams::default().with_warm_starting(false));
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();
        solver.warm_start(&mut velocities);

        assert_relative_eq!(velocities.linear[1].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cleanup_retains_capacity() {
        let mut island = box_on_ground(0.0, Material::default());
        let velocities = IslandVelocities::for_island(&island);
        let mut solver = ContactSolver::default();
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();

        solver.cleanup();
        assert!(solver.penetration_constraints().is_empty());
        assert!(solver.friction_constraints().is_empty());

        // A second setup must work on the reused storage.
        solver
            .initialize_for_island(DT, &mut island, &velocities)
            .unwrap();
        assert_eq!(solver.penetration_constraints().len(), 4);
    }

    #[test]
    fn test_flag_toggles() {
        let mut solver = ContactSolver::default();
        solver.set_warm_starting_active(false);
        solver.set_split_impulse_active(false);
        assert!(!solver.params().warm_starting);
        assert!(!solver.params().split_impulse);
    }
}
