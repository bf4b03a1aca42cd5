//! Property-based tests for the contact solver.
//!
//! These generate random contact scenes and verify the solver's
//! invariants after an arbitrary number of iterations: impulse signs,
//! friction cone bounds, basis orthonormality, momentum conservation,
//! and the absence of non-finite values.
//!
//! Run with: cargo test -p isle-contact -- proptest

use isle_contact::{ContactSolver, IslandVelocities};
use isle_types::{BodyId, ContactManifold, ContactPoint, Island, Material, RigidBody};
use nalgebra::{Matrix3, Point3, Vector3};
use proptest::prelude::*;

const DT: f64 = 1.0 / 60.0;

fn unit_box_inv_inertia() -> Matrix3<f64> {
    Matrix3::identity() * 6.0
}

fn unit_sphere_inv_inertia() -> Matrix3<f64> {
    Matrix3::identity() * 2.5
}

/// Generate a bounded velocity component.
fn arb_speed() -> impl Strategy<Value = f64> {
    -5.0..5.0f64
}

/// Generate a bounded velocity vector.
fn arb_velocity() -> impl Strategy<Value = Vector3<f64>> {
    (arb_speed(), arb_speed(), arb_speed()).prop_map(|(x, y, z)| Vector3::new(x, y, z))
}

/// Generate a contact material with arbitrary coefficients.
fn arb_material() -> impl Strategy<Value = Material> {
    (0.0..1.0f64, 0.0..1.0f64, 0.0..0.2f64)
        .prop_map(|(restitution, friction, rolling)| Material::new(restitution, friction, rolling))
}

/// A dynamic unit box on static ground with four corner contacts.
fn box_scene(depth: f64, material: Material) -> Island {
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

proptest! {
    /// Accumulated impulses respect their projection sets after any
    /// number of iterations, for any loading.
    #[test]
    fn impulse_bounds_hold(
        linear in arb_velocity(),
        angular in arb_velocity(),
        depth in 0.0..0.05f64,
        material in arb_material(),
        iterations in 1usize..15,
    ) {
        let mut island = box_scene(depth, material);
        let mut velocities = IslandVelocities::for_island(&island);
        velocities.linear[1] = linear;
        velocities.angular[1] = angular;

        let mut solver = ContactSolver::default();
        solver.initialize_for_island(DT, &mut island, &velocities)?;
        solver.warm_start(&mut velocities);
        for _ in 0..iterations {
            solver.reset_total_penetration_impulse();
            solver.solve_penetration_constraints(&mut velocities);
            solver.solve_friction_constraints(&mut velocities);
        }

        for constraint in solver.penetration_constraints() {
            prop_assert!(constraint.penetration_impulse >= 0.0);
            prop_assert!(constraint.split_impulse >= 0.0);
        }

        for constraint in solver.friction_constraints() {
            let normal_sum = constraint.total_penetration_impulse;
            let friction_limit = constraint.friction_coefficient * normal_sum;
            prop_assert!(constraint.friction1_impulse.abs() <= friction_limit + 1e-9);
            prop_assert!(constraint.friction2_impulse.abs() <= friction_limit + 1e-9);
            prop_assert!(constraint.friction_twist_impulse.abs() <= friction_limit + 1e-9);
            prop_assert!(
                constraint.rolling_resistance_impulse.norm()
                    <= constraint.rolling_resistance * normal_sum + 1e-9
            );
        }

        prop_assert!(velocities.is_finite());
    }

    /// The friction frame stays a right-handed orthonormal basis for any
    /// initial relative velocity, including pure normal approach.
    #[test]
    fn friction_basis_is_orthonormal(
        linear in arb_velocity(),
        angular in arb_velocity(),
        material in arb_material(),
    ) {
        let mut island = box_scene(0.0, material);
        let mut velocities = IslandVelocities::for_island(&island);
        velocities.linear[1] = linear;
        velocities.angular[1] = angular;

        let mut solver = ContactSolver::default();
        solver.initialize_for_island(DT, &mut island, &velocities)?;

        for constraint in solver.friction_constraints() {
            let t1 = constraint.friction_vector1;
            let t2 = constraint.friction_vector2;
            let n = constraint.normal;

            prop_assert!((t1.norm() - 1.0).abs() < 1e-5);
            prop_assert!((t2.norm() - 1.0).abs() < 1e-5);
            prop_assert!((n.norm() - 1.0).abs() < 1e-5);
            prop_assert!(t1.dot(&t2).abs() + t1.dot(&n).abs() + t2.dot(&n).abs() < 1e-5);
            // Right-handed: t1 x t2 = n.
            prop_assert!((t1.cross(&t2) - n).norm() < 1e-5);
        }
    }

    /// With no friction, a penetration sweep between two dynamic bodies
    /// conserves linear and angular momentum regardless of restitution.
    #[test]
    fn frictionless_pair_conserves_momentum(
        v1 in arb_velocity(),
        v2 in arb_velocity(),
        w1 in arb_velocity(),
        w2 in arb_velocity(),
        restitution in 0.0..1.0f64,
        offset_x in -0.4..0.4f64,
        offset_z in -0.4..0.4f64,
    ) {
        let material = Material::new(restitution, 0.0, 0.0);

        let mut island = Island::new();
        island.add_body(
            BodyId::new(0),
            RigidBody::dynamic(Point3::origin(), 1.0, unit_sphere_inv_inertia())
                .with_material(material),
        );
        island.add_body(
            BodyId::new(1),
            RigidBody::dynamic(Point3::new(0.0, 2.0, 0.0), 1.0, unit_sphere_inv_inertia())
                .with_material(material),
        );

        let mut manifold = ContactManifold::new(BodyId::new(0), BodyId::new(1));
        let p = Point3::new(offset_x, 1.0, offset_z);
        manifold.add_point(ContactPoint::new(p, p, Vector3::y(), 0.0));
        island.add_manifold(manifold);

        let mut velocities = IslandVelocities::for_island(&island);
        velocities.linear[0] = v1;
        velocities.linear[1] = v2;
        velocities.angular[0] = w1;
        velocities.angular[1] = w2;

        let inertia = Matrix3::identity() * 0.4;
        let momentum = |vel: &IslandVelocities, island: &Island| {
            let mut linear = Vector3::zeros();
            let mut angular = Vector3::zeros();
            for i in 0..2 {
                let x = island.body(i).map(|b| b.center_of_mass.coords).unwrap_or_default();
                linear += vel.linear[i];
                angular += x.cross(&vel.linear[i]) + inertia * vel.angular[i];
            }
            (linear, angular)
        };

        let (linear_before, angular_before) = momentum(&velocities, &island);

        let mut solver = ContactSolver::default();
        solver.initialize_for_island(DT, &mut island, &velocities)?;
        solver.warm_start(&mut velocities);
        solver.reset_total_penetration_impulse();
        solver.solve_penetration_constraints(&mut velocities);

        let (linear_after, angular_after) = momentum(&velocities, &island);
        prop_assert!((linear_after - linear_before).norm() < 1e-6);
        prop_assert!((angular_after - angular_before).norm() < 1e-6);
    }

    /// The full driver never produces non-finite state and never pulls a
    /// separating body back toward the contact.
    #[test]
    fn solve_is_numerically_robust(
        linear in arb_velocity(),
        angular in arb_velocity(),
        depth in 0.0..0.05f64,
        material in arb_material(),
    ) {
        let mut island = box_scene(depth, material);
        let mut velocities = IslandVelocities::for_island(&island);
        velocities.linear[1] = linear;
        velocities.angular[1] = angular;

        let mut solver = ContactSolver::default();
        solver.solve(DT, &mut island, &mut velocities)?;

        prop_assert!(velocities.is_finite());
        for manifold in island.manifolds() {
            prop_assert!(manifold.is_finite());
            for point in &manifold.points {
                prop_assert!(point.penetration_impulse >= 0.0);
            }
        }
    }
}
