use std::collections::HashMap;

use rapier2d::prelude::*;
use tracing::debug;

use super::{BodyDesc, BodyHandle, BodyKind, BodyShape, PhysicsSpace};
use crate::geometry::Location;

/// rapier2d-backed space. Units are pixels with +y pointing down.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    handles: HashMap<BodyHandle, RigidBodyHandle>,
    next_handle: u64,
}

impl PhysicsWorld {
    pub fn new(gravity: (f32, f32)) -> Self {
        Self {
            gravity: vector![gravity.0, gravity.1],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            handles: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn gravity(&self) -> (f32, f32) {
        (self.gravity.x, self.gravity.y)
    }

    pub fn set_gravity(&mut self, gravity: (f32, f32)) {
        self.gravity = vector![gravity.0, gravity.1];
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let rapier_handle = self.handles.get(&handle).copied()?;
        self.rigid_body_set.get_mut(rapier_handle)
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new((0.0, 0.0))
    }
}

impl PhysicsSpace for PhysicsWorld {
    fn add(&mut self, desc: &BodyDesc, position: Location) -> BodyHandle {
        let body_type = match desc.kind {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Static => RigidBodyType::Fixed,
        };
        let body = RigidBodyBuilder::new(body_type)
            .translation(vector![position.x as Real, position.y as Real])
            .linvel(vector![desc.velocity.0, desc.velocity.1])
            .lock_rotations()
            .ccd_enabled(desc.kind == BodyKind::Dynamic)
            .build();
        let rapier_handle = self.rigid_body_set.insert(body);

        let shape = match desc.shape {
            BodyShape::Ball { radius } => SharedShape::ball(radius),
            BodyShape::Segment { a, b, radius } => {
                SharedShape::capsule(point![a.0, a.1], point![b.0, b.1], radius)
            }
        };
        let collider = ColliderBuilder::new(shape)
            .restitution(desc.restitution)
            .friction(0.0)
            .build();
        self.collider_set
            .insert_with_parent(collider, rapier_handle, &mut self.rigid_body_set);

        let handle = BodyHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        self.handles.insert(handle, rapier_handle);
        handle
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        let Some(rapier_handle) = self.handles.remove(&handle) else {
            debug!(handle = handle.0, "physics_remove_unknown_handle");
            return false;
        };
        self.rigid_body_set
            .remove(
                rapier_handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn position(&self, handle: BodyHandle) -> Option<Location> {
        let rapier_handle = self.handles.get(&handle)?;
        let translation = self.rigid_body_set.get(*rapier_handle)?.translation();
        Some(Location::new(
            translation.x.round() as i32,
            translation.y.round() as i32,
        ))
    }

    fn set_position(&mut self, handle: BodyHandle, position: Location) {
        if let Some(body) = self.body_mut(handle) {
            body.set_translation(vector![position.x as Real, position.y as Real], true);
        }
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: (f32, f32)) {
        if let Some(body) = self.body_mut(handle) {
            body.set_linvel(vector![velocity.0, velocity.1], true);
        }
    }

    fn body_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_ball_falls_under_gravity() {
        let mut world = PhysicsWorld::new((0.0, 200.0));
        let handle = world.add(&BodyDesc::ball(7.0), Location::new(100, 100));

        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }

        let position = world.position(handle).expect("body exists");
        assert_eq!(position.x, 100);
        assert!(position.y > 100, "ball should have fallen, got {position:?}");
    }

    #[test]
    fn static_segment_does_not_move() {
        let mut world = PhysicsWorld::new((0.0, 200.0));
        let handle = world.add(
            &BodyDesc::segment((0.0, 0.0), (100.0, 0.0), 5.0),
            Location::new(10, 300),
        );
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(world.position(handle), Some(Location::new(10, 300)));
    }

    #[test]
    fn removed_handles_are_forgotten() {
        let mut world = PhysicsWorld::default();
        let handle = world.add(&BodyDesc::ball(3.0), Location::new(0, 0));
        assert_eq!(world.body_count(), 1);
        assert!(world.remove(handle));
        assert!(!world.remove(handle));
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.position(handle), None);
    }

    #[test]
    fn velocity_moves_body_without_gravity() {
        let mut world = PhysicsWorld::default();
        let handle = world.add(&BodyDesc::ball(3.0), Location::new(0, 0));
        world.set_velocity(handle, (600.0, 0.0));
        for _ in 0..6 {
            world.step(1.0 / 60.0);
        }
        let position = world.position(handle).expect("body exists");
        assert!((55..=65).contains(&position.x), "got {position:?}");
    }
}
