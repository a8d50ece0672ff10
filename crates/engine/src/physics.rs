use std::collections::HashMap;

use crate::geometry::Location;

#[cfg(feature = "physics")]
mod rapier;

#[cfg(feature = "physics")]
pub use rapier::PhysicsWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Static,
}

/// Collision shape, in pixels, relative to the body origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Ball {
        radius: f32,
    },
    Segment {
        a: (f32, f32),
        b: (f32, f32),
        radius: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub shape: BodyShape,
    pub velocity: (f32, f32),
    pub restitution: f32,
}

impl BodyDesc {
    pub fn ball(radius: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            shape: BodyShape::Ball { radius },
            velocity: (0.0, 0.0),
            restitution: 1.0,
        }
    }

    pub fn segment(a: (f32, f32), b: (f32, f32), radius: f32) -> Self {
        Self {
            kind: BodyKind::Static,
            shape: BodyShape::Segment { a, b, radius },
            velocity: (0.0, 0.0),
            restitution: 0.9,
        }
    }

    pub fn with_velocity(mut self, velocity: (f32, f32)) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

/// Rigid-body simulator the game loop steps once per frame.
pub trait PhysicsSpace {
    fn add(&mut self, desc: &BodyDesc, position: Location) -> BodyHandle;
    /// Returns false when the handle is unknown.
    fn remove(&mut self, handle: BodyHandle) -> bool;
    fn step(&mut self, dt: f32);
    fn position(&self, handle: BodyHandle) -> Option<Location>;
    fn set_position(&mut self, handle: BodyHandle, position: Location);
    fn set_velocity(&mut self, handle: BodyHandle, velocity: (f32, f32));
    fn body_count(&self) -> usize;
}

/// Entity-side view of a simulated body.
///
/// Entities draw and report bounds from the cached position. The registry
/// pushes teleports and velocity changes before the step and pulls the
/// simulated positions back after it.
#[derive(Debug, Clone)]
pub struct Body {
    desc: BodyDesc,
    handle: Option<BodyHandle>,
    position: Location,
    teleported: bool,
    pending_velocity: Option<(f32, f32)>,
}

impl Body {
    pub fn new(desc: BodyDesc, position: Location) -> Self {
        Self {
            desc,
            handle: None,
            position,
            teleported: false,
            pending_velocity: None,
        }
    }

    pub fn desc(&self) -> &BodyDesc {
        &self.desc
    }

    pub fn handle(&self) -> Option<BodyHandle> {
        self.handle
    }

    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    pub fn position(&self) -> Location {
        self.position
    }

    pub fn attach(&mut self, space: &mut dyn PhysicsSpace) -> BodyHandle {
        if let Some(handle) = self.handle {
            return handle;
        }
        let handle = space.add(&self.desc, self.position);
        self.handle = Some(handle);
        self.teleported = false;
        self.pending_velocity = None;
        handle
    }

    pub fn detach(&mut self, space: &mut dyn PhysicsSpace) {
        if let Some(handle) = self.handle.take() {
            space.remove(handle);
        }
    }

    pub fn teleport(&mut self, position: Location) {
        self.position = position;
        self.teleported = self.handle.is_some();
    }

    pub fn set_velocity(&mut self, velocity: (f32, f32)) {
        self.desc.velocity = velocity;
        if self.handle.is_some() {
            self.pending_velocity = Some(velocity);
        }
    }

    pub fn push(&mut self, space: &mut dyn PhysicsSpace) {
        let Some(handle) = self.handle else {
            return;
        };
        if std::mem::take(&mut self.teleported) {
            space.set_position(handle, self.position);
        }
        if let Some(velocity) = self.pending_velocity.take() {
            space.set_velocity(handle, velocity);
        }
    }

    pub fn pull(&mut self, space: &dyn PhysicsSpace) {
        if let Some(position) = self.handle.and_then(|handle| space.position(handle)) {
            self.position = position;
        }
    }
}

/// Space that tracks bodies without simulating them. Used when the
/// `physics` feature is off and by tests.
#[derive(Debug, Default)]
pub struct NullSpace {
    next: u64,
    bodies: HashMap<BodyHandle, Location>,
    steps: u64,
}

impl NullSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl PhysicsSpace for NullSpace {
    fn add(&mut self, _desc: &BodyDesc, position: Location) -> BodyHandle {
        let handle = BodyHandle(self.next);
        self.next = self.next.saturating_add(1);
        self.bodies.insert(handle, position);
        handle
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        self.bodies.remove(&handle).is_some()
    }

    fn step(&mut self, _dt: f32) {
        self.steps = self.steps.saturating_add(1);
    }

    fn position(&self, handle: BodyHandle) -> Option<Location> {
        self.bodies.get(&handle).copied()
    }

    fn set_position(&mut self, handle: BodyHandle, position: Location) {
        if let Some(slot) = self.bodies.get_mut(&handle) {
            *slot = position;
        }
    }

    fn set_velocity(&mut self, _handle: BodyHandle, _velocity: (f32, f32)) {}

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_is_idempotent_and_detach_releases_the_body() {
        let mut space = NullSpace::new();
        let mut body = Body::new(BodyDesc::ball(4.0), Location::new(5, 5));

        let first = body.attach(&mut space);
        let second = body.attach(&mut space);
        assert_eq!(first, second);
        assert_eq!(space.body_count(), 1);

        body.detach(&mut space);
        assert!(!body.is_attached());
        assert_eq!(space.body_count(), 0);
    }

    #[test]
    fn teleport_is_pushed_once() {
        let mut space = NullSpace::new();
        let mut body = Body::new(BodyDesc::ball(4.0), Location::new(0, 0));
        let handle = body.attach(&mut space);

        body.teleport(Location::new(40, 12));
        body.push(&mut space);
        assert_eq!(space.position(handle), Some(Location::new(40, 12)));

        space.set_position(handle, Location::new(41, 13));
        body.push(&mut space);
        assert_eq!(space.position(handle), Some(Location::new(41, 13)));

        body.pull(&space);
        assert_eq!(body.position(), Location::new(41, 13));
    }

    #[test]
    fn detached_body_keeps_its_cached_position() {
        let mut space = NullSpace::new();
        let mut body = Body::new(BodyDesc::segment((0.0, 0.0), (10.0, 0.0), 2.0), Location::new(1, 2));
        body.teleport(Location::new(3, 4));
        body.push(&mut space);
        body.pull(&space);
        assert_eq!(body.position(), Location::new(3, 4));
        assert_eq!(space.body_count(), 0);
    }
}
