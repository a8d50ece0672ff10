use super::{Entity, EntityCore};
use crate::app::rendering::Canvas;
use crate::color::Color;
use crate::geometry::{Location, Rect};
use crate::physics::{Body, BodyDesc};

#[derive(Debug)]
pub struct Rectangle {
    core: EntityCore,
    pub w: i32,
    pub h: i32,
    pub color: Color,
}

impl Rectangle {
    pub fn new(w: i32, h: i32, color: Color) -> Self {
        Self {
            core: EntityCore::default(),
            w,
            h,
            color,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.core.location = location;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.core.priority.set(priority);
        self
    }
}

impl Entity for Rectangle {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn tick(&mut self, _tick_count: u64) {}

    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.draw_rect(self.bounds(), self.color);
    }

    fn bounds(&self) -> Rect {
        Rect::at(self.location(), self.w, self.h)
    }
}

/// Circle centered on its location.
#[derive(Debug)]
pub struct Circle {
    core: EntityCore,
    pub radius: i32,
    pub color: Color,
}

impl Circle {
    pub fn new(radius: i32, color: Color) -> Self {
        Self {
            core: EntityCore::default(),
            radius,
            color,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.core.location = location;
        self
    }
}

impl Entity for Circle {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn tick(&mut self, _tick_count: u64) {}

    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.draw_circle(self.location(), self.radius, self.color);
    }

    fn bounds(&self) -> Rect {
        centered_square(self.location(), self.radius)
    }
}

/// Dynamic ball simulated by the physics space.
#[derive(Debug)]
pub struct PhysicsCircle {
    core: EntityCore,
    body: Body,
    pub radius: i32,
    pub color: Color,
}

impl PhysicsCircle {
    pub fn new(radius: i32, color: Color, location: Location) -> Self {
        Self {
            core: EntityCore::at(location),
            body: Body::new(BodyDesc::ball(radius as f32), location),
            radius,
            color,
        }
    }

    pub fn with_velocity(mut self, velocity: (f32, f32)) -> Self {
        self.body.set_velocity(velocity);
        self
    }

    pub fn set_velocity(&mut self, velocity: (f32, f32)) {
        self.body.set_velocity(velocity);
    }
}

impl Entity for PhysicsCircle {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn tick(&mut self, _tick_count: u64) {}

    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.draw_circle(self.location(), self.radius, self.color);
    }

    fn bounds(&self) -> Rect {
        centered_square(self.location(), self.radius)
    }

    fn body(&self) -> Option<&Body> {
        Some(&self.body)
    }

    fn body_mut(&mut self) -> Option<&mut Body> {
        Some(&mut self.body)
    }
}

/// Static capsule from `p1` to `p2`. The body sits at `p1`, so moving the
/// entity moves the whole segment.
#[derive(Debug)]
pub struct PhysicsSegment {
    core: EntityCore,
    body: Body,
    offset: (i32, i32),
    pub radius: i32,
    pub color: Color,
}

impl PhysicsSegment {
    pub fn new(p1: Location, p2: Location, radius: i32, color: Color) -> Self {
        let offset = (p2.x - p1.x, p2.y - p1.y);
        let desc = BodyDesc::segment((0.0, 0.0), (offset.0 as f32, offset.1 as f32), radius as f32);
        Self {
            core: EntityCore::at(p1),
            body: Body::new(desc, p1),
            offset,
            radius,
            color,
        }
    }

    pub fn endpoints(&self) -> (Location, Location) {
        let start = self.location();
        (start, start.add(self.offset.0, self.offset.1))
    }
}

impl Entity for PhysicsSegment {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn tick(&mut self, _tick_count: u64) {}

    fn draw(&self, canvas: &mut dyn Canvas) {
        let (start, end) = self.endpoints();
        canvas.draw_line(start, end, self.radius, self.color);
    }

    fn bounds(&self) -> Rect {
        let (start, end) = self.endpoints();
        Rect::new(
            start.x.min(end.x),
            start.y.min(end.y),
            start.dist_x(end) as i32,
            start.dist_y(end) as i32,
        )
    }

    fn body(&self) -> Option<&Body> {
        Some(&self.body)
    }

    fn body_mut(&mut self) -> Option<&mut Body> {
        Some(&mut self.body)
    }
}

fn centered_square(center: Location, radius: i32) -> Rect {
    Rect::new(center.x - radius, center.y - radius, radius * 2, radius * 2)
}
