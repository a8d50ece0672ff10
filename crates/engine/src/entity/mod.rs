use std::any::Any;

use thiserror::Error;
use tracing::info;

use crate::app::rendering::Canvas;
use crate::geometry::{Location, Rect};
use crate::physics::{Body, PhysicsSpace};
use crate::resources::{ResourceError, ResourceLoader};

pub mod image;
pub mod parallax;
pub mod priority;
pub mod registry;
pub mod shapes;
pub mod sprite;
pub mod text;

pub use priority::RenderPriority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("entity '{entity}' was already removed")]
    AlreadyRemoved { entity: &'static str },
    #[error("entity '{entity}' was never loaded")]
    NeverLoaded { entity: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("index {index} out of range for {len} frames")]
pub struct IndexOutOfRangeError {
    pub index: usize,
    pub len: usize,
}

/// `unloaded -> loaded -> marked for disposal -> removed`. Removal is final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    loaded: bool,
    visible: bool,
    removed: bool,
    should_remove: bool,
}

impl Lifecycle {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.should_remove
    }

    pub fn should_draw(&self) -> bool {
        self.visible && !self.removed && self.loaded
    }

    pub fn should_remove(&self) -> bool {
        self.loaded && self.should_remove && !self.removed
    }

    fn mark_spawned(&mut self) {
        self.loaded = true;
        self.visible = true;
    }

    fn mark_removed(&mut self, entity: &'static str) -> Result<(), LifecycleError> {
        if self.removed {
            return Err(LifecycleError::AlreadyRemoved { entity });
        }
        if !self.loaded {
            return Err(LifecycleError::NeverLoaded { entity });
        }
        self.visible = false;
        self.removed = true;
        self.loaded = false;
        Ok(())
    }
}

/// State every entity embeds and exposes through [`Entity::core`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityCore {
    pub location: Location,
    pub priority: RenderPriority,
    lifecycle: Lifecycle,
}

impl EntityCore {
    pub fn new(location: Location, priority: i32) -> Self {
        Self {
            location,
            priority: RenderPriority::new(priority),
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn at(location: Location) -> Self {
        Self::new(location, priority::DEFAULT_PRIORITY)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl Default for EntityCore {
    fn default() -> Self {
        Self::at(Location::default())
    }
}

pub struct SpawnContext<'a> {
    pub physics: &'a mut dyn PhysicsSpace,
    pub resources: &'a mut dyn ResourceLoader,
}

impl<'a> SpawnContext<'a> {
    pub fn new(physics: &'a mut dyn PhysicsSpace, resources: &'a mut dyn ResourceLoader) -> Self {
        Self { physics, resources }
    }
}

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Anything the registry can tick and draw.
///
/// Implementors provide per-frame behavior plus access to their
/// [`EntityCore`]; the lifecycle, placement and hit-test methods are shared.
/// Physics-backed entities also expose their [`Body`], which `spawn` attaches
/// to the space and `remove` detaches from it.
pub trait Entity: AsAny {
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    fn tick(&mut self, tick_count: u64);
    fn draw(&self, canvas: &mut dyn Canvas);
    fn bounds(&self) -> Rect;

    fn on_load(&mut self, _resources: &mut dyn ResourceLoader) -> Result<(), ResourceError> {
        Ok(())
    }

    fn body(&self) -> Option<&Body> {
        None
    }

    fn body_mut(&mut self) -> Option<&mut Body> {
        None
    }

    fn type_name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }

    fn location(&self) -> Location {
        self.body()
            .map(Body::position)
            .unwrap_or(self.core().location)
    }

    fn set_location(&mut self, location: Location) {
        self.core_mut().location = location;
        if let Some(body) = self.body_mut() {
            body.teleport(location);
        }
    }

    fn priority(&self) -> i32 {
        self.core().priority.value()
    }

    fn set_priority(&mut self, priority: i32) {
        self.core_mut().priority.set(priority);
    }

    fn visible(&self) -> bool {
        self.core().lifecycle.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.core_mut().lifecycle.visible = visible;
    }

    fn should_draw(&self) -> bool {
        self.core().lifecycle.should_draw()
    }

    fn should_remove(&self) -> bool {
        self.core().lifecycle.should_remove()
    }

    /// Loads resources, attaches the body and makes the entity visible.
    /// Repeated calls are no-ops, as is any call after removal.
    fn spawn(&mut self, ctx: &mut SpawnContext<'_>) -> Result<(), ResourceError> {
        let lifecycle = self.core().lifecycle;
        if lifecycle.removed {
            info!(entity = self.type_name(), "entity_spawn_after_removal_ignored");
            return Ok(());
        }
        if lifecycle.loaded {
            return Ok(());
        }
        self.on_load(&mut *ctx.resources)?;
        if let Some(body) = self.body_mut() {
            body.attach(&mut *ctx.physics);
        }
        self.core_mut().lifecycle.mark_spawned();
        Ok(())
    }

    /// Marks the entity for removal on the next registry tick.
    fn dispose(&mut self) {
        self.core_mut().lifecycle.should_remove = true;
        info!(entity = self.type_name(), "entity_marked_for_disposal");
    }

    /// Permanently retires a loaded entity. Only the registry calls this.
    fn remove(&mut self, physics: &mut dyn PhysicsSpace) -> Result<(), LifecycleError> {
        let entity = self.type_name();
        self.core_mut().lifecycle.mark_removed(entity)?;
        if let Some(body) = self.body_mut() {
            body.detach(physics);
        }
        info!(entity, "entity_removed");
        Ok(())
    }

    fn clicked_on(&self, point: Location) -> bool {
        self.bounds().contains_point(point)
    }

    fn collides_with(&self, other: &dyn Entity) -> bool {
        self.bounds().intersects(&other.bounds())
    }
}
