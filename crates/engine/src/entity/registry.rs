use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use super::{Entity, SpawnContext};
use crate::app::rendering::Canvas;
use crate::event::EventTag;
use crate::physics::PhysicsSpace;
use crate::resources::ResourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Raises `signal` once per target overlapping `watched`, every tick the
/// overlap lasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionListener {
    pub watched: EntityId,
    pub targets: Vec<EntityId>,
    pub signal: EventTag,
}

/// Owns every entity and keeps them bucketed by render priority.
///
/// Buckets are visited in ascending priority, and in insertion order within
/// a bucket, for both ticking and drawing.
#[derive(Default)]
pub struct EntityRegistry {
    allocator: EntityIdAllocator,
    entities: HashMap<EntityId, Box<dyn Entity>>,
    buckets: BTreeMap<i32, Vec<EntityId>>,
    listeners: Vec<CollisionListener>,
    signals: Vec<EventTag>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: Box<dyn Entity>) -> EntityId {
        let id = self.allocator.allocate();
        self.buckets.entry(entity.priority()).or_default().push(id);
        self.entities.insert(id, entity);
        id
    }

    pub fn register_many<I>(&mut self, entities: I) -> Vec<EntityId>
    where
        I: IntoIterator<Item = Box<dyn Entity>>,
    {
        entities
            .into_iter()
            .map(|entity| self.register(entity))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&dyn Entity> {
        self.entities.get(&id).map(|entity| entity.as_ref())
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut (dyn Entity + 'static)> {
        self.entities.get_mut(&id).map(|entity| entity.as_mut())
    }

    pub fn get<T: Entity>(&self, id: EntityId) -> Option<&T> {
        self.entities
            .get(&id)
            .and_then(|entity| (**entity).as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Entity>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities
            .get_mut(&id)
            .and_then(|entity| (**entity).as_any_mut().downcast_mut::<T>())
    }

    /// Ids in draw order. Reflects the last re-sort.
    pub fn draw_order(&self) -> Vec<EntityId> {
        self.buckets.values().flatten().copied().collect()
    }

    pub fn listen(&mut self, watched: EntityId, targets: Vec<EntityId>, signal: EventTag) {
        self.listeners.push(CollisionListener {
            watched,
            targets,
            signal,
        });
    }

    pub fn listeners(&self) -> &[CollisionListener] {
        &self.listeners
    }

    /// Drains the collision signals raised since the previous call.
    pub fn take_signals(&mut self) -> Vec<EventTag> {
        std::mem::take(&mut self.signals)
    }

    /// Runs collision checks, re-sorts dirty priorities, then removes
    /// disposed entities and ticks the rest.
    pub fn tick(&mut self, tick_count: u64, physics: &mut dyn PhysicsSpace) {
        self.check_collisions();
        if self.has_dirty() {
            self.resort();
        }

        let priorities: Vec<i32> = self.buckets.keys().copied().collect();
        for priority in priorities {
            let mut index = 0;
            loop {
                let Some(id) = self
                    .buckets
                    .get(&priority)
                    .and_then(|bucket| bucket.get(index))
                    .copied()
                else {
                    break;
                };
                let Some(entity) = self.entities.get_mut(&id) else {
                    self.detach_from_bucket(priority, index);
                    continue;
                };
                if entity.should_remove() {
                    if let Err(error) = entity.remove(physics) {
                        warn!(entity_id = id.0, error = %error, "entity_remove_failed");
                    }
                    self.entities.remove(&id);
                    self.detach_from_bucket(priority, index);
                    continue;
                }
                entity.tick(tick_count);
                index += 1;
            }
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
    }

    pub fn draw(&self, canvas: &mut dyn Canvas) {
        for id in self.buckets.values().flatten() {
            if let Some(entity) = self.entities.get(id) {
                if entity.should_draw() {
                    entity.draw(canvas);
                }
            }
        }
    }

    pub fn spawn(&mut self, id: EntityId, ctx: &mut SpawnContext<'_>) -> Result<bool, ResourceError> {
        match self.entities.get_mut(&id) {
            Some(entity) => entity.spawn(ctx).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn spawn_all(&mut self, ctx: &mut SpawnContext<'_>) -> Result<(), ResourceError> {
        for id in self.draw_order() {
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.spawn(ctx)?;
            }
        }
        Ok(())
    }

    pub fn dispose_all(&mut self) {
        for entity in self.entities.values_mut() {
            entity.dispose();
        }
    }

    /// Removes every entity regardless of disposal state. Failures are
    /// logged per entity; the registry is emptied either way.
    pub fn remove_all(&mut self, physics: &mut dyn PhysicsSpace) {
        for id in self.draw_order() {
            let Some(mut entity) = self.entities.remove(&id) else {
                continue;
            };
            if let Err(error) = entity.remove(physics) {
                warn!(entity_id = id.0, error = %error, "entity_remove_failed");
            }
        }
        self.entities.clear();
        self.buckets.clear();
    }

    /// Drops all entities and listeners without running lifecycle hooks.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.buckets.clear();
        self.listeners.clear();
        self.signals.clear();
    }

    pub fn push_body_positions(&mut self, physics: &mut dyn PhysicsSpace) {
        for entity in self.entities.values_mut() {
            if let Some(body) = entity.body_mut() {
                body.push(physics);
            }
        }
    }

    pub fn pull_body_positions(&mut self, physics: &dyn PhysicsSpace) {
        for entity in self.entities.values_mut() {
            if let Some(body) = entity.body_mut() {
                body.pull(physics);
            }
        }
    }

    fn check_collisions(&mut self) {
        for listener in &self.listeners {
            let Some(watched) = self.entities.get(&listener.watched) else {
                continue;
            };
            for target in &listener.targets {
                let Some(target) = self.entities.get(target) else {
                    continue;
                };
                if target.collides_with(&**watched) {
                    self.signals.push(listener.signal);
                }
            }
        }
    }

    fn has_dirty(&self) -> bool {
        self.entities
            .values()
            .any(|entity| entity.core().priority.is_dirty())
    }

    fn resort(&mut self) {
        let mut dirty = Vec::new();
        for bucket in self.buckets.values_mut() {
            bucket.retain(|id| {
                let is_dirty = self
                    .entities
                    .get(id)
                    .map_or(false, |entity| entity.core().priority.is_dirty());
                if is_dirty {
                    dirty.push(*id);
                }
                !is_dirty
            });
        }
        for id in dirty {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            let priority = entity.priority();
            entity.core_mut().priority.clean();
            self.buckets.entry(priority).or_default().push(id);
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        debug!(buckets = self.buckets.len(), "entity_priorities_resorted");
    }

    fn detach_from_bucket(&mut self, priority: i32, index: usize) {
        if let Some(bucket) = self.buckets.get_mut(&priority) {
            bucket.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::Raster;
    use crate::entity::priority::{HIGH, HIGHEST, LOW, NORMAL};
    use crate::entity::test_support::Probe;
    use crate::geometry::Location;
    use crate::physics::NullSpace;
    use crate::resources::AssetLoader;

    struct Harness {
        registry: EntityRegistry,
        physics: NullSpace,
        resources: AssetLoader,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                registry: EntityRegistry::new(),
                physics: NullSpace::new(),
                resources: AssetLoader::default(),
            }
        }

        fn spawn_all(&mut self) {
            let mut ctx = SpawnContext::new(&mut self.physics, &mut self.resources);
            self.registry.spawn_all(&mut ctx).expect("spawn all");
        }

        fn tick(&mut self, tick_count: u64) {
            self.registry.tick(tick_count, &mut self.physics);
        }
    }

    fn priorities(registry: &EntityRegistry) -> Vec<i32> {
        registry
            .draw_order()
            .into_iter()
            .map(|id| registry.entity(id).expect("registered").priority())
            .collect()
    }

    #[test]
    fn allocator_is_monotonic() {
        let mut allocator = EntityIdAllocator::default();
        assert_eq!(allocator.allocate(), EntityId(0));
        assert_eq!(allocator.allocate(), EntityId(1));
        assert_eq!(allocator.allocate(), EntityId(2));
    }

    #[test]
    fn draw_order_follows_ascending_priority() {
        let mut harness = Harness::new();
        harness.registry.register_many([
            Box::new(Probe::new(10)) as Box<dyn Entity>,
            Box::new(Probe::new(5)),
            Box::new(Probe::new(20)),
        ]);
        assert_eq!(priorities(&harness.registry), vec![5, 10, 20]);
    }

    #[test]
    fn register_does_not_spawn() {
        let mut harness = Harness::new();
        let id = harness.registry.register(Box::new(Probe::new(NORMAL)));
        assert!(!harness.registry.entity(id).expect("registered").should_draw());
        harness.spawn_all();
        assert!(harness.registry.entity(id).expect("registered").should_draw());
    }

    #[test]
    fn priority_change_moves_entity_on_next_tick() {
        let mut harness = Harness::new();
        let low = harness.registry.register(Box::new(Probe::new(LOW)));
        let high = harness.registry.register(Box::new(Probe::new(HIGH)));
        harness.spawn_all();
        harness.tick(0);

        harness
            .registry
            .entity_mut(low)
            .expect("registered")
            .set_priority(HIGHEST);
        assert!(harness
            .registry
            .entity(low)
            .expect("registered")
            .core()
            .priority
            .is_dirty());
        assert_eq!(harness.registry.draw_order(), vec![low, high]);

        harness.tick(1);
        assert_eq!(harness.registry.draw_order(), vec![high, low]);
        assert!(!harness
            .registry
            .entity(low)
            .expect("registered")
            .core()
            .priority
            .is_dirty());
    }

    #[test]
    fn resort_keeps_relative_order_of_moved_entities() {
        let mut harness = Harness::new();
        let a = harness.registry.register(Box::new(Probe::new(LOW)));
        let b = harness.registry.register(Box::new(Probe::new(LOW)));
        let c = harness.registry.register(Box::new(Probe::new(HIGH)));
        harness.tick(0);

        for id in [a, b] {
            harness
                .registry
                .entity_mut(id)
                .expect("registered")
                .set_priority(HIGHEST);
        }
        harness.tick(1);
        assert_eq!(harness.registry.draw_order(), vec![c, a, b]);
    }

    #[test]
    fn disposed_middle_entity_is_removed_and_neighbours_tick() {
        let mut harness = Harness::new();
        let probes: Vec<Probe> = (0..3).map(|_| Probe::new(NORMAL)).collect();
        let ticks: Vec<_> = probes.iter().map(|probe| probe.ticks.clone()).collect();
        let ids: Vec<EntityId> = probes
            .into_iter()
            .map(|probe| harness.registry.register(Box::new(probe)))
            .collect();
        harness.spawn_all();

        harness
            .registry
            .entity_mut(ids[1])
            .expect("registered")
            .dispose();
        harness.tick(0);

        assert_eq!(harness.registry.draw_order(), vec![ids[0], ids[2]]);
        assert!(!harness.registry.contains(ids[1]));
        assert_eq!(ticks[0].get(), 1);
        assert_eq!(ticks[1].get(), 0);
        assert_eq!(ticks[2].get(), 1);
    }

    #[test]
    fn disposing_unspawned_entity_keeps_it_registered() {
        let mut harness = Harness::new();
        let id = harness.registry.register(Box::new(Probe::new(NORMAL)));
        harness.registry.entity_mut(id).expect("registered").dispose();
        harness.tick(0);
        assert!(harness.registry.contains(id));
    }

    #[test]
    fn collision_listener_fires_while_overlapping() {
        let mut harness = Harness::new();
        let player = harness
            .registry
            .register(Box::new(Probe::new(NORMAL).at(Location::new(0, 0))));
        let crate_id = harness
            .registry
            .register(Box::new(Probe::new(NORMAL).at(Location::new(5, 5))));
        harness.spawn_all();
        let hit = EventTag(0x8000);
        harness.registry.listen(player, vec![crate_id], hit);

        harness.tick(0);
        harness.tick(1);
        assert_eq!(harness.registry.take_signals(), vec![hit, hit]);

        harness
            .registry
            .entity_mut(crate_id)
            .expect("registered")
            .set_location(Location::new(50, 50));
        harness.tick(2);
        assert!(harness.registry.take_signals().is_empty());
    }

    #[test]
    fn collision_listener_skips_missing_entities() {
        let mut harness = Harness::new();
        let player = harness.registry.register(Box::new(Probe::new(NORMAL)));
        let gone = harness.registry.register(Box::new(Probe::new(NORMAL)));
        harness.spawn_all();
        harness.registry.listen(player, vec![gone], EventTag(0x8001));
        harness.registry.entity_mut(gone).expect("registered").dispose();

        harness.tick(0);
        assert_eq!(harness.registry.take_signals().len(), 1);
        harness.tick(1);
        assert!(harness.registry.take_signals().is_empty());
    }

    #[test]
    fn hundred_entities_keep_a_stable_draw_order() {
        let mut harness = Harness::new();
        for index in 0..100 {
            let priority = [LOW, NORMAL, HIGH][index % 3];
            harness.registry.register(Box::new(Probe::new(priority)));
        }
        harness.spawn_all();
        harness.tick(0);
        let first = harness.registry.draw_order();
        for tick in 1..10 {
            harness.tick(tick);
            assert_eq!(harness.registry.draw_order(), first);
        }
        let sorted = priorities(&harness.registry);
        assert!(sorted.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(harness.registry.len(), 100);
    }

    #[test]
    fn draw_skips_hidden_entities() {
        let mut harness = Harness::new();
        let shown = harness
            .registry
            .register(Box::new(Probe::new(NORMAL).at(Location::new(0, 0))));
        let hidden = harness
            .registry
            .register(Box::new(Probe::new(NORMAL).at(Location::new(10, 0))));
        harness.spawn_all();
        harness
            .registry
            .entity_mut(hidden)
            .expect("registered")
            .set_visible(false);

        let mut canvas = Raster::new(20, 10);
        harness.registry.draw(&mut canvas);
        assert!(harness.registry.entity(shown).expect("registered").should_draw());
        assert_eq!(canvas.pixel(2, 2), Some([255, 255, 255, 255]));
        assert_eq!(canvas.pixel(12, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn remove_all_continues_past_failures_and_empties_registry() {
        let mut harness = Harness::new();
        let spawned = harness.registry.register(Box::new(Probe::new(NORMAL)));
        harness.spawn_all();
        harness.registry.register(Box::new(Probe::new(LOW)));
        assert!(harness.registry.entity(spawned).expect("registered").should_draw());

        harness.registry.remove_all(&mut harness.physics);
        assert!(harness.registry.is_empty());
        assert!(harness.registry.draw_order().is_empty());
    }

    #[test]
    fn clear_drops_without_lifecycle_calls() {
        let mut harness = Harness::new();
        harness.registry.register(Box::new(Probe::new(NORMAL)));
        harness.spawn_all();
        harness.registry.clear();
        assert!(harness.registry.is_empty());
    }

    #[test]
    fn typed_access_downcasts_to_concrete_type() {
        let mut harness = Harness::new();
        let id = harness.registry.register(Box::new(Probe::new(NORMAL)));
        harness
            .registry
            .get_mut::<Probe>(id)
            .expect("probe")
            .size = 42;
        assert_eq!(harness.registry.get::<Probe>(id).expect("probe").size, 42);
        assert!(harness.registry.get::<crate::entity::shapes::Rectangle>(id).is_none());
    }

    #[test]
    fn spawn_by_id_reports_unknown_ids() {
        let mut harness = Harness::new();
        let id = harness.registry.register(Box::new(Probe::new(NORMAL)));
        let mut ctx = SpawnContext::new(&mut harness.physics, &mut harness.resources);
        assert!(harness.registry.spawn(id, &mut ctx).expect("spawn"));
        assert!(!harness.registry.spawn(EntityId(99), &mut ctx).expect("spawn"));
    }

    #[test]
    fn failing_spawn_propagates() {
        let mut harness = Harness::new();
        let mut probe = Probe::new(NORMAL);
        probe.fail_load = true;
        harness.registry.register(Box::new(probe));
        let mut ctx = SpawnContext::new(&mut harness.physics, &mut harness.resources);
        assert!(harness.registry.spawn_all(&mut ctx).is_err());
    }
}
