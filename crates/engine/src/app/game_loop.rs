use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::clock::FrameClock;
use super::rendering::{Canvas, CanvasError};
use super::LoopConfig;
use crate::color::Color;
use crate::entity::registry::{EntityId, EntityRegistry};
use crate::entity::{Entity, SpawnContext};
use crate::event::{
    DuplicateRegistrationError, Event, EventDispatcher, EventQueue, EventTag, TagAllocator,
    TimerRepeat,
};
use crate::geometry::Resolution;
use crate::physics::PhysicsSpace;
use crate::resources::{ResourceError, ResourceLoader};
use crate::EngineError;

/// Everything an event callback may touch during a frame.
pub struct GameWorld {
    pub registry: EntityRegistry,
    pub events: EventQueue,
    physics: Box<dyn PhysicsSpace>,
    resources: Box<dyn ResourceLoader>,
    tags: TagAllocator,
    clock: FrameClock,
    resolution: Resolution,
    target_fps: u32,
    tick_count: u64,
    now: Instant,
    running: bool,
}

impl GameWorld {
    fn new(
        resolution: Resolution,
        target_fps: u32,
        physics: Box<dyn PhysicsSpace>,
        resources: Box<dyn ResourceLoader>,
    ) -> Self {
        Self {
            registry: EntityRegistry::new(),
            events: EventQueue::new(),
            physics,
            resources,
            tags: TagAllocator::default(),
            clock: FrameClock::new(),
            resolution,
            target_fps: target_fps.max(1),
            tick_count: 0,
            now: Instant::now(),
            running: false,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Measured frame rate over the last few frames.
    pub fn fps(&self) -> f32 {
        self.clock.fps()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Timestamp of the frame being run.
    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ends the loop after the current frame.
    pub fn stop(&mut self) {
        if self.running {
            info!(tick_count = self.tick_count, "loop_stop_requested");
        }
        self.running = false;
    }

    pub fn allocate_tag(&mut self) -> EventTag {
        self.tags.allocate()
    }

    pub fn set_timer(&mut self, tag: EventTag, interval: Duration, repeat: TimerRepeat) {
        self.events.set_timer(tag, interval, repeat, self.now);
    }

    pub fn cancel_timer(&mut self, tag: EventTag) -> bool {
        self.events.cancel_timer(tag)
    }

    pub fn post(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn physics(&self) -> &dyn PhysicsSpace {
        self.physics.as_ref()
    }

    pub fn physics_mut(&mut self) -> &mut dyn PhysicsSpace {
        self.physics.as_mut()
    }

    pub fn resources_mut(&mut self) -> &mut dyn ResourceLoader {
        self.resources.as_mut()
    }

    pub fn register<E: Entity>(&mut self, entity: E) -> EntityId {
        self.registry.register(Box::new(entity))
    }

    /// Spawns a registered entity. Returns `false` when the id is unknown.
    pub fn spawn(&mut self, id: EntityId) -> Result<bool, ResourceError> {
        let mut ctx = SpawnContext::new(self.physics.as_mut(), self.resources.as_mut());
        self.registry.spawn(id, &mut ctx)
    }

    pub fn register_and_spawn<E: Entity>(&mut self, entity: E) -> Result<EntityId, EngineError> {
        let id = self.register(entity);
        if !self.spawn(id)? {
            return Err(EngineError::UnknownEntity(id));
        }
        Ok(id)
    }

    pub fn spawn_all(&mut self) -> Result<(), ResourceError> {
        let mut ctx = SpawnContext::new(self.physics.as_mut(), self.resources.as_mut());
        self.registry.spawn_all(&mut ctx)
    }
}

/// Fixed-rate driver: input and timer events, physics, entity ticks, drawing.
pub struct GameLoop {
    world: GameWorld,
    dispatcher: EventDispatcher<GameWorld>,
    background: Color,
}

impl GameLoop {
    pub fn new(
        config: &LoopConfig,
        physics: Box<dyn PhysicsSpace>,
        resources: Box<dyn ResourceLoader>,
    ) -> Self {
        Self {
            world: GameWorld::new(config.resolution, config.fps, physics, resources),
            dispatcher: EventDispatcher::new(),
            background: config.background,
        }
    }

    pub fn world(&self) -> &GameWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut GameWorld {
        &mut self.world
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn register_event<F>(&mut self, tag: EventTag, callback: F) -> Result<(), DuplicateRegistrationError>
    where
        F: FnMut(&Event, &mut GameWorld) -> Result<(), EngineError> + 'static,
    {
        self.dispatcher.register(tag, callback)
    }

    /// Spawns every registered entity and enters the running state.
    pub fn start(&mut self, now: Instant) -> Result<(), ResourceError> {
        self.world.now = now;
        self.world.spawn_all()?;
        self.world.running = true;
        info!(
            entity_count = self.world.registry.len(),
            callbacks = self.dispatcher.len(),
            fps = self.world.target_fps,
            "loop_started"
        );
        Ok(())
    }

    pub fn stop(&mut self) {
        self.world.stop();
    }

    pub fn is_running(&self) -> bool {
        self.world.running
    }

    /// Runs one frame. Collision signals raised by the registry are
    /// delivered on the following frame.
    pub fn run_frame(&mut self, now: Instant, canvas: &mut dyn Canvas) -> Result<(), CanvasError> {
        let world = &mut self.world;
        world.now = now;
        world.clock.record_frame(now);

        world.registry.push_body_positions(world.physics.as_mut());
        world.physics.step(1.0 / world.target_fps as f32);
        world.registry.pull_body_positions(world.physics.as_ref());

        canvas.fill(self.background);

        let events = world.events.poll(now);
        let quit_requested = events.iter().any(|event| event.tag == EventTag::QUIT);
        let handled = self.dispatcher.dispatch(events, world);
        if quit_requested && !self.dispatcher.is_registered(EventTag::QUIT) {
            info!(reason = "quit_event", "shutdown_requested");
            world.stop();
        }

        world.tick_count = world.tick_count.saturating_add(1);
        world.registry.tick(world.tick_count, world.physics.as_mut());
        for signal in world.registry.take_signals() {
            world.events.push(Event::new(signal));
        }

        world.registry.draw(canvas);
        debug!(
            tick_count = world.tick_count,
            handled_events = handled,
            "frame_complete"
        );
        canvas.present()
    }

    /// Drops callbacks and retires every entity.
    pub fn shutdown(&mut self) {
        self.dispatcher.clear();
        let world = &mut self.world;
        world.registry.remove_all(world.physics.as_mut());
        world.registry.clear();
        world.running = false;
        info!(tick_count = world.tick_count, "loop_shutdown");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::app::rendering::Raster;
    use crate::entity::priority::{HIGH, LOW};
    use crate::entity::shapes::{PhysicsCircle, Rectangle};
    use crate::entity::test_support::Probe;
    use crate::event::Key;
    use crate::geometry::Location;
    use crate::physics::NullSpace;
    use crate::resources::AssetLoader;

    fn game_loop() -> GameLoop {
        let config = LoopConfig {
            resolution: Resolution::new(64, 48, 1.0),
            ..LoopConfig::default()
        };
        GameLoop::new(
            &config,
            Box::new(NullSpace::new()),
            Box::new(AssetLoader::default()),
        )
    }

    fn canvas() -> Raster {
        Raster::new(64, 48)
    }

    #[test]
    fn start_spawns_registered_entities() {
        let mut game = game_loop();
        let probe = Probe::new(LOW);
        let loads = Rc::clone(&probe.loads);
        let id = game.world_mut().register(probe);
        assert!(!game.is_running());

        game.start(Instant::now()).expect("start");
        assert!(game.is_running());
        assert_eq!(loads.get(), 1);
        assert!(game.world().registry.entity(id).expect("entity").should_draw());
    }

    #[test]
    fn frame_ticks_draws_and_presents() {
        let mut game = game_loop();
        let probe = Probe::new(LOW).at(Location::new(2, 2));
        let ticks = Rc::clone(&probe.ticks);
        game.world_mut().register(probe);
        game.start(Instant::now()).expect("start");

        let mut canvas = canvas();
        game.run_frame(Instant::now(), &mut canvas).expect("frame");
        game.run_frame(Instant::now(), &mut canvas).expect("frame");

        assert_eq!(ticks.get(), 2);
        assert_eq!(game.world().tick_count(), 2);
        assert_eq!(canvas.presented(), 2);
        assert_eq!(canvas.pixel(3, 3), Some([255, 255, 255, 255]));
        assert_eq!(canvas.pixel(40, 40), Some([0, 0, 0, 255]));
    }

    #[test]
    fn callbacks_receive_posted_events() {
        let mut game = game_loop();
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        game.register_event(EventTag::KEY_DOWN, move |event, _world| {
            if event.key() == Some(Key::Space) {
                counter.set(counter.get() + 1);
            }
            Ok(())
        })
        .expect("register");
        assert!(game
            .register_event(EventTag::KEY_DOWN, |_, _| Ok(()))
            .is_err());
        game.start(Instant::now()).expect("start");

        game.world_mut().post(Event::key_down(Key::Space));
        game.world_mut().post(Event::key_down(Key::Enter));
        game.run_frame(Instant::now(), &mut canvas()).expect("frame");
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn quit_stops_the_loop_by_default() {
        let mut game = game_loop();
        game.start(Instant::now()).expect("start");
        game.world_mut().post(Event::quit());
        game.run_frame(Instant::now(), &mut canvas()).expect("frame");
        assert!(!game.is_running());
    }

    #[test]
    fn bound_quit_callback_decides_whether_to_stop() {
        let mut game = game_loop();
        game.register_event(EventTag::QUIT, |_, _| Ok(()))
            .expect("register");
        game.start(Instant::now()).expect("start");
        game.world_mut().post(Event::quit());
        game.run_frame(Instant::now(), &mut canvas()).expect("frame");
        assert!(game.is_running());
    }

    #[test]
    fn timers_fire_through_the_dispatcher() {
        let mut game = game_loop();
        let start = Instant::now();
        let tag = game.world_mut().allocate_tag();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        game.register_event(tag, move |_, world| {
            counter.set(counter.get() + 1);
            world.stop();
            Ok(())
        })
        .expect("register");
        game.start(start).expect("start");
        game.world_mut()
            .set_timer(tag, Duration::from_millis(500), TimerRepeat::Once);

        let mut canvas = canvas();
        game.run_frame(start + Duration::from_millis(100), &mut canvas)
            .expect("frame");
        assert_eq!(fired.get(), 0);
        game.run_frame(start + Duration::from_millis(600), &mut canvas)
            .expect("frame");
        assert_eq!(fired.get(), 1);
        assert!(!game.is_running());
        game.run_frame(start + Duration::from_millis(1200), &mut canvas)
            .expect("frame");
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn collision_signal_arrives_next_frame() {
        let mut game = game_loop();
        let signal = game.world_mut().allocate_tag();
        let watched = game.world_mut().register(Probe::new(HIGH));
        let target = game
            .world_mut()
            .register(Probe::new(LOW).at(Location::new(5, 5)));
        game.world_mut().registry.listen(watched, vec![target], signal);
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        game.register_event(signal, move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .expect("register");
        game.start(Instant::now()).expect("start");

        let mut canvas = canvas();
        game.run_frame(Instant::now(), &mut canvas).expect("frame");
        assert_eq!(hits.get(), 0);
        game.run_frame(Instant::now(), &mut canvas).expect("frame");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn callbacks_can_spawn_entities_mid_run() {
        let mut game = game_loop();
        let tag = game.world_mut().allocate_tag();
        game.register_event(tag, |_, world| {
            world.register_and_spawn(Rectangle::new(4, 4, Color::RED))?;
            Ok(())
        })
        .expect("register");
        game.start(Instant::now()).expect("start");
        game.world_mut().post(Event::new(tag));
        game.run_frame(Instant::now(), &mut canvas()).expect("frame");
        assert_eq!(game.world().registry.len(), 1);
    }

    #[test]
    fn physics_steps_once_per_frame_and_shutdown_clears_everything() {
        let mut game = game_loop();
        let id = game.world_mut().register(PhysicsCircle::new(
            3,
            Color::BLUE,
            Location::new(10, 10),
        ));
        game.register_event(EventTag::QUIT, |_, world| {
            world.stop();
            Ok(())
        })
        .expect("register");
        game.start(Instant::now()).expect("start");
        assert_eq!(game.world().physics().body_count(), 1);
        game.run_frame(Instant::now(), &mut canvas()).expect("frame");
        assert!(game.world().registry.contains(id));

        game.shutdown();
        assert!(!game.is_running());
        assert!(game.world().registry.is_empty());
        assert_eq!(game.world().physics().body_count(), 0);
        assert!(game
            .register_event(EventTag::QUIT, |_, _| Ok(()))
            .is_ok());
    }
}
