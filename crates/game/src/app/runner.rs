use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use engine::entity::priority::HIGH;
use engine::{
    Canvas, Color, EngineError, Entity, EntityCore, EntityId, EventTag, GameLoop, GameWorld, Key,
    Location, LoopConfig, Parallax, Rect, Resolution, Sprite, SpriteState, Text,
};
use tracing::{info, warn};

use super::presets::{ParallaxPreset, SoundPresets};

const TITLE_FONT: &str = "font/kenvector_future.ttf";
const SUBTITLE_FONT: &str = "font/kenpixel_mini_square.ttf";
const TITLE_PX: f32 = 40.0;
const SUBTITLE_PX: f32 = 24.0;
const SUBTITLE_GAP: i32 = 50;
const CHARACTER_DIR: &str = "character";
const CHARACTER_SCALAR: f32 = 3.5;
const CHARACTER_X: i32 = 50;
const CHARACTER_STATES: [(SpriteState, &str, usize); 5] = [
    (SpriteState::Idle, "idle", 12),
    (SpriteState::Jump, "jump", 1),
    (SpriteState::Land, "land", 1),
    (SpriteState::MidAir, "mid_air", 2),
    (SpriteState::Run, "run", 8),
];
const JUMP_VELOCITY: i32 = -20;
const CRATE_SIZE: i32 = 40;
const CRATE_SPEED: i32 = 12;
const CRATE_COLOR: Color = Color::rgb(150, 100, 50);
const INVINCIBILITY: Duration = Duration::from_millis(1500);
const MAX_HITS: u32 = 3;

pub(crate) fn config() -> LoopConfig {
    LoopConfig {
        title: "Runner".to_string(),
        resolution: Resolution::P720,
        fps: 25,
        ..LoopConfig::default()
    }
}

/// Wooden crate sliding in from the right edge, parked off-screen until the
/// run starts.
#[derive(Debug)]
pub(crate) struct Obstacle {
    core: EntityCore,
    size: i32,
    speed: i32,
    start_x: i32,
    active: bool,
}

impl Obstacle {
    pub(crate) fn new(resolution: Resolution, floor: i32) -> Self {
        let start_x = resolution.width as i32;
        Self {
            core: EntityCore::new(Location::new(start_x, floor - CRATE_SIZE), HIGH),
            size: CRATE_SIZE,
            speed: CRATE_SPEED,
            start_x,
            active: false,
        }
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    pub(crate) fn park(&mut self) {
        self.active = false;
        let y = self.location().y;
        self.set_location(Location::new(self.start_x, y));
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }
}

impl Entity for Obstacle {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn tick(&mut self, _tick_count: u64) {
        if !self.active {
            return;
        }
        let location = &mut self.core.location;
        location.translate(-self.speed, 0);
        if location.x + self.size < 0 {
            location.x = self.start_x;
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.draw_rect(self.bounds(), CRATE_COLOR);
    }

    fn bounds(&self) -> Rect {
        Rect::at(self.location(), self.size, self.size)
    }
}

/// Counts hits, ignoring any that land inside the invincibility window of
/// the previous one.
#[derive(Debug)]
pub(crate) struct HitTracker {
    window: Duration,
    last_hit: Option<Instant>,
    hits: u32,
}

impl HitTracker {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last_hit: None,
            hits: 0,
        }
    }

    pub(crate) fn register(&mut self, now: Instant) -> bool {
        if let Some(last_hit) = self.last_hit {
            if now.saturating_duration_since(last_hit) < self.window {
                return false;
            }
        }
        self.last_hit = Some(now);
        self.hits += 1;
        true
    }

    pub(crate) fn hits(&self) -> u32 {
        self.hits
    }

    pub(crate) fn reset(&mut self) {
        self.last_hit = None;
        self.hits = 0;
    }
}

struct RunnerState {
    title: EntityId,
    subtitle: EntityId,
    character: EntityId,
    obstacle: EntityId,
    hits: HitTracker,
    sounds: SoundPresets,
}

impl RunnerState {
    fn start_run(&mut self, world: &mut GameWorld) {
        for id in [self.title, self.subtitle] {
            if let Some(text) = world.registry.entity_mut(id) {
                text.set_visible(false);
            }
        }
        if let Some(obstacle) = world.registry.get_mut::<Obstacle>(self.obstacle) {
            if !obstacle.is_active() {
                obstacle.activate();
                self.hits.reset();
                info!("runner_started");
            }
        }
    }

    fn jump(&self, world: &mut GameWorld) {
        if let Some(character) = world.registry.get_mut::<Sprite>(self.character) {
            if character.state() == SpriteState::Run {
                character.set_velocity((0, JUMP_VELOCITY));
            }
        }
    }

    fn game_over(&self, world: &mut GameWorld) {
        if let Some(obstacle) = world.registry.get_mut::<Obstacle>(self.obstacle) {
            obstacle.park();
        }
        let resolution = world.resolution();
        show_centered(world, self.title, "GAME OVER", resolution, 0);
        show_centered(
            world,
            self.subtitle,
            "press space to restart",
            resolution,
            SUBTITLE_GAP,
        );
        info!(hits = self.hits.hits(), "runner_game_over");
    }
}

fn show_centered(world: &mut GameWorld, id: EntityId, value: &str, resolution: Resolution, dy: i32) {
    if let Some(text) = world.registry.get_mut::<Text>(id) {
        text.set_text(value);
        let location = Location::center(resolution, text.bounds()).add(0, dy);
        text.set_location(location);
        text.set_visible(true);
    }
}

fn play_cue(world: &mut GameWorld, path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    match world.resources_mut().load_sound(path) {
        Ok(sound) => info!(
            sound = %sound.path().display(),
            bytes = sound.bytes().len(),
            "sound_cue"
        ),
        Err(error) => warn!(error = %error, "sound_cue_failed"),
    }
}

pub(crate) fn setup(
    game: &mut GameLoop,
    preset: &ParallaxPreset,
    sounds: SoundPresets,
) -> Result<(), EngineError> {
    let world = game.world_mut();
    let resolution = world.resolution();
    info!(preset = preset.name.as_str(), layers = preset.layers, "runner_preset");

    let parallax = Parallax::new(&preset.path, preset.layers, resolution).with_motion(
        preset.scroll,
        preset.speed,
        preset.delta,
    );

    let title_font = world
        .resources_mut()
        .load_font(Path::new(TITLE_FONT), TITLE_PX)?;
    let subtitle_font = world
        .resources_mut()
        .load_font(Path::new(SUBTITLE_FONT), SUBTITLE_PX)?;
    let mut title = Text::new(title_font, "RUNNER", preset.color);
    title.set_location(Location::center(resolution, title.bounds()));
    let mut subtitle = Text::new(subtitle_font, "press space to start", preset.color);
    subtitle.set_location(Location::center(resolution, subtitle.bounds()).add(0, SUBTITLE_GAP));

    let mut character = Sprite::new(resolution).with_scalar(CHARACTER_SCALAR);
    let character_dir = Path::new(CHARACTER_DIR);
    for (state, dir, count) in CHARACTER_STATES {
        character.load_state(world.resources_mut(), state, &character_dir.join(dir), count)?;
    }
    character.set_state(SpriteState::Run);
    character.set_floor(resolution, preset.y_offset);
    character.set_location(
        Location::bottom_left(resolution, character.bounds()).add(CHARACTER_X, -preset.y_offset),
    );

    let floor = resolution.height as i32 - preset.y_offset;
    let obstacle = Obstacle::new(resolution, floor);

    world.register(parallax);
    let state = Rc::new(RefCell::new(RunnerState {
        title: world.register(title),
        subtitle: world.register(subtitle),
        character: world.register(character),
        obstacle: world.register(obstacle),
        hits: HitTracker::new(INVINCIBILITY),
        sounds,
    }));

    let hit_signal = world.allocate_tag();
    {
        let state = state.borrow();
        world
            .registry
            .listen(state.character, vec![state.obstacle], hit_signal);
    }

    game.register_event(EventTag::QUIT, |_, world| {
        info!("runner_closing");
        world.stop();
        Ok(())
    })?;

    let keys = Rc::clone(&state);
    game.register_event(EventTag::KEY_DOWN, move |event, world| {
        match event.key() {
            Some(Key::Escape) => world.stop(),
            Some(Key::Space) => {
                let mut state = keys.borrow_mut();
                state.start_run(world);
                state.jump(world);
            }
            _ => {}
        }
        Ok(())
    })?;

    let hits = Rc::clone(&state);
    game.register_event(hit_signal, move |_, world| {
        let mut state = hits.borrow_mut();
        if !state.hits.register(world.now()) {
            return Ok(());
        }
        let count = state.hits.hits();
        let mut rng = rand::thread_rng();
        if count >= MAX_HITS {
            let cue = state.sounds.random_death(&mut rng).map(Path::to_path_buf);
            play_cue(world, cue.as_deref());
            state.game_over(world);
        } else {
            let cue = state.sounds.random_hurt(&mut rng).map(Path::to_path_buf);
            play_cue(world, cue.as_deref());
            info!(hits = count, "runner_hit");
        }
        Ok(())
    })?;

    Ok(())
}
