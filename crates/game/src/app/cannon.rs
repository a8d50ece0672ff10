use std::path::Path;
use std::time::Duration;

use engine::{
    Color, EngineError, EntityId, EventTag, GameLoop, Key, Location, LoopConfig, PhysicsCircle,
    PhysicsSegment, Resolution, Text, TimerRepeat,
};
use rand::Rng;
use tracing::info;

const FPS_FONT: &str = "font/kenpixel_mini_square.ttf";
const FPS_PX: f32 = 32.0;
const FPS_INTERVAL: Duration = Duration::from_millis(500);
const CLOSE_GAP_DELAY: Duration = Duration::from_millis(9000);
const BOUNDARY_RADIUS: i32 = 10;
const WALL_X: i32 = 900;
const WALL_RADIUS: i32 = 50;
const GAP_TOP: i32 = 400;
const GAP_BOTTOM: i32 = 600;
const SHELF_RADIUS: i32 = 10;
const BALL_COUNT: usize = 100;
const BALL_RADIUS: i32 = 7;
const BALL_VELOCITY: (f32, f32) = (500.0, -20.0);

pub(crate) fn config() -> LoopConfig {
    LoopConfig {
        title: "Cannon Fodder".to_string(),
        resolution: Resolution::P720,
        background: Color::BLACK,
        gravity: (0.0, 200.0),
        ..LoopConfig::default()
    }
}

/// Frame edges plus the wall with its gap and the two shelves behind it.
pub(crate) fn boundaries(resolution: Resolution) -> Vec<PhysicsSegment> {
    let (w, h) = (resolution.width as i32, resolution.height as i32);
    let edge = |a: (i32, i32), b: (i32, i32)| {
        PhysicsSegment::new(a.into(), b.into(), BOUNDARY_RADIUS, Color::BLACK)
    };
    let wall = |a: (i32, i32), b: (i32, i32), radius: i32| {
        PhysicsSegment::new(a.into(), b.into(), radius, Color::WHITE)
    };
    vec![
        edge((0, 0), (w, 0)),
        edge((0, 0), (0, h)),
        edge((w, 0), (w, h)),
        edge((0, h), (w, h)),
        wall((WALL_X, 0), (WALL_X, GAP_TOP), WALL_RADIUS),
        wall((WALL_X, GAP_BOTTOM), (WALL_X, h), WALL_RADIUS),
        wall((1110, 600), (1230, 600), SHELF_RADIUS),
        wall((1080, 650), (1200, 650), SHELF_RADIUS),
    ]
}

pub(crate) fn balls<R: Rng + ?Sized>(rng: &mut R) -> Vec<PhysicsCircle> {
    (0..BALL_COUNT)
        .map(|_| {
            let location = Location::new(rng.gen_range(100..=200), rng.gen_range(200..=600));
            PhysicsCircle::new(BALL_RADIUS, Color::random_with(rng), location)
                .with_velocity(BALL_VELOCITY)
        })
        .collect()
}

pub(crate) fn setup(game: &mut GameLoop) -> Result<(), EngineError> {
    let world = game.world_mut();
    let resolution = world.resolution();
    for segment in boundaries(resolution) {
        world.register(segment);
    }
    for ball in balls(&mut rand::thread_rng()) {
        world.register(ball);
    }

    let fps_font = world.resources_mut().load_font(Path::new(FPS_FONT), FPS_PX)?;
    let update_fps = world.allocate_tag();
    let close_gap = world.allocate_tag();
    world.set_timer(update_fps, FPS_INTERVAL, TimerRepeat::Forever);
    world.set_timer(close_gap, CLOSE_GAP_DELAY, TimerRepeat::Once);

    game.register_event(EventTag::QUIT, |_, world| {
        info!("cannon_stopping");
        world.stop();
        Ok(())
    })?;
    game.register_event(EventTag::KEY_DOWN, |event, world| {
        if event.key() == Some(Key::Escape) {
            info!("cannon_stopping");
            world.stop();
        }
        Ok(())
    })?;
    game.register_event(close_gap, |_, world| {
        let gap = PhysicsSegment::new(
            Location::new(WALL_X, GAP_TOP),
            Location::new(WALL_X, GAP_BOTTOM),
            WALL_RADIUS,
            Color::WHITE,
        );
        world.register_and_spawn(gap)?;
        info!("cannon_gap_closed");
        Ok(())
    })?;

    let mut pending_text = Some(Text::new(fps_font, "FPS: 0", Color::WHITE));
    let mut fps_text: Option<EntityId> = None;
    game.register_event(update_fps, move |_, world| {
        if let Some(text) = pending_text.take() {
            fps_text = Some(world.register_and_spawn(text)?);
        }
        let label = format!("FPS: {}", world.fps() as u32);
        if let Some(text) = fps_text.and_then(|id| world.registry.get_mut::<Text>(id)) {
            text.set_text(label);
        }
        Ok(())
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use engine::Entity;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn config_enables_downward_gravity() {
        let config = config();
        assert_eq!(config.title, "Cannon Fodder");
        assert_eq!(config.gravity, (0.0, 200.0));
        assert_eq!(config.background, Color::BLACK);
    }

    #[test]
    fn wall_leaves_a_gap_between_400_and_600() {
        let segments = boundaries(Resolution::P720);
        assert_eq!(segments.len(), 8);

        let walls: Vec<_> = segments
            .iter()
            .map(PhysicsSegment::endpoints)
            .filter(|(start, end)| start.x == WALL_X && end.x == WALL_X)
            .collect();
        assert_eq!(
            walls,
            vec![
                (Location::new(900, 0), Location::new(900, 400)),
                (Location::new(900, 600), Location::new(900, 720)),
            ]
        );
        assert_eq!(
            segments[3].endpoints(),
            (Location::new(0, 720), Location::new(1280, 720))
        );
    }

    #[test]
    fn balls_start_left_of_the_wall() {
        let mut rng = StdRng::seed_from_u64(42);
        let balls = balls(&mut rng);
        assert_eq!(balls.len(), BALL_COUNT);
        for ball in &balls {
            let location = ball.location();
            assert!((100..=200).contains(&location.x), "{location:?}");
            assert!((200..=600).contains(&location.y), "{location:?}");
            assert_eq!(
                ball.body().expect("body").desc().velocity,
                BALL_VELOCITY
            );
        }
    }
}
