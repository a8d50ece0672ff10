use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::presets::{ParallaxPreset, PresetResult, Presets};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Demo {
    /// Side-scroller; an optional preset name pins the background.
    Runner { preset: Option<String> },
    Cannon,
}

pub(crate) struct AppWiring {
    pub(crate) demo: Demo,
    pub(crate) presets: Presets,
}

impl AppWiring {
    pub(crate) fn runner_preset<R: Rng + ?Sized>(
        &self,
        name: Option<&str>,
        rng: &mut R,
    ) -> PresetResult<ParallaxPreset> {
        let preset = match name {
            Some(name) => self
                .presets
                .parallax_named(name)
                .ok_or_else(|| format!("unknown parallax preset '{name}'"))?,
            None => self.presets.random_parallax(rng)?,
        };
        Ok(preset.clone())
    }
}

pub(crate) fn build_app<I>(args: I) -> PresetResult<AppWiring>
where
    I: IntoIterator<Item = String>,
{
    init_tracing();
    info!("=== Tickwork Startup ===");

    let demo = parse_demo(args)?;
    let presets = Presets::embedded()?;
    info!(?demo, presets = presets.parallax.len(), "demo_selected");
    Ok(AppWiring { demo, presets })
}

pub(crate) fn parse_demo<I>(args: I) -> PresetResult<Demo>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let demo = match args.next().as_deref() {
        None | Some("runner") => Demo::Runner {
            preset: args.next(),
        },
        Some("cannon") => Demo::Cannon,
        Some(other) => {
            return Err(format!(
                "unknown demo '{other}'; expected 'runner [preset]' or 'cannon'"
            ))
        }
    };
    if let Some(extra) = args.next() {
        return Err(format!("unexpected argument '{extra}'"));
    }
    Ok(demo)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn runner_is_the_default_demo() {
        assert_eq!(
            parse_demo(args(&[])).expect("demo"),
            Demo::Runner { preset: None }
        );
    }

    #[test]
    fn runner_accepts_a_preset_name() {
        assert_eq!(
            parse_demo(args(&["runner", "jungle"])).expect("demo"),
            Demo::Runner {
                preset: Some("jungle".to_string())
            }
        );
        assert_eq!(parse_demo(args(&["cannon"])).expect("demo"), Demo::Cannon);
    }

    #[test]
    fn unknown_or_extra_arguments_are_rejected() {
        assert!(parse_demo(args(&["pong"])).is_err());
        assert!(parse_demo(args(&["cannon", "fast"])).is_err());
        assert!(parse_demo(args(&["runner", "forest", "extra"])).is_err());
    }

    #[test]
    fn runner_preset_lookup_by_name_or_random() {
        let wiring = AppWiring {
            demo: Demo::Runner { preset: None },
            presets: Presets::embedded().expect("presets"),
        };
        let mut rng = StdRng::seed_from_u64(3);
        let forest = wiring
            .runner_preset(Some("forest"), &mut rng)
            .expect("forest");
        assert_eq!(forest.layers, 4);
        assert!(wiring.runner_preset(Some("desert"), &mut rng).is_err());
        assert!(wiring.runner_preset(None, &mut rng).is_ok());
    }
}
