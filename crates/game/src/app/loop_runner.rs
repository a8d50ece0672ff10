use std::process::ExitCode;

use engine::run_app;
use tracing::error;

use super::bootstrap::{AppWiring, Demo};
use super::{cannon, runner};

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let result = match &app.demo {
        Demo::Runner { preset } => {
            let preset = match app.runner_preset(preset.as_deref(), &mut rand::thread_rng()) {
                Ok(preset) => preset,
                Err(err) => {
                    error!(error = %err, "preset_selection_failed");
                    return ExitCode::FAILURE;
                }
            };
            let sounds = app.presets.sounds.clone();
            run_app(runner::config(), move |game| {
                runner::setup(game, &preset, sounds)
            })
        }
        Demo::Cannon => run_app(cannon::config(), cannon::setup),
    };

    if let Err(err) = result {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
