mod bootstrap;
mod cannon;
mod loop_runner;
mod presets;
mod runner;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
