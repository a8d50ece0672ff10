use std::process::ExitCode;

use tracing::error;

mod app;

fn main() -> ExitCode {
    let wiring = match app::build_app(std::env::args().skip(1)) {
        Ok(wiring) => wiring,
        Err(err) => {
            error!(error = %err, "bootstrap_failed");
            return ExitCode::FAILURE;
        }
    };
    app::run(wiring)
}
