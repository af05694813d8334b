use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const QUIET_FILTER: &str = "arduino_lab_engine=warn,arduino_lab_contracts=warn,arduino_lab=warn";
const VERBOSE_FILTER: &str =
    "arduino_lab_engine=debug,arduino_lab_contracts=debug,arduino_lab=debug,info";

/// Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
/// overrides both presets.
pub fn init_logger(verbose: bool) {
    let preset = if verbose { VERBOSE_FILTER } else { QUIET_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(preset));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
