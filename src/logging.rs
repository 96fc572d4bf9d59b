//! Subscriber setup for the binaries

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber on stderr
///
/// `RUST_LOG` wins when set. Otherwise each `verbosity` step raises the level from `info`
/// through `debug` to `trace`.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // a second init in the same process keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
