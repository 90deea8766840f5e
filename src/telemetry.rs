//! Tracing subscriber setup shared by the binaries.

use crate::config::Settings;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log to stdout and, when it can be opened, to `settings.log_file`.
pub fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_file)
    {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        ),
        Err(e) => {
            eprintln!("Error setting up file logger ({}): {}", settings.log_file, e);
            None
        }
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer);

    if registry.try_init().is_err() {
        eprintln!("Tracing subscriber already installed");
    }
}
