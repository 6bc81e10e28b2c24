//! Logging infrastructure for the oxidized-xenon toolkit

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogLevel;

/// Initialize the logging system from a level and optional file sink.
pub fn init(level: LogLevel, log_file: Option<&str>) {
    let level = match level {
        LogLevel::Off => return,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true));

    if let Some(path) = log_file {
        if let Ok(file) = std::fs::File::create(path) {
            let file_layer = fmt::layer()
                .with_writer(std::sync::Arc::new(file))
                .with_ansi(false);
            let _ = subscriber.with(file_layer).try_init();
        } else {
            let _ = subscriber.try_init();
        }
    } else {
        let _ = subscriber.try_init();
    }
}

/// Initialize logging with default settings (for tests and quick starts).
pub fn init_default() {
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

// Convenience macros for component-specific logging

/// Log a codegen warning
#[macro_export]
macro_rules! codegen_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "codegen", $($arg)*)
    };
}

/// Log a codegen trace message
#[macro_export]
macro_rules! codegen_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "codegen", $($arg)*)
    };
}

/// Log a kernel debug message
#[macro_export]
macro_rules! kernel_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "kernel", $($arg)*)
    };
}

/// Log a kernel warning
#[macro_export]
macro_rules! kernel_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "kernel", $($arg)*)
    };
}
