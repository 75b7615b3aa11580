//! PhotoCuller Logging & Error Reporting
//!
//! Provides structured logging, the panic hook, timestamped error reports
//! and debug-build deadlock detection.

mod logging;
mod panic_hook;
mod report;

pub use logging::{cleanup_old_logs, init_logging};
pub use panic_hook::init_panic_hook;
pub use report::{write_error_report, write_report_to};

use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "PhotoCuller", "PhotoCuller")
}

/// Get the application log directory
pub fn log_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Directory receiving error reports (panics and fatal errors)
pub fn report_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("reports"))
        .unwrap_or_else(std::env::temp_dir)
}

/// Initialize all observability features
pub fn init() -> anyhow::Result<()> {
    init_logging()?;
    init_panic_hook();

    #[cfg(debug_assertions)]
    init_deadlock_detector();

    Ok(())
}

#[cfg(debug_assertions)]
fn init_deadlock_detector() {
    use std::thread;
    use std::time::Duration;

    let spawned = thread::Builder::new()
        .name("deadlock-detector".into())
        .spawn(|| loop {
            thread::sleep(Duration::from_secs(10));
            let deadlocks = parking_lot::deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                tracing::error!("Deadlock detected!");
                for (i, threads) in deadlocks.iter().enumerate() {
                    tracing::error!("Deadlock #{}", i);
                    for t in threads {
                        tracing::error!("Thread Id {:#?}", t.thread_id());
                        tracing::error!("{:#?}", t.backtrace());
                    }
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Failed to start deadlock detector: {}", e);
    }
}
