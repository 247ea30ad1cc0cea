//! Process-wide shutdown request shared by the main loop and the capture callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Cloneable, race-free "please stop" flag
///
/// Set once (from a signal watcher or a test), observed by the analysis loop
/// and by the capture callback, which then asks the audio subsystem to stop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Request shutdown when the process receives Ctrl+C (SIGINT)
///
/// Spawns a watcher thread running a single-threaded tokio runtime that waits
/// for the signal. The watcher exits after the first signal.
pub fn install_ctrl_c_handler(flag: ShutdownFlag) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("[Shutdown] Interrupt signal received");
                        flag.request();
                    }
                    Err(err) => {
                        tracing::warn!("[Shutdown] Unable to listen for Ctrl+C: {}", err);
                    }
                }
            });
        })?;

    Ok(())
}
