//! Signal handling utilities for graceful shutdown.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set up a Ctrl-C handler that clears the returned running flag.
///
/// # Example
/// ```ignore
/// let running = setup_ctrl_c_handler()?;
/// while running.load(Ordering::Relaxed) {
///     // ... do work ...
/// }
/// ```
pub fn setup_ctrl_c_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;
    Ok(running)
}
