// Copyright 2022-2025 Martin Pool

//! A cancellation token shared by the engine and every worker.
//!
//! This generalizes the process-global interrupt flag into an explicit handle:
//! the engine installs one `ctrlc` handler at startup and then threads the
//! resulting [Cancellation] token through to each worker, rather than having
//! worker code reach for a bare global.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;

use crate::Result;

/// A cheaply cloned handle that workers poll to notice ctrl-c (or any other
/// reason the engine decided to stop early).
#[derive(Clone, Debug)]
pub struct Cancellation(Arc<AtomicBool>);

impl Default for Cancellation {
    fn default() -> Self {
        Cancellation(Arc::new(AtomicBool::new(false)))
    }
}

impl Cancellation {
    pub fn new() -> Cancellation {
        Cancellation::default()
    }

    /// Install a `ctrlc` handler that marks this token cancelled. Installing
    /// more than one handler per process will panic, so call this once, from
    /// the top-level binary.
    pub fn install_handler(&self) {
        let flag = Arc::clone(&self.0);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .expect("install ctrl-c handler");
    }

    /// Mark this token cancelled without needing a signal.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Return an error if cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(anyhow!("interrupted"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        let token = Cancellation::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = Cancellation::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().is_err());
    }
}
