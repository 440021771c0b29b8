//! # Reentrancy Guard
//!
//! A per-vault flag that is set for the whole duration of a guarded call.
//! A second guarded call while the flag is set is rejected with
//! [`VaultError::ReentrantCall`]. The flag is cleared by the returned
//! [`Entered`] token's `Drop`, so it is released on every exit path,
//! including `?` early returns and unwinding.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::VaultError;

/// Mutual-exclusion flag scoped to a single guarded call.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    /// Creates an unlocked guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a guarded call as in progress.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ReentrantCall`] if a guarded call is already
    /// in progress on this vault.
    pub fn enter(&self) -> Result<Entered<'_>, VaultError> {
        self.entered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| VaultError::ReentrantCall)?;
        Ok(Entered { guard: self })
    }

    /// `true` while a guarded call is in progress.
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Proof that the guard is held. Releases it on drop.
#[derive(Debug)]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_entry_rejected() {
        let guard = ReentrancyGuard::new();
        let outer = guard.enter().unwrap();
        assert!(guard.is_entered());
        assert_eq!(guard.enter().unwrap_err(), VaultError::ReentrantCall);
        drop(outer);
        assert!(!guard.is_entered());
    }

    #[test]
    fn released_on_error_path() {
        fn failing(guard: &ReentrancyGuard) -> Result<(), VaultError> {
            let _entered = guard.enter()?;
            Err(VaultError::ZeroAmount)
        }

        let guard = ReentrancyGuard::new();
        assert_eq!(failing(&guard).unwrap_err(), VaultError::ZeroAmount);
        assert!(!guard.is_entered());
        assert!(guard.enter().is_ok());
    }
}
