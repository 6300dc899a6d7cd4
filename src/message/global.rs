//! Process-wide manager instance.
//!
//! The first manager installed wins. Later calls get the existing instance
//! back and their argument is dropped, so every call site shares one set of
//! slots and timers.

use once_cell::sync::OnceCell;

use super::manager::MessageManager;
use crate::error::{Error, Result};

static MANAGER: OnceCell<MessageManager> = OnceCell::new();

/// Installs `manager` unless one is already installed, and returns the
/// installed instance.
pub fn install(manager: MessageManager) -> &'static MessageManager {
    let mut fresh = false;
    let installed = MANAGER.get_or_init(|| {
        fresh = true;
        manager
    });
    if fresh {
        tracing::debug!("installed global message manager");
    } else {
        tracing::debug!("global message manager already installed; keeping it");
    }
    installed
}

/// Like [`install`] but only constructs the manager when none exists yet.
pub fn get_or_init(make: impl FnOnce() -> MessageManager) -> &'static MessageManager {
    MANAGER.get_or_init(make)
}

/// Like [`get_or_init`] for fallible construction, e.g. through
/// `MessageManager::builder().build()`.
pub fn get_or_try_init(
    make: impl FnOnce() -> Result<MessageManager>,
) -> Result<&'static MessageManager> {
    MANAGER.get_or_try_init(make)
}

pub fn global() -> Option<&'static MessageManager> {
    MANAGER.get()
}

pub fn try_global() -> Result<&'static MessageManager> {
    MANAGER.get().ok_or(Error::NotInstalled)
}
