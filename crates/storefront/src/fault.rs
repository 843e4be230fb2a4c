//! Blocking fault prompts for authentication and authorization failures.
//!
//! The API chokepoint escalates two classes of failure into a blocking,
//! app-wide prompt: a rejected credential (session expired) and a
//! forbidden operation (not authorized). The prompts are owned by a
//! single injected [`PromptHost`] service; each kind has at most one
//! live instance at a time, and re-raising while one is showing is a
//! no-op. The per-call error still reaches the caller independently of
//! the prompt.
//!
//! The host renders through a [`PromptSurface`] supplied by the shell.
//! The default surface only logs, which keeps headless use (tests,
//! tooling) working without a UI.

use std::sync::{Arc, Mutex};

/// The two app-wide fault prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPrompt {
    /// The stored credential was rejected; the only action is to go to
    /// sign-in.
    SessionExpired,
    /// The operation was forbidden for this account; dismissible in
    /// place.
    NotAuthorized,
}

/// Where a prompt action sends the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    /// The sign-in view.
    SignIn,
}

/// Rendering seam implemented by the shell hosting this core.
///
/// `present` is called at most once per live prompt instance; `dismiss`
/// exactly once when that instance is torn down.
pub trait PromptSurface: Send + Sync {
    /// Mount the blocking prompt.
    fn present(&self, prompt: FaultPrompt);

    /// Detach and destroy the prompt.
    fn dismiss(&self, prompt: FaultPrompt);
}

/// Surface that only logs. Used when no shell has been attached.
#[derive(Debug, Default)]
pub struct LoggingSurface;

impl PromptSurface for LoggingSurface {
    fn present(&self, prompt: FaultPrompt) {
        tracing::warn!(?prompt, "fault prompt raised without an attached surface");
    }

    fn dismiss(&self, prompt: FaultPrompt) {
        tracing::debug!(?prompt, "fault prompt dismissed");
    }
}

/// Process-wide owner of the two fault prompts.
///
/// Cheaply cloneable; clones share the same live-instance bookkeeping,
/// so the at-most-one guarantee holds across every component holding a
/// handle.
#[derive(Clone)]
pub struct PromptHost {
    inner: Arc<PromptHostInner>,
}

struct PromptHostInner {
    surface: Arc<dyn PromptSurface>,
    session_expired_live: Mutex<bool>,
    not_authorized_live: Mutex<bool>,
}

impl PromptHost {
    /// Create a host rendering through the given surface.
    #[must_use]
    pub fn new(surface: Arc<dyn PromptSurface>) -> Self {
        Self {
            inner: Arc::new(PromptHostInner {
                surface,
                session_expired_live: Mutex::new(false),
                not_authorized_live: Mutex::new(false),
            }),
        }
    }

    /// Create a host with the logging surface.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(Arc::new(LoggingSurface))
    }

    /// Raise the session-expired prompt.
    ///
    /// Returns `true` if a new instance was mounted, `false` if one was
    /// already showing (idempotent while live).
    pub fn show_session_expired(&self) -> bool {
        self.show(FaultPrompt::SessionExpired)
    }

    /// Raise the not-authorized prompt. Same at-most-once discipline as
    /// [`Self::show_session_expired`].
    pub fn show_not_authorized(&self) -> bool {
        self.show(FaultPrompt::NotAuthorized)
    }

    /// The session-expired prompt's single action: tear the prompt down
    /// and signal where to navigate.
    pub fn confirm_session_expired(&self) -> NavTarget {
        self.hide(FaultPrompt::SessionExpired);
        NavTarget::SignIn
    }

    /// Dismiss the not-authorized prompt without navigating.
    pub fn dismiss_not_authorized(&self) {
        self.hide(FaultPrompt::NotAuthorized);
    }

    /// Whether a prompt of this kind is currently live.
    #[must_use]
    pub fn is_showing(&self, prompt: FaultPrompt) -> bool {
        *self.flag(prompt)
    }

    fn show(&self, prompt: FaultPrompt) -> bool {
        let mut live = self.flag(prompt);
        if *live {
            return false;
        }
        *live = true;
        // Present while holding the flag so a concurrent raise cannot
        // double-mount.
        self.inner.surface.present(prompt);
        true
    }

    fn hide(&self, prompt: FaultPrompt) {
        let mut live = self.flag(prompt);
        if *live {
            *live = false;
            self.inner.surface.dismiss(prompt);
        }
    }

    fn flag(&self, prompt: FaultPrompt) -> std::sync::MutexGuard<'_, bool> {
        let mutex = match prompt {
            FaultPrompt::SessionExpired => &self.inner.session_expired_live,
            FaultPrompt::NotAuthorized => &self.inner.not_authorized_live,
        };
        mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
