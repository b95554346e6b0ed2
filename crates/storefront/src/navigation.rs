//! Navigation seam.
//!
//! Routing belongs to the host application. The session layer only needs to
//! know where the shopper currently is and to send them somewhere else on
//! logout or session expiry.

use std::sync::{Mutex, PoisonError};

/// Well-known storefront paths.
pub mod paths {
    /// Landing page, target of an explicit logout.
    pub const LANDING: &str = "/";

    /// Login page.
    pub const LOGIN: &str = "/login";

    /// Login page with the session-expiry marker.
    pub const SESSION_EXPIRED: &str = "/login?session=expired";

    /// Pages that run their own authentication flow and handle 401s
    /// themselves. Sub-paths count too.
    pub const AUTH_FLOW: &[&str] = &[
        "/login",
        "/signup",
        "/register",
        "/auth/callback",
        "/forgot-password",
        "/reset-password",
    ];
}

/// Host-provided router.
pub trait Navigator: Send + Sync {
    /// Path of the page the shopper is on, possibly with a query string.
    fn current_path(&self) -> String;

    /// Move the shopper to `path`.
    fn navigate(&self, path: &str);
}

/// Whether `path` belongs to an authentication flow page.
///
/// Query strings and fragments are ignored, as is a trailing slash.
#[must_use]
pub fn is_auth_flow_path(path: &str) -> bool {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    paths::AUTH_FLOW.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// [`Navigator`] that keeps the current path in memory and records every
/// navigation. Used by the CLI and in tests.
#[derive(Debug)]
pub struct MemoryNavigator {
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    /// Start on `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            current: Mutex::new(path.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Pretend the shopper opened `path` without going through `navigate`.
    pub fn visit(&self, path: impl Into<String>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = path.into();
    }

    /// Every path passed to [`Navigator::navigate`], oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent navigation, if any.
    #[must_use]
    pub fn last_navigation(&self) -> Option<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(paths::LANDING)
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, path: &str) {
        tracing::debug!(to = path, "navigating");
        self.visit(path);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_owned());
    }
}
