//! Navigation seam used by the response policy.
//!
//! The client only needs two things from whatever front end hosts it: the
//! path the user is on, and a way to send them to the admin login page.

use std::sync::Mutex;

use tracing::info;

/// Path prefix of the authenticated admin area.
pub const ADMIN_PREFIX: &str = "/admin";

/// Where a rejected admin session is sent.
pub const ADMIN_LOGIN_PATH: &str = "/admin/login";

pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

/// True for `/admin` and anything below it, but not `/administration`.
pub fn is_admin_path(path: &str) -> bool {
    path == ADMIN_PREFIX
        || path
            .strip_prefix(ADMIN_PREFIX)
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
}

#[derive(Debug, Default)]
struct RouterState {
    current: String,
    history: Vec<String>,
    redirect: Option<String>,
}

/// In-memory navigator for front ends without a browser location.
#[derive(Debug)]
pub struct Router {
    state: Mutex<RouterState>,
}

impl Router {
    pub fn new(initial: &str) -> Self {
        Self {
            state: Mutex::new(RouterState {
                current: initial.to_string(),
                history: vec![initial.to_string()],
                redirect: None,
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RouterState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// User-initiated move to `path`.
    pub fn visit(&self, path: &str) {
        self.with_state(|state| {
            state.current = path.to_string();
            state.history.push(path.to_string());
        });
    }

    /// Take the most recent programmatic redirect, if one happened.
    pub fn take_redirect(&self) -> Option<String> {
        self.with_state(|state| state.redirect.take())
    }

    pub fn history(&self) -> Vec<String> {
        self.with_state(|state| state.history.clone())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for Router {
    fn current_path(&self) -> String {
        self.with_state(|state| state.current.clone())
    }

    fn navigate(&self, path: &str) {
        info!(to = path, "Redirecting");
        self.with_state(|state| {
            state.current = path.to_string();
            state.history.push(path.to_string());
            state.redirect = Some(path.to_string());
        });
    }
}
