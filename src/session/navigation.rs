use std::sync::{Arc, Mutex, PoisonError};
use arc_swap::ArcSwap;

pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";
pub const REGISTER_ROUTE: &str = "/register";
pub const ACTIVITIES_ROUTE: &str = "/activities";

/// Where the UI currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    /// Route the user was heading to before being sent to the login screen.
    pub from: Option<String>,
}

impl Location {
    pub fn new(pathname: impl Into<String>) -> Self {
        Location {
            pathname: pathname.into(),
            from: None,
        }
    }

    /// Login and register screens, where the user-info query stays disabled.
    pub fn is_auth_screen(&self) -> bool {
        self.pathname == LOGIN_ROUTE || self.pathname == REGISTER_ROUTE
    }
}

/// The routing side of the UI, as seen by the session coordinator.
pub trait Navigator: Send + Sync {
    fn location(&self) -> Arc<Location>;

    fn navigate(&self, to: &str);
}

/// Headless navigator: keeps the current location and the list of visited paths.
#[derive(Debug)]
pub struct Router {
    current: ArcSwap<Location>,
    history: Mutex<Vec<String>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Location::new(HOME_ROUTE))
    }
}

impl Router {
    pub fn new(start: Location) -> Self {
        Router {
            history: Mutex::new(vec![start.pathname.clone()]),
            current: ArcSwap::from_pointee(start),
        }
    }

    /// Go to `to`, remembering `from` as the place to return to (what an auth guard does).
    pub fn navigate_with_from(&self, to: &str, from: &str) {
        self.go(Location {
            pathname: to.to_string(),
            from: Some(from.to_string()),
        });
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn go(&self, location: Location) {
        #[cfg(feature = "tracing")]
        tracing::debug!(to = %location.pathname, "navigating");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(location.pathname.clone());
        self.current.store(Arc::new(location));
    }
}

impl Navigator for Router {
    fn location(&self) -> Arc<Location> {
        self.current.load_full()
    }

    fn navigate(&self, to: &str) {
        self.go(Location::new(to));
    }
}
