/// Login, logout and registration flows
pub mod coordinator;
/// Current location and the navigator trait
pub mod navigation;
/// Toast notifications
pub mod notify;

pub use coordinator::{LoginOutcome, LoginPhase, Session};
pub use navigation::{Location, Navigator, Router};
pub use notify::{Notifier, Toasts};
