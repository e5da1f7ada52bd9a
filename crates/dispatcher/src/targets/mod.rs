//! In-process targets
//!
//! Contains LogTarget and the UI broadcast channel.

mod log;
mod ui;

pub use self::log::LogTarget;
pub use self::ui::{UiBroadcast, UiUpdate};
