//! Adapter implementations bundled with the dispatcher
//!
//! Real protocol adapters live with their transports; only the mock ships here.

mod mock;

pub use self::mock::{MockAdapter, MockBehavior};
