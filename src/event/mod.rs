//! Event bus and the signals the engine emits on it.

pub mod bus;
pub mod signal;

pub use bus::{EventBus, Handler};
pub use signal::Event;
