pub mod handler;
pub mod observer;
pub mod phase;

pub use handler::Session;
pub use observer::{SessionEvent, SessionObserver};
pub use phase::SessionPhase;
