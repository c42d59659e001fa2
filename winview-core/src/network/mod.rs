//! Async drivers that put a [`Session`](crate::session::Session) on a real stream.

pub mod connection;

pub use connection::{SessionConfig, SessionConnection, SessionHandle};
