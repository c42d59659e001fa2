//! # winview-client: demo snapshot client
//!
//! Connects to a winview viewer and streams an animated test pattern
//! until the viewer closes the window.

pub mod config;
pub mod pattern;
pub mod streamer;
