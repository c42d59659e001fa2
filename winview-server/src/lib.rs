//! # winview-server: snapshot viewer server
//!
//! Listens for clients that stream window snapshots, assigns each one a
//! session id and keeps track of the live sessions. On shutdown every
//! client is asked to close.

pub mod config;
pub mod service;
