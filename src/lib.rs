//! Cavecrew Server Library
//!
//! Authoritative real-time simulation for a small-crew cooperative arena
//! game: five fixed seats per room, bot fallback for empty seats, a fixed
//! 20 Hz tick loop, periodic seat rotation, and seed-deterministic
//! procedural loot.
//!
//! # Features
//!
//! - `lobby` - Room directory with join codes and session management (enabled by default)
//! - `transport` - Built-in TCP transport with length-prefixed bincode frames (enabled by default)
//! - `minimal` - Build without optional features for testing/debugging

pub mod config;
pub mod util;
pub mod game;
pub mod loot;
pub mod net;

// Feature-gated modules (enabled by default)
#[cfg(feature = "lobby")]
pub mod lobby;
