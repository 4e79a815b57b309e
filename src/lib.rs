//! Swordplay client - synchronization core for the side-scrolling sword game
//!
//! Bootstraps a session over HTTP, keeps a WebSocket open to the game server,
//! predicts the local player's movement every frame and reconciles it with
//! the server's snapshots.

pub mod api;
pub mod app;
pub mod config;
pub mod game;
pub mod util;
pub mod ws;
