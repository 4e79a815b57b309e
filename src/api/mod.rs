//! HTTP API client modules

pub mod client;

pub use client::{ApiError, GameApiClient, SessionBootstrap};
