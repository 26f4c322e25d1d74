//! Granule Core - Shared types and utilities for the Granule simulation
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Integer/float vectors (re-exported from glam)
//! - Display colors for simulated materials
//! - The tick clock that measures elapsed time between ticks
//! - Simulation configuration loaded from TOML

pub mod config;
pub mod time;
pub mod types;

pub use config::{ConfigError, SimConfig};
pub use glam::{IVec2, Vec2};
pub use time::TickClock;
pub use types::Color;
