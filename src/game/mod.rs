//! Client game state and the session that drives it.
//!
//! This module contains:
//! - Packet dispatch into the live state
//! - The hero combat state machine and server-mirrored stat formulas
//! - Inventory and equipment reconciliation
//! - The session driver

pub mod client;
pub mod dispatcher;
pub mod hero;
pub mod inventory;
pub mod items;
pub mod state;
pub mod stats;
pub mod world;

// Re-export commonly used types
pub use client::{GameClient, SessionEnd};
