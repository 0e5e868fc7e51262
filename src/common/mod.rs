//! Common utilities and types shared across the application.

pub mod error;
pub mod reconnect;
pub mod resources;
pub mod types;

pub use error::{ConnectionError, ProtocolError};
pub use resources::CharClass;
pub use types::{DamageKind, DefIndex, ObjectIndex, Vec3};
