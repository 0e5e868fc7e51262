//! Frame types, field reader and opcodes.

pub mod codec;
pub mod opcodes;

pub use codec::*;
pub use opcodes::*;
