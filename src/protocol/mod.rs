//! MU wire protocol: framing, opcodes and per-opcode payloads.

pub mod game;
pub mod packets;
