//! Game server connection and per-opcode packet decoding.

pub mod character;
pub mod combat;
pub mod connector;
pub mod items;
pub mod packets;
pub mod session;
pub mod world;

pub use character::{CharStats, StatAllocResult};
pub use connector::{new_game_connection, GameConnection};
pub use items::{EquipAssignment, InventoryRecord, InventorySync, ShopItem};
pub use session::ServerConnection;
pub use world::{MonsterSpawn, NpcSpawn};
