//! Viewport and movement packets for NPCs and monsters.
//!
//! Index and type fields in these packets are big-endian while HP fields
//! are little-endian. Both must be kept as-is to match the server.

use crate::common::error::ProtocolError;
use crate::common::types::ObjectIndex;
use crate::protocol::packets::{decode_fixed, Packet, PacketDecode, PacketReader};

const NPC_ENTRY_SIZE: usize = 9;
const MONSTER_V2_ENTRY_SIZE: usize = 12;
const MONSTER_V1_ENTRY_SIZE: usize = 5;

/// An NPC entering the viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcSpawn {
    pub index: ObjectIndex,
    pub npc_type: u16,
    pub grid_x: u8,
    pub grid_y: u8,
    pub dir: u8,
}

/// A monster entering the viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterSpawn {
    pub index: ObjectIndex,
    pub monster_type: u16,
    pub grid_x: u8,
    pub grid_y: u8,
    pub dir: u8,
    pub hp: u16,
    pub max_hp: u16,
    pub state: u8,
}

fn list_count(reader: &PacketReader<'_>, off: usize) -> usize {
    reader.u8(off).unwrap_or(0) as usize
}

/// Decode a C2 NPC viewport list. Entries past a truncation are dropped.
pub fn decode_npc_viewport(packet: &Packet) -> Vec<NpcSpawn> {
    let reader = packet.reader();
    let count = list_count(&reader, 4);

    reader
        .entries(5, count, NPC_ENTRY_SIZE)
        .filter_map(|entry| {
            Some(NpcSpawn {
                // Top bit of the index is the create flag.
                index: entry.u16_be(0)? & 0x7FFF,
                npc_type: entry.u16_be(2)?,
                grid_x: entry.u8(4)?,
                grid_y: entry.u8(5)?,
                dir: entry.u8(8)? >> 4,
            })
        })
        .collect()
}

/// Decode a C2 monster viewport list with HP and state.
pub fn decode_monster_viewport_v2(packet: &Packet) -> Vec<MonsterSpawn> {
    let reader = packet.reader();
    let count = list_count(&reader, 4);

    reader
        .entries(5, count, MONSTER_V2_ENTRY_SIZE)
        .filter_map(|entry| {
            Some(MonsterSpawn {
                index: entry.u16_be(0)?,
                monster_type: entry.u16_be(2)?,
                grid_x: entry.u8(4)?,
                grid_y: entry.u8(5)?,
                dir: entry.u8(6)?,
                hp: entry.u16_le(7)?,
                max_hp: entry.u16_le(9)?,
                state: entry.u8(11)?,
            })
        })
        .collect()
}

/// Decode the legacy C1 monster viewport.
///
/// v1 entries carry no index or HP; the list position stands in for the
/// index.
pub fn decode_monster_viewport_v1(packet: &Packet) -> Vec<MonsterSpawn> {
    let reader = packet.reader();
    let count = list_count(&reader, 3);

    reader
        .entries(4, count, MONSTER_V1_ENTRY_SIZE)
        .enumerate()
        .filter_map(|(i, entry)| {
            Some(MonsterSpawn {
                index: i as ObjectIndex,
                monster_type: entry.u16_be(0)?,
                grid_x: entry.u8(2)?,
                grid_y: entry.u8(3)?,
                dir: entry.u8(4)?,
                hp: 0,
                max_hp: 0,
                state: 0,
            })
        })
        .collect()
}

/// MON_MOVE: monster walking or chasing toward a grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterMove {
    pub index: ObjectIndex,
    pub target_x: u8,
    pub target_y: u8,
    pub chasing: bool,
}

impl PacketDecode for MonsterMove {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 8, |r| {
            Some(Self {
                index: r.u16_le(3)?,
                target_x: r.u8(5)?,
                target_y: r.u8(6)?,
                chasing: r.u8(7)? != 0,
            })
        })
    }
}

/// NPC_MOVE: NPC walking toward a grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcMove {
    pub index: ObjectIndex,
    pub target_x: u8,
    pub target_y: u8,
}

impl PacketDecode for NpcMove {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 7, |r| {
            Some(Self {
                index: r.u16_le(3)?,
                target_x: r.u8(5)?,
                target_y: r.u8(6)?,
            })
        })
    }
}

/// MON_RESPAWN: a monster reappears at a grid cell with fresh HP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterRespawn {
    pub index: ObjectIndex,
    pub grid_x: u8,
    pub grid_y: u8,
    pub hp: u16,
}

impl PacketDecode for MonsterRespawn {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 9, |r| {
            Some(Self {
                index: r.u16_le(3)?,
                grid_x: r.u8(5)?,
                grid_y: r.u8(6)?,
                hp: r.u16_le(7)?,
            })
        })
    }
}
