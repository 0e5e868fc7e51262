//! Character stats, stat allocation and skill list packets.

use crate::common::error::ProtocolError;
use crate::protocol::packets::{decode_fixed, Packet, PacketDecode};

/// Width of the character name field.
pub const NAME_LEN: usize = 31;
pub const POTION_BAR_SLOTS: usize = 4;
pub const SKILL_BAR_SLOTS: usize = 10;

/// Full frame size of a CHARSTATS packet.
pub const CHARSTATS_SIZE: usize = 94;

/// CHARSTATS: authoritative character state.
#[derive(Debug, Clone, PartialEq)]
pub struct CharStats {
    pub name: String,
    pub level: u16,
    pub strength: u16,
    pub dexterity: u16,
    pub vitality: u16,
    pub energy: u16,
    pub char_class: u8,
    pub life: u16,
    pub max_life: u16,
    pub mana: u16,
    pub max_mana: u16,
    pub ag: u16,
    pub max_ag: u16,
    pub level_up_points: u16,
    /// Item definitions assigned to the potion hotkeys, -1 for empty.
    pub potion_bar: [i16; POTION_BAR_SLOTS],
    /// Skill ids on the skill hotbar, 0xFF for empty.
    pub skill_bar: [u8; SKILL_BAR_SLOTS],
    pub rmc_skill_id: u8,
    pub experience: u64,
    pub defense: u16,
    pub attack_speed: u16,
    pub magic_speed: u16,
    pub character_id: u16,
}

impl PacketDecode for CharStats {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, CHARSTATS_SIZE, |r| {
            let mut potion_bar = [0i16; POTION_BAR_SLOTS];
            for (i, slot) in potion_bar.iter_mut().enumerate() {
                *slot = r.i16_le(59 + i * 2)?;
            }
            let skill_bar: [u8; SKILL_BAR_SLOTS] = r.bytes(67, SKILL_BAR_SLOTS)?.try_into().ok()?;

            let exp_hi = r.u32_le(78)? as u64;
            let exp_lo = r.u32_le(82)? as u64;

            Some(Self {
                name: r.fixed_str(3, NAME_LEN)?,
                level: r.u16_le(34)?,
                strength: r.u16_le(36)?,
                dexterity: r.u16_le(38)?,
                vitality: r.u16_le(40)?,
                energy: r.u16_le(42)?,
                char_class: r.u8(44)?,
                life: r.u16_le(45)?,
                max_life: r.u16_le(47)?,
                mana: r.u16_le(49)?,
                max_mana: r.u16_le(51)?,
                ag: r.u16_le(53)?,
                max_ag: r.u16_le(55)?,
                level_up_points: r.u16_le(57)?,
                potion_bar,
                skill_bar,
                rmc_skill_id: r.u8(77)?,
                experience: (exp_hi << 32) | exp_lo,
                defense: r.u16_le(86)?,
                attack_speed: r.u16_le(88)?,
                magic_speed: r.u16_le(90)?,
                character_id: r.u16_le(92)?,
            })
        })
    }
}

/// Stat identifiers used by STAT_ALLOC and its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatKind {
    Strength = 0,
    Dexterity = 1,
    Vitality = 2,
    Energy = 3,
}

impl StatKind {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Strength),
            1 => Some(Self::Dexterity),
            2 => Some(Self::Vitality),
            3 => Some(Self::Energy),
            _ => None,
        }
    }
}

/// STAT_ALLOC_RESULT: server answer to a stat point spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatAllocResult {
    pub success: bool,
    pub stat_type: u8,
    pub new_value: u16,
    pub level_up_points: u16,
    pub max_life: u16,
    pub ag: u16,
    pub max_ag: u16,
}

impl PacketDecode for StatAllocResult {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 15, |r| {
            Some(Self {
                success: r.u8(3)? != 0,
                stat_type: r.u8(4)?,
                new_value: r.u16_le(5)?,
                level_up_points: r.u16_le(7)?,
                max_life: r.u16_le(9)?,
                ag: r.u16_le(11)?,
                max_ag: r.u16_le(13)?,
            })
        })
    }
}

/// Decode a C2 SKILL_LIST. Skill ids past a truncation are dropped.
pub fn decode_skill_list(packet: &Packet) -> Vec<u8> {
    let reader = packet.reader();
    let count = reader.u8(4).unwrap_or(0) as usize;
    reader
        .entries(5, count, 1)
        .filter_map(|entry| entry.u8(0))
        .collect()
}
