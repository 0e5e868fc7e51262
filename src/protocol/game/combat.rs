//! Damage, monster death and monster attack packets.

use crate::common::error::ProtocolError;
use crate::common::types::ObjectIndex;
use crate::protocol::packets::{decode_fixed, Packet, PacketDecode};

/// DAMAGE: the hero hit a monster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Damage {
    pub monster_index: ObjectIndex,
    pub damage: u16,
    /// 0 miss, 2 critical, 3 excellent, anything else normal.
    pub damage_type: u8,
    pub remaining_hp: u16,
    pub attacker_char_id: u16,
}

impl PacketDecode for Damage {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 12, |r| {
            Some(Self {
                monster_index: r.u16_le(3)?,
                damage: r.u16_le(5)?,
                damage_type: r.u8(7)?,
                remaining_hp: r.u16_le(8)?,
                attacker_char_id: r.u16_le(10)?,
            })
        })
    }
}

/// MON_DEATH: a monster died, with the experience granted to the killer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterDeath {
    pub monster_index: ObjectIndex,
    pub killer_char_id: u16,
    pub xp_reward: u32,
}

impl PacketDecode for MonsterDeath {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 11, |r| {
            Some(Self {
                monster_index: r.u16_le(3)?,
                killer_char_id: r.u16_le(5)?,
                xp_reward: r.u32_le(7)?,
            })
        })
    }
}

/// MON_ATTACK: a monster hit the hero.
#[derive(Debug, Clone, PartialEq)]
pub struct MonsterAttack {
    pub monster_index: ObjectIndex,
    pub damage: u16,
    /// Hero HP left after the hit, as computed by the server.
    pub remaining_hp: f32,
}

impl PacketDecode for MonsterAttack {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 11, |r| {
            Some(Self {
                monster_index: r.u16_le(3)?,
                damage: r.u16_le(5)?,
                remaining_hp: r.f32_le(7)?,
            })
        })
    }
}
