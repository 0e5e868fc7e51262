//! Client to server messages.
//!
//! Every message is a C1 frame; `Into<Packet>` fills in the header.

use bytes::{BufMut, BytesMut};

use crate::common::types::{DefIndex, ObjectIndex};
use crate::protocol::packets::opcodes::client;
use crate::protocol::packets::{Packet, PacketEncode};

/// Category byte that turns an EQUIP into an unequip.
pub const UNEQUIP_CATEGORY: u8 = 0xFF;

/// Target bag slot meaning "let the server pick".
pub const ANY_SLOT: u8 = 0xFF;

fn c1_from<T: PacketEncode>(opcode: u8, msg: &T) -> Packet {
    let mut body = BytesMut::new();
    msg.encode(&mut body);
    Packet::c1(opcode, &body)
}

macro_rules! c1_message {
    ($ty:ty, $opcode:expr) => {
        impl From<$ty> for Packet {
            fn from(msg: $ty) -> Self {
                c1_from($opcode, &msg)
            }
        }
    };
}

/// PRECISE_POS: exact hero world position.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecisePosition {
    pub world_x: f32,
    pub world_z: f32,
}

impl PacketEncode for PrecisePosition {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_f32_le(self.world_x);
        buf.put_f32_le(self.world_z);
    }
}

c1_message!(PrecisePosition, client::PRECISE_POS);

/// ATTACK: plain attack on a monster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attack {
    pub monster_index: ObjectIndex,
}

impl PacketEncode for Attack {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.monster_index);
    }
}

c1_message!(Attack, client::ATTACK);

/// SKILL_ATTACK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillAttack {
    pub monster_index: ObjectIndex,
    pub skill_id: u8,
}

impl PacketEncode for SkillAttack {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.monster_index);
        buf.put_u8(self.skill_id);
    }
}

c1_message!(SkillAttack, client::SKILL_ATTACK);

/// PICKUP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pickup {
    pub drop_index: u16,
}

impl PacketEncode for Pickup {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.drop_index);
    }
}

c1_message!(Pickup, client::PICKUP);

/// CHARSAVE: persist the character as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSave {
    pub character_id: u16,
    pub level: u16,
    pub strength: u16,
    pub dexterity: u16,
    pub vitality: u16,
    pub energy: u16,
    pub life: u16,
    pub max_life: u16,
    pub mana: u16,
    pub max_mana: u16,
    pub ag: u16,
    pub max_ag: u16,
    pub level_up_points: u16,
    pub experience: u64,
    pub skill_bar: [i8; 10],
    pub potion_bar: [i16; 4],
    pub rmc_skill_id: u8,
}

impl PacketEncode for CharSave {
    fn encode(&self, buf: &mut BytesMut) {
        for value in [
            self.character_id,
            self.level,
            self.strength,
            self.dexterity,
            self.vitality,
            self.energy,
            self.life,
            self.max_life,
            self.mana,
            self.max_mana,
            self.ag,
            self.max_ag,
            self.level_up_points,
        ] {
            buf.put_u16_le(value);
        }
        buf.put_u32_le(self.experience as u32);
        buf.put_u32_le((self.experience >> 32) as u32);
        for skill in self.skill_bar {
            buf.put_i8(skill);
        }
        for potion in self.potion_bar {
            buf.put_i16_le(potion);
        }
        buf.put_u8(self.rmc_skill_id);
    }
}

c1_message!(CharSave, client::CHARSAVE);

/// EQUIP. A category of [`UNEQUIP_CATEGORY`] clears the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equip {
    pub character_id: u16,
    pub slot: u8,
    pub category: u8,
    pub item_index: u8,
    pub item_level: u8,
}

impl Equip {
    pub fn unequip(character_id: u16, slot: u8) -> Self {
        Self {
            character_id,
            slot,
            category: UNEQUIP_CATEGORY,
            item_index: 0,
            item_level: 0,
        }
    }

    pub fn is_unequip(&self) -> bool {
        self.category == UNEQUIP_CATEGORY
    }
}

impl PacketEncode for Equip {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.character_id);
        buf.put_slice(&[self.slot, self.category, self.item_index, self.item_level]);
    }
}

c1_message!(Equip, client::EQUIP);

/// STAT_ALLOC: spend one level-up point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatAlloc {
    pub stat_type: u8,
}

impl PacketEncode for StatAlloc {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.stat_type);
    }
}

c1_message!(StatAlloc, client::STAT_ALLOC);

/// INV_MOVE: move a bag item between slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryMove {
    pub from_slot: u8,
    pub to_slot: u8,
}

impl PacketEncode for InventoryMove {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.from_slot);
        buf.put_u8(self.to_slot);
    }
}

c1_message!(InventoryMove, client::INV_MOVE);

/// ITEM_USE: consume the item at a bag slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUse {
    pub slot: u8,
}

impl PacketEncode for ItemUse {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.slot);
    }
}

c1_message!(ItemUse, client::ITEM_USE);

/// DROP_ITEM: throw a bag item on the ground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropItem {
    pub slot: u8,
}

impl PacketEncode for DropItem {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.slot);
    }
}

c1_message!(DropItem, client::DROP_ITEM);

/// MOVE: walk to a grid cell. The path is always sent empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMove {
    pub grid_x: u8,
    pub grid_y: u8,
}

impl PacketEncode for GridMove {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.grid_x);
        buf.put_u8(self.grid_y);
        buf.put_bytes(0, 8);
    }
}

c1_message!(GridMove, client::MOVE);

/// SHOP_OPEN: ask an NPC for its sale list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopOpen {
    pub npc_type: u16,
}

impl PacketEncode for ShopOpen {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.npc_type);
    }
}

c1_message!(ShopOpen, client::SHOP_OPEN);

/// SHOP_BUY
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopBuy {
    pub def_index: DefIndex,
    pub item_level: u8,
    pub quantity: u8,
    pub target_slot: u8,
}

impl ShopBuy {
    pub fn new(def_index: DefIndex, item_level: u8, quantity: u8) -> Self {
        Self {
            def_index,
            item_level,
            quantity,
            target_slot: ANY_SLOT,
        }
    }
}

impl PacketEncode for ShopBuy {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.def_index);
        buf.put_u8(self.item_level);
        buf.put_u8(self.quantity);
        buf.put_u8(self.target_slot);
    }
}

c1_message!(ShopBuy, client::SHOP_BUY);

/// SHOP_SELL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSell {
    pub bag_slot: u8,
}

impl PacketEncode for ShopSell {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.bag_slot);
    }
}

c1_message!(ShopSell, client::SHOP_SELL);
