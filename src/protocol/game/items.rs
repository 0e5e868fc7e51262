//! Inventory, equipment, ground drop and shop packets.

use crate::common::error::ProtocolError;
use crate::common::types::DefIndex;
use crate::protocol::packets::{decode_fixed, FrameKind, Packet, PacketDecode};

const INVENTORY_ENTRY_SIZE: usize = 5;
const EQUIPMENT_ENTRY_SIZE: usize = 36;
const MODEL_NAME_LEN: usize = 32;
const SHOP_ENTRY_SIZE: usize = 7;

/// One item record from an inventory sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryRecord {
    pub slot: u8,
    pub category: u8,
    pub item_index: u8,
    pub quantity: u8,
    pub item_level: u8,
}

impl InventoryRecord {
    /// Composite definition key, `category * 32 + index`.
    pub fn def_index(&self) -> DefIndex {
        self.category as DefIndex * 32 + self.item_index as DefIndex
    }
}

/// INV_SYNC: the complete bag contents and zen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySync {
    pub zen: u32,
    pub items: Vec<InventoryRecord>,
}

/// Decode INV_SYNC. The zen and count header must be present; item records
/// past a truncation are dropped.
pub fn decode_inventory_sync(packet: &Packet) -> Option<InventorySync> {
    let reader = packet.reader();
    let zen = reader.u32_le(4)?;
    let count = reader.u8(8)? as usize;

    let items = reader
        .entries(9, count, INVENTORY_ENTRY_SIZE)
        .filter_map(|entry| {
            Some(InventoryRecord {
                slot: entry.u8(0)?,
                category: entry.u8(1)?,
                item_index: entry.u8(2)?,
                quantity: entry.u8(3)?,
                item_level: entry.u8(4)?,
            })
        })
        .collect();

    Some(InventorySync { zen, items })
}

/// One equipped item from an EQUIPMENT packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipAssignment {
    pub slot: u8,
    pub category: u8,
    pub item_index: u8,
    pub item_level: u8,
    pub model: String,
}

/// Parse 36-byte equipment entries with the count and data at the given
/// offsets.
fn parse_equipment(packet: &Packet, count_off: usize, data_off: usize) -> Vec<EquipAssignment> {
    let reader = packet.reader();
    let count = reader.u8(count_off).unwrap_or(0) as usize;

    reader
        .entries(data_off, count, EQUIPMENT_ENTRY_SIZE)
        .filter_map(|entry| {
            Some(EquipAssignment {
                slot: entry.u8(0)?,
                category: entry.u8(1)?,
                item_index: entry.u8(2)?,
                item_level: entry.u8(3)?,
                model: entry.fixed_str(4, MODEL_NAME_LEN)?,
            })
        })
        .collect()
}

/// Decode EQUIPMENT in either header form.
pub fn decode_equipment(packet: &Packet) -> Vec<EquipAssignment> {
    match packet.kind {
        FrameKind::C1 | FrameKind::C3 => parse_equipment(packet, 3, 4),
        FrameKind::C2 | FrameKind::C4 => parse_equipment(packet, 4, 5),
    }
}

/// DROP_SPAWN: an item or zen pile appeared on the ground.
#[derive(Debug, Clone, PartialEq)]
pub struct DropSpawn {
    pub drop_index: u16,
    /// -1 for zen.
    pub def_index: DefIndex,
    pub quantity: u8,
    pub item_level: u8,
    pub world_x: f32,
    pub world_z: f32,
}

impl PacketDecode for DropSpawn {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 17, |r| {
            Some(Self {
                drop_index: r.u16_le(3)?,
                def_index: r.i16_le(5)?,
                quantity: r.u8(7)?,
                item_level: r.u8(8)?,
                world_x: r.f32_le(9)?,
                world_z: r.f32_le(13)?,
            })
        })
    }
}

/// PICKUP_RESULT: answer to a pickup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupResult {
    pub drop_index: u16,
    pub success: bool,
    pub def_index: DefIndex,
    pub quantity: u8,
    pub item_level: u8,
}

impl PacketDecode for PickupResult {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 10, |r| {
            Some(Self {
                drop_index: r.u16_le(3)?,
                success: r.u8(5)? != 0,
                def_index: r.i16_le(6)?,
                quantity: r.u8(8)?,
                item_level: r.u8(9)?,
            })
        })
    }
}

/// DROP_REMOVE: a ground item despawned or was taken by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRemove {
    pub drop_index: u16,
}

impl PacketDecode for DropRemove {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 5, |r| {
            Some(Self {
                drop_index: r.u16_le(3)?,
            })
        })
    }
}

/// One entry of a SHOP_LIST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShopItem {
    pub def_index: DefIndex,
    pub item_level: u8,
    pub buy_price: u32,
}

/// Decode a C2 SHOP_LIST.
pub fn decode_shop_list(packet: &Packet) -> Vec<ShopItem> {
    let reader = packet.reader();
    let count = reader.u8(4).unwrap_or(0) as usize;

    reader
        .entries(5, count, SHOP_ENTRY_SIZE)
        .filter_map(|entry| {
            Some(ShopItem {
                def_index: entry.i16_le(0)?,
                item_level: entry.u8(2)?,
                buy_price: entry.u32_le(3)?,
            })
        })
        .collect()
}

/// SHOP_BUY_RESULT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopBuyResult {
    pub success: bool,
    pub def_index: DefIndex,
    pub quantity: u8,
}

impl PacketDecode for ShopBuyResult {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 7, |r| {
            Some(Self {
                success: r.u8(3)? != 0,
                def_index: r.i16_le(4)?,
                quantity: r.u8(6)?,
            })
        })
    }
}

/// SHOP_SELL_RESULT. `zen` is the new total after the sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSellResult {
    pub success: bool,
    pub bag_slot: u8,
    pub zen: u32,
}

impl PacketDecode for ShopSellResult {
    type Error = ProtocolError;

    fn decode(packet: &Packet) -> Result<Self, Self::Error> {
        decode_fixed(packet, 9, |r| {
            Some(Self {
                success: r.u8(3)? != 0,
                bag_slot: r.u8(4)?,
                zen: r.u32_le(5)?,
            })
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::protocol::packets::opcodes::server;
    use hex_literal::hex;

    #[test]
    fn test_inventory_sync_decode() {
        let packet = inventory_sync_packet(1500, &[record(0, 0, 1, 1), record(12, 14, 1, 3)]);
        let sync = decode_inventory_sync(&packet).unwrap();
        assert_eq!(sync.zen, 1500);
        assert_eq!(sync.items.len(), 2);
        assert_eq!(sync.items[1].def_index(), 14 * 32 + 1);
        assert_eq!(sync.items[1].quantity, 3);
    }

    #[test]
    fn test_inventory_sync_truncated_records() {
        let packet = inventory_sync_packet(0, &[record(0, 0, 1, 1), record(4, 0, 2, 1)]);
        let short = Packet::from_frame(packet.raw.slice(..packet.len() - 2)).unwrap();
        let sync = decode_inventory_sync(&short).unwrap();
        assert_eq!(sync.items, vec![record(0, 0, 1, 1)]);
    }

    #[test]
    fn test_inventory_sync_missing_header() {
        let packet = Packet::c2(server::INV_SYNC, &hex!("10 00"));
        assert!(decode_inventory_sync(&packet).is_none());
    }

    #[test]
    fn test_equipment_same_entries_in_both_forms() {
        let items = vec![
            assignment(0, 0, 1, "Sword02"),
            assignment(8, 8, 2, "ArmorMale03"),
        ];
        assert_eq!(decode_equipment(&equipment_packet_c1(&items)), items);
        assert_eq!(decode_equipment(&equipment_packet_c2(&items)), items);
    }

    #[test]
    fn test_equipment_truncated_entry_dropped() {
        let items = vec![assignment(0, 0, 1, "Sword02"), assignment(1, 6, 0, "Shield01")];
        let packet = equipment_packet_c1(&items);
        let short = Packet::from_frame(packet.raw.slice(..packet.len() - 1)).unwrap();
        assert_eq!(decode_equipment(&short), vec![items[0].clone()]);
    }

    #[test]
    fn test_drop_spawn_decode() {
        let mut body = hex!("09 00 FF FF 00 00").to_vec();
        body.extend_from_slice(&1250.0f32.to_le_bytes());
        body.extend_from_slice(&3300.5f32.to_le_bytes());
        let drop = DropSpawn::decode(&Packet::c1(server::DROP_SPAWN, &body)).unwrap();
        assert_eq!(drop.drop_index, 9);
        assert_eq!(drop.def_index, -1);
        assert_eq!(drop.world_x, 1250.0);
        assert_eq!(drop.world_z, 3300.5);
    }

    #[test]
    fn test_pickup_and_remove() {
        let pickup =
            PickupResult::decode(&Packet::c1(server::PICKUP_RESULT, &hex!("09 00 01 C1 01 02 00")))
                .unwrap();
        assert!(pickup.success);
        assert_eq!(pickup.def_index, 0x01C1);
        assert_eq!(pickup.quantity, 2);

        let remove = DropRemove::decode(&Packet::c1(server::DROP_REMOVE, &hex!("09 00"))).unwrap();
        assert_eq!(remove.drop_index, 9);
    }

    #[test]
    fn test_shop_packets() {
        let list = decode_shop_list(&Packet::c2(
            server::SHOP_LIST,
            &hex!("02 01 00 00 64 00 00 00 C1 01 00 14 00 00 00"),
        ));
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].buy_price, 100);
        assert_eq!(list[1].def_index, 0x01C1);

        let buy = ShopBuyResult::decode(&Packet::c1(server::SHOP_BUY_RESULT, &hex!("01 01 00 01")))
            .unwrap();
        assert!(buy.success);

        let sell =
            ShopSellResult::decode(&Packet::c1(server::SHOP_SELL_RESULT, &hex!("01 05 10 27 00 00")))
                .unwrap();
        assert_eq!(sell.bag_slot, 5);
        assert_eq!(sell.zen, 10000);
    }
}
