//! Session state: the bootstrap snapshot and the long-lived game state.

use tracing::{debug, warn};

use crate::common::resources::CharClass;
use crate::common::types::{DefIndex, Vec3};
use crate::game::hero::StatSnapshot;
use crate::game::inventory::{Equipment, Inventory};
use crate::protocol::game::character::{CharStats, StatKind, POTION_BAR_SLOTS, SKILL_BAR_SLOTS};
use crate::protocol::game::items::{DropSpawn, EquipAssignment, ShopItem};
use crate::protocol::game::packets::CharSave;
use crate::protocol::game::world::{MonsterSpawn, NpcSpawn};

pub const GROUND_ITEM_SLOTS: usize = 64;
/// Height above the terrain where dropped items rest.
pub const GROUND_ITEM_REST_HEIGHT: f32 = 100.0;

/// What the initial burst collected before the world exists.
#[derive(Debug, Clone, Default)]
pub struct ServerData {
    pub npcs: Vec<NpcSpawn>,
    pub monsters: Vec<MonsterSpawn>,
    pub equipment: Vec<EquipAssignment>,
    pub connected: bool,
}

/// Character numbers as the server last reported them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub level: u16,
    pub strength: u16,
    pub dexterity: u16,
    pub vitality: u16,
    pub energy: u16,
    pub hp: i32,
    pub max_hp: i32,
    pub mp: i32,
    pub max_mp: i32,
    pub ag: i32,
    pub max_ag: i32,
    pub experience: u64,
    pub level_up_points: u16,
    pub defense: u16,
    pub attack_speed: u16,
    pub magic_speed: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundItem {
    pub drop_index: u16,
    pub def_index: DefIndex,
    pub quantity: u8,
    pub item_level: u8,
    pub position: Vec3,
    pub active: bool,
}

impl GroundItem {
    const EMPTY: GroundItem = GroundItem {
        drop_index: 0,
        def_index: 0,
        quantity: 0,
        item_level: 0,
        position: Vec3::new(0.0, 0.0, 0.0),
        active: false,
    };
}

#[derive(Debug, Clone)]
pub struct LiveState {
    pub inventory: Inventory,
    pub equipment: Equipment,
    pub zen: u32,
    pub stats: ServerStats,
    pub learned_skills: Vec<u8>,
    pub potion_bar: [i16; POTION_BAR_SLOTS],
    /// Skill ids, -1 for an empty slot.
    pub skill_bar: [i8; SKILL_BAR_SLOTS],
    pub rmc_skill_id: u8,
    pub character_id: u16,
    pub character_name: String,
    /// Bars are taken from the first CHARSTATS only.
    pub stats_received: bool,
    pub ground_items: [GroundItem; GROUND_ITEM_SLOTS],
    /// Stock of the open shop, `None` while no shop is open.
    pub shop: Option<Vec<ShopItem>>,
    pub inventory_synced: bool,
}

impl Default for LiveState {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, u16::MAX as i32) as u16
}

impl LiveState {
    pub fn new() -> Self {
        Self {
            inventory: Inventory::new(),
            equipment: Equipment::new(),
            zen: 0,
            stats: ServerStats::default(),
            learned_skills: Vec::new(),
            potion_bar: [-1; POTION_BAR_SLOTS],
            skill_bar: [-1; SKILL_BAR_SLOTS],
            rmc_skill_id: 0,
            character_id: 0,
            character_name: String::new(),
            stats_received: false,
            ground_items: [GroundItem::EMPTY; GROUND_ITEM_SLOTS],
            shop: None,
            inventory_synced: false,
        }
    }

    /// Copy a CHARSTATS packet into the server stats.
    pub fn apply_char_stats(&mut self, packet: &CharStats) {
        self.stats = ServerStats {
            level: packet.level,
            strength: packet.strength,
            dexterity: packet.dexterity,
            vitality: packet.vitality,
            energy: packet.energy,
            hp: packet.life as i32,
            max_hp: packet.max_life as i32,
            mp: packet.mana as i32,
            max_mp: packet.max_mana as i32,
            ag: packet.ag as i32,
            max_ag: packet.max_ag as i32,
            experience: packet.experience,
            level_up_points: packet.level_up_points,
            defense: packet.defense,
            attack_speed: packet.attack_speed,
            magic_speed: packet.magic_speed,
        };
        self.character_id = packet.character_id;
        if !packet.name.is_empty() {
            self.character_name = packet.name.clone();
        }

        if !self.stats_received {
            self.potion_bar = packet.potion_bar;
            self.skill_bar = packet.skill_bar.map(|skill| skill as i8);
            self.rmc_skill_id = packet.rmc_skill_id;
            self.stats_received = true;
            debug!("Hotbars loaded for {}", self.character_name);
        }
    }

    pub fn set_stat(&mut self, kind: StatKind, value: u16) {
        match kind {
            StatKind::Strength => self.stats.strength = value,
            StatKind::Dexterity => self.stats.dexterity = value,
            StatKind::Vitality => self.stats.vitality = value,
            StatKind::Energy => self.stats.energy = value,
        }
    }

    /// Server numbers in the shape the hero loads them.
    pub fn stat_snapshot(&self, class: CharClass) -> StatSnapshot {
        StatSnapshot {
            class,
            level: self.stats.level,
            strength: self.stats.strength,
            dexterity: self.stats.dexterity,
            vitality: self.stats.vitality,
            energy: self.stats.energy,
            experience: self.stats.experience,
            level_up_points: self.stats.level_up_points,
            hp: self.stats.hp,
            max_hp: self.stats.max_hp,
            mana: self.stats.mp,
            max_mana: self.stats.max_mp,
            ag: self.stats.ag,
            max_ag: self.stats.max_ag,
        }
    }

    /// Place a drop into the first free ground slot, resting `ground_height`
    /// plus a fixed offset above the terrain.
    pub fn spawn_ground_item(&mut self, drop: &DropSpawn, ground_height: f32) -> Option<usize> {
        let Some((slot, item)) = self
            .ground_items
            .iter_mut()
            .enumerate()
            .find(|(_, item)| !item.active)
        else {
            warn!("No free ground slot for drop {}", drop.drop_index);
            return None;
        };

        *item = GroundItem {
            drop_index: drop.drop_index,
            def_index: drop.def_index,
            quantity: drop.quantity,
            item_level: drop.item_level,
            position: Vec3::new(
                drop.world_x,
                ground_height + GROUND_ITEM_REST_HEIGHT,
                drop.world_z,
            ),
            active: true,
        };
        Some(slot)
    }

    /// Deactivate every ground slot holding `drop_index`.
    pub fn remove_ground_item(&mut self, drop_index: u16) -> usize {
        let mut removed = 0;
        for item in self
            .ground_items
            .iter_mut()
            .filter(|item| item.active && item.drop_index == drop_index)
        {
            item.active = false;
            removed += 1;
        }
        removed
    }

    pub fn active_ground_items(&self) -> impl Iterator<Item = &GroundItem> {
        self.ground_items.iter().filter(|item| item.active)
    }

    pub fn open_shop(&mut self) {
        self.shop = Some(Vec::new());
    }

    pub fn close_shop(&mut self) {
        self.shop = None;
    }

    pub fn is_shop_open(&self) -> bool {
        self.shop.is_some()
    }

    /// Build the CHARSAVE for the current state.
    pub fn char_save(&self) -> CharSave {
        let stats = &self.stats;
        CharSave {
            character_id: self.character_id,
            level: stats.level,
            strength: stats.strength,
            dexterity: stats.dexterity,
            vitality: stats.vitality,
            energy: stats.energy,
            life: clamp_u16(stats.hp),
            max_life: clamp_u16(stats.max_hp),
            mana: clamp_u16(stats.mp),
            max_mana: clamp_u16(stats.max_mp),
            ag: clamp_u16(stats.ag),
            max_ag: clamp_u16(stats.max_ag),
            level_up_points: stats.level_up_points,
            experience: stats.experience,
            skill_bar: self.skill_bar,
            potion_bar: self.potion_bar,
            rmc_skill_id: self.rmc_skill_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::game::character::fixtures::sample_stats;

    fn drop(drop_index: u16) -> DropSpawn {
        DropSpawn {
            drop_index,
            def_index: 14 * 32 + 1,
            quantity: 2,
            item_level: 0,
            world_x: 1250.0,
            world_z: 800.0,
        }
    }

    #[test]
    fn test_bars_only_from_first_stats() {
        let mut state = LiveState::new();
        let mut stats = sample_stats();
        state.apply_char_stats(&stats);

        assert!(state.stats_received);
        assert_eq!(state.stats.level, 5);
        assert_eq!(state.stats.max_hp, 200);
        assert_eq!(state.skill_bar[0], 19);
        assert_eq!(state.skill_bar[1], -1);
        assert_eq!(state.potion_bar[0], 14 * 32 + 1);
        assert_eq!(state.character_id, 42);

        stats.level = 6;
        stats.skill_bar = [0xFF; SKILL_BAR_SLOTS];
        stats.potion_bar = [-1; POTION_BAR_SLOTS];
        state.apply_char_stats(&stats);
        assert_eq!(state.stats.level, 6);
        assert_eq!(state.skill_bar[0], 19);
        assert_eq!(state.potion_bar[0], 14 * 32 + 1);
    }

    #[test]
    fn test_ground_items_fill_and_remove() {
        let mut state = LiveState::new();
        assert_eq!(state.spawn_ground_item(&drop(5), 20.0), Some(0));
        assert_eq!(state.ground_items[0].position, Vec3::new(1250.0, 120.0, 800.0));

        for i in 1..GROUND_ITEM_SLOTS as u16 {
            assert!(state.spawn_ground_item(&drop(100 + i), 0.0).is_some());
        }
        assert_eq!(state.spawn_ground_item(&drop(999), 0.0), None);

        assert_eq!(state.remove_ground_item(5), 1);
        assert_eq!(state.remove_ground_item(5), 0);
        assert_eq!(state.spawn_ground_item(&drop(7), 0.0), Some(0));
        assert_eq!(state.active_ground_items().count(), GROUND_ITEM_SLOTS);
    }

    #[test]
    fn test_char_save_clamps_negative_hp() {
        let mut state = LiveState::new();
        state.apply_char_stats(&sample_stats());
        state.stats.hp = -30;
        let save = state.char_save();
        assert_eq!(save.life, 0);
        assert_eq!(save.max_life, 200);
        assert_eq!(save.experience, (1 << 32) | 0x10);
        assert_eq!(save.skill_bar[0], 19);
        assert_eq!(save.character_id, 42);
    }

    #[test]
    fn test_snapshot_carries_server_numbers() {
        let mut state = LiveState::new();
        state.apply_char_stats(&sample_stats());
        state.set_stat(StatKind::Energy, 20);
        let snapshot = state.stat_snapshot(CharClass::DarkKnight);
        assert_eq!(snapshot.energy, 20);
        assert_eq!(snapshot.hp, 150);
        assert_eq!(snapshot.max_ag, 35);
    }
}
