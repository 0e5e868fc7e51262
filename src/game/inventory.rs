//! Bag grid and equipment slots.
//!
//! The bag is an 8x8 grid. An item covering `w x h` cells has one primary
//! cell, its top-left corner, holding quantity and level. Every other cell it
//! covers is occupied but not primary. Placement and removal always work on
//! the whole footprint.

use thiserror::Error;
use tracing::{debug, info};

use crate::common::resources::{equip_slot, equip_slot_name, item_category, CharClass, EQUIP_SLOTS};
use crate::common::types::DefIndex;
use crate::game::items::{def_index, ItemCatalog, ItemDef};
use crate::game::state::ServerStats;
use crate::protocol::game::items::{EquipAssignment, InventorySync};
use crate::protocol::game::packets::Equip;

pub const BAG_COLS: usize = 8;
pub const BAG_ROWS: usize = 8;
pub const BAG_SLOTS: usize = BAG_COLS * BAG_ROWS;

/// One cell of the bag grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BagCell {
    pub def_index: DefIndex,
    pub quantity: u8,
    pub item_level: u8,
    pub occupied: bool,
    pub primary: bool,
}

impl BagCell {
    pub const EMPTY: BagCell = BagCell {
        def_index: -1,
        quantity: 0,
        item_level: 0,
        occupied: false,
        primary: false,
    };
}

impl Default for BagCell {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Which INV_SYNC layout rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Bootstrap burst: footprint cells are written without an occupancy
    /// check and cells past the right edge are dropped.
    Initial,
    /// Live traffic: known items go through [`Inventory::set_bag_item`],
    /// unknown ones take a single cell.
    Steady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    cells: [BagCell; BAG_SLOTS],
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

fn slot_of(row: usize, col: usize) -> usize {
    row * BAG_COLS + col
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            cells: [BagCell::EMPTY; BAG_SLOTS],
        }
    }

    pub fn cell(&self, slot: usize) -> Option<&BagCell> {
        self.cells.get(slot)
    }

    pub fn cells(&self) -> &[BagCell] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells = [BagCell::EMPTY; BAG_SLOTS];
    }

    /// Primary cells, one per item.
    pub fn items(&self) -> impl Iterator<Item = (usize, &BagCell)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.occupied && cell.primary)
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.occupied).count()
    }

    /// Whether `def` fits at `slot`, treating `ignore` as free.
    pub fn check_fit(
        &self,
        catalog: &ItemCatalog,
        def: DefIndex,
        slot: usize,
        ignore: Option<usize>,
    ) -> bool {
        let Some(item) = catalog.get(def) else {
            return false;
        };
        self.footprint_free(item, slot, ignore)
    }

    fn footprint_free(&self, item: &ItemDef, slot: usize, ignore: Option<usize>) -> bool {
        let (w, h) = (item.width.max(1) as usize, item.height.max(1) as usize);
        let (row, col) = (slot / BAG_COLS, slot % BAG_COLS);
        if slot >= BAG_SLOTS || col + w > BAG_COLS || row + h > BAG_ROWS {
            return false;
        }

        (0..h).all(|dy| {
            (0..w).all(|dx| {
                let s = slot_of(row + dy, col + dx);
                Some(s) == ignore || !self.cells[s].occupied
            })
        })
    }

    /// Place an item with its footprint at `slot`. Does nothing and returns
    /// false if the item is unknown, sticks out of the grid, or overlaps
    /// anything.
    pub fn set_bag_item(
        &mut self,
        catalog: &ItemCatalog,
        slot: usize,
        def: DefIndex,
        quantity: u8,
        item_level: u8,
    ) -> bool {
        let Some(item) = catalog.get(def) else {
            return false;
        };
        if !self.footprint_free(item, slot, None) {
            return false;
        }

        let (w, h) = (item.width.max(1) as usize, item.height.max(1) as usize);
        let (row, col) = (slot / BAG_COLS, slot % BAG_COLS);
        for dy in 0..h {
            for dx in 0..w {
                let primary = dx == 0 && dy == 0;
                self.cells[slot_of(row + dy, col + dx)] = BagCell {
                    def_index: def,
                    quantity: if primary { quantity } else { 0 },
                    item_level: if primary { item_level } else { 0 },
                    occupied: true,
                    primary,
                };
            }
        }
        true
    }

    /// Find the primary cell of the item covering `slot`.
    pub fn find_primary(&self, catalog: &ItemCatalog, slot: usize) -> Option<usize> {
        let cell = self.cells.get(slot)?;
        if !cell.occupied {
            return None;
        }
        if cell.primary {
            return Some(slot);
        }

        let (row, col) = (slot / BAG_COLS, slot % BAG_COLS);
        for r in (0..=row).rev() {
            for c in (0..=col).rev() {
                let s = slot_of(r, c);
                let candidate = &self.cells[s];
                if !(candidate.occupied && candidate.primary && candidate.def_index == cell.def_index)
                {
                    continue;
                }
                let (w, h) = catalog.size_of(candidate.def_index);
                if row < r + h as usize && col < c + w as usize {
                    return Some(s);
                }
            }
        }
        None
    }

    /// Remove the item covering `slot`, footprint and all. Returns the
    /// primary cell as it was.
    pub fn clear_bag_item(&mut self, catalog: &ItemCatalog, slot: usize) -> Option<BagCell> {
        let primary = self.find_primary(catalog, slot)?;
        let removed = self.cells[primary];

        let (w, h) = catalog.size_of(removed.def_index);
        let (row, col) = (primary / BAG_COLS, primary % BAG_COLS);
        for dy in 0..h as usize {
            for dx in 0..w as usize {
                if row + dy >= BAG_ROWS || col + dx >= BAG_COLS {
                    continue;
                }
                let s = slot_of(row + dy, col + dx);
                if self.cells[s].def_index == removed.def_index && (s == primary || !self.cells[s].primary) {
                    self.cells[s] = BagCell::EMPTY;
                }
            }
        }
        Some(removed)
    }

    /// Rebuild the whole grid from an INV_SYNC. Nothing from before
    /// survives. Returns how many items were placed.
    pub fn apply_full_sync(
        &mut self,
        catalog: &ItemCatalog,
        sync: &InventorySync,
        mode: SyncMode,
    ) -> usize {
        self.clear();

        let mut placed = 0;
        for record in &sync.items {
            let slot = record.slot as usize;
            if slot >= BAG_SLOTS {
                debug!("Inventory record for slot {} out of range, skipped", slot);
                continue;
            }
            let def = record.def_index();

            match mode {
                SyncMode::Initial => {
                    self.write_footprint_unchecked(catalog, slot, def, record.quantity, record.item_level);
                    placed += 1;
                }
                SyncMode::Steady => {
                    if catalog.get(def).is_some() {
                        if self.set_bag_item(catalog, slot, def, record.quantity, record.item_level) {
                            placed += 1;
                        } else {
                            debug!("Item {} does not fit at slot {}", def, slot);
                        }
                    } else {
                        self.cells[slot] = BagCell {
                            def_index: def,
                            quantity: record.quantity,
                            item_level: record.item_level,
                            occupied: true,
                            primary: true,
                        };
                        placed += 1;
                    }
                }
            }
        }
        placed
    }

    fn write_footprint_unchecked(
        &mut self,
        catalog: &ItemCatalog,
        slot: usize,
        def: DefIndex,
        quantity: u8,
        item_level: u8,
    ) {
        self.cells[slot] = BagCell {
            def_index: def,
            quantity,
            item_level,
            occupied: true,
            primary: true,
        };

        let (w, h) = catalog.size_of(def);
        let (row, col) = (slot / BAG_COLS, slot % BAG_COLS);
        for dy in 0..h as usize {
            for dx in 0..w as usize {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let s = slot_of(row + dy, col + dx);
                // Overflow cells past the right edge or the bottom are dropped.
                if col + dx >= BAG_COLS || s >= BAG_SLOTS {
                    continue;
                }
                self.cells[s] = BagCell {
                    def_index: def,
                    quantity: 0,
                    item_level: 0,
                    occupied: true,
                    primary: false,
                };
            }
        }
    }
}

/// One equipment slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipSlot {
    pub category: u8,
    pub item_index: u8,
    pub item_level: u8,
    pub model: String,
    pub equipped: bool,
}

impl EquipSlot {
    pub fn empty() -> Self {
        Self {
            category: item_category::NONE,
            item_index: 0,
            item_level: 0,
            model: String::new(),
            equipped: false,
        }
    }

    pub fn def_index(&self) -> Option<DefIndex> {
        self.equipped
            .then(|| def_index(self.category, self.item_index))
    }
}

impl Default for EquipSlot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Why an item may not go into a slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EquipRejection {
    #[error("inventory has not been synced yet")]
    NotSynced,
    #[error("no equipment slot {0}")]
    NoSuchSlot(u8),
    #[error("bag slot {0} is empty")]
    EmptyBagSlot(usize),
    #[error("unknown item {0}")]
    UnknownItem(DefIndex),
    #[error("category {category} cannot go in slot {slot}")]
    WrongSlot { slot: u8, category: u8 },
    #[error("shields cannot go in the right hand")]
    ShieldInRightHand,
    #[error("this class cannot dual-wield")]
    DualWieldNotAllowed,
    #[error("two-handed weapons cannot go in the left hand")]
    TwoHandedInLeftHand,
    #[error("level {have} is below the required {need}")]
    LevelTooLow { have: u16, need: u16 },
    #[error("{stat} {have} is below the required {need}")]
    StatTooLow {
        stat: &'static str,
        have: u16,
        need: u16,
    },
    #[error("item cannot be used by {0}")]
    ClassNotAllowed(&'static str),
}

/// Check that an item of `category`/`index` may be placed in `slot`.
pub fn equip_validity(
    slot: u8,
    category: u8,
    index: u8,
    class: CharClass,
    two_handed: bool,
) -> Result<(), EquipRejection> {
    use item_category as cat;

    if slot == equip_slot::RIGHT_HAND && category == cat::SHIELD {
        return Err(EquipRejection::ShieldInRightHand);
    }

    let accepted = match slot {
        equip_slot::RIGHT_HAND => category <= cat::STAFF,
        equip_slot::LEFT_HAND => category <= cat::SHIELD,
        equip_slot::HELM => category == cat::HELM,
        equip_slot::ARMOR => category == cat::ARMOR,
        equip_slot::PANTS => category == cat::PANTS,
        equip_slot::GLOVES => category == cat::GLOVES,
        equip_slot::BOOTS => category == cat::BOOTS,
        equip_slot::WINGS => category == cat::WINGS && index <= 6,
        equip_slot::PET => category == cat::ACCESSORY && index <= 3,
        equip_slot::PENDANT => category == cat::ACCESSORY && (8..=13).contains(&index),
        equip_slot::RING_1 | equip_slot::RING_2 => {
            category == cat::ACCESSORY && (20..=25).contains(&index)
        }
        _ => return Err(EquipRejection::NoSuchSlot(slot)),
    };
    if !accepted {
        return Err(EquipRejection::WrongSlot { slot, category });
    }

    if slot == equip_slot::LEFT_HAND && category <= cat::STAFF {
        if !class.can_dual_wield() {
            return Err(EquipRejection::DualWieldNotAllowed);
        }
        if two_handed {
            return Err(EquipRejection::TwoHandedInLeftHand);
        }
    }
    Ok(())
}

/// Check level, attribute and class requirements.
pub fn can_equip(def: &ItemDef, stats: &ServerStats, class: CharClass) -> Result<(), EquipRejection> {
    if stats.level < def.level_req {
        return Err(EquipRejection::LevelTooLow {
            have: stats.level,
            need: def.level_req,
        });
    }

    for (stat, have, need) in [
        ("Strength", stats.strength, def.req_strength),
        ("Dexterity", stats.dexterity, def.req_dexterity),
        ("Vitality", stats.vitality, def.req_vitality),
        ("Energy", stats.energy, def.req_energy),
    ] {
        if have < need {
            return Err(EquipRejection::StatTooLow { stat, have, need });
        }
    }

    if !def.allows_class(class) {
        return Err(EquipRejection::ClassNotAllowed(class.name()));
    }
    Ok(())
}

/// Who is putting the item on.
#[derive(Debug, Clone, Copy)]
pub struct Wearer<'a> {
    pub stats: &'a ServerStats,
    pub class: CharClass,
    pub character_id: u16,
}

/// Damage and defense granted by everything worn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipBonus {
    pub damage_min: i32,
    pub damage_max: i32,
    pub defense: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equipment {
    slots: [EquipSlot; EQUIP_SLOTS],
}

impl Default for Equipment {
    fn default() -> Self {
        Self::new()
    }
}

impl Equipment {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| EquipSlot::empty()),
        }
    }

    pub fn slot(&self, slot: u8) -> Option<&EquipSlot> {
        self.slots.get(slot as usize)
    }

    pub fn slots(&self) -> &[EquipSlot] {
        &self.slots
    }

    /// Apply one server equipment entry. Slots past the end are ignored.
    pub fn apply(&mut self, entry: &EquipAssignment) -> bool {
        let Some(slot) = self.slots.get_mut(entry.slot as usize) else {
            debug!("Equipment entry for slot {} ignored", entry.slot);
            return false;
        };
        *slot = EquipSlot {
            category: entry.category,
            item_index: entry.item_index,
            item_level: entry.item_level,
            model: entry.model.clone(),
            equipped: entry.category != item_category::NONE,
        };
        true
    }

    pub fn unequip(&mut self, slot: u8) -> Option<EquipSlot> {
        let current = self.slots.get_mut(slot as usize)?;
        if !current.equipped {
            return None;
        }
        Some(std::mem::take(current))
    }

    pub fn bonuses(&self, catalog: &ItemCatalog) -> EquipBonus {
        self.slots
            .iter()
            .filter_map(|slot| slot.def_index().and_then(|def| catalog.get(def)))
            .fold(EquipBonus::default(), |acc, def| EquipBonus {
                damage_min: acc.damage_min + def.damage_min as i32,
                damage_max: acc.damage_max + def.damage_max as i32,
                defense: acc.defense + def.defense as i32,
            })
    }

    /// Move the item at `bag_slot` into equipment slot `slot`.
    ///
    /// Whatever was worn there goes back to the vacated bag cell. A
    /// two-handed weapon in the right hand pushes the left-hand item off.
    /// Returns the messages to send, unequips first.
    pub fn equip_from_bag(
        &mut self,
        bag: &mut Inventory,
        catalog: &ItemCatalog,
        wearer: Wearer<'_>,
        bag_slot: usize,
        slot: u8,
    ) -> Result<Vec<Equip>, EquipRejection> {
        if slot as usize >= EQUIP_SLOTS {
            return Err(EquipRejection::NoSuchSlot(slot));
        }
        let primary = bag
            .find_primary(catalog, bag_slot)
            .ok_or(EquipRejection::EmptyBagSlot(bag_slot))?;
        let cell = bag.cells[primary];
        let def = catalog
            .get(cell.def_index)
            .ok_or(EquipRejection::UnknownItem(cell.def_index))?;

        can_equip(def, wearer.stats, wearer.class)?;
        equip_validity(slot, def.category, def.item_index, wearer.class, def.two_handed)?;

        let mut messages = Vec::new();
        let swapped = self.slots[slot as usize].clone();

        if slot == equip_slot::RIGHT_HAND && def.two_handed && self.slots[1].equipped {
            info!("Two-handed weapon equipped, clearing left hand");
            messages.push(Equip::unequip(wearer.character_id, equip_slot::LEFT_HAND));
            self.slots[1] = EquipSlot::empty();
        }

        self.slots[slot as usize] = EquipSlot {
            category: def.category,
            item_index: def.item_index,
            item_level: cell.item_level,
            model: def.model.clone(),
            equipped: true,
        };
        messages.push(Equip {
            character_id: wearer.character_id,
            slot,
            category: def.category,
            item_index: def.item_index,
            item_level: cell.item_level,
        });

        bag.clear_bag_item(catalog, primary);
        if let Some(old) = swapped.def_index() {
            if !bag.set_bag_item(catalog, primary, old, 1, swapped.item_level) {
                debug!("Swapped item {} does not fit back at {}", old, primary);
            }
        }

        info!(
            "Equipped {} from bag {} into {}",
            def.name,
            primary,
            equip_slot_name(slot)
        );
        Ok(messages)
    }
}
