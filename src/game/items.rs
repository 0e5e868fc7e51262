//! Item definitions, keyed by `category * 32 + index`.
//!
//! The built-in table covers the starter gear, shop stock and potions. A JSON
//! file named in the config can add or replace entries.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::common::error::ConfigError;
use crate::common::resources::{item_category, CharClass};
use crate::common::types::DefIndex;

/// Static properties of one item kind.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ItemDef {
    pub category: u8,
    pub item_index: u8,
    pub name: String,
    pub model: String,
    pub width: u8,
    pub height: u8,
    pub req_strength: u16,
    pub req_dexterity: u16,
    pub req_vitality: u16,
    pub req_energy: u16,
    pub level_req: u16,
    /// Bit `n` allows base class `n` (class code >> 4).
    pub class_flags: u32,
    pub damage_min: u16,
    pub damage_max: u16,
    pub defense: u16,
    pub attack_speed: u8,
    pub two_handed: bool,
    pub buy_price: u32,
}

impl Default for ItemDef {
    fn default() -> Self {
        Self {
            category: 0,
            item_index: 0,
            name: String::new(),
            model: String::new(),
            width: 1,
            height: 1,
            req_strength: 0,
            req_dexterity: 0,
            req_vitality: 0,
            req_energy: 0,
            level_req: 0,
            class_flags: u32::MAX,
            damage_min: 0,
            damage_max: 0,
            defense: 0,
            attack_speed: 0,
            two_handed: false,
            buy_price: 0,
        }
    }
}

impl ItemDef {
    pub fn def_index(&self) -> DefIndex {
        def_index(self.category, self.item_index)
    }

    pub fn allows_class(&self, class: CharClass) -> bool {
        self.class_flags & (1 << class.base_index()) != 0
    }

    pub fn is_weapon(&self) -> bool {
        self.category <= item_category::STAFF
    }

    /// Shop price when the definition does not carry one.
    fn default_price(&self) -> u32 {
        let level = self.level_req as u32;
        match self.category {
            0..=5 => level * 100 + self.damage_max as u32 * 20,
            6..=11 => level * 80 + self.defense as u32 * 30,
            12 if self.item_index <= 6 => 50_000,
            12 => level * 200,
            13 => level * 300,
            14 => match self.item_index {
                0 => 20,
                1 => 80,
                2 => 300,
                3 => 1000,
                4 => 120,
                5 => 450,
                6 => 1500,
                _ => 100,
            },
            _ => 0,
        }
    }
}

pub fn def_index(category: u8, item_index: u8) -> DefIndex {
    category as DefIndex * 32 + item_index as DefIndex
}

#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    defs: HashMap<DefIndex, ItemDef>,
}

impl ItemCatalog {
    /// An empty catalog. Unknown items fall back to a 1x1 footprint.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in definitions.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for def in builtin_defs() {
            catalog.insert(def);
        }
        catalog
    }

    /// Built-in definitions, then the JSON file at `path` layered on top.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut catalog = Self::builtin();
        if let Some(path) = path {
            let added = catalog.merge_json_file(path)?;
            info!("Loaded {} item definitions from {}", added, path);
        }
        Ok(catalog)
    }

    pub fn merge_json_file(&mut self, path: impl AsRef<Path>) -> Result<usize, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        self.merge_json_str(&content)
    }

    /// Merge a JSON array of definitions. Returns how many were read.
    pub fn merge_json_str(&mut self, content: &str) -> Result<usize, ConfigError> {
        let defs: Vec<ItemDef> =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
                message: format!("item catalog: {}", e),
            })?;
        let count = defs.len();
        for def in defs {
            self.insert(def);
        }
        Ok(count)
    }

    pub fn insert(&mut self, mut def: ItemDef) {
        if def.buy_price == 0 {
            def.buy_price = def.default_price();
        }
        debug!("Item {} = {}", def.def_index(), def.name);
        self.defs.insert(def.def_index(), def);
    }

    pub fn get(&self, def_index: DefIndex) -> Option<&ItemDef> {
        self.defs.get(&def_index)
    }

    pub fn get_by(&self, category: u8, item_index: u8) -> Option<&ItemDef> {
        self.get(def_index(category, item_index))
    }

    /// Footprint in bag cells, 1x1 for unknown items.
    pub fn size_of(&self, def_index: DefIndex) -> (u8, u8) {
        self.get(def_index)
            .map(|def| (def.width.max(1), def.height.max(1)))
            .unwrap_or((1, 1))
    }

    pub fn name_of(&self, def_index: DefIndex) -> &str {
        if def_index == -1 {
            return "Zen";
        }
        self.get(def_index).map(|def| def.name.as_str()).unwrap_or("Unknown Item")
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }
}

struct Seed {
    cat: u8,
    idx: u8,
    name: &'static str,
    model: &'static str,
    size: (u8, u8),
    /// str, dex, vit, ene
    reqs: [u16; 4],
    level: u16,
    classes: u32,
    damage: (u16, u16),
    defense: u16,
    speed: u8,
    two_handed: bool,
}

const fn weapon(
    cat: u8,
    idx: u8,
    name: &'static str,
    model: &'static str,
    size: (u8, u8),
    reqs: [u16; 4],
    level: u16,
    classes: u32,
    damage: (u16, u16),
    speed: u8,
    two_handed: bool,
) -> Seed {
    Seed {
        cat,
        idx,
        name,
        model,
        size,
        reqs,
        level,
        classes,
        damage,
        defense: 0,
        speed,
        two_handed,
    }
}

const fn armor(
    cat: u8,
    idx: u8,
    name: &'static str,
    model: &'static str,
    size: (u8, u8),
    reqs: [u16; 4],
    level: u16,
    classes: u32,
    defense: u16,
) -> Seed {
    Seed {
        cat,
        idx,
        name,
        model,
        size,
        reqs,
        level,
        classes,
        damage: (0, 0),
        defense,
        speed: 0,
        two_handed: false,
    }
}

const fn misc(cat: u8, idx: u8, name: &'static str, model: &'static str, size: (u8, u8), level: u16, classes: u32) -> Seed {
    armor(cat, idx, name, model, size, [0; 4], level, classes, 0)
}

const SEEDS: &[Seed] = &[
    weapon(0, 0, "Kris", "Sword01.bmd", (1, 2), [10, 8, 0, 0], 1, 11, (6, 11), 50, false),
    weapon(0, 1, "Short Sword", "Sword02.bmd", (1, 3), [20, 0, 0, 0], 1, 7, (3, 7), 20, false),
    weapon(0, 2, "Rapier", "Sword03.bmd", (1, 3), [50, 40, 0, 0], 9, 6, (9, 15), 40, false),
    weapon(0, 3, "Katana", "Sword04.bmd", (1, 3), [80, 40, 0, 0], 16, 2, (16, 26), 35, false),
    weapon(0, 5, "Blade", "Sword06.bmd", (1, 3), [80, 50, 0, 0], 36, 7, (36, 47), 30, false),
    weapon(0, 9, "Sword of Salamander", "Sword10.bmd", (2, 3), [103, 0, 0, 0], 32, 2, (32, 46), 30, true),
    weapon(0, 10, "Light Saber", "Sword11.bmd", (2, 4), [80, 60, 0, 0], 40, 6, (47, 61), 25, true),
    weapon(0, 15, "Giant Sword", "Sword16.bmd", (2, 3), [140, 0, 0, 0], 52, 2, (60, 85), 20, true),
    weapon(1, 0, "Small Axe", "Axe01.bmd", (1, 3), [20, 0, 0, 0], 1, 7, (1, 6), 20, false),
    weapon(2, 0, "Mace", "Mace01.bmd", (1, 3), [100, 0, 0, 0], 7, 2, (7, 13), 15, false),
    weapon(4, 0, "Short Bow", "Bow01.bmd", (2, 3), [20, 80, 0, 0], 2, 4, (3, 5), 30, true),
    weapon(4, 1, "Bow", "Bow02.bmd", (2, 3), [30, 90, 0, 0], 8, 4, (9, 13), 30, true),
    weapon(4, 8, "Crossbow", "CrossBow01.bmd", (2, 2), [20, 90, 0, 0], 4, 4, (5, 8), 40, false),
    weapon(5, 0, "Skull Staff", "Staff01.bmd", (1, 3), [40, 0, 0, 0], 6, 1, (3, 4), 20, false),
    armor(6, 0, "Small Shield", "Shield01.bmd", (2, 2), [70, 0, 0, 0], 3, 15, 3),
    armor(6, 1, "Horn Shield", "Shield02.bmd", (2, 2), [100, 0, 0, 0], 9, 2, 9),
    armor(6, 4, "Buckler", "Shield05.bmd", (2, 2), [80, 0, 0, 0], 6, 15, 6),
    armor(7, 0, "Bronze Helm", "HelmMale01.bmd", (2, 2), [25, 20, 0, 0], 1, 2, 34),
    armor(7, 5, "Leather Helm", "HelmMale06.bmd", (2, 2), [20, 0, 0, 0], 1, 2, 30),
    armor(8, 0, "Bronze Armor", "ArmorMale01.bmd", (2, 2), [25, 20, 0, 0], 1, 2, 34),
    armor(8, 5, "Leather Armor", "ArmorMale06.bmd", (2, 3), [20, 0, 0, 0], 1, 2, 30),
    armor(9, 0, "Bronze Pants", "PantMale01.bmd", (2, 2), [25, 20, 0, 0], 1, 2, 34),
    armor(9, 5, "Leather Pants", "PantMale06.bmd", (2, 2), [20, 0, 0, 0], 1, 2, 30),
    armor(10, 0, "Bronze Gloves", "GloveMale01.bmd", (2, 2), [25, 20, 0, 0], 1, 2, 34),
    armor(10, 5, "Leather Gloves", "GloveMale06.bmd", (2, 2), [20, 0, 0, 0], 1, 2, 30),
    armor(11, 0, "Bronze Boots", "BootMale01.bmd", (2, 2), [25, 20, 0, 0], 1, 2, 34),
    armor(11, 5, "Leather Boots", "BootMale06.bmd", (2, 2), [20, 0, 0, 0], 1, 2, 30),
    misc(12, 0, "Wings of Elf", "Wing01.bmd", (3, 2), 100, 4),
    misc(12, 2, "Wings of Satan", "Wing03.bmd", (3, 2), 100, 2),
    misc(13, 0, "Guardian Angel", "Helper01.bmd", (1, 1), 23, 15),
    misc(13, 8, "Ring of Ice", "Ring01.bmd", (1, 1), 20, 15),
    misc(13, 9, "Ring of Poison", "Ring02.bmd", (1, 1), 17, 15),
    misc(13, 12, "Pendant of Lighting", "Necklace01.bmd", (1, 1), 21, 15),
    misc(14, 0, "Apple", "Potion01.bmd", (1, 1), 0, 15),
    misc(14, 1, "Small HP Potion", "Potion02.bmd", (1, 1), 0, 15),
    misc(14, 2, "Medium HP Potion", "Potion03.bmd", (1, 1), 0, 15),
    misc(14, 3, "Large HP Potion", "Potion04.bmd", (1, 1), 0, 15),
    misc(14, 4, "Small Mana Potion", "Potion05.bmd", (1, 1), 0, 15),
    misc(14, 5, "Medium Mana Potion", "Potion06.bmd", (1, 1), 0, 15),
    misc(14, 6, "Large Mana Potion", "Potion07.bmd", (1, 1), 0, 15),
    misc(14, 13, "Jewel of Bless", "Jewel01.bmd", (1, 1), 0, 15),
    misc(14, 14, "Jewel of Soul", "Jewel02.bmd", (1, 1), 0, 15),
];

fn builtin_defs() -> impl Iterator<Item = ItemDef> {
    SEEDS.iter().map(|seed| ItemDef {
        category: seed.cat,
        item_index: seed.idx,
        name: seed.name.to_string(),
        model: seed.model.to_string(),
        width: seed.size.0,
        height: seed.size.1,
        req_strength: seed.reqs[0],
        req_dexterity: seed.reqs[1],
        req_vitality: seed.reqs[2],
        req_energy: seed.reqs[3],
        level_req: seed.level,
        class_flags: seed.classes,
        damage_min: seed.damage.0,
        damage_max: seed.damage.1,
        defense: seed.defense,
        attack_speed: seed.speed,
        two_handed: seed.two_handed,
        buy_price: 0,
    })
}
