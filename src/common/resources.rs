//! Static game resources: character classes, equipment slot names.

/// Character base classes. The wire value is the class code sent in
/// CHARSTATS; the base class is the code shifted right by four.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CharClass {
    DarkWizard = 0,
    DarkKnight = 16,
    FairyElf = 32,
    MagicGladiator = 48,
}

/// Base attributes a freshly created character starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartingStats {
    pub strength: u16,
    pub dexterity: u16,
    pub vitality: u16,
    pub energy: u16,
    pub life: u16,
    pub mana: u16,
}

impl CharClass {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::DarkWizard),
            16 => Some(Self::DarkKnight),
            32 => Some(Self::FairyElf),
            48 => Some(Self::MagicGladiator),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Index used for item class-permission bit masks.
    pub fn base_index(self) -> u8 {
        self.code() >> 4
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DarkWizard => "Dark Wizard",
            Self::DarkKnight => "Dark Knight",
            Self::FairyElf => "Fairy Elf",
            Self::MagicGladiator => "Magic Gladiator",
        }
    }

    /// Whether this class may hold a weapon in the left hand.
    pub fn can_dual_wield(self) -> bool {
        matches!(self, Self::DarkKnight | Self::MagicGladiator)
    }

    /// Dark Knights spend AG on skills, everyone else spends mana.
    pub fn uses_ag(self) -> bool {
        self == Self::DarkKnight
    }

    pub fn starting_stats(self) -> StartingStats {
        let (strength, dexterity, vitality, energy, life, mana) = match self {
            Self::DarkWizard => (18, 18, 15, 30, 60, 60),
            Self::DarkKnight => (28, 20, 25, 10, 110, 20),
            Self::FairyElf => (22, 25, 20, 15, 80, 30),
            Self::MagicGladiator => (26, 26, 26, 26, 110, 60),
        };
        StartingStats {
            strength,
            dexterity,
            vitality,
            energy,
            life,
            mana,
        }
    }
}

/// Number of equipment slots.
pub const EQUIP_SLOTS: usize = 12;

/// Equipment slot indices as used on the wire.
pub mod equip_slot {
    pub const RIGHT_HAND: u8 = 0;
    pub const LEFT_HAND: u8 = 1;
    pub const HELM: u8 = 2;
    pub const ARMOR: u8 = 3;
    pub const PANTS: u8 = 4;
    pub const GLOVES: u8 = 5;
    pub const BOOTS: u8 = 6;
    pub const WINGS: u8 = 7;
    pub const PET: u8 = 8;
    pub const PENDANT: u8 = 9;
    pub const RING_1: u8 = 10;
    pub const RING_2: u8 = 11;
}

/// Item categories referenced by equip rules.
pub mod item_category {
    pub const BOW: u8 = 4;
    pub const STAFF: u8 = 5;
    pub const SHIELD: u8 = 6;
    pub const HELM: u8 = 7;
    pub const ARMOR: u8 = 8;
    pub const PANTS: u8 = 9;
    pub const GLOVES: u8 = 10;
    pub const BOOTS: u8 = 11;
    pub const WINGS: u8 = 12;
    pub const ACCESSORY: u8 = 13;
    /// Marks an empty equipment slot.
    pub const NONE: u8 = 0xFF;
}

pub fn equip_slot_name(slot: u8) -> &'static str {
    const NAMES: [&str; EQUIP_SLOTS] = [
        "R.Hand", "L.Hand", "Helm", "Armor", "Pants", "Gloves", "Boots", "Wings", "Pet",
        "Pendant", "Ring 1", "Ring 2",
    ];
    NAMES.get(slot as usize).copied().unwrap_or("???")
}

/// Body part index (helm..boots) for an armor category.
pub fn body_part_index(category: u8) -> Option<usize> {
    match category {
        item_category::HELM..=item_category::BOOTS => {
            Some((category - item_category::HELM) as usize)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_codes_round_trip() {
        for class in [
            CharClass::DarkWizard,
            CharClass::DarkKnight,
            CharClass::FairyElf,
            CharClass::MagicGladiator,
        ] {
            assert_eq!(CharClass::from_id(class.code()), Some(class));
        }
        assert_eq!(CharClass::from_id(1), None);
        assert_eq!(CharClass::MagicGladiator.base_index(), 3);
    }

    #[test]
    fn test_starting_stats() {
        let dk = CharClass::DarkKnight.starting_stats();
        assert_eq!(dk.strength, 28);
        assert_eq!(dk.life, 110);
        assert_eq!(CharClass::DarkWizard.starting_stats().energy, 30);
    }

    #[test]
    fn test_body_part_index() {
        assert_eq!(body_part_index(item_category::HELM), Some(0));
        assert_eq!(body_part_index(item_category::BOOTS), Some(4));
        assert_eq!(body_part_index(item_category::SHIELD), None);
        assert_eq!(body_part_index(item_category::NONE), None);
    }

    #[test]
    fn test_slot_names() {
        assert_eq!(equip_slot_name(equip_slot::LEFT_HAND), "L.Hand");
        assert_eq!(equip_slot_name(12), "???");
    }
}
