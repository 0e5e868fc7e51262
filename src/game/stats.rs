//! Character stat formulas, mirrored from the server so the client can
//! predict combat numbers before CHARSTATS confirms them.

use crate::common::resources::CharClass;

pub const MAX_LEVEL: u16 = 400;

/// Experience needed to reach `level`.
pub fn xp_for_level(level: u16) -> u64 {
    if level <= 1 {
        return 0;
    }
    let scale = (u32::MAX as f64 * 0.95) / (MAX_LEVEL as f64).powi(3);
    let lv = (level - 1) as f64;
    (scale * lv * lv * lv) as u64
}

pub fn max_hp(class: CharClass, level: i32, vitality: i32) -> i32 {
    let hp = match class {
        CharClass::DarkWizard => 60 + (level - 1) + (vitality - 15) * 2,
        CharClass::DarkKnight => 110 + (level - 1) * 2 + (vitality - 25) * 3,
        CharClass::FairyElf => 80 + (level - 1) + (vitality - 20) * 2,
        CharClass::MagicGladiator => 110 + (level - 1) + (vitality - 26) * 2,
    };
    hp.max(1)
}

pub fn max_mp(class: CharClass, level: i32, energy: i32) -> i32 {
    let mp = match class {
        CharClass::DarkWizard => 60 + (level - 1) * 2 + (energy - 30) * 2,
        CharClass::DarkKnight => (20.0 + (level - 1) as f32 * 0.5 + (energy - 10) as f32) as i32,
        CharClass::FairyElf => {
            (30.0 + (level - 1) as f32 * 1.5 + (energy - 15) as f32 * 1.5) as i32
        }
        CharClass::MagicGladiator => 60 + (level - 1) + (energy - 26) * 2,
    };
    mp.max(0)
}

/// Dark Knight ability gauge.
pub fn max_ag(strength: i32, dexterity: i32, vitality: i32, energy: i32) -> i32 {
    (energy as f32 + vitality as f32 * 0.3 + dexterity as f32 * 0.2 + strength as f32 * 0.15)
        as i32
}

/// AG for Dark Knights, mana for everyone else.
pub fn max_mana_or_ag(
    class: CharClass,
    level: i32,
    strength: i32,
    dexterity: i32,
    vitality: i32,
    energy: i32,
) -> i32 {
    if class.uses_ag() {
        max_ag(strength, dexterity, vitality, energy)
    } else {
        max_mp(class, level, energy)
    }
}

/// Physical damage range without weapon bonus.
pub fn damage_range(
    class: CharClass,
    strength: i32,
    dexterity: i32,
    energy: i32,
    has_bow: bool,
) -> (i32, i32) {
    match class {
        CharClass::DarkWizard | CharClass::DarkKnight => (strength / 6, strength / 4),
        CharClass::FairyElf if has_bow => {
            (strength / 14 + dexterity / 7, strength / 8 + dexterity / 4)
        }
        CharClass::FairyElf => ((strength + dexterity) / 7, (strength + dexterity) / 4),
        CharClass::MagicGladiator => (strength / 6 + energy / 12, strength / 4 + energy / 8),
    }
}

pub fn magic_damage_range(energy: i32) -> (i32, i32) {
    (energy / 9, energy / 4)
}

pub fn defense(class: CharClass, dexterity: i32) -> i32 {
    match class {
        CharClass::DarkWizard | CharClass::MagicGladiator => dexterity / 4,
        CharClass::DarkKnight => dexterity / 3,
        CharClass::FairyElf => dexterity / 10,
    }
}

pub fn attack_rate(level: i32, dexterity: i32, strength: i32) -> i32 {
    level * 5 + (dexterity * 3) / 2 + strength / 4
}

pub fn defense_rate(class: CharClass, dexterity: i32) -> i32 {
    match class {
        CharClass::FairyElf => dexterity / 4,
        _ => dexterity / 3,
    }
}

pub fn attack_speed(class: CharClass, dexterity: i32) -> i32 {
    match class {
        CharClass::DarkWizard => dexterity / 20,
        CharClass::DarkKnight | CharClass::MagicGladiator => dexterity / 15,
        CharClass::FairyElf => dexterity / 50,
    }
}

pub fn magic_speed(class: CharClass, dexterity: i32) -> i32 {
    match class {
        CharClass::DarkWizard => dexterity / 10,
        CharClass::DarkKnight | CharClass::MagicGladiator => dexterity / 20,
        CharClass::FairyElf => dexterity / 50,
    }
}

pub fn level_up_points(class: CharClass) -> u16 {
    match class {
        CharClass::MagicGladiator => 7,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xp_curve() {
        assert_eq!(xp_for_level(0), 0);
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 63);
        assert!(xp_for_level(3) > xp_for_level(2));
        assert!(xp_for_level(MAX_LEVEL) < u32::MAX as u64);
    }

    #[test]
    fn test_starting_hp_matches_table() {
        for class in [
            CharClass::DarkWizard,
            CharClass::DarkKnight,
            CharClass::FairyElf,
            CharClass::MagicGladiator,
        ] {
            let start = class.starting_stats();
            assert_eq!(max_hp(class, 1, start.vitality as i32), start.life as i32);
        }
    }

    #[test]
    fn test_dark_knight_formulas() {
        let dk = CharClass::DarkKnight;
        assert_eq!(max_hp(dk, 5, 30), 110 + 8 + 15);
        assert_eq!(max_mana_or_ag(dk, 5, 40, 25, 30, 12), (12.0 + 9.0 + 5.0 + 6.0) as i32);
        assert_eq!(damage_range(dk, 40, 25, 12, false), (6, 10));
        assert_eq!(defense(dk, 25), 8);
        assert_eq!(attack_rate(5, 25, 40), 25 + 37 + 10);
    }

    #[test]
    fn test_elf_bow_damage() {
        let elf = CharClass::FairyElf;
        assert_eq!(damage_range(elf, 28, 35, 0, true), (2 + 5, 3 + 8));
        assert_eq!(damage_range(elf, 28, 35, 0, false), (9, 15));
    }

    #[test]
    fn test_hp_never_below_one() {
        assert_eq!(max_hp(CharClass::DarkWizard, 1, 0), 30);
        assert_eq!(max_hp(CharClass::DarkKnight, 1, 0), 35);
        assert_eq!(max_hp(CharClass::DarkKnight, 1, -100), 1);
    }

    #[test]
    fn test_points_per_level() {
        assert_eq!(level_up_points(CharClass::MagicGladiator), 7);
        assert_eq!(level_up_points(CharClass::DarkWizard), 5);
    }
}
