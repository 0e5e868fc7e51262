//! The narrow surface packet handlers use to reach the rest of the game.
//!
//! Monsters, NPCs, effects, terrain and the hero model live outside the
//! network layer. Handlers only see these traits, bundled into a [`World`]
//! and borrowed for the duration of one packet.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::common::types::{grid_to_world, DamageKind, ObjectIndex, Vec3};
use crate::game::hero::{HeroCharacter, WeaponInfo};
use crate::game::items::ItemCatalog;
use crate::game::state::LiveState;
use crate::protocol::game::world::{MonsterSpawn, NpcSpawn};

pub trait MonsterView {
    fn spawn(&mut self, spawn: &MonsterSpawn);
    fn set_hp(&mut self, index: ObjectIndex, hp: i32);
    /// Play the hit reaction once.
    fn trigger_hit(&mut self, index: ObjectIndex);
    fn trigger_attack(&mut self, index: ObjectIndex);
    fn set_dying(&mut self, index: ObjectIndex);
    fn respawn(&mut self, index: ObjectIndex, grid_x: u8, grid_y: u8, hp: u16);
    fn set_move_target(&mut self, index: ObjectIndex, target: Vec3, chasing: bool);
    /// Position of a tracked monster, `None` if unknown.
    fn position(&self, index: ObjectIndex) -> Option<Vec3>;

    /// Whether the monster can still be fought.
    fn is_alive(&self, index: ObjectIndex) -> bool {
        self.position(index).is_some()
    }
}

pub trait NpcView {
    fn spawn(&mut self, spawn: &NpcSpawn);
    fn set_move_target(&mut self, index: ObjectIndex, target: Vec3);
}

pub trait Effects {
    fn spawn_damage_number(&mut self, position: Vec3, value: i32, kind: DamageKind);
    fn blood_burst(&mut self, position: Vec3);
}

pub trait Terrain {
    fn height_at(&self, x: f32, z: f32) -> f32;
    fn in_safe_zone(&self, position: Vec3) -> bool;
}

/// The hero's rendered model.
pub trait HeroAppearance {
    fn equip_weapon(&mut self, weapon: &WeaponInfo);
    fn equip_shield(&mut self, shield: &WeaponInfo);
    /// `part` is 0 (helm) to 4 (boots).
    fn equip_body_part(&mut self, part: usize, model: &str);
}

pub struct World<'a> {
    pub monsters: &'a mut dyn MonsterView,
    pub npcs: &'a mut dyn NpcView,
    pub effects: &'a mut dyn Effects,
    pub terrain: &'a dyn Terrain,
    pub appearance: &'a mut dyn HeroAppearance,
}

/// Everything a packet handler may touch, borrowed for one call.
pub struct GameContext<'a> {
    pub state: &'a mut LiveState,
    pub hero: &'a mut HeroCharacter,
    pub catalog: &'a ItemCatalog,
    pub world: World<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedMonster {
    pub monster_type: u16,
    pub position: Vec3,
    pub target: Vec3,
    pub chasing: bool,
    pub hp: i32,
    pub max_hp: i32,
    pub dying: bool,
    pub hits: u32,
    pub attacks: u32,
}

/// Monsters kept as plain records.
#[derive(Debug, Default)]
pub struct MonsterTable {
    monsters: HashMap<ObjectIndex, TrackedMonster>,
}

impl MonsterTable {
    pub fn get(&self, index: ObjectIndex) -> Option<&TrackedMonster> {
        self.monsters.get(&index)
    }

    pub fn len(&self) -> usize {
        self.monsters.len()
    }

    /// Closest living monster to `from`.
    pub fn nearest_alive(&self, from: Vec3) -> Option<(ObjectIndex, Vec3)> {
        self.monsters
            .iter()
            .filter(|(_, m)| !m.dying)
            .map(|(idx, m)| (*idx, m.position))
            .min_by(|a, b| from.flat_distance(&a.1).total_cmp(&from.flat_distance(&b.1)))
    }
}

impl MonsterView for MonsterTable {
    fn spawn(&mut self, spawn: &MonsterSpawn) {
        let position = grid_to_world(spawn.grid_x, spawn.grid_y);
        self.monsters.insert(
            spawn.index,
            TrackedMonster {
                monster_type: spawn.monster_type,
                position,
                target: position,
                chasing: false,
                hp: spawn.hp as i32,
                max_hp: spawn.max_hp as i32,
                dying: false,
                hits: 0,
                attacks: 0,
            },
        );
    }

    fn set_hp(&mut self, index: ObjectIndex, hp: i32) {
        if let Some(monster) = self.monsters.get_mut(&index) {
            monster.hp = hp;
        }
    }

    fn trigger_hit(&mut self, index: ObjectIndex) {
        if let Some(monster) = self.monsters.get_mut(&index) {
            monster.hits += 1;
        }
    }

    fn trigger_attack(&mut self, index: ObjectIndex) {
        if let Some(monster) = self.monsters.get_mut(&index) {
            monster.attacks += 1;
        }
    }

    fn set_dying(&mut self, index: ObjectIndex) {
        if let Some(monster) = self.monsters.get_mut(&index) {
            monster.dying = true;
            monster.hp = 0;
        }
    }

    fn respawn(&mut self, index: ObjectIndex, grid_x: u8, grid_y: u8, hp: u16) {
        if let Some(monster) = self.monsters.get_mut(&index) {
            let position = grid_to_world(grid_x, grid_y);
            monster.position = position;
            monster.target = position;
            monster.chasing = false;
            monster.hp = hp as i32;
            monster.max_hp = monster.max_hp.max(hp as i32);
            monster.dying = false;
        }
    }

    fn set_move_target(&mut self, index: ObjectIndex, target: Vec3, chasing: bool) {
        if let Some(monster) = self.monsters.get_mut(&index) {
            // No animation here: the monster arrives instantly.
            monster.position = target;
            monster.target = target;
            monster.chasing = chasing;
        }
    }

    fn position(&self, index: ObjectIndex) -> Option<Vec3> {
        self.monsters.get(&index).map(|m| m.position)
    }

    fn is_alive(&self, index: ObjectIndex) -> bool {
        self.monsters.get(&index).is_some_and(|m| !m.dying)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedNpc {
    pub npc_type: u16,
    pub position: Vec3,
    pub dir: u8,
}

#[derive(Debug, Default)]
pub struct NpcTable {
    npcs: HashMap<ObjectIndex, TrackedNpc>,
}

impl NpcTable {
    pub fn get(&self, index: ObjectIndex) -> Option<&TrackedNpc> {
        self.npcs.get(&index)
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }
}

impl NpcView for NpcTable {
    fn spawn(&mut self, spawn: &NpcSpawn) {
        self.npcs.insert(
            spawn.index,
            TrackedNpc {
                npc_type: spawn.npc_type,
                position: grid_to_world(spawn.grid_x, spawn.grid_y),
                dir: spawn.dir,
            },
        );
    }

    fn set_move_target(&mut self, index: ObjectIndex, target: Vec3) {
        if let Some(npc) = self.npcs.get_mut(&index) {
            npc.position = target;
        }
    }
}

/// Effects that only log, keeping a count and the last number shown.
#[derive(Debug, Default)]
pub struct LogEffects {
    pub numbers_spawned: usize,
    pub last_number: Option<(Vec3, i32, DamageKind)>,
    pub blood_bursts: usize,
}

impl Effects for LogEffects {
    fn spawn_damage_number(&mut self, position: Vec3, value: i32, kind: DamageKind) {
        trace!("Damage number {} ({:?})", value, kind);
        self.numbers_spawned += 1;
        self.last_number = Some((position, value, kind));
    }

    fn blood_burst(&mut self, _position: Vec3) {
        self.blood_bursts += 1;
    }
}

/// A rectangle on the ground plane, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeZone {
    pub min: Vec3,
    pub max: Vec3,
}

impl SafeZone {
    pub fn contains(&self, position: Vec3) -> bool {
        (self.min.x..=self.max.x).contains(&position.x)
            && (self.min.z..=self.max.z).contains(&position.z)
    }
}

#[derive(Debug, Default)]
pub struct FlatTerrain {
    pub height: f32,
    pub safe_zone: Option<SafeZone>,
}

impl Terrain for FlatTerrain {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }

    fn in_safe_zone(&self, position: Vec3) -> bool {
        self.safe_zone.is_some_and(|zone| zone.contains(position))
    }
}

/// What the model would be wearing.
#[derive(Debug, Default)]
pub struct LogAppearance {
    pub weapon: WeaponInfo,
    pub shield: WeaponInfo,
    pub body_parts: [String; 5],
}

impl HeroAppearance for LogAppearance {
    fn equip_weapon(&mut self, weapon: &WeaponInfo) {
        debug!("Weapon model: {}", weapon.model);
        self.weapon = weapon.clone();
    }

    fn equip_shield(&mut self, shield: &WeaponInfo) {
        debug!("Shield model: {}", shield.model);
        self.shield = shield.clone();
    }

    fn equip_body_part(&mut self, part: usize, model: &str) {
        if let Some(slot) = self.body_parts.get_mut(part) {
            debug!("Body part {}: {}", part, model);
            *slot = model.to_string();
        }
    }
}

/// A world without rendering, used by the binary and the tests.
#[derive(Debug, Default)]
pub struct HeadlessWorld {
    pub monsters: MonsterTable,
    pub npcs: NpcTable,
    pub effects: LogEffects,
    pub terrain: FlatTerrain,
    pub appearance: LogAppearance,
}

impl HeadlessWorld {
    pub fn world(&mut self) -> World<'_> {
        World {
            monsters: &mut self.monsters,
            npcs: &mut self.npcs,
            effects: &mut self.effects,
            terrain: &self.terrain,
            appearance: &mut self.appearance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(index: ObjectIndex) -> MonsterSpawn {
        MonsterSpawn {
            index,
            monster_type: 7,
            grid_x: 10,
            grid_y: 20,
            dir: 0,
            hp: 100,
            max_hp: 100,
            state: 0,
        }
    }

    #[test]
    fn test_monster_lifecycle() {
        let mut table = MonsterTable::default();
        table.spawn(&spawn(3));
        assert_eq!(table.position(3), Some(Vec3::new(2000.0, 0.0, 1000.0)));

        table.set_dying(3);
        assert!(!table.is_alive(3));
        assert_eq!(table.nearest_alive(Vec3::default()), None);

        table.respawn(3, 1, 2, 80);
        assert!(table.is_alive(3));
        assert_eq!(table.get(3).map(|m| m.hp), Some(80));
        assert_eq!(table.position(3), Some(Vec3::new(200.0, 0.0, 100.0)));
    }

    #[test]
    fn test_unknown_monster_is_ignored() {
        let mut table = MonsterTable::default();
        table.trigger_hit(9);
        table.set_hp(9, 10);
        assert_eq!(table.len(), 0);
        assert!(!table.is_alive(9));
    }

    #[test]
    fn test_nearest_alive() {
        let mut table = MonsterTable::default();
        table.spawn(&spawn(1));
        table.spawn(&MonsterSpawn {
            grid_x: 1,
            grid_y: 1,
            ..spawn(2)
        });
        assert_eq!(table.nearest_alive(Vec3::default()).map(|m| m.0), Some(2));
    }

    #[test]
    fn test_safe_zone() {
        let terrain = FlatTerrain {
            height: 5.0,
            safe_zone: Some(SafeZone {
                min: Vec3::new(0.0, 0.0, 0.0),
                max: Vec3::new(500.0, 0.0, 500.0),
            }),
        };
        assert!(terrain.in_safe_zone(Vec3::new(250.0, 40.0, 10.0)));
        assert!(!terrain.in_safe_zone(Vec3::new(600.0, 0.0, 10.0)));
        assert!(!FlatTerrain::default().in_safe_zone(Vec3::default()));
    }
}
