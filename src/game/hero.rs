//! The local hero: life cycle, attack timing and predicted stats.
//!
//! Two independent state machines run here. [`HeroState`] tracks life and
//! death, [`AttackState`] tracks the current swing. The server owns HP and
//! death; this side owns animation timing. Stats are recomputed locally with
//! the server's formulas and overridden whenever CHARSTATS arrives.

use rand::Rng;
use tracing::{debug, info};

use crate::common::resources::{item_category, CharClass};
use crate::common::types::{DamageKind, ObjectIndex, Vec3};
use crate::game::stats;

pub const MOVE_SPEED: f32 = 334.0;
/// Movement stops once the hero is this close to its target.
pub const ARRIVE_DISTANCE: f32 = 10.0;
pub const HIT_STUN_TIME: f32 = 0.4;
pub const DYING_TIMEOUT: f32 = 3.0;
pub const DEAD_WAIT_TIME: f32 = 3.0;
pub const RESPAWN_WINDOW: f32 = 2.0;
pub const MELEE_RANGE: f32 = 150.0;
pub const BOW_RANGE: f32 = 500.0;
/// Animation keys per second at attack speed 0.
pub const ANIM_SPEED: f32 = 8.25;
pub const ATTACK_COOLDOWN_TIME: f32 = 0.6;
pub const SKILL_COOLDOWN_TIME: f32 = 0.2;
/// Point in the swing, as a fraction, where the blow lands.
pub const ATTACK_HIT_FRACTION: f32 = 0.4;
/// Safe zone regeneration per second, as a fraction of max HP.
pub const SAFE_ZONE_REGEN: f32 = 0.02;
pub const DEFAULT_SWING_KEYS: u16 = 12;
pub const DEFAULT_DIE_KEYS: u16 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeroState {
    Alive,
    HitStun,
    Dying,
    Dead,
    Respawning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackState {
    None,
    Approaching,
    Swinging,
    Cooldown,
}

/// What the hero holds in one hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaponInfo {
    pub category: u8,
    pub item_index: u8,
    pub item_level: u8,
    pub model: String,
    pub two_handed: bool,
}

impl WeaponInfo {
    pub fn empty() -> Self {
        Self {
            category: item_category::NONE,
            item_index: 0,
            item_level: 0,
            model: String::new(),
            two_handed: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category == item_category::NONE
    }
}

impl Default for WeaponInfo {
    fn default() -> Self {
        Self::empty()
    }
}

/// Outcome of a locally rolled attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRoll {
    pub damage: i32,
    pub kind: DamageKind,
}

/// Server-provided numbers for [`HeroCharacter::load_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatSnapshot {
    pub class: CharClass,
    pub level: u16,
    pub strength: u16,
    pub dexterity: u16,
    pub vitality: u16,
    pub energy: u16,
    pub experience: u64,
    pub level_up_points: u16,
    pub hp: i32,
    pub max_hp: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub ag: i32,
    pub max_ag: i32,
}

#[derive(Debug, Clone)]
pub struct HeroCharacter {
    class: CharClass,
    level: u16,
    strength: u16,
    dexterity: u16,
    vitality: u16,
    energy: u16,
    experience: u64,
    next_experience: u64,
    level_up_points: u16,
    leveled_up: bool,

    hp: i32,
    max_hp: i32,
    mana: i32,
    max_mana: i32,
    ag: i32,
    max_ag: i32,

    damage_min: i32,
    damage_max: i32,
    defense: i32,
    attack_rate: i32,
    defense_rate: i32,
    weapon_bonus: (i32, i32),
    defense_bonus: i32,
    attack_speed: u16,

    weapon: WeaponInfo,
    shield: WeaponInfo,

    position: Vec3,
    move_target: Vec3,
    moving: bool,
    in_safe_zone: bool,

    state: HeroState,
    state_timer: f32,
    regen_remainder: f32,

    attack: AttackState,
    target: Option<ObjectIndex>,
    target_pos: Vec3,
    active_skill: u8,
    swing_timer: f32,
    hit_registered: bool,
    attack_cooldown: f32,
    global_cooldown: f32,
    swing_keys: u16,
    die_keys: u16,
}

impl HeroCharacter {
    /// A level 1 hero with the class's starting attributes.
    pub fn new(class: CharClass) -> Self {
        let start = class.starting_stats();
        let mut hero = Self {
            class,
            level: 1,
            strength: start.strength,
            dexterity: start.dexterity,
            vitality: start.vitality,
            energy: start.energy,
            experience: 0,
            next_experience: 0,
            level_up_points: 0,
            leveled_up: false,
            hp: 0,
            max_hp: 0,
            mana: 0,
            max_mana: 0,
            ag: 0,
            max_ag: 0,
            damage_min: 0,
            damage_max: 0,
            defense: 0,
            attack_rate: 0,
            defense_rate: 0,
            weapon_bonus: (0, 0),
            defense_bonus: 0,
            attack_speed: 0,
            weapon: WeaponInfo::empty(),
            shield: WeaponInfo::empty(),
            position: Vec3::default(),
            move_target: Vec3::default(),
            moving: false,
            in_safe_zone: false,
            state: HeroState::Alive,
            state_timer: 0.0,
            regen_remainder: 0.0,
            attack: AttackState::None,
            target: None,
            target_pos: Vec3::default(),
            active_skill: 0,
            swing_timer: 0.0,
            hit_registered: false,
            attack_cooldown: 0.0,
            global_cooldown: 0.0,
            swing_keys: DEFAULT_SWING_KEYS,
            die_keys: DEFAULT_DIE_KEYS,
        };
        hero.recalc_stats();
        hero.hp = hero.max_hp;
        hero.mana = hero.max_mana;
        hero.ag = hero.max_ag;
        hero
    }

    // ---------------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------------

    /// Recompute every derived stat from level, attributes and gear.
    pub fn recalc_stats(&mut self) {
        let level = self.level as i32;
        let (str, dex, vit, ene) = (
            self.strength as i32,
            self.dexterity as i32,
            self.vitality as i32,
            self.energy as i32,
        );

        self.max_hp = stats::max_hp(self.class, level, vit);
        self.max_mana = stats::max_mp(self.class, level, ene).max(1);
        self.max_ag = if self.class.uses_ag() {
            stats::max_ag(str, dex, vit, ene)
        } else {
            0
        };

        let has_bow = self.weapon.category == item_category::BOW;
        let (base_min, base_max) = stats::damage_range(self.class, str, dex, ene, has_bow);
        self.damage_min = (base_min + self.weapon_bonus.0).max(1);
        self.damage_max = (base_max + self.weapon_bonus.1).max(self.damage_min);

        self.defense = stats::defense(self.class, dex) + self.defense_bonus;
        self.attack_rate = stats::attack_rate(level, dex, str);
        self.defense_rate = stats::defense_rate(self.class, dex);
        self.next_experience = stats::xp_for_level(self.level.saturating_add(1));
    }

    /// Add experience, levelling up as many times as it covers.
    pub fn gain_experience(&mut self, xp: u64) {
        self.experience = self.experience.saturating_add(xp);
        self.leveled_up = false;

        while self.experience >= self.next_experience && self.level < stats::MAX_LEVEL {
            self.level += 1;
            self.level_up_points = self
                .level_up_points
                .saturating_add(stats::level_up_points(self.class));
            self.leveled_up = true;
            self.recalc_stats();
            self.hp = self.max_hp;
            self.mana = self.max_mana;
            self.ag = self.max_ag;
            info!(
                "Level up! Now level {} (HP={}, points={}, next XP={})",
                self.level, self.max_hp, self.level_up_points, self.next_experience
            );
        }
    }

    /// Spend one point on strength (0), dexterity (1), vitality (2) or
    /// energy (3).
    pub fn add_stat_point(&mut self, stat: u8) -> bool {
        if self.level_up_points == 0 {
            return false;
        }
        match stat {
            0 => self.strength = self.strength.saturating_add(1),
            1 => self.dexterity = self.dexterity.saturating_add(1),
            2 => self.vitality = self.vitality.saturating_add(1),
            3 => self.energy = self.energy.saturating_add(1),
            _ => return false,
        }
        self.level_up_points -= 1;

        let old_max = self.max_hp;
        self.recalc_stats();
        if self.max_hp > old_max {
            self.hp += self.max_hp - old_max;
        }
        true
    }

    /// Take the server's numbers. Nonzero maxima override the local
    /// prediction; current values are clamped to them.
    pub fn load_stats(&mut self, snapshot: &StatSnapshot) {
        self.class = snapshot.class;
        self.level = snapshot.level;
        self.strength = snapshot.strength;
        self.dexterity = snapshot.dexterity;
        self.vitality = snapshot.vitality;
        self.energy = snapshot.energy;
        self.experience = snapshot.experience;
        self.level_up_points = snapshot.level_up_points;
        self.recalc_stats();

        if snapshot.max_hp > 0 {
            self.max_hp = snapshot.max_hp;
        }
        if snapshot.max_mana > 0 {
            self.max_mana = snapshot.max_mana;
        }
        if snapshot.max_ag > 0 {
            self.max_ag = snapshot.max_ag;
        }

        self.hp = snapshot.hp.min(self.max_hp);
        // The server says alive; don't load a corpse.
        if self.hp <= 0 && snapshot.hp > 0 {
            self.hp = self.max_hp;
        }
        self.mana = snapshot.mana.min(self.max_mana);
        self.ag = snapshot.ag.min(self.max_ag);

        debug!(
            "Loaded stats: Lv{} STR={} DEX={} VIT={} ENE={} HP={}/{} XP={} pts={}",
            self.level,
            self.strength,
            self.dexterity,
            self.vitality,
            self.energy,
            self.hp,
            self.max_hp,
            self.experience,
            self.level_up_points
        );
    }

    pub fn set_hp(&mut self, hp: i32) {
        self.hp = hp.min(self.max_hp);
    }

    pub fn heal(&mut self, amount: i32) {
        if self.state != HeroState::Alive {
            return;
        }
        self.hp = (self.hp + amount).min(self.max_hp);
    }

    pub fn set_weapon_bonus(&mut self, min: i32, max: i32) {
        self.weapon_bonus = (min, max);
        self.recalc_stats();
    }

    pub fn set_defense_bonus(&mut self, defense: i32) {
        self.defense_bonus = defense;
        self.recalc_stats();
    }

    pub fn set_attack_speed(&mut self, speed: u16) {
        self.attack_speed = speed;
    }

    /// Animation keys of the attack action, once known from the model.
    pub fn set_swing_keys(&mut self, keys: u16) {
        self.swing_keys = keys;
    }

    pub fn equip_weapon(&mut self, weapon: WeaponInfo) {
        debug!("Hero weapon: cat={} idx={} {}", weapon.category, weapon.item_index, weapon.model);
        self.weapon = weapon;
        self.recalc_stats();
    }

    pub fn equip_shield(&mut self, shield: WeaponInfo) {
        self.shield = shield;
    }

    /// Roll a plain attack against a target, as the server would.
    pub fn roll_attack(&self, target_defense: i32, target_defense_rate: i32) -> DamageRoll {
        self.roll_attack_with(&mut rand::thread_rng(), target_defense, target_defense_rate)
    }

    pub fn roll_attack_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        target_defense: i32,
        target_defense_rate: i32,
    ) -> DamageRoll {
        let atk = self.attack_rate;
        let def = target_defense_rate;
        let hit_chance = if atk > 0 && def < atk {
            (100 - def * 100 / atk).max(5)
        } else {
            5
        };
        if rng.gen_range(0..100) >= hit_chance {
            return DamageRoll {
                damage: 0,
                kind: DamageKind::Miss,
            };
        }

        let roll = rng.gen_range(0..100);
        if roll < 1 {
            let damage = self.damage_max * 120 / 100 - target_defense;
            return DamageRoll {
                damage: damage.max(1),
                kind: DamageKind::Excellent,
            };
        }
        if roll < 6 {
            return DamageRoll {
                damage: (self.damage_max - target_defense).max(1),
                kind: DamageKind::Critical,
            };
        }

        let damage = rng.gen_range(self.damage_min..=self.damage_max) - target_defense;
        DamageRoll {
            damage: damage.max(1),
            kind: DamageKind::Normal,
        }
    }

    // ---------------------------------------------------------------------
    // Life cycle
    // ---------------------------------------------------------------------

    pub fn take_damage(&mut self, damage: i32) {
        if !self.can_be_hit() {
            return;
        }
        self.hp -= damage;
        if self.hp <= 0 {
            self.force_die();
        } else {
            self.apply_hit_reaction();
        }
    }

    pub fn apply_hit_reaction(&mut self) {
        if !self.can_be_hit() {
            return;
        }
        self.state = HeroState::HitStun;
        self.state_timer = HIT_STUN_TIME;
        self.moving = false;
    }

    pub fn force_die(&mut self) {
        self.hp = 0;
        self.state = HeroState::Dying;
        self.state_timer = 0.0;
        self.cancel_attack();
        info!("Hero is dying");
    }

    pub fn respawn(&mut self, position: Vec3) {
        self.position = position;
        self.hp = self.max_hp;
        self.state = HeroState::Respawning;
        self.state_timer = RESPAWN_WINDOW;
        self.moving = false;
        self.attack = AttackState::None;
        self.target = None;
        info!("Hero respawned at ({:.0}, {:.0})", position.x, position.z);
    }

    /// True once the dead timer has run out and the caller may respawn.
    pub fn ready_to_respawn(&self) -> bool {
        self.state == HeroState::Dead && self.state_timer <= 0.0
    }

    fn can_be_hit(&self) -> bool {
        matches!(self.state, HeroState::Alive | HeroState::HitStun)
    }

    fn die_duration(&self) -> f32 {
        self.die_keys.saturating_sub(1) as f32 / ANIM_SPEED
    }

    fn update_state(&mut self, dt: f32) {
        match self.state {
            HeroState::Alive => {
                if self.in_safe_zone && self.hp < self.max_hp {
                    self.regen_remainder += SAFE_ZONE_REGEN * self.max_hp as f32 * dt;
                    let threshold = (SAFE_ZONE_REGEN * self.max_hp as f32).max(1.0);
                    if self.regen_remainder >= threshold {
                        let gain = self.regen_remainder as i32;
                        self.hp = (self.hp + gain).min(self.max_hp);
                        self.regen_remainder -= gain as f32;
                    }
                } else {
                    self.regen_remainder = 0.0;
                }
            }
            HeroState::HitStun => {
                self.state_timer -= dt;
                if self.state_timer <= 0.0 {
                    self.state = HeroState::Alive;
                }
            }
            HeroState::Dying => {
                self.state_timer += dt;
                if self.state_timer >= self.die_duration() || self.state_timer > DYING_TIMEOUT {
                    self.state = HeroState::Dead;
                    self.state_timer = DEAD_WAIT_TIME;
                    info!("Hero is dead, respawn in {}s", DEAD_WAIT_TIME);
                }
            }
            HeroState::Dead => {
                self.state_timer -= dt;
            }
            HeroState::Respawning => {
                self.state_timer -= dt;
                if self.state_timer <= 0.0 {
                    self.state = HeroState::Alive;
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Movement
    // ---------------------------------------------------------------------

    pub fn move_to(&mut self, target: Vec3) {
        if self.is_dead() {
            return;
        }
        self.move_target = target;
        self.moving = true;
    }

    pub fn stop_moving(&mut self) {
        self.moving = false;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn process_movement(&mut self, dt: f32) {
        if !self.moving || self.is_dead() {
            return;
        }
        let dist = self.position.flat_distance(&self.move_target);
        if dist < ARRIVE_DISTANCE {
            self.stop_moving();
            return;
        }
        let step = (MOVE_SPEED * dt).min(dist);
        let dx = (self.move_target.x - self.position.x) / dist;
        let dz = (self.move_target.z - self.position.z) / dist;
        self.position.x += dx * step;
        self.position.z += dz * step;
    }

    // ---------------------------------------------------------------------
    // Attack
    // ---------------------------------------------------------------------

    pub fn attack_monster(&mut self, monster: ObjectIndex, monster_pos: Vec3) {
        self.engage(monster, monster_pos, 0, ATTACK_COOLDOWN_TIME);
    }

    pub fn skill_attack_monster(&mut self, monster: ObjectIndex, monster_pos: Vec3, skill_id: u8) {
        self.engage(monster, monster_pos, skill_id, SKILL_COOLDOWN_TIME);
    }

    fn engage(&mut self, monster: ObjectIndex, monster_pos: Vec3, skill_id: u8, base_cooldown: f32) {
        if self.is_dead() || self.global_cooldown > 0.0 {
            return;
        }

        // Same target mid-cycle: follow it without restarting the swing.
        if self.target == Some(monster)
            && self.active_skill == skill_id
            && matches!(self.attack, AttackState::Swinging | AttackState::Cooldown)
        {
            self.target_pos = monster_pos;
            return;
        }

        self.target = Some(monster);
        self.target_pos = monster_pos;
        self.active_skill = skill_id;

        if self.position.flat_distance(&monster_pos) <= self.attack_range() {
            self.start_swing();
            self.global_cooldown = self.swing_duration() + base_cooldown / self.speed_multiplier();
        } else {
            self.attack = AttackState::Approaching;
            self.move_to(monster_pos);
        }
    }

    fn start_swing(&mut self) {
        self.attack = AttackState::Swinging;
        self.swing_timer = 0.0;
        self.hit_registered = false;
        self.moving = false;
    }

    pub fn cancel_attack(&mut self) {
        self.attack = AttackState::None;
        self.target = None;
        self.active_skill = 0;
        self.moving = false;
    }

    fn update_attack(&mut self, dt: f32) {
        if self.global_cooldown > 0.0 {
            self.global_cooldown = (self.global_cooldown - dt).max(0.0);
        }

        match self.attack {
            AttackState::None => {}
            AttackState::Approaching => {
                if self.position.flat_distance(&self.target_pos) <= self.attack_range() {
                    self.start_swing();
                } else if !self.moving {
                    debug!("Approach blocked, cancelling attack");
                    self.cancel_attack();
                }
            }
            AttackState::Swinging => {
                self.swing_timer += dt;
                if self.swing_timer >= self.swing_duration() {
                    let base = if self.active_skill > 0 {
                        SKILL_COOLDOWN_TIME
                    } else {
                        ATTACK_COOLDOWN_TIME
                    };
                    self.attack = AttackState::Cooldown;
                    self.attack_cooldown = base / self.speed_multiplier();
                }
            }
            AttackState::Cooldown => {
                self.attack_cooldown -= dt;
                if self.attack_cooldown <= 0.0 {
                    if self.target.is_some() {
                        // The caller decides whether to swing again. The skill
                        // id stays so skill attacks are not re-engaged.
                        self.attack = AttackState::None;
                    } else {
                        self.cancel_attack();
                    }
                }
            }
        }
    }

    /// True exactly once per swing, when the blow lands.
    pub fn check_attack_hit(&mut self) -> bool {
        if self.attack != AttackState::Swinging || self.hit_registered {
            return false;
        }
        if self.swing_timer >= self.swing_duration() * ATTACK_HIT_FRACTION {
            self.hit_registered = true;
            return true;
        }
        false
    }

    /// Advance one frame: life cycle, then movement, then the swing.
    pub fn update(&mut self, dt: f32, in_safe_zone: bool) {
        self.in_safe_zone = in_safe_zone;
        self.update_state(dt);
        self.process_movement(dt);
        self.update_attack(dt);
    }

    fn speed_multiplier(&self) -> f32 {
        1.0 + self.attack_speed as f32 / 100.0
    }

    pub fn swing_duration(&self) -> f32 {
        if self.swing_keys > 1 {
            self.swing_keys as f32 / (ANIM_SPEED * self.speed_multiplier())
        } else {
            0.5
        }
    }

    pub fn attack_range(&self) -> f32 {
        if self.weapon.category == item_category::BOW {
            BOW_RANGE
        } else {
            MELEE_RANGE
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn class(&self) -> CharClass {
        self.class
    }

    pub fn level(&self) -> u16 {
        self.level
    }

    pub fn strength(&self) -> u16 {
        self.strength
    }

    pub fn dexterity(&self) -> u16 {
        self.dexterity
    }

    pub fn vitality(&self) -> u16 {
        self.vitality
    }

    pub fn energy(&self) -> u16 {
        self.energy
    }

    pub fn experience(&self) -> u64 {
        self.experience
    }

    pub fn next_experience(&self) -> u64 {
        self.next_experience
    }

    pub fn level_up_points(&self) -> u16 {
        self.level_up_points
    }

    pub fn leveled_up(&self) -> bool {
        self.leveled_up
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn mana(&self) -> i32 {
        self.mana
    }

    pub fn max_mana(&self) -> i32 {
        self.max_mana
    }

    pub fn ag(&self) -> i32 {
        self.ag
    }

    pub fn max_ag(&self) -> i32 {
        self.max_ag
    }

    pub fn damage_range(&self) -> (i32, i32) {
        (self.damage_min, self.damage_max)
    }

    pub fn defense(&self) -> i32 {
        self.defense
    }

    pub fn attack_rate(&self) -> i32 {
        self.attack_rate
    }

    pub fn defense_rate(&self) -> i32 {
        self.defense_rate
    }

    pub fn weapon(&self) -> &WeaponInfo {
        &self.weapon
    }

    pub fn shield(&self) -> &WeaponInfo {
        &self.shield
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn state(&self) -> HeroState {
        self.state
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.state, HeroState::Dying | HeroState::Dead)
    }

    pub fn attack_state(&self) -> AttackState {
        self.attack
    }

    pub fn attack_target(&self) -> Option<ObjectIndex> {
        self.target
    }

    pub fn attack_target_pos(&self) -> Vec3 {
        self.target_pos
    }

    pub fn active_skill(&self) -> u8 {
        self.active_skill
    }

    pub fn global_cooldown(&self) -> f32 {
        self.global_cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn dk() -> HeroCharacter {
        HeroCharacter::new(CharClass::DarkKnight)
    }

    fn tick(hero: &mut HeroCharacter, seconds: f32) {
        let steps = (seconds / DT).ceil() as usize;
        for _ in 0..steps {
            hero.update(DT, false);
        }
    }

    #[test]
    fn test_new_hero_is_full() {
        let hero = dk();
        assert_eq!(hero.level(), 1);
        assert_eq!(hero.max_hp(), 110);
        assert_eq!(hero.hp(), hero.max_hp());
        assert_eq!(hero.state(), HeroState::Alive);
        assert_eq!(hero.attack_state(), AttackState::None);
    }

    #[test]
    fn test_in_range_attack_swings_and_hits_once() {
        let mut hero = dk();
        hero.attack_monster(3, Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(hero.attack_state(), AttackState::Swinging);
        assert!(hero.global_cooldown() > 0.0);

        assert!(!hero.check_attack_hit());
        let dt = hero.swing_duration() * 0.5;
        tick(&mut hero, dt);
        assert!(hero.check_attack_hit());
        assert!(!hero.check_attack_hit());
    }

    #[test]
    fn test_swing_cooldown_then_none_with_target_kept() {
        let mut hero = dk();
        hero.attack_monster(3, Vec3::new(50.0, 0.0, 0.0));
        let dt = hero.swing_duration() + 0.01;
        tick(&mut hero, dt);
        assert_eq!(hero.attack_state(), AttackState::Cooldown);

        tick(&mut hero, ATTACK_COOLDOWN_TIME + 0.05);
        assert_eq!(hero.attack_state(), AttackState::None);
        assert_eq!(hero.attack_target(), Some(3));
    }

    #[test]
    fn test_out_of_range_approaches_then_swings() {
        let mut hero = dk();
        hero.attack_monster(9, Vec3::new(600.0, 0.0, 0.0));
        assert_eq!(hero.attack_state(), AttackState::Approaching);
        assert!(hero.is_moving());

        tick(&mut hero, 2.0);
        assert_ne!(hero.attack_state(), AttackState::Approaching);
        assert!(hero.position().x >= 450.0);
    }

    #[test]
    fn test_attack_sub_state_settles() {
        // Any mix of attacks and cancels ends in NONE or SWINGING.
        let targets = [
            Vec3::new(900.0, 0.0, 0.0),
            Vec3::new(900.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 140.0),
            Vec3::new(300.0, 0.0, 300.0),
        ];
        for (round, target) in targets.iter().enumerate() {
            let mut hero = dk();
            hero.attack_monster(round as ObjectIndex, *target);
            if round % 2 == 1 {
                hero.cancel_attack();
            }

            let mut settled = false;
            for _ in 0..600 {
                hero.update(DT, false);
                if matches!(hero.attack_state(), AttackState::None | AttackState::Swinging) {
                    settled = true;
                    break;
                }
            }
            assert!(settled, "round {} stuck in {:?}", round, hero.attack_state());
        }
    }

    #[test]
    fn test_blocked_approach_cancels() {
        let mut hero = dk();
        hero.attack_monster(1, Vec3::new(1000.0, 0.0, 0.0));
        hero.stop_moving();
        hero.update(DT, false);
        assert_eq!(hero.attack_state(), AttackState::None);
        assert_eq!(hero.attack_target(), None);
    }

    #[test]
    fn test_global_cooldown_blocks_new_attack_after_cancel() {
        let mut hero = dk();
        hero.attack_monster(1, Vec3::new(10.0, 0.0, 0.0));
        hero.cancel_attack();
        hero.attack_monster(2, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(hero.attack_state(), AttackState::None);
        assert!(hero.global_cooldown() > 0.0);
    }

    #[test]
    fn test_same_target_mid_swing_only_follows() {
        let mut hero = dk();
        hero.attack_monster(4, Vec3::new(10.0, 0.0, 0.0));
        hero.update(DT, false);
        hero.global_cooldown = 0.0;
        hero.attack_monster(4, Vec3::new(20.0, 0.0, 0.0));
        assert_eq!(hero.attack_state(), AttackState::Swinging);
        assert!(hero.swing_timer > 0.0);
        assert_eq!(hero.attack_target_pos().x, 20.0);
    }

    #[test]
    fn test_skill_cooldown_is_shorter() {
        let mut hero = dk();
        hero.skill_attack_monster(4, Vec3::new(10.0, 0.0, 0.0), 19);
        assert_eq!(hero.active_skill(), 19);
        let dt = hero.swing_duration() + 0.01;
        tick(&mut hero, dt);
        assert_eq!(hero.attack_state(), AttackState::Cooldown);
        assert!(hero.attack_cooldown <= SKILL_COOLDOWN_TIME);

        tick(&mut hero, SKILL_COOLDOWN_TIME + 0.05);
        assert_eq!(hero.attack_state(), AttackState::None);
        assert_eq!(hero.active_skill(), 19);
        assert_eq!(hero.attack_target(), Some(4));
    }

    #[test]
    fn test_bow_extends_range() {
        let mut hero = HeroCharacter::new(CharClass::FairyElf);
        assert_eq!(hero.attack_range(), MELEE_RANGE);
        hero.equip_weapon(WeaponInfo {
            category: item_category::BOW,
            item_index: 0,
            item_level: 0,
            model: "Bow01.bmd".to_string(),
            two_handed: true,
        });
        assert_eq!(hero.attack_range(), BOW_RANGE);
        hero.attack_monster(1, Vec3::new(400.0, 0.0, 0.0));
        assert_eq!(hero.attack_state(), AttackState::Swinging);
    }

    #[test]
    fn test_attack_speed_shortens_swing() {
        let mut hero = dk();
        let slow = hero.swing_duration();
        hero.set_attack_speed(50);
        assert!((hero.swing_duration() - slow / 1.5).abs() < 1e-4);
        hero.set_swing_keys(1);
        assert_eq!(hero.swing_duration(), 0.5);
    }

    #[test]
    fn test_damage_stuns_then_kill_cycle() {
        let mut hero = dk();
        hero.take_damage(10);
        assert_eq!(hero.state(), HeroState::HitStun);
        assert_eq!(hero.hp(), 100);
        tick(&mut hero, HIT_STUN_TIME + 0.05);
        assert_eq!(hero.state(), HeroState::Alive);

        hero.attack_monster(1, Vec3::new(10.0, 0.0, 0.0));
        hero.take_damage(500);
        assert_eq!(hero.state(), HeroState::Dying);
        assert_eq!(hero.hp(), 0);
        assert_eq!(hero.attack_state(), AttackState::None);

        // Already dying: further damage is ignored.
        hero.take_damage(5);
        assert_eq!(hero.hp(), 0);

        tick(&mut hero, DYING_TIMEOUT + 0.1);
        assert_eq!(hero.state(), HeroState::Dead);
        assert!(!hero.ready_to_respawn());
        tick(&mut hero, DEAD_WAIT_TIME + 0.1);
        assert!(hero.ready_to_respawn());

        hero.respawn(Vec3::new(13000.0, 0.0, 13000.0));
        assert_eq!(hero.state(), HeroState::Respawning);
        assert_eq!(hero.hp(), hero.max_hp());
        tick(&mut hero, RESPAWN_WINDOW + 0.1);
        assert_eq!(hero.state(), HeroState::Alive);
    }

    #[test]
    fn test_dead_hero_cannot_attack_or_move() {
        let mut hero = dk();
        hero.force_die();
        hero.attack_monster(1, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(hero.attack_state(), AttackState::None);
        hero.move_to(Vec3::new(500.0, 0.0, 0.0));
        assert!(!hero.is_moving());
    }

    #[test]
    fn test_safe_zone_regen() {
        let mut hero = dk();
        hero.set_hp(10);
        for _ in 0..90 {
            hero.update(DT, true);
        }
        // 2% of 110 per second, whole points only.
        assert_eq!(hero.hp(), 12);

        hero.update(DT, false);
        assert_eq!(hero.regen_remainder, 0.0);
    }

    #[test]
    fn test_heal_only_while_alive() {
        let mut hero = dk();
        hero.set_hp(50);
        hero.heal(1000);
        assert_eq!(hero.hp(), hero.max_hp());

        hero.set_hp(50);
        hero.apply_hit_reaction();
        hero.heal(10);
        assert_eq!(hero.hp(), 50);
    }

    #[test]
    fn test_gain_experience_multi_level_matches_sequential() {
        let target = stats::xp_for_level(5) + 7;

        let mut bulk = dk();
        bulk.gain_experience(target);

        let mut stepwise = dk();
        let mut given = 0;
        for level in 2..=5u16 {
            let step = stats::xp_for_level(level) - given;
            stepwise.gain_experience(step);
            given += step;
        }
        stepwise.gain_experience(target - given);

        assert_eq!(bulk.level(), 5);
        assert_eq!(bulk.level(), stepwise.level());
        assert_eq!(bulk.experience(), stepwise.experience());
        assert_eq!(bulk.level_up_points(), stepwise.level_up_points());
        assert_eq!(bulk.max_hp(), stepwise.max_hp());
        assert_eq!(bulk.hp(), bulk.max_hp());
        assert_eq!(bulk.next_experience(), stats::xp_for_level(bulk.level() + 1));
    }

    #[test]
    fn test_add_stat_point_grows_hp() {
        let mut hero = dk();
        assert!(!hero.add_stat_point(2));

        hero.gain_experience(stats::xp_for_level(2));
        assert_eq!(hero.level_up_points(), 5);
        let hp = hero.hp();
        assert!(hero.add_stat_point(2));
        assert_eq!(hero.vitality(), 26);
        assert_eq!(hero.hp(), hp + 3);
        assert!(!hero.add_stat_point(7));
        assert_eq!(hero.level_up_points(), 4);
    }

    #[test]
    fn test_load_stats_server_max_wins() {
        let mut hero = dk();
        hero.load_stats(&StatSnapshot {
            class: CharClass::DarkKnight,
            level: 5,
            strength: 40,
            dexterity: 25,
            vitality: 30,
            energy: 12,
            experience: 500,
            level_up_points: 8,
            hp: 150,
            max_hp: 200,
            mana: 20,
            max_mana: 24,
            ag: 30,
            max_ag: 35,
        });
        assert_eq!(hero.level(), 5);
        assert_eq!(hero.max_hp(), 200);
        assert_eq!(hero.hp(), 150);
        assert_eq!(hero.max_ag(), 35);
        assert_eq!(hero.damage_range(), (6, 10));
    }

    fn snapshot_at(level: u16, experience: u64) -> StatSnapshot {
        StatSnapshot {
            class: CharClass::DarkKnight,
            level,
            strength: 28,
            dexterity: 20,
            vitality: 25,
            energy: 10,
            experience,
            level_up_points: 0,
            hp: 0,
            max_hp: 0,
            mana: 0,
            max_mana: 0,
            ag: 0,
            max_ag: 0,
        }
    }

    #[test]
    fn test_load_stats_with_max_wire_level() {
        let mut hero = dk();
        hero.load_stats(&snapshot_at(u16::MAX, 0));
        assert_eq!(hero.level(), u16::MAX);
        assert!(hero.max_hp() > 0);

        // Already past the level cap, so no level-up loop.
        hero.gain_experience(1_000);
        assert_eq!(hero.level(), u16::MAX);
    }

    #[test]
    fn test_gain_experience_saturates() {
        let mut hero = dk();
        hero.load_stats(&snapshot_at(stats::MAX_LEVEL, u64::MAX));
        hero.gain_experience(1);
        assert_eq!(hero.experience(), u64::MAX);
        assert_eq!(hero.level(), stats::MAX_LEVEL);
    }

    #[test]
    fn test_load_stats_never_loads_a_corpse() {
        let mut hero = dk();
        hero.load_stats(&StatSnapshot {
            class: CharClass::DarkKnight,
            level: 1,
            strength: 28,
            dexterity: 20,
            vitality: 25,
            energy: 10,
            experience: 0,
            level_up_points: 0,
            hp: 5,
            max_hp: 0,
            mana: 0,
            max_mana: 0,
            ag: 0,
            max_ag: 0,
        });
        assert_eq!(hero.hp(), 5);
        assert_eq!(hero.max_hp(), 110);
    }

    #[test]
    fn test_weapon_bonus_feeds_damage() {
        let mut hero = dk();
        let (min, max) = hero.damage_range();
        hero.set_weapon_bonus(6, 11);
        assert_eq!(hero.damage_range(), (min + 6, max + 11));
        hero.set_defense_bonus(10);
        assert_eq!(hero.defense(), stats::defense(CharClass::DarkKnight, 20) + 10);
    }

    #[test]
    fn test_roll_attack_bounds() {
        let mut hero = dk();
        hero.set_weapon_bonus(6, 11);
        let (min, max) = hero.damage_range();
        let mut rng = StdRng::seed_from_u64(7);

        let mut kinds = Vec::new();
        for _ in 0..2000 {
            let roll = hero.roll_attack_with(&mut rng, 0, 0);
            match roll.kind {
                DamageKind::Normal => assert!(roll.damage >= min && roll.damage <= max),
                DamageKind::Critical => assert_eq!(roll.damage, max),
                DamageKind::Excellent => assert_eq!(roll.damage, max * 120 / 100),
                DamageKind::Miss => assert_eq!(roll.damage, 0),
                other => panic!("unexpected {:?}", other),
            }
            kinds.push(roll.kind);
        }
        assert!(kinds.contains(&DamageKind::Critical));
        assert!(kinds.contains(&DamageKind::Normal));
    }

    #[test]
    fn test_roll_against_strong_defense_mostly_misses() {
        let hero = dk();
        let mut rng = StdRng::seed_from_u64(11);
        let misses = (0..1000)
            .filter(|_| hero.roll_attack_with(&mut rng, 0, 10_000).kind == DamageKind::Miss)
            .count();
        assert!(misses > 900);
        let hit = hero.roll_attack_with(&mut rng, 1_000, 0);
        assert!(hit.kind == DamageKind::Miss || hit.damage == 1);
    }
}
