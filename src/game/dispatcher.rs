//! Routes decoded server frames to their handlers.
//!
//! Two jump tables are built once: one for the connection burst, where the
//! world does not exist yet and spawns are collected into [`ServerData`],
//! and one for live play. C1/C3 and C2/C4 share handlers. A frame that is
//! too short, has an unknown opcode or fails to decode is skipped; nothing
//! here returns an error.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::common::resources::{body_part_index, equip_slot, item_category, CharClass};
use crate::common::types::{grid_to_world, grid_to_world_centered, DamageKind};
use crate::game::hero::WeaponInfo;
use crate::game::inventory::SyncMode;
use crate::game::state::ServerData;
use crate::game::world::GameContext;
use crate::protocol::game::character::{decode_skill_list, CharStats, StatAllocResult, StatKind};
use crate::protocol::game::combat::{Damage, MonsterAttack, MonsterDeath};
use crate::protocol::game::items::{
    decode_equipment, decode_inventory_sync, decode_shop_list, DropRemove, DropSpawn,
    EquipAssignment, PickupResult, ShopBuyResult, ShopSellResult,
};
use crate::protocol::game::world::{
    decode_monster_viewport_v1, decode_monster_viewport_v2, decode_npc_viewport, MonsterMove,
    MonsterRespawn, NpcMove,
};
use crate::protocol::packets::opcodes::{opcode_name, server};
use crate::protocol::packets::{Packet, PacketDecode};

/// Height above a monster's origin where hit effects appear.
const BLOOD_OFFSET: f32 = 50.0;
const DAMAGE_NUMBER_OFFSET: f32 = 80.0;

type InitialHandler = fn(&mut GameContext<'_>, &Packet, &mut ServerData);
type GameHandler = fn(&mut GameContext<'_>, &Packet);

/// `(wide header, opcode)`
type HandlerKey = (bool, u8);

pub struct PacketDispatcher {
    initial: HashMap<HandlerKey, InitialHandler>,
    steady: HashMap<HandlerKey, GameHandler>,
}

impl Default for PacketDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

const C1: bool = false;
const C2: bool = true;

impl PacketDispatcher {
    pub fn new() -> Self {
        let mut initial: HashMap<HandlerKey, InitialHandler> = HashMap::new();
        initial.insert((C2, server::NPC_VIEWPORT), on_npc_viewport_initial);
        initial.insert((C2, server::MON_VIEWPORT_V2), on_monster_viewport_v2_initial);
        initial.insert((C2, server::INV_SYNC), on_inventory_sync_initial);
        initial.insert((C2, server::EQUIPMENT), on_equipment_initial);
        initial.insert((C2, server::SKILL_LIST), on_skill_list_initial);
        initial.insert((C1, server::MON_VIEWPORT_V1), on_monster_viewport_v1_initial);
        initial.insert((C1, server::CHARSTATS), on_char_stats_initial);

        let mut steady: HashMap<HandlerKey, GameHandler> = HashMap::new();
        steady.insert((C1, server::NPC_MOVE), on_npc_move);
        steady.insert((C1, server::MON_MOVE), on_monster_move);
        steady.insert((C1, server::DAMAGE), on_damage);
        steady.insert((C1, server::MON_DEATH), on_monster_death);
        steady.insert((C1, server::MON_ATTACK), on_monster_attack);
        steady.insert((C1, server::MON_RESPAWN), on_monster_respawn);
        steady.insert((C1, server::STAT_ALLOC_RESULT), on_stat_alloc_result);
        steady.insert((C1, server::DROP_SPAWN), on_drop_spawn);
        steady.insert((C1, server::PICKUP_RESULT), on_pickup_result);
        steady.insert((C1, server::DROP_REMOVE), on_drop_remove);
        steady.insert((C1, server::EQUIPMENT), on_equipment);
        steady.insert((C1, server::CHARSTATS), on_char_stats);
        steady.insert((C1, server::SHOP_BUY_RESULT), on_shop_buy_result);
        steady.insert((C1, server::SHOP_SELL_RESULT), on_shop_sell_result);
        steady.insert((C1, server::MON_VIEWPORT_V1), on_monster_viewport_v1);
        steady.insert((C2, server::INV_SYNC), on_inventory_sync);
        steady.insert((C2, server::EQUIPMENT), on_equipment);
        steady.insert((C2, server::SKILL_LIST), on_skill_list);
        steady.insert((C2, server::SHOP_LIST), on_shop_list);
        steady.insert((C2, server::NPC_VIEWPORT), on_npc_viewport);
        steady.insert((C2, server::MON_VIEWPORT_V2), on_monster_viewport_v2);

        Self { initial, steady }
    }

    /// Handle a frame from the connection burst. Returns whether a handler
    /// ran.
    pub fn handle_initial_packet(
        &self,
        ctx: &mut GameContext<'_>,
        packet: &Packet,
        data: &mut ServerData,
    ) -> bool {
        match Self::key(packet).and_then(|key| self.initial.get(&key)) {
            Some(handler) => {
                handler(ctx, packet, data);
                true
            }
            None => {
                debug!("Initial: ignoring {} (0x{:02X})", opcode_name(packet.opcode), packet.opcode);
                false
            }
        }
    }

    /// Handle a frame during live play. Returns whether a handler ran.
    pub fn handle_game_packet(&self, ctx: &mut GameContext<'_>, packet: &Packet) -> bool {
        match Self::key(packet).and_then(|key| self.steady.get(&key)) {
            Some(handler) => {
                handler(ctx, packet);
                true
            }
            None => {
                debug!("Ignoring {} (0x{:02X})", opcode_name(packet.opcode), packet.opcode);
                false
            }
        }
    }

    fn key(packet: &Packet) -> Option<HandlerKey> {
        if packet.len() < packet.kind.min_dispatch_len() {
            return None;
        }
        Some((packet.kind.is_wide(), packet.opcode))
    }
}

fn decode<T>(packet: &Packet) -> Option<T>
where
    T: PacketDecode,
    T::Error: std::fmt::Display,
{
    T::decode(packet)
        .map_err(|e| debug!("Skipping {}: {}", opcode_name(packet.opcode), e))
        .ok()
}

// ---------------------------------------------------------------------------
// Connection burst
// ---------------------------------------------------------------------------

fn on_npc_viewport_initial(_ctx: &mut GameContext<'_>, packet: &Packet, data: &mut ServerData) {
    let npcs = decode_npc_viewport(packet);
    info!("NPC viewport: {} NPCs", npcs.len());
    data.npcs.extend(npcs);
}

fn on_monster_viewport_v2_initial(
    _ctx: &mut GameContext<'_>,
    packet: &Packet,
    data: &mut ServerData,
) {
    let monsters = decode_monster_viewport_v2(packet);
    info!("Monster viewport: {} monsters", monsters.len());
    data.monsters.extend(monsters);
}

fn on_monster_viewport_v1_initial(
    _ctx: &mut GameContext<'_>,
    packet: &Packet,
    data: &mut ServerData,
) {
    let monsters = decode_monster_viewport_v1(packet);
    info!("Monster viewport (v1): {} monsters", monsters.len());
    data.monsters.extend(monsters);
}

fn on_inventory_sync_initial(ctx: &mut GameContext<'_>, packet: &Packet, _data: &mut ServerData) {
    apply_inventory_sync(ctx, packet, SyncMode::Initial);
}

fn on_equipment_initial(ctx: &mut GameContext<'_>, packet: &Packet, data: &mut ServerData) {
    let entries = decode_equipment(packet);
    info!("Equipment: {} slots", entries.len());
    apply_equipment(ctx, &entries);
    data.equipment.extend(entries);
}

fn on_skill_list_initial(ctx: &mut GameContext<'_>, packet: &Packet, _data: &mut ServerData) {
    on_skill_list(ctx, packet);
}

fn on_char_stats_initial(ctx: &mut GameContext<'_>, packet: &Packet, _data: &mut ServerData) {
    let Some(stats) = decode::<CharStats>(packet) else {
        return;
    };
    sync_char_stats(ctx, &stats);

    let s = &ctx.state.stats;
    info!(
        "Character stats: Lv.{} HP={}/{} STR={} XP={} Pts={}",
        s.level, s.hp, s.max_hp, s.strength, s.experience, s.level_up_points
    );
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Copy CHARSTATS into the live state and reload the hero from it.
fn sync_char_stats(ctx: &mut GameContext<'_>, stats: &CharStats) {
    ctx.state.apply_char_stats(stats);

    let class = CharClass::from_id(stats.char_class).unwrap_or_else(|| {
        warn!("Unknown class code {}", stats.char_class);
        ctx.hero.class()
    });
    ctx.hero.set_attack_speed(stats.attack_speed);
    ctx.hero.load_stats(&ctx.state.stat_snapshot(class));
}

fn apply_inventory_sync(ctx: &mut GameContext<'_>, packet: &Packet, mode: SyncMode) {
    let Some(sync) = decode_inventory_sync(packet) else {
        debug!("Inventory sync too short ({} bytes)", packet.len());
        return;
    };

    ctx.state.zen = sync.zen;
    let placed = ctx.state.inventory.apply_full_sync(ctx.catalog, &sync, mode);
    ctx.state.inventory_synced = true;
    info!("Inventory sync: {} items, zen={}", placed, sync.zen);
}

/// Apply equipment entries to the slot table and to the hero model, then
/// refresh the gear bonuses.
pub(crate) fn apply_equipment(ctx: &mut GameContext<'_>, entries: &[EquipAssignment]) {
    for entry in entries {
        ctx.state.equipment.apply(entry);
        apply_equip_to_hero(ctx, entry);
    }

    let bonus = ctx.state.equipment.bonuses(ctx.catalog);
    ctx.hero.set_weapon_bonus(bonus.damage_min, bonus.damage_max);
    ctx.hero.set_defense_bonus(bonus.defense);
}

fn apply_equip_to_hero(ctx: &mut GameContext<'_>, entry: &EquipAssignment) {
    let def = ctx.catalog.get_by(entry.category, entry.item_index);
    let weapon = WeaponInfo {
        category: entry.category,
        item_index: entry.item_index,
        item_level: entry.item_level,
        model: entry.model.clone(),
        two_handed: def.is_some_and(|d| d.two_handed),
    };

    match entry.slot {
        equip_slot::RIGHT_HAND => {
            ctx.world.appearance.equip_weapon(&weapon);
            ctx.hero.equip_weapon(weapon);
        }
        equip_slot::LEFT_HAND => {
            ctx.world.appearance.equip_shield(&weapon);
            ctx.hero.equip_shield(weapon);
        }
        slot if entry.category == item_category::NONE => {
            // Back to the default body part.
            if (equip_slot::HELM..=equip_slot::BOOTS).contains(&slot) {
                let part = (slot - equip_slot::HELM) as usize;
                ctx.world.appearance.equip_body_part(part, "");
            }
        }
        _ => {
            let Some(part) = body_part_index(entry.category) else {
                return;
            };
            let model = def
                .map(|d| d.model.as_str())
                .filter(|m| !m.is_empty())
                .unwrap_or(entry.model.as_str());
            if !model.is_empty() {
                ctx.world.appearance.equip_body_part(part, model);
            }
        }
    }
}

fn on_skill_list(ctx: &mut GameContext<'_>, packet: &Packet) {
    ctx.state.learned_skills = decode_skill_list(packet);
    info!("Skill list: {} skills", ctx.state.learned_skills.len());
}

// ---------------------------------------------------------------------------
// Live play
// ---------------------------------------------------------------------------

fn on_npc_move(ctx: &mut GameContext<'_>, packet: &Packet) {
    if let Some(m) = decode::<NpcMove>(packet) {
        let target = grid_to_world_centered(m.target_x, m.target_y);
        ctx.world.npcs.set_move_target(m.index, target);
    }
}

fn on_monster_move(ctx: &mut GameContext<'_>, packet: &Packet) {
    if let Some(m) = decode::<MonsterMove>(packet) {
        let target = grid_to_world(m.target_x, m.target_y);
        ctx.world.monsters.set_move_target(m.index, target, m.chasing);
    }
}

fn on_damage(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(d) = decode::<Damage>(packet) else {
        return;
    };
    let Some(position) = ctx.world.monsters.position(d.monster_index) else {
        debug!("Damage for unknown monster {}", d.monster_index);
        return;
    };

    ctx.world.monsters.set_hp(d.monster_index, d.remaining_hp as i32);
    ctx.world.monsters.trigger_hit(d.monster_index);

    let kind = DamageKind::from_damage_type(d.damage_type);
    if kind != DamageKind::Miss {
        ctx.world.effects.blood_burst(position.offset_y(BLOOD_OFFSET));
    }
    ctx.world
        .effects
        .spawn_damage_number(position.offset_y(DAMAGE_NUMBER_OFFSET), d.damage as i32, kind);
}

fn on_monster_death(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(death) = decode::<MonsterDeath>(packet) else {
        return;
    };
    ctx.world.monsters.set_dying(death.monster_index);

    if death.xp_reward == 0 {
        return;
    }
    let hero = &mut *ctx.hero;
    hero.gain_experience(death.xp_reward as u64);

    let stats = &mut ctx.state.stats;
    stats.experience = hero.experience();
    stats.level = hero.level();
    stats.level_up_points = hero.level_up_points();
    stats.max_hp = hero.max_hp();

    ctx.world.effects.spawn_damage_number(
        hero.position(),
        death.xp_reward.min(i32::MAX as u32) as i32,
        DamageKind::Experience,
    );
}

fn on_monster_attack(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(attack) = decode::<MonsterAttack>(packet) else {
        return;
    };
    ctx.world.monsters.trigger_attack(attack.monster_index);

    let hero = &mut *ctx.hero;
    if ctx.world.terrain.in_safe_zone(hero.position()) {
        return;
    }

    let hp = attack.remaining_hp.max(0.0) as i32;
    ctx.state.stats.hp = hp;
    hero.set_hp(hp);

    // NaN counts as dead.
    if !(attack.remaining_hp > 0.0) {
        ctx.state.stats.hp = 0;
        hero.force_die();
    }

    if attack.damage == 0 {
        ctx.world
            .effects
            .spawn_damage_number(hero.position(), 0, DamageKind::Miss);
    } else {
        hero.apply_hit_reaction();
        ctx.world.effects.spawn_damage_number(
            hero.position(),
            attack.damage as i32,
            DamageKind::HeroHit,
        );
    }
}

fn on_monster_respawn(ctx: &mut GameContext<'_>, packet: &Packet) {
    if let Some(r) = decode::<MonsterRespawn>(packet) {
        ctx.world.monsters.respawn(r.index, r.grid_x, r.grid_y, r.hp);
    }
}

fn on_stat_alloc_result(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(result) = decode::<StatAllocResult>(packet) else {
        return;
    };
    if !result.success {
        info!("Stat allocation rejected");
        return;
    }

    match StatKind::from_id(result.stat_type) {
        Some(kind) => ctx.state.set_stat(kind, result.new_value),
        None => debug!("Unknown stat type {}", result.stat_type),
    }
    let stats = &mut ctx.state.stats;
    stats.level_up_points = result.level_up_points;
    stats.max_hp = result.max_life as i32;
    stats.ag = result.ag as i32;
    stats.max_ag = result.max_ag as i32;

    let snapshot = ctx.state.stat_snapshot(ctx.hero.class());
    ctx.hero.load_stats(&snapshot);
    info!(
        "Stat alloc OK: type={} val={} pts={}",
        result.stat_type, result.new_value, result.level_up_points
    );
}

fn on_drop_spawn(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(drop) = decode::<DropSpawn>(packet) else {
        return;
    };
    let height = ctx.world.terrain.height_at(drop.world_x, drop.world_z);
    if ctx.state.spawn_ground_item(&drop, height).is_some() {
        debug!(
            "Drop {}: {} x{}",
            drop.drop_index,
            ctx.catalog.name_of(drop.def_index),
            drop.quantity
        );
    }
}

fn on_pickup_result(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(result) = decode::<PickupResult>(packet) else {
        return;
    };
    if result.success {
        ctx.state.remove_ground_item(result.drop_index);
        info!(
            "Picked up {} x{}",
            ctx.catalog.name_of(result.def_index),
            result.quantity
        );
    }
}

fn on_drop_remove(ctx: &mut GameContext<'_>, packet: &Packet) {
    if let Some(remove) = decode::<DropRemove>(packet) {
        ctx.state.remove_ground_item(remove.drop_index);
    }
}

fn on_equipment(ctx: &mut GameContext<'_>, packet: &Packet) {
    apply_equipment(ctx, &decode_equipment(packet));
}

fn on_char_stats(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(stats) = decode::<CharStats>(packet) else {
        return;
    };
    let old_hp = ctx.state.stats.hp;
    sync_char_stats(ctx, &stats);

    let new_hp = ctx.state.stats.hp;
    if new_hp > old_hp && old_hp > 0 {
        ctx.world
            .effects
            .spawn_damage_number(ctx.hero.position(), new_hp - old_hp, DamageKind::Heal);
    }
}

fn on_shop_buy_result(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(result) = decode::<ShopBuyResult>(packet) else {
        return;
    };
    if result.success {
        info!(
            "Bought {} x{}",
            ctx.catalog.name_of(result.def_index),
            result.quantity
        );
    } else {
        info!("Failed to buy item");
    }
}

fn on_shop_sell_result(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(result) = decode::<ShopSellResult>(packet) else {
        return;
    };
    if result.success {
        ctx.state.zen = result.zen;
        info!("Sold bag slot {}, zen now {}", result.bag_slot, result.zen);
    } else {
        info!("Failed to sell item");
    }
}

fn on_inventory_sync(ctx: &mut GameContext<'_>, packet: &Packet) {
    apply_inventory_sync(ctx, packet, SyncMode::Steady);
}

fn on_shop_list(ctx: &mut GameContext<'_>, packet: &Packet) {
    let Some(stock) = ctx.state.shop.as_mut() else {
        debug!("Shop list with no shop open");
        return;
    };
    *stock = decode_shop_list(packet);
    info!("Shop opened with {} items", stock.len());
}

fn on_npc_viewport(ctx: &mut GameContext<'_>, packet: &Packet) {
    for npc in decode_npc_viewport(packet) {
        ctx.world.npcs.spawn(&npc);
    }
}

fn on_monster_viewport_v2(ctx: &mut GameContext<'_>, packet: &Packet) {
    for monster in decode_monster_viewport_v2(packet) {
        ctx.world.monsters.spawn(&monster);
    }
}

fn on_monster_viewport_v1(ctx: &mut GameContext<'_>, packet: &Packet) {
    for monster in decode_monster_viewport_v1(packet) {
        ctx.world.monsters.spawn(&monster);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Vec3;
    use crate::game::hero::{HeroCharacter, HeroState};
    use crate::game::items::ItemCatalog;
    use crate::game::state::LiveState;
    use crate::game::world::{HeadlessWorld, SafeZone};
    use crate::protocol::game::character::fixtures::{charstats_packet, sample_stats};
    use crate::protocol::game::items::fixtures::{
        assignment, equipment_packet_c1, equipment_packet_c2, inventory_sync_packet, record,
    };
    use crate::protocol::game::world::MonsterSpawn;
    use bytes::{BufMut, BytesMut};

    struct Fixture {
        state: LiveState,
        hero: HeroCharacter,
        catalog: ItemCatalog,
        world: HeadlessWorld,
        dispatcher: PacketDispatcher,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                state: LiveState::new(),
                hero: HeroCharacter::new(CharClass::DarkKnight),
                catalog: ItemCatalog::builtin(),
                world: HeadlessWorld::default(),
                dispatcher: PacketDispatcher::new(),
            }
        }

        fn initial(&mut self, packet: &Packet, data: &mut ServerData) -> bool {
            let mut ctx = GameContext {
                state: &mut self.state,
                hero: &mut self.hero,
                catalog: &self.catalog,
                world: self.world.world(),
            };
            self.dispatcher.handle_initial_packet(&mut ctx, packet, data)
        }

        fn game(&mut self, packet: &Packet) -> bool {
            let mut ctx = GameContext {
                state: &mut self.state,
                hero: &mut self.hero,
                catalog: &self.catalog,
                world: self.world.world(),
            };
            self.dispatcher.handle_game_packet(&mut ctx, packet)
        }

        fn with_monster(mut self, index: u16) -> Self {
            use crate::game::world::MonsterView;
            self.world.monsters.spawn(&MonsterSpawn {
                index,
                monster_type: 3,
                grid_x: 10,
                grid_y: 20,
                dir: 0,
                hp: 100,
                max_hp: 100,
                state: 0,
            });
            self
        }
    }

    fn damage_packet(monster: u16, damage: u16, damage_type: u8, remaining: u16) -> Packet {
        let mut body = BytesMut::new();
        body.put_u16_le(monster);
        body.put_u16_le(damage);
        body.put_u8(damage_type);
        body.put_u16_le(remaining);
        body.put_u16_le(42);
        Packet::c1(server::DAMAGE, &body)
    }

    fn monster_attack_packet(monster: u16, damage: u16, remaining: f32) -> Packet {
        let mut body = BytesMut::new();
        body.put_u16_le(monster);
        body.put_u16_le(damage);
        body.put_f32_le(remaining);
        Packet::c1(server::MON_ATTACK, &body)
    }

    fn monster_death_packet(monster: u16, xp: u32) -> Packet {
        let mut body = BytesMut::new();
        body.put_u16_le(monster);
        body.put_u16_le(42);
        body.put_u32_le(xp);
        Packet::c1(server::MON_DEATH, &body)
    }

    #[test]
    fn test_initial_char_stats_override_prediction() {
        let mut fx = Fixture::new();
        let mut data = ServerData::default();

        assert!(fx.initial(&charstats_packet(&sample_stats()), &mut data));

        assert_eq!(fx.state.stats.level, 5);
        assert_eq!(fx.state.stats.max_hp, 200);
        assert_eq!(fx.hero.level(), 5);
        assert_eq!(fx.hero.max_hp(), 200);
        assert_eq!(fx.hero.hp(), 150);
        assert_eq!(fx.state.character_name, "Lancelot");
    }

    #[test]
    fn test_critical_damage_spawns_one_number() {
        let mut fx = Fixture::new().with_monster(7);

        assert!(fx.game(&damage_packet(7, 55, 2, 45)));

        let effects = &fx.world.effects;
        assert_eq!(effects.numbers_spawned, 1);
        let (pos, value, kind) = effects.last_number.unwrap();
        assert_eq!(kind, DamageKind::Critical);
        assert_eq!(value, 55);
        assert_eq!(pos, Vec3::new(2000.0, 80.0, 1000.0));
        assert_eq!(effects.blood_bursts, 1);

        let monster = fx.world.monsters.get(7).unwrap();
        assert_eq!(monster.hits, 1);
        assert_eq!(monster.hp, 45);
    }

    #[test]
    fn test_miss_has_no_blood() {
        let mut fx = Fixture::new().with_monster(7);
        fx.game(&damage_packet(7, 0, 0, 100));
        assert_eq!(fx.world.effects.blood_bursts, 0);
        assert_eq!(fx.world.effects.last_number.map(|n| n.2), Some(DamageKind::Miss));
    }

    #[test]
    fn test_damage_to_unknown_monster_does_nothing() {
        let mut fx = Fixture::new();
        assert!(fx.game(&damage_packet(7, 55, 2, 45)));
        assert_eq!(fx.world.effects.numbers_spawned, 0);
    }

    #[test]
    fn test_truncated_and_short_frames_are_skipped() {
        let mut fx = Fixture::new().with_monster(7);
        let full = damage_packet(7, 55, 2, 45);
        let truncated = Packet::from_frame(full.raw.slice(..8)).unwrap();
        fx.game(&truncated);
        assert_eq!(fx.world.effects.numbers_spawned, 0);
        assert_eq!(fx.world.monsters.get(7).unwrap().hits, 0);

        let tiny = Packet::from_frame(vec![0xC2, 0x00, 0x04, server::SKILL_LIST]).unwrap();
        assert!(!fx.game(&tiny));
        assert!(!fx.game(&Packet::c1(0x99, &[1, 2, 3])));
    }

    #[test]
    fn test_initial_burst_collects_spawns() {
        let mut fx = Fixture::new();
        let mut data = ServerData::default();

        let npc = Packet::c2(
            server::NPC_VIEWPORT,
            &[1, 0x80, 0x05, 0x00, 0xF9, 10, 20, 0, 0, 0x30],
        );
        let monster_v1 = Packet::c1(server::MON_VIEWPORT_V1, &[2, 0, 3, 1, 2, 0, 0, 4, 5, 6, 1]);
        let equipment = equipment_packet_c2(&[
            assignment(0, 0, 0, "Sword01.bmd"),
            assignment(3, 8, 0, "ArmorMale01.bmd"),
        ]);

        assert!(fx.initial(&npc, &mut data));
        assert!(fx.initial(&monster_v1, &mut data));
        assert!(fx.initial(&equipment, &mut data));
        // Live-only opcode during the burst.
        assert!(!fx.initial(&damage_packet(1, 1, 1, 1), &mut data));

        assert_eq!(data.npcs.len(), 1);
        assert_eq!(data.npcs[0].index, 5);
        assert_eq!(data.monsters.len(), 2);
        assert_eq!(data.equipment.len(), 2);
        assert!(fx.state.equipment.slot(0).unwrap().equipped);
        assert_eq!(fx.world.appearance.weapon.model, "Sword01.bmd");
        assert_eq!(fx.world.appearance.body_parts[1], "ArmorMale01.bmd");
        assert_eq!(fx.hero.weapon().item_index, 0);
        // Nothing spawned into the world yet.
        assert_eq!(fx.world.monsters.len(), 0);
    }

    #[test]
    fn test_initial_inventory_sync_sets_zen() {
        let mut fx = Fixture::new();
        let mut data = ServerData::default();
        let packet = inventory_sync_packet(1234, &[record(0, 0, 9, 1), record(40, 14, 1, 3)]);

        assert!(fx.initial(&packet, &mut data));
        assert_eq!(fx.state.zen, 1234);
        assert!(fx.state.inventory_synced);
        // Salamander covers 2x3.
        assert_eq!(fx.state.inventory.occupied_count(), 7);
    }

    #[test]
    fn test_monster_attack_hits_hero() {
        let mut fx = Fixture::new().with_monster(4);
        assert!(fx.game(&monster_attack_packet(4, 30, 80.0)));

        assert_eq!(fx.hero.hp(), 80);
        assert_eq!(fx.state.stats.hp, 80);
        assert_eq!(fx.hero.state(), HeroState::HitStun);
        assert_eq!(fx.world.monsters.get(4).unwrap().attacks, 1);
        let (_, value, kind) = fx.world.effects.last_number.unwrap();
        assert_eq!((value, kind), (30, DamageKind::HeroHit));
    }

    #[test]
    fn test_monster_attack_miss_and_kill() {
        let mut fx = Fixture::new().with_monster(4);
        fx.game(&monster_attack_packet(4, 0, 110.0));
        assert_eq!(fx.hero.state(), HeroState::Alive);
        assert_eq!(fx.world.effects.last_number.map(|n| n.2), Some(DamageKind::Miss));

        fx.game(&monster_attack_packet(4, 200, -90.0));
        assert_eq!(fx.hero.hp(), 0);
        assert_eq!(fx.state.stats.hp, 0);
        assert_eq!(fx.hero.state(), HeroState::Dying);
    }

    #[test]
    fn test_monster_attack_nan_hp_kills() {
        let mut fx = Fixture::new().with_monster(4);
        fx.game(&monster_attack_packet(4, 30, f32::NAN));
        assert_eq!(fx.hero.hp(), 0);
        assert_eq!(fx.state.stats.hp, 0);
        assert_eq!(fx.hero.state(), HeroState::Dying);
    }

    #[test]
    fn test_monster_attack_ignored_in_safe_zone() {
        let mut fx = Fixture::new().with_monster(4);
        fx.world.terrain.safe_zone = Some(SafeZone {
            min: Vec3::new(-100.0, 0.0, -100.0),
            max: Vec3::new(100.0, 0.0, 100.0),
        });
        fx.game(&monster_attack_packet(4, 30, 80.0));
        assert_eq!(fx.hero.hp(), fx.hero.max_hp());
        assert_eq!(fx.world.monsters.get(4).unwrap().attacks, 1);
        assert_eq!(fx.world.effects.numbers_spawned, 0);
    }

    #[test]
    fn test_monster_death_grants_experience() {
        let mut fx = Fixture::new().with_monster(4);
        fx.game(&monster_death_packet(4, 500));

        assert!(fx.world.monsters.get(4).unwrap().dying);
        assert!(fx.hero.level() > 1);
        assert_eq!(fx.state.stats.level, fx.hero.level());
        assert_eq!(fx.state.stats.experience, 500);
        assert_eq!(fx.state.stats.max_hp, fx.hero.max_hp());
        let (_, value, kind) = fx.world.effects.last_number.unwrap();
        assert_eq!((value, kind), (500, DamageKind::Experience));

        let spawned = fx.world.effects.numbers_spawned;
        fx.game(&monster_death_packet(4, 0));
        assert_eq!(fx.world.effects.numbers_spawned, spawned);
    }

    #[test]
    fn test_steady_char_stats_shows_heal() {
        let mut fx = Fixture::new();
        let mut stats = sample_stats();
        fx.game(&charstats_packet(&stats));
        // First packet: old HP was 0, no number.
        assert_eq!(fx.world.effects.numbers_spawned, 0);

        stats.life = 190;
        fx.game(&charstats_packet(&stats));
        let (_, value, kind) = fx.world.effects.last_number.unwrap();
        assert_eq!((value, kind), (40, DamageKind::Heal));
        assert_eq!(fx.hero.hp(), 190);
    }

    #[test]
    fn test_stat_alloc_result_reloads_hero() {
        let mut fx = Fixture::new();
        fx.game(&charstats_packet(&sample_stats()));

        let mut body = BytesMut::new();
        body.put_u8(1);
        body.put_u8(0);
        body.put_u16_le(41);
        body.put_u16_le(7);
        body.put_u16_le(200);
        body.put_u16_le(30);
        body.put_u16_le(36);
        fx.game(&Packet::c1(server::STAT_ALLOC_RESULT, &body));

        assert_eq!(fx.state.stats.strength, 41);
        assert_eq!(fx.state.stats.level_up_points, 7);
        assert_eq!(fx.hero.strength(), 41);
        assert_eq!(fx.hero.level_up_points(), 7);
        assert_eq!(fx.hero.max_ag(), 36);
    }

    #[test]
    fn test_drop_spawn_and_pickup() {
        let mut fx = Fixture::new();
        fx.world.terrain.height = 25.0;

        let mut body = BytesMut::new();
        body.put_u16_le(300);
        body.put_i16_le(14 * 32 + 1);
        body.put_u8(1);
        body.put_u8(0);
        body.put_f32_le(1500.0);
        body.put_f32_le(900.0);
        fx.game(&Packet::c1(server::DROP_SPAWN, &body));

        let item = fx.state.active_ground_items().next().copied().unwrap();
        assert_eq!(item.drop_index, 300);
        assert_eq!(item.position, Vec3::new(1500.0, 125.0, 900.0));

        // Failed pickup keeps it.
        fx.game(&Packet::c1(server::PICKUP_RESULT, &[0x2C, 0x01, 0, 0x21, 0x01, 1, 0]));
        assert_eq!(fx.state.active_ground_items().count(), 1);
        fx.game(&Packet::c1(server::PICKUP_RESULT, &[0x2C, 0x01, 1, 0x21, 0x01, 1, 0]));
        assert_eq!(fx.state.active_ground_items().count(), 0);
    }

    #[test]
    fn test_steady_equipment_c1_and_unequip() {
        let mut fx = Fixture::new();
        fx.game(&equipment_packet_c1(&[
            assignment(0, 0, 9, "Sword10.bmd"),
            assignment(2, 7, 0, "HelmMale01.bmd"),
        ]));
        assert!(fx.hero.weapon().two_handed);
        assert_eq!(fx.world.appearance.body_parts[0], "HelmMale01.bmd");
        let with_helm = fx.hero.defense();

        fx.game(&equipment_packet_c1(&[assignment(2, item_category::NONE, 0, "")]));
        assert_eq!(fx.world.appearance.body_parts[0], "");
        assert!(!fx.state.equipment.slot(2).unwrap().equipped);
        assert_eq!(fx.hero.defense(), with_helm - 34);
    }

    #[test]
    fn test_steady_inventory_sync_replaces_grid() {
        let mut fx = Fixture::new();
        fx.game(&inventory_sync_packet(10, &[record(0, 0, 0, 1)]));
        assert_eq!(fx.state.inventory.occupied_count(), 2);

        fx.game(&inventory_sync_packet(20, &[record(5, 14, 1, 2)]));
        assert_eq!(fx.state.inventory.occupied_count(), 1);
        assert_eq!(fx.state.zen, 20);
    }

    #[test]
    fn test_truncated_c2_equipment_applies_whole_entries() {
        let mut fx = Fixture::new();
        let full = equipment_packet_c2(&[
            assignment(0, 0, 9, "Sword10.bmd"),
            assignment(2, 7, 0, "HelmMale01.bmd"),
        ]);
        let cut = full.len() - 10;
        let truncated = Packet::from_frame(full.raw.slice(..cut)).unwrap();

        assert!(fx.game(&truncated));
        assert!(fx.hero.weapon().two_handed);
        assert!(fx.state.equipment.slot(0).unwrap().equipped);
        assert!(!fx.state.equipment.slot(2).unwrap().equipped);
        assert_eq!(fx.world.appearance.body_parts[0], "");
    }

    #[test]
    fn test_steady_inventory_sync_skips_overlap() {
        let mut fx = Fixture::new();
        // Light Saber (2x4) at 0 covers slot 9, so the Kris is dropped.
        fx.game(&inventory_sync_packet(
            5,
            &[record(0, 0, 10, 1), record(9, 0, 0, 1), record(30, 14, 1, 2)],
        ));

        assert!(fx.state.inventory_synced);
        assert_eq!(fx.state.zen, 5);
        assert_eq!(fx.state.inventory.occupied_count(), 9);
        assert_eq!(fx.state.inventory.cell(9).unwrap().def_index, 10);
        assert!(!fx.state.inventory.cell(9).unwrap().primary);
    }

    #[test]
    fn test_shop_list_needs_open_shop() {
        let mut fx = Fixture::new();
        let mut body = BytesMut::new();
        body.put_u8(1);
        body.put_i16_le(14 * 32 + 1);
        body.put_u8(0);
        body.put_u32_le(80);
        let packet = Packet::c2(server::SHOP_LIST, &body);

        fx.game(&packet);
        assert!(fx.state.shop.is_none());

        fx.state.open_shop();
        fx.game(&packet);
        assert_eq!(fx.state.shop.as_ref().map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_sell_result_updates_zen() {
        let mut fx = Fixture::new();
        fx.game(&Packet::c1(server::SHOP_SELL_RESULT, &[1, 4, 0xE8, 0x03, 0, 0]));
        assert_eq!(fx.state.zen, 1000);
        fx.game(&Packet::c1(server::SHOP_SELL_RESULT, &[0, 4, 0x01, 0, 0, 0]));
        assert_eq!(fx.state.zen, 1000);
    }

    #[test]
    fn test_moves_convert_grid_to_world() {
        let mut fx = Fixture::new().with_monster(4);
        fx.game(&Packet::c1(server::MON_MOVE, &[4, 0, 3, 6, 1]));
        let monster = fx.world.monsters.get(4).unwrap();
        assert_eq!(monster.position, Vec3::new(600.0, 0.0, 300.0));
        assert!(monster.chasing);
    }
}
