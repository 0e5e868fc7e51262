//! Session driver: connect, collect the initial burst, then run the world.

use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use tracing::{debug, info, warn};

use crate::common::reconnect::ReconnectConfig;
use crate::common::resources::CharClass;
use crate::common::types::{ObjectIndex, Vec3};
use crate::config::types::Config;
use crate::game::dispatcher::{apply_equipment, PacketDispatcher};
use crate::game::hero::{AttackState, HeroCharacter};
use crate::game::inventory::{EquipRejection, Wearer};
use crate::game::items::ItemCatalog;
use crate::game::state::{LiveState, ServerData};
use crate::game::world::{GameContext, HeadlessWorld, MonsterView, NpcView, Terrain};
use crate::protocol::game::items::EquipAssignment;
use crate::protocol::game::ServerConnection;
use crate::protocol::packets::Packet;

/// Where the hero comes back when no safe zone is known.
const DEFAULT_RESPAWN: (f32, f32) = (12500.0, 12500.0);

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Shutdown was requested; the character was saved.
    Shutdown,
    /// The server closed the connection.
    Disconnected,
}

pub struct GameClient {
    config: Config,
    catalog: ItemCatalog,
    dispatcher: PacketDispatcher,
    state: LiveState,
    hero: HeroCharacter,
    world: HeadlessWorld,
    server_data: ServerData,
}

impl GameClient {
    pub fn new(config: Config, catalog: ItemCatalog) -> Self {
        let hero = HeroCharacter::new(Self::configured_class(&config));
        let mut client = Self {
            config,
            catalog,
            dispatcher: PacketDispatcher::new(),
            state: LiveState::new(),
            hero,
            world: HeadlessWorld::default(),
            server_data: ServerData::default(),
        };
        client.reset();
        client
    }

    fn configured_class(config: &Config) -> CharClass {
        CharClass::from_id(config.character.class).unwrap_or_else(|| {
            warn!("Unknown class code {}, playing a Dark Knight", config.character.class);
            CharClass::DarkKnight
        })
    }

    pub fn state(&self) -> &LiveState {
        &self.state
    }

    pub fn hero(&self) -> &HeroCharacter {
        &self.hero
    }

    pub fn world(&self) -> &HeadlessWorld {
        &self.world
    }

    pub fn server_data(&self) -> &ServerData {
        &self.server_data
    }

    /// Forget everything from a previous session.
    fn reset(&mut self) {
        self.state = LiveState::new();
        self.state.character_id = self.config.character.id;
        if let Some(name) = &self.config.character.name {
            self.state.character_name = name.clone();
        }
        self.hero = HeroCharacter::new(Self::configured_class(&self.config));
        self.world = HeadlessWorld::default();
        self.server_data = ServerData::default();
    }

    /// Connect to the configured server and play one session.
    pub async fn run(&mut self, shutdown_rx: &mut watch::Receiver<bool>) -> Result<SessionEnd> {
        let server = &self.config.server;
        let reconnect = self
            .config
            .reconnect
            .as_ref()
            .map(ReconnectConfig::from)
            .unwrap_or_default();

        let mut connection = ServerConnection::connect_with_retry(
            &server.host,
            server.port,
            Duration::from_secs(server.connect_timeout_secs),
            &reconnect,
        )
        .await?;

        self.reset();
        self.handle_connection(&mut connection, shutdown_rx).await
    }

    pub async fn handle_connection<S>(
        &mut self,
        connection: &mut ServerConnection<S>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let session = &self.config.session;
        let burst_window = Duration::from_millis(session.burst_window_millis);
        let tick_period = Duration::from_millis(session.tick_millis);

        // Loading: the world does not exist yet, spawns are only collected.
        let mut data = ServerData::default();
        let burst = tokio::time::sleep(burst_window);
        tokio::pin!(burst);

        loop {
            tokio::select! {
                packet = connection.recv() => {
                    match packet? {
                        Some(packet) => self.dispatch_initial(&packet, &mut data),
                        None => {
                            warn!("Server closed the connection while loading");
                            return Ok(SessionEnd::Disconnected);
                        }
                    }
                }

                _ = &mut burst => break,

                changed = shutdown_rx.changed() => {
                    let stop = changed.is_err() || *shutdown_rx.borrow();
                    if stop {
                        return self.handle_shutdown(connection).await;
                    }
                }
            }
        }

        self.enter_world(data);

        let mut ticker = tokio::time::interval(tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                packet = connection.recv() => {
                    match packet? {
                        Some(packet) => self.dispatch_game(&packet),
                        None => {
                            warn!("Server closed the connection");
                            return Ok(SessionEnd::Disconnected);
                        }
                    }
                }

                now = ticker.tick() => {
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;
                    self.on_tick(connection, dt);
                    connection.flush().await?;
                }

                changed = shutdown_rx.changed() => {
                    let stop = changed.is_err() || *shutdown_rx.borrow();
                    if stop {
                        return self.handle_shutdown(connection).await;
                    }
                }
            }
        }
    }

    fn context(&mut self) -> (&PacketDispatcher, GameContext<'_>) {
        let ctx = GameContext {
            state: &mut self.state,
            hero: &mut self.hero,
            catalog: &self.catalog,
            world: self.world.world(),
        };
        (&self.dispatcher, ctx)
    }

    fn dispatch_initial(&mut self, packet: &Packet, data: &mut ServerData) {
        let (dispatcher, mut ctx) = self.context();
        dispatcher.handle_initial_packet(&mut ctx, packet, data);
    }

    fn dispatch_game(&mut self, packet: &Packet) {
        let (dispatcher, mut ctx) = self.context();
        dispatcher.handle_game_packet(&mut ctx, packet);
    }

    /// Copy the collected spawns into the world and go live.
    fn enter_world(&mut self, mut data: ServerData) {
        for npc in &data.npcs {
            self.world.npcs.spawn(npc);
        }
        for monster in &data.monsters {
            self.world.monsters.spawn(monster);
        }
        data.connected = true;

        info!(
            "Entered world: {} NPCs, {} monsters, {} equipped",
            data.npcs.len(),
            data.monsters.len(),
            data.equipment.len()
        );
        self.server_data = data;
    }

    /// One fixed simulation step. Outbound messages are only queued.
    fn on_tick<S>(&mut self, connection: &mut ServerConnection<S>, dt: f32)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let in_safe_zone = self.world.terrain.in_safe_zone(self.hero.position());
        self.hero.update(dt, in_safe_zone);

        if self.hero.check_attack_hit() {
            if let Some(target) = self.hero.attack_target() {
                match self.hero.active_skill() {
                    0 => connection.send_attack(target),
                    skill => connection.send_skill_attack(target, skill),
                }
            }
        }

        // Plain attacks keep swinging at a live target; skills need a new
        // trigger.
        if self.hero.attack_state() == AttackState::None && self.hero.active_skill() == 0 {
            if let Some(target) = self.hero.attack_target() {
                let position = self
                    .world
                    .monsters
                    .position(target)
                    .filter(|_| self.world.monsters.is_alive(target));
                match position {
                    Some(position) => self.hero.attack_monster(target, position),
                    None => {
                        debug!("Target {} is gone, stopping attack", target);
                        self.hero.cancel_attack();
                    }
                }
            }
        }

        if self.hero.ready_to_respawn() {
            let spawn = self.respawn_point();
            self.hero.respawn(spawn);
            if self.state.stats_received {
                // Full life tells the server the hero is alive again.
                self.state.stats.hp = self.state.stats.max_hp;
                connection.send_char_save(self.state.char_save());
            }
        }
    }

    fn respawn_point(&self) -> Vec3 {
        let terrain = &self.world.terrain;
        let (x, z) = terrain
            .safe_zone
            .map(|zone| ((zone.min.x + zone.max.x) / 2.0, (zone.min.z + zone.max.z) / 2.0))
            .unwrap_or(DEFAULT_RESPAWN);
        Vec3::new(x, terrain.height_at(x, z), z)
    }

    /// Start a plain auto-attack against a tracked monster.
    pub fn engage(&mut self, monster: ObjectIndex) -> bool {
        if !self.world.monsters.is_alive(monster) {
            return false;
        }
        match self.world.monsters.position(monster) {
            Some(position) => {
                self.hero.attack_monster(monster, position);
                true
            }
            None => false,
        }
    }

    /// Wear the bag item covering `bag_slot` and queue the equip messages.
    /// Refused until the server has sent a full inventory.
    pub fn equip_from_bag<S>(
        &mut self,
        connection: &mut ServerConnection<S>,
        bag_slot: usize,
        slot: u8,
    ) -> Result<(), EquipRejection>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if !self.state.inventory_synced {
            return Err(EquipRejection::NotSynced);
        }

        let state = &mut self.state;
        let wearer = Wearer {
            stats: &state.stats,
            class: self.hero.class(),
            character_id: state.character_id,
        };
        let messages =
            state
                .equipment
                .equip_from_bag(&mut state.inventory, &self.catalog, wearer, bag_slot, slot)?;

        let mut changed = Vec::with_capacity(messages.len());
        for message in messages {
            let model = state
                .equipment
                .slot(message.slot)
                .map(|worn| worn.model.clone())
                .unwrap_or_default();
            changed.push(EquipAssignment {
                slot: message.slot,
                category: message.category,
                item_index: message.item_index,
                item_level: message.item_level,
                model,
            });
            connection.send_equip(message);
        }

        let (_, mut ctx) = self.context();
        apply_equipment(&mut ctx, &changed);
        Ok(())
    }

    async fn handle_shutdown<S>(&mut self, connection: &mut ServerConnection<S>) -> Result<SessionEnd>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        info!("Shutdown requested, saving character");
        if self.state.stats_received {
            connection.send_char_save(self.state.char_save());
        } else {
            debug!("No stats received yet, skipping save");
        }
        connection.flush().await?;
        connection.disconnect().await;
        Ok(SessionEnd::Shutdown)
    }
}
