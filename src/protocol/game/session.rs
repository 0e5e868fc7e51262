//! Game server transport: a framed socket with an outbound queue.
//!
//! Sends are queued and only hit the socket on [`ServerConnection::flush`],
//! so a tick can batch everything it produced into one write.

use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::common::error::{ConnectionError, ConnectionResult};
use crate::common::reconnect::ReconnectConfig;
use crate::common::types::{DefIndex, ObjectIndex};
use crate::protocol::game::connector::{new_game_connection, GameConnection};
use crate::protocol::game::packets::*;
use crate::protocol::packets::Packet;

pub struct ServerConnection<S> {
    connection: GameConnection<S>,
    outbound: Vec<Packet>,
    connected: bool,
}

impl ServerConnection<TcpStream> {
    /// Open a TCP connection with Nagle disabled.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> ConnectionResult<Self> {
        info!("Connecting to game server at {}:{}", host, port);

        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ConnectionError::Timeout {
                secs: timeout.as_secs(),
            })?
            .map_err(|e| ConnectionError::ConnectFailed {
                host: host.to_string(),
                port,
                source: e,
            })?;
        stream.set_nodelay(true)?;

        info!("Connected to game server");
        Ok(Self::from_stream(stream))
    }

    /// Connect, retrying with exponential backoff until attempts run out.
    pub async fn connect_with_retry(
        host: &str,
        port: u16,
        timeout: Duration,
        reconnect: &ReconnectConfig,
    ) -> ConnectionResult<Self> {
        let mut backoff = reconnect.backoff();

        loop {
            match Self::connect(host, port, timeout).await {
                Ok(conn) => return Ok(conn),
                Err(e) => match backoff.next() {
                    Some(delay) => {
                        warn!("{}; retrying in {:.1} seconds", e, delay.as_secs_f64());
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
            }
        }
    }
}

impl<S> ServerConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn from_stream(stream: S) -> Self {
        Self {
            connection: new_game_connection(stream),
            outbound: Vec::new(),
            connected: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Hand every frame that is already complete to `on_packet` without
    /// waiting on the socket. Returns how many were delivered.
    pub fn poll(&mut self, mut on_packet: impl FnMut(Packet)) -> ConnectionResult<usize> {
        if !self.connected {
            return Err(ConnectionError::NotConnected);
        }

        let mut delivered = 0;
        while let Some(next) = self.connection.next().now_or_never() {
            match next {
                Some(Ok(packet)) => {
                    on_packet(packet);
                    delivered += 1;
                }
                Some(Err(e)) => {
                    self.connected = false;
                    return Err(e.into());
                }
                None => {
                    self.connected = false;
                    return Err(ConnectionError::ConnectionClosed);
                }
            }
        }
        Ok(delivered)
    }

    /// Wait for the next frame. `Ok(None)` means the server closed the
    /// connection.
    pub async fn recv(&mut self) -> ConnectionResult<Option<Packet>> {
        if !self.connected {
            return Err(ConnectionError::NotConnected);
        }

        match self.connection.next().await {
            Some(Ok(packet)) => Ok(Some(packet)),
            Some(Err(e)) => {
                self.connected = false;
                Err(e.into())
            }
            None => {
                self.connected = false;
                Ok(None)
            }
        }
    }

    /// Queue a message for the next flush.
    pub fn send(&mut self, msg: impl Into<Packet>) {
        let packet = msg.into();
        debug!("Queued 0x{:02X} ({} bytes)", packet.opcode, packet.len());
        self.outbound.push(packet);
    }

    pub fn pending(&self) -> usize {
        self.outbound.len()
    }

    /// Write every queued message to the socket.
    pub async fn flush(&mut self) -> ConnectionResult<()> {
        if self.outbound.is_empty() {
            return Ok(());
        }
        if !self.connected {
            return Err(ConnectionError::NotConnected);
        }

        for packet in self.outbound.drain(..) {
            self.connection.feed(packet).await?;
        }
        self.connection.flush().await?;
        Ok(())
    }

    /// Flush what is queued and close the write half.
    pub async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        if let Err(e) = self.flush().await {
            debug!("Dropping queued messages on disconnect: {}", e);
        }
        if let Err(e) = self.connection.get_mut().shutdown().await {
            debug!("Socket shutdown failed: {}", e);
        }
        self.outbound.clear();
        self.connected = false;

        let skipped = self.connection.codec().skipped();
        if skipped > 0 {
            warn!("Discarded {} unframed bytes this session", skipped);
        }
        info!("Disconnected from game server");
    }

    pub fn send_precise_position(&mut self, world_x: f32, world_z: f32) {
        self.send(PrecisePosition { world_x, world_z });
    }

    pub fn send_attack(&mut self, monster_index: ObjectIndex) {
        self.send(Attack { monster_index });
    }

    pub fn send_skill_attack(&mut self, monster_index: ObjectIndex, skill_id: u8) {
        self.send(SkillAttack {
            monster_index,
            skill_id,
        });
    }

    pub fn send_pickup(&mut self, drop_index: u16) {
        self.send(Pickup { drop_index });
    }

    pub fn send_char_save(&mut self, save: CharSave) {
        self.send(save);
    }

    pub fn send_equip(&mut self, equip: Equip) {
        self.send(equip);
    }

    pub fn send_unequip(&mut self, character_id: u16, slot: u8) {
        self.send(Equip::unequip(character_id, slot));
    }

    pub fn send_stat_alloc(&mut self, stat_type: u8) {
        self.send(StatAlloc { stat_type });
    }

    pub fn send_inventory_move(&mut self, from_slot: u8, to_slot: u8) {
        self.send(InventoryMove { from_slot, to_slot });
    }

    pub fn send_item_use(&mut self, slot: u8) {
        self.send(ItemUse { slot });
    }

    pub fn send_drop_item(&mut self, slot: u8) {
        self.send(DropItem { slot });
    }

    pub fn send_grid_move(&mut self, grid_x: u8, grid_y: u8) {
        self.send(GridMove { grid_x, grid_y });
    }

    pub fn send_shop_open(&mut self, npc_type: u16) {
        self.send(ShopOpen { npc_type });
    }

    pub fn send_shop_buy(&mut self, def_index: DefIndex, item_level: u8, quantity: u8) {
        self.send(ShopBuy::new(def_index, item_level, quantity));
    }

    pub fn send_shop_sell(&mut self, bag_slot: u8) {
        self.send(ShopSell { bag_slot });
    }
}
