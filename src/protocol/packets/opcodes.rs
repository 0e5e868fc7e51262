//! MU protocol opcodes used by the game session.

/// Server -> client opcodes.
pub mod server {
    /// C2: NPCs entering the viewport
    pub const NPC_VIEWPORT: u8 = 0x13;
    /// C1: legacy monster viewport, 5-byte entries
    pub const MON_VIEWPORT_V1: u8 = 0x1F;
    /// C1 or C2: equipped items
    pub const EQUIPMENT: u8 = 0x24;
    /// C1: full character stats
    pub const CHARSTATS: u8 = 0x25;
    pub const DAMAGE: u8 = 0x29;
    pub const MON_DEATH: u8 = 0x2A;
    pub const DROP_SPAWN: u8 = 0x2B;
    pub const PICKUP_RESULT: u8 = 0x2D;
    pub const DROP_REMOVE: u8 = 0x2E;
    pub const MON_ATTACK: u8 = 0x2F;
    pub const MON_RESPAWN: u8 = 0x30;
    /// C2: items for sale at the open shop
    pub const SHOP_LIST: u8 = 0x31;
    pub const SHOP_BUY_RESULT: u8 = 0x32;
    /// C2: monster viewport with HP and state, 12-byte entries
    pub const MON_VIEWPORT_V2: u8 = 0x34;
    pub const MON_MOVE: u8 = 0x35;
    /// C2: full inventory resync
    pub const INV_SYNC: u8 = 0x36;
    pub const STAT_ALLOC_RESULT: u8 = 0x38;
    pub const NPC_MOVE: u8 = 0x3A;
    pub const SHOP_SELL_RESULT: u8 = 0x3B;
    /// C2: learned skills
    pub const SKILL_LIST: u8 = 0x41;
}

/// Client -> server opcodes.
pub mod client {
    pub const CHARSAVE: u8 = 0x26;
    pub const EQUIP: u8 = 0x27;
    pub const ATTACK: u8 = 0x28;
    pub const PICKUP: u8 = 0x2C;
    pub const STAT_ALLOC: u8 = 0x37;
    pub const INV_MOVE: u8 = 0x39;
    pub const SHOP_OPEN: u8 = 0x3C;
    pub const SHOP_BUY: u8 = 0x3D;
    pub const SHOP_SELL: u8 = 0x3E;
    pub const ITEM_USE: u8 = 0x3F;
    pub const DROP_ITEM: u8 = 0x40;
    pub const SKILL_ATTACK: u8 = 0x42;
    pub const MOVE: u8 = 0xD4;
    pub const PRECISE_POS: u8 = 0xD7;
}

/// Get a human-readable name for a server opcode.
pub fn opcode_name(opcode: u8) -> &'static str {
    use server::*;
    match opcode {
        NPC_VIEWPORT => "NPC_VIEWPORT",
        MON_VIEWPORT_V1 => "MON_VIEWPORT_V1",
        EQUIPMENT => "EQUIPMENT",
        CHARSTATS => "CHARSTATS",
        DAMAGE => "DAMAGE",
        MON_DEATH => "MON_DEATH",
        DROP_SPAWN => "DROP_SPAWN",
        PICKUP_RESULT => "PICKUP_RESULT",
        DROP_REMOVE => "DROP_REMOVE",
        MON_ATTACK => "MON_ATTACK",
        MON_RESPAWN => "MON_RESPAWN",
        SHOP_LIST => "SHOP_LIST",
        SHOP_BUY_RESULT => "SHOP_BUY_RESULT",
        MON_VIEWPORT_V2 => "MON_VIEWPORT_V2",
        MON_MOVE => "MON_MOVE",
        INV_SYNC => "INV_SYNC",
        STAT_ALLOC_RESULT => "STAT_ALLOC_RESULT",
        NPC_MOVE => "NPC_MOVE",
        SHOP_SELL_RESULT => "SHOP_SELL_RESULT",
        SKILL_LIST => "SKILL_LIST",
        _ => "UNKNOWN",
    }
}
