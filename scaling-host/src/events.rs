//! Game events that drive the difficulty rule.
//!
//! The host engine converts its own callbacks into these events (see
//! [`crate::hooks`]) and feeds them to [`crate::rule::handle_event`].

use scaling_core::items::HeartItem;
use scaling_core::types::{DimensionId, EntityCategory, GameTimestamp, PlayerId, Position};

/// A game event relevant to difficulty.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A player connected.
    PlayerJoined {
        player: PlayerId,
        dimension: DimensionId,
        position: Position,
        timestamp: GameTimestamp,
    },

    /// A player disconnected.
    PlayerLeft {
        player: PlayerId,
        timestamp: GameTimestamp,
    },

    /// A player moved (or changed dimension).
    PlayerMoved {
        player: PlayerId,
        dimension: DimensionId,
        position: Position,
        timestamp: GameTimestamp,
    },

    /// A player entered another biome.
    BiomeChanged {
        player: PlayerId,
        biome: Option<String>,
        timestamp: GameTimestamp,
    },

    /// A player killed an entity.
    EntityKilled {
        killer: PlayerId,
        category: EntityCategory,
        entity_type: Option<String>,
        timestamp: GameTimestamp,
    },

    /// A player died.
    PlayerDied {
        player: PlayerId,
        timestamp: GameTimestamp,
    },

    /// A player slept through the night.
    PlayerSlept {
        player: PlayerId,
        timestamp: GameTimestamp,
    },

    /// A player consumed a heart container.
    HeartContainerUsed {
        player: PlayerId,
        timestamp: GameTimestamp,
    },

    /// A player used a cursed, enchanted or chance heart.
    HeartItemUsed {
        player: PlayerId,
        item: HeartItem,
        timestamp: GameTimestamp,
    },

    /// The server ticked.
    Tick { timestamp: GameTimestamp },
}

impl GameEvent {
    /// Get the timestamp of this event.
    #[must_use]
    pub fn timestamp(&self) -> &GameTimestamp {
        match self {
            Self::PlayerJoined { timestamp, .. }
            | Self::PlayerLeft { timestamp, .. }
            | Self::PlayerMoved { timestamp, .. }
            | Self::BiomeChanged { timestamp, .. }
            | Self::EntityKilled { timestamp, .. }
            | Self::PlayerDied { timestamp, .. }
            | Self::PlayerSlept { timestamp, .. }
            | Self::HeartContainerUsed { timestamp, .. }
            | Self::HeartItemUsed { timestamp, .. }
            | Self::Tick { timestamp } => timestamp,
        }
    }

    /// The player this event is about, if any.
    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::PlayerJoined { player, .. }
            | Self::PlayerLeft { player, .. }
            | Self::PlayerMoved { player, .. }
            | Self::BiomeChanged { player, .. }
            | Self::PlayerDied { player, .. }
            | Self::PlayerSlept { player, .. }
            | Self::HeartContainerUsed { player, .. }
            | Self::HeartItemUsed { player, .. } => Some(*player),
            Self::EntityKilled { killer, .. } => Some(*killer),
            Self::Tick { .. } => None,
        }
    }

    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::PlayerMoved { .. } => "player_moved",
            Self::BiomeChanged { .. } => "biome_changed",
            Self::EntityKilled { .. } => "entity_killed",
            Self::PlayerDied { .. } => "player_died",
            Self::PlayerSlept { .. } => "player_slept",
            Self::HeartContainerUsed { .. } => "heart_container_used",
            Self::HeartItemUsed { .. } => "heart_item_used",
            Self::Tick { .. } => "tick",
        }
    }
}
