//! Client sync payloads.
//!
//! Difficulty changes drained from the store are coalesced (one message per
//! player or dimension, carrying the latest value) and addressed to the
//! players who should see them:
//!
//! - a player's own value goes to that player and to everyone in the same
//!   dimension within `sync_radius`
//! - a dimension's value goes to everyone in that dimension
//!
//! Framing and delivery belong to the host; messages encode to JSON.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use scaling_core::config::PlayerHealthConfig;
use scaling_core::error::{Result, ScalingError};
use scaling_core::store::{DifficultyChange, DifficultyTarget};
use scaling_core::types::{DimensionId, PlayerId};

use crate::components::PlayerSession;

/// A message for one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    /// A player's difficulty and max health.
    PlayerDifficulty {
        /// Whose value this is.
        player: PlayerId,
        /// Current difficulty.
        difficulty: f64,
        /// Current max health.
        max_health: f64,
    },
    /// A dimension's difficulty.
    DimensionDifficulty {
        /// Which dimension.
        dimension: DimensionId,
        /// Current difficulty.
        difficulty: f64,
    },
}

impl SyncMessage {
    /// Encode as JSON.
    ///
    /// # Errors
    /// Returns `ScalingError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ScalingError::Serialization(e.to_string()))
    }

    /// Decode from JSON.
    ///
    /// # Errors
    /// Returns `ScalingError::Serialization` on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScalingError::Serialization(e.to_string()))
    }
}

/// A message addressed to one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPacket {
    /// Who receives it.
    pub recipient: PlayerId,
    /// What they receive.
    pub message: SyncMessage,
}

/// Address coalesced `changes` to the connected players in `sessions`.
///
/// Packets are ordered by target (players, then dimensions) and recipient,
/// so the output is deterministic.
#[must_use]
pub fn packets_for_changes(
    changes: &[DifficultyChange],
    sessions: &HashMap<PlayerId, PlayerSession>,
    health: &PlayerHealthConfig,
    sync_radius: f64,
) -> Vec<SyncPacket> {
    let mut players = BTreeMap::new();
    let mut dimensions = BTreeMap::new();
    for change in changes {
        match &change.target {
            DifficultyTarget::Player(p) => {
                players.insert(*p, change.new);
            }
            DifficultyTarget::Dimension(d) => {
                dimensions.insert(d.clone(), change.new);
            }
        }
    }

    let mut recipients: Vec<_> = sessions.keys().copied().collect();
    recipients.sort_unstable();

    let mut packets = Vec::new();
    for (player, difficulty) in players {
        // A player who left before the flush has nobody to tell about.
        let Some(source) = sessions.get(&player) else {
            continue;
        };
        let message = SyncMessage::PlayerDifficulty {
            player,
            difficulty,
            max_health: source.health.max_health(health),
        };
        for recipient in &recipients {
            let Some(session) = sessions.get(recipient) else {
                continue;
            };
            let nearby = session.dimension == source.dimension
                && session.position.distance(&source.position) <= sync_radius;
            if *recipient == player || nearby {
                packets.push(SyncPacket {
                    recipient: *recipient,
                    message: message.clone(),
                });
            }
        }
    }

    for (dimension, difficulty) in dimensions {
        let message = SyncMessage::DimensionDifficulty {
            dimension: dimension.clone(),
            difficulty,
        };
        packets.extend(
            recipients
                .iter()
                .filter(|r| sessions.get(*r).is_some_and(|s| s.dimension == dimension))
                .map(|r| SyncPacket {
                    recipient: *r,
                    message: message.clone(),
                }),
        );
    }

    packets
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
