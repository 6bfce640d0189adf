//! Integration hooks for the host engine's callbacks.
//!
//! Each hook turns one engine callback into a [`GameEvent`]. Entity
//! categories arrive as the engine's own strings and are parsed here, so an
//! unknown category reaches the mutator as `Unrecognized` instead of being
//! dropped. Item ids are matched the same way in [`on_item_used`].

use scaling_core::items::HeartItem;
use scaling_core::types::{DimensionId, EntityCategory, GameTimestamp, PlayerId, Position};

use crate::events::GameEvent;

/// Create a join event from the engine's login callback.
#[must_use]
pub fn on_player_join(
    player: PlayerId,
    dimension: DimensionId,
    position: Position,
    timestamp: GameTimestamp,
) -> GameEvent {
    GameEvent::PlayerJoined {
        player,
        dimension,
        position,
        timestamp,
    }
}

/// Create a leave event from the engine's logout callback.
#[must_use]
pub fn on_player_leave(player: PlayerId, timestamp: GameTimestamp) -> GameEvent {
    GameEvent::PlayerLeft { player, timestamp }
}

/// Create a movement event from the engine's position update.
#[must_use]
pub fn on_player_moved(
    player: PlayerId,
    dimension: DimensionId,
    position: Position,
    timestamp: GameTimestamp,
) -> GameEvent {
    GameEvent::PlayerMoved {
        player,
        dimension,
        position,
        timestamp,
    }
}

/// Create a biome event from the engine's position update.
#[must_use]
pub fn on_biome_changed(
    player: PlayerId,
    biome: Option<&str>,
    timestamp: GameTimestamp,
) -> GameEvent {
    GameEvent::BiomeChanged {
        player,
        biome: biome.map(str::to_string),
        timestamp,
    }
}

/// Create a kill event from the engine's death callback.
///
/// `category` is the engine's creature classification, e.g. `"monster"`.
#[must_use]
pub fn on_entity_killed(
    killer: PlayerId,
    category: &str,
    entity_type: Option<&str>,
    timestamp: GameTimestamp,
) -> GameEvent {
    GameEvent::EntityKilled {
        killer,
        category: EntityCategory::parse(category),
        entity_type: entity_type.map(str::to_string),
        timestamp,
    }
}

/// Create a death event.
#[must_use]
pub fn on_player_died(player: PlayerId, timestamp: GameTimestamp) -> GameEvent {
    GameEvent::PlayerDied { player, timestamp }
}

/// Create a sleep event (the player woke after sleeping through the night).
#[must_use]
pub fn on_player_slept(player: PlayerId, timestamp: GameTimestamp) -> GameEvent {
    GameEvent::PlayerSlept { player, timestamp }
}

/// Create a heart-container event from the engine's item-use callback.
#[must_use]
pub fn on_heart_container_used(player: PlayerId, timestamp: GameTimestamp) -> GameEvent {
    GameEvent::HeartContainerUsed { player, timestamp }
}

/// Create a heart item event.
#[must_use]
pub fn on_heart_item_used(
    player: PlayerId,
    item: HeartItem,
    timestamp: GameTimestamp,
) -> GameEvent {
    GameEvent::HeartItemUsed {
        player,
        item,
        timestamp,
    }
}

/// Map the engine's item-use callback to an event. Returns `None` for items
/// that do not affect difficulty or health.
#[must_use]
pub fn on_item_used(
    player: PlayerId,
    item_id: &str,
    timestamp: GameTimestamp,
) -> Option<GameEvent> {
    let name = item_id.rsplit(':').next().unwrap_or(item_id);
    if matches!(name, "heart_crystal" | "heart_container") {
        return Some(on_heart_container_used(player, timestamp));
    }
    HeartItem::parse(item_id).map(|item| on_heart_item_used(player, item, timestamp))
}

/// Create a tick event.
#[must_use]
pub fn on_tick(tick: u64) -> GameEvent {
    GameEvent::Tick {
        timestamp: GameTimestamp::now(tick),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_hook_parses_category() {
        let player = PlayerId::new();
        let event = on_entity_killed(player, "Monster", Some("minecraft:zombie"), GameTimestamp::now(5));
        match event {
            GameEvent::EntityKilled {
                killer,
                category,
                entity_type,
                ..
            } => {
                assert_eq!(killer, player);
                assert_eq!(category, EntityCategory::Hostile);
                assert_eq!(entity_type.as_deref(), Some("minecraft:zombie"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_category_is_kept() {
        let event = on_entity_killed(PlayerId::new(), "ambient", None, GameTimestamp::now(0));
        assert!(matches!(
            event,
            GameEvent::EntityKilled {
                category: EntityCategory::Unrecognized(_),
                ..
            }
        ));
    }

    #[test]
    fn item_ids_map_to_events() {
        let player = PlayerId::new();
        let now = GameTimestamp::now(9);
        assert!(matches!(
            on_item_used(player, "scalinghealth:heart_crystal", now),
            Some(GameEvent::HeartContainerUsed { .. })
        ));
        match on_item_used(player, "scalinghealth:chance_heart", now) {
            Some(GameEvent::HeartItemUsed { item, .. }) => assert_eq!(item, HeartItem::Chance),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(on_item_used(player, "minecraft:apple", now).is_none());

        let biome = on_biome_changed(player, Some("minecraft:desert"), now);
        assert_eq!(biome.kind(), "biome_changed");
        assert_eq!(biome.player(), Some(player));
    }

    #[test]
    fn events_report_player_and_tick() {
        let player = PlayerId::new();
        let event = on_player_died(player, GameTimestamp::now(77));
        assert_eq!(event.player(), Some(player));
        assert_eq!(event.timestamp().tick, 77);
        assert_eq!(on_tick(3).player(), None);
        assert_eq!(on_tick(3).kind(), "tick");
    }
}
