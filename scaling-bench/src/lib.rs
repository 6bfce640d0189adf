//! Shared fixtures for the difficulty benchmarks.

use scaling_core::area::DifficultySource;
use scaling_core::types::{DimensionId, GameTimestamp, PlayerId, Position};
use scaling_host::rule::{self, DifficultyRule};
use scaling_host::HostConfig;

/// Position of the `i`-th fixture player: a loose spiral around spawn.
#[must_use]
pub fn spiral(i: usize) -> Position {
    let angle = i as f64 * 0.7;
    let radius = 4.0 + i as f64 * 3.0;
    Position::new(angle.cos() * radius, 64.0, angle.sin() * radius)
}

/// `n` difficulty sources spread around spawn with varied values.
#[must_use]
pub fn sources(n: usize) -> Vec<DifficultySource> {
    (0..n)
        .map(|i| DifficultySource {
            player: PlayerId::new(),
            position: spiral(i),
            difficulty: (i * 37 % 250) as f64,
        })
        .collect()
}

/// A rule with `n` players joined in the overworld.
#[must_use]
pub fn populated_rule(n: usize) -> (DifficultyRule, Vec<PlayerId>) {
    let mut rule = DifficultyRule::new(HostConfig::default());
    let players: Vec<PlayerId> = (0..n)
        .map(|i| {
            let player = PlayerId::new();
            rule::on_player_join(
                &mut rule,
                player,
                DimensionId::overworld(),
                spiral(i),
                GameTimestamp::now(0),
            );
            player
        })
        .collect();
    rule.take_outbox();
    (rule, players)
}
