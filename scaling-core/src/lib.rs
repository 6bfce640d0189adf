//! # Scaling Core Library
//!
//! Game-agnostic difficulty accumulator for sandbox worlds.
//!
//! Every player (and every dimension) carries a scalar **difficulty** that:
//!
//! - **Accumulates** over time at a configured rate ([`store`])
//! - **Stays clamped** to `[min, max]`; exempt players are pinned at 0
//! - **Aggregates** across nearby players under an [`AreaMode`] ([`area`])
//! - **Mutates** on game events via closed-form formulas ([`mutator`], [`formula`])
//!   and heart items ([`items`])
//! - **Scales** mob stats and elite ("blight") spawns ([`mobs`])
//! - **Persists** to `SQLite` keyed by stable player identity ([`persistence`])
//!
//! The crate owns no scheduler. The embedding engine calls into it from its
//! own tick and event callbacks, one call at a time.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod area;
pub mod config;
pub mod error;
pub mod formula;
pub mod health;
pub mod items;
pub mod mobs;
pub mod mutator;
pub mod persistence;
pub mod store;
pub mod types;

pub use config::ScalingConfig;
pub use error::ScalingError;
pub use store::DifficultyStore;
pub use types::*;
