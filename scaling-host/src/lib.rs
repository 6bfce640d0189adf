//! # scaling-host: Host Integration for Scaling Difficulty
//!
//! This crate provides the integration layer between the engine-agnostic
//! `scaling-core` library and a voxel game server's event and tick loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Host engine                   │
//! │   callbacks ──► hooks ──► GameEvent         │
//! │  ┌───────────────────────────────────────┐  │
//! │  │            scaling-host               │  │
//! │  │  ┌──────────────┐  ┌───────────────┐  │  │
//! │  │  │DifficultyRule│─►│ sync packets  │──┼──┼─► client channel
//! │  │  └──────┬───────┘  └───────────────┘  │  │
//! │  │         ▼                             │  │
//! │  │  ┌─────────────────────────────────┐  │  │
//! │  │  │          scaling-core           │  │  │
//! │  │  │ store · area · mutator · mobs   │  │  │
//! │  │  │ health · persistence (SQLite)   │  │  │
//! │  │  └─────────────────────────────────┘  │  │
//! │  └───────────────────────────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `components`: per-player session state (position, dimension, biome, health)
//! - `config`: host tuning on top of `ScalingConfig`, tick budget tracking
//! - `events`: game events that drive the rule
//! - `hooks`: engine callback → event constructors
//! - `logging`: `tracing` subscriber setup
//! - `rule`: the difficulty rule and its handlers
//! - `sync`: client sync payloads

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod components;
pub mod config;
pub mod events;
pub mod hooks;
pub mod logging;
pub mod rule;
pub mod sync;

pub use config::HostConfig;
pub use events::GameEvent;
pub use rule::DifficultyRule;
pub use sync::{SyncMessage, SyncPacket};
