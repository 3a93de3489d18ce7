//! # chatvec
//!
//! Turns exported chat logs into a searchable vector index of
//! timestamped messages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌───────────┐   ┌────────────────┐
//! │ chat .txt   │──▶│ classify+assemble│──▶│ embedding │──▶│ vectors.idx +  │
//! │ exports     │   │ (chatvec-core)   │   │ provider  │   │ metadata.json  │
//! └─────────────┘   └──────────────────┘   └───────────┘   └───────┬────────┘
//!                                                                  │
//!                                              search / get / stats ◀┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! chatvec classify ./chats/group.txt     # check how lines are read
//! chatvec build                          # embed every export
//! chatvec search "dinner on friday" -k 3
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`connector_fs`] | Chat export discovery |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`ingest`] | Build pipeline (corpus loader) |
//! | [`persist`] | On-disk index directory |
//! | [`progress`] | Build progress on stderr |
//! | [`search`] | Nearest-neighbour queries |
//! | [`get`] | Entry lookup by id |
//! | [`stats`] | Index summary |
//! | [`sources`] | Source listing |
//! | [`classify`] | Line classification preview |

pub mod classify;
pub mod config;
pub mod connector_fs;
pub mod embedding;
pub mod get;
pub mod ingest;
pub mod persist;
pub mod progress;
pub mod search;
pub mod sources;
pub mod stats;
