//! # chatvec core
//!
//! Pure logic for chatvec: turning exported chat-log lines into
//! timestamp-annotated messages, and keeping their embedding vectors in an
//! exact nearest-neighbor index aligned with per-message metadata.
//!
//! This crate contains no tokio, network, or filesystem I/O. Byte formats
//! are written to and read from any `std::io::Write` / `std::io::Read`;
//! the `chatvec` app crate decides where those bytes live.
//!
//! ## Pipeline
//!
//! ```text
//! raw line ─▶ LineClassifier ─▶ MessageAssembler ─▶ NormalizedMessage
//!                                                        │ (embed)
//!                                                        ▼
//!                                 ChatIndex::add_entry(vector, text, source)
//!                                   ├─ FlatIndex      (vectors, id = position)
//!                                   └─ MetadataStore  (records, id = position)
//! ```

pub mod assemble;
pub mod classify;
pub mod codec;
pub mod error;
pub mod index;
pub mod metadata;
pub mod models;
pub mod store;
pub mod timestamp;
pub mod vector;

pub use error::IndexError;
