//! `mboxdb` — ingest MBOX mail archives into a SQLite database.
//!
//! This crate provides a streaming MBOX parser, a per-message normalizer
//! (decoded headers, canonical UTC dates, plaintext previews), and a batched
//! ingestion pipeline writing to a single `emails` table suitable for
//! analytical queries (counts by day, sender, recipient, subject).

pub mod config;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod parser;
pub mod store;
