//! # sqlsage
//!
//! Natural-language questions over relational databases: context-aware SQL
//! generation through a local Ollama model, with read-only safety
//! validation before anything runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │         Database (PostgreSQL / MySQL via sqlx)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema + profile]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SchemaGraph + DatabaseProfile (TTL cached)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [analyzer]
//! ┌─────────────────────────────────────────────────────────┐
//! │   QueryAnalysis (tables, columns, type, complexity)      │
//! │        + FocusedContext (one-hop FK expansion)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [prompt → generator]
//! ┌─────────────────────────────────────────────────────────┐
//! │              Model response (Ollama, local)              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [extract → validate → execute]
//! ┌─────────────────────────────────────────────────────────┐
//! │              QueryResult (uniform envelope)              │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod engine;
pub mod extract;
pub mod generator;
pub mod profile;
pub mod prompt;
pub mod schema;
pub mod service;
pub mod validate;

#[cfg(feature = "ui")]
pub mod web;
