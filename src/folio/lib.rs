//! # Folio Architecture
//!
//! Folio is a **UI-agnostic document store library**. It keeps named, versioned
//! text documents in independent SQLite-backed stores, searches across any
//! number of them as one result set, and can rebuild every earlier version of
//! a document from the patches it saved along the way.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Session state: last search, selection, opened document   │
//! │  - Supersedable background searches, observer callbacks     │
//! │  - Every document operation returns a CmdResult             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Validation and business logic per operation              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Workgroup (workgroup.rs)                                   │
//! │  - Member stores with priority and enablement               │
//! │  - Cross-store paging without concatenating results         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/, history/)                           │
//! │  - One SQLite file per store, FTS5 index kept by triggers   │
//! │  - Slot renumbering, reverse-patch revision chain           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! Nothing here writes to stdout/stderr or assumes a terminal. Diagnostics go
//! through `tracing`; installing a subscriber is the embedding program's job.
//!
//! ## Testing Strategy
//!
//! Stores are cheap to create in a temporary directory, so every layer is
//! tested against real SQLite files:
//!
//! 1. **Storage and history**: slot invariants, query plans, restore chains.
//! 2. **Workgroup**: the paging plan is checked against plain slicing.
//! 3. **Commands and API**: validation, result reporting, search supersession.
//!
//! ## Module Overview
//!
//! - [`api`]: The service facade, entry point for presentation layers
//! - [`commands`]: Business logic for each operation
//! - [`workgroup`]: Federated search over several stores
//! - [`store`]: One SQLite-backed document store
//! - [`history`]: Revision records, patches and restore
//! - [`query`]: Search string compiler
//! - [`cancel`]: Cancellation tokens and the search job registry
//! - [`model`]: Core data types (`Content`, `Page`, `DocId`, `NoteInfo`)
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod cancel;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod query;
pub mod store;
pub mod workgroup;
