//! # Gridz Architecture
//!
//! Gridz is a **renderer-agnostic CRUD grid library**: declarative list
//! views with pagination, sorting, column selection and typed filtering,
//! whose per-user display preferences survive across requests. It is not a
//! web framework feature that happens to have library code, it is a library
//! a web layer plugs into.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Host web layer (not in this crate)                         │
//! │  - Maps HTTP requests to GridRequest, renders GridView      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engine (engine.rs)                                         │
//! │  - One handle() call per request: load state, fold in       │
//! │    deltas, clamp, persist, build query, paginate            │
//! │  - Returns a render-ready GridView snapshot                 │
//! └─────────────────────────────────────────────────────────────┘
//!              │                              │
//!              ▼                              ▼
//! ┌───────────────────────────┐  ┌────────────────────────────┐
//! │  State (session, store/)  │  │  Query (query/, search/,   │
//! │  - GridSession snapshot   │  │  pagination.rs)            │
//! │  - SessionStore per visit │  │  - GridQuery capability    │
//! │  - DurableStore per user  │  │  - Typed filter fields     │
//! └───────────────────────────┘  │  - Count + slice cycle     │
//!                                └────────────────────────────┘
//! ```
//!
//! ## The One Rule
//!
//! User-originated anomalies are never errors. Any value coming from a
//! request or a store that the current configuration cannot account for is
//! silently replaced by the configured default. Integrator mistakes fail
//! fast at configuration time instead.

pub mod column;
pub mod engine;
pub mod error;
pub mod pagination;
pub mod query;
pub mod search;
pub mod session;
pub mod store;
pub mod view;
