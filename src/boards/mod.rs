//! Board back-end and client session.
//!
//! ## Overview
//!
//! Boards live in a document store (the source of truth). A search index
//! holds a denormalised copy that is used only to find board ids: who owns
//! what and who is a member of what. Every list shown to a user is
//! re-resolved from the store, so a stale index can hide a board for a
//! while but can never show stale board fields.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────────┐  toggle_pin   ┌──────────────────────────────────────┐
//! │ view.rs      │ ────────────> │ client.rs (ApiClient, reqwest)       │
//! │ BoardSession │ <──────────── │   or pin.rs (StorePinPersistence)    │
//! └──────────────┘  load_boards  └──────────────────────────────────────┘
//!        │                                   │ HTTP
//!        │ identity.rs (sign-out teardown)   v
//!        │                      ┌──────────────────────────────────────┐
//!        │                      │ server.rs (router, CORS, tracing)    │
//!        │                      │   └─ api.rs (handlers, AppState)     │
//!        │                      └──────────────────────────────────────┘
//!        v                                   │
//! ┌──────────────────────────────────────────v───────────────────────────┐
//! │ aggregate.rs (BoardQuery)   pin.rs (toggle-on-write)   create.rs      │
//! └──────────────────────────────────────────────────────────────────────┘
//!        │                                   │
//!        v                                   v
//!  store.rs / db.rs (DocumentStore)    search/ (SearchIndex, Filter)
//! ```
//!
//! ## Supporting Modules
//!
//! | Module      | Responsibility                                              |
//! |-------------|-------------------------------------------------------------|
//! | `store`     | `DocumentStore` trait, `MemoryStore`                        |
//! | `db`        | SQLite documents table behind `DbHandle`                    |
//! | `search`    | `SearchIndex` trait, filter grammar, memory + hosted index  |
//! | `identity`  | `IdentityProvider` trait, `StaticIdentity`                  |

pub mod aggregate;
pub mod api;
pub mod client;
pub mod create;
pub mod db;
pub mod identity;
pub mod pin;
pub mod search;
pub mod server;
pub mod store;
pub mod view;

#[cfg(test)]
pub(crate) mod fixtures;

pub use aggregate::{BoardQuery, BoardSource};
pub use pin::PinPersistence;
pub use store::DocumentStore;
pub use view::{BoardSession, ToggleOutcome, ViewCollections};
