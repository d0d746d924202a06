//! Shared domain types for Corkboard.
//!
//! Everything here is plain data: boards, users, the per-user document and
//! the request/response bodies exchanged between the HTTP API and its
//! clients. No I/O lives in this crate.

pub mod models;
pub mod naming;
pub mod wire;

pub use models::*;
pub use naming::{BOARD_NAME_MAX_LEN, normalize_board_name, slugify};
