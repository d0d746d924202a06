//! CLI command implementations.
//!
//! | Module    | Commands handled                         |
//! |-----------|------------------------------------------|
//! | `serve`   | `Serve`, `Init`                          |
//! | `boards`  | `Boards`, `Pin`, `Create`, `Reindex`     |
//! | `config`  | `Config`                                 |

pub mod boards;
pub mod config;
pub mod serve;

pub use boards::{cmd_boards, cmd_create, cmd_pin, cmd_reindex};
pub use config::cmd_config;
pub use serve::{cmd_init, cmd_serve};
