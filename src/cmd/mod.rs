//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled  |
//! |----------|-------------------|
//! | `serve`  | `Serve`, `Init`   |
//! | `seed`   | `Seed`            |
//! | `config` | `Config`          |

pub mod config;
pub mod seed;
pub mod serve;

pub use config::cmd_config;
pub use seed::cmd_seed;
pub use serve::{cmd_init, cmd_serve};
