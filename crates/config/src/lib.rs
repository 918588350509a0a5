//! Configuration loading for readgate.
//!
//! Config files: `readgate.{toml,yaml,yml,json}` in the working directory or
//! `~/.config/readgate/`. `${VAR}` placeholders are substituted before
//! parsing and `MONDAY_ALLOWED_BOARD_ID` / `SLACK_ALLOWED_CHANNELS` /
//! `READGATE_AUDIT_LOG` override the file. Read once at startup.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, discover_and_load, load_config, load_effective, load_from_dirs},
    schema::{AuditConfig, GateConfig, MondayConfig, SlackConfig, parse_id_list},
};
