use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    tracing::{debug, info},
};

use crate::{
    env_subst::substitute_env,
    schema::{GateConfig, parse_id_list},
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "readgate.toml",
    "readgate.yaml",
    "readgate.yml",
    "readgate.json",
];

/// Environment variable restricting Monday.com to one board.
pub const ENV_ALLOWED_BOARD: &str = "MONDAY_ALLOWED_BOARD_ID";
/// Environment variable listing readable Slack channel ids.
pub const ENV_ALLOWED_CHANNELS: &str = "SLACK_ALLOWED_CHANNELS";
/// Environment variable pointing the audit log at a file.
pub const ENV_AUDIT_LOG: &str = "READGATE_AUDIT_LOG";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<GateConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path).with_context(|| format!("failed to parse {}", path.display()))
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./readgate.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/readgate/readgate.{toml,yaml,yml,json}` (user-global)
///
/// Returns `GateConfig::default()` only when no file is found. A file that
/// exists but fails to load is an error.
pub fn discover_and_load() -> anyhow::Result<GateConfig> {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(config_dir());
    load_from_dirs(&dirs)
}

/// Load the first standard config file found in `dirs`, in order.
pub fn load_from_dirs(dirs: &[PathBuf]) -> anyhow::Result<GateConfig> {
    let Some(path) = dirs.iter().find_map(find_config_in) else {
        debug!("no config file found, using defaults");
        return Ok(GateConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path)
}

/// The configuration in effect at startup: an explicit file (errors are
/// fatal) or discovery, then environment overrides.
pub fn load_effective(explicit: Option<&Path>) -> anyhow::Result<GateConfig> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => discover_and_load()?,
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    info!(
        allowed_board = config.monday.allowed_board().unwrap_or("unrestricted"),
        allowed_channels = config.slack.allowed_channels.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Apply `MONDAY_ALLOWED_BOARD_ID`, `SLACK_ALLOWED_CHANNELS` and
/// `READGATE_AUDIT_LOG`. A variable that is set always wins, even when blank.
pub fn apply_env_overrides(config: &mut GateConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(board) = lookup(ENV_ALLOWED_BOARD) {
        let board = board.trim().to_string();
        config.monday.allowed_board_id = (!board.is_empty()).then_some(board);
    }
    if let Some(channels) = lookup(ENV_ALLOWED_CHANNELS) {
        config.slack.allowed_channels = parse_id_list(&channels);
    }
    if let Some(path) = lookup(ENV_AUDIT_LOG) {
        let path = path.trim();
        config.audit.path = (!path.is_empty()).then(|| PathBuf::from(path));
    }
}

/// First standard config file name present in `dir`.
pub fn find_config_in(dir: impl AsRef<Path>) -> Option<PathBuf> {
    let dir = dir.as_ref();
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory: `~/.config/readgate/`.
pub fn config_dir() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".config").join("readgate"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<GateConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
