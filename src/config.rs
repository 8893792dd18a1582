/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug, Default)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
}

/// Tuning in playfield pixels and seconds.
#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub player_speed: f32,
    pub missile_speed: f32,
    pub segment_speed_base: f32,
    pub segment_speed_per_level: f32,
    pub reload_time: f32,
    pub respawn_delay: f32,
}

#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub scatter_min: usize,
    pub scatter_max: usize,
    pub chain_base: usize,
    pub chain_cap: usize,
    pub start_lives: u32,
}

#[derive(Clone, Debug, Default)]
pub struct GamepadConfig {
    pub fire: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub skip: Vec<String>,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        SpeedConfig {
            player_speed: default_player_speed(),
            missile_speed: default_missile_speed(),
            segment_speed_base: default_segment_base(),
            segment_speed_per_level: default_segment_per_level(),
            reload_time: default_reload(),
            respawn_delay: default_respawn_delay(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            scatter_min: default_scatter_min(),
            scatter_max: default_scatter_max(),
            chain_base: default_chain_base(),
            chain_cap: default_chain_cap(),
            start_lives: default_lives(),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_missile_speed")]
    missile_speed: f32,
    #[serde(default = "default_segment_base")]
    segment_speed_base: f32,
    #[serde(default = "default_segment_per_level")]
    segment_speed_per_level: f32,
    #[serde(default = "default_reload")]
    reload_time: f32,
    #[serde(default = "default_respawn_delay")]
    respawn_delay: f32,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_scatter_min")]
    scatter_min: usize,
    #[serde(default = "default_scatter_max")]
    scatter_max: usize,
    #[serde(default = "default_chain_base")]
    chain_base: usize,
    #[serde(default = "default_chain_cap")]
    chain_cap: usize,
    #[serde(default = "default_lives")]
    start_lives: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_fire")]
    fire: Vec<String>,
    #[serde(default = "default_pad_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_pad_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_pad_skip")]
    skip: Vec<String>,
}

// ── Defaults ──

fn default_player_speed() -> f32 { 300.0 }
fn default_missile_speed() -> f32 { 600.0 }
fn default_segment_base() -> f32 { 120.0 }
fn default_segment_per_level() -> f32 { 15.0 }
fn default_reload() -> f32 { 0.4 }
fn default_respawn_delay() -> f32 { 2.0 }

fn default_scatter_min() -> usize { 20 }
fn default_scatter_max() -> usize { 30 }
fn default_chain_base() -> usize { 7 }
fn default_chain_cap() -> usize { 16 }
fn default_lives() -> u32 { 3 }

fn default_pad_fire() -> Vec<String> { vec!["A".into(), "X".into(), "R1".into()] }
fn default_pad_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_pad_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_pad_skip() -> Vec<String> { vec!["Y".into()] }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            player_speed: default_player_speed(),
            missile_speed: default_missile_speed(),
            segment_speed_base: default_segment_base(),
            segment_speed_per_level: default_segment_per_level(),
            reload_time: default_reload(),
            respawn_delay: default_respawn_delay(),
        }
    }
}

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            scatter_min: default_scatter_min(),
            scatter_max: default_scatter_max(),
            chain_base: default_chain_base(),
            chain_cap: default_chain_cap(),
            start_lives: default_lives(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            fire: default_pad_fire(),
            confirm: default_pad_confirm(),
            cancel: default_pad_cancel(),
            skip: default_pad_skip(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let toml_cfg = load_toml(&candidate_dirs());
        GameConfig::from_toml(toml_cfg)
    }

    fn from_toml(t: TomlConfig) -> Self {
        GameConfig {
            speed: SpeedConfig {
                player_speed: t.speed.player_speed,
                missile_speed: t.speed.missile_speed,
                segment_speed_base: t.speed.segment_speed_base,
                segment_speed_per_level: t.speed.segment_speed_per_level,
                reload_time: t.speed.reload_time,
                respawn_delay: t.speed.respawn_delay,
            },
            rules: RulesConfig {
                scatter_min: t.rules.scatter_min,
                scatter_max: t.rules.scatter_max.max(t.rules.scatter_min),
                chain_base: t.rules.chain_base,
                chain_cap: t.rules.chain_cap.max(1),
                start_lives: t.rules.start_lives.max(1),
            },
            gamepad: GamepadConfig {
                fire: t.gamepad.fire,
                confirm: t.gamepad.confirm,
                cancel: t.gamepad.cancel,
                skip: t.gamepad.skip,
            },
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let t: TomlConfig = toml::from_str("").unwrap();
        let cfg = GameConfig::from_toml(t);
        assert_eq!(cfg.speed.player_speed, 300.0);
        assert_eq!(cfg.rules.scatter_min, 20);
        assert_eq!(cfg.rules.scatter_max, 30);
        assert_eq!(cfg.rules.start_lives, 3);
    }

    #[test]
    fn partial_toml_overrides_only_named_keys() {
        let text = r#"
            [speed]
            player_speed = 250.0

            [rules]
            chain_base = 9
        "#;
        let t: TomlConfig = toml::from_str(text).unwrap();
        let cfg = GameConfig::from_toml(t);
        assert_eq!(cfg.speed.player_speed, 250.0);
        assert_eq!(cfg.speed.missile_speed, 600.0);
        assert_eq!(cfg.rules.chain_base, 9);
        assert_eq!(cfg.rules.chain_cap, 16);
    }

    #[test]
    fn inverted_scatter_range_is_sanitized() {
        let text = r#"
            [rules]
            scatter_min = 40
            scatter_max = 10
        "#;
        let t: TomlConfig = toml::from_str(text).unwrap();
        let cfg = GameConfig::from_toml(t);
        assert!(cfg.rules.scatter_max >= cfg.rules.scatter_min);
    }
}
