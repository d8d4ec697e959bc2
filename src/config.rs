//! Session configuration
//!
//! Supports multiple profiles (debug, release) with different player setups.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::input::{Action, ActionBindingSet, ActionId, ActionMap, DisplayIndex};

/// Single-process simulation of several players
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Route the local mouse and keyboard to synthetic per-player devices
    pub enabled: bool,
    /// Frames to wait before a simulated player reports as connected
    pub connect_delay_frames: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_delay_frames: 1,
        }
    }
}

/// One configured player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub name: String,
    /// Display the player's camera renders to
    #[serde(default)]
    pub display: DisplayIndex,
    /// Connect through a real stream instead of simulated devices
    #[serde(default)]
    pub stream_in_editor: bool,
    /// Name of the action template cloned for this player
    #[serde(default)]
    pub actions: Option<String>,
    /// Name of the rendering hierarchy holding the player's raycasters
    #[serde(default)]
    pub hierarchy: Option<String>,
}

impl PlayerConfig {
    pub fn new(name: impl Into<String>, display: DisplayIndex) -> Self {
        Self {
            name: name.into(),
            display,
            stream_in_editor: false,
            actions: None,
            hierarchy: None,
        }
    }

    /// Builder: clone the named action template for this player
    pub fn with_actions(mut self, template: impl Into<String>) -> Self {
        self.actions = Some(template.into());
        self
    }

    /// Builder: player connects through a real stream
    pub fn streamed(mut self) -> Self {
        self.stream_in_editor = true;
        self
    }
}

/// One action in a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    pub name: String,
    /// Stable id; generated when omitted
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub bindings: Vec<String>,
}

/// Named group of actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMapConfig {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

/// Action template players clone at session start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTemplateConfig {
    pub name: String,
    #[serde(default)]
    pub maps: Vec<ActionMapConfig>,
}

impl ActionTemplateConfig {
    /// Builds the template's binding set
    pub fn build(&self) -> ActionBindingSet {
        self.maps.iter().fold(ActionBindingSet::new(&self.name), |set, map| {
            let built = map.actions.iter().fold(ActionMap::new(&map.name), |built, action| {
                let id = action.id.map(ActionId).unwrap_or_default();
                let action = action
                    .bindings
                    .iter()
                    .fold(Action::with_id(id, &action.name), |built, path| built.bind(path));
                built.with_action(action)
            });
            set.with_map(built)
        })
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The active profile (debug, release, etc.)
    pub profile: String,
    /// Default tracing filter when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub players: Vec<PlayerConfig>,
    #[serde(default)]
    pub action_templates: Vec<ActionTemplateConfig>,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl SessionConfig {
    /// Loads configuration based on the specified profile
    ///
    /// Profiles are loaded from config files in the following order:
    /// 1. config/{profile}.toml (profile-specific configuration)
    /// 2. Environment variables with prefix STREAM_ (e.g., STREAM_SIMULATION__ENABLED=false)
    ///
    /// Config files are searched for in:
    /// 1. Next to the executable (target/debug/config or target/release/config)
    /// 2. In the current directory (./config)
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        match Self::find_config_dir() {
            Some(dir) => Self::load_from(&dir, profile),
            None => {
                warn!(profile, "No config directory found, using defaults and environment only");
                Self::build(
                    Config::builder().add_source(File::with_name(&format!("config/{profile}")).required(false)),
                    profile,
                )
            }
        }
    }

    /// Loads `{dir}/{profile}.toml` plus environment overrides
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let profile_path = dir.join(format!("{profile}.toml"));
        if !profile_path.exists() {
            warn!(
                path = %profile_path.display(),
                profile,
                "Profile file not found, using defaults and environment only"
            );
        }
        Self::build(
            Config::builder().add_source(File::from(profile_path.as_path()).required(false)),
            profile,
        )
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        profile: &str,
    ) -> Result<Self, ConfigError> {
        // Use __ as separator for nested fields (e.g., STREAM_SIMULATION__CONNECT_DELAY_FRAMES)
        let config = builder
            .add_source(
                Environment::with_prefix("STREAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override("profile", profile)?
            .build()?;

        config.try_deserialize()
    }

    /// Finds the config directory by searching in multiple locations
    fn find_config_dir() -> Option<PathBuf> {
        if let Ok(exe_path) = std::env::current_exe()
            && let Some(exe_dir) = exe_path.parent()
        {
            let config_dir = exe_dir.join("config");
            if config_dir.exists() {
                return Some(config_dir);
            }
        }

        let cwd_config = PathBuf::from("config");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        None
    }

    /// Loads configuration using the STREAM_PROFILE environment variable,
    /// defaulting to "release"
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let profile = std::env::var("STREAM_PROFILE").unwrap_or_else(|_| "release".to_string());
        Self::load(&profile)
    }

    /// Built-in profile: one player on display 0 with no action template
    pub fn builtin(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            log_filter: default_log_filter(),
            simulation: SimulationConfig::default(),
            players: vec![PlayerConfig::new("Player 1", 0)],
            action_templates: Vec::new(),
        }
    }

    pub fn template(&self, name: &str) -> Option<&ActionTemplateConfig> {
        self.action_templates.iter().find(|template| template.name == name)
    }

    /// Whether every player renders to a different display
    pub fn has_distinct_displays(&self) -> bool {
        self.players.iter().map(|player| player.display).all_unique()
    }

    /// Moves players that share a display to the lowest free display
    ///
    /// The first player on a display keeps it. Returns the players that were
    /// moved with their old and new display.
    pub fn assign_distinct_displays(&mut self) -> Vec<(String, DisplayIndex, DisplayIndex)> {
        let mut taken = Vec::new();
        let mut moved = Vec::new();
        let mut duplicates = Vec::new();
        for (index, player) in self.players.iter().enumerate() {
            if taken.contains(&player.display) {
                duplicates.push(index);
            } else {
                taken.push(player.display);
            }
        }
        for index in duplicates {
            let Some(free) = (0..=DisplayIndex::MAX).find(|display| !taken.contains(display)) else {
                break;
            };
            taken.push(free);
            let player = &mut self.players[index];
            warn!(player = %player.name, from = player.display, to = free, "Display already in use, reassigned");
            moved.push((player.name.clone(), player.display, free));
            player.display = free;
        }
        moved
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        match Self::load("release") {
            Ok(config) if !config.players.is_empty() => config,
            Ok(_) => {
                warn!("Release profile configures no players, using built-in profile");
                Self::builtin("release")
            }
            Err(error) => {
                warn!(%error, "Failed to load release profile, using built-in profile");
                Self::builtin("release")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_distinct_displays() {
        let mut config = SessionConfig::builtin("test");
        config.players = vec![
            PlayerConfig::new("a", 0),
            PlayerConfig::new("b", 0),
            PlayerConfig::new("c", 1),
            PlayerConfig::new("d", 1),
        ];
        assert!(!config.has_distinct_displays());
        let moved = config.assign_distinct_displays();
        assert_eq!(moved, vec![("b".to_string(), 0, 2), ("d".to_string(), 1, 3)]);
        assert!(config.has_distinct_displays());
    }

    #[test]
    fn test_template_build_keeps_configured_ids() {
        let id = Uuid::new_v4();
        let template = ActionTemplateConfig {
            name: "Gameplay".to_string(),
            maps: vec![ActionMapConfig {
                name: "Player".to_string(),
                actions: vec![ActionConfig {
                    name: "Fire".to_string(),
                    id: Some(id),
                    bindings: vec!["<Mouse>/leftButton".to_string()],
                }],
            }],
        };
        let set = template.build();
        let fire = set.find_by_name("fire").unwrap();
        assert_eq!(fire.id(), ActionId(id));
        assert_eq!(fire.bindings().len(), 1);
    }

    #[test]
    fn test_default_loads_release_profile() {
        let config = SessionConfig::default();
        assert_eq!(config.profile, "release");
        assert!(!config.players.is_empty());
    }

    #[test]
    fn test_missing_profile_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::load_from(dir.path(), "absent").unwrap();
        assert_eq!(config.profile, "absent");
        assert!(config.players.is_empty());
        assert!(config.simulation.enabled);
    }
}
