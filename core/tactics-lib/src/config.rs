//! TOML 場景檔格式
//!
//! ```toml
//! [grid]
//! cell_size = 2.0
//! map = """
//! K . #
//! . . O
//! """
//!
//! [scheduler]
//! policy = "CTB"
//!
//! [[combatants]]
//! id = 1
//! team = "A"
//! marker = "K"
//! [combatants.stats]
//! name = "knight"
//! speed = 8
//! ```

use crate::error::{LoadError, Result};
use grid_lib::{Cell, ListenerID, NoiseSettings, Point};
use serde::{Deserialize, Serialize};
use std::path::Path;
use turn_lib::{Ability, CombatantID, CombatantTemplate, Effect, SchedulerConfig, Team, TurnPolicy};

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub grid: GridConfig,
    pub scheduler: SchedulerSection,
    /// 預設的噪音參數
    pub noise: NoiseSettings,
    pub abilities: Vec<Ability>,
    pub combatants: Vec<CombatantConfig>,
    pub tile_effects: Vec<TileEffectConfig>,
    pub noise_listeners: Vec<NoiseListenerConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub cell_size: f32,
    pub origin: Point,
    /// ASCII 地圖，見 `grid_lib::load_from_ascii`
    pub map: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 2.0,
            origin: Point::default(),
            map: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SchedulerSection {
    pub policy: TurnPolicy,
    pub base_cost: i32,
    pub ability_cost: i32,
    pub preview_pool_count: usize,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        let settings = SchedulerConfig::default();
        Self {
            policy: TurnPolicy::default(),
            base_cost: settings.base_cost,
            ability_cost: settings.ability_cost,
            preview_pool_count: settings.preview_pool_count,
        }
    }
}

impl SchedulerSection {
    pub fn settings(&self) -> SchedulerConfig {
        SchedulerConfig {
            base_cost: self.base_cost,
            ability_cost: self.ability_cost,
            preview_pool_count: self.preview_pool_count,
        }
    }
}

/// 戰鬥者配置，位置用 `cell` 或地圖標記指定
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CombatantConfig {
    pub id: CombatantID,
    pub team: Team,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<Cell>,
    #[serde(default)]
    pub stats: CombatantTemplate,
}

/// 地形效果：標記的所有格子加上額外指定的格子
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TileEffectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    #[serde(default)]
    pub cells: Vec<Cell>,
    pub effect: Effect,
}

/// 噪音監聽者
///
/// `id` 與戰鬥者相同時監聽者跟著該戰鬥者移動，不能另外指定位置。
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NoiseListenerConfig {
    pub id: ListenerID,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<Cell>,
}

fn default_threshold() -> f32 {
    1.0
}

impl SessionConfig {
    /// `name` 只用於錯誤訊息
    pub fn from_toml_str(content: &str, name: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            LoadError::DeserializeError {
                format: name.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::ReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            LoadError::SerializeError {
                format: "SessionConfig".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use grid_lib::NoiseFalloff;
    use turn_lib::{AbilityKind, AbilityShape};

    #[test]
    fn test_defaults() {
        let config = SessionConfig::from_toml_str("", "empty").unwrap();
        assert_eq!(config.grid.cell_size, 2.0);
        assert_eq!(config.scheduler.policy, TurnPolicy::ConstantAttribute);
        assert_eq!(config.scheduler.settings(), SchedulerConfig::default());
        assert_eq!(config.noise, NoiseSettings::default());
        assert!(config.combatants.is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let content = r#"
[grid]
cell_size = 1.0
map = ". #"

[scheduler]
policy = "CTB"
preview_pool_count = 6

[noise]
initial = 6.0
falloff = "Quadratic"

[[abilities]]
name = "fireball"
cost = 5
kind = "All"
shape = { type = "Radius", radius = 1 }

[[combatants]]
id = 7
team = "B"
cell = { x = 0, y = 0 }
[combatants.stats]
name = "orc"
speed = 6
abilities = ["fireball"]

[[tile_effects]]
cells = [{ x = 0, y = 0 }]
effect = { name = "fire", duration = 2, health_per_turn = -2 }

[[noise_listeners]]
id = 7
"#;
        let config = SessionConfig::from_toml_str(content, "sections").unwrap();
        assert_eq!(config.scheduler.policy, TurnPolicy::Ctb);
        assert_eq!(config.scheduler.settings().base_cost, 100);
        assert_eq!(config.scheduler.preview_pool_count, 6);
        assert_eq!(config.noise.falloff, NoiseFalloff::Quadratic);
        assert_eq!(config.noise.decay, 1.0);

        let fireball = &config.abilities[0];
        assert_eq!(fireball.kind, AbilityKind::All);
        assert_eq!(fireball.shape, AbilityShape::Radius { radius: 1 });
        assert!(fireball.requires_target);

        let orc = &config.combatants[0];
        assert_eq!((orc.team, orc.cell), (Team::B, Some(Cell::new(0, 0))));
        assert_eq!(orc.stats.speed, 6);
        assert_eq!(orc.stats.max_hp, 10);

        assert_eq!(config.tile_effects[0].effect.health_per_turn, -2);
        assert_eq!(config.noise_listeners[0].threshold, 1.0);

        let text = config.to_toml_string().unwrap();
        assert_eq!(SessionConfig::from_toml_str(&text, "again").unwrap(), config);
    }

    #[test]
    fn test_invalid_policy() {
        let err = SessionConfig::from_toml_str("[scheduler]\npolicy = \"Realtime\"", "bad")
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Load(LoadError::DeserializeError { .. })
        ));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_missing_file() {
        let err = SessionConfig::from_path("no/such/scenario.toml").unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Load(LoadError::ReadError { .. })
        ));
    }
}
