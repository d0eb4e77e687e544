//! 噪音傳播與監聽者
//!
//! 噪音從發出點以四方向 BFS 擴散，每格音量為 `initial - f(距離) * decay`，
//! 音量 <= 0 的格子不收錄也不再擴散。
use crate::*;
use std::collections::{BTreeMap, HashMap, VecDeque};
use strum_macros::EnumString;

/// 噪音隨距離衰減的方式
#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter, EnumString,
)]
pub enum NoiseFalloff {
    #[default]
    Linear,
    Quadratic,
    Cubic,
}

impl NoiseFalloff {
    pub fn attenuation(self, distance: f32) -> f32 {
        match self {
            NoiseFalloff::Linear => distance,
            NoiseFalloff::Quadratic => distance.powi(2),
            NoiseFalloff::Cubic => distance.powi(3),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct NoiseSettings {
    pub initial: f32,
    pub decay: f32,
    pub falloff: NoiseFalloff,
}

impl NoiseSettings {
    /// `decay` 必須為正數，否則音量不會降到 0，擴散不會停止
    pub fn validate(&self) -> Result<(), Error> {
        let func = "NoiseSettings::validate";
        if !self.initial.is_finite() {
            return Err(Error::InvalidParameter {
                func,
                reason: format!("initial 必須為有限值: {}", self.initial),
            });
        }
        if !self.decay.is_finite() || self.decay <= 0.0 {
            return Err(Error::InvalidParameter {
                func,
                reason: format!("decay 必須大於 0: {}", self.decay),
            });
        }
        Ok(())
    }
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            initial: 10.0,
            decay: 1.0,
            falloff: NoiseFalloff::Linear,
        }
    }
}

/// 一次噪音的音量分佈
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoiseField {
    pub origin: Cell,
    pub volumes: HashMap<Cell, f32>,
}

impl NoiseField {
    pub fn volume(&self, cell: Cell) -> Option<f32> {
        self.volumes.get(&cell).copied()
    }
}

/// 發出噪音，回傳每格音量
pub fn emit_noise(origin: Cell, settings: NoiseSettings) -> Result<NoiseField, Error> {
    settings.validate()?;
    let volume_at = |cell: Cell| {
        settings.initial - settings.falloff.attenuation(cell.distance(origin)) * settings.decay
    };

    let mut volumes = HashMap::new();
    let mut visited = std::collections::HashSet::from([origin]);
    let mut queue = VecDeque::from([origin]);

    while let Some(cell) = queue.pop_front() {
        let volume = volume_at(cell);
        if volume <= 0.0 {
            continue;
        }
        volumes.insert(cell, volume);

        for (dx, dy) in CARDINAL_DIRECTIONS {
            let next = cell.offset(dx, dy);
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    Ok(NoiseField { origin, volumes })
}

/// 噪音監聽者
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct NoiseListener {
    pub id: ListenerID,
    /// 聽得到的最低音量
    pub threshold: f32,
}

/// 監聽者聽到的噪音
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseHeard {
    pub listener: ListenerID,
    pub cell: Cell,
    pub volume: f32,
}

/// 依位置登記的噪音監聽者，每格最多一個
#[derive(Debug, Clone, Default)]
pub struct NoiseRegistry {
    listeners: BTreeMap<Cell, NoiseListener>,
}

impl NoiseRegistry {
    pub fn register(&mut self, cell: Cell, listener: NoiseListener) -> Result<(), Error> {
        if let Some(existing) = self.listeners.get(&cell) {
            log::warn!("位置 {cell:?} 已有噪音監聽者 {}", existing.id);
            return Err(Error::ListenerExists {
                func: "NoiseRegistry::register",
                cell,
                existing: existing.id,
            });
        }
        self.listeners.insert(cell, listener);
        Ok(())
    }

    pub fn unregister(&mut self, cell: Cell) -> Option<NoiseListener> {
        self.listeners.remove(&cell)
    }

    /// 監聽者跟著單位移動
    pub fn move_listener(&mut self, from: Cell, to: Cell) -> Result<(), Error> {
        let func = "NoiseRegistry::move_listener";
        if from == to {
            return Ok(());
        }
        if let Some(existing) = self.listeners.get(&to) {
            return Err(Error::ListenerExists {
                func,
                cell: to,
                existing: existing.id,
            });
        }
        let listener = self
            .listeners
            .remove(&from)
            .ok_or(Error::NoListenerAt { func, cell: from })?;
        self.listeners.insert(to, listener);
        Ok(())
    }

    pub fn listener_at(&self, cell: Cell) -> Option<&NoiseListener> {
        self.listeners.get(&cell)
    }

    pub fn position_of(&self, id: ListenerID) -> Option<Cell> {
        self.listeners
            .iter()
            .find(|(_, listener)| listener.id == id)
            .map(|(cell, _)| *cell)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// 找出音量達到門檻的監聽者，依位置排序
    pub fn check(&self, field: &NoiseField) -> Vec<NoiseHeard> {
        self.listeners
            .iter()
            .filter_map(|(cell, listener)| {
                let volume = field.volume(*cell)?;
                (listener.threshold <= volume).then_some(NoiseHeard {
                    listener: listener.id,
                    cell: *cell,
                    volume,
                })
            })
            .collect()
    }

    pub fn emit(&self, origin: Cell, settings: NoiseSettings) -> Result<Vec<NoiseHeard>, Error> {
        let field = emit_noise(origin, settings)?;
        let heard = self.check(&field);
        log::debug!(
            "噪音 {origin:?} 擴散 {} 格，{} 個監聽者聽到",
            field.volumes.len(),
            heard.len()
        );
        Ok(heard)
    }
}
