//! 實體能力登記：取代「詢問場景物件有沒有某個元件」

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum_macros::{Display, EnumIter};

/// 戰鬥者與噪音監聽者共用的編號空間
pub type EntityID = u64;

#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter,
)]
pub enum Capability {
    Combatant,
    NoiseListener,
    /// 玩家可選取
    Selectable,
}

#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entities: BTreeMap<EntityID, BTreeSet<Capability>>,
}

impl CapabilityRegistry {
    /// 回傳是否為新加入的能力
    pub fn insert(&mut self, id: EntityID, capability: Capability) -> bool {
        self.entities.entry(id).or_default().insert(capability)
    }

    pub fn remove(&mut self, id: EntityID, capability: Capability) -> bool {
        let Some(set) = self.entities.get_mut(&id) else {
            return false;
        };
        let removed = set.remove(&capability);
        if set.is_empty() {
            self.entities.remove(&id);
        }
        removed
    }

    pub fn contains(&self, id: EntityID) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn has(&self, id: EntityID, capability: Capability) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|set| set.contains(&capability))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// 下一個未使用的編號
    pub fn next_id(&self) -> EntityID {
        self.entities.keys().next_back().map_or(1, |id| id + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let mut registry = CapabilityRegistry::default();
        assert!(registry.insert(1, Capability::Combatant));
        assert!(registry.insert(1, Capability::NoiseListener));
        assert!(!registry.insert(1, Capability::Combatant));
        registry.insert(5, Capability::NoiseListener);

        let test_data = [
            (1, Capability::Combatant, true),
            (1, Capability::Selectable, false),
            (5, Capability::NoiseListener, true),
            (9, Capability::Combatant, false),
        ];
        for (id, capability, expected) in test_data {
            assert_eq!(registry.has(id, capability), expected, "{id} {capability}");
        }
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.next_id(), 6);
    }

    #[test]
    fn test_remove() {
        let mut registry = CapabilityRegistry::default();
        assert_eq!(registry.next_id(), 1);
        registry.insert(2, Capability::Selectable);
        assert!(!registry.remove(2, Capability::Combatant));
        assert!(registry.remove(2, Capability::Selectable));
        assert!(!registry.contains(2));
        assert!(registry.is_empty());

        registry.insert(3, Capability::Combatant);
        registry.insert(3, Capability::NoiseListener);
        assert!(registry.remove(3, Capability::Combatant));
        assert!(registry.has(3, Capability::NoiseListener));
        assert_eq!(registry.next_id(), 4);
    }
}
