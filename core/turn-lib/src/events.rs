//! 型別化的事件匯流排
//!
//! 訂閱者依訂閱順序同步收到事件；`defer` 的事件會在下一次 `flush` 時送出。
use crate::*;
use std::collections::VecDeque;
use std::fmt;

pub type SubscriptionID = usize;

type Listener<E> = Box<dyn FnMut(&E)>;

pub struct EventBus<E> {
    listeners: Vec<(SubscriptionID, Listener<E>)>,
    next_id: SubscriptionID,
    deferred: VecDeque<E>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            listeners: vec![],
            next_id: 0,
            deferred: VecDeque::new(),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionID {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionID) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, event: E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// 延後到下一次 `flush`
    pub fn defer(&mut self, event: E) {
        self.deferred.push_back(event);
    }

    /// 送出所有延後的事件，回傳送出數量
    pub fn flush(&mut self) -> usize {
        let pending = std::mem::take(&mut self.deferred);
        let count = pending.len();
        for event in pending {
            self.publish(event);
        }
        count
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn pending_count(&self) -> usize {
        self.deferred.len()
    }
}

/// 回合排程發出的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    NewActiveCombatant(CombatantID),
    /// 已提交的回合順序（依序的戰鬥者）
    TurnOrderSet(Vec<CombatantID>),
    /// 尚未提交的預覽順序
    TurnPreviewSet(Vec<CombatantID>),
    AbilityUsed {
        caster: CombatantID,
        ability: AbilityName,
        targets: Vec<CombatantID>,
    },
    CombatantDefeated(CombatantID),
    /// 已無法繼續排程
    SchedulingHalted,
}
