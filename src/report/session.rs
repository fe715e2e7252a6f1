//! Per-user report sessions and the registry that owns them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::model::ReportDraft;
use super::step::Step;

/// Stack of visited steps. The top is the current step and the stack is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    steps: Vec<Step>,
}

impl History {
    pub fn new(first: Step) -> Self {
        Self { steps: vec![first] }
    }

    pub fn current(&self) -> Step {
        self.steps.last().copied().unwrap_or(Step::FIRST)
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Drop the current step and return the one before it. At the floor
    /// nothing changes and `None` is returned.
    pub fn pop(&mut self) -> Option<Step> {
        if self.steps.len() < 2 {
            return None;
        }
        self.steps.pop();
        Some(self.current())
    }

    pub fn reset(&mut self, first: Step) {
        self.steps.clear();
        self.steps.push(first);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// One user's in-progress report.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub draft: ReportDraft,
    pub history: History,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            draft: ReportDraft::default(),
            history: History::new(Step::FIRST),
            started_at: now,
            last_activity: now,
        }
    }

    pub fn current_step(&self) -> Step {
        self.history.current()
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

type Slot = Arc<Mutex<Option<Session>>>;

/// Owns all sessions, keyed by user id. Each user has a lock slot; holding
/// it serializes that user's events while other users proceed in parallel.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slots: RwLock<HashMap<i64, Slot>>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire the user's slot. The guard holds `None` when the user has no
    /// session; writing `Some` creates one and writing `None` destroys it.
    pub async fn lock(&self, user_id: i64) -> OwnedMutexGuard<Option<Session>> {
        let existing = self.slots.read().await.get(&user_id).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => self
                .slots
                .write()
                .await
                .entry(user_id)
                .or_default()
                .clone(),
        };
        slot.lock_owned().await
    }

    /// Snapshot of the user's session.
    pub async fn get(&self, user_id: i64) -> Option<Session> {
        let slot = self.slots.read().await.get(&user_id).cloned()?;
        let guard = slot.lock().await;
        (*guard).clone()
    }

    pub async fn is_active(&self, user_id: i64) -> bool {
        self.get(user_id).await.is_some()
    }

    /// Remove the user's session. Returns whether one existed.
    pub async fn destroy(&self, user_id: i64) -> bool {
        let mut guard = self.lock(user_id).await;
        let existed = guard.take().is_some();
        drop(guard);
        if existed {
            tracing::debug!(user_id, "Session destroyed");
        }
        self.release(user_id).await;
        existed
    }

    /// Forget the user's slot if it is empty and nobody else holds it.
    /// Call after dropping the guard from [`lock`](Self::lock).
    pub async fn release(&self, user_id: i64) {
        let mut slots = self.slots.write().await;
        let unused = slots.get(&user_id).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|guard| guard.is_none())
        });
        if unused {
            slots.remove(&user_id);
        }
    }

    /// Users with a slot in the map, whether or not a report is open.
    pub async fn tracked_users(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn active_count(&self) -> usize {
        let slots: Vec<Slot> = self.slots.read().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    /// Drop sessions idle for at least `max_idle`, and empty slots. Slots
    /// that are locked or referenced elsewhere are left alone.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let max_idle = TimeDelta::from_std(max_idle).unwrap_or(TimeDelta::MAX);
        let now = Utc::now();
        let mut evicted = 0;

        self.slots.write().await.retain(|user_id, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let Ok(guard) = slot.try_lock() else {
                return true;
            };
            match &*guard {
                None => false,
                Some(session) if now - session.last_activity >= max_idle => {
                    tracing::info!(
                        user_id = *user_id,
                        step = %session.current_step(),
                        "Evicting idle report session"
                    );
                    evicted += 1;
                    false
                }
                Some(_) => true,
            }
        });

        evicted
    }
}

/// Periodically evict idle sessions.
pub fn spawn_eviction_task(
    registry: Arc<SessionRegistry>,
    max_idle: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let evicted = registry.evict_idle(max_idle).await;
            if evicted > 0 {
                let tracked = registry.tracked_users().await;
                tracing::info!(evicted, tracked, "Idle session sweep finished");
            }
        }
    })
}
