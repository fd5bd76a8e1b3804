use std::sync::Arc;

use log::warn;

use crate::store::StateStore;

/// The job events that trigger a one-time redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Failed,
    /// Shared by `Cancelling` and `Cancelled`.
    Cancelled,
}

impl TransitionKind {
    fn store_key(self) -> &'static str {
        match self {
            TransitionKind::Failed => "lastfailedjob",
            TransitionKind::Cancelled => "lastcancelledjob",
        }
    }
}

/// Remembers, per transition kind, the last job id whose redirect reached the panel.
///
/// Backed by the state store so a restart does not send the panel back to an
/// error it already showed.
#[derive(Debug)]
pub struct TransitionMemory {
    failed: Option<String>,
    cancelled: Option<String>,
    store: Arc<StateStore>,
}

impl TransitionMemory {
    pub fn load(store: Arc<StateStore>) -> Self {
        Self {
            failed: store.get(TransitionKind::Failed.store_key()),
            cancelled: store.get(TransitionKind::Cancelled.store_key()),
            store,
        }
    }

    fn slot(&self, kind: TransitionKind) -> Option<&str> {
        match kind {
            TransitionKind::Failed => self.failed.as_deref(),
            TransitionKind::Cancelled => self.cancelled.as_deref(),
        }
    }

    /// True unless `job_id` is already the recorded id for `kind`.
    pub fn is_new(&self, kind: TransitionKind, job_id: &str) -> bool {
        self.slot(kind) != Some(job_id)
    }

    /// Records `job_id` as handled for `kind`.
    pub fn record(&mut self, kind: TransitionKind, job_id: &str) {
        let slot = match kind {
            TransitionKind::Failed => &mut self.failed,
            TransitionKind::Cancelled => &mut self.cancelled,
        };
        *slot = Some(job_id.to_owned());

        if let Err(e) = self.store.set(kind.store_key(), job_id) {
            warn!("Could not persist {:?} transition for job '{}': {}", kind, job_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_ids_are_no_longer_new() {
        let mut memory = TransitionMemory::load(Arc::new(StateStore::in_memory()));
        assert!(memory.is_new(TransitionKind::Failed, "A"));
        memory.record(TransitionKind::Failed, "A");
        assert!(!memory.is_new(TransitionKind::Failed, "A"));
        assert!(memory.is_new(TransitionKind::Failed, "B"));
        memory.record(TransitionKind::Failed, "B");
        assert!(memory.is_new(TransitionKind::Failed, "A"));
    }

    #[test]
    fn kinds_are_independent() {
        let mut memory = TransitionMemory::load(Arc::new(StateStore::in_memory()));
        memory.record(TransitionKind::Failed, "A");
        assert!(memory.is_new(TransitionKind::Cancelled, "A"));
    }

    #[test]
    fn empty_id_is_an_ordinary_value() {
        let mut memory = TransitionMemory::load(Arc::new(StateStore::in_memory()));
        assert!(memory.is_new(TransitionKind::Cancelled, ""));
        memory.record(TransitionKind::Cancelled, "");
        assert!(!memory.is_new(TransitionKind::Cancelled, ""));
    }

    #[test]
    fn memory_is_restored_from_the_store() {
        let store = Arc::new(StateStore::in_memory());
        let mut memory = TransitionMemory::load(store.clone());
        memory.record(TransitionKind::Failed, "J7");

        let restored = TransitionMemory::load(store.clone());
        assert!(!restored.is_new(TransitionKind::Failed, "J7"));
        assert_eq!(store.get("lastfailedjob").as_deref(), Some("J7"));
    }
}
