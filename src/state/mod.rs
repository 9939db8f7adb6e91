pub mod buzz;
pub mod game;
pub mod registry;
pub mod round_data;

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, question_source::QuestionSource},
    error::ServiceError,
};

pub use self::registry::{Listener, ListenerId, SessionRegistry};

pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, listener registry and per-session gates.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
    listeners: SessionRegistry,
    session_gates: DashMap<Uuid, Arc<Mutex<()>>>,
    questions: Arc<dyn QuestionSource>,
    config: Arc<AppConfig>,
    mutation_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, questions: Arc<dyn QuestionSource>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let mutation_timeout = Some(config.mutation_timeout).filter(|limit| !limit.is_zero());
        Arc::new(Self {
            game_store: RwLock::new(None),
            degraded: degraded_tx,
            listeners: SessionRegistry::new(),
            session_gates: DashMap::new(),
            questions,
            config: Arc::new(config),
            mutation_timeout,
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current game store, or [`ServiceError::Degraded`] while none is installed.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Listener fan-out registry.
    pub fn listeners(&self) -> &SessionRegistry {
        &self.listeners
    }

    /// Question generation collaborator.
    pub fn questions(&self) -> Arc<dyn QuestionSource> {
        self.questions.clone()
    }

    /// Effective runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Exclusion gate serializing mutations of one session.
    pub fn session_gate(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        self.session_gates
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the gate of a session once no task holds or waits on it.
    ///
    /// Callers must have dropped their own handle first.
    pub fn release_session_gate(&self, session_id: Uuid) {
        self.session_gates
            .remove_if(&session_id, |_, gate| Arc::strong_count(gate) == 1);
    }

    /// Number of sessions with a live gate.
    pub fn session_gate_count(&self) -> usize {
        self.session_gates.len()
    }

    /// Run `work` under the configured mutation timeout.
    pub async fn with_mutation_timeout<Fut, T>(&self, work: Fut) -> Result<T, ServiceError>
    where
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        match self.mutation_timeout {
            Some(limit) => timeout(limit, work)
                .await
                .map_err(|_| ServiceError::Timeout)?,
            None => work.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use serde_json::Value;

    use super::*;
    use crate::dao::{
        game_store::memory::MemoryGameStore,
        question_source::{QuestionSourceError, QuestionSourceResult},
    };

    struct NoQuestions;

    impl QuestionSource for NoQuestions {
        fn complete_json(&self, _prompt: String) -> BoxFuture<'static, QuestionSourceResult<Value>> {
            Box::pin(async { Err(QuestionSourceError::MissingApiKey) })
        }
    }

    fn state_with_timeout(ms: u64) -> SharedState {
        let config = AppConfig {
            mutation_timeout: Duration::from_millis(ms),
            ..AppConfig::default()
        };
        AppState::new(config, Arc::new(NoQuestions))
    }

    #[tokio::test]
    async fn installing_a_store_leaves_degraded_mode() {
        let state = state_with_timeout(1_000);
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow());

        state.clear_game_store().await;
        assert!(state.is_degraded());
        assert!(state.game_store().await.is_none());
    }

    #[test]
    fn gates_are_shared_and_released_when_idle() {
        let state = state_with_timeout(1_000);
        let session = Uuid::new_v4();

        let first = state.session_gate(session);
        let second = state.session_gate(session);
        assert!(Arc::ptr_eq(&first, &second));

        drop(first);
        state.release_session_gate(session);
        assert_eq!(state.session_gate_count(), 1);

        drop(second);
        state.release_session_gate(session);
        assert_eq!(state.session_gate_count(), 0);
    }

    #[tokio::test]
    async fn slow_mutations_time_out() {
        let state = state_with_timeout(10);

        let result = state
            .with_mutation_timeout(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<(), ServiceError>(())
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Timeout)));
    }

    #[tokio::test]
    async fn zero_timeout_disables_the_limit() {
        let state = state_with_timeout(0);

        let value = state
            .with_mutation_timeout(async { Ok::<_, ServiceError>(7) })
            .await
            .unwrap();

        assert_eq!(value, 7);
    }
}
