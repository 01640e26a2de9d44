use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::{BackendHandle, BackendKind, ModelLoader};

/// Lazily acquires and caches one model session per backend kind.
///
/// Each kind has its own [`OnceCell`], so concurrent first requests for the
/// same kind run a single acquisition and every caller receives the same
/// handle. Failed acquisitions are cached as [`BackendHandle::Unavailable`]
/// and logged once. Entries are never evicted.
pub struct BackendRegistry {
    loader: Arc<dyn ModelLoader>,
    acquire_timeout: Duration,
    cells: [OnceCell<BackendHandle>; 3],
}

impl BackendRegistry {
    pub fn new(loader: Arc<dyn ModelLoader>, acquire_timeout: Duration) -> Self {
        Self {
            loader,
            acquire_timeout,
            cells: std::array::from_fn(|_| OnceCell::new()),
        }
    }

    /// Handle for `kind`, acquiring it on first use
    pub async fn get(&self, kind: BackendKind) -> BackendHandle {
        self.cells[kind.index()]
            .get_or_init(|| self.acquire(kind))
            .await
            .clone()
    }

    /// Kinds whose acquisition has completed, successfully or not
    pub fn loaded_kinds(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| self.cells[kind.index()].initialized())
            .collect()
    }

    async fn acquire(&self, kind: BackendKind) -> BackendHandle {
        info!("Loading the {} backend", kind);

        match tokio::time::timeout(self.acquire_timeout, self.loader.load(kind)).await {
            Ok(Ok(model)) => {
                info!("Loaded the {} backend ({})", kind, model.model);
                BackendHandle::Ready(Arc::new(model))
            }
            Ok(Err(e)) => {
                error!("Error loading the {} backend: {}", kind, e);
                BackendHandle::Unavailable { reason: e.to_string() }
            }
            Err(_) => {
                let reason = format!("model acquisition timed out after {}s", self.acquire_timeout.as_secs());
                error!("Error loading the {} backend: {}", kind, reason);
                BackendHandle::Unavailable { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use crate::error::{Result, ParleyError};
    use crate::generate::{DecodingPolicy, InferenceEngine, LoadedModel, PreparedPrompt};

    struct EchoEngine;

    #[async_trait]
    impl InferenceEngine for EchoEngine {
        async fn complete(&self, _model: &str, prompt: &PreparedPrompt, _policy: &DecodingPolicy) -> Result<String> {
            Ok(prompt.prompt.clone())
        }
    }

    /// Counts acquisitions and takes a while so racing callers overlap
    struct CountingLoader {
        loads: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingLoader {
        fn new(delay: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                loads: AtomicUsize::new(0),
                delay,
                fail,
            })
        }
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self, kind: BackendKind) -> Result<LoadedModel> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(ParleyError::ModelUnavailable("weights missing".to_string()));
            }
            Ok(LoadedModel::new(kind, format!("{}-model", kind.label()), Arc::new(EchoEngine)))
        }
    }

    #[tokio::test]
    async fn test_handle_is_reused() {
        let loader = CountingLoader::new(Duration::ZERO, false);
        let registry = BackendRegistry::new(loader.clone(), Duration::from_secs(5));

        let first = registry.get(BackendKind::InstructionSeq2Seq).await;
        let second = registry.get(BackendKind::InstructionSeq2Seq).await;

        assert!(first.is_ready());
        assert!(first.same_instance(&second));
        assert_eq!(first.model_name(), Some("instruction-model"));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_constructs_once() {
        let loader = CountingLoader::new(Duration::from_millis(50), false);
        let registry = Arc::new(BackendRegistry::new(loader.clone(), Duration::from_secs(5)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get(BackendKind::CausalDialogue).await })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        for handle in &handles {
            assert!(handle.same_instance(&handles[0]));
        }
    }

    #[tokio::test]
    async fn test_kinds_are_cached_independently() {
        let loader = CountingLoader::new(Duration::ZERO, false);
        let registry = BackendRegistry::new(loader.clone(), Duration::from_secs(5));

        let causal = registry.get(BackendKind::CausalDialogue).await;
        let conversational = registry.get(BackendKind::ConversationalSeq2Seq).await;

        assert!(!causal.same_instance(&conversational));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert_eq!(
            registry.loaded_kinds(),
            vec![BackendKind::CausalDialogue, BackendKind::ConversationalSeq2Seq]
        );
    }

    #[tokio::test]
    async fn test_failure_is_cached_as_unavailable() {
        let loader = CountingLoader::new(Duration::ZERO, true);
        let registry = BackendRegistry::new(loader.clone(), Duration::from_secs(5));

        let first = registry.get(BackendKind::CausalDialogue).await;
        let second = registry.get(BackendKind::CausalDialogue).await;

        assert!(matches!(first, BackendHandle::Unavailable { ref reason } if reason.contains("weights missing")));
        assert!(!second.is_ready());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_acquisition_times_out() {
        let loader = CountingLoader::new(Duration::from_secs(30), false);
        let registry = BackendRegistry::new(loader, Duration::from_millis(20));

        let handle = registry.get(BackendKind::ConversationalSeq2Seq).await;
        assert!(matches!(handle, BackendHandle::Unavailable { ref reason } if reason.contains("timed out")));
    }
}
