//! Search-as-you-type suggestion coalescing.
//!
//! Every keystroke resets a fixed 300 ms timer; only the last pending
//! query actually fires. A response that arrives after its query was
//! superseded is discarded by comparing generation tokens - the
//! underlying request is not aborted, only its effect on the published
//! state.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use crate::api::types::Product;
use crate::api::{ApiError, CatalogService};

/// Delay between the last keystroke and the suggestion fetch.
pub const SUGGESTION_DEBOUNCE: Duration = Duration::from_millis(300);

/// Where suggestions come from.
pub trait SuggestionSource: Send + Sync + 'static {
    /// Fetch suggestions for a non-empty query.
    fn fetch_suggestions(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;
}

impl SuggestionSource for CatalogService {
    async fn fetch_suggestions(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        self.suggestions(query).await
    }
}

/// Published suggestion state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionState {
    /// The query these items answer.
    pub query: String,
    pub items: Vec<Product>,
}

/// Debounced suggestion box.
///
/// Cheaply cloneable; clones share the timer generation and the
/// published state.
#[derive(Clone)]
pub struct SuggestionBox<S> {
    inner: Arc<SuggestionBoxInner<S>>,
}

struct SuggestionBoxInner<S> {
    source: S,
    generation: AtomicU64,
    state: watch::Sender<SuggestionState>,
}

impl<S: SuggestionSource> SuggestionBox<S> {
    /// Create a suggestion box over a source.
    #[must_use]
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(SuggestionState::default());

        Self {
            inner: Arc::new(SuggestionBoxInner {
                source,
                generation: AtomicU64::new(0),
                state,
            }),
        }
    }

    /// Subscribe to published suggestion updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.inner.state.subscribe()
    }

    /// The most recently published state.
    #[must_use]
    pub fn latest(&self) -> SuggestionState {
        self.inner.state.borrow().clone()
    }

    /// Feed one keystroke's worth of input.
    ///
    /// Supersedes any pending or in-flight query. Queries empty after
    /// trimming publish an empty list without touching the source.
    pub fn input(&self, query: &str) {
        let token = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim().to_owned();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tokio::time::sleep(SUGGESTION_DEBOUNCE).await;

            // Superseded while waiting out the debounce window.
            if inner.generation.load(Ordering::SeqCst) != token {
                return;
            }

            if query.is_empty() {
                inner.state.send_replace(SuggestionState::default());
                return;
            }

            let items = match inner.source.fetch_suggestions(&query).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(error = %e, query = %query, "suggestion fetch failed");
                    Vec::new()
                }
            };

            // A newer query took over while this one was in flight; its
            // result must not reach the UI.
            if inner.generation.load(Ordering::SeqCst) == token {
                inner.state.send_replace(SuggestionState { query, items });
            }
        });
    }

    /// Drop any pending query and publish an empty state.
    pub fn clear(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(SuggestionState::default());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use juniper_core::{Price, ProductId};

    use super::*;

    #[derive(Clone)]
    struct StubSource {
        calls: Arc<Mutex<Vec<String>>>,
        fetch_delay: Duration,
    }

    impl StubSource {
        fn new(fetch_delay: Duration) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                fetch_delay,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SuggestionSource for StubSource {
        async fn fetch_suggestions(&self, query: &str) -> Result<Vec<Product>, ApiError> {
            self.calls.lock().unwrap().push(query.to_owned());
            tokio::time::sleep(self.fetch_delay).await;

            Ok(vec![Product {
                id: ProductId::new(1),
                name: query.to_owned(),
                category: String::new(),
                description: String::new(),
                price: Price::ZERO,
                stock: 1,
                base64_image: String::new(),
            }])
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_pending_query_fires() {
        let source = StubSource::new(Duration::ZERO);
        let suggestions = SuggestionBox::new(source.clone());

        suggestions.input("a");
        suggestions.input("ap");
        suggestions.input("app");

        tokio::time::advance(SUGGESTION_DEBOUNCE + Duration::from_millis(10)).await;
        settle().await;

        assert_eq!(source.calls(), vec!["app".to_string()]);
        assert_eq!(suggestions.latest().query, "app");
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_in_flight_result_is_discarded() {
        let source = StubSource::new(Duration::from_millis(100));
        let suggestions = SuggestionBox::new(source.clone());

        suggestions.input("slow");
        // Let "slow" clear the debounce window and start its fetch.
        tokio::time::advance(SUGGESTION_DEBOUNCE + Duration::from_millis(10)).await;
        settle().await;

        // New input supersedes "slow" while its response is in flight.
        suggestions.input("fast");
        tokio::time::advance(SUGGESTION_DEBOUNCE + Duration::from_millis(200)).await;
        settle().await;

        // Both requests went out (no aborting), but only "fast" published.
        assert_eq!(source.calls(), vec!["slow".to_string(), "fast".to_string()]);
        assert_eq!(suggestions.latest().query, "fast");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_publishes_empty_without_fetching() {
        let source = StubSource::new(Duration::ZERO);
        let suggestions = SuggestionBox::new(source.clone());

        suggestions.input("tea");
        tokio::time::advance(SUGGESTION_DEBOUNCE + Duration::from_millis(10)).await;
        settle().await;
        assert_eq!(suggestions.latest().query, "tea");

        suggestions.input("   ");
        tokio::time::advance(SUGGESTION_DEBOUNCE + Duration::from_millis(10)).await;
        settle().await;

        assert_eq!(suggestions.latest(), SuggestionState::default());
        assert_eq!(source.calls(), vec!["tea".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_supersedes_pending_query() {
        let source = StubSource::new(Duration::ZERO);
        let suggestions = SuggestionBox::new(source.clone());

        suggestions.input("pending");
        suggestions.clear();

        tokio::time::advance(SUGGESTION_DEBOUNCE + Duration::from_millis(10)).await;
        settle().await;

        assert!(source.calls().is_empty());
        assert_eq!(suggestions.latest(), SuggestionState::default());
    }
}
