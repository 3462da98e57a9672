use crate::http::{HttpClient, HttpRequest};
use crate::session::{Quote, SharedSessionState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SCREENER_URL: &str =
    "https://api.nasdaq.com/api/screener/stocks?tableonly=true&limit=10&exchange=NASDAQ";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub url: String,
    pub max_items: usize,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            url: SCREENER_URL.to_string(),
            max_items: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network fetch failed.")]
    Network,

    #[error("Rate limited by provider (Too Many Requests).")]
    RateLimited,

    #[error("No parseable data in response.")]
    NoData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Another worker held the fetch slot; nothing was requested.
    Skipped,
    Updated(usize),
    Failed(FetchError),
}

/// Holds the fetch slot and always gives it back, including when the task is
/// cancelled mid-request.
struct FetchSlot {
    state: SharedSessionState,
    result: Option<Result<Vec<Quote>, String>>,
}

impl FetchSlot {
    fn claim(state: &SharedSessionState) -> Option<Self> {
        if !state.try_begin_fetch() {
            debug!("Fetch already running; ignoring trigger");
            return None;
        }
        Some(Self {
            state: state.clone(),
            result: None,
        })
    }
}

impl Drop for FetchSlot {
    fn drop(&mut self) {
        match self.result.take() {
            Some(result) => self.state.finish_fetch(result),
            None => self.state.set_fetching(false),
        }
    }
}

#[derive(Clone)]
pub struct FetchWorker {
    http: Arc<dyn HttpClient>,
    state: SharedSessionState,
    config: ScreenerConfig,
}

impl FetchWorker {
    pub fn new(http: Arc<dyn HttpClient>, state: SharedSessionState, config: ScreenerConfig) -> Self {
        Self {
            http,
            state,
            config,
        }
    }

    /// Runs one fetch on a background task. Returns `None` when a fetch is
    /// already in flight; the trigger is dropped, not queued.
    pub fn spawn(&self) -> Option<JoinHandle<FetchOutcome>> {
        let slot = FetchSlot::claim(&self.state)?;
        let worker = self.clone();
        Some(tokio::spawn(async move { worker.fetch_claimed(slot).await }))
    }

    pub async fn run(&self) -> FetchOutcome {
        match FetchSlot::claim(&self.state) {
            Some(slot) => self.fetch_claimed(slot).await,
            None => FetchOutcome::Skipped,
        }
    }

    async fn fetch_claimed(&self, mut slot: FetchSlot) -> FetchOutcome {
        match self.fetch_quotes().await {
            Ok(quotes) => {
                info!(count = quotes.len(), "Quotes updated");
                let count = quotes.len();
                slot.result = Some(Ok(quotes));
                FetchOutcome::Updated(count)
            }
            Err(e) => {
                warn!("Quote fetch failed: {e}");
                slot.result = Some(Err(e.to_string()));
                FetchOutcome::Failed(e)
            }
        }
    }

    async fn fetch_quotes(&self) -> Result<Vec<Quote>, FetchError> {
        let request = HttpRequest::get(&self.config.url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Referer", "https://www.nasdaq.com/");

        let response = self
            .http
            .perform_request(request)
            .await
            .map_err(|e| {
                debug!("Screener transport error: {e}");
                FetchError::Network
            })?;

        if response.status == 429 || response.body.contains("Too Many Requests") {
            return Err(FetchError::RateLimited);
        }
        if response.status >= 400 {
            debug!(status = response.status, "Screener returned error status");
            return Err(FetchError::Network);
        }

        let quotes = parse_quotes(&response.body, self.config.max_items);
        if quotes.is_empty() {
            return Err(FetchError::NoData);
        }
        Ok(quotes)
    }
}

/// Reads `data.table.rows[].{symbol,lastsale}` from a screener response.
fn parse_quotes(body: &str, max_items: usize) -> Vec<Quote> {
    let Ok(data) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    let rows = data
        .pointer("/data/table/rows")
        .or_else(|| data.pointer("/data/rows"))
        .and_then(|v| v.as_array());
    let Some(rows) = rows else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let symbol = row.get("symbol")?.as_str()?.trim();
            let price = row.get("lastsale")?.as_str()?.trim().trim_start_matches('$');
            if symbol.is_empty() || price.is_empty() {
                return None;
            }
            Some(Quote::new(symbol, price))
        })
        .take(max_items)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::http::HttpResponse;
    use crate::session::AccessToken;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const SCREENER_BODY: &str = r#"{"data":{"table":{"rows":[
        {"symbol":"NVDA","lastsale":"$178.9148"},
        {"symbol":"AAPL","lastsale":"$1,234.50"},
        {"symbol":"F","lastsale":"$12.01"},
        {"symbol":"TSLA","lastsale":"$250.00"},
        {"symbol":"AMD","lastsale":"$160.10"},
        {"symbol":"INTC","lastsale":"$30.00"}
    ]}}}"#;

    struct Screener {
        reply: Result<(u16, &'static str), ()>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl Screener {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok((status, body)),
                calls: AtomicUsize::new(0),
                gate: None,
            })
        }
    }

    impl HttpClient for Screener {
        fn perform_request(
            &self,
            _request: HttpRequest,
        ) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                match self.reply {
                    Ok((status, body)) => Ok(HttpResponse {
                        status,
                        body: body.to_string(),
                    }),
                    Err(()) => Err(TransportError("dns failure".into())),
                }
            })
        }
    }

    fn worker(http: Arc<Screener>, state: &SharedSessionState) -> FetchWorker {
        FetchWorker::new(http, state.clone(), ScreenerConfig::default())
    }

    fn signed_in() -> SharedSessionState {
        let state = SharedSessionState::new();
        state.publish_authenticated(&AccessToken::new("TOK").unwrap());
        state
    }

    #[test]
    fn parse_quotes_takes_first_rows() {
        let quotes = parse_quotes(SCREENER_BODY, 5);
        assert_eq!(quotes.len(), 5);
        assert_eq!(quotes[0], Quote::new("NVDA", "178.9148"));
        assert_eq!(quotes[1], Quote::new("AAPL", "1,234.50"));
    }

    #[test]
    fn parse_quotes_tolerates_garbage() {
        assert!(parse_quotes("<html>blocked</html>", 5).is_empty());
        assert!(parse_quotes(r#"{"data":null}"#, 5).is_empty());
        assert!(parse_quotes(r#"{"data":{"table":{"rows":[{"symbol":"X"}]}}}"#, 5).is_empty());
    }

    #[tokio::test]
    async fn successful_fetch_replaces_items() {
        let state = signed_in();
        state.publish_status("stale");
        let outcome = worker(Screener::new(200, SCREENER_BODY), &state).run().await;

        assert_eq!(outcome, FetchOutcome::Updated(5));
        let snapshot = state.read();
        assert_eq!(snapshot.items.len(), 5);
        assert!(snapshot.status_message.is_empty());
        assert!(!snapshot.fetching);
        assert!(snapshot.updated_at.is_some());
    }

    #[tokio::test]
    async fn failures_keep_items_and_report_cause() {
        let cases = [
            (Screener::new(200, "Edge: Too Many Requests"), FetchError::RateLimited),
            (Screener::new(429, ""), FetchError::RateLimited),
            (Screener::new(200, r#"{"data":{}}"#), FetchError::NoData),
            (Screener::new(503, "unavailable"), FetchError::Network),
            (
                Arc::new(Screener {
                    reply: Err(()),
                    calls: AtomicUsize::new(0),
                    gate: None,
                }),
                FetchError::Network,
            ),
        ];

        for (http, expected) in cases {
            let state = signed_in();
            state.publish_items(vec![Quote::new("OLD", "1.00")]);

            let outcome = worker(http, &state).run().await;

            assert_eq!(outcome, FetchOutcome::Failed(expected.clone()));
            let snapshot = state.read();
            assert_eq!(snapshot.items, vec![Quote::new("OLD", "1.00")]);
            assert_eq!(snapshot.status_message, expected.to_string());
            assert!(!snapshot.fetching);
        }
    }

    #[tokio::test]
    async fn second_trigger_is_ignored_while_running() {
        let gate = Arc::new(Notify::new());
        let http = Arc::new(Screener {
            reply: Ok((200, SCREENER_BODY)),
            calls: AtomicUsize::new(0),
            gate: Some(gate.clone()),
        });
        let state = SharedSessionState::new();
        let worker = worker(http.clone(), &state);

        let first = worker.spawn().expect("first fetch starts");
        assert!(state.read().fetching);
        assert!(worker.spawn().is_none());
        assert_eq!(worker.run().await, FetchOutcome::Skipped);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), FetchOutcome::Updated(5));
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
        assert!(!state.read().fetching);
    }

    #[tokio::test]
    async fn logout_during_fetch_keeps_session_empty() {
        let gate = Arc::new(Notify::new());
        let http = Arc::new(Screener {
            reply: Ok((200, SCREENER_BODY)),
            calls: AtomicUsize::new(0),
            gate: Some(gate.clone()),
        });
        let state = signed_in();
        let handle = worker(http, &state).spawn().expect("fetch starts");

        state.logout("Logged out");
        gate.notify_one();
        handle.await.unwrap();

        let snapshot = state.read();
        assert!(!snapshot.authenticated);
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.status_message, "Logged out");
        assert!(!snapshot.fetching);
    }

    #[tokio::test]
    async fn aborted_fetch_releases_slot() {
        let http = Arc::new(Screener {
            reply: Ok((200, SCREENER_BODY)),
            calls: AtomicUsize::new(0),
            gate: Some(Arc::new(Notify::new())),
        });
        let state = SharedSessionState::new();
        state.publish_items(vec![Quote::new("OLD", "1.00")]);
        let handle = worker(http, &state).spawn().expect("fetch starts");

        handle.abort();
        let _ = handle.await;

        let snapshot = state.read();
        assert!(!snapshot.fetching);
        assert_eq!(snapshot.items, vec![Quote::new("OLD", "1.00")]);
    }
}
