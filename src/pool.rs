//! Worker pool: bounded-concurrency fan-out of acquisitions.
//!
//! One task is spawned per item; a semaphore caps how many are acquiring at
//! once. Results are collected in completion order. A panic inside one
//! acquisition is caught and turned into a `Failed` result, so every submitted
//! item yields exactly one result and siblings are never affected.

use crate::acquisition::StrategyChain;
use crate::types::{AcquisitionResult, CandidateItem};
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// Runs acquisitions for a batch of items
#[derive(Clone)]
pub struct WorkerPool {
    chain: Arc<StrategyChain>,
}

impl WorkerPool {
    /// Create a pool driving `chain`
    pub fn new(chain: Arc<StrategyChain>) -> Self {
        Self { chain }
    }

    /// Acquire every item with at most `concurrency` in flight
    ///
    /// Returns once all items have completed; the result vector has one entry
    /// per item, in completion order. A `concurrency` of 0 is treated as 1.
    pub async fn run(
        &self,
        items: Vec<CandidateItem>,
        concurrency: usize,
        prefer_audio_only: bool,
    ) -> Vec<AcquisitionResult> {
        let concurrency = concurrency.max(1);
        let total = items.len();
        debug!(items = total, concurrency, "starting worker pool");

        let limit = Arc::new(Semaphore::new(concurrency));
        let mut tasks = FuturesUnordered::new();

        for item in items {
            let chain = self.chain.clone();
            let limit = limit.clone();
            let task_item = item.clone();

            let handle = tokio::spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail
                let _permit = limit.acquire_owned().await.ok();

                match AssertUnwindSafe(chain.acquire(&task_item, prefer_audio_only))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!(item_id = %task_item.id, panic = %message, "acquisition panicked");
                        AcquisitionResult::failed(
                            task_item,
                            format!("acquisition panicked: {message}"),
                        )
                    }
                }
            });

            tasks.push(async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        error!(
                            item_id = %item.id,
                            error = %e,
                            "acquisition task did not complete"
                        );
                        AcquisitionResult::failed(item, format!("acquisition task failed: {e}"))
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(result) = tasks.next().await {
            results.push(result);
        }

        debug!(
            items = total,
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            "worker pool finished"
        );
        results
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::test_helpers::{Script, ScriptedStrategy};
    use crate::ledger::DedupLedger;
    use std::collections::HashSet;
    use std::time::Duration;

    async fn pool_with(strategy: Arc<ScriptedStrategy>, dir: &std::path::Path) -> WorkerPool {
        let ledger = Arc::new(DedupLedger::load(dir.join("ledger.txt")).await);
        let chain = StrategyChain::new(ledger, dir.join("downloads")).with_strategy(strategy);
        WorkerPool::new(Arc::new(chain))
    }

    fn items(ids: &[&str]) -> Vec<CandidateItem> {
        ids.iter()
            .map(|id| {
                CandidateItem::new(
                    *id,
                    format!("Title {id}"),
                    format!("https://example.com/{id}"),
                    None,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn one_failing_item_does_not_affect_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = Arc::new(ScriptedStrategy::new(
            "video",
            Script::FailFor(vec!["bad".into()]),
        ));
        let pool = pool_with(strategy, dir.path()).await;

        let results = pool.run(items(&["a", "bad", "b", "c"]), 2, false).await;

        assert_eq!(results.len(), 4);
        assert_eq!(results.iter().filter(|r| r.is_success()).count(), 3);
        let failed: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].item.id, "bad");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panic_becomes_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = Arc::new(ScriptedStrategy::new(
            "video",
            Script::PanicFor(vec!["boom".into()]),
        ));
        let pool = pool_with(strategy, dir.path()).await;

        let results = pool.run(items(&["a", "boom", "b"]), 3, false).await;

        assert_eq!(results.len(), 3);
        let boom = results.iter().find(|r| r.item.id == "boom").unwrap();
        assert!(boom.failure_reason().unwrap().contains("panicked"));
        assert!(boom.failure_reason().unwrap().contains("scripted panic for boom"));
        assert_eq!(results.iter().filter(|r| r.is_success()).count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = Arc::new(
            ScriptedStrategy::new("video", Script::Media).with_delay(Duration::from_millis(50)),
        );
        let pool = pool_with(strategy.clone(), dir.path()).await;

        let ids: Vec<String> = (0..8).map(|i| format!("item{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let results = pool.run(items(&id_refs), 2, false).await;

        assert_eq!(results.len(), 8);
        assert!(strategy.max_in_flight() <= 2, "saw {}", strategy.max_in_flight());
        assert!(strategy.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn every_item_yields_exactly_one_result() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = Arc::new(ScriptedStrategy::new("video", Script::Media));
        let pool = pool_with(strategy, dir.path()).await;

        let results = pool.run(items(&["a", "b", "c", "d", "e"]), 0, false).await;

        let ids: HashSet<_> = results.iter().map(|r| r.item.id.as_str()).collect();
        assert_eq!(results.len(), 5);
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn items_sharing_a_title_keep_their_own_audio() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = Arc::new(
            ScriptedStrategy::new("audio", Script::Audio).with_delay(Duration::from_millis(20)),
        );
        let pool = pool_with(strategy, dir.path()).await;
        let batch: Vec<CandidateItem> = ["aaa", "bbb"]
            .iter()
            .map(|id| {
                CandidateItem::new(
                    *id,
                    "Daily Update",
                    format!("https://yt/watch?v={id}"),
                    None,
                )
            })
            .collect();

        let results = pool.run(batch, 2, true).await;

        assert_eq!(results.len(), 2);
        let audio: Vec<_> = results
            .iter()
            .map(|r| {
                assert!(r.is_success(), "{:?}", r.failure_reason());
                let path = r.audio_path.clone().unwrap();
                assert_eq!(std::fs::read_to_string(&path).unwrap(), r.item.id);
                path
            })
            .collect();
        assert_ne!(audio[0], audio[1]);
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = Arc::new(ScriptedStrategy::new("video", Script::Media));
        let pool = pool_with(strategy.clone(), dir.path()).await;

        assert!(pool.run(Vec::new(), 4, true).await.is_empty());
        assert!(strategy.calls().is_empty());
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");
        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
