//! The in-memory list of experiments shared by every request handler.

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{json_kind, Error, Result};

/// A single experiment record. Records are schema-less JSON objects and are stored and returned
/// exactly as they were received.
pub type Experiment = Map<String, Value>;

/// An ordered collection of [`Experiment`]s, held for the lifetime of the server.
///
/// Every read and write goes through the same lock, so [`ExperimentStore::list`] always returns a
/// consistent snapshot and concurrent appends are never lost.
#[derive(Debug, Default)]
pub struct ExperimentStore {
    experiments: Mutex<Vec<Experiment>>,
}

impl ExperimentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the current experiments, in insertion order.
    pub async fn list(&self) -> Vec<Experiment> {
        self.experiments.lock().await.clone()
    }

    /// Adds an experiment to the end of the list and returns the stored record.
    ///
    /// Anything other than a JSON object is rejected with [`Error::ValidationError`] and nothing
    /// is stored.
    pub async fn append(&self, value: Value) -> Result<Experiment> {
        let experiment = match value {
            Value::Object(experiment) => experiment,
            other => {
                return Err(Error::ValidationError(format!(
                    "An experiment must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        self.experiments.lock().await.push(experiment.clone());
        Ok(experiment)
    }

    /// Swaps the whole list for `experiments` in one step.
    ///
    /// An empty list is never swapped in, so the current experiments survive an upstream that
    /// has nothing to report. Returns whether the swap happened.
    pub async fn replace(&self, experiments: Vec<Experiment>) -> bool {
        if experiments.is_empty() {
            return false;
        }

        *self.experiments.lock().await = experiments;
        true
    }

    pub async fn len(&self) -> usize {
        self.experiments.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.experiments.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    fn experiment(name: &str) -> Experiment {
        match json!({ "name": name }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn starts_empty() {
        let store = ExperimentStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.len().await, 0);
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn appends_keep_call_order() {
        let store = ExperimentStore::new();
        let names = ["cpu-hog", "net-delay", "cpu-hog", "pod-kill"];
        for name in names {
            store.append(json!({ "name": name })).await.unwrap();
        }

        let experiments = store.list().await;
        let listed: Vec<&str> = experiments
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(listed, names);
    }

    #[tokio::test]
    async fn append_returns_the_stored_record() {
        let store = ExperimentStore::new();
        let stored = store
            .append(json!({ "name": "trial-1", "metric": 0.87 }))
            .await
            .unwrap();

        assert_eq!(stored["name"], "trial-1");
        assert_eq!(store.list().await, vec![stored]);
    }

    #[tokio::test]
    async fn append_rejects_non_objects() {
        let store = ExperimentStore::new();
        for value in [json!([1, 2]), json!("name"), json!(3), Value::Null] {
            let result = store.append(value).await;
            assert!(matches!(result, Err(Error::ValidationError(_))));
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn replace_swaps_everything() {
        let store = ExperimentStore::new();
        store.append(json!({ "name": "old" })).await.unwrap();

        let fresh = vec![experiment("a"), experiment("b")];
        assert!(store.replace(fresh.clone()).await);
        assert_eq!(store.list().await, fresh);
    }

    #[tokio::test]
    async fn replace_with_nothing_keeps_current_list() {
        let store = ExperimentStore::new();
        store.append(json!({ "name": "keep-me" })).await.unwrap();

        assert!(!store.replace(Vec::new()).await);
        assert_eq!(store.list().await, vec![experiment("keep-me")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_not_lost() {
        let store = Arc::new(ExperimentStore::new());
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.append(json!({ "run": i })).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut runs: Vec<u64> = store
            .list()
            .await
            .iter()
            .map(|e| e["run"].as_u64().unwrap())
            .collect();
        runs.sort_unstable();
        assert_eq!(runs, (0..100).collect::<Vec<u64>>());
    }
}
