//! Mock search connector for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::ports::{ConnectorError, GroundedAnswer, SearchConnector};

/// Configurable mock implementation of the `SearchConnector` port.
#[derive(Clone)]
pub struct MockSearchConnector {
    answer: Arc<Mutex<GroundedAnswer>>,
    failure: Arc<Mutex<Option<ConnectorError>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl Default for MockSearchConnector {
    fn default() -> Self {
        Self {
            answer: Arc::new(Mutex::new(GroundedAnswer::new(
                "No community results found.",
                vec![],
            ))),
            failure: Arc::new(Mutex::new(None)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockSearchConnector {
    /// Creates a mock returning a generic empty-handed answer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the answer returned by `web_search`.
    pub fn with_answer(self, answer: GroundedAnswer) -> Self {
        *self.answer.lock().unwrap() = answer;
        self
    }

    /// Makes every call fail with the given error.
    pub fn with_failure(self, error: ConnectorError) -> Self {
        *self.failure.lock().unwrap() = Some(error);
        self
    }

    /// Number of searches received.
    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    /// Queries received, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchConnector for MockSearchConnector {
    async fn web_search(&self, query: &str) -> Result<GroundedAnswer, ConnectorError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.answer.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Citation;

    #[tokio::test]
    async fn configured_answer_is_returned() {
        let mock = MockSearchConnector::new().with_answer(GroundedAnswer::new(
            "Recalibrate via settings first.",
            vec![Citation {
                title: "Drift megathread".to_string(),
                url: "https://forum.example.com/drift".to_string(),
            }],
        ));

        let answer = mock.web_search("dualsense drift").await.unwrap();

        assert_eq!(answer.text, "Recalibrate via settings first.");
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(mock.queries(), vec!["dualsense drift"]);
    }

    #[tokio::test]
    async fn failure_mode_rejects_search() {
        let mock = MockSearchConnector::new()
            .with_failure(ConnectorError::Timeout { timeout_secs: 5 });

        assert!(mock.web_search("anything").await.is_err());
        assert_eq!(mock.call_count(), 1);
    }
}
