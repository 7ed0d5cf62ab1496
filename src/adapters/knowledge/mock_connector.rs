//! Mock knowledge connector for testing.
//!
//! Returns configured devices, guide listings, and guides; injects
//! failures and delays; records every call for verification.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::foundation::GuideId;
use crate::ports::{ConnectorError, DeviceHit, Guide, GuideSummary, KnowledgeConnector};

/// Configurable mock implementation of the `KnowledgeConnector` port.
///
/// Empty by default: searches and listings return empty vecs, guide lookups
/// return `None`, which is exactly the "verified path empty" shape.
#[derive(Clone, Default)]
pub struct MockKnowledgeConnector {
    devices: Arc<Mutex<Vec<DeviceHit>>>,
    guides: Arc<Mutex<Vec<GuideSummary>>>,
    guide_steps: Arc<Mutex<HashMap<GuideId, Guide>>>,
    failure: Arc<Mutex<Option<ConnectorError>>>,
    delay: Arc<Mutex<Duration>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockKnowledgeConnector {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the device hits returned by `search_device`.
    pub fn with_devices(self, devices: Vec<DeviceHit>) -> Self {
        *self.devices.lock().unwrap() = devices;
        self
    }

    /// Sets the guide summaries returned by `list_guides`.
    pub fn with_guides(self, guides: Vec<GuideSummary>) -> Self {
        *self.guides.lock().unwrap() = guides;
        self
    }

    /// Registers a full guide for `get_guide_steps`.
    pub fn with_guide(self, id: GuideId, guide: Guide) -> Self {
        self.guide_steps.lock().unwrap().insert(id, guide);
        self
    }

    /// Makes every call fail with the given error.
    pub fn with_failure(self, error: ConnectorError) -> Self {
        *self.failure.lock().unwrap() = Some(error);
        self
    }

    /// Adds latency to every call.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    /// Total number of calls received.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Names of the operations called, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, operation: &str) -> Result<(), ConnectorError> {
        self.calls.lock().unwrap().push(operation.to_string());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeConnector for MockKnowledgeConnector {
    async fn search_device(&self, _query: &str) -> Result<Vec<DeviceHit>, ConnectorError> {
        self.enter("search_device").await?;
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn list_guides(&self, _device_title: &str) -> Result<Vec<GuideSummary>, ConnectorError> {
        self.enter("list_guides").await?;
        Ok(self.guides.lock().unwrap().clone())
    }

    async fn get_guide_steps(&self, guide_id: GuideId) -> Result<Option<Guide>, ConnectorError> {
        self.enter("get_guide_steps").await?;
        Ok(self.guide_steps.lock().unwrap().get(&guide_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GuideStep;

    #[tokio::test]
    async fn empty_mock_returns_empty_results() {
        let mock = MockKnowledgeConnector::new();

        assert!(mock.search_device("PS5").await.unwrap().is_empty());
        assert!(mock.list_guides("PlayStation 5").await.unwrap().is_empty());
        assert!(mock.get_guide_steps(GuideId::new(1)).await.unwrap().is_none());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn configured_guide_is_returned_by_id() {
        let mock = MockKnowledgeConnector::new().with_guide(
            GuideId::new(8247),
            Guide {
                title: "Joystick Replacement".to_string(),
                steps: vec![GuideStep {
                    text: "Open the controller.".to_string(),
                    image_url: None,
                }],
                url: "https://example.com/guide/8247".to_string(),
            },
        );

        let guide = mock.get_guide_steps(GuideId::new(8247)).await.unwrap().unwrap();
        assert_eq!(guide.title, "Joystick Replacement");
        assert!(mock.get_guide_steps(GuideId::new(9999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failure_mode_rejects_every_call() {
        let mock = MockKnowledgeConnector::new()
            .with_failure(ConnectorError::unavailable("down for maintenance"));

        assert!(mock.search_device("PS5").await.is_err());
        assert!(mock.list_guides("PS5").await.is_err());
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let mock = MockKnowledgeConnector::new();
        mock.search_device("PS5").await.unwrap();
        mock.list_guides("PlayStation 5").await.unwrap();

        assert_eq!(mock.calls(), vec!["search_device", "list_guides"]);
    }
}
