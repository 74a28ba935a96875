use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{Transport, TransportError};

/// Recording transport for session tests.
#[derive(Clone, Default)]
pub struct MockTransport {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent so far, in generation order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(frame.to_vec());
        Ok(())
    }
}
