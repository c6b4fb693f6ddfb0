//! Per-call context handed to tool handlers.

use std::sync::Arc;

use kafka_mcp_broker::BrokerClient;
use tokio_util::sync::CancellationToken;

/// Everything a tool handler may use. Cloned per call; the only state shared
/// between calls is the broker client, which holds nothing but settings.
#[derive(Clone)]
pub struct ToolContext {
    pub broker: Arc<dyn BrokerClient>,
    /// `count` used when a caller omits it or passes a non-positive value
    pub default_count: usize,
    /// Fires when the client cancels this call
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(broker: Arc<dyn BrokerClient>, default_count: usize) -> Self {
        Self {
            broker,
            default_count,
            cancel: CancellationToken::new(),
        }
    }

    /// Same context bound to another cancellation token.
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            broker: Arc::clone(&self.broker),
            default_count: self.default_count,
            cancel,
        }
    }
}
