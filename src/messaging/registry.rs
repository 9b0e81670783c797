//! Message Handler Registry
//!
//! Maps string-based handler names carried in message envelopes to executable
//! Rust closures. Applications register handlers before initialization; a
//! member that receives a message for an unknown handler logs and stays
//! silent, which to the sender is indistinguishable from a lost packet.

use anyhow::Result;
use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a thread-safe, asynchronous message handler. It takes the
/// message payload and returns the completion value reported back to the
/// sender's execution status.
pub type MessageHandlerFn =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync>;

/// Registry holding the mapping between handler names and their implementation.
pub struct MessageHandlerRegistry {
    handlers: DashMap<String, MessageHandlerFn>,
}

impl MessageHandlerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handlers: DashMap::new(),
        })
    }

    /// Registers a handler under a name. Re-registering a name replaces the
    /// previous handler.
    pub fn register<F, Fut>(&self, handler_name: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        // Box::pin type-erases the concrete Future so different async
        // functions can live in the same map.
        let handler_fn: MessageHandlerFn = Arc::new(move |payload: Value| {
            Box::pin(handler(payload)) as Pin<Box<dyn Future<Output = Result<Value>> + Send>>
        });

        self.handlers.insert(handler_name.to_string(), handler_fn);

        tracing::info!("Registered message handler: {}", handler_name);
    }

    /// Looks up a handler by name and executes it with the message payload.
    pub async fn execute(&self, handler_name: &str, payload: Value) -> Result<Value> {
        let handler_fn = match self.handlers.get(handler_name) {
            Some(entry) => entry.value().clone(),
            None => {
                anyhow::bail!("Unknown message handler: {}", handler_name);
            }
        };

        tracing::debug!("Executing message handler '{}'", handler_name);
        handler_fn(payload).await
    }

    pub fn has_handler(&self, handler_name: &str) -> bool {
        self.handlers.contains_key(handler_name)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for MessageHandlerRegistry {
    fn default() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }
}
