//! In-process publish/subscribe for user domain events.
//!
//! Repositories publish the events an aggregate recorded once its new
//! state is stored. Delivery is synchronous and in subscription order.
//!
//! Failure policy: a handler error is logged at `warn` and skipped. It
//! never fails the save that triggered it and never stops later handlers.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use common::AppResult;
use domain::UserEvent;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Sink for published events.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: &UserEvent);
}

/// Side effect run for every published event.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Label used when logging failures
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &UserEvent) -> AppResult<()>;
}

/// Event bus that fans out to subscribed handlers in-process.
#[derive(Default)]
pub struct InProcessEventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl InProcessEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handlers(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self {
            handlers: RwLock::new(handlers),
        }
    }

    pub async fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        tracing::debug!(handler = handler.name(), "Event handler subscribed");
        self.handlers.write().await.push(handler);
    }

    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    async fn publish(&self, event: &UserEvent) {
        // Snapshot so handlers may subscribe further handlers without deadlock
        let handlers = self.handlers.read().await.clone();

        for handler in handlers {
            if let Err(e) = handler.handle(event).await {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = event.event_type(),
                    user_id = %event.user_id(),
                    error = %e,
                    "Event handler failed"
                );
            }
        }
    }
}

/// Writes each event to the log.
pub struct LoggingEventHandler;

#[async_trait]
impl EventHandler for LoggingEventHandler {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, event: &UserEvent) -> AppResult<()> {
        tracing::info!(
            event_type = event.event_type(),
            user_id = %event.user_id(),
            occurred_at = %event.occurred_at(),
            "Domain event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::AppError;
    use domain::UserId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn deactivated() -> UserEvent {
        UserEvent::Deactivated {
            user_id: UserId::new(1).unwrap(),
            occurred_at: Utc::now(),
        }
    }

    struct Counting(AtomicUsize);

    #[async_trait]
    impl EventHandler for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn handle(&self, _event: &UserEvent) -> AppResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = InProcessEventBus::new();
        bus.publish(&deactivated()).await;
        assert_eq!(bus.handler_count().await, 0);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_others() {
        let bus = InProcessEventBus::new();

        let mut failing = MockEventHandler::new();
        failing.expect_name().return_const("failing");
        failing
            .expect_handle()
            .times(2)
            .returning(|_| Err(AppError::internal("boom")));

        let counting = Arc::new(Counting(AtomicUsize::new(0)));

        bus.subscribe(Arc::new(failing)).await;
        bus.subscribe(counting.clone()).await;
        bus.subscribe(Arc::new(LoggingEventHandler)).await;

        bus.publish(&deactivated()).await;
        bus.publish(&deactivated()).await;

        assert_eq!(counting.0.load(Ordering::SeqCst), 2);
    }
}
