use std::sync::Arc;

use auditry_domain::EnrichedEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::ports::EventSink;

/// Fire-and-forget handoff of enriched events to the collector sink.
///
/// A bounded queue feeds one worker task; `dispatch` never blocks and
/// never errors to the caller. Delivery is best-effort: a full queue
/// drops the event, a failed transmission is logged and discarded, and
/// nothing is retried.
#[derive(Clone)]
pub struct EventForwarder {
    queue: mpsc::Sender<EnrichedEvent>,
}

impl EventForwarder {
    /// Spawns the worker task and returns the dispatch handle.
    #[must_use]
    pub fn spawn(sink: Arc<dyn EventSink>, queue_depth: usize) -> Self {
        let (queue, mut pending) = mpsc::channel::<EnrichedEvent>(queue_depth.max(1));

        tokio::spawn(async move {
            while let Some(event) = pending.recv().await {
                if let Err(error) = sink.deliver(&event).await {
                    warn!(event_id = %event.event_id(), %error, "event delivery failed");
                }
            }
        });

        Self { queue }
    }

    /// Hands one event to the worker without waiting for delivery.
    pub fn dispatch(&self, event: EnrichedEvent) {
        match self.queue.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(event_id = %event.event_id(), "forward queue full, event dropped");
            }
            Err(TrySendError::Closed(event)) => {
                warn!(event_id = %event.event_id(), "forward worker stopped, event dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use auditry_core::{AppError, AppResult, EventId};
    use auditry_domain::{AuditEvent, EnrichedEvent};
    use chrono::Utc;
    use tokio::sync::{Mutex, Notify};

    use super::EventForwarder;
    use crate::ports::EventSink;

    struct RecordingSink {
        delivered: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn deliver(&self, event: &EnrichedEvent) -> AppResult<()> {
            self.delivered
                .lock()
                .await
                .push(event.event_id().to_string());
            if self.fail {
                Err(AppError::Internal("collector returned status 500".to_owned()))
            } else {
                Ok(())
            }
        }
    }

    struct GatedSink {
        started: Notify,
        release: Notify,
        delivered: Mutex<usize>,
    }

    #[async_trait]
    impl EventSink for GatedSink {
        async fn deliver(&self, _event: &EnrichedEvent) -> AppResult<()> {
            self.started.notify_one();
            self.release.notified().await;
            *self.delivered.lock().await += 1;
            Ok(())
        }
    }

    fn enriched() -> EnrichedEvent {
        EnrichedEvent::new(AuditEvent::default(), EventId::generate(), Utc::now())
    }

    async fn wait_until<F>(mut condition: F)
    where
        F: AsyncFnMut() -> bool,
    {
        for _ in 0..100 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within one second");
    }

    #[tokio::test]
    async fn dispatched_events_reach_the_sink() {
        let sink = Arc::new(RecordingSink {
            delivered: Mutex::new(Vec::new()),
            fail: false,
        });
        let forwarder = EventForwarder::spawn(sink.clone(), 8);

        forwarder.dispatch(enriched());
        forwarder.dispatch(enriched());

        wait_until(async || sink.delivered.lock().await.len() == 2).await;
    }

    #[tokio::test]
    async fn delivery_failure_never_reaches_the_caller() {
        let sink = Arc::new(RecordingSink {
            delivered: Mutex::new(Vec::new()),
            fail: true,
        });
        let forwarder = EventForwarder::spawn(sink.clone(), 8);

        // dispatch is infallible; the failure is logged by the worker.
        forwarder.dispatch(enriched());

        wait_until(async || sink.delivered.lock().await.len() == 1).await;
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let sink = Arc::new(GatedSink {
            started: Notify::new(),
            release: Notify::new(),
            delivered: Mutex::new(0),
        });
        let forwarder = EventForwarder::spawn(sink.clone(), 1);

        // First event occupies the worker; second fills the queue slot;
        // third has nowhere to go and is dropped.
        forwarder.dispatch(enriched());
        sink.started.notified().await;
        forwarder.dispatch(enriched());
        forwarder.dispatch(enriched());

        sink.release.notify_one();
        sink.started.notified().await;
        sink.release.notify_one();

        wait_until(async || *sink.delivered.lock().await == 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*sink.delivered.lock().await, 2);
    }
}
