//! In-process event dispatcher
//!
//! Decouples the upload endpoint from the ingestion worker. The dispatcher
//! is built once at startup and shared through an `Arc`; there is no global
//! instance.
//!
//! # Delivery rules
//!
//! - `publish` never waits for processing. The queue is bounded and a full
//!   queue rejects the event with [`DispatchError::QueueFull`].
//! - Exactly one subscriber may exist. Its handler runs on a single consumer
//!   task, one event at a time, in publish order.
//! - Events published before a subscriber exists are rejected, never
//!   buffered for later replay.
//! - [`EventDispatcher::close`] stops intake; the consumer drains what is
//!   already queued and then exits.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::error::DispatchError;
use super::event::IngestionEvent;

/// Receives every event published on a dispatcher
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: &IngestionEvent);
}

pub struct EventDispatcher {
    capacity: usize,
    sender: RwLock<Option<mpsc::Sender<IngestionEvent>>>,
    receiver: Mutex<Option<mpsc::Receiver<IngestionEvent>>>,
    subscribed: AtomicBool,
}

impl EventDispatcher {
    /// Create a dispatcher whose queue holds at most `capacity` pending events
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);

        Self {
            capacity,
            sender: RwLock::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            subscribed: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        usize::from(self.subscribed.load(Ordering::Acquire))
    }

    /// Enqueue an event without waiting for it to be handled
    pub fn publish(&self, event: IngestionEvent) -> Result<(), DispatchError> {
        if !self.subscribed.load(Ordering::Acquire) {
            tracing::warn!(
                event_id = %event.id(),
                file = %event.file_path().display(),
                "Dropping ingestion event: no subscriber"
            );
            return Err(DispatchError::NoSubscriber);
        }

        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(DispatchError::Closed);
        };

        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    event_id = %event.id(),
                    file = %event.file_path().display(),
                    capacity = self.capacity,
                    "Ingestion queue full, event rejected"
                );
                Err(DispatchError::QueueFull {
                    capacity: self.capacity,
                })
            },
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }

    /// Wrap `file_path` in a fresh event and publish it
    ///
    /// Returns the event id so callers can correlate log lines.
    pub fn submit_for_ingestion(&self, file_path: impl Into<PathBuf>) -> Result<Uuid, DispatchError> {
        let event = IngestionEvent::new(file_path);
        let id = event.id();
        self.publish(event)?;
        tracing::debug!(event_id = %id, "Ingestion event queued");
        Ok(id)
    }

    /// Register the single handler and start the consumer task
    ///
    /// The returned handle completes once the dispatcher is closed and the
    /// queue has drained.
    pub fn subscribe<H>(&self, handler: Arc<H>) -> Result<JoinHandle<()>, DispatchError>
    where
        H: EventHandler + ?Sized,
    {
        let mut receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(DispatchError::AlreadySubscribed)?;

        self.subscribed.store(true, Ordering::Release);

        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let span = tracing::info_span!(
                    "ingestion",
                    event_id = %event.id(),
                    file = %event.file_path().display()
                );

                let outcome = AssertUnwindSafe(handler.handle(&event))
                    .catch_unwind()
                    .instrument(span)
                    .await;

                if outcome.is_err() {
                    tracing::error!(event_id = %event.id(), "Ingestion handler panicked");
                }
            }

            tracing::info!("Ingestion queue drained, consumer stopped");
        });

        Ok(handle)
    }

    /// Stop accepting events; already queued events are still delivered
    pub fn close(&self) {
        let sender = self
            .sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if sender.is_some() {
            tracing::info!("Ingestion dispatcher closed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::Path;
    use tokio::sync::Semaphore;

    #[derive(Default)]
    struct Recorder {
        seen: tokio::sync::Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &IngestionEvent) {
            if event.file_path() == Path::new("panic.json") {
                panic!("handler failure");
            }
            self.seen.lock().await.push(event.file_path().to_path_buf());
        }
    }

    struct Gated {
        gate: Semaphore,
        inner: Recorder,
    }

    #[async_trait]
    impl EventHandler for Gated {
        async fn handle(&self, event: &IngestionEvent) {
            let _permit = self.gate.acquire().await.unwrap();
            self.inner.handle(event).await;
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_is_rejected() {
        let dispatcher = EventDispatcher::new(4);

        let err = dispatcher.submit_for_ingestion("a.json").unwrap_err();

        assert_eq!(err, DispatchError::NoSubscriber);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_second_subscriber_is_refused() {
        let dispatcher = EventDispatcher::new(4);
        let handler = Arc::new(Recorder::default());

        let consumer = dispatcher.subscribe(handler.clone()).unwrap();
        let err = dispatcher.subscribe(handler).unwrap_err();

        assert_eq!(err, DispatchError::AlreadySubscribed);
        assert_eq!(dispatcher.subscriber_count(), 1);

        dispatcher.close();
        consumer.await.unwrap();
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_publish_order() {
        let dispatcher = EventDispatcher::new(8);
        let handler = Arc::new(Recorder::default());
        let consumer = dispatcher.subscribe(handler.clone()).unwrap();

        for name in ["1.json", "2.json", "3.json"] {
            dispatcher.submit_for_ingestion(name).unwrap();
        }
        dispatcher.close();
        consumer.await.unwrap();

        let seen = handler.seen.lock().await;
        assert_eq!(
            *seen,
            vec![
                PathBuf::from("1.json"),
                PathBuf::from("2.json"),
                PathBuf::from("3.json")
            ]
        );
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_blocking() {
        let dispatcher = EventDispatcher::new(1);
        let handler = Arc::new(Gated {
            gate: Semaphore::new(0),
            inner: Recorder::default(),
        });
        let consumer = dispatcher.subscribe(handler.clone()).unwrap();

        // The consumer holds at most one event while blocked on the gate
        let results: Vec<_> = ["1.json", "2.json", "3.json"]
            .into_iter()
            .map(|name| dispatcher.submit_for_ingestion(name))
            .collect();

        assert!(results[0].is_ok());
        assert_eq!(
            results[2].clone().unwrap_err(),
            DispatchError::QueueFull { capacity: 1 }
        );

        handler.gate.add_permits(8);
        dispatcher.close();
        consumer.await.unwrap();

        let accepted = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(handler.inner.seen.lock().await.len(), accepted);
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_stop_consumer() {
        let dispatcher = EventDispatcher::new(4);
        let handler = Arc::new(Recorder::default());
        let consumer = dispatcher.subscribe(handler.clone()).unwrap();

        dispatcher.submit_for_ingestion("panic.json").unwrap();
        dispatcher.submit_for_ingestion("after.json").unwrap();
        dispatcher.close();
        consumer.await.unwrap();

        assert_eq!(*handler.seen.lock().await, vec![PathBuf::from("after.json")]);
    }

    #[tokio::test]
    async fn test_closed_dispatcher_rejects_new_events() {
        let dispatcher = EventDispatcher::new(4);
        let consumer = dispatcher.subscribe(Arc::new(Recorder::default())).unwrap();

        dispatcher.close();
        dispatcher.close();

        assert_eq!(
            dispatcher.submit_for_ingestion("late.json").unwrap_err(),
            DispatchError::Closed
        );
        consumer.await.unwrap();
    }
}
