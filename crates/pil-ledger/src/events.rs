use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use pil_types::{LedgerEntryId, StatusEvent, StatusMessage};

/// Errors from the outbound event port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventSinkError {
    #[error("event sink unavailable: {0}")]
    Unavailable(String),

    #[error("event rejected: {0}")]
    Rejected(String),
}

/// One-way outbound port for status notifications.
///
/// `publish` must not block: it hands the event off and returns. Delivery is
/// at-most-once; subscribers tolerate missed and duplicated messages.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &StatusEvent) -> Result<(), EventSinkError>;
}

/// Publish after commit. Failures are logged and never reach the caller.
pub(crate) fn publish_best_effort(sink: &dyn EventSink, event: StatusEvent) {
    match sink.publish(&event) {
        Ok(()) => debug!(
            channel = %event.channel(),
            status = %event.message.status,
            "status event published"
        ),
        Err(error) => warn!(
            channel = %event.channel(),
            status = %event.message.status,
            %error,
            "status event delivery failed"
        ),
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &StatusEvent) -> Result<(), EventSinkError> {
        Ok(())
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &StatusEvent) -> Result<(), EventSinkError> {
        self.events
            .lock()
            .map_err(|_| EventSinkError::Unavailable("recording sink lock poisoned".into()))?
            .push(event.clone());
        Ok(())
    }
}

/// Fan-out to per-entry broadcast channels, one channel per entry id.
///
/// Subscribers only see messages published after they subscribe; a channel
/// whose receivers are all gone is pruned on the next publish.
#[derive(Debug)]
pub struct BroadcastSink {
    capacity: usize,
    channels: RwLock<HashMap<String, broadcast::Sender<StatusMessage>>>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(
        &self,
        entry_id: &LedgerEntryId,
    ) -> Result<broadcast::Receiver<StatusMessage>, EventSinkError> {
        let channel = StatusEvent::channel_for(entry_id);
        let mut channels = self
            .channels
            .write()
            .map_err(|_| EventSinkError::Unavailable("channel map lock poisoned".into()))?;
        let sender = channels
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Ok(sender.subscribe())
    }

    /// Number of channels with at least one live subscriber.
    pub fn channel_count(&self) -> Result<usize, EventSinkError> {
        let channels = self
            .channels
            .read()
            .map_err(|_| EventSinkError::Unavailable("channel map lock poisoned".into()))?;
        Ok(channels.values().filter(|s| s.receiver_count() > 0).count())
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &StatusEvent) -> Result<(), EventSinkError> {
        let channel = event.channel();
        let mut channels = self
            .channels
            .write()
            .map_err(|_| EventSinkError::Unavailable("channel map lock poisoned".into()))?;

        let Some(sender) = channels.get(&channel) else {
            return Ok(());
        };
        if sender.send(event.message.clone()).is_err() {
            channels.remove(&channel);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use pil_types::LedgerStatus;

    use super::*;

    struct FailingSink;

    impl EventSink for FailingSink {
        fn publish(&self, _event: &StatusEvent) -> Result<(), EventSinkError> {
            Err(EventSinkError::Unavailable("broker down".into()))
        }
    }

    #[test]
    fn best_effort_swallows_failures() {
        let event = StatusEvent::new(LedgerEntryId::new(), LedgerStatus::Approved, Utc::now());
        publish_best_effort(&FailingSink, event);
    }

    #[test]
    fn recording_sink_keeps_events() {
        let sink = RecordingSink::new();
        let event = StatusEvent::new(LedgerEntryId::new(), LedgerStatus::Paid, Utc::now());
        sink.publish(&event).unwrap();
        assert_eq!(sink.events(), vec![event]);
    }

    #[tokio::test]
    async fn broadcast_delivers_to_entry_channel_only() {
        let sink = BroadcastSink::new(8);
        let watched = LedgerEntryId::new();
        let other = LedgerEntryId::new();
        let mut rx = sink.subscribe(&watched).unwrap();

        sink.publish(&StatusEvent::new(other, LedgerStatus::Approved, Utc::now()))
            .unwrap();
        let event = StatusEvent::new(watched, LedgerStatus::Approved, Utc::now());
        sink.publish(&event).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event.message);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let sink = BroadcastSink::new(4);
        let event = StatusEvent::new(LedgerEntryId::new(), LedgerStatus::Approved, Utc::now());
        assert!(sink.publish(&event).is_ok());
        assert_eq!(sink.channel_count().unwrap(), 0);
    }

    #[test]
    fn poisoned_channel_map_is_unavailable() {
        let sink = BroadcastSink::new(4);
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = sink.channels.write().unwrap();
                    panic!("publisher died holding the lock");
                })
                .join()
        });

        assert!(matches!(sink.channel_count(), Err(EventSinkError::Unavailable(_))));
        assert!(matches!(
            sink.subscribe(&LedgerEntryId::new()),
            Err(EventSinkError::Unavailable(_))
        ));
    }

    #[test]
    fn closed_channels_are_pruned() {
        let sink = BroadcastSink::new(4);
        let id = LedgerEntryId::new();
        let rx = sink.subscribe(&id).unwrap();
        assert_eq!(sink.channel_count().unwrap(), 1);
        drop(rx);

        sink.publish(&StatusEvent::new(id, LedgerStatus::Paid, Utc::now()))
            .unwrap();
        assert_eq!(sink.channel_count().unwrap(), 0);
    }
}
