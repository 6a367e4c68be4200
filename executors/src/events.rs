use std::fmt::Display;

use alloy::primitives::B256;
use pilot_core::classify::ErrorClass;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// State transitions of a submission, in the order they happen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SubmissionEvent {
    Building {
        label: String,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
        attempt: u32,
    },
    Signed {
        label: String,
        tx_hash: B256,
        nonce: u64,
    },
    Submitted {
        label: String,
        tx_hash: B256,
    },
    Confirmed {
        label: String,
        tx_hash: B256,
        block_number: u64,
        success: bool,
    },
    Unconfirmed {
        label: String,
        tx_hash: B256,
        poll_attempts: u32,
    },
    SubmissionFailed {
        label: String,
        class: ErrorClass,
        message: String,
        attempt: u32,
    },
    Retrying {
        label: String,
        attempt: u32,
        delay_ms: u64,
        rotated: bool,
    },
    Replaced {
        old_tx_hash: B256,
        new_tx_hash: B256,
        gas_price: u128,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionStage {
    Building,
    Signed,
    Submitted,
    Confirmed,
    Unconfirmed,
    SubmissionFailed,
    Retrying,
    Replaced,
}

impl Display for SubmissionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStage::Building => write!(f, "building"),
            SubmissionStage::Signed => write!(f, "signed"),
            SubmissionStage::Submitted => write!(f, "submitted"),
            SubmissionStage::Confirmed => write!(f, "confirmed"),
            SubmissionStage::Unconfirmed => write!(f, "unconfirmed"),
            SubmissionStage::SubmissionFailed => write!(f, "submission_failed"),
            SubmissionStage::Retrying => write!(f, "retrying"),
            SubmissionStage::Replaced => write!(f, "replaced"),
        }
    }
}

impl SubmissionEvent {
    pub fn stage(&self) -> SubmissionStage {
        match self {
            SubmissionEvent::Building { .. } => SubmissionStage::Building,
            SubmissionEvent::Signed { .. } => SubmissionStage::Signed,
            SubmissionEvent::Submitted { .. } => SubmissionStage::Submitted,
            SubmissionEvent::Confirmed { .. } => SubmissionStage::Confirmed,
            SubmissionEvent::Unconfirmed { .. } => SubmissionStage::Unconfirmed,
            SubmissionEvent::SubmissionFailed { .. } => SubmissionStage::SubmissionFailed,
            SubmissionEvent::Retrying { .. } => SubmissionStage::Retrying,
            SubmissionEvent::Replaced { .. } => SubmissionStage::Replaced,
        }
    }
}

/// Fan-out point for submission progress. Sending never blocks; a dropped
/// receiver silently detaches the observer.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<mpsc::UnboundedSender<SubmissionEvent>>,
}

impl EventSink {
    pub fn new(sender: mpsc::UnboundedSender<SubmissionEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SubmissionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: SubmissionEvent) {
        tracing::debug!(stage = %event.stage(), event = ?event, "submission event");

        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                tracing::trace!("submission event observer dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_observer_is_noop() {
        EventSink::default().emit(SubmissionEvent::Submitted {
            label: "noop".to_string(),
            tx_hash: B256::ZERO,
        });
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(SubmissionEvent::Submitted {
            label: "dropped".to_string(),
            tx_hash: B256::ZERO,
        });
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(SubmissionEvent::Signed {
            label: "a".to_string(),
            tx_hash: B256::ZERO,
            nonce: 1,
        });
        sink.emit(SubmissionEvent::Submitted {
            label: "a".to_string(),
            tx_hash: B256::ZERO,
        });

        assert_eq!(rx.recv().await.unwrap().stage(), SubmissionStage::Signed);
        assert_eq!(rx.recv().await.unwrap().stage(), SubmissionStage::Submitted);
    }
}
