//! Parameter store — the single writer of processor parameters.
//!
//! Every write publishes a [`ParamMessage`] carrying a full snapshot of the
//! processor's parameters over an mpsc channel. Processors never read the
//! store directly; they react to the messages between scans.

use std::collections::BTreeMap;
use std::sync::mpsc;

use tracing::{debug, warn};

use super::params::{ParamKey, ParameterSet};
use crate::event::types::ProcessorId;

/// A parameter notification for one processor.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamMessage {
    /// One parameter changed. `value` is the value as requested, before
    /// clamping; `params` is the store's snapshot after the change.
    Changed {
        processor_id: ProcessorId,
        key: ParamKey,
        value: f64,
        params: ParameterSet,
    },
    /// The whole parameter set was replaced.
    Recreated {
        processor_id: ProcessorId,
        params: ParameterSet,
    },
}

impl ParamMessage {
    pub fn processor_id(&self) -> ProcessorId {
        match self {
            ParamMessage::Changed { processor_id, .. } | ParamMessage::Recreated { processor_id, .. } => {
                *processor_id
            }
        }
    }
}

/// Sender half, held by the store.
pub type ParamSender = mpsc::Sender<ParamMessage>;

/// Receiver half, held by whoever drives the processors.
pub struct ParamReceiver {
    rx: mpsc::Receiver<ParamMessage>,
}

impl ParamReceiver {
    /// Non-blocking poll for the next message.
    pub fn poll(&self) -> Option<ParamMessage> {
        self.rx.try_recv().ok()
    }

    /// Drain all pending messages in send order.
    pub fn drain(&self) -> Vec<ParamMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

/// Create a new parameter channel pair.
pub fn param_channel() -> (ParamSender, ParamReceiver) {
    let (tx, rx) = mpsc::channel();
    (tx, ParamReceiver { rx })
}

/// Parameter sets for every processor, keyed by processor id.
#[derive(Default)]
pub struct ParameterStore {
    sets: BTreeMap<ProcessorId, ParameterSet>,
    subscribers: Vec<ParamSender>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It receives every message published from now on.
    pub fn subscribe(&mut self) -> ParamReceiver {
        let (tx, rx) = param_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Current parameters of a processor.
    pub fn get(&self, processor_id: ProcessorId) -> Option<&ParameterSet> {
        self.sets.get(&processor_id)
    }

    /// Change one parameter. The value is clamped into its bounds.
    ///
    /// Returns `false` for an unknown processor.
    pub fn change(&mut self, processor_id: ProcessorId, key: ParamKey, value: f64) -> bool {
        let Some(params) = self.sets.get_mut(&processor_id) else {
            warn!(%processor_id, %key, "change for unknown processor ignored");
            return false;
        };
        params.set(key, value);
        let message = ParamMessage::Changed {
            processor_id,
            key,
            value,
            params: params.clone(),
        };
        debug!(%processor_id, %key, value = params.get(key).value, "parameter changed");
        self.publish(message);
        true
    }

    /// Replace a processor's whole parameter set, adding it if new.
    pub fn recreate(&mut self, processor_id: ProcessorId, params: ParameterSet) {
        self.sets.insert(processor_id, params.clone());
        self.publish(ParamMessage::Recreated {
            processor_id,
            params,
        });
    }

    /// Adopt values a processor derived itself (bounds, reseeded defaults)
    /// without publishing them back.
    pub fn sync(&mut self, processor_id: ProcessorId, params: ParameterSet) {
        self.sets.insert(processor_id, params);
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    fn publish(&mut self, message: ParamMessage) {
        self.subscribers.retain(|tx| tx.send(message.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: ProcessorId = ProcessorId(1);

    #[test]
    fn change_publishes_snapshot() {
        let mut store = ParameterStore::new();
        let rx = store.subscribe();
        store.recreate(ID, ParameterSet::default());
        assert!(matches!(rx.poll(), Some(ParamMessage::Recreated { .. })));

        assert!(store.change(ID, ParamKey::Pulses, 5.0));
        match rx.poll() {
            Some(ParamMessage::Changed {
                processor_id,
                key,
                value,
                params,
            }) => {
                assert_eq!(processor_id, ID);
                assert_eq!(key, ParamKey::Pulses);
                assert_eq!(value, 5.0);
                assert_eq!(params.pulses(), 5);
            }
            other => panic!("expected Changed, got {other:?}"),
        }
    }

    #[test]
    fn change_clamps_value() {
        let mut store = ParameterStore::new();
        store.recreate(ID, ParameterSet::default());
        store.change(ID, ParamKey::Steps, 1000.0);
        assert_eq!(store.get(ID).unwrap().steps(), 64);
    }

    #[test]
    fn unknown_processor_is_rejected() {
        let mut store = ParameterStore::new();
        let rx = store.subscribe();
        assert!(!store.change(ProcessorId(9), ParamKey::Low, 1.0));
        assert!(rx.poll().is_none());
    }

    #[test]
    fn sync_does_not_publish() {
        let mut store = ParameterStore::new();
        let rx = store.subscribe();
        store.sync(ID, ParameterSet::default());
        assert!(rx.poll().is_none());
        assert!(store.get(ID).is_some());
    }

    #[test]
    fn messages_arrive_in_order() {
        let mut store = ParameterStore::new();
        let rx = store.subscribe();
        store.recreate(ID, ParameterSet::default());
        store.change(ID, ParamKey::Steps, 8.0);
        store.change(ID, ParamKey::Rotation, 2.0);
        let keys: Vec<_> = rx
            .drain()
            .into_iter()
            .filter_map(|m| match m {
                ParamMessage::Changed { key, .. } => Some(key),
                ParamMessage::Recreated { .. } => None,
            })
            .collect();
        assert_eq!(keys, vec![ParamKey::Steps, ParamKey::Rotation]);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mut store = ParameterStore::new();
        let rx = store.subscribe();
        drop(rx);
        store.recreate(ID, ParameterSet::default());
        assert_eq!(store.subscribers.len(), 0);
    }
}
