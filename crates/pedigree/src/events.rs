//! Typed notifications for collaborators of an editor session.
//!
//! Legends, menus and renderers implement [`Subscriber`] and register with
//! the session. Events are delivered synchronously, in registration order,
//! after the graph and the layout are both up to date.

use std::{cell::RefCell, collections::BTreeSet, fmt, rc::Rc};

use log::warn;

use pedigree_core::{
    identifier::{Id, IdMapping},
    properties::{PropertyKey, PropertyValue},
};

use crate::structure::{GraphDelta, PedigreeGraph};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// Identifiers were compacted; old → new.
    IdsRemapped(IdMapping),
    /// A property now holds `value`.
    PropertyChanged {
        id: Id,
        key: PropertyKey,
        value: PropertyValue,
    },
    StructureChanged(GraphDelta),
    /// Entities whose placement changed.
    LayoutChanged { moved: BTreeSet<Id> },
}

/// Receiver of [`EditorEvent`]s.
pub trait Subscriber {
    /// Handles `event`; `graph` already reflects it.
    fn notify(&mut self, event: &EditorEvent, graph: &PedigreeGraph);
}

/// Shared handle to a subscriber.
pub type SubscriberRef = Rc<RefCell<dyn Subscriber>>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<SubscriberRef>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: SubscriberRef) {
        self.subscribers.push(subscriber);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Delivers `event` to every subscriber.
    ///
    /// A subscriber that is already borrowed (it triggered the event from
    /// inside its own handler) is skipped.
    pub fn publish(&self, event: &EditorEvent, graph: &PedigreeGraph) {
        for (index, subscriber) in self.subscribers.iter().enumerate() {
            match subscriber.try_borrow_mut() {
                Ok(mut subscriber) => subscriber.notify(event, graph),
                Err(_) => warn!(subscriber = index; "Subscriber busy, event skipped"),
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
