//! Listener registry and capture/bubble dispatch.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::Result;
use crate::dom::{Dom, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    Submit,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => f.write_str("click"),
            Self::Submit => f.write_str("submit"),
        }
    }
}

/// Behaviors a node can listen with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    /// Ask for confirmation and cancel the default action on decline.
    ConfirmDestructive,
    /// Check required fields of the listening form before submission.
    ValidateRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListenerEntry {
    listener: Listener,
    capture: bool,
}

#[derive(Debug, Clone)]
pub struct EventState {
    pub event_type: EventType,
    pub target: NodeId,
    pub current_target: NodeId,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

impl EventState {
    pub fn new(event_type: EventType, target: NodeId) -> Self {
        Self {
            event_type,
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}

#[derive(Debug, Default)]
pub struct ListenerStore {
    map: HashMap<NodeId, HashMap<EventType, Vec<ListenerEntry>>>,
}

impl ListenerStore {
    /// Registers `listener`. Re-adding an identical listener is a no-op, as
    /// with `addEventListener`.
    pub fn add(
        &mut self,
        node_id: NodeId,
        event_type: EventType,
        listener: Listener,
        capture: bool,
    ) {
        let entries = self
            .map
            .entry(node_id)
            .or_default()
            .entry(event_type)
            .or_default();
        let entry = ListenerEntry { listener, capture };
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    pub fn count(&self, node_id: NodeId, event_type: EventType) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(&event_type))
            .map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.map
            .values()
            .flat_map(|events| events.values())
            .map(Vec::len)
            .sum()
    }

    fn get(&self, node_id: NodeId, event_type: EventType, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(&event_type))
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.capture == capture)
                    .map(|entry| entry.listener)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Runs `event` along `path` (root first, target last): capture phase,
    /// target phase, then bubble phase. `invoke` runs one listener.
    pub fn dispatch<F>(
        &self,
        path: &[NodeId],
        mut event: EventState,
        mut invoke: F,
    ) -> Result<EventState>
    where
        F: FnMut(&mut EventState, Listener) -> Result<()>,
    {
        let Some((&target, ancestors)) = path.split_last() else {
            return Ok(event);
        };

        let mut phases: Vec<(NodeId, bool)> = Vec::with_capacity(path.len() * 2);
        phases.extend(ancestors.iter().map(|node| (*node, true)));
        phases.push((target, true));
        phases.push((target, false));
        phases.extend(ancestors.iter().rev().map(|node| (*node, false)));

        for (node, capture) in phases {
            event.current_target = node;
            for listener in self.get(node, event.event_type, capture) {
                invoke(&mut event, listener)?;
            }
            if event.propagation_stopped {
                break;
            }
        }

        trace!(
            event = %event.event_type,
            target = event.target.0,
            default_prevented = event.default_prevented,
            "event dispatched"
        );
        Ok(event)
    }
}

/// Inclusive ancestors of `target`, root first.
pub fn propagation_path(dom: &Dom, target: NodeId) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut cursor = Some(target);
    while let Some(node) = cursor {
        path.push(node);
        cursor = dom.parent(node);
    }
    path.reverse();
    path
}
