//! Typed board events with pre-allocated ring buffers.
//!
//! Board operations emit events as they go; the bus buffers them per kind
//! and delivers the batch to passive listeners at the end of each public
//! board operation, in the order the events were emitted. Rendering and
//! progression collaborators subscribe here.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::geometry::{GridPosition, WorldPosition};
use crate::id::{ItemId, TriggerId};
use crate::trigger::Containment;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A board event. All events carry the board step at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ItemSpawned {
        item: ItemId,
        anchor: GridPosition,
        step: u64,
    },
    ItemSelected {
        item: ItemId,
        step: u64,
    },
    ItemDeselected {
        item: ItemId,
        step: u64,
    },
    ItemMoved {
        item: ItemId,
        from: WorldPosition,
        to: WorldPosition,
        step: u64,
    },
    ContainmentChanged {
        trigger: TriggerId,
        item: ItemId,
        before: Containment,
        after: Containment,
        step: u64,
    },
    ItemRetired {
        item: ItemId,
        trigger: TriggerId,
        step: u64,
    },
    LevelCompleted {
        step: u64,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemSpawned,
    ItemSelected,
    ItemDeselected,
    ItemMoved,
    ContainmentChanged,
    ItemRetired,
    LevelCompleted,
}

const EVENT_KIND_COUNT: usize = 7;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ItemSpawned { .. } => EventKind::ItemSpawned,
            Event::ItemSelected { .. } => EventKind::ItemSelected,
            Event::ItemDeselected { .. } => EventKind::ItemDeselected,
            Event::ItemMoved { .. } => EventKind::ItemMoved,
            Event::ContainmentChanged { .. } => EventKind::ContainmentChanged,
            Event::ItemRetired { .. } => EventKind::ItemRetired,
            Event::LevelCompleted { .. } => EventKind::LevelCompleted,
        }
    }

    pub fn step(&self) -> u64 {
        match self {
            Event::ItemSpawned { step, .. }
            | Event::ItemSelected { step, .. }
            | Event::ItemDeselected { step, .. }
            | Event::ItemMoved { step, .. }
            | Event::ContainmentChanged { step, .. }
            | Event::ItemRetired { step, .. }
            | Event::LevelCompleted { step } => *step,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Next write position.
    head: usize,
    len: usize,
    /// Including dropped.
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        // Once full, head points at the oldest entry.
        let start = if self.len < self.capacity() { 0 } else { self.head };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Priority level for listeners. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct ListenerEntry {
    listener: PassiveListener,
    priority: ListenerPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("priority", &self.priority)
            .field("filtered", &self.filter.is_some())
            .field("insertion_order", &self.insertion_order)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer per event kind, listener lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    /// Kinds of the undelivered events, in emission order.
    pending: Vec<EventKind>,
    default_capacity: usize,
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            pending: Vec::new(),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Suppressed kinds are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
        self.pending.retain(|k| *k != kind);
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-op for suppressed kinds.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.pending.push(event.kind());
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a listener with Normal priority and no filter.
    pub fn on(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_filtered(kind, ListenerPriority::Normal, None, listener);
    }

    pub fn on_filtered(
        &mut self,
        kind: EventKind,
        priority: ListenerPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        let list = &mut self.listeners[kind.index()];
        list.push(ListenerEntry {
            listener,
            priority,
            filter,
            insertion_order: order,
        });
        list.sort_by_key(|e| (e.priority, e.insertion_order));
    }

    /// Deliver every buffered event to its listeners in emission order,
    /// then clear the buffers. Each event reaches all of its kind's
    /// listeners before the next event is delivered.
    pub fn deliver(&mut self) {
        let mut queues: [VecDeque<Event>; EVENT_KIND_COUNT] = Default::default();
        for (queue, slot) in queues.iter_mut().zip(self.buffers.iter_mut()) {
            if let Some(buffer) = slot {
                queue.extend(buffer.iter().cloned());
                buffer.clear();
            }
        }

        // A full ring dropped its oldest events; skip their slots.
        let mut dropped = [0usize; EVENT_KIND_COUNT];
        for kind in &self.pending {
            dropped[kind.index()] += 1;
        }
        for (count, queue) in dropped.iter_mut().zip(&queues) {
            *count = count.saturating_sub(queue.len());
        }

        for kind in std::mem::take(&mut self.pending) {
            let idx = kind.index();
            if dropped[idx] > 0 {
                dropped[idx] -= 1;
                continue;
            }
            let Some(event) = queues[idx].pop_front() else {
                continue;
            };
            for entry in &mut self.listeners[idx] {
                if let Some(filter) = &entry.filter
                    && !filter(&event)
                {
                    continue;
                }
                (entry.listener)(&event);
            }
        }
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    /// Clear all buffers. Listeners and suppression are kept.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
        self.pending.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn item_id() -> ItemId {
        let mut sm = SlotMap::<ItemId, ()>::with_key();
        sm.insert(())
    }

    fn selected(item: ItemId, step: u64) -> Event {
        Event::ItemSelected { item, step }
    }

    #[test]
    fn ring_wraps_and_drops_oldest() {
        let item = item_id();
        let mut buf = EventBuffer::new(3);
        for step in 0..5 {
            buf.push(selected(item, step));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);
        let steps: Vec<u64> = buf.iter().map(|e| e.step()).collect();
        assert_eq!(steps, vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(Event::LevelCompleted { step: 9 });
        assert_eq!(buf.iter().next(), Some(&Event::LevelCompleted { step: 9 }));
    }

    #[test]
    fn emit_and_count() {
        let item = item_id();
        let mut bus = EventBus::new(16);
        bus.emit(selected(item, 1));
        bus.emit(Event::ItemDeselected { item, step: 2 });
        bus.emit(selected(item, 3));
        assert_eq!(bus.buffered_count(EventKind::ItemSelected), 2);
        assert_eq!(bus.buffered_count(EventKind::ItemDeselected), 1);
        assert_eq!(bus.total_emitted(EventKind::LevelCompleted), 0);
    }

    #[test]
    fn suppressed_kinds_are_not_buffered() {
        let item = item_id();
        let mut bus = EventBus::new(16);
        bus.emit(selected(item, 1));
        bus.suppress(EventKind::ItemSelected);
        assert!(bus.buffer(EventKind::ItemSelected).is_none());
        bus.emit(selected(item, 2));
        assert_eq!(bus.buffered_count(EventKind::ItemSelected), 0);

        bus.unsuppress(EventKind::ItemSelected);
        bus.emit(selected(item, 3));
        assert_eq!(bus.buffered_count(EventKind::ItemSelected), 1);
    }

    #[test]
    fn deliver_runs_listeners_and_clears() {
        let item = item_id();
        let mut bus = EventBus::new(16);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on(
            EventKind::ItemSelected,
            Box::new(move |e| sink.borrow_mut().push(e.step())),
        );
        bus.emit(selected(item, 4));
        bus.emit(selected(item, 5));
        bus.deliver();
        assert_eq!(*seen.borrow(), vec![4, 5]);
        assert_eq!(bus.buffered_count(EventKind::ItemSelected), 0);

        bus.deliver();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn priorities_and_filters() {
        let item = item_id();
        let mut bus = EventBus::new(16);
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        bus.on_filtered(
            EventKind::ItemSelected,
            ListenerPriority::Post,
            None,
            Box::new(move |_| o.borrow_mut().push("post")),
        );
        let o = Rc::clone(&order);
        bus.on(
            EventKind::ItemSelected,
            Box::new(move |_| o.borrow_mut().push("normal")),
        );
        let o = Rc::clone(&order);
        bus.on_filtered(
            EventKind::ItemSelected,
            ListenerPriority::Pre,
            Some(Box::new(|e| e.step() > 10)),
            Box::new(move |_| o.borrow_mut().push("pre")),
        );

        bus.emit(selected(item, 1));
        bus.deliver();
        assert_eq!(*order.borrow(), vec!["normal", "post"]);

        order.borrow_mut().clear();
        bus.emit(selected(item, 11));
        bus.deliver();
        assert_eq!(*order.borrow(), vec!["pre", "normal", "post"]);
    }

    #[test]
    fn delivery_follows_emission_order_across_kinds() {
        let item = item_id();
        let mut bus = EventBus::new(16);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::ItemMoved, EventKind::ItemDeselected] {
            let sink = Rc::clone(&seen);
            bus.on(kind, Box::new(move |e| sink.borrow_mut().push(e.step())));
        }

        let moved = |step| Event::ItemMoved {
            item,
            from: WorldPosition::ZERO,
            to: WorldPosition::ZERO,
            step,
        };
        bus.emit(moved(1));
        bus.emit(Event::ItemDeselected { item, step: 2 });
        bus.emit(moved(3));
        bus.deliver();

        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn overflowed_ring_keeps_order_of_survivors() {
        let item = item_id();
        let mut bus = EventBus::new(2);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::ItemSelected, EventKind::LevelCompleted] {
            let sink = Rc::clone(&seen);
            bus.on(kind, Box::new(move |e| sink.borrow_mut().push(e.step())));
        }

        bus.emit(selected(item, 1));
        bus.emit(Event::LevelCompleted { step: 2 });
        bus.emit(selected(item, 3));
        bus.emit(selected(item, 4));
        bus.deliver();

        // Step 1 fell out of the two-slot ring.
        assert_eq!(*seen.borrow(), vec![2, 3, 4]);
    }

    #[test]
    fn suppressing_drops_pending_events() {
        let item = item_id();
        let mut bus = EventBus::new(16);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::ItemSelected, EventKind::ItemDeselected] {
            let sink = Rc::clone(&seen);
            bus.on(kind, Box::new(move |e| sink.borrow_mut().push(e.step())));
        }

        bus.emit(selected(item, 1));
        bus.emit(Event::ItemDeselected { item, step: 2 });
        bus.suppress(EventKind::ItemSelected);
        bus.unsuppress(EventKind::ItemSelected);
        bus.emit(selected(item, 3));
        bus.deliver();

        assert_eq!(*seen.borrow(), vec![2, 3]);
    }

    #[test]
    fn step_accessor_covers_every_variant() {
        let item = item_id();
        assert_eq!(Event::LevelCompleted { step: 7 }.step(), 7);
        assert_eq!(
            Event::ItemMoved {
                item,
                from: WorldPosition::ZERO,
                to: WorldPosition::ZERO,
                step: 3
            }
            .kind(),
            EventKind::ItemMoved
        );
    }
}
