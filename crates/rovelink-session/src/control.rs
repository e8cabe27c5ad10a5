use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of pending control events.
pub const DEFAULT_CONTROL_CAPACITY: usize = 2;

/// Request handled by the command consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Tear down the session and connect again from the stored endpoint.
    ReconnectRequested,
}

/// Small bounded queue of control events.
///
/// No operation ever waits: `try_push` drops on a full queue and
/// `overwrite` replaces whatever is pending.
#[derive(Debug)]
pub struct ControlQueue {
    capacity: usize,
    events: Mutex<VecDeque<ControlEvent>>,
}

impl ControlQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ControlEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue unless full. Returns whether the event was queued.
    pub fn try_push(&self, event: ControlEvent) -> bool {
        let mut events = self.lock();
        if events.len() >= self.capacity {
            return false;
        }
        events.push_back(event);
        true
    }

    /// Replace every pending event with `event`.
    pub fn overwrite(&self, event: ControlEvent) {
        let mut events = self.lock();
        events.clear();
        events.push_back(event);
    }

    /// Take the oldest pending event.
    pub fn try_recv(&self) -> Option<ControlEvent> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ControlQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_push_drops_when_full() {
        let queue = ControlQueue::default();
        assert!(queue.try_push(ControlEvent::ReconnectRequested));
        assert!(queue.try_push(ControlEvent::ReconnectRequested));
        assert!(!queue.try_push(ControlEvent::ReconnectRequested));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn repeated_overwrites_leave_one_event() {
        let queue = ControlQueue::default();
        queue.try_push(ControlEvent::ReconnectRequested);
        for _ in 0..5 {
            queue.overwrite(ControlEvent::ReconnectRequested);
        }
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_recv(), Some(ControlEvent::ReconnectRequested));
        assert_eq!(queue.try_recv(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let queue = ControlQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.try_push(ControlEvent::ReconnectRequested));
    }
}
