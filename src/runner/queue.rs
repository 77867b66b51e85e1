//! The runner's event queue.
//!
//! A double-ended queue under one lock with a condition variable:
//! normal events append (FIFO), priority events prepend (LIFO at the
//! head — the newest priority event is processed first). Cancellation
//! shares the lock so a parked worker always observes it.

use crate::core::context::EventInfo;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

pub(crate) struct EventQueue<E, A> {
    inner: Mutex<Inner<E, A>>,
    signal: Condvar,
}

struct Inner<E, A> {
    events: VecDeque<EventInfo<E, A>>,
    cancelled: bool,
}

impl<E, A> EventQueue<E, A> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: VecDeque::new(),
                cancelled: false,
            }),
            signal: Condvar::new(),
        }
    }

    pub(crate) fn push_back(&self, info: EventInfo<E, A>) {
        {
            let mut inner = self.inner.lock();
            inner.events.push_back(info);
        }
        self.signal.notify_one();
    }

    pub(crate) fn push_front(&self, info: EventInfo<E, A>) {
        {
            let mut inner = self.inner.lock();
            inner.events.push_front(info);
        }
        self.signal.notify_one();
    }

    /// Pop the next event, parking until one arrives or the queue is
    /// cancelled. `None` means cancelled; queued events are retained.
    pub(crate) fn next(&self) -> Option<EventInfo<E, A>> {
        let mut inner = self.inner.lock();
        loop {
            if inner.cancelled {
                return None;
            }
            if let Some(info) = inner.events.pop_front() {
                return Some(info);
            }
            self.signal.wait(&mut inner);
        }
    }

    pub(crate) fn cancel(&self) {
        {
            let mut inner = self.inner.lock();
            inner.cancelled = true;
        }
        self.signal.notify_all();
    }

    pub(crate) fn resume(&self) {
        self.inner.lock().cancelled = false;
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(tag: &'static str) -> EventInfo<&'static str, ()> {
        EventInfo {
            event: tag,
            argument: None,
        }
    }

    #[test]
    fn normal_events_are_fifo() {
        let queue = EventQueue::new();
        queue.push_back(event("a"));
        queue.push_back(event("b"));

        assert_eq!(queue.next().map(|i| i.event), Some("a"));
        assert_eq!(queue.next().map(|i| i.event), Some("b"));
    }

    #[test]
    fn priority_events_jump_the_head_newest_first() {
        let queue = EventQueue::new();
        queue.push_back(event("e1"));
        queue.push_front(event("p1"));
        queue.push_front(event("p2"));

        assert_eq!(queue.next().map(|i| i.event), Some("p2"));
        assert_eq!(queue.next().map(|i| i.event), Some("p1"));
        assert_eq!(queue.next().map(|i| i.event), Some("e1"));
    }

    #[test]
    fn cancel_releases_a_parked_consumer() {
        let queue: std::sync::Arc<EventQueue<&str, ()>> = std::sync::Arc::new(EventQueue::new());
        let consumer = {
            let queue = std::sync::Arc::clone(&queue);
            std::thread::spawn(move || queue.next().is_none())
        };

        // Give the consumer a moment to park before cancelling.
        std::thread::sleep(std::time::Duration::from_millis(20));
        queue.cancel();
        assert!(consumer.join().unwrap());
    }

    #[test]
    fn cancelled_queue_retains_events_for_resume() {
        let queue = EventQueue::new();
        queue.push_back(event("kept"));
        queue.cancel();

        assert!(queue.next().is_none());
        assert_eq!(queue.len(), 1);

        queue.resume();
        assert_eq!(queue.next().map(|i| i.event), Some("kept"));
    }
}
