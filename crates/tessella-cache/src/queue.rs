//! Serialized load request queue
//!
//! Only the head request is in flight at any moment; the rest wait their
//! turn. `update` is called once per frame and is idempotent while the head
//! is still loading.

use std::collections::VecDeque;

use crate::traits::LoadRequest;

/// FIFO queue of pending loads with priority promotion.
pub struct RequestQueue<R: LoadRequest> {
    queue: VecDeque<(String, R)>,
}

impl<R: LoadRequest> Default for RequestQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: LoadRequest> RequestQueue<R> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Append a request under a key
    pub fn enqueue(&mut self, key: &str, request: R) {
        self.queue.push_back((key.to_string(), request));
    }

    /// Pump the queue: drop the head once its request has completed, then
    /// start (or re-confirm) the new head. Completing several requests in
    /// one frame drains them one per call, which is fine at frame rate.
    pub fn update(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.queue[0].1.is_request_ready() {
            self.queue.pop_front();
            if let Some((key, head)) = self.queue.front_mut() {
                tracing::debug!(key = key.as_str(), "starting queued request");
                head.start_request();
            }
        } else {
            self.queue[0].1.start_request();
        }
    }

    /// Move a key's request to the front so it loads next. Unknown keys are
    /// ignored.
    pub fn raise_priority(&mut self, key: &str) {
        if let Some(pos) = self.queue.iter().position(|(k, _)| k == key) {
            if pos > 0 {
                if let Some(item) = self.queue.remove(pos) {
                    self.queue.push_front(item);
                }
            }
        }
    }

    /// Drop every pending request
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default)]
    struct Probe {
        started: u32,
        ready: bool,
    }

    #[derive(Clone)]
    struct FakeRequest {
        probe: Rc<RefCell<Probe>>,
    }

    impl FakeRequest {
        fn new() -> Self {
            Self {
                probe: Rc::new(RefCell::new(Probe::default())),
            }
        }

        fn finish(&self) {
            self.probe.borrow_mut().ready = true;
        }

        fn started(&self) -> u32 {
            self.probe.borrow().started
        }
    }

    impl LoadRequest for FakeRequest {
        fn is_request_ready(&self) -> bool {
            self.probe.borrow().ready
        }

        fn start_request(&mut self) {
            self.probe.borrow_mut().started += 1;
        }
    }

    #[test]
    fn test_only_head_is_started() {
        let mut queue = RequestQueue::new();
        let a = FakeRequest::new();
        let b = FakeRequest::new();
        queue.enqueue("a", a.clone());
        queue.enqueue("b", b.clone());

        queue.update();
        assert_eq!(a.started(), 1);
        assert_eq!(b.started(), 0);
    }

    #[test]
    fn test_completed_head_advances_queue() {
        let mut queue = RequestQueue::new();
        let a = FakeRequest::new();
        let b = FakeRequest::new();
        queue.enqueue("a", a.clone());
        queue.enqueue("b", b.clone());

        queue.update();
        a.finish();
        queue.update();

        assert_eq!(queue.len(), 1);
        assert_eq!(b.started(), 1);
    }

    #[test]
    fn test_update_restarts_inflight_head() {
        let mut queue = RequestQueue::new();
        let a = FakeRequest::new();
        queue.enqueue("a", a.clone());

        queue.update();
        queue.update();
        queue.update();
        // Pumped every frame; start_request must tolerate that
        assert_eq!(a.started(), 3);
    }

    #[test]
    fn test_raise_priority_moves_to_front() {
        let mut queue = RequestQueue::new();
        let a = FakeRequest::new();
        let b = FakeRequest::new();
        let c = FakeRequest::new();
        queue.enqueue("a", a.clone());
        queue.enqueue("b", b.clone());
        queue.enqueue("c", c.clone());

        queue.raise_priority("c");
        queue.update();

        assert_eq!(c.started(), 1);
        assert_eq!(a.started(), 0);
    }

    // Records the order requests are first started in, shared across fakes
    #[derive(Clone)]
    struct OrderedRequest {
        name: &'static str,
        ready: Rc<Cell<bool>>,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl LoadRequest for OrderedRequest {
        fn is_request_ready(&self) -> bool {
            self.ready.get()
        }

        fn start_request(&mut self) {
            if !self.log.borrow().contains(&self.name) {
                self.log.borrow_mut().push(self.name);
            }
        }
    }

    #[test]
    fn test_raise_priority_preserves_remaining_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = RequestQueue::new();
        let mut requests = Vec::new();
        for name in ["a", "b", "c", "d"] {
            let request = OrderedRequest {
                name,
                ready: Rc::new(Cell::new(false)),
                log: Rc::clone(&log),
            };
            queue.enqueue(name, request.clone());
            requests.push(request);
        }

        queue.raise_priority("c");

        // Drain fully: finish whatever started last, then pump again
        while !queue.is_empty() {
            queue.update();
            if let Some(name) = log.borrow().last() {
                let started = requests.iter().find(|r| r.name == *name).unwrap();
                started.ready.set(true);
            }
        }
        assert_eq!(*log.borrow(), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_raise_priority_unknown_key_is_noop() {
        let mut queue = RequestQueue::new();
        let a = FakeRequest::new();
        queue.enqueue("a", a.clone());

        queue.raise_priority("zzz");
        queue.update();
        assert_eq!(a.started(), 1);
    }

    #[test]
    fn test_clear() {
        let mut queue = RequestQueue::new();
        queue.enqueue("a", FakeRequest::new());
        queue.enqueue("b", FakeRequest::new());

        queue.clear();
        assert!(queue.is_empty());
        queue.update();
    }
}
