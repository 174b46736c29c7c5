//! Pending-page queue with two-phase accounting.
//!
//! `push` increments an unfinished counter and `ack` decrements it; `join`
//! resolves only when the counter reaches zero. Dequeuing alone does not
//! settle an item: a page stays in the queue's accounting from first push
//! until the ack that follows its final outcome, across any number of
//! retry resubmissions. Resubmitters must push the follow-up request
//! before acking the one in hand, or `join` could observe a false zero.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

/// One page to fetch and how many times it has been resubmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    /// Resubmission counter; 0 for the initial attempt.
    pub attempt: u32,
}

impl PageRequest {
    pub fn first(page: u32) -> Self {
        Self { page, attempt: 0 }
    }

    pub fn next_attempt(&self) -> Self {
        Self {
            page: self.page,
            attempt: self.attempt + 1,
        }
    }
}

struct Inner {
    items: VecDeque<PageRequest>,
    unfinished: usize,
    closed: bool,
}

/// Multi-producer/multi-consumer page queue with a join barrier.
pub struct PageQueue {
    inner: Mutex<Inner>,
    item_ready: Notify,
    all_done: Notify,
}

impl PageQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                unfinished: 0,
                closed: false,
            }),
            item_ready: Notify::new(),
            all_done: Notify::new(),
        }
    }

    /// Enqueue a request and take it into the unfinished accounting.
    pub fn push(&self, req: PageRequest) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.items.push_back(req);
            inner.unfinished += 1;
        }
        self.item_ready.notify_one();
    }

    /// Dequeue the next request, waiting while the queue is open and empty.
    /// Returns None once the queue is closed and drained.
    pub async fn pop(&self) -> Option<PageRequest> {
        loop {
            let ready = self.item_ready.notified();
            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(req) = inner.items.pop_front() {
                    // Notify stores at most one permit; pass it on so a
                    // second waiter isn't stranded behind a burst of pushes.
                    if !inner.items.is_empty() {
                        self.item_ready.notify_one();
                    }
                    return Some(req);
                }
                if inner.closed {
                    return None;
                }
            }
            ready.await;
        }
    }

    /// Acknowledge one dequeued request as settled (parsed or terminally
    /// failed). Must be called exactly once per successful `pop`.
    pub fn ack(&self) {
        let done = {
            let mut inner = self.inner.lock().unwrap();
            assert!(inner.unfinished > 0, "ack without matching push");
            inner.unfinished -= 1;
            inner.unfinished == 0
        };
        if done {
            self.all_done.notify_waiters();
        }
    }

    /// Wait until every pushed request has been acked, including requests
    /// pushed while others were being processed.
    pub async fn join(&self) {
        loop {
            let done = self.all_done.notified();
            if self.inner.lock().unwrap().unfinished == 0 {
                return;
            }
            done.await;
        }
    }

    /// Close the queue: blocked and future `pop`s return None once the
    /// remaining items are drained.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
        self.item_ready.notify_waiters();
    }

    pub fn unfinished(&self) -> usize {
        self.inner.lock().unwrap().unfinished
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PageQueue {
    fn default() -> Self {
        Self::new()
    }
}
