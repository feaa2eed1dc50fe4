use std::time::Duration;

/// Never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct PendingTimer<T> {
    handle: TimerHandle,
    due_at: Duration,
    payload: T,
}

/// One-shot delayed payloads, polled by the host through [`TimerQueue::drain_due`].
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    pending: Vec<PendingTimer<T>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, now: Duration, delay: Duration, payload: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.pending.push(PendingTimer {
            handle,
            due_at: now.saturating_add(delay),
            payload,
        });
        handle
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|timer| timer.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|timer| timer.due_at).min()
    }

    /// Removes and returns every payload due at or before `now`, earliest first.
    /// Entries due at the same instant come back in scheduling order.
    pub fn drain_due(&mut self, now: Duration) -> Vec<T> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].due_at <= now {
                due.push(self.pending.remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by_key(|timer| (timer.due_at, timer.handle));
        due.into_iter().map(|timer| timer.payload).collect()
    }
}
