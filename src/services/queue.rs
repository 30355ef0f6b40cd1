// src/services/queue.rs

//! Bounded hand-off of URLs from the coordinator to the fetch workers.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

/// FIFO work queue with a producer-closed flag.
///
/// The coordinator fills the queue completely, closes it, then starts the
/// workers, so a worker exits exactly when it observes an empty closed
/// queue and shutdown needs no extra signalling.
#[derive(Debug, Default)]
pub struct WorkQueue {
    inner: Mutex<Inner>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct Inner {
    items: VecDeque<String>,
    done: bool,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue one URL. Intended to run before the workers start.
    pub fn push(&self, url: String) {
        self.inner
            .lock()
            .expect("work queue mutex poisoned")
            .items
            .push_back(url);
        self.notify.notify_one();
    }

    /// Mark the producer side as finished and wake every blocked consumer.
    pub fn close(&self) {
        self.inner.lock().expect("work queue mutex poisoned").done = true;
        self.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("work queue mutex poisoned")
            .items
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dequeue the next URL, or `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<String> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a close() between the check and
            // the await cannot be missed.
            notified.as_mut().enable();
            {
                let mut inner = self.inner.lock().expect("work queue mutex poisoned");
                if let Some(url) = inner.items.pop_front() {
                    return Some(url);
                }
                if inner.done {
                    return None;
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fifo_order_then_none_after_close() {
        let queue = WorkQueue::new();
        queue.push("a".into());
        queue.push("b".into());
        queue.close();

        assert_eq!(queue.pop().await.as_deref(), Some("a"));
        assert_eq!(queue.pop().await.as_deref(), Some("b"));
        assert_eq!(queue.pop().await, None);
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn test_concurrent_consumers_drain_exactly_once() {
        let queue = Arc::new(WorkQueue::new());
        for i in 0..100 {
            queue.push(format!("url-{i}"));
        }
        queue.close();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(url) = queue.pop().await {
                    seen.push(url);
                }
                seen
            }));
        }

        let mut all: Vec<String> = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 100);
    }

    #[tokio::test]
    async fn test_blocked_consumer_wakes_on_close() {
        let queue = Arc::new(WorkQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::task::yield_now().await;
        queue.close();

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("consumer did not wake on close")
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_blocked_consumer_wakes_on_push() {
        let queue = Arc::new(WorkQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::task::yield_now().await;
        queue.push("late".into());

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("consumer did not wake on push")
            .unwrap();
        assert_eq!(result.as_deref(), Some("late"));
    }
}
