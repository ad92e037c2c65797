//! This module contains the [`Subscription`] type that downstream workers use to observe
//! repository changes, and the [`Subject`] that feeds it.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::{mpsc, Mutex};
use tracing::trace;

/// A stream of batches of updated entities. It is created via one of the `subscribe` calls on the
/// repositories. From there you should use it via its [`futures::Stream`] API.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    pub(crate) fn from_receiver(receiver: mpsc::UnboundedReceiver<T>) -> Subscription<T> {
        Subscription { receiver }
    }
}

impl<T> futures::Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

/// Buffers updates to one entity kind until they are flushed to the subscribers.
#[derive(Debug)]
pub(crate) struct Subject<T> {
    pending: Mutex<Vec<T>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Vec<T>>>>,
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> Subject<T> {
    /// Records an updated entity to be delivered on the next [`Subject::notify`].
    pub(crate) async fn new_update(&self, entity: T) {
        self.pending.lock().await.push(entity);
    }

    pub(crate) async fn subscribe(&self) -> Subscription<Vec<T>> {
        let (send, recv) = mpsc::unbounded_channel();

        self.subscribers.lock().await.push(send);

        Subscription::from_receiver(recv)
    }

    /// Delivers all pending updates as one batch and clears them.
    ///
    /// Returns the number of delivered entities.
    pub(crate) async fn notify(&self) -> usize {
        let updates = std::mem::take(&mut *self.pending.lock().await);
        if updates.is_empty() {
            return 0;
        }

        let mut subscribers = self.subscribers.lock().await;
        // a send error means the receiver has been dropped
        subscribers.retain(|sub| sub.send(updates.clone()).is_ok());
        trace!(updates = updates.len(), subscribers = subscribers.len(), "notified");

        updates.len()
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_notify_delivers_pending_batch() {
        let subject = Subject::<u32>::default();
        let mut first = subject.subscribe().await;
        let mut second = subject.subscribe().await;

        subject.new_update(1).await;
        subject.new_update(2).await;
        assert_eq!(subject.notify().await, 2);

        assert_eq!(first.next().await, Some(vec![1, 2]));
        assert_eq!(second.next().await, Some(vec![1, 2]));

        assert_eq!(subject.notify().await, 0, "buffer must be drained");
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let subject = Subject::<u32>::default();
        let dropped = subject.subscribe().await;
        let mut live = subject.subscribe().await;
        drop(dropped);

        subject.new_update(7).await;
        subject.notify().await;

        assert_eq!(live.next().await, Some(vec![7]));
        assert_eq!(subject.subscribers.lock().await.len(), 1);
    }
}
