//! Incremental result streams.
//!
//! A producer emits successive snapshots, each replacing the previous one.
//! Any number of consumers can subscribe at any time; a new subscriber sees
//! the latest snapshot first. The stream completes when the sender is dropped.

use futures::Stream;
use tokio::sync::watch;

#[derive(Clone, Debug)]
struct Snapshot<T> {
    seq: u64,
    value: Option<T>,
    complete: bool,
}

pub fn channel<T>() -> (StreamSender<T>, ResultStream<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let (tx, rx) = watch::channel(Snapshot {
        seq: 0,
        value: None,
        complete: false,
    });
    (StreamSender { tx }, ResultStream { rx, seen: 0 })
}

pub struct StreamSender<T> {
    tx: watch::Sender<Snapshot<T>>,
}

impl<T> StreamSender<T> {
    pub fn emit(&self, value: T) {
        self.tx.send_modify(|snapshot| {
            snapshot.seq += 1;
            snapshot.value = Some(value);
        });
    }
}

impl<T> Drop for StreamSender<T> {
    fn drop(&mut self) {
        self.tx.send_modify(|snapshot| snapshot.complete = true);
    }
}

pub struct ResultStream<T> {
    rx: watch::Receiver<Snapshot<T>>,
    seen: u64,
}

impl<T> Clone for ResultStream<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            seen: self.seen,
        }
    }
}

impl<T: Clone> ResultStream<T> {
    /// A fresh consumer that starts from the latest snapshot.
    pub fn subscribe(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            seen: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.rx.borrow().complete
    }

    /// The next snapshot this consumer has not seen, or `None` once the
    /// producer is done.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            if let Some(value) = self.take_unseen() {
                return Some(value);
            }
            if self.rx.borrow().complete {
                return None;
            }
            if self.rx.changed().await.is_err() {
                return self.take_unseen();
            }
        }
    }

    /// Drain the stream and keep the final snapshot.
    pub async fn last(mut self) -> Option<T> {
        let mut last = None;
        while let Some(value) = self.next().await {
            last = Some(value);
        }
        last
    }

    pub fn into_stream(self) -> impl Stream<Item = T>
    where
        T: Send + Sync + 'static,
    {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next().await.map(|value| (value, stream))
        })
    }

    fn take_unseen(&mut self) -> Option<T> {
        let snapshot = self.rx.borrow_and_update();
        if snapshot.seq > self.seen {
            self.seen = snapshot.seq;
            return snapshot.value.clone();
        }
        None
    }
}
