//! Receiving end of a pipeline stage.

use tokio::sync::{mpsc, watch};

/// A stage queue that stops accepting work once shutdown is signalled.
///
/// After the signal the underlying channel is closed, so producers get an
/// error, while messages already buffered are still handed out. `recv`
/// returns `None` only when the queue is closed and empty.
pub struct Inbox<T> {
    rx: mpsc::Receiver<T>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<T> Inbox<T> {
    /// Inbox that ends when every sender is dropped.
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self { rx, shutdown: None }
    }

    /// Inbox that also ends when `shutdown` flips to `true` (or its sender goes away).
    pub fn with_shutdown(rx: mpsc::Receiver<T>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            rx,
            shutdown: Some(shutdown),
        }
    }

    pub async fn recv(&mut self) -> Option<T> {
        if let Some(shutdown) = self.shutdown.as_mut() {
            if *shutdown.borrow() {
                self.rx.close();
                self.shutdown = None;
            } else {
                tokio::select! {
                    msg = self.rx.recv() => return msg,
                    _ = shutdown.changed() => {
                        self.rx.close();
                        self.shutdown = None;
                    }
                }
            }
        }

        self.rx.recv().await
    }
}
