//! Cross-thread mailbox for marshalling work onto the control thread.
//!
//! Asynchronous integrations run off-thread but must not touch controller
//! state from there. They hold a cloneable [`MailboxSender`] and post a
//! message; the control thread drains its [`Mailbox`] between tasks and
//! applies the messages itself.
//!
//! # Disposal
//!
//! Every mailbox carries a shared disposed flag. Once the receiving side is
//! disposed (or dropped), [`MailboxSender::post`] reports
//! [`CoreError::MailboxClosed`] and the message is dropped. Callers that
//! outlive their controller treat that as "nobody is listening any more",
//! not as a failure.
//!
//! ```
//! use setup_flow_core::mailbox;
//!
//! let (tx, mailbox) = mailbox::<&'static str>();
//! let worker = std::thread::spawn(move || tx.post("account added"));
//! worker.join().unwrap().unwrap();
//!
//! assert_eq!(mailbox.drain(), vec!["account added"]);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};

use crate::error::{CoreError, Result};
use crate::logging::targets;

/// Create a connected sender/mailbox pair.
pub fn mailbox<T>() -> (MailboxSender<T>, Mailbox<T>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let disposed = Arc::new(AtomicBool::new(false));
    (
        MailboxSender {
            tx: tx.clone(),
            disposed: disposed.clone(),
        },
        Mailbox { rx, tx, disposed },
    )
}

/// The posting side of a mailbox. Cheap to clone and safe to move to any
/// thread.
#[derive(Debug)]
pub struct MailboxSender<T> {
    tx: Sender<T>,
    disposed: Arc<AtomicBool>,
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            disposed: self.disposed.clone(),
        }
    }
}

impl<T> MailboxSender<T> {
    /// Post a message to the control thread.
    pub fn post(&self, message: T) -> Result<()> {
        if self.is_disposed() {
            tracing::debug!(target: targets::MAILBOX, "mailbox disposed, dropping message");
            return Err(CoreError::MailboxClosed);
        }
        self.tx.send(message).map_err(|_| CoreError::MailboxClosed)
    }

    /// Whether the receiving side has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// The receiving side of a mailbox, owned by the control thread.
#[derive(Debug)]
pub struct Mailbox<T> {
    rx: Receiver<T>,
    tx: Sender<T>,
    disposed: Arc<AtomicBool>,
}

impl<T> Mailbox<T> {
    /// Create another sender for this mailbox.
    pub fn sender(&self) -> MailboxSender<T> {
        MailboxSender {
            tx: self.tx.clone(),
            disposed: self.disposed.clone(),
        }
    }

    /// Take every message currently queued, oldest first.
    pub fn drain(&self) -> Vec<T> {
        let messages: Vec<T> = self.rx.try_iter().collect();
        if !messages.is_empty() {
            tracing::trace!(target: targets::MAILBOX, count = messages.len(), "drained mailbox");
        }
        messages
    }

    /// Whether any message is waiting.
    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Mark the mailbox disposed and discard anything still queued.
    ///
    /// Senders observe the flag immediately; messages already in flight are
    /// dropped here.
    pub fn dispose(&self) -> usize {
        self.disposed.store(true, Ordering::SeqCst);
        let dropped = self.rx.try_iter().count();
        tracing::debug!(target: targets::MAILBOX, dropped, "mailbox disposed");
        dropped
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl<T> Drop for Mailbox<T> {
    fn drop(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

static_assertions::assert_impl_all!(MailboxSender<u32>: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_and_drain_in_order() {
        let (tx, mailbox) = mailbox();
        tx.post(1).unwrap();
        tx.clone().post(2).unwrap();
        mailbox.sender().post(3).unwrap();

        assert!(mailbox.has_pending());
        assert_eq!(mailbox.drain(), vec![1, 2, 3]);
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn test_post_from_worker_thread() {
        let (tx, mailbox) = mailbox::<String>();
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let tx = tx.clone();
                std::thread::spawn(move || tx.post(format!("worker-{n}")).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut received = mailbox.drain();
        received.sort();
        assert_eq!(received, vec!["worker-0", "worker-1", "worker-2", "worker-3"]);
    }

    #[test]
    fn test_dispose_rejects_late_posts() {
        let (tx, mailbox) = mailbox();
        tx.post("queued before dispose").unwrap();

        assert_eq!(mailbox.dispose(), 1);
        assert!(mailbox.is_disposed());
        assert!(tx.is_disposed());
        assert!(matches!(tx.post("late"), Err(CoreError::MailboxClosed)));
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn test_drop_marks_disposed() {
        let (tx, mailbox) = mailbox::<()>();
        drop(mailbox);
        assert!(tx.is_disposed());
        assert!(tx.post(()).is_err());
    }
}
