//! Core systems for setup-flow.
//!
//! This crate provides the single-threaded event primitives the wizard
//! controller is built on:
//!
//! - **Signals**: Explicit observer lists with connect/disconnect
//! - **Task Queue**: Deferred requests drained after mutations settle
//! - **Timers**: Cancellable one-shot timers driven by the caller's clock
//! - **Mailbox**: Cross-thread hand-off back onto the control thread
//! - **Logging**: `tracing` target names shared by the workspace
//!
//! # Signal Example
//!
//! ```
//! use setup_flow_core::Signal;
//!
//! let cut_off_changed = Signal::<usize>::new();
//! let conn_id = cut_off_changed.connect(|cut_off| {
//!     println!("user may now reach page {cut_off}");
//! });
//!
//! cut_off_changed.emit(3);
//! cut_off_changed.disconnect(conn_id);
//! ```
//!
//! # Task Queue Example
//!
//! ```
//! use setup_flow_core::TaskQueue;
//!
//! #[derive(Debug, PartialEq)]
//! enum Request { Next, Previous }
//!
//! let mut queue = TaskQueue::new();
//! queue.post(Request::Next);
//! queue.post(Request::Previous);
//!
//! assert_eq!(queue.pop().map(|(_, r)| r), Some(Request::Next));
//! ```

mod error;
pub mod logging;
pub mod mailbox;
pub mod signal;
mod task;
mod timer;

pub use error::{CoreError, Result};
pub use mailbox::{Mailbox, MailboxSender, mailbox};
pub use signal::{ConnectionId, Signal};
pub use task::{TaskId, TaskQueue};
pub use timer::{TimerId, TimerManager};
