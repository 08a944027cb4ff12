//! Inbound dispatch queue.
//!
//! The host sends no correlation ids, so inbound frames are matched to
//! callers purely by position:
//!
//! 1. A frame arriving while receivers are pending resolves the oldest one.
//! 2. Otherwise it is buffered.
//! 3. A receive call takes the oldest buffered frame before it ever waits.
//! 4. On close every pending receiver is rejected, oldest first, with the
//!    same [`CloseRecord`].
//!
//! Receivers whose caller gave up (deadline expired, future dropped) are
//! skipped on delivery so they never swallow a frame.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::error::{Error, Result};

use super::CloseRecord;

// ============================================================================
// Types
// ============================================================================

/// Completion handle of a pending receiver.
type ReplySender = oneshot::Sender<Result<String>>;

/// Outcome of [`DispatchQueue::claim`].
#[derive(Debug)]
pub enum Claim {
    /// A buffered frame was available.
    Ready(String),
    /// Registered as pending; resolves with the next frame or the close.
    Wait(oneshot::Receiver<Result<String>>),
    /// The transport is gone and nothing is buffered.
    Rejected(Error),
}

/// Outcome of [`DispatchQueue::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to a pending receiver.
    Resolved,
    /// Stored for a later receive call.
    Buffered,
}

// ============================================================================
// DispatchQueue
// ============================================================================

/// Pending-receiver FIFO plus buffered-frame FIFO of one transport.
#[derive(Debug)]
pub struct DispatchQueue {
    pending: VecDeque<ReplySender>,
    buffered: VecDeque<String>,
    close_record: Option<CloseRecord>,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchQueue {
    /// Creates an empty queue for an open transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            buffered: VecDeque::new(),
            close_record: None,
        }
    }

    /// Routes one inbound frame.
    pub fn deliver(&mut self, frame: String) -> Delivery {
        let mut frame = frame;
        while let Some(tx) = self.pending.pop_front() {
            match tx.send(Ok(frame)) {
                Ok(()) => return Delivery::Resolved,
                Err(Ok(returned)) => frame = returned,
                Err(Err(_)) => unreachable!("deliver only sends frames"),
            }
        }

        self.buffered.push_back(frame);
        Delivery::Buffered
    }

    /// Takes a buffered frame, or registers a pending receiver.
    pub fn claim(&mut self) -> Claim {
        if let Some(frame) = self.buffered.pop_front() {
            return Claim::Ready(frame);
        }

        if let Some(record) = &self.close_record {
            return Claim::Rejected(Error::ConnectionClosed(record.clone()));
        }

        let (tx, rx) = oneshot::channel();
        self.pending.push_back(tx);
        Claim::Wait(rx)
    }

    /// Marks the transport closed and rejects every pending receiver.
    ///
    /// Returns the number of receivers rejected. Buffered frames are kept.
    pub fn close(&mut self, record: CloseRecord) -> usize {
        let mut rejected = 0;
        while let Some(tx) = self.pending.pop_front() {
            if tx.send(Err(Error::ConnectionClosed(record.clone()))).is_ok() {
                rejected += 1;
            }
        }
        self.close_record = Some(record);
        rejected
    }

    /// Returns `true` until [`close`](Self::close) is called.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.close_record.is_none()
    }

    /// Close record, once closed.
    #[inline]
    #[must_use]
    pub fn close_record(&self) -> Option<&CloseRecord> {
        self.close_record.as_ref()
    }

    /// Number of pending receivers, including abandoned ones.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of buffered frames.
    #[inline]
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
