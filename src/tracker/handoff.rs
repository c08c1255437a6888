//! Single-slot mailbox between the command surface and the tracking loop.
//!
//! The slot moves through `Idle -> Pending -> Consuming -> Idle`. A producer
//! only gets in from `Idle`, so a second submission is refused until the
//! consumer has completely finished with the first. The payload travels
//! through a one-element [`ArrayQueue`], whose push/pop pair orders the
//! payload write before the consumer's read; the state word only gates
//! producers and reports status.

use crossbeam::queue::ArrayQueue;
use serde::Serialize;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, Ordering};

use super::TrackerError;

const IDLE: u8 = 0;
const PENDING: u8 = 1;
const CONSUMING: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffState {
    Idle,
    Pending,
    Consuming,
}

pub struct Mailbox<T> {
    state: AtomicU8,
    slot: ArrayQueue<T>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
            slot: ArrayQueue::new(1),
        }
    }

    /// Hand `value` to the consumer. Refused while a previous value is
    /// pending or being consumed.
    pub fn submit(&self, value: T) -> Result<(), TrackerError> {
        self.state
            .compare_exchange(IDLE, PENDING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TrackerError::HandoffBusy)?;

        if self.slot.push(value).is_err() {
            // unreachable while the state word is respected
            self.state.store(IDLE, Ordering::Release);
            return Err(TrackerError::HandoffBusy);
        }
        Ok(())
    }

    /// Claim the pending value, if its payload is fully visible.
    ///
    /// The slot stays claimed until the returned [`Delivery`] is dropped.
    pub fn take(&self) -> Option<Delivery<'_, T>> {
        let value = self.slot.pop()?;
        self.state.store(CONSUMING, Ordering::Release);
        Some(Delivery {
            mailbox: self,
            value,
        })
    }

    pub fn state(&self) -> HandoffState {
        match self.state.load(Ordering::Acquire) {
            IDLE => HandoffState::Idle,
            PENDING => HandoffState::Pending,
            _ => HandoffState::Consuming,
        }
    }

    /// True from submission until the consumer has finished with the value.
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE
    }
}

/// A claimed value. Dropping it frees the mailbox for the next submission.
pub struct Delivery<'a, T> {
    mailbox: &'a Mailbox<T>,
    value: T,
}

impl<T> Deref for Delivery<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> Drop for Delivery<'_, T> {
    fn drop(&mut self) {
        self.mailbox.state.store(IDLE, Ordering::Release);
    }
}
