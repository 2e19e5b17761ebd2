//! Single-slot handoff between a write and the following read.
//!
//! A write deposits a freshly resolved resource; the next read drains it.
//! While a deposit is undrained, further deposits fail with
//! [`Error::Busy`]. The slot never returns to `Empty`: after a drain the
//! value stays cached until the next deposit overwrites it.
//!
//! ```text
//!   Empty --deposit--> Deposited --consume--> Draining --drop--> Drained
//!                          ^                                        |
//!                          +---------------deposit------------------+
//! ```

use core::ops::Deref;

use spin::Mutex;

use crate::config::RepeatRead;
use crate::error::{Error, Result};

/// Handoff state of a [`Slot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing was ever deposited.
    Empty,
    /// A deposit is waiting to be read.
    Deposited,
    /// A reader is serializing the deposit.
    Draining,
    /// The last deposit was read; the value is still cached.
    Drained,
}

struct SlotInner<T> {
    state: SlotState,
    value: Option<T>,
}

/// Single-item handoff cell owned by one endpoint.
pub struct Slot<T> {
    inner: Mutex<SlotInner<T>>,
    repeat_read: RepeatRead,
}

impl<T: Clone> Slot<T> {
    /// Create an empty slot.
    pub const fn new(repeat_read: RepeatRead) -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                state: SlotState::Empty,
                value: None,
            }),
            repeat_read,
        }
    }

    /// Store `value` as the pending resolution.
    ///
    /// Fails with [`Error::Busy`] while a previous deposit is undrained or
    /// being drained; the previous value is left in place.
    pub fn deposit(&self, value: T) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            SlotState::Deposited | SlotState::Draining => {
                warn!("Error: can't acquire slot, previous resolution not consumed");
                Err(Error::Busy)
            }
            SlotState::Empty | SlotState::Drained => {
                inner.value = Some(value);
                inner.state = SlotState::Deposited;
                Ok(())
            }
        }
    }

    /// Take the current value for serialization.
    ///
    /// A fresh deposit moves to `Draining` and is marked `Drained` when the
    /// returned guard is dropped, whatever the caller did with it. An already
    /// drained value is handed out again or refused according to the slot's
    /// [`RepeatRead`] policy, without touching the state.
    pub fn consume(&self) -> Result<Drain<'_, T>> {
        let mut inner = self.inner.lock();
        match (inner.state, inner.value.clone()) {
            (SlotState::Deposited, Some(value)) => {
                inner.state = SlotState::Draining;
                Ok(Drain {
                    slot: self,
                    value,
                    fresh: true,
                })
            }
            (SlotState::Drained, Some(value)) if self.repeat_read == RepeatRead::ServeCached => {
                debug!("Serving cached resolution again");
                Ok(Drain {
                    slot: self,
                    value,
                    fresh: false,
                })
            }
            (SlotState::Draining, _) => Err(Error::Busy),
            _ => {
                warn!("No resource fetched");
                Err(Error::DataUnavailable)
            }
        }
    }

    /// Current handoff state.
    pub fn state(&self) -> SlotState {
        self.inner.lock().state
    }

    /// Copy of the cached value, if any.
    pub fn peek(&self) -> Option<T> {
        self.inner.lock().value.clone()
    }

    fn finish_drain(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SlotState::Draining {
            inner.state = SlotState::Drained;
        }
    }
}

/// Value handed out by [`Slot::consume`].
pub struct Drain<'a, T: Clone> {
    slot: &'a Slot<T>,
    value: T,
    fresh: bool,
}

impl<T: Clone> Drain<'_, T> {
    /// Whether this is the first read of the deposit.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }
}

impl<T: Clone> Deref for Drain<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Clone> Drop for Drain<'_, T> {
    fn drop(&mut self) {
        if self.fresh {
            self.slot.finish_drain();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_guard_releases_on_drop() {
        let slot = Slot::new(RepeatRead::ServeCached);
        slot.deposit(1u32).unwrap();
        {
            let value = slot.consume().unwrap();
            assert_eq!(*value, 1);
            assert_eq!(slot.state(), SlotState::Draining);
            assert_eq!(slot.deposit(2), Err(Error::Busy));
        }
        assert_eq!(slot.state(), SlotState::Drained);
        assert_eq!(slot.deposit(2), Ok(()));
    }

    #[test]
    fn test_stale_drain_does_not_clobber_new_deposit() {
        let slot = Slot::new(RepeatRead::ServeCached);
        slot.deposit(1u32).unwrap();
        drop(slot.consume().unwrap());

        let cached = slot.consume().unwrap();
        assert!(!cached.is_fresh());
        slot.deposit(2).unwrap();
        drop(cached);
        assert_eq!(slot.state(), SlotState::Deposited);
    }
}
