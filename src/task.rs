//! Cooperative task entry point for the protocol engine.
//!
//! The engine's work function may be reached from a periodic timer
//! interrupt and from foreground code at a yield point. On multi-core
//! parts (RP2040) both can race, so every call goes through a
//! non-blocking guard: if the guard is already held the call is skipped
//! and the next period picks the work up.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};

use crate::config::USB_TASK_INTERVAL_US;

/// The external protocol engine's "run pending work" function.
pub trait DeviceEngine {
    fn task(&self);
}

/// Cooperative yield hook handed to the stream adapters.
///
/// A bare-metal loop implements it by running the device task; a hosted
/// implementation may block on a channel instead.
pub trait Scheduler {
    fn yield_now(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskOutcome {
    /// Engine work ran to completion.
    Ran,
    /// Another context held the guard; nothing was run.
    Skipped,
}

/// Guarded wrapper around a [`DeviceEngine`].
///
/// `M` picks the raw mutex: `CriticalSectionRawMutex` when interrupts or a
/// second core can call in, `NoopRawMutex` on single-context platforms.
pub struct DeviceTask<M: RawMutex, E> {
    engine: E,
    guard: Mutex<M, ()>,
}

impl<M: RawMutex, E: DeviceEngine> DeviceTask<M, E> {
    /// Period the platform timer should call [`run`](Self::run) at. A
    /// skipped run is retried one period later.
    pub const PERIOD_US: u32 = USB_TASK_INTERVAL_US;

    pub const fn new(engine: E) -> Self {
        Self {
            engine,
            guard: Mutex::new(()),
        }
    }

    /// Run the engine once unless another context is already inside it.
    pub fn run(&self) -> TaskOutcome {
        match self.guard.try_lock() {
            Ok(_held) => {
                self.engine.task();
                TaskOutcome::Ran
            }
            Err(_) => {
                trace!("device task busy, skipped");
                TaskOutcome::Skipped
            }
        }
    }

    /// Hold the guard, keeping every other caller out until the returned
    /// guard is dropped. Returns `None` if the guard is already taken.
    pub fn hold(&self) -> Option<MutexGuard<'_, M, ()>> {
        self.guard.try_lock().ok()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<M: RawMutex, E: DeviceEngine> Scheduler for DeviceTask<M, E> {
    fn yield_now(&self) {
        self.run();
    }
}
