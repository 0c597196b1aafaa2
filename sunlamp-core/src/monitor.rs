// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! sunlamp-core - Network association monitor
//!
//! Bounds station connection attempts against a configured retry ceiling
//! and provides the single synchronization point the boot sequence blocks
//! on.  Lifecycle notifications arrive from the station task; the monitor
//! answers each with a [`Directive`] telling the task whether to issue
//! another connection attempt.  The monitor itself never touches the
//! radio.

use core::cell::RefCell;
use core::net::Ipv4Addr;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::once_lock::OnceLock;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Terminal outcome of the association phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The station associated and obtained an IPv4 address.
    Connected,

    /// The retry budget was exhausted without obtaining an address.
    Failed,
}

/// What the station task should do after reporting a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Issue a connection attempt.
    Connect,

    /// Stay idle - the retry budget is spent.
    Idle,
}

// Counter state behind a single lock, so a waiter never observes a
// half-applied transition.
struct AttemptState {
    retries: u32,
    exhausted: bool,
}

/// Bounds station connection attempts and latches the first terminal
/// outcome.
///
/// One instance is shared between the station task, which reports
/// notifications, and the boot sequence, which suspends on
/// [`wait_for_resolution`](Self::wait_for_resolution).  Resolution is
/// single-shot: notifications arriving after it keep the retry counter
/// honest but can never change or re-signal the latched value.  The latch
/// is only initialized after the locked counter update completes, so the
/// counter is always final by the time a waiter wakes.
pub struct AssociationMonitor {
    max_retries: u32,
    state: Mutex<CriticalSectionRawMutex, RefCell<AttemptState>>,
    resolution: OnceLock<Resolution>,
}

impl AssociationMonitor {
    /// Creates a monitor allowing `max_retries` reconnection attempts on
    /// top of the initial one.
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            state: Mutex::new(RefCell::new(AttemptState {
                retries: 0,
                exhausted: false,
            })),
            resolution: OnceLock::new(),
        }
    }

    /// The interface is up - make the initial connection attempt.
    pub fn on_started(&self) -> Directive {
        if self.state.lock(|s| s.borrow().exhausted) {
            Directive::Idle
        } else {
            Directive::Connect
        }
    }

    /// A disconnect (or failed attempt) was reported.
    ///
    /// Directs another attempt while the budget lasts.  The notification
    /// that finds the counter already at the ceiling resolves Failed
    /// without directing one more attempt.
    pub fn on_disconnected(&self) -> Directive {
        let attempt = self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if s.exhausted {
                None
            } else if s.retries < self.max_retries {
                s.retries += 1;
                Some(s.retries)
            } else {
                s.exhausted = true;
                None
            }
        });

        match attempt {
            Some(n) => {
                info!(
                    "Exec:  Retry {n} of {} to connect to the AP",
                    self.max_retries
                );
                Directive::Connect
            }
            None => {
                if self.resolution.init(Resolution::Failed).is_ok() {
                    warn!("Warn:  Connect to the AP failed");
                }
                Directive::Idle
            }
        }
    }

    /// An IPv4 address was obtained.  Resets the retry counter and, on the
    /// first resolution, latches Connected.
    pub fn on_address_acquired(&self, addr: Ipv4Addr) {
        self.state.lock(|s| s.borrow_mut().retries = 0);
        info!("Ok:    Station got IP {addr}");
        let _ = self.resolution.init(Resolution::Connected);
    }

    /// Suspends the caller until the outcome is terminal and returns it.
    ///
    /// Never completes while the outcome is Pending; completes immediately
    /// for waiters arriving after resolution.
    pub async fn wait_for_resolution(&self) -> Resolution {
        *self.resolution.get().await
    }

    /// Returns the outcome if it is already terminal.
    pub fn try_resolution(&self) -> Option<Resolution> {
        self.resolution.try_get().copied()
    }

    /// Current retry count.  Resets to 0 on address acquisition.
    pub fn retry_count(&self) -> u32 {
        self.state.lock(|s| s.borrow().retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::task::Poll;
    use embassy_futures::{block_on, poll_once};

    #[test]
    fn exhausts_after_max_plus_one_disconnects() {
        let monitor = AssociationMonitor::new(3);
        assert_eq!(monitor.on_started(), Directive::Connect);

        for expected in 1..=3 {
            assert_eq!(monitor.on_disconnected(), Directive::Connect);
            assert_eq!(monitor.retry_count(), expected);
        }
        assert_eq!(monitor.try_resolution(), None);

        // The disconnect that finds the counter at the ceiling gives up
        // without one more attempt
        assert_eq!(monitor.on_disconnected(), Directive::Idle);
        assert_eq!(monitor.try_resolution(), Some(Resolution::Failed));
        assert_eq!(monitor.retry_count(), 3);

        assert_eq!(block_on(monitor.wait_for_resolution()), Resolution::Failed);
        // Late waiters see the same latched value
        assert_eq!(block_on(monitor.wait_for_resolution()), Resolution::Failed);
    }

    #[test]
    fn zero_budget_fails_on_first_disconnect() {
        let monitor = AssociationMonitor::new(0);
        assert_eq!(monitor.on_started(), Directive::Connect);
        assert_eq!(monitor.on_disconnected(), Directive::Idle);
        assert_eq!(block_on(monitor.wait_for_resolution()), Resolution::Failed);
    }

    #[test]
    fn address_acquired_resets_counter_and_resolves_connected() {
        let monitor = AssociationMonitor::new(5);
        monitor.on_started();
        monitor.on_disconnected();
        monitor.on_disconnected();
        assert_eq!(monitor.retry_count(), 2);

        monitor.on_address_acquired(Ipv4Addr::new(192, 168, 4, 17));
        assert_eq!(monitor.retry_count(), 0);
        assert_eq!(
            block_on(monitor.wait_for_resolution()),
            Resolution::Connected
        );

        // The reset counter grants a full budget to later disconnects
        for _ in 0..5 {
            assert_eq!(monitor.on_disconnected(), Directive::Connect);
        }
        assert_eq!(monitor.on_disconnected(), Directive::Idle);

        // The latch never changes, and an exhausted monitor stays idle
        assert_eq!(monitor.try_resolution(), Some(Resolution::Connected));
        assert_eq!(monitor.on_started(), Directive::Idle);
        assert_eq!(monitor.on_disconnected(), Directive::Idle);
    }

    #[test]
    fn wait_pends_until_terminal() {
        let monitor = AssociationMonitor::new(2);
        assert!(matches!(
            poll_once(monitor.wait_for_resolution()),
            Poll::Pending
        ));

        monitor.on_started();
        monitor.on_disconnected();
        assert!(matches!(
            poll_once(monitor.wait_for_resolution()),
            Poll::Pending
        ));

        monitor.on_address_acquired(Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(
            poll_once(monitor.wait_for_resolution()),
            Poll::Ready(Resolution::Connected)
        );
    }

    #[test]
    fn failed_latch_survives_late_address() {
        let monitor = AssociationMonitor::new(1);
        monitor.on_started();
        monitor.on_disconnected();
        assert_eq!(monitor.on_disconnected(), Directive::Idle);

        // A stale DHCP completion racing the final disconnect resets the
        // counter but cannot flip the latch
        monitor.on_address_acquired(Ipv4Addr::new(10, 0, 0, 9));
        assert_eq!(monitor.try_resolution(), Some(Resolution::Failed));
        assert_eq!(monitor.retry_count(), 0);
    }
}
