//! Keepalive probing.
//!
//! The session ticks the monitor once per interval. Each tick either sends
//! a new `PING` or, once `max_missed` probes are outstanding, declares the
//! link dead. Any `PONG` clears the count.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Send `PING :<token>`.
    Send(String),
    /// Too many probes went unanswered.
    Dead { missed: u32 },
}

#[derive(Debug, Clone)]
pub struct KeepaliveMonitor {
    interval: Duration,
    max_missed: u32,
    outstanding: u32,
    sequence: u64,
}

impl KeepaliveMonitor {
    pub fn new(interval: Duration, max_missed: u32) -> Self {
        Self {
            interval,
            max_missed: max_missed.max(1),
            outstanding: 0,
            sequence: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }

    pub fn on_tick(&mut self) -> Probe {
        if self.outstanding >= self.max_missed {
            return Probe::Dead {
                missed: self.outstanding,
            };
        }
        self.outstanding += 1;
        self.sequence += 1;
        Probe::Send(format!("cabal-{}", self.sequence))
    }

    pub fn on_pong(&mut self) {
        self.outstanding = 0;
    }

    /// Start over for a fresh connection.
    pub fn reset(&mut self) {
        self.outstanding = 0;
    }
}
