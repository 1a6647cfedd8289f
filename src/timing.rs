//! Helpers for keeping a steady pace in application loops.
//!
//! Both take the current time as an argument, so they work with any [`Clock`](crate::hal::Clock),
//! including the supervisor's own via [`Yukon::now`](crate::Yukon::now).

use crate::{
    error::{Error, Result},
    hal::{Duration, Instant},
};

/// A deadline that is moved forward by fixed steps, so loop periods do not drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingTime {
    deadline: Instant,
}

impl RollingTime {
    pub fn new(now: Instant) -> Self {
        Self { deadline: now }
    }

    /// Move the deadline back to `now`.
    pub fn reset(&mut self, now: Instant) {
        self.deadline = now;
    }

    pub fn advance(&mut self, step: Duration) {
        self.deadline += step;
    }

    pub fn reached(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Reports when at least one interval has passed since it last did.
///
/// Missed intervals are not caught up on. The next interval starts from the time of the check
/// that reported the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeChecker {
    interval: Duration,
    last: Instant,
}

impl TimeChecker {
    pub fn new(interval: Duration, now: Instant) -> Result<Self> {
        Self::validate(interval)?;
        Ok(Self {
            interval,
            last: now,
        })
    }

    fn validate(interval: Duration) -> Result<()> {
        if interval.ticks() == 0 {
            return Err(Error::InvalidDuration);
        }
        Ok(())
    }

    pub fn restart(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn set_interval(&mut self, interval: Duration) -> Result<()> {
        Self::validate(interval)?;
        self.interval = interval;
        Ok(())
    }

    pub fn check(&mut self, now: Instant) -> bool {
        if now >= self.last + self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}
