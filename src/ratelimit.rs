// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Per-client submission throttle
//!
//! Remembers when each client last had a submission accepted and refuses a
//! new one until `window_secs` have passed. A submission reserves its
//! client's window up front, under one write lock, so concurrent requests
//! from the same client cannot all slip through while moderation is
//! pending. A submission that is then rejected releases its reservation
//! and does not open a new window.
//!
//! Memory stays bounded. Expired entries are swept every
//! `cleanup_interval` checks, and when `max_tracked_clients` is reached a
//! sweep is forced; if the table is still full the stalest client is
//! evicted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::{IdeaBoardError, Result};

pub struct RateLimiter {
    window: Duration,
    max_tracked_clients: usize,
    cleanup_interval: u64,
    last_submission: RwLock<HashMap<String, Instant>>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            max_tracked_clients: config.max_tracked_clients.max(1),
            cleanup_interval: config.cleanup_interval.max(1),
            last_submission: RwLock::new(HashMap::new()),
            checks: AtomicU64::new(0),
        }
    }

    /// Fail with [`IdeaBoardError::RateLimited`] if the client submitted too recently.
    /// Nothing is recorded.
    pub fn check(&self, client: &str) -> Result<()> {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> Result<()> {
        self.tick(now);

        let state = self
            .last_submission
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        match state.get(client) {
            Some(last) if self.within_window(*last, now) => {
                tracing::warn!(client = %client, "submission rate limit exceeded");
                Err(IdeaBoardError::RateLimited)
            }
            _ => Ok(()),
        }
    }

    /// Check the window and claim it for the client in one step
    pub fn try_reserve(&self, client: &str) -> Result<()> {
        self.try_reserve_at(client, Instant::now())
    }

    pub fn try_reserve_at(&self, client: &str, now: Instant) -> Result<()> {
        self.tick(now);

        let mut state = self
            .last_submission
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = state.get(client) {
            if self.within_window(*last, now) {
                tracing::warn!(client = %client, "submission rate limit exceeded");
                return Err(IdeaBoardError::RateLimited);
            }
        }

        if !state.contains_key(client) && state.len() >= self.max_tracked_clients {
            self.sweep(&mut state, now);
        }
        if !state.contains_key(client) && state.len() >= self.max_tracked_clients {
            let stalest = state
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(key, _)| key.clone());
            if let Some(key) = stalest {
                tracing::debug!(client = %key, "evicting stalest rate limit entry");
                state.remove(&key);
            }
        }

        state.insert(client.to_string(), now);
        Ok(())
    }

    /// Give back a reservation whose submission was not accepted
    pub fn release(&self, client: &str) {
        let mut state = self
            .last_submission
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if state.remove(client).is_some() {
            tracing::debug!(client = %client, "released rate limit reservation");
        }
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.last_submission
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn within_window(&self, last: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last) < self.window
    }

    /// Count a check and run the periodic sweep when due
    fn tick(&self, now: Instant) {
        let count = self.checks.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % self.cleanup_interval == 0 {
            tracing::debug!(checks = count, "sweeping expired rate limit entries");
            let mut state = self
                .last_submission
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            self.sweep(&mut state, now);
        }
    }

    fn sweep(&self, state: &mut HashMap<String, Instant>, now: Instant) {
        let before = state.len();
        state.retain(|_, last| self.within_window(*last, now));
        let removed = before - state.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = state.len(), "rate limit cleanup");
        }
    }
}
