//! Background job: verify the on-call rotation on a fixed interval.
//!
//! Each cycle counts an attempt, refreshes the access token if it is past
//! 75% of its lifetime, runs the schedule verifier and publishes the result.
//! Nothing inside a cycle is fatal; a failed refresh keeps the old token.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::metrics::HealthState;
use crate::squadcast::{Credential, TokenManager};
use crate::verifier::ScheduleVerifier;

pub struct Poller {
    tokens: TokenManager,
    verifier: ScheduleVerifier,
    health: HealthState,
    interval: Duration,
    credential: Credential,
}

impl Poller {
    /// `credential` is the token acquired at startup.
    pub fn new(
        tokens: TokenManager,
        verifier: ScheduleVerifier,
        health: HealthState,
        interval: Duration,
        credential: Credential,
    ) -> Self {
        Self {
            tokens,
            verifier,
            health,
            interval,
            credential,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Swap in a new token if the current one is stale at `now`.
    pub async fn refresh_if_stale(&mut self, now: Instant) {
        if !self.credential.is_stale(now) {
            return;
        }

        debug!(
            expires_in_secs = self.credential.expires_in(now).as_secs(),
            "access token is stale, refreshing"
        );
        match self.tokens.acquire().await {
            Ok(fresh) => self.credential = fresh,
            Err(e) => {
                self.health.record_refresh_failure();
                error!(error = %e, "could not refresh token, reusing the current one");
            }
        }
    }

    /// Run one verification cycle and publish the result.
    pub async fn poll_once(&mut self) -> bool {
        self.health.record_attempt();
        self.refresh_if_stale(Instant::now()).await;

        let started = Instant::now();
        let healthy = self.verifier.verify_all(self.credential.token()).await;
        if healthy {
            self.health.record_success();
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "on-call rotation healthy");
        } else {
            self.health.record_failure();
            warn!(elapsed_ms = started.elapsed().as_millis() as u64, "on-call rotation unhealthy");
        }
        healthy
    }

    /// Poll forever. The first cycle runs immediately.
    pub async fn run(mut self) {
        let mut ticker = time::interval(self.interval);
        // A cycle that outlasts the interval swallows the ticks it missed.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}

/// Spawn the poll loop. Call this once at startup.
pub fn spawn(poller: Poller) -> JoinHandle<()> {
    let interval = poller.interval;
    let handle = tokio::spawn(poller.run());
    info!(interval_secs = interval.as_secs(), "background poller started");
    handle
}
