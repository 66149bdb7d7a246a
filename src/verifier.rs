//! Schedule verification.
//!
//! Walks every group, and every schedule inside it, in order and stops at
//! the first one that has nobody on call now or nobody on call at
//! `now + future_window`. Groups and schedules after a failing one are not
//! listed or queried in that cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::errors::ApiError;
use crate::squadcast::{ScheduleGroup, ScheduleRef, ScheduleSource};

/// Clock used to compute the future-check instant.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ScheduleVerifier {
    source: Arc<dyn ScheduleSource>,
    future_window: chrono::Duration,
    now: Clock,
}

impl ScheduleVerifier {
    /// Fails if `future_window` does not fit a calendar offset.
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        future_window: std::time::Duration,
    ) -> Result<Self, ApiError> {
        let window = chrono::Duration::from_std(future_window).map_err(|_| {
            ApiError::InvalidRequest(format!("future window {:?} is out of range", future_window))
        })?;
        Ok(Self {
            source,
            future_window: window,
            now: Arc::new(Utc::now),
        })
    }

    /// Replace the wall clock, e.g. to pin "now" in tests.
    pub fn with_clock(mut self, now: Clock) -> Self {
        self.now = now;
        self
    }

    /// True only if every schedule has someone on call now and at the future instant.
    pub async fn verify_all(&self, token: &str) -> bool {
        if token.is_empty() {
            warn!("got empty token");
            return false;
        }

        let groups = match self.source.groups(token).await {
            Ok(g) => g,
            Err(e) => {
                error!(error = %e, kind = e.kind(), "could not list schedule groups");
                return false;
            }
        };

        if groups.is_empty() {
            warn!("found no schedule groups");
            return false;
        }

        for group in &groups {
            if !self.verify_group(token, group).await {
                return false;
            }
        }

        true
    }

    async fn verify_group(&self, token: &str, group: &ScheduleGroup) -> bool {
        let schedules = match self.source.schedules(token, group).await {
            Ok(s) => s,
            Err(e) => {
                error!(group = %group.name, error = %e, kind = e.kind(), "could not enumerate schedules");
                return false;
            }
        };

        if schedules.is_empty() {
            warn!(group = %group.name, "found no schedules");
            return false;
        }
        info!(group = %group.name, count = schedules.len(), "verifying schedules");

        for schedule in &schedules {
            if !self.check_now(token, schedule).await {
                return false;
            }
            let Some(at) = (self.now)().checked_add_signed(self.future_window) else {
                error!(window = %self.future_window, "future instant is out of range");
                return false;
            };
            if !self.check_at(token, schedule, at).await {
                return false;
            }
        }

        true
    }

    async fn check_now(&self, token: &str, schedule: &ScheduleRef) -> bool {
        match self.source.oncall_now(token, schedule).await {
            Ok(users) if users.is_empty() => {
                warn!(schedule_id = %schedule.id, schedule = %schedule.name, "nobody is currently on call");
                false
            }
            Ok(users) => {
                info!(schedule_id = %schedule.id, ?users, "someone is currently on call");
                true
            }
            Err(e) => {
                error!(schedule_id = %schedule.id, error = %e, kind = e.kind(), "could not get current on-call");
                false
            }
        }
    }

    async fn check_at(&self, token: &str, schedule: &ScheduleRef, at: DateTime<Utc>) -> bool {
        match self.source.oncall_at(token, schedule, at).await {
            Ok(users) if users.is_empty() => {
                warn!(schedule_id = %schedule.id, schedule = %schedule.name, %at, "nobody is on call at future instant");
                false
            }
            Ok(users) => {
                info!(schedule_id = %schedule.id, %at, ?users, "someone is on call at future instant");
                true
            }
            Err(e) => {
                error!(schedule_id = %schedule.id, %at, error = %e, kind = e.kind(), "could not get future on-call");
                false
            }
        }
    }
}
