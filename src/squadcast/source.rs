//! Schedule enumeration strategies.
//!
//! Squadcast exposes two API shapes for the same question. The flat `v3`
//! shape lists schedules directly and answers the future check through the
//! schedule's calendar events. The older team-nested shape lists teams, asks
//! GraphQL for each team's schedules and answers both checks through
//! `who-is-oncall`. Both resolve to groups of [`ScheduleRef`]s and to
//! "who is assigned at instant T". Groups are resolved one at a time so a
//! failing group stops the scan before later groups are listed.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use super::client::ApiClient;
use super::types::*;
use crate::errors::ApiError;

/// A schedule to verify, with the team it belongs to when the API shape needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRef {
    pub id: String,
    pub name: String,
    pub team_id: Option<String>,
}

impl ScheduleRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            team_id: None,
        }
    }
}

/// Unit whose schedules are listed together: a team, or the whole organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleGroup {
    pub id: Option<String>,
    pub name: String,
}

impl ScheduleGroup {
    /// The single group of the flat API shape.
    pub fn all() -> Self {
        Self {
            id: None,
            name: "all schedules".into(),
        }
    }

    pub fn team(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }
}

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Units to check this cycle, in order. Empty means nothing is set up.
    async fn groups(&self, token: &str) -> Result<Vec<ScheduleGroup>, ApiError>;

    /// Schedules belonging to `group`. Empty means nobody is covering it.
    async fn schedules(&self, token: &str, group: &ScheduleGroup)
        -> Result<Vec<ScheduleRef>, ApiError>;

    /// People on call for `schedule` right now. Empty means nobody.
    async fn oncall_now(&self, token: &str, schedule: &ScheduleRef)
        -> Result<Vec<String>, ApiError>;

    /// People on call for `schedule` at `at`. Empty means nobody.
    async fn oncall_at(
        &self,
        token: &str,
        schedule: &ScheduleRef,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, ApiError>;
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ── Flat v3 ────────────────────────────────────────────────────

pub struct FlatSchedules {
    client: ApiClient,
}

impl FlatSchedules {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScheduleSource for FlatSchedules {
    async fn groups(&self, _token: &str) -> Result<Vec<ScheduleGroup>, ApiError> {
        Ok(vec![ScheduleGroup::all()])
    }

    async fn schedules(
        &self,
        token: &str,
        _group: &ScheduleGroup,
    ) -> Result<Vec<ScheduleRef>, ApiError> {
        let resp: ScheduleListResponse = self.client.get("/v3/schedules", token).await?;
        debug!(count = resp.data.len(), "fetched schedules");
        Ok(resp
            .data
            .into_iter()
            .map(|s| ScheduleRef {
                id: s.id,
                name: s.name,
                team_id: None,
            })
            .collect())
    }

    async fn oncall_now(
        &self,
        token: &str,
        schedule: &ScheduleRef,
    ) -> Result<Vec<String>, ApiError> {
        let path = format!("/v3/schedules/{}/on-call", urlencoding::encode(&schedule.id));
        let resp: OnCallResponse = self.client.get(&path, token).await?;
        debug!(
            schedule_id = %schedule.id,
            shift_type = %resp.data.shift_type,
            users = resp.data.users.len(),
            "fetched current on-call"
        );
        Ok(resp.data.users.into_iter().map(|u| u.id).collect())
    }

    async fn oncall_at(
        &self,
        token: &str,
        schedule: &ScheduleRef,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, ApiError> {
        let instant = rfc3339(at);
        let path = format!(
            "/v3/schedules/{}/events?start_time={}&end_time={}",
            urlencoding::encode(&schedule.id),
            urlencoding::encode(&instant),
            urlencoding::encode(&instant),
        );
        let resp: EventListResponse = self.client.get(&path, token).await?;

        let assigned = resp
            .data
            .iter()
            .filter(|ev| ev.covers(at))
            .flat_map(|ev| ev.assignees())
            .collect::<Vec<_>>();

        debug!(
            schedule_id = %schedule.id,
            at = %instant,
            events = resp.data.len(),
            assigned = assigned.len(),
            "checked schedule events"
        );
        Ok(assigned)
    }
}

// ── Team-nested ────────────────────────────────────────────────

pub struct TeamSchedules {
    client: ApiClient,
}

impl TeamSchedules {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn who_is_oncall(
        &self,
        token: &str,
        schedule: &ScheduleRef,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, ApiError> {
        let team_id = schedule.team_id.as_deref().ok_or_else(|| {
            ApiError::InvalidRequest(format!("schedule {} has no team", schedule.id))
        })?;

        let mut path = format!(
            "/v4/schedules/who-is-oncall?teamId={}&scheduleID={}",
            urlencoding::encode(team_id),
            urlencoding::encode(&schedule.id),
        );
        if let Some(at) = at {
            path.push_str(&format!("&time={}", urlencoding::encode(&rfc3339(at))));
        }

        let resp: WhoIsOncallResponse = self.client.get(&path, token).await?;
        Ok(resp
            .data
            .into_iter()
            .next()
            .map(|entry| entry.oncall.into_iter().map(|u| u.id).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ScheduleSource for TeamSchedules {
    async fn groups(&self, token: &str) -> Result<Vec<ScheduleGroup>, ApiError> {
        let teams: TeamsResponse = self.client.get("/v3/teams", token).await?;
        debug!(count = teams.data.len(), "fetched teams");
        Ok(teams
            .data
            .into_iter()
            .map(|team| {
                debug!(team_id = %team.id, org_id = %team.org_id, team = %team.name, "team");
                ScheduleGroup::team(team.id, team.name)
            })
            .collect())
    }

    async fn schedules(
        &self,
        token: &str,
        group: &ScheduleGroup,
    ) -> Result<Vec<ScheduleRef>, ApiError> {
        let team_id = group
            .id
            .as_deref()
            .ok_or_else(|| ApiError::InvalidRequest(format!("group '{}' is not a team", group.name)))?;

        let query = GraphqlRequest::schedules_for_team(team_id);
        let resp: GraphqlSchedulesResponse = self.client.post("/v3/graphql", token, &query).await?;
        debug!(team_id, count = resp.data.schedules.len(), "fetched team schedules");

        Ok(resp
            .data
            .schedules
            .into_iter()
            .map(|s| ScheduleRef {
                id: s.id.to_string(),
                name: s.name,
                team_id: Some(team_id.to_string()),
            })
            .collect())
    }

    async fn oncall_now(
        &self,
        token: &str,
        schedule: &ScheduleRef,
    ) -> Result<Vec<String>, ApiError> {
        self.who_is_oncall(token, schedule, None).await
    }

    async fn oncall_at(
        &self,
        token: &str,
        schedule: &ScheduleRef,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, ApiError> {
        self.who_is_oncall(token, schedule, Some(at)).await
    }
}
