//! Squadcast API payloads.
//!
//! Only the fields the checks rely on are modelled; everything else in the
//! responses is ignored by serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Auth ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    pub data: AccessTokenDetails,
}

#[derive(Debug, Deserialize)]
pub struct AccessTokenDetails {
    pub access_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    /// Unix seconds.
    pub issued_at: i64,
}

impl AccessTokenDetails {
    /// Validity window reported by the server, never negative.
    pub fn validity_secs(&self) -> u64 {
        u64::try_from(self.expires_at - self.issued_at).unwrap_or(0)
    }
}

// ── Flat (v3) shape ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScheduleListResponse {
    #[serde(default)]
    pub data: Vec<ScheduleSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct OnCallResponse {
    pub data: OnCallShift,
}

#[derive(Debug, Deserialize)]
pub struct OnCallShift {
    #[serde(default)]
    pub shift_type: String,
    #[serde(default)]
    pub users: Vec<UserDetails>,
}

#[derive(Debug, Deserialize)]
pub struct EventListResponse {
    #[serde(default)]
    pub data: Vec<ScheduleEvent>,
}

/// One calendar entry of a schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEvent {
    #[serde(default)]
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub squad_ids: Vec<String>,
}

impl ScheduleEvent {
    /// Whether `at` falls strictly inside the event. Both bounds are excluded.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start_time < at && at < self.end_time
    }

    /// Users and squads assigned to this event.
    pub fn assignees(&self) -> Vec<String> {
        self.user_ids
            .iter()
            .chain(self.squad_ids.iter())
            .cloned()
            .collect()
    }
}

// ── Team-nested shape ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TeamsResponse {
    #[serde(default)]
    pub data: Vec<TeamDetails>,
}

#[derive(Debug, Deserialize)]
pub struct TeamDetails {
    pub id: String,
    #[serde(default, rename = "organization_id")]
    pub org_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
}

impl GraphqlRequest {
    /// Query listing every schedule owned by `team_id`.
    pub fn schedules_for_team(team_id: &str) -> Self {
        // A JSON string literal is also a valid GraphQL string literal.
        let team_id = serde_json::Value::from(team_id).to_string();
        Self {
            query: format!(
                "{{schedules(filters:{{teamID: {}}}){{teamID name ID orgID}}}}",
                team_id
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphqlSchedulesResponse {
    pub data: GraphqlSchedulesData,
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphqlSchedulesData {
    #[serde(default)]
    pub schedules: Vec<GraphqlSchedule>,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlSchedule {
    #[serde(rename = "ID", alias = "id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct WhoIsOncallResponse {
    #[serde(default)]
    pub data: Vec<WhoIsOncallEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WhoIsOncallEntry {
    #[serde(default)]
    pub oncall: Vec<UserDetails>,
}

// ── Shared ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct UserDetails {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(start: DateTime<Utc>, end: DateTime<Utc>, users: &[&str]) -> ScheduleEvent {
        ScheduleEvent {
            id: "evt".into(),
            start_time: start,
            end_time: end,
            name: String::new(),
            user_ids: users.iter().map(|u| u.to_string()).collect(),
            squad_ids: vec![],
        }
    }

    #[test]
    fn test_event_covers_is_strict_on_both_bounds() {
        let start = Utc.with_ymd_and_hms(2023, 2, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2023, 2, 3, 0, 0, 0).unwrap();
        let ev = event(start, end, &["u1"]);

        assert!(ev.covers(Utc.with_ymd_and_hms(2023, 2, 2, 12, 0, 0).unwrap()));
        assert!(!ev.covers(start));
        assert!(!ev.covers(end));
        assert!(!ev.covers(Utc.with_ymd_and_hms(2024, 12, 13, 12, 0, 0).unwrap()));
    }

    #[test]
    fn test_event_assignees_include_squads() {
        let t = Utc.with_ymd_and_hms(2023, 2, 2, 0, 0, 0).unwrap();
        let mut ev = event(t, t, &[]);
        assert!(ev.assignees().is_empty());
        ev.squad_ids.push("squad-1".into());
        assert_eq!(ev.assignees(), vec!["squad-1".to_string()]);
    }

    #[test]
    fn test_validity_secs_clamps_negative_window() {
        let details = AccessTokenDetails {
            access_token: "t".into(),
            expires_at: 100,
            issued_at: 200,
        };
        assert_eq!(details.validity_secs(), 0);
    }

    #[test]
    fn test_graphql_schedule_accepts_either_id_casing() {
        let upper: GraphqlSchedule = serde_json::from_str(r#"{"ID": 42, "name": "a"}"#).unwrap();
        let lower: GraphqlSchedule = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(upper.id, 42);
        assert_eq!(lower.id, 7);
    }

    #[test]
    fn test_graphql_query_embeds_team_id() {
        let req = GraphqlRequest::schedules_for_team("team-1");
        let body = serde_json::to_string(&req).unwrap();
        assert!(body.contains(r#"teamID: \"team-1\""#));
        assert!(body.starts_with(r#"{"query":"{schedules("#));
    }

    #[test]
    fn test_graphql_query_escapes_team_id() {
        let req = GraphqlRequest::schedules_for_team(r#"a"b\c"#);
        assert_eq!(
            req.query,
            r#"{schedules(filters:{teamID: "a\"b\\c"}){teamID name ID orgID}}"#
        );
    }
}
