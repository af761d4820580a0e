//! Backward-compatible state sanitization.
//!
//! Snapshots written by older builds predate several collections and nested
//! arrays. Anything read from the local cache, the shared store, or a backup
//! file passes through [`sanitize`] first, which fills every known gap with
//! an empty default and leaves everything else untouched. It is total (never
//! fails on any JSON value) and idempotent, and it only ever inserts keys —
//! fields from newer schema versions pass through unmodified.

use serde_json::{json, Map, Value};

use crate::types::{default_state, AppState, LlmConfig, SystemMessage};

/// Quick structural check used before trusting a fetched or imported payload:
/// a real AppState always carries `users` or `teams`.
pub fn is_plausible_state(value: &Value) -> bool {
    value.get("users").is_some() || value.get("teams").is_some()
}

/// Fill in every collection and nested array an older snapshot may lack.
pub fn sanitize(value: Value) -> Value {
    let mut obj = match value {
        Value::Object(obj) => obj,
        // Not even an object: nothing to salvage.
        _ => return serde_json::to_value(default_state()).unwrap_or_else(|_| json!({})),
    };

    for key in [
        "users",
        "teams",
        "meetings",
        "weeklyReports",
        "workingGroups",
        "smartTodos",
        "oneOffQueries",
        "notifications",
    ] {
        ensure_array(&mut obj, key);
    }
    ensure_object(&mut obj, "dismissedAlerts");
    ensure_object(&mut obj, "prompts");

    if !matches!(obj.get("systemMessage"), Some(Value::Object(_))) {
        let msg = serde_json::to_value(SystemMessage::default()).unwrap_or_else(|_| json!({}));
        obj.insert("systemMessage".to_string(), msg);
    }
    if !matches!(obj.get("llmConfig"), Some(Value::Object(_))) {
        let cfg = serde_json::to_value(LlmConfig::default()).unwrap_or_else(|_| json!({}));
        obj.insert("llmConfig".to_string(), cfg);
    }
    if !matches!(obj.get("lastUpdated"), Some(Value::Number(_))) {
        obj.insert("lastUpdated".to_string(), json!(0));
    }

    if let Some(Value::Array(teams)) = obj.get_mut("teams") {
        for team in teams.iter_mut().filter_map(Value::as_object_mut) {
            ensure_array(team, "projects");
            if let Some(Value::Array(projects)) = team.get_mut("projects") {
                for project in projects.iter_mut().filter_map(Value::as_object_mut) {
                    sanitize_project(project);
                }
            }
        }
    }

    if let Some(Value::Array(meetings)) = obj.get_mut("meetings") {
        for meeting in meetings.iter_mut().filter_map(Value::as_object_mut) {
            ensure_array(meeting, "attendees");
            ensure_array(meeting, "actionItems");
        }
    }

    if let Some(Value::Array(groups)) = obj.get_mut("workingGroups") {
        for group in groups.iter_mut().filter_map(Value::as_object_mut) {
            ensure_array(group, "memberIds");
            ensure_array(group, "sessions");
            if let Some(Value::Array(sessions)) = group.get_mut("sessions") {
                for session in sessions.iter_mut().filter_map(Value::as_object_mut) {
                    ensure_array(session, "actionItems");
                }
            }
        }
    }

    if let Some(Value::Array(todos)) = obj.get_mut("smartTodos") {
        for todo in todos.iter_mut().filter_map(Value::as_object_mut) {
            ensure_array(todo, "tags");
            ensure_array(todo, "attachments");
            ensure_array(todo, "links");
        }
    }

    if let Some(Value::Array(queries)) = obj.get_mut("oneOffQueries") {
        for query in queries.iter_mut().filter_map(Value::as_object_mut) {
            ensure_array(query, "tags");
        }
    }

    if let Some(Value::Array(notifications)) = obj.get_mut("notifications") {
        for notification in notifications.iter_mut().filter_map(Value::as_object_mut) {
            ensure_array(notification, "seenBy");
        }
    }

    Value::Object(obj)
}

fn sanitize_project(project: &mut Map<String, Value>) {
    ensure_array(project, "tasks");
    ensure_array(project, "members");
    ensure_array(project, "externalDependencies");
    if let Some(Value::Array(tasks)) = project.get_mut("tasks") {
        for task in tasks.iter_mut().filter_map(Value::as_object_mut) {
            ensure_array(task, "externalDependencies");
        }
    }
}

fn ensure_array(obj: &mut Map<String, Value>, key: &str) {
    if !matches!(obj.get(key), Some(Value::Array(_))) {
        obj.insert(key.to_string(), Value::Array(Vec::new()));
    }
}

fn ensure_object(obj: &mut Map<String, Value>, key: &str) {
    if !matches!(obj.get(key), Some(Value::Object(_))) {
        obj.insert(key.to_string(), Value::Object(Map::new()));
    }
}

/// Sanitize and deserialize in one step. A payload that still fails typed
/// deserialization after sanitization is unusable; the caller decides what
/// that means (a load resets, a fetch reports offline, an import rejects).
/// Substituting a default state here would let a bad payload masquerade as a
/// real one and overwrite good data downstream.
pub fn sanitize_state(value: Value) -> Option<AppState> {
    match serde_json::from_value(sanitize(value)) {
        Ok(state) => Some(state),
        Err(e) => {
            log::warn!("State failed deserialization after sanitize: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_is_idempotent() {
        let input = json!({
            "users": [{"id": "u1"}],
            "teams": [{"id": "t1", "name": "Core"}],
            "notifications": [{"id": "n1", "type": "task_created", "message": "m"}]
        });
        let once = sanitize(input.clone());
        let twice = sanitize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_fills_all_collections() {
        let out = sanitize(json!({"users": []}));
        for key in [
            "users",
            "teams",
            "meetings",
            "weeklyReports",
            "workingGroups",
            "smartTodos",
            "oneOffQueries",
            "notifications",
        ] {
            assert!(out[key].is_array(), "missing collection {}", key);
        }
        assert!(out["dismissedAlerts"].is_object());
        assert!(out["prompts"].is_object());
        assert!(out["systemMessage"].is_object());
        assert!(out["llmConfig"].is_object());
        assert!(out["lastUpdated"].is_number());
    }

    #[test]
    fn test_sanitize_fills_nested_arrays() {
        let out = sanitize(json!({
            "teams": [{"id": "t1", "name": "Core", "projects": [{"id": "p1", "name": "P"}]}],
            "workingGroups": [{"id": "wg1", "title": "WG", "sessions": [{"id": "s1"}]}],
            "notifications": [{"id": "n1", "type": "task_created", "message": "m"}],
            "smartTodos": [{"id": "td1", "userId": "u1", "title": "T"}]
        }));

        let project = &out["teams"][0]["projects"][0];
        assert!(project["tasks"].is_array());
        assert!(project["members"].is_array());
        assert!(project["externalDependencies"].is_array());
        assert!(out["workingGroups"][0]["memberIds"].is_array());
        assert!(out["workingGroups"][0]["sessions"][0]["actionItems"].is_array());
        assert!(out["notifications"][0]["seenBy"].is_array());
        assert!(out["smartTodos"][0]["tags"].is_array());
        assert!(out["smartTodos"][0]["attachments"].is_array());
    }

    #[test]
    fn test_sanitize_preserves_unknown_fields() {
        let out = sanitize(json!({
            "users": [],
            "notes": [{"id": "x", "body": "legacy"}],
            "someFutureFlag": true
        }));
        assert_eq!(out["notes"][0]["body"], "legacy");
        assert_eq!(out["someFutureFlag"], true);
    }

    #[test]
    fn test_sanitize_never_panics_on_garbage() {
        for input in [json!(null), json!(42), json!("string"), json!([1, 2])] {
            let out = sanitize(input);
            assert!(out["users"].is_array());
        }
        // Wrong-typed known fields are replaced, not propagated.
        let out = sanitize(json!({"users": "oops", "teams": 3}));
        assert!(out["users"].is_array());
        assert!(out["teams"].is_array());
    }

    #[test]
    fn test_plausibility_gate() {
        assert!(is_plausible_state(&json!({"users": []})));
        assert!(is_plausible_state(&json!({"teams": []})));
        assert!(!is_plausible_state(&json!({"foo": "bar"})));
    }

    #[test]
    fn test_sanitize_state_round_trips_typed() {
        let state = sanitize_state(json!({
            "users": [{"id": "u2", "uid": "jane", "firstName": "Jane",
                        "lastName": "Doe", "functionTitle": "PM"}],
            "teams": []
        }))
        .unwrap();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.users[0].first_name, "Jane");
    }

    #[test]
    fn test_newer_enum_value_keeps_the_rest_of_the_snapshot() {
        // A record with a status string this build has never heard of must
        // not degrade the whole snapshot to the bootstrap state.
        let state = sanitize_state(json!({
            "users": [{"id": "u9", "uid": "kim", "firstName": "Kim",
                        "lastName": "Lee", "functionTitle": "Dev"}],
            "teams": [{"id": "t1", "name": "Core"}],
            "notifications": [{"id": "n1", "type": "calendar_synced", "message": "m"}]
        }))
        .unwrap();
        assert_eq!(state.users[0].id, "u9");
        assert_eq!(state.teams[0].id, "t1");
        assert_eq!(state.notifications.len(), 1);
    }

    #[test]
    fn test_structurally_broken_payload_is_refused() {
        // Sanitize only fills gaps; a field with the wrong primitive type
        // still fails the typed parse, and that failure must be visible.
        assert!(sanitize_state(json!({"users": [{"id": 123}], "teams": []})).is_none());
    }
}
