//! Backup export and the id-keyed import merge.
//!
//! Merging is additive: items from the incoming state are matched against the
//! current state by `id`, new ids are appended, and colliding ids are replaced
//! by the incoming copy. Teams get one level of special handling — a colliding
//! team keeps the union of both project lists (again id-keyed, incoming wins)
//! instead of dropping the current projects wholesale. Nothing is ever deleted
//! by a merge.

use chrono::Utc;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::sanitize::{is_plausible_state, sanitize_state};
use crate::types::AppState;
use crate::{APP_NAME, APP_VERSION};

// ============================================================================
// Merge
// ============================================================================

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeCounts {
    pub added: usize,
    pub updated: usize,
}

/// Per-collection tally of what a merge did, shown to the user before the
/// result is committed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub users: MergeCounts,
    pub teams: MergeCounts,
    pub projects: MergeCounts,
    pub meetings: MergeCounts,
    pub weekly_reports: MergeCounts,
    pub working_groups: MergeCounts,
    pub smart_todos: MergeCounts,
    pub one_off_queries: MergeCounts,
    pub notifications: MergeCounts,
}

impl MergeSummary {
    pub fn total_added(&self) -> usize {
        self.each().iter().map(|(_, c)| c.added).sum()
    }

    pub fn total_updated(&self) -> usize {
        self.each().iter().map(|(_, c)| c.updated).sum()
    }

    fn each(&self) -> [(&'static str, MergeCounts); 9] {
        [
            ("users", self.users),
            ("teams", self.teams),
            ("projects", self.projects),
            ("meetings", self.meetings),
            ("weekly reports", self.weekly_reports),
            ("working groups", self.working_groups),
            ("todos", self.smart_todos),
            ("queries", self.one_off_queries),
            ("notifications", self.notifications),
        ]
    }

    /// Human-readable preview, e.g. `add 2 teams, 1 project; update 1 user`.
    pub fn describe(&self) -> String {
        let added: Vec<String> = self
            .each()
            .iter()
            .filter(|(_, c)| c.added > 0)
            .map(|(name, c)| format!("{} {}", c.added, name))
            .collect();
        let updated: Vec<String> = self
            .each()
            .iter()
            .filter(|(_, c)| c.updated > 0)
            .map(|(name, c)| format!("{} {}", c.updated, name))
            .collect();
        match (added.is_empty(), updated.is_empty()) {
            (true, true) => "no changes".to_string(),
            (false, true) => format!("add {}", added.join(", ")),
            (true, false) => format!("update {}", updated.join(", ")),
            (false, false) => format!("add {}; update {}", added.join(", "), updated.join(", ")),
        }
    }
}

fn merge_collection<T: Clone>(
    current: &mut Vec<T>,
    incoming: &[T],
    id: impl Fn(&T) -> &str,
    counts: &mut MergeCounts,
    mut replace: impl FnMut(&mut T, &T),
) {
    for item in incoming {
        match current.iter_mut().find(|c| id(c) == id(item)) {
            Some(existing) => {
                replace(existing, item);
                counts.updated += 1;
            }
            None => {
                current.push(item.clone());
                counts.added += 1;
            }
        }
    }
}

/// Merge `incoming` into `current` and return the result with a summary.
/// Neither input is modified; the caller commits the result explicitly.
pub fn merge_states(current: &AppState, incoming: &AppState) -> (AppState, MergeSummary) {
    let mut merged = current.clone();
    let mut summary = MergeSummary::default();

    merge_collection(
        &mut merged.users,
        &incoming.users,
        |u| &u.id,
        &mut summary.users,
        |e, i| *e = i.clone(),
    );

    let project_counts = &mut summary.projects;
    merge_collection(
        &mut merged.teams,
        &incoming.teams,
        |t| &t.id,
        &mut summary.teams,
        |existing, inc| {
            // Keep both project lists: replace the team, then re-merge the
            // projects the current copy had.
            let mut projects = std::mem::take(&mut existing.projects);
            merge_collection(
                &mut projects,
                &inc.projects,
                |p| &p.id,
                project_counts,
                |ep, ip| *ep = ip.clone(),
            );
            *existing = inc.clone();
            existing.projects = projects;
        },
    );

    merge_collection(
        &mut merged.meetings,
        &incoming.meetings,
        |m| &m.id,
        &mut summary.meetings,
        |e, i| *e = i.clone(),
    );
    merge_collection(
        &mut merged.weekly_reports,
        &incoming.weekly_reports,
        |r| &r.id,
        &mut summary.weekly_reports,
        |e, i| *e = i.clone(),
    );
    merge_collection(
        &mut merged.working_groups,
        &incoming.working_groups,
        |g| &g.id,
        &mut summary.working_groups,
        |e, i| *e = i.clone(),
    );
    merge_collection(
        &mut merged.smart_todos,
        &incoming.smart_todos,
        |t| &t.id,
        &mut summary.smart_todos,
        |e, i| *e = i.clone(),
    );
    merge_collection(
        &mut merged.one_off_queries,
        &incoming.one_off_queries,
        |q| &q.id,
        &mut summary.one_off_queries,
        |e, i| *e = i.clone(),
    );
    merge_collection(
        &mut merged.notifications,
        &incoming.notifications,
        |n| &n.id,
        &mut summary.notifications,
        |e, i| *e = i.clone(),
    );

    for (key, value) in &incoming.dismissed_alerts {
        merged.dismissed_alerts.insert(key.clone(), value.clone());
    }
    for (key, value) in &incoming.prompts {
        merged.prompts.insert(key.clone(), value.clone());
    }
    // systemMessage and llmConfig stay as configured on this client; a merge
    // reconciles records, it does not adopt the other side's settings.
    for (key, value) in &incoming.extra {
        merged.extra.insert(key.clone(), value.clone());
    }
    // currentUser and theme stay session-local, untouched by merges.

    (merged, summary)
}

// ============================================================================
// Backup export / import
// ============================================================================

/// Serialize a backup file: a `meta` envelope plus the shareable state
/// (session-local fields stripped).
pub fn export_backup(state: &AppState, description: &str) -> Value {
    json!({
        "meta": {
            "appName": APP_NAME,
            "version": APP_VERSION,
            "exportDate": Utc::now().to_rfc3339(),
            "description": description,
        },
        "data": state.shared_value(),
    })
}

/// Parse a backup file. Accepts the `{meta, data}` envelope and, for old
/// exports, a bare state object. Anything that does not look like a state is
/// rejected without touching current data.
pub fn parse_backup(raw: &str) -> Result<AppState, StoreError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| StoreError::InvalidImport(format!("not valid JSON: {}", e)))?;

    let payload = match value {
        Value::Object(mut obj) if obj.contains_key("meta") && obj.contains_key("data") => obj
            .remove("data")
            .unwrap_or(Value::Null),
        other => other,
    };

    if !is_plausible_state(&payload) {
        return Err(StoreError::InvalidImport(
            "unrecognized backup format (no users or teams)".to_string(),
        ));
    }
    sanitize_state(payload).ok_or_else(|| {
        StoreError::InvalidImport("backup contents do not form a valid state".to_string())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Replace everything with the backup contents.
    Overwrite,
    /// Id-keyed additive merge into the current state.
    Merge,
}

/// A fully-resolved import that has not been committed yet. The caller shows
/// `summary` (merge) or confirms the overwrite, then saves `state`.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub mode: ImportMode,
    pub state: AppState,
    pub summary: MergeSummary,
}

pub fn prepare_import(
    current: &AppState,
    raw: &str,
    mode: ImportMode,
) -> Result<ImportPlan, StoreError> {
    let incoming = parse_backup(raw)?;
    match mode {
        ImportMode::Overwrite => {
            let mut state = incoming;
            // The session survives the overwrite.
            state.current_user = current.current_user.clone();
            state.theme = current.theme;
            // Everything in the file counts as incoming for the
            // confirmation preview.
            let mut summary = MergeSummary::default();
            summary.users.added = state.users.len();
            summary.teams.added = state.teams.len();
            summary.projects.added = state.teams.iter().map(|t| t.projects.len()).sum();
            summary.meetings.added = state.meetings.len();
            summary.weekly_reports.added = state.weekly_reports.len();
            summary.working_groups.added = state.working_groups.len();
            summary.smart_todos.added = state.smart_todos.len();
            summary.one_off_queries.added = state.one_off_queries.len();
            summary.notifications.added = state.notifications.len();
            Ok(ImportPlan {
                mode,
                state,
                summary,
            })
        }
        ImportMode::Merge => {
            let (state, summary) = merge_states(current, &incoming);
            Ok(ImportPlan {
                mode,
                state,
                summary,
            })
        }
    }
}
