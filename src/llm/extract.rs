//! Turning pasted text into structured records.
//!
//! The model is asked for a bare JSON object, but responses arrive wrapped in
//! prose, code fences, or half-valid JSON often enough that parsing is
//! strictly best-effort: find the first balanced `{...}`, deserialize it, and
//! validate the one field that makes the record usable. Anything less
//! degrades to a [`Extraction::Partial`] record carrying the pasted text —
//! the user still gets an editable draft, never a crash and never a partial
//! parse masquerading as a clean one.

use std::collections::HashMap;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::LlmError;
use crate::llm::client::LlmClient;
use crate::llm::prompts::{
    fill_template, resolve_prompt, EXTRACT_MEETING, EXTRACT_PROJECT, EXTRACT_TODO,
};
use crate::types::{
    generate_id, ActionItem, Decision, EnergyLevel, Meeting, Project, SmartTodo, Task,
    TaskPriority, TodoPriorityLevel,
};

/// Find the first complete JSON object `{...}` in the text.
pub fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escape {
            escape = false;
            continue;
        }
        if b == b'\\' && in_string {
            escape = true;
            continue;
        }
        if b == b'"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Result of an extraction attempt. Both variants carry a usable record; the
/// distinction tells the UI whether to flag it for review.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    /// The response parsed and validated against the schema.
    Parsed(T),
    /// Best-effort fallback built from the pasted text.
    Partial(T),
}

impl<T> Extraction<T> {
    pub fn record(self) -> T {
        match self {
            Extraction::Parsed(record) | Extraction::Partial(record) => record,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Extraction::Partial(_))
    }
}

fn parse_object<T: DeserializeOwned>(response: &str) -> Option<T> {
    let json = extract_json_object(response)?;
    serde_json::from_str(&json).ok()
}

/// First non-empty line of the pasted text, truncated to a title-sized chunk.
fn fallback_title(raw_text: &str) -> String {
    let line = raw_text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("Captured item");
    let mut title: String = line.chars().take(80).collect();
    if line.chars().count() > 80 {
        title.push('…');
    }
    title
}

// ============================================================================
// To-dos
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedTodo {
    pub title: String,
    pub description: String,
    pub requester: Option<String>,
    pub tags: Vec<String>,
    pub links: Vec<String>,
    pub priority_level: Option<TodoPriorityLevel>,
    pub energy_required: Option<EnergyLevel>,
    pub estimated_duration_min: Option<i64>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub is_recurring: bool,
    pub recurrence_rule: Option<String>,
    pub action_items: Vec<String>,
}

impl ExtractedTodo {
    /// Materialize into a [`SmartTodo`] owned by `user_id`. Sub-steps the
    /// model found are folded into the description as a checklist.
    pub fn into_smart_todo(self, user_id: &str, source: &str) -> SmartTodo {
        let now = Utc::now().to_rfc3339();
        let mut description = self.description;
        if !self.action_items.is_empty() {
            if !description.is_empty() {
                description.push_str("\n\n");
            }
            description.push_str("Steps:\n");
            for item in &self.action_items {
                description.push_str(&format!("- {}\n", item));
            }
        }
        SmartTodo {
            id: generate_id(),
            user_id: user_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
            source: source.to_string(),
            requester: self.requester.unwrap_or_default(),
            title: self.title,
            description,
            tags: self.tags,
            links: self.links,
            priority_level: self.priority_level.unwrap_or_default(),
            energy_required: self.energy_required.unwrap_or_default(),
            estimated_duration_min: self.estimated_duration_min,
            start_date: self.start_date,
            due_date: self.due_date,
            is_recurring: self.is_recurring,
            recurrence_rule: self.recurrence_rule,
            created_by_bot: Some(true),
            ..Default::default()
        }
    }
}

/// Pure half of the extraction: response text in, validated or partial
/// record out.
pub fn parse_todo_response(raw_text: &str, response: &str) -> Extraction<ExtractedTodo> {
    match parse_object::<ExtractedTodo>(response) {
        Some(todo) if !todo.title.trim().is_empty() => Extraction::Parsed(todo),
        _ => Extraction::Partial(ExtractedTodo {
            title: fallback_title(raw_text),
            description: raw_text.trim().to_string(),
            ..Default::default()
        }),
    }
}

pub async fn extract_todo_from_text(
    client: &LlmClient,
    prompt_overrides: &HashMap<String, String>,
    raw_text: &str,
) -> Result<Extraction<ExtractedTodo>, LlmError> {
    let template = resolve_prompt(prompt_overrides, EXTRACT_TODO).unwrap_or_default();
    let response = client
        .run(&fill_template(template, &[("TEXT", raw_text)]))
        .await?;
    Ok(parse_todo_response(raw_text, &response))
}

// ============================================================================
// Meetings
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedActionItem {
    pub description: String,
    pub owner: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedMeeting {
    pub title: String,
    pub date: Option<String>,
    pub attendees: Vec<String>,
    pub minutes: String,
    pub decisions: Vec<String>,
    pub action_items: Vec<ExtractedActionItem>,
}

impl ExtractedMeeting {
    pub fn into_meeting(self, team_id: &str) -> Meeting {
        Meeting {
            id: generate_id(),
            team_id: team_id.to_string(),
            date: self.date.unwrap_or_default(),
            title: self.title,
            attendees: self.attendees,
            minutes: self.minutes,
            decisions: if self.decisions.is_empty() {
                None
            } else {
                Some(
                    self.decisions
                        .into_iter()
                        .map(|text| Decision {
                            id: generate_id(),
                            text,
                        })
                        .collect(),
                )
            },
            action_items: self
                .action_items
                .into_iter()
                .map(|item| ActionItem {
                    id: generate_id(),
                    description: item.description,
                    // Owner arrives as a free-text name. ownerId fields hold
                    // "id or name" throughout; display code resolves ids and
                    // falls back to the raw string.
                    owner_id: item.owner.unwrap_or_default(),
                    due_date: item.due_date.unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            created_by_bot: Some(true),
            ..Default::default()
        }
    }
}

pub fn parse_meeting_response(raw_text: &str, response: &str) -> Extraction<ExtractedMeeting> {
    match parse_object::<ExtractedMeeting>(response) {
        Some(meeting) if !meeting.title.trim().is_empty() => Extraction::Parsed(meeting),
        _ => Extraction::Partial(ExtractedMeeting {
            title: fallback_title(raw_text),
            minutes: raw_text.trim().to_string(),
            ..Default::default()
        }),
    }
}

pub async fn extract_meeting_from_text(
    client: &LlmClient,
    prompt_overrides: &HashMap<String, String>,
    raw_text: &str,
) -> Result<Extraction<ExtractedMeeting>, LlmError> {
    let template = resolve_prompt(prompt_overrides, EXTRACT_MEETING).unwrap_or_default();
    let response = client
        .run(&fill_template(template, &[("TEXT", raw_text)]))
        .await?;
    Ok(parse_meeting_response(raw_text, &response))
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedTask {
    pub title: String,
    pub description: String,
    pub priority: Option<TaskPriority>,
    pub eta: Option<String>,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedProject {
    pub name: String,
    pub description: String,
    pub deadline: Option<String>,
    pub owner: Option<String>,
    pub architect: Option<String>,
    pub tasks: Vec<ExtractedTask>,
}

impl ExtractedProject {
    pub fn into_project(self) -> Project {
        Project {
            id: generate_id(),
            name: self.name,
            description: self.description,
            deadline: self.deadline.unwrap_or_default(),
            owner: self.owner,
            architect: self.architect,
            tasks: self
                .tasks
                .into_iter()
                .filter(|task| !task.title.trim().is_empty())
                .map(|task| Task {
                    id: generate_id(),
                    title: task.title,
                    description: task.description,
                    priority: task.priority.unwrap_or_default(),
                    eta: task.eta.unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            created_by_bot: Some(true),
            ..Default::default()
        }
    }
}

pub fn parse_project_response(raw_text: &str, response: &str) -> Extraction<ExtractedProject> {
    match parse_object::<ExtractedProject>(response) {
        Some(project) if !project.name.trim().is_empty() => Extraction::Parsed(project),
        _ => Extraction::Partial(ExtractedProject {
            name: fallback_title(raw_text),
            description: raw_text.trim().to_string(),
            ..Default::default()
        }),
    }
}

pub async fn extract_project_from_text(
    client: &LlmClient,
    prompt_overrides: &HashMap<String, String>,
    raw_text: &str,
) -> Result<Extraction<ExtractedProject>, LlmError> {
    let template = resolve_prompt(prompt_overrides, EXTRACT_PROJECT).unwrap_or_default();
    let response = client
        .run(&fill_template(template, &[("TEXT", raw_text)]))
        .await?;
    Ok(parse_project_response(raw_text, &response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_simple() {
        let text = r#"Here is the result: {"title": "Fix login"} hope that helps"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"title": "Fix login"}"#.to_string())
        );
    }

    #[test]
    fn test_extract_json_nested() {
        let text = r#"{"a": {"b": {"c": 1}}, "d": 2} trailing"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"a": {"b": {"c": 1}}, "d": 2}"#.to_string())
        );
    }

    #[test]
    fn test_extract_json_braces_in_strings() {
        let text = r#"{"note": "use {curly} braces", "x": "a\"b}"}"#;
        assert_eq!(extract_json_object(text), Some(text.to_string()));
    }

    #[test]
    fn test_extract_json_none_when_absent() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object(r#"{"unterminated": true"#), None);
    }

    #[test]
    fn test_parse_todo_happy_path() {
        let response = r#"Sure! {"title": "Send Q3 figures", "dueDate": "2026-09-01",
            "priorityLevel": "high", "tags": ["finance"]}"#;
        let extraction = parse_todo_response("ignored", response);
        assert!(!extraction.is_partial());
        let todo = extraction.record();
        assert_eq!(todo.title, "Send Q3 figures");
        assert_eq!(todo.due_date.as_deref(), Some("2026-09-01"));
        assert_eq!(todo.priority_level, Some(TodoPriorityLevel::High));
    }

    #[test]
    fn test_parse_todo_falls_back_on_prose() {
        let raw = "Please send the Q3 figures to Sam by Friday.\nThanks!";
        let extraction = parse_todo_response(raw, "I could not produce JSON, sorry.");
        assert!(extraction.is_partial());
        let todo = extraction.record();
        assert_eq!(todo.title, "Please send the Q3 figures to Sam by Friday.");
        assert!(todo.description.contains("Thanks!"));
    }

    #[test]
    fn test_parse_todo_rejects_missing_title() {
        // Valid JSON without the one required field is still a partial.
        let extraction = parse_todo_response("raw", r#"{"description": "no title"}"#);
        assert!(extraction.is_partial());
    }

    #[test]
    fn test_parse_todo_rejects_wrong_types() {
        let extraction = parse_todo_response("raw", r#"{"title": "ok", "tags": "oops"}"#);
        assert!(extraction.is_partial());
    }

    #[test]
    fn test_todo_materialization_folds_steps() {
        let extracted = ExtractedTodo {
            title: "Prepare offsite".into(),
            description: "Logistics for the team offsite".into(),
            action_items: vec!["Book room".into(), "Send invites".into()],
            ..Default::default()
        };
        let todo = extracted.into_smart_todo("u7", "Bot");
        assert_eq!(todo.user_id, "u7");
        assert_eq!(todo.created_by_bot, Some(true));
        assert!(todo.description.contains("- Book room"));
        assert!(!todo.id.is_empty());
    }

    #[test]
    fn test_meeting_materialization() {
        let response = r#"{"title": "Sprint review", "date": "2026-08-20",
            "attendees": ["Ada", "Sam"], "decisions": ["Ship it"],
            "actionItems": [{"description": "Update changelog", "owner": "Sam"}]}"#;
        let extraction = parse_meeting_response("raw", response);
        assert!(!extraction.is_partial());
        let meeting = extraction.record().into_meeting("t1");
        assert_eq!(meeting.team_id, "t1");
        assert_eq!(meeting.decisions.as_ref().map(Vec::len), Some(1));
        assert_eq!(meeting.action_items[0].description, "Update changelog");
        assert_eq!(meeting.action_items[0].owner_id, "Sam");
        assert_eq!(meeting.created_by_bot, Some(true));
    }

    #[test]
    fn test_project_materialization_skips_untitled_tasks() {
        let extracted = ExtractedProject {
            name: "Data platform".into(),
            tasks: vec![
                ExtractedTask {
                    title: "Design schema".into(),
                    priority: Some(TaskPriority::High),
                    ..Default::default()
                },
                ExtractedTask::default(),
            ],
            ..Default::default()
        };
        let project = extracted.into_project();
        assert_eq!(project.tasks.len(), 1);
        assert_eq!(project.tasks[0].priority, TaskPriority::High);
    }
}
