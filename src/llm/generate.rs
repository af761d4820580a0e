//! Report generators: flatten domain records into a text block, fill the
//! template, run the prompt.
//!
//! Every generator returns the model's cleaned text as-is except the
//! consolidated weekly autofill, which asks for JSON and falls back to
//! dumping the raw response into the free-text section when parsing fails.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Deserialize;

use crate::error::LlmError;
use crate::llm::client::LlmClient;
use crate::llm::extract::extract_json_object;
use crate::llm::prompts::{
    fill_template, resolve_prompt, MEETING_SUMMARY, TEAM_REPORT, WEEKLY_AUTOFILL, WEEKLY_EMAIL,
};
use crate::types::{Meeting, RagStatus, Team, TaskStatus, User, WeeklyReport};

fn user_name(users: &[User], id: &str) -> String {
    users
        .iter()
        .find(|u| u.id == id)
        .map(|u| format!("{} {}", u.first_name, u.last_name))
        .unwrap_or_else(|| id.to_string())
}

fn task_status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "To Do",
        TaskStatus::Ongoing => "In Progress",
        TaskStatus::Blocked => "Blocked",
        TaskStatus::Done => "Done",
        TaskStatus::Unknown => "Unknown",
    }
}

fn rag_label(status: Option<RagStatus>) -> &'static str {
    match status {
        Some(RagStatus::Red) => "Red",
        Some(RagStatus::Amber) => "Amber",
        Some(RagStatus::Green) => "Green",
        Some(RagStatus::Unknown) | None => "N/A",
    }
}

// ============================================================================
// Team status report
// ============================================================================

fn prepare_team_data(team: &Team, manager: Option<&User>) -> String {
    let mut data = String::new();
    let _ = writeln!(data, "Team: {}", team.name);
    let _ = writeln!(
        data,
        "Manager: {}",
        manager
            .map(|m| format!("{} {}", m.first_name, m.last_name))
            .unwrap_or_else(|| "N/A".to_string())
    );

    for project in &team.projects {
        let total = project.tasks.len();
        let closed = project
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Done)
            .count();
        let blocked = project
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Blocked)
            .count();

        let _ = writeln!(data, "---");
        let _ = writeln!(data, "Project: {}", project.name);
        let _ = writeln!(data, "Description: {}", project.description);
        for (i, context) in project
            .additional_descriptions
            .iter()
            .flatten()
            .filter(|d| !d.trim().is_empty())
            .enumerate()
        {
            let _ = writeln!(data, "Context layer {}: {}", i + 1, context);
        }
        let _ = writeln!(data, "Progress: {}/{} tasks completed.", closed, total);
        let _ = writeln!(data, "Blocking points: {} tasks blocked.", blocked);
        for task in &project.tasks {
            let owner = task.assignee_id.as_deref().unwrap_or("Unassigned");
            let _ = writeln!(
                data,
                "- [{}] {} (ETA: {}, Owner: {})",
                task_status_label(task.status),
                task.title,
                task.eta,
                owner
            );
        }
    }
    data
}

pub async fn generate_team_report(
    client: &LlmClient,
    prompt_overrides: &HashMap<String, String>,
    team: &Team,
    manager: Option<&User>,
) -> Result<String, LlmError> {
    let template = resolve_prompt(prompt_overrides, TEAM_REPORT).unwrap_or_default();
    let data = prepare_team_data(team, manager);
    client.run(&fill_template(template, &[("DATA", &data)])).await
}

// ============================================================================
// Meeting minutes
// ============================================================================

fn prepare_meeting_data(meeting: &Meeting, team_name: &str, users: &[User]) -> String {
    let attendees: Vec<String> = meeting
        .attendees
        .iter()
        .map(|a| user_name(users, a))
        .collect();

    let mut data = String::new();
    let _ = writeln!(data, "Title: {}", meeting.title);
    let _ = writeln!(data, "Date: {}", meeting.date);
    let _ = writeln!(data, "Team: {}", team_name);
    let _ = writeln!(data, "Attendees: {}", attendees.join(", "));
    let _ = writeln!(data, "\nRaw notes (minutes):\n{}", meeting.minutes);

    let _ = writeln!(data, "\nKey decisions (validated):");
    match meeting.decisions.as_deref() {
        Some(decisions) if !decisions.is_empty() => {
            for decision in decisions {
                let _ = writeln!(data, "- {}", decision.text);
            }
        }
        _ => {
            let _ = writeln!(data, "No key decisions recorded.");
        }
    }

    let _ = writeln!(data, "\nAction items (defined):");
    for item in &meeting.action_items {
        let _ = writeln!(
            data,
            "- {} (Owner: {}, Due: {})",
            item.description,
            user_name(users, &item.owner_id),
            item.due_date
        );
    }
    data
}

pub async fn generate_meeting_summary(
    client: &LlmClient,
    prompt_overrides: &HashMap<String, String>,
    meeting: &Meeting,
    team_name: &str,
    users: &[User],
) -> Result<String, LlmError> {
    let template = resolve_prompt(prompt_overrides, MEETING_SUMMARY).unwrap_or_default();
    let data = prepare_meeting_data(meeting, team_name, users);
    client
        .run(&fill_template(
            template,
            &[("DATA", data.as_str()), ("TITLE", &meeting.title)],
        ))
        .await
}

// ============================================================================
// Weekly status email
// ============================================================================

fn prepare_weekly_report_data(report: &WeeklyReport, author: Option<&User>) -> String {
    let name = author
        .map(|u| format!("{} {}", u.first_name, u.last_name))
        .unwrap_or_default();
    let mut data = String::new();
    let _ = writeln!(data, "Employee: {}", name);
    let _ = writeln!(data, "Week of: {}", report.week_of);
    let _ = writeln!(
        data,
        "Status indicators (RAG): Team={}, Project={}",
        rag_label(report.team_health),
        rag_label(report.project_health)
    );
    let _ = writeln!(
        data,
        "New this week: {}",
        report.new_this_week.as_deref().unwrap_or("None")
    );
    let _ = writeln!(data, "Main successes: {}", report.main_success);
    let _ = writeln!(data, "Blocking issues: {}", report.main_issue);
    let _ = writeln!(data, "Incidents: {}", report.incident);
    let _ = writeln!(data, "Organization/HR: {}", report.orga_point);
    let _ = writeln!(
        data,
        "Other: {}",
        report.other_section.as_deref().unwrap_or("")
    );
    data
}

pub async fn generate_weekly_email(
    client: &LlmClient,
    prompt_overrides: &HashMap<String, String>,
    report: &WeeklyReport,
    author: Option<&User>,
) -> Result<String, LlmError> {
    let template = resolve_prompt(prompt_overrides, WEEKLY_EMAIL).unwrap_or_default();
    let data = prepare_weekly_report_data(report, author);
    let name = author
        .map(|u| format!("{} {}", u.first_name, u.last_name))
        .unwrap_or_default();
    client
        .run(&fill_template(
            template,
            &[
                ("DATA", data.as_str()),
                ("NAME", name.as_str()),
                ("WEEK", &report.week_of),
            ],
        ))
        .await
}

// ============================================================================
// Consolidated weekly autofill
// ============================================================================

/// Sections of a consolidated weekly report, as the manager's report form
/// expects them.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsolidatedSections {
    pub new_this_week: String,
    pub main_success: String,
    pub main_issue: String,
    pub incident: String,
    pub orga_point: String,
    pub other_section: String,
}

/// Parse the autofill response. A response that is not the requested JSON
/// object degrades to a record with everything in `other_section`, so the
/// manager still sees what came back.
pub fn parse_consolidated_response(response: &str) -> ConsolidatedSections {
    let cleaned = response.replace("```json", "").replace("```", "");
    if let Some(json) = extract_json_object(&cleaned) {
        if let Ok(sections) = serde_json::from_str::<ConsolidatedSections>(&json) {
            return sections;
        }
    }
    log::warn!("Autofill response was not valid JSON, keeping raw text");
    ConsolidatedSections {
        other_section: response.trim().to_string(),
        ..Default::default()
    }
}

fn prepare_consolidation_data(
    reports: &[WeeklyReport],
    users: &[User],
    teams: &[Team],
) -> String {
    let mut data = String::new();
    for report in reports {
        let author = users.iter().find(|u| u.id == report.user_id);
        let team_names: Vec<&str> = teams
            .iter()
            .filter(|t| {
                author.is_some_and(|u| {
                    t.manager_id == u.id
                        || t.projects
                            .iter()
                            .any(|p| p.members.iter().any(|m| m.user_id == u.id))
                })
            })
            .map(|t| t.name.as_str())
            .collect();

        let _ = writeln!(
            data,
            "REPORT FROM: {}",
            author
                .map(|u| format!("{} {}", u.first_name, u.last_name))
                .unwrap_or_else(|| report.user_id.clone())
        );
        let _ = writeln!(
            data,
            "TEAM(S): {}",
            if team_names.is_empty() {
                "No Team".to_string()
            } else {
                team_names.join(", ")
            }
        );
        let _ = writeln!(
            data,
            "TEAM HEALTH: {}, PROJECT HEALTH: {}",
            rag_label(report.team_health),
            rag_label(report.project_health)
        );
        let _ = writeln!(
            data,
            "NEW ITEMS: {}",
            report.new_this_week.as_deref().unwrap_or("None")
        );
        let _ = writeln!(data, "SUCCESS: {}", report.main_success);
        let _ = writeln!(data, "ISSUES: {}", report.main_issue);
        let _ = writeln!(data, "INCIDENTS: {}", report.incident);
        let _ = writeln!(data, "ORGA: {}", report.orga_point);
        let _ = writeln!(
            data,
            "OTHER: {}",
            report.other_section.as_deref().unwrap_or("")
        );
        let _ = writeln!(data, "----------------------------------------------");
    }
    data
}

pub async fn generate_consolidated_report(
    client: &LlmClient,
    prompt_overrides: &HashMap<String, String>,
    reports: &[WeeklyReport],
    users: &[User],
    teams: &[Team],
) -> Result<ConsolidatedSections, LlmError> {
    let template = resolve_prompt(prompt_overrides, WEEKLY_AUTOFILL).unwrap_or_default();
    let data = prepare_consolidation_data(reports, users, teams);
    let response = client.run(&fill_template(template, &[("DATA", &data)])).await?;
    Ok(parse_consolidated_response(&response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Project, Task, UserRole};

    fn user(id: &str, first: &str, last: &str) -> User {
        User {
            id: id.into(),
            uid: first.to_lowercase(),
            first_name: first.into(),
            last_name: last.into(),
            function_title: "Engineer".into(),
            role: UserRole::Employee,
            ..Default::default()
        }
    }

    #[test]
    fn test_team_data_counts_progress() {
        let team = Team {
            id: "t1".into(),
            name: "Core".into(),
            projects: vec![Project {
                id: "p1".into(),
                name: "Alpha".into(),
                tasks: vec![
                    Task {
                        id: "k1".into(),
                        title: "Done one".into(),
                        status: TaskStatus::Done,
                        ..Default::default()
                    },
                    Task {
                        id: "k2".into(),
                        title: "Stuck one".into(),
                        status: TaskStatus::Blocked,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let data = prepare_team_data(&team, Some(&user("u1", "Ada", "L")));
        assert!(data.contains("Progress: 1/2 tasks completed."));
        assert!(data.contains("Blocking points: 1 tasks blocked."));
        assert!(data.contains("Manager: Ada L"));
        assert!(data.contains("[Blocked] Stuck one"));
    }

    #[test]
    fn test_meeting_data_resolves_names() {
        let users = vec![user("u2", "Sam", "Reyes")];
        let meeting = Meeting {
            id: "m1".into(),
            title: "Kickoff".into(),
            attendees: vec!["u2".into(), "External guest".into()],
            ..Default::default()
        };
        let data = prepare_meeting_data(&meeting, "Core", &users);
        assert!(data.contains("Attendees: Sam Reyes, External guest"));
        assert!(data.contains("No key decisions recorded."));
    }

    #[test]
    fn test_consolidated_parse_happy_path() {
        let response = r#"```json
            {"newThisWeek": "- onboarding", "mainSuccess": "- shipped v2",
             "mainIssue": "", "incident": "", "orgaPoint": "", "otherSection": ""}
            ```"#;
        let sections = parse_consolidated_response(response);
        assert_eq!(sections.new_this_week, "- onboarding");
        assert_eq!(sections.main_success, "- shipped v2");
    }

    #[test]
    fn test_consolidated_parse_fallback() {
        let sections = parse_consolidated_response("Sorry, I can only answer in prose.");
        assert_eq!(sections.other_section, "Sorry, I can only answer in prose.");
        assert!(sections.main_success.is_empty());
    }
}
