//! Core data model: the AppState aggregate and every entity it owns.
//!
//! Wire format is camelCase JSON and must stay byte-compatible with the
//! payloads already sitting in existing local caches, shared-store files and
//! backup exports. Enum variants carry the exact display strings those
//! payloads use ("To Do", "In Progress", ...), so renames here are wire
//! changes, not refactors.
//!
//! Every wire enum carries an `#[serde(other)]` `Unknown` variant: a value
//! written by a newer build parses as `Unknown` instead of failing the whole
//! snapshot, so one unrecognized status never costs a client its data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserRole {
    Admin,
    Manager,
    #[default]
    Employee,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Login identifier, distinct from the generated `id`.
    pub uid: String,
    pub first_name: String,
    pub last_name: String,
    pub function_title: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Plain demo credential, kept as-is from the original data files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// =============================================================================
// Tasks & projects
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    Todo,
    #[serde(rename = "In Progress")]
    Ongoing,
    Blocked,
    Done,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TaskActionStatus {
    #[default]
    #[serde(rename = "To Do")]
    Todo,
    Ongoing,
    Blocked,
    Done,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAction {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub status: TaskActionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RagStatus {
    Red,
    #[default]
    Amber,
    Green,
    #[serde(other)]
    Unknown,
}

/// External dependency tracked with a Red/Amber/Green light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDependency {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub status: RagStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    /// Estimated completion date (ISO day).
    #[serde(default)]
    pub eta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default)]
    pub external_dependencies: Vec<ExternalDependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<TaskAction>>,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<ChecklistItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    Paused,
    Done,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProjectRole {
    Owner,
    Lead,
    #[default]
    Contributor,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub user_id: String,
    #[serde(default)]
    pub role: ProjectRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub date: String,
    pub user_name: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architect: Option<String>,
    #[serde(default)]
    pub deadline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default)]
    pub members: Vec<ProjectMember>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default)]
    pub external_dependencies: Vec<ExternalDependency>,
    /// Extra context paragraphs fed to the LLM alongside the description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_descriptions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<Vec<AuditEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_bot: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub manager_id: String,
    #[serde(default)]
    pub projects: Vec<Project>,
}

// =============================================================================
// Meetings
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ActionItemStatus {
    #[default]
    #[serde(rename = "To Start")]
    ToStart,
    Ongoing,
    Blocked,
    Done,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub status: ActionItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub minutes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decisions: Option<Vec<Decision>>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_bot: Option<bool>,
}

// =============================================================================
// Weekly reports
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub id: String,
    pub user_id: String,
    /// ISO date of the Monday this report covers.
    pub week_of: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_this_week: Option<String>,
    #[serde(default)]
    pub main_success: String,
    #[serde(default)]
    pub main_issue: String,
    #[serde(default)]
    pub incident: String,
    #[serde(default)]
    pub orga_point: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_health: Option<RagStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_health: Option<RagStatus>,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_check: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

// =============================================================================
// Working groups
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingGroupChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkingGroupSession {
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decisions: Option<Vec<Decision>>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<WorkingGroupChecklistItem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkingGroup {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub sessions: Vec<WorkingGroupSession>,
    #[serde(default)]
    pub archived: bool,
}

// =============================================================================
// Smart todos (personal Eisenhower board)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Todo,
    InProgress,
    Blocked,
    Done,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoPriorityLevel {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnergyLevel {
    Low,
    #[default]
    Medium,
    High,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoAttachment {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SmartTodo {
    pub id: String,
    /// Owner; smart todos are private to this user.
    pub user_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    /// Where this landed from: "Email", "Meeting", "Manual", "Bot", ...
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub requester: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_bot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_assigned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_by_user_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<TodoAttachment>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub status: TodoStatus,
    #[serde(default)]
    pub priority_level: TodoPriorityLevel,
    /// Q1=Do Now, Q2=Schedule, Q3=Delegate, Q4=Eliminate.
    #[serde(default)]
    pub eisenhower_quadrant: Option<u8>,
    #[serde(default)]
    pub energy_required: EnergyLevel,
    #[serde(default)]
    pub estimated_duration_min: Option<i64>,
    #[serde(default)]
    pub actual_time_spent_min: Option<i64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

// =============================================================================
// One-off queries
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OneOffQueryStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OneOffQuery {
    pub id: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub requester: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<String>,
    #[serde(default)]
    pub sponsor: String,
    #[serde(default)]
    pub received_at: String,
    #[serde(default)]
    pub eta_requested: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data_source: String,
    #[serde(default)]
    pub eisenhower_quadrant: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: OneOffQueryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_free_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

// =============================================================================
// Notifications & system message
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ProjectCreated,
    ProjectUpdated,
    TaskCreated,
    TaskUpdated,
    ReportCreated,
    ReportUpdated,
    StaleProject,
    ReportOverdue,
    TodoAssigned,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationTarget {
    Admin,
    #[default]
    User,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    #[serde(default)]
    pub target_role: NotificationTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    #[serde(default)]
    pub created_at: String,
    /// User ids that have already seen this notification.
    #[serde(default)]
    pub seen_by: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    #[default]
    Info,
    Warning,
    Alert,
    #[serde(other)]
    Unknown,
}

/// Broadcast banner shown to every user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub level: MessageLevel,
}

// =============================================================================
// LLM configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Ollama,
    LocalHttp,
    N8n,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            base_url: Some("http://localhost:11434".to_string()),
            api_key: None,
            model: "llama3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    #[serde(other)]
    Unknown,
}

// =============================================================================
// Root aggregate
// =============================================================================

/// The single root aggregate holding every collection plus session-local
/// attributes. `current_user` and `theme` never travel to the shared store;
/// see [`AppState::shared_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub weekly_reports: Vec<WeeklyReport>,
    #[serde(default)]
    pub working_groups: Vec<WorkingGroup>,
    #[serde(default)]
    pub smart_todos: Vec<SmartTodo>,
    #[serde(default)]
    pub one_off_queries: Vec<OneOffQuery>,
    #[serde(default)]
    pub notifications: Vec<AppNotification>,
    /// Alert key → ISO date of dismissal, kept per client.
    #[serde(default)]
    pub dismissed_alerts: HashMap<String, String>,
    #[serde(default)]
    pub system_message: SystemMessage,
    /// Session-local: who is logged in on this client.
    #[serde(default)]
    pub current_user: Option<User>,
    /// Session-local UI theme.
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub llm_config: LlmConfig,
    /// Prompt-key → override text for the LLM templates.
    #[serde(default)]
    pub prompts: HashMap<String, String>,
    /// Version stamp: milliseconds since epoch, monotonic on the shared copy.
    #[serde(default)]
    pub last_updated: i64,
    /// Fields written by newer schema versions survive a round-trip here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppState {
    /// Serialize for the shared store: session-local fields are removed so
    /// one client's login never overwrites another's.
    pub fn shared_value(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()));
        if let Some(obj) = value.as_object_mut() {
            obj.remove("currentUser");
            obj.remove("theme");
        }
        value
    }
}

/// The account seeded into a brand-new store.
pub fn bootstrap_admin() -> User {
    User {
        id: "u1".to_string(),
        uid: "Admin".to_string(),
        first_name: "System".to_string(),
        last_name: "Admin".to_string(),
        function_title: "Administrator".to_string(),
        role: UserRole::Admin,
        password: Some("admin".to_string()),
        ..Default::default()
    }
}

/// Fresh-start state: one administrator, everything else empty. The version
/// stamp stays at zero so any shared snapshot outranks a fresh client.
pub fn default_state() -> AppState {
    AppState {
        users: vec![bootstrap_admin()],
        ..Default::default()
    }
}

/// Random UUID entity id. Merges key strictly on these.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_wire_strings() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Todo).unwrap(),
            "\"To Do\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Ongoing).unwrap(),
            "\"In Progress\""
        );
        let parsed: TaskStatus = serde_json::from_str("\"Blocked\"").unwrap();
        assert_eq!(parsed, TaskStatus::Blocked);
    }

    #[test]
    fn test_action_item_status_wire_strings() {
        assert_eq!(
            serde_json::to_string(&ActionItemStatus::ToStart).unwrap(),
            "\"To Start\""
        );
    }

    #[test]
    fn test_todo_status_snake_case() {
        assert_eq!(
            serde_json::to_string(&TodoStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_notification_type_uses_type_key() {
        let n = AppNotification {
            id: "n1".to_string(),
            kind: NotificationType::TodoAssigned,
            message: "Assigned".to_string(),
            details: None,
            related_id: None,
            triggered_by: None,
            target_role: NotificationTarget::User,
            target_user_id: None,
            created_at: String::new(),
            seen_by: vec![],
        };
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["type"], "todo_assigned");
        assert!(v["seenBy"].is_array());
    }

    #[test]
    fn test_unrecognized_enum_values_parse_as_unknown() {
        // A notification type minted by a newer build must not fail the
        // whole record.
        let n: AppNotification = serde_json::from_str(
            r#"{"id":"n1","type":"calendar_synced","message":"m"}"#,
        )
        .unwrap();
        assert_eq!(n.kind, NotificationType::Unknown);

        let status: TaskStatus = serde_json::from_str("\"Parked\"").unwrap();
        assert_eq!(status, TaskStatus::Unknown);
    }

    #[test]
    fn test_shared_value_strips_session_fields() {
        let mut state = default_state();
        state.current_user = Some(bootstrap_admin());
        state.theme = Theme::Dark;

        let shared = state.shared_value();
        let obj = shared.as_object().unwrap();
        assert!(!obj.contains_key("currentUser"));
        assert!(!obj.contains_key("theme"));
        assert!(obj.contains_key("users"));
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let json = r#"{"users":[],"teams":[],"futureCollection":[{"id":"x"}]}"#;
        let state: AppState = serde_json::from_str(json).unwrap();
        assert!(state.extra.contains_key("futureCollection"));

        let out = serde_json::to_value(&state).unwrap();
        assert_eq!(out["futureCollection"][0]["id"], "x");
    }

    #[test]
    fn test_default_state_seeds_admin() {
        let state = default_state();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.users[0].uid, "Admin");
        assert_eq!(state.users[0].role, UserRole::Admin);
        assert!(state.teams.is_empty());
        assert_eq!(state.last_updated, 0);
    }
}
