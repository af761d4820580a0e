//! Prompt templates and `{{KEY}}` substitution.
//!
//! Every generation and extraction flow resolves its template through
//! [`resolve_prompt`], so a per-key override stored in `AppState.prompts`
//! transparently replaces the built-in text.

use std::collections::HashMap;

pub const TEAM_REPORT: &str = "team_report";
pub const MEETING_SUMMARY: &str = "meeting_summary";
pub const WEEKLY_EMAIL: &str = "weekly_email";
pub const WEEKLY_AUTOFILL: &str = "weekly_autofill";
pub const EXTRACT_TODO: &str = "extract_todo";
pub const EXTRACT_MEETING: &str = "extract_meeting";
pub const EXTRACT_PROJECT: &str = "extract_project";

pub fn default_prompt(key: &str) -> Option<&'static str> {
    match key {
        TEAM_REPORT => Some(
            "You are an expert executive assistant in project management. Write a concise \
             and professional status report based on the provided data.\n\n\
             DATA:\n{{DATA}}\n\n\
             EXPECTED FORMAT (Markdown):\n\
             1. **Executive Summary**: Overall team health in 2 sentences.\n\
             2. **Key Attention Points**: Bullet list of blockers or risks (overdue dates).\n\
             3. **Action Plan**: 3 recommended actions for the manager.\n\n\
             Be factual, direct, and constructive. Write in English.",
        ),
        MEETING_SUMMARY => Some(
            "You are an efficient executive secretary. Generate professional meeting \
             minutes ready to be sent as an email based on the data.\n\n\
             DATA:\n{{DATA}}\n\n\
             EXPECTED FORMAT:\n\
             Subject: [Minutes] {{TITLE}}\n\n\
             Body:\n\
             1. **Summary**: A clear paragraph summarizing main discussions.\n\
             2. **Key Decisions**: Bullet points of the validated decisions provided.\n\
             3. **Action Items**: Clean list of assigned actions.\n\n\
             Tone: professional, neutral, efficient. Write in English.",
        ),
        WEEKLY_EMAIL => Some(
            "You are an executive assistant helping an employee write a professional \
             weekly status update email to their management.\n\n\
             DATA:\n{{DATA}}\n\n\
             TASK: write a concise, professional email draft. Include the RAG status in \
             the header or summary.\n\n\
             EXPECTED FORMAT:\n\
             Subject: Weekly Update - {{NAME}} - {{WEEK}}\n\n\
             [Executive summary paragraph, 2 sentences max]\n\
             **New This Week** [bullets]\n\
             **Key Achievements** [bullets]\n\
             **Challenges & Blockers** [bullets]\n\
             **Other Updates** [bullets]\n\n\
             Best regards,\n{{NAME}}\n\
             Write in English.",
        ),
        WEEKLY_AUTOFILL => Some(
            "You are a manager consolidating the weekly reports of your team.\n\n\
             SOURCE DATA:\n{{DATA}}\n\n\
             TASK: synthesize all these reports into a single consolidated report. For \
             each category, list the items as bullet points and preserve the team name \
             and project context of every point.\n\n\
             CRITICAL: RETURN ONLY A VALID JSON OBJECT. NO MARKDOWN. NO CODE BLOCKS.\n\n\
             Structure required:\n\
             {\n\
               \"newThisWeek\": \"Bullet list of new items/topics...\",\n\
               \"mainSuccess\": \"Bullet list of achievements...\",\n\
               \"mainIssue\": \"Bullet list of blocking issues...\",\n\
               \"incident\": \"Bullet list of incidents...\",\n\
               \"orgaPoint\": \"Bullet list of HR/organization points...\",\n\
               \"otherSection\": \"Bullet list of other relevant info...\"\n\
             }\n\n\
             Language: English.",
        ),
        EXTRACT_TODO => Some(
            "You are a task-capture assistant. Extract one actionable to-do from the raw \
             text below (an email, chat excerpt, or meeting fragment).\n\n\
             RAW TEXT:\n{{TEXT}}\n\n\
             CRITICAL: RETURN ONLY A VALID JSON OBJECT. NO MARKDOWN. NO CODE BLOCKS.\n\n\
             Structure:\n\
             {\n\
               \"title\": \"short imperative title\",\n\
               \"description\": \"what needs to be done, with context\",\n\
               \"requester\": \"who asked, if identifiable\",\n\
               \"tags\": [\"keyword\", ...],\n\
               \"links\": [\"url\", ...],\n\
               \"priorityLevel\": \"low|medium|high|urgent\",\n\
               \"energyRequired\": \"low|medium|high\",\n\
               \"estimatedDurationMin\": null,\n\
               \"startDate\": null,\n\
               \"dueDate\": \"YYYY-MM-DD or null\",\n\
               \"isRecurring\": false,\n\
               \"recurrenceRule\": null,\n\
               \"actionItems\": [\"sub-step\", ...]\n\
             }\n\
             Use null for anything the text does not state. Do not invent dates.",
        ),
        EXTRACT_MEETING => Some(
            "You are a minute-taking assistant. Extract a structured meeting record from \
             the raw notes below.\n\n\
             RAW TEXT:\n{{TEXT}}\n\n\
             CRITICAL: RETURN ONLY A VALID JSON OBJECT. NO MARKDOWN. NO CODE BLOCKS.\n\n\
             Structure:\n\
             {\n\
               \"title\": \"meeting title\",\n\
               \"date\": \"YYYY-MM-DD or null\",\n\
               \"attendees\": [\"name\", ...],\n\
               \"minutes\": \"cleaned-up notes\",\n\
               \"decisions\": [\"decision\", ...],\n\
               \"actionItems\": [{\"description\": \"...\", \"owner\": \"name or null\", \
             \"dueDate\": \"YYYY-MM-DD or null\"}]\n\
             }\n\
             Use null for anything the text does not state.",
        ),
        EXTRACT_PROJECT => Some(
            "You are a project-intake assistant. Extract a structured project definition \
             from the raw brief below.\n\n\
             RAW TEXT:\n{{TEXT}}\n\n\
             CRITICAL: RETURN ONLY A VALID JSON OBJECT. NO MARKDOWN. NO CODE BLOCKS.\n\n\
             Structure:\n\
             {\n\
               \"name\": \"project name\",\n\
               \"description\": \"what the project is about\",\n\
               \"deadline\": \"YYYY-MM-DD or null\",\n\
               \"owner\": \"name or null\",\n\
               \"architect\": \"name or null\",\n\
               \"tasks\": [{\"title\": \"...\", \"description\": \"...\", \
             \"priority\": \"Low|Medium|High\", \"eta\": \"YYYY-MM-DD or null\", \
             \"assignee\": \"name or null\"}]\n\
             }\n\
             Use null for anything the text does not state. Do not invent dates.",
        ),
        _ => None,
    }
}

/// The template in effect for `key`: the user's override when one exists,
/// otherwise the built-in default.
pub fn resolve_prompt<'a>(overrides: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    overrides
        .get(key)
        .map(String::as_str)
        .or_else(|| default_prompt(key))
}

/// Replace every `{{KEY}}` placeholder. Placeholders without a replacement
/// are left in place.
pub fn fill_template(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in replacements {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
