//! Input validation and sanitization.
//!
//! Everything here runs before a request leaves the process; a rejected input
//! never reaches the retry loop.

use chrono::NaiveDate;

use super::errors::ValidationError;
use super::project::CreateProjectRequest;
use super::task::CreateTaskRequest;

const MAX_TITLE_LEN: usize = 500;
const MAX_NOTES_LEN: usize = 10_000;
const MAX_TAG_LEN: usize = 50;
const MAX_TAGS: usize = 10;
const MIN_QUERY_LEN: usize = 2;
const MAX_QUERY_LEN: usize = 200;
const MAX_PROJECT_NAME_LEN: usize = 200;

/// Task ids are interpolated into upstream paths, so path/query delimiters are
/// rejected outright.
pub fn validate_task_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::new("id", "Task ID is required"));
    }
    if id.chars().any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace()) {
        return Err(ValidationError::new("id", "Task ID contains invalid characters"));
    }
    Ok(())
}

pub fn validate_task_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::new("title", "Task title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::new(
            "title",
            format!("Task title must be {MAX_TITLE_LEN} characters or less"),
        ));
    }
    Ok(())
}

pub fn validate_notes(notes: &str) -> Result<(), ValidationError> {
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::new(
            "notes",
            format!("Notes must be {MAX_NOTES_LEN} characters or less"),
        ));
    }
    Ok(())
}

/// Strict `YYYY-MM-DD`; calendar-invalid dates such as 2024-02-30 are rejected.
pub fn validate_due_date(date: &str) -> Result<(), ValidationError> {
    validate_date("due_date", date)
}

fn validate_date(field: &'static str, date: &str) -> Result<(), ValidationError> {
    if date.is_empty() {
        return Ok(());
    }

    let bytes = date.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(ValidationError::new(
            field,
            "Date must be in YYYY-MM-DD format",
        ));
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::new(field, "Invalid date"))
}

pub fn validate_tag(tag: &str) -> Result<(), ValidationError> {
    if tag.trim().is_empty() {
        return Err(ValidationError::new("tags", "Tag cannot be empty"));
    }
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(ValidationError::new(
            "tags",
            format!("Tag must be {MAX_TAG_LEN} characters or less"),
        ));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_') || c.is_whitespace();
    if !tag.chars().all(allowed) {
        return Err(ValidationError::new(
            "tags",
            "Tag can only contain letters, numbers, spaces, dashes, and underscores",
        ));
    }
    Ok(())
}

pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::new(
            "tags",
            format!("Maximum {MAX_TAGS} tags allowed"),
        ));
    }
    tags.iter().try_for_each(|t| validate_tag(t))
}

pub fn validate_search_query(query: &str) -> Result<(), ValidationError> {
    if query.trim().is_empty() {
        return Err(ValidationError::new("q", "Search query cannot be empty"));
    }
    let len = query.chars().count();
    if len < MIN_QUERY_LEN {
        return Err(ValidationError::new(
            "q",
            format!("Search query must be at least {MIN_QUERY_LEN} characters"),
        ));
    }
    if len > MAX_QUERY_LEN {
        return Err(ValidationError::new(
            "q",
            format!("Search query must be {MAX_QUERY_LEN} characters or less"),
        ));
    }
    Ok(())
}

pub fn validate_project_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name", "Project name is required"));
    }
    if name.chars().count() > MAX_PROJECT_NAME_LEN {
        return Err(ValidationError::new(
            "name",
            format!("Project name must be {MAX_PROJECT_NAME_LEN} characters or less"),
        ));
    }
    Ok(())
}

pub fn validate_area_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("area_name", "Area name is required"));
    }
    Ok(())
}

/// Project creation is validated but not sanitized; names are sent as typed.
pub fn validate_create_project(request: &CreateProjectRequest) -> Result<(), ValidationError> {
    validate_project_name(&request.name)?;
    if let Some(deadline) = request.deadline.as_deref() {
        validate_date("deadline", deadline)?;
    }
    if let Some(notes) = request.notes.as_deref() {
        validate_notes(notes)?;
    }
    Ok(())
}

/// Trim, collapse internal whitespace runs, then HTML-escape.
pub fn sanitize_user_input(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    for c in collapsed.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Sanitize the free-text fields of a create request, then validate it.
pub fn prepare_create_request(
    mut request: CreateTaskRequest,
) -> Result<CreateTaskRequest, ValidationError> {
    request.title = sanitize_user_input(&request.title);
    request.notes = request.notes.map(|n| sanitize_user_input(&n));
    request.tags = request
        .tags
        .map(|tags| tags.iter().map(|t| sanitize_user_input(t)).collect());

    validate_task_title(&request.title)?;
    if let Some(due) = request.due_date.as_deref() {
        validate_due_date(due)?;
    }
    if let Some(tags) = request.tags.as_deref() {
        validate_tags(tags)?;
    }
    if let Some(notes) = request.notes.as_deref() {
        validate_notes(notes)?;
    }
    Ok(request)
}
