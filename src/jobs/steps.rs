//! Step block inspection.

/// Extract the `name:` value of a pre-rendered step block.
///
/// Returns the first line whose text, after trimming and dropping a leading
/// list dash, starts with `name:`. Surrounding quotes are stripped. Steps
/// without a name yield `None`.
pub fn extract_step_name(step: &str) -> Option<&str> {
    step.lines().find_map(|line| {
        let trimmed = line.trim();
        let trimmed = trimmed.strip_prefix('-').unwrap_or(trimmed).trim_start();
        let value = trimmed.strip_prefix("name:")?;
        let name = value.trim().trim_matches(|c| c == '"' || c == '\'');
        Some(name)
    })
}
