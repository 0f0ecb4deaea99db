//! Formats the reminder text spliced into a `tools/call` response.

/// Render the CONSTRAINT block for interaction `n`. `reminders` is the flat
/// list of reminder strings contributed by the selected constraints, already
/// flattened out of any composite structure. `prologue`/`epilogue` are
/// pack-level constants.
///
/// If `reminders` is empty, the reminder block and its surrounding blank
/// line are omitted entirely.
pub fn format_injection(n: u32, prologue: &str, epilogue: &str, reminders: &[String]) -> String {
    let mut out = format!("Tool call {n} processed. CONSTRAINT:\n\n");
    out.push_str(&format!("Remember: {prologue}\n"));

    if !reminders.is_empty() {
        out.push('\n');
        for reminder in reminders {
            out.push_str(&format!("• {reminder}\n"));
        }
    }

    out.push('\n');
    out.push_str(&format!("Before commit: {epilogue}"));

    out.trim_end().to_string()
}
