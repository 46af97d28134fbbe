use batchkit::{ApplyResult, ReconcileSummary, StatusCounts};
use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Outcomes
// ============================================================================

/// One-line description of an operation outcome
pub fn outcome(subject: &str, result: &ApplyResult) -> String {
    match result {
        ApplyResult::Created => format!("Created {subject}"),
        ApplyResult::Modified => format!("Updated {subject}"),
        ApplyResult::Disabled => format!("Disabled {subject}"),
        ApplyResult::Removed => format!("Requested deletion of {subject}"),
        ApplyResult::Registered { revision, .. } => {
            format!("Registered {subject} revision {revision}")
        }
        ApplyResult::Deregistered { count: 0 } => {
            format!("{subject} has no active revisions")
        }
        ApplyResult::Deregistered { count } => {
            format!("Deregistered {count} revision(s) of {subject}")
        }
        ApplyResult::Skipped { reason } => reason.clone(),
    }
}

/// Print an operation outcome
pub fn report(subject: &str, result: &ApplyResult) {
    let line = outcome(subject, result);
    match result {
        ApplyResult::Skipped { .. } => warn(&line),
        ApplyResult::Deregistered { count: 0 } => info(&line),
        ApplyResult::Registered { arn, .. } => {
            success(&line);
            dim(arn);
        }
        _ => success(&line),
    }
}

/// Print the totals of an assemble or teardown
pub fn summary(summary: &ReconcileSummary) {
    section("Summary");
    let rows = [
        ("created", summary.created),
        ("updated", summary.modified),
        ("disabled", summary.disabled),
        ("removed", summary.removed),
        ("registered", summary.registered),
        ("deregistered", summary.deregistered),
        ("skipped", summary.skipped),
    ];
    for (key, count) in rows.into_iter().filter(|(_, count)| *count > 0) {
        kv(key, &count.to_string());
    }
    if summary.total_changes() == 0 {
        dim("no changes");
    }
}

/// Print a job status table
pub fn job_table(counts: &StatusCounts) {
    for line in counts.table() {
        println!("{line}");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_lines() {
        assert_eq!(
            outcome("queue main", &ApplyResult::Created),
            "Created queue main"
        );
        assert_eq!(
            outcome("queue main", &ApplyResult::Removed),
            "Requested deletion of queue main"
        );
        assert_eq!(
            outcome(
                "job definition crunch",
                &ApplyResult::Registered {
                    arn: "arn:aws:batch:us-east-1:1:job-definition/crunch:4".to_string(),
                    revision: 4,
                }
            ),
            "Registered job definition crunch revision 4"
        );
    }

    #[test]
    fn test_outcome_deregistered() {
        assert_eq!(
            outcome("job definition crunch", &ApplyResult::Deregistered { count: 2 }),
            "Deregistered 2 revision(s) of job definition crunch"
        );
        assert_eq!(
            outcome("job definition crunch", &ApplyResult::Deregistered { count: 0 }),
            "job definition crunch has no active revisions"
        );
    }

    #[test]
    fn test_outcome_skipped_uses_reason() {
        let result = ApplyResult::Skipped {
            reason: "Queue main does not exist".to_string(),
        };
        assert_eq!(outcome("queue main", &result), "Queue main does not exist");
    }
}
