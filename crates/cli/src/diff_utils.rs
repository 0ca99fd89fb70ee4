//! Line diffs between a canonical file and a user's copy

use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};

/// Check if content is binary (contains null bytes in first 8KB)
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(8192).any(|&b| b == 0)
}

/// Render a colored unified diff from `canonical` to `private`
///
/// Empty when both sides have the same text.
pub fn unified_diff(
    canonical: &[u8],
    private: &[u8],
    path: &str,
    user: &str,
    context_lines: usize,
) -> String {
    let old_text = String::from_utf8_lossy(canonical);
    let new_text = String::from_utf8_lossy(private);
    let diff = TextDiff::from_lines(&old_text, &new_text);

    let mut output = String::new();
    for (index, hunk) in diff
        .unified_diff()
        .context_radius(context_lines)
        .iter_hunks()
        .enumerate()
    {
        if index == 0 {
            output.push_str(&format!("{}\n", format!("--- {path}").bold()));
            output.push_str(&format!("{}\n", format!("+++ {path} ({user})").bold()));
        }
        output.push_str(&format!("{}\n", hunk.header().to_string().cyan()));

        for change in hunk.iter_changes() {
            let line = change.value();
            let rendered = match change.tag() {
                ChangeTag::Delete => format!("-{line}").red().to_string(),
                ChangeTag::Insert => format!("+{line}").green().to_string(),
                ChangeTag::Equal => format!(" {line}").dimmed().to_string(),
            };
            output.push_str(&rendered);
            if !line.ends_with('\n') {
                output.push('\n');
            }
        }
    }
    output
}
