//! Markdown collision helpers.
//!
//! Message text is written as-is so normalized output stays stable when it
//! is normalized again. The only escaping done is where a character would
//! break the surrounding construct: pipes in table cells and backtick runs
//! inside code.

/// Escape pipes so a cell cannot split its table row.
///
/// # Examples
///
/// ```
/// use chatdown::markdown::escape_table_cell;
///
/// assert_eq!(escape_table_cell("a | b"), "a \\| b");
/// assert_eq!(escape_table_cell("plain"), "plain");
/// ```
pub fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Length of the longest run of `c` in `content`.
fn longest_run(content: &str, c: char) -> usize {
    let mut max_run = 0;
    let mut current_run = 0;

    for ch in content.chars() {
        if ch == c {
            current_run += 1;
            max_run = max_run.max(current_run);
        } else {
            current_run = 0;
        }
    }

    max_run
}

/// Calculate the minimum fence length needed for a code block.
///
/// Returns the smallest number of fence characters (at least 3) longer than
/// any run in the content.
///
/// # Examples
///
/// ```
/// use chatdown::markdown::calculate_fence_length;
///
/// assert_eq!(calculate_fence_length("let x = 1;", '`'), 3);
/// assert_eq!(calculate_fence_length("```rust\ncode\n```", '`'), 4);
/// ```
pub fn calculate_fence_length(content: &str, fence_char: char) -> usize {
    longest_run(content, fence_char).max(2) + 1
}

/// Calculate the minimum backtick count needed for inline code.
///
/// ```
/// use chatdown::markdown::calculate_inline_code_ticks;
///
/// assert_eq!(calculate_inline_code_ticks("code"), 1);
/// assert_eq!(calculate_inline_code_ticks("code with ` backtick"), 2);
/// ```
pub fn calculate_inline_code_ticks(content: &str) -> usize {
    longest_run(content, '`') + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_table_cell() {
        assert_eq!(escape_table_cell("a|b||c"), "a\\|b\\|\\|c");
        assert_eq!(escape_table_cell("**x**"), "**x**");
    }

    #[test]
    fn test_fence_length_no_backticks() {
        assert_eq!(calculate_fence_length("print(1)", '`'), 3);
    }

    #[test]
    fn test_fence_length_with_backticks() {
        assert_eq!(calculate_fence_length("``", '`'), 3);
        assert_eq!(calculate_fence_length("```", '`'), 4);
        assert_eq!(calculate_fence_length("````", '`'), 5);
        assert_eq!(calculate_fence_length("`` and ```", '`'), 4);
    }

    #[test]
    fn test_inline_code_ticks() {
        assert_eq!(calculate_inline_code_ticks("ls -la"), 1);
        assert_eq!(calculate_inline_code_ticks("`"), 2);
        assert_eq!(calculate_inline_code_ticks("a `` b"), 3);
    }
}
