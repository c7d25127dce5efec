//! Splitting of script text into `GO`-separated batches.

/// A SQL batch with its content and source location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    pub content: &'a str,
    /// 1-based line number of the first line of `content`
    pub start_line: usize,
}

/// Split SQL content into batches by GO statement, tracking line numbers
pub fn split_batches(content: &str) -> Vec<Batch<'_>> {
    // Estimate ~1 batch per 20 lines (GO separators are relatively sparse)
    let line_count = content.lines().count();
    let estimated_batches = (line_count / 20).max(1);
    let mut batches = Vec::with_capacity(estimated_batches);
    let mut current_pos = 0;
    let mut batch_start = 0;
    let mut current_line = 1;
    let mut batch_start_line = 1;

    for line in content.lines() {
        let trimmed = line.trim();
        // Actual line length in the original content, including the line ending
        let line_end = current_pos + line.len();
        let next_pos = if content[line_end..].starts_with("\r\n") {
            line_end + 2
        } else if content[line_end..].starts_with('\n') {
            line_end + 1
        } else {
            line_end
        };

        // GO must be on its own line, optionally followed by a semicolon
        if trimmed.eq_ignore_ascii_case("go") || trimmed.eq_ignore_ascii_case("go;") {
            if current_pos > batch_start {
                batches.push(Batch {
                    content: &content[batch_start..current_pos],
                    start_line: batch_start_line,
                });
            }
            batch_start = next_pos;
            batch_start_line = current_line + 1;
        }

        current_pos = next_pos;
        current_line += 1;
    }

    if batch_start < content.len() {
        batches.push(Batch {
            content: &content[batch_start..],
            start_line: batch_start_line,
        });
    }

    batches
}
