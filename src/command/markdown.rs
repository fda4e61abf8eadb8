// ABOUTME: Markdown helpers for assistant replies.
// ABOUTME: Pulls fenced SQL blocks out of chat responses.

use once_cell::sync::Lazy;
use regex::Regex;

static SQL_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```sql[ \t]*\r?\n(.*?)```").expect("valid SQL block pattern"));

/// Contents of every fenced ```` ```sql ```` block, in order of appearance.
pub fn extract_markdown_sql(markdown: &str) -> Vec<String> {
    SQL_BLOCK
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(1))
        .map(|body| body.as_str().trim().to_string())
        .filter(|sql| !sql.is_empty())
        .collect()
}
