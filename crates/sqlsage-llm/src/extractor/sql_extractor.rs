//! Best-effort recovery of the executed SQL from an agent trace
//!
//! Used for display only. The agent reports executed statements structurally
//! through [`AgentOutput::executed_sql`](crate::agent::AgentOutput::executed_sql);
//! this scraper is the fallback for traces that only carry free text.

use crate::agent::{AgentAction, AgentStep};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Sentinel shown when no SQL could be recovered
pub const SQL_NOT_FOUND: &str = "SQL query not found";

/// Text matches must be longer than this to count
const MIN_TEXT_MATCH_LEN: usize = 10;

/// Ordered text rules: JSON/dict-like `"query": "..."`, bare statement,
/// `Action Input:` prefix, `tool_input` prefix
const TEXT_RULES: [&str; 4] = [
    r#"["']query["']\s*:\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#,
    r"(?i)\b((?:SELECT|INSERT|UPDATE|DELETE|WITH)\b[^;`\n]*)",
    r#"(?im)Action Input:\s*["'`]?\s*((?:SELECT|INSERT|UPDATE|DELETE|WITH)\b[^\n]*)"#,
    r#"(?im)tool_input["']?\s*[:=]\s*["'`]?\s*((?:SELECT|INSERT|UPDATE|DELETE|WITH)\b[^\n]*)"#,
];

fn text_rules() -> &'static [Regex] {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        TEXT_RULES
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!("Invalid SQL extraction pattern {}: {}", pattern, e);
                    None
                }
            })
            .collect()
    })
}

/// Extract the SQL statement executed during an agent run
///
/// For each step in order: a structured `query` field in the tool input wins,
/// then the action's log text, then its full string form. Within one text the
/// rules are tried in order and the first match longer than 10 characters is
/// taken. Returns `None` instead of failing when nothing SQL-shaped is found.
pub fn extract_sql(steps: &[AgentStep]) -> Option<String> {
    for step in steps {
        let action = &step.action;

        if let Some(query) = structured_query(&action.tool_input) {
            let cleaned = clean_sql(&query);
            if !cleaned.is_empty() {
                return Some(finish(cleaned));
            }
        }

        if let Some(sql) = search_text(&action.log) {
            return Some(finish(sql));
        }

        if let Some(sql) = search_text(&action_text(action)) {
            return Some(finish(sql));
        }
    }

    None
}

/// Extract the SQL or fall back to [`SQL_NOT_FOUND`]
pub fn extract_sql_or_sentinel(steps: &[AgentStep]) -> String {
    extract_sql(steps).unwrap_or_else(|| SQL_NOT_FOUND.to_string())
}

fn structured_query(input: &Value) -> Option<String> {
    match input {
        Value::Object(map) => map.get("query").and_then(Value::as_str).map(str::to_string),
        // Some models double-encode the arguments object
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_object)
            .and_then(|v| structured_query(&v)),
        _ => None,
    }
}

/// String form of an action: tool, raw input and log, one per line
fn action_text(action: &AgentAction) -> String {
    let input = match &action.tool_input {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    format!(
        "tool={}\ntool_input={}\nlog={}",
        action.tool,
        input,
        action.log.replace('\n', " ")
    )
}

fn search_text(text: &str) -> Option<String> {
    for (index, rule) in text_rules().iter().enumerate() {
        for caps in rule.captures_iter(text) {
            let Some(raw) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };

            let candidate = if index == 0 {
                decode_quoted(raw.as_str(), caps.get(1).is_some())
            } else {
                raw.as_str().to_string()
            };

            let cleaned = clean_sql(&candidate);
            if cleaned.chars().count() <= MIN_TEXT_MATCH_LEN {
                continue;
            }
            if index > 0 && !looks_like_sql(&cleaned) {
                continue;
            }
            return Some(cleaned);
        }
    }
    None
}

fn decode_quoted(raw: &str, double_quoted: bool) -> String {
    if double_quoted {
        serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
    } else {
        raw.replace("\\'", "'")
            .replace("\\n", "\n")
            .replace("\\\\", "\\")
    }
}

/// Reject prose that merely starts with a SQL keyword ("select the cheapest")
fn looks_like_sql(sql: &str) -> bool {
    let upper = sql.to_uppercase();
    let has_word = |word: &str| upper.split(|c: char| !c.is_alphanumeric() && c != '_').any(|w| w == word);

    if upper.starts_with("SELECT") {
        let rest = upper["SELECT".len()..].trim_start();
        has_word("FROM")
            || rest
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_digit() || "'\"(*".contains(c))
    } else if upper.starts_with("WITH") {
        has_word("AS") && has_word("SELECT")
    } else if upper.starts_with("INSERT") {
        has_word("INTO")
    } else if upper.starts_with("UPDATE") {
        has_word("SET")
    } else if upper.starts_with("DELETE") {
        has_word("FROM")
    } else {
        false
    }
}

const QUOTES: [char; 3] = ['"', '\'', '`'];

/// Strip a wrapping quote pair, or a lone unmatched quote at either end
fn trim_quotes(mut s: &str) -> &str {
    loop {
        let before = s.len();
        s = s.trim();
        for q in QUOTES {
            let count = s.matches(q).count();
            if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
                s = &s[1..s.len() - 1];
            } else if s.ends_with(q) && count % 2 == 1 {
                s = &s[..s.len() - 1];
            } else if s.starts_with(q) && count % 2 == 1 {
                s = &s[1..];
            }
        }
        if s.len() == before {
            return s;
        }
    }
}

/// Whether the first opening bracket closes at the very last character
fn is_wrapped(s: &str, open: char, close: char) -> bool {
    if !(s.starts_with(open) && s.ends_with(close)) {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return i + c.len_utf8() == s.len();
            }
        }
    }
    false
}

/// Trim whitespace, quotes and unbalanced or wrapping brackets
fn clean_sql(raw: &str) -> String {
    let mut s = trim_quotes(raw);

    loop {
        let before = s.len();

        for (open, close) in [('(', ')'), ('[', ']'), ('{', '}')] {
            let opens = s.matches(open).count();
            let closes = s.matches(close).count();
            if is_wrapped(s, open, close) {
                s = &s[1..s.len() - 1];
            } else if s.ends_with(close) && closes > opens {
                s = &s[..s.len() - 1];
            } else if s.starts_with(open) && opens > closes {
                s = &s[1..];
            }
        }

        s = trim_quotes(s);
        if s.len() == before {
            break;
        }
    }

    s.to_string()
}

fn finish(sql: String) -> String {
    if sql.ends_with(';') {
        sql
    } else {
        format!("{};", sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentAction;
    use serde_json::json;

    fn step(tool_input: Value, log: &str) -> AgentStep {
        AgentStep::new(AgentAction::new("sql_db_query", tool_input, log), "[]")
    }

    #[test]
    fn test_structured_query() {
        let steps = vec![step(json!({"query": "SELECT 1"}), "")];
        assert_eq!(extract_sql(&steps).as_deref(), Some("SELECT 1;"));
    }

    #[test]
    fn test_action_input_log() {
        let steps = vec![step(
            json!({}),
            r#"Action Input: "SELECT * FROM zepto.products""#,
        )];
        assert_eq!(
            extract_sql(&steps).as_deref(),
            Some("SELECT * FROM zepto.products;")
        );
    }

    #[test]
    fn test_no_sql_anywhere() {
        let steps = vec![
            step(json!({}), "Invoking: `sql_db_list_tables` with `{}`"),
            step(json!({"table_names": "products"}), "I should select the cheapest one"),
        ];
        assert_eq!(extract_sql(&steps), None);
        assert_eq!(extract_sql_or_sentinel(&steps), SQL_NOT_FOUND);
    }

    #[test]
    fn test_empty_trace() {
        assert_eq!(extract_sql(&[]), None);
    }

    #[test]
    fn test_json_like_query_in_log_with_escapes() {
        let steps = vec![step(
            json!("not an object"),
            r#"Invoking: `sql_db_query` with `{"query": "SELECT name FROM blinkit.products WHERE brand = \"Amul\""}`"#,
        )];
        assert_eq!(
            extract_sql(&steps).as_deref(),
            Some(r#"SELECT name FROM blinkit.products WHERE brand = "Amul";"#)
        );
    }

    #[test]
    fn test_python_dict_style_query() {
        let steps = vec![step(
            Value::Null,
            "Invoking: `sql_db_query` with `{'query': 'SELECT COUNT(*) FROM instamart.orders'}`",
        )];
        assert_eq!(
            extract_sql(&steps).as_deref(),
            Some("SELECT COUNT(*) FROM instamart.orders;")
        );
    }

    #[test]
    fn test_structured_beats_log() {
        let steps = vec![step(
            json!({"query": "SELECT id FROM zepto.products"}),
            "Action Input: SELECT name FROM blinkit.products",
        )];
        assert_eq!(
            extract_sql(&steps).as_deref(),
            Some("SELECT id FROM zepto.products;")
        );
    }

    #[test]
    fn test_first_step_wins() {
        let steps = vec![
            step(json!({}), "nothing here"),
            step(json!({"query": "SELECT price FROM zepto.products"}), ""),
            step(json!({"query": "SELECT 2"}), ""),
        ];
        assert_eq!(
            extract_sql(&steps).as_deref(),
            Some("SELECT price FROM zepto.products;")
        );
    }

    #[test]
    fn test_full_string_form_for_raw_string_input() {
        let steps = vec![step(
            json!("SELECT AVG(price) FROM blinkit.products"),
            "",
        )];
        assert_eq!(
            extract_sql(&steps).as_deref(),
            Some("SELECT AVG(price) FROM blinkit.products;")
        );
    }

    #[test]
    fn test_double_encoded_arguments() {
        let steps = vec![step(json!(r#"{"query": "SELECT 42"}"#), "")];
        assert_eq!(extract_sql(&steps).as_deref(), Some("SELECT 42;"));
    }

    #[test]
    fn test_existing_semicolon_kept() {
        let steps = vec![step(json!({"query": "  SELECT 1;  "}), "")];
        assert_eq!(extract_sql(&steps).as_deref(), Some("SELECT 1;"));
    }

    #[test]
    fn test_short_text_match_is_ignored() {
        // "SELECT 1" in free text is too short to trust
        let steps = vec![step(json!({}), "Action Input: SELECT 1")];
        assert_eq!(extract_sql(&steps), None);
    }

    #[test]
    fn test_clean_sql_balances_brackets() {
        assert_eq!(clean_sql("[\"SELECT MAX(price) FROM t\"]"), "SELECT MAX(price) FROM t");
        assert_eq!(clean_sql("SELECT MAX(price) FROM t"), "SELECT MAX(price) FROM t");
        assert_eq!(clean_sql("(SELECT 1 FROM t"), "SELECT 1 FROM t");
        assert_eq!(clean_sql("  `SELECT * FROM t`  "), "SELECT * FROM t");
    }

    #[test]
    fn test_looks_like_sql() {
        assert!(looks_like_sql("SELECT * FROM zepto.products"));
        assert!(looks_like_sql("SELECT 1 + 1"));
        assert!(looks_like_sql("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(looks_like_sql("UPDATE t SET a = 1"));
        assert!(!looks_like_sql("select the cheapest product"));
        assert!(!looks_like_sql("delete nothing please"));
    }
}
