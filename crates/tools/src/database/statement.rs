//! Lightweight SQL statement classification.

const ROW_KEYWORDS: &[&str] = &["SELECT", "WITH", "PRAGMA", "EXPLAIN", "VALUES"];
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "REPLACE", "CREATE", "DROP", "ALTER", "ATTACH", "DETACH",
    "VACUUM", "REINDEX",
];
/// Pragmas that only report state, even when given an argument.
const INTROSPECTION_PRAGMAS: &[&str] = &[
    "TABLE_INFO",
    "TABLE_XINFO",
    "TABLE_LIST",
    "INDEX_LIST",
    "INDEX_INFO",
    "INDEX_XINFO",
    "FOREIGN_KEY_LIST",
    "FOREIGN_KEY_CHECK",
    "DATABASE_LIST",
    "COLLATION_LIST",
    "FUNCTION_LIST",
    "MODULE_LIST",
    "PRAGMA_LIST",
    "COMPILE_OPTIONS",
    "INTEGRITY_CHECK",
    "QUICK_CHECK",
];
/// Pragmas that change the database even without an argument.
const ACTING_PRAGMAS: &[&str] = &[
    "OPTIMIZE",
    "INCREMENTAL_VACUUM",
    "SHRINK_MEMORY",
    "WAL_CHECKPOINT",
];

fn skip_comments(statement: &str) -> &str {
    let mut rest = statement.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map(|(_, tail)| tail).unwrap_or("").trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, tail)| tail).unwrap_or("").trim_start();
        } else {
            return rest;
        }
    }
}

/// Upper-cased leading keyword, skipping whitespace, `--` and `/* */` comments.
pub fn leading_keyword(statement: &str) -> String {
    skip_comments(statement)
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase()
}

fn words(statement: &str) -> impl Iterator<Item = String> + '_ {
    statement
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_uppercase)
}

/// Whether the statement produces a result set.
pub fn returns_rows(statement: &str) -> bool {
    ROW_KEYWORDS.contains(&leading_keyword(statement).as_str())
        || words(statement).any(|w| w == "RETURNING")
}

/// Whether the statement cannot modify data or schema.
pub fn is_read_only(statement: &str) -> bool {
    match leading_keyword(statement).as_str() {
        "SELECT" | "EXPLAIN" | "VALUES" | "WITH" => {
            !words(statement).any(|w| WRITE_KEYWORDS.contains(&w.as_str()))
        }
        "PRAGMA" => pragma_is_query(statement),
        _ => false,
    }
}

/// A pragma is a query when it is read without an argument, or when it is
/// an introspection pragma. `PRAGMA name = v` and `PRAGMA name(v)` both set.
fn pragma_is_query(statement: &str) -> bool {
    if statement.contains('=') {
        return false;
    }
    let body = skip_comments(statement)["PRAGMA".len()..].trim_start();
    let head = body
        .split(|c: char| c == '(' || c == ';' || c.is_whitespace())
        .next()
        .unwrap_or("");
    let name = head.rsplit('.').next().unwrap_or(head).to_ascii_uppercase();

    if INTROSPECTION_PRAGMAS.contains(&name.as_str()) {
        return true;
    }
    !body.contains('(') && !ACTING_PRAGMAS.contains(&name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_keyword_skips_comments() {
        assert_eq!(leading_keyword("  -- note\n/* x */ select 1"), "SELECT");
        assert_eq!(leading_keyword("insert into t values (1)"), "INSERT");
        assert_eq!(leading_keyword(""), "");
    }

    #[test]
    fn classifies_row_returning_statements() {
        assert!(returns_rows("SELECT * FROM t"));
        assert!(returns_rows("with x as (select 1) select * from x"));
        assert!(returns_rows("PRAGMA table_info(t)"));
        assert!(returns_rows("INSERT INTO t VALUES (1) RETURNING id"));
        assert!(!returns_rows("CREATE TABLE t(id)"));
        assert!(!returns_rows("UPDATE t SET returning_flag = 1"));
    }

    #[test]
    fn classifies_read_only_statements() {
        assert!(is_read_only("SELECT * FROM t"));
        assert!(is_read_only("PRAGMA table_info(t)"));
        assert!(!is_read_only("PRAGMA journal_mode = WAL"));
        assert!(!is_read_only("WITH x AS (SELECT 1) DELETE FROM t"));
        assert!(!is_read_only("DROP TABLE t"));
        assert!(!is_read_only("INSERT INTO t VALUES (1)"));
    }

    #[test]
    fn pragma_with_argument_is_a_write_unless_introspection() {
        assert!(!is_read_only("PRAGMA user_version(5)"));
        assert!(!is_read_only("pragma journal_mode(DELETE)"));
        assert!(!is_read_only("PRAGMA main.writable_schema(1)"));
        assert!(!is_read_only("PRAGMA optimize"));
        assert!(is_read_only("PRAGMA user_version"));
        assert!(is_read_only("PRAGMA journal_mode;"));
        assert!(is_read_only("PRAGMA main.index_list(t)"));
        assert!(is_read_only("/* look */ PRAGMA foreign_key_list(t)"));
    }
}
