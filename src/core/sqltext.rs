//! SQL script splitting for Import and Execute.
//!
//! Splits a multi-statement script on semicolons while respecting quoted
//! strings, quoted identifiers, and comments.

/// Split a SQL script into individual statements.
///
/// Semicolons inside single/double/backtick quotes, `--` line comments, and
/// `/* */` block comments do not terminate a statement. Fragments that trim
/// to nothing are dropped.
pub fn split_sql_statements(content: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    let mut chars = content.chars().peekable();
    let mut quote: Option<char> = None;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(c) = chars.next() {
        if in_line_comment {
            current.push(c);
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }
        if in_block_comment {
            current.push(c);
            if c == '*' && chars.peek() == Some(&'/') {
                current.push(chars.next().expect("peeked"));
                in_block_comment = false;
            }
            continue;
        }
        if let Some(q) = quote {
            current.push(c);
            if c == '\\' && q != '`' {
                // Escaped character inside a string; consume it verbatim.
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                in_line_comment = true;
                current.push(c);
                current.push(chars.next().expect("peeked"));
            }
            '/' if chars.peek() == Some(&'*') => {
                in_block_comment = true;
                current.push(c);
                current.push(chars.next().expect("peeked"));
            }
            ';' => {
                push_statement(&mut statements, &mut current);
            }
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &mut current);

    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() && !is_comment_only(trimmed) {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

/// Whether a fragment contains only comments and whitespace.
fn is_comment_only(fragment: &str) -> bool {
    let mut rest = fragment.trim_start();
    loop {
        if rest.is_empty() {
            return true;
        }
        if let Some(stripped) = rest.strip_prefix("--") {
            match stripped.find('\n') {
                Some(pos) => rest = stripped[pos + 1..].trim_start(),
                None => return true,
            }
        } else if let Some(stripped) = rest.strip_prefix("/*") {
            match stripped.find("*/") {
                Some(pos) => rest = stripped[pos + 2..].trim_start(),
                None => return true,
            }
        } else {
            return false;
        }
    }
}

/// Whether a statement is a row-returning query.
pub fn is_query_statement(sql: &str) -> bool {
    let first_word = sql
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(first_word.as_str(), "select" | "show" | "explain" | "with" | "describe" | "desc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let statements = split_sql_statements("SELECT 1; SELECT 2;");
        assert_eq!(statements, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_respects_quoted_semicolons() {
        let statements =
            split_sql_statements("INSERT INTO t (a) VALUES ('x;y'); UPDATE t SET a = \"a;b\";");
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("'x;y'"));
        assert!(statements[1].contains("\"a;b\""));
    }

    #[test]
    fn test_split_respects_comments() {
        let script = "SELECT 1 -- trailing; comment\n; /* block; comment */ SELECT 2;";
        let statements = split_sql_statements(script);
        assert_eq!(statements.len(), 2);
        assert!(statements[1].starts_with("/* block; comment */"));
    }

    #[test]
    fn test_split_drops_empty_and_comment_only() {
        let statements = split_sql_statements("; ;\n-- only a comment\n; SELECT 1");
        assert_eq!(statements, vec!["SELECT 1"]);
    }

    #[test]
    fn test_split_escaped_quote() {
        let statements = split_sql_statements(r"INSERT INTO t VALUES ('a\'b;c');");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_is_query_statement() {
        assert!(is_query_statement("SELECT * FROM t"));
        assert!(is_query_statement("  with x as (select 1) select * from x"));
        assert!(!is_query_statement("INSERT INTO t VALUES (1)"));
        assert!(!is_query_statement("DROP TABLE t"));
    }
}
