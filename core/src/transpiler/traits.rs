//! Identifier helpers shared by the statement compilers.

use std::sync::LazyLock;

use regex::Regex;

/// Positional placeholder bound to one parameter.
pub const PLACEHOLDER: &str = "?";

/// The all-columns wildcard.
pub const WILDCARD: &str = "*";

/// SQL reserved words that must be quoted when used as identifiers.
pub const RESERVED_WORDS: &[&str] = &[
    "all", "alter", "and", "as", "asc", "between", "by", "case", "check", "column", "constraint",
    "create", "default", "delete", "desc", "distinct", "drop", "else", "end", "exists", "false",
    "foreign", "from", "group", "having", "in", "index", "inner", "insert", "into", "is", "join",
    "key", "left", "like", "limit", "not", "null", "offset", "on", "or", "order", "outer",
    "primary", "references", "right", "select", "set", "table", "then", "transaction", "true",
    "union", "update", "user", "values", "when", "where",
];

static NAME_COLUMN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// True for a plain column name, false for expressions, literals and `*`.
pub fn is_name_column(column: &str) -> bool {
    match NAME_COLUMN.as_ref() {
        Some(re) => re.is_match(column),
        None => false,
    }
}

/// Escape an identifier if it's a reserved word or contains special chars.
/// Dotted identifiers (`alias.column`) are escaped part by part.
pub fn escape_identifier(name: &str) -> String {
    if name.contains('.') {
        return name
            .split('.')
            .map(escape_single_identifier)
            .collect::<Vec<_>>()
            .join(".");
    }
    escape_single_identifier(name)
}

fn escape_single_identifier(name: &str) -> String {
    if name == WILDCARD {
        return name.to_string();
    }
    let lower = name.to_lowercase();
    if RESERVED_WORDS.contains(&lower.as_str()) || !is_name_column(name) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

/// Prefix a plain column with the table alias; other expressions pass through.
pub fn qualify(alias: Option<&str>, column: &str) -> String {
    match alias {
        Some(alias) if !alias.is_empty() && (is_name_column(column) || column == WILDCARD) => {
            format!("{}.{}", escape_identifier(alias), escape_identifier(column))
        }
        _ if is_name_column(column) => escape_identifier(column),
        _ => column.to_string(),
    }
}

/// `?, ?, ?` for `count` parameters.
pub fn placeholders(count: usize) -> String {
    vec![PLACEHOLDER; count].join(", ")
}
