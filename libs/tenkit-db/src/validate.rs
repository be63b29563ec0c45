//! Validation of caller-supplied dynamic SQL fragments.
//!
//! Ordering clauses, projection lists and JOIN clauses arrive from the
//! service layer as strings. Before any of them reaches the query builder
//! they must pass this validator: a column/alias whitelist pattern plus a
//! keyword blacklist matched on word boundaries (so `created_at` passes
//! while `UPDATE` does not). A rejected fragment always surfaces as
//! `InvalidArgument`; nothing is silently dropped.
//!
//! Parameterized WHERE fragments are not routed through here — they bind
//! their values through the driver and are the service layer's contract.

use std::sync::LazyLock;

use regex::Regex;
use sea_orm::JoinType;
use sea_orm::Order;
use tenkit_errors::Error;

use crate::Result;

// column, table.column, or either with an " AS alias" suffix
static COLUMN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?(\s+AS\s+[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("column pattern")
});

// bare identifier (aggregate columns, table names)
static IDENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("ident pattern"));

const WORD_KEYWORDS: &[&str] = &[
    "DROP",
    "DELETE",
    "UPDATE",
    "INSERT",
    "TRUNCATE",
    "ALTER",
    "CREATE",
    "GRANT",
    "REVOKE",
    "EXEC",
    "EXECUTE",
    "UNION",
    "INTO",
    "OUTFILE",
    "LOAD_FILE",
    "DUMPFILE",
    "SLEEP",
    "BENCHMARK",
];

const SYMBOL_KEYWORDS: &[&str] = &["--", "/*", "*/", ";"];

const AGGREGATE_PREFIXES: &[&str] = &["COUNT(", "SUM(", "AVG(", "MAX(", "MIN(", "GROUP_CONCAT("];

/// One parsed ordering term.
#[derive(Debug, Clone)]
pub(crate) struct OrderSpec {
    pub column: String,
    pub direction: Order,
}

/// One parsed JOIN clause.
#[derive(Debug, Clone)]
pub(crate) struct JoinSpec {
    pub kind: JoinType,
    pub table: String,
    pub alias: Option<String>,
    pub on: String,
}

/// Validate an ordering string: `column`, `column ASC`, `table.column DESC`
/// or a comma-separated list of those. Empty input is allowed.
///
/// # Errors
/// `InvalidArgument` on blacklisted tokens, malformed columns or any
/// direction other than ASC/DESC (case-insensitive).
pub fn validate_order_by(order_by: &str) -> Result<()> {
    parse_order_by(order_by).map(|_| ())
}

pub(crate) fn parse_order_by(order_by: &str) -> Result<Vec<OrderSpec>> {
    if order_by.trim().is_empty() {
        return Ok(Vec::new());
    }

    check_keywords(order_by, "order_by")?;

    let mut specs = Vec::new();
    for part in order_by.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let fields: Vec<&str> = part.split_whitespace().collect();
        let (column, direction) = match fields.as_slice() {
            [column] => (*column, Order::Asc),
            [column, dir] if dir.eq_ignore_ascii_case("ASC") => (*column, Order::Asc),
            [column, dir] if dir.eq_ignore_ascii_case("DESC") => (*column, Order::Desc),
            [_, dir] => {
                return Err(Error::invalid_argument(format!(
                    "order_by: direction must be ASC or DESC, got {dir:?}"
                )));
            }
            _ => {
                return Err(Error::invalid_argument(format!(
                    "order_by: {part:?} must be 'column' or 'column ASC/DESC'"
                )));
            }
        };

        if column.contains('.') {
            // table.column — reuse the full pattern without the AS suffix
            if !COLUMN_PATTERN.is_match(column) {
                return Err(invalid_column("order_by", column));
            }
        } else if !IDENT_PATTERN.is_match(column) {
            return Err(invalid_column("order_by", column));
        }

        specs.push(OrderSpec {
            column: column.to_owned(),
            direction,
        });
    }

    Ok(specs)
}

/// Validate a projection list. Each entry is a column, `table.column`,
/// either with an `AS alias` suffix, or an aggregate projection such as
/// `COUNT(*) AS total`. Empty input is allowed.
///
/// # Errors
/// `InvalidArgument` on blacklisted tokens or malformed entries.
pub fn validate_select(selects: &[String]) -> Result<()> {
    for sel in selects {
        let sel = sel.trim();
        if sel.is_empty() {
            continue;
        }

        check_keywords(sel, "select")?;

        if is_aggregate_projection(sel) {
            continue;
        }

        if !COLUMN_PATTERN.is_match(sel) {
            return Err(invalid_column("select", sel));
        }
    }
    Ok(())
}

/// Validate JOIN clauses. Each clause must name a JOIN kind
/// (INNER/LEFT/RIGHT/FULL/CROSS or bare JOIN) and carry an ON condition.
///
/// # Errors
/// `InvalidArgument` on blacklisted tokens or malformed clauses.
pub fn validate_joins(joins: &[String]) -> Result<()> {
    for join in joins {
        let join = join.trim();
        if join.is_empty() {
            continue;
        }
        parse_join(join)?;
    }
    Ok(())
}

pub(crate) fn parse_join(join: &str) -> Result<JoinSpec> {
    check_keywords(join, "joins")?;

    let upper = join.to_ascii_uppercase();
    let on_pos = upper.find(" ON ").ok_or_else(|| {
        Error::invalid_argument(format!("joins: {join:?} must contain an ON clause"))
    })?;

    let head = &join[..on_pos];
    let on = join[on_pos + 4..].trim();
    if on.is_empty() {
        return Err(Error::invalid_argument(format!(
            "joins: {join:?} must contain an ON clause"
        )));
    }

    let tokens: Vec<&str> = head.split_whitespace().collect();
    let mut rest = tokens.as_slice();

    let kind = match rest.first().map(|t| t.to_ascii_uppercase()) {
        Some(k) if k == "JOIN" => {
            rest = &rest[1..];
            JoinType::Join
        }
        Some(k) => {
            let kind = match k.as_str() {
                "INNER" => JoinType::InnerJoin,
                "LEFT" => JoinType::LeftJoin,
                "RIGHT" => JoinType::RightJoin,
                "FULL" => JoinType::FullOuterJoin,
                "CROSS" => JoinType::CrossJoin,
                _ => {
                    return Err(Error::invalid_argument(format!(
                        "joins: {join:?} must use a valid JOIN type (INNER/LEFT/RIGHT/FULL/CROSS)"
                    )));
                }
            };
            rest = &rest[1..];
            // optional OUTER between the kind and JOIN
            if rest.first().is_some_and(|t| t.eq_ignore_ascii_case("OUTER")) {
                rest = &rest[1..];
            }
            if !rest.first().is_some_and(|t| t.eq_ignore_ascii_case("JOIN")) {
                return Err(Error::invalid_argument(format!(
                    "joins: {join:?} must contain the JOIN keyword"
                )));
            }
            rest = &rest[1..];
            kind
        }
        None => {
            return Err(Error::invalid_argument(format!(
                "joins: {join:?} must contain the JOIN keyword"
            )));
        }
    };

    let (table, alias) = match rest {
        [table] => (*table, None),
        [table, alias] => (*table, Some(*alias)),
        _ => {
            return Err(Error::invalid_argument(format!(
                "joins: {join:?} must name exactly one table (with an optional alias)"
            )));
        }
    };

    if !IDENT_PATTERN.is_match(table) {
        return Err(invalid_column("joins", table));
    }
    if let Some(alias) = alias {
        if !IDENT_PATTERN.is_match(alias) {
            return Err(invalid_column("joins", alias));
        }
    }

    Ok(JoinSpec {
        kind,
        table: table.to_owned(),
        alias: alias.map(str::to_owned),
        on: on.to_owned(),
    })
}

/// Validate an aggregate column name: a bare identifier, no table
/// qualifier, no dot.
///
/// # Errors
/// `InvalidArgument` when the name is empty, qualified or malformed.
pub fn validate_column(column: &str) -> Result<()> {
    if column.is_empty() {
        return Err(Error::invalid_argument("column cannot be empty"));
    }
    if column.contains('.') {
        return Err(Error::invalid_argument(
            "column must not contain table qualifier",
        ));
    }
    if !IDENT_PATTERN.is_match(column) {
        return Err(Error::invalid_argument(format!(
            "invalid column name: {column}"
        )));
    }
    Ok(())
}

/// Whether `column` is a safe bare identifier. Helper for callers that
/// assemble fragments themselves.
#[must_use]
pub fn is_safe_column_name(column: &str) -> bool {
    IDENT_PATTERN.is_match(column)
}

/// Strip every character that is not a letter, digit or underscore.
#[must_use]
pub fn sanitize_column_name(column: &str) -> String {
    column
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn invalid_column(field: &str, value: &str) -> Error {
    Error::invalid_argument(format!("{field}: invalid column {value:?}"))
}

fn check_keywords(value: &str, field: &str) -> Result<()> {
    let upper = value.to_ascii_uppercase();

    for symbol in SYMBOL_KEYWORDS {
        if upper.contains(symbol) {
            return Err(Error::invalid_argument(format!(
                "{field}: contains dangerous token {symbol:?}"
            )));
        }
    }

    for keyword in WORD_KEYWORDS {
        if contains_word(&upper, keyword) {
            return Err(Error::invalid_argument(format!(
                "{field}: contains dangerous keyword {keyword}"
            )));
        }
    }

    Ok(())
}

// Word-boundary matching over every occurrence, so `created_at` passes
// while `id, UPDATE x` does not.
fn contains_word(text: &str, keyword: &str) -> bool {
    let bytes = text.as_bytes();
    for (idx, _) in text.match_indices(keyword) {
        let before_ok = idx == 0 || !is_word_byte(bytes[idx - 1]);
        let end = idx + keyword.len();
        let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_aggregate_projection(sel: &str) -> bool {
    let upper = sel.trim().to_ascii_uppercase();
    AGGREGATE_PREFIXES.iter().any(|fn_| upper.starts_with(fn_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_by_accepts_plain_and_qualified_columns() {
        assert!(validate_order_by("").is_ok());
        assert!(validate_order_by("id").is_ok());
        assert!(validate_order_by("id ASC").is_ok());
        assert!(validate_order_by("id desc").is_ok());
        assert!(validate_order_by("users.created_at DESC").is_ok());
        assert!(validate_order_by("name ASC, created_at DESC").is_ok());
    }

    #[test]
    fn order_by_rejects_injections_and_bad_directions() {
        assert!(validate_order_by("id; DROP TABLE users").is_err());
        assert!(validate_order_by("id--").is_err());
        assert!(validate_order_by("id ASCENDING").is_err());
        assert!(validate_order_by("id ASC DESC").is_err());
        assert!(validate_order_by("id) ASC").is_err());
    }

    #[test]
    fn order_by_keywords_match_on_word_boundaries() {
        // Column names embedding a keyword are fine.
        assert!(validate_order_by("created_at ASC").is_ok());
        assert!(validate_order_by("updated_at DESC").is_ok());
        // A standalone keyword is not, even after an embedded occurrence.
        assert!(validate_order_by("updated_at, UPDATE").is_err());
    }

    #[test]
    fn order_by_parses_directions() {
        let specs = parse_order_by("name, created_at DESC").expect("specs");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].column, "name");
        assert!(matches!(specs[0].direction, Order::Asc));
        assert_eq!(specs[1].column, "created_at");
        assert!(matches!(specs[1].direction, Order::Desc));
    }

    #[test]
    fn select_accepts_columns_aliases_and_aggregates() {
        let ok = |items: &[&str]| {
            validate_select(&items.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>())
        };
        assert!(ok(&[]).is_ok());
        assert!(ok(&["id", "name"]).is_ok());
        assert!(ok(&["users.id", "users.name"]).is_ok());
        assert!(ok(&["name AS label"]).is_ok());
        assert!(ok(&["COUNT(*) AS count"]).is_ok());
        assert!(ok(&["SUM(amount)"]).is_ok());

        assert!(ok(&["id, name"]).is_err());
        assert!(ok(&["1; DELETE FROM users"]).is_err());
        assert!(ok(&["name /* hidden */"]).is_err());
    }

    #[test]
    fn joins_require_kind_and_on_clause() {
        let ok = |items: &[&str]| {
            validate_joins(&items.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>())
        };
        assert!(ok(&["LEFT JOIN orders ON orders.user_id = users.id"]).is_ok());
        assert!(ok(&["INNER JOIN profiles p ON p.user_id = users.id"]).is_ok());
        assert!(ok(&["JOIN orders ON orders.user_id = users.id"]).is_ok());
        assert!(ok(&["LEFT OUTER JOIN orders ON orders.user_id = users.id"]).is_ok());

        assert!(ok(&["orders ON orders.user_id = users.id"]).is_err());
        assert!(ok(&["LEFT JOIN orders"]).is_err());
        assert!(ok(&["LEFT JOIN orders ON "]).is_err());
        assert!(ok(&["LEFT JOIN orders ON 1=1; DROP TABLE users"]).is_err());
    }

    #[test]
    fn join_parse_extracts_table_and_alias() {
        let spec = parse_join("LEFT JOIN orders o ON o.user_id = users.id").expect("spec");
        assert_eq!(spec.table, "orders");
        assert_eq!(spec.alias.as_deref(), Some("o"));
        assert_eq!(spec.on, "o.user_id = users.id");
        assert!(matches!(spec.kind, JoinType::LeftJoin));
    }

    #[test]
    fn aggregate_column_names() {
        assert!(validate_column("amount").is_ok());
        assert!(validate_column("created_at").is_ok());
        assert!(validate_column("").is_err());
        assert!(validate_column("users.amount").is_err());
        assert!(validate_column("amount; DROP").is_err());
        assert!(validate_column("amount--").is_err());
    }

    #[test]
    fn column_helpers() {
        assert!(is_safe_column_name("total_amount"));
        assert!(!is_safe_column_name("a.b"));
        assert!(!is_safe_column_name("a b"));
        assert_eq!(sanitize_column_name("a-b;c d"), "abcd");
    }
}
