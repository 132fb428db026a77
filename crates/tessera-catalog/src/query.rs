//! # Minimal Query Parsing
//!
//! The catalog query contract is a parametric string of the form
//!
//! ```text
//! SELECT COL_A, COL_B WHERE COL_C = 'v' AND COL_D <= 1700000000
//! ```
//!
//! over the fixed catalog schema. This module parses that shape and
//! evaluates individual conditions; it is deliberately not a
//! general-purpose query language. Comparisons are numeric when both
//! sides parse as integers, lexicographic otherwise. `LIKE` supports `%`
//! wildcards.

use crate::error::CatalogError;

/// A comparison operator in a `WHERE` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// SQL `LIKE` with `%` wildcards.
    Like,
}

/// One `WHERE` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// The schema column, uppercased.
    pub column: String,
    /// The comparison operator.
    pub op: Op,
    /// The literal to compare against.
    pub value: String,
}

/// A parsed `SELECT ... WHERE ...` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Projected columns, uppercased, in declaration order.
    pub columns: Vec<String>,
    /// Conjunctive conditions; empty when no `WHERE` clause is present.
    pub conditions: Vec<Condition>,
}

impl ParsedQuery {
    /// Whether the query references a column, in projection or conditions.
    pub fn references(&self, prefix: &str) -> bool {
        self.columns.iter().any(|c| c.starts_with(prefix))
            || self.conditions.iter().any(|c| c.column.starts_with(prefix))
    }
}

/// Parse a catalog query string.
pub fn parse(query: &str) -> Result<ParsedQuery, CatalogError> {
    let trimmed = query.trim();
    let rest = strip_keyword(trimmed, "SELECT")
        .ok_or_else(|| CatalogError::Query(format!("expected SELECT: [{trimmed}]")))?;

    let (column_part, where_part) = match split_keyword(rest, "WHERE") {
        Some((cols, conds)) => (cols, Some(conds)),
        None => (rest, None),
    };

    let columns: Vec<String> = column_part
        .split(',')
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
        .collect();
    if columns.is_empty() {
        return Err(CatalogError::Query("no columns selected".to_string()));
    }

    let mut conditions = Vec::new();
    if let Some(where_part) = where_part {
        for clause in split_top_level_and(where_part) {
            conditions.push(parse_condition(&clause)?);
        }
    }

    Ok(ParsedQuery {
        columns,
        conditions,
    })
}

/// Evaluate one condition against an actual column value.
pub fn condition_holds(cond: &Condition, actual: &str) -> bool {
    if cond.op == Op::Like {
        return like_match(&cond.value, actual);
    }
    let ordering = match (actual.parse::<i64>(), cond.value.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => actual.cmp(cond.value.as_str()),
    };
    match cond.op {
        Op::Eq => ordering.is_eq(),
        Op::Ne => !ordering.is_eq(),
        Op::Lt => ordering.is_lt(),
        Op::Le => ordering.is_le(),
        Op::Gt => ordering.is_gt(),
        Op::Ge => ordering.is_ge(),
        Op::Like => unreachable!("handled above"),
    }
}

/// `%`-wildcard matching for `LIKE` conditions.
pub fn like_match(pattern: &str, text: &str) -> bool {
    let segments: Vec<&str> = pattern.split('%').collect();
    if segments.len() == 1 {
        return pattern == text;
    }

    let mut remainder = text;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            match remainder.strip_prefix(segment) {
                Some(rest) => remainder = rest,
                None => return false,
            }
        } else if i == segments.len() - 1 {
            return remainder.ends_with(segment);
        } else {
            match remainder.find(segment) {
                Some(pos) => remainder = &remainder[pos + segment.len()..],
                None => return false,
            }
        }
    }
    true
}

fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        Some(s[keyword.len()..].trim_start())
    } else {
        None
    }
}

/// Split `s` at the first top-level (unquoted) occurrence of a keyword.
fn split_keyword<'a>(s: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let upper = s.to_ascii_uppercase();
    let needle = format!(" {keyword} ");
    let mut in_quote = false;
    for (i, ch) in upper.char_indices() {
        if ch == '\'' {
            in_quote = !in_quote;
        }
        if !in_quote && upper[i..].starts_with(&needle) {
            return Some((s[..i].trim(), s[i + needle.len()..].trim()));
        }
    }
    None
}

/// Split a `WHERE` body on top-level `AND`, respecting quoted literals.
fn split_top_level_and(s: &str) -> Vec<String> {
    let upper = s.to_ascii_uppercase();
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0usize;
    let mut i = 0usize;
    let bytes = upper.as_bytes();
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            in_quote = !in_quote;
        }
        if !in_quote && upper[i..].starts_with(" AND ") {
            parts.push(s[start..i].trim().to_string());
            i += " AND ".len();
            start = i;
            continue;
        }
        i += 1;
    }
    parts.push(s[start..].trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

fn parse_condition(clause: &str) -> Result<Condition, CatalogError> {
    // Two-character operators first so `<=` is not read as `<`.
    const OPS: [(&str, Op); 7] = [
        ("<=", Op::Le),
        (">=", Op::Ge),
        ("!=", Op::Ne),
        ("=", Op::Eq),
        ("<", Op::Lt),
        (">", Op::Gt),
        (" LIKE ", Op::Like),
    ];

    let upper = clause.to_ascii_uppercase();
    for (symbol, op) in OPS {
        let pos = if symbol == " LIKE " {
            upper.find(symbol)
        } else {
            find_unquoted(clause, symbol)
        };
        if let Some(pos) = pos {
            let column = clause[..pos].trim().to_ascii_uppercase();
            let raw = clause[pos + symbol.len()..].trim();
            if column.is_empty() {
                break;
            }
            let value = strip_quotes(raw)
                .ok_or_else(|| CatalogError::Query(format!("unquoted literal in [{clause}]")))?;
            return Ok(Condition {
                column,
                op,
                value,
            });
        }
    }

    Err(CatalogError::Query(format!(
        "unparseable condition: [{clause}]"
    )))
}

fn find_unquoted(s: &str, needle: &str) -> Option<usize> {
    let mut in_quote = false;
    for (i, ch) in s.char_indices() {
        if ch == '\'' {
            in_quote = !in_quote;
        }
        if !in_quote && s[i..].starts_with(needle) {
            return Some(i);
        }
    }
    None
}

fn strip_quotes(raw: &str) -> Option<String> {
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Some(raw[1..raw.len() - 1].to_string());
    }
    // Bare integer literals are accepted.
    raw.parse::<i64>().ok().map(|_| raw.to_string())
}
