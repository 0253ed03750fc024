//! Canonical statements for one entity descriptor.
//!
//! All text is built once when a repository is created. Every data value is a
//! positional `?` argument; caller-supplied fragments are concatenated as-is.

use crate::descriptor::EntityDescriptor;
use crate::query::placeholders;

/// Keywords that may open a criteria fragment without an implied `WHERE`
const CLAUSE_PREFIXES: &[&[&str]] = &[
    &["WHERE"],
    &["ORDER", "BY"],
    &["GROUP", "BY"],
    &["LIMIT"],
    &["OFFSET"],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statements {
    pub select_all: String,
    pub select_by_id: String,
    pub insert: String,
    pub insert_generated_key: String,
    pub update: Option<String>,
    pub delete: String,
}

impl Statements {
    pub fn synthesize(desc: &EntityDescriptor) -> Self {
        let table = desc.table();
        let pk = desc.primary_key().name;
        let select_all = select_prefix(desc);

        let all: Vec<&str> = desc.columns().iter().map(|c| c.name).collect();
        let without_key: Vec<&str> = desc.non_key_columns().map(|c| c.name).collect();

        let update = if without_key.is_empty() {
            None
        } else {
            let assignments = without_key
                .iter()
                .map(|c| format!("{} = ?", c))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("UPDATE {} SET {} WHERE {} = ?", table, assignments, pk))
        };

        Self {
            select_by_id: format!("{} WHERE {} = ?", select_all, pk),
            insert: insert_into(table, &all),
            insert_generated_key: insert_into(table, &without_key),
            update,
            delete: format!("DELETE FROM {} WHERE {} = ?", table, pk),
            select_all,
        }
    }

    /// Select-all base followed by a caller predicate
    pub fn criteria(&self, fragment: &str) -> String {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            self.select_all.clone()
        } else {
            format!("{} {}", self.select_all, normalize_predicate(fragment))
        }
    }
}

/// `a, b, c`, or `*` for a column-less descriptor
pub fn projection(desc: &EntityDescriptor) -> String {
    if desc.columns().is_empty() {
        return "*".to_string();
    }
    desc.columns()
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT <columns> FROM <table>`
pub fn select_prefix(desc: &EntityDescriptor) -> String {
    format!("SELECT {} FROM {}", projection(desc), desc.table())
}

/// Prefix a bare boolean expression with `WHERE`
pub fn normalize_predicate(fragment: &str) -> String {
    let fragment = fragment.trim();
    if CLAUSE_PREFIXES
        .iter()
        .any(|words| starts_with_keywords(fragment, words))
    {
        fragment.to_string()
    } else {
        format!("WHERE {}", fragment)
    }
}

/// Case-insensitive keyword match that does not accept `WHEREVER` for `WHERE`
pub(crate) fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    let text = text.trim_start();
    if text.len() < keyword.len() || !text.is_char_boundary(keyword.len()) {
        return false;
    }
    let (head, rest) = text.split_at(keyword.len());
    head.eq_ignore_ascii_case(keyword)
        && rest
            .chars()
            .next()
            .map_or(true, |c| c.is_whitespace() || c == '(')
}

/// Keyword sequence match; the words may be separated by any whitespace
fn starts_with_keywords(text: &str, words: &[&str]) -> bool {
    let mut rest = text;
    for word in words {
        rest = rest.trim_start();
        if !starts_with_keyword(rest, word) {
            return false;
        }
        rest = &rest[word.len()..];
    }
    true
}

fn insert_into(table: &str, columns: &[&str]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", table);
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders(columns.len())
    )
}
