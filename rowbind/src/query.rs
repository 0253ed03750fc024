use sea_orm::{DbBackend, Statement, Value};

/// SQL text with `?` placeholders plus its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub sql: String,
    pub args: Vec<Value>,
}

impl QueryPlan {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    pub fn bare(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Render for a backend: PostgreSQL gets `$1..$n`, everything else keeps `?`
    pub fn to_statement(&self, backend: DbBackend) -> Statement {
        let sql = match backend {
            DbBackend::Postgres => numbered_placeholders(&self.sql),
            _ => self.sql.clone(),
        };
        Statement::from_sql_and_values(backend, sql.as_str(), self.args.clone())
    }
}

/// Rewrite `?` to `$n`, leaving quoted literals and identifiers untouched
pub fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0usize;
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                }
                _ => out.push(c),
            },
        }
    }
    out
}

/// Comma separated `?` list
pub fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 3);
    for i in 0..n {
        if i > 0 {
            s.push_str(", ");
        }
        s.push('?');
    }
    s
}
