mod accounts;
mod chats;
mod locations;
mod notifications;
mod products;
mod stores;

pub use locations::LocationCheck;

use anyhow::Result;
use rusqlite::types::Value;

/// WHERE-clause builder for the listing queries. Every condition binds its
/// values positionally, so user input never reaches the SQL text.
#[derive(Default)]
pub(crate) struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    /// Add a condition; `?` placeholders in `sql` are bound to `values` in order.
    pub fn push(&mut self, sql: &str, values: impl IntoIterator<Item = Value>) {
        self.clauses.push(sql.to_string());
        self.params.extend(values);
    }

    /// Case-insensitive substring match over any of `columns`.
    pub fn search(&mut self, columns: &[&str], term: &str) {
        let pattern = format!("%{}%", escape_like(term));
        let sql = columns
            .iter()
            .map(|c| format!("{} LIKE ? ESCAPE '\\'", c))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.push(
            &format!("({})", sql),
            columns.iter().map(|_| Value::Text(pattern.clone())),
        );
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Params plus trailing LIMIT/OFFSET values.
    pub fn params_with_page(&self, limit: u32, offset: u32) -> Vec<Value> {
        let mut params = self.params.clone();
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));
        params
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Blank search terms mean "no search".
pub(crate) fn search_term(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn empty_filter_has_no_where() {
        let f = Filter::default();
        assert_eq!(f.where_sql(), "");
        assert_eq!(f.params_with_page(12, 24).len(), 2);
    }

    #[test]
    fn search_binds_once_per_column() {
        let mut f = Filter::default();
        f.search(&["p.title", "p.description"], "maize");
        assert_eq!(
            f.where_sql(),
            "WHERE (p.title LIKE ? ESCAPE '\\' OR p.description LIKE ? ESCAPE '\\')"
        );
        assert_eq!(f.params().len(), 2);
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_term(Some("  ")), None);
        assert_eq!(search_term(Some(" milk ")), Some("milk"));
    }
}
