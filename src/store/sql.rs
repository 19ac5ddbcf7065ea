//! Small SQL assembly helpers.
//!
//! Statements are built as text plus a positional parameter list, so every
//! caller-supplied value is bound and never interpolated.

use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};

/// Incrementally built statement with anonymous `?` placeholders bound in
/// textual order. Listings push their select list through it.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    sql: String,
    params: Vec<Value>,
    has_where: bool,
}

impl SqlBuilder {
    pub(crate) fn new(init: impl Into<String>) -> Self {
        Self {
            sql: init.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.sql.push('?');
        self.params.push(value.into());
        self
    }

    /// Pushes a fragment containing exactly one `?`, binding `value` there.
    pub fn push_template(&mut self, template: &str, value: Value) -> &mut Self {
        match template.split_once('?') {
            Some((head, tail)) => {
                self.push(head);
                self.push_bind(value);
                self.push(tail)
            }
            None => self.push(template),
        }
    }

    /// Starts the next predicate, opening the `WHERE` clause on first use.
    pub fn and_where(&mut self) -> &mut Self {
        if self.has_where {
            self.push(" AND ")
        } else {
            self.has_where = true;
            self.push(" WHERE ")
        }
    }

    #[cfg(test)]
    pub(crate) fn sql(&self) -> &str {
        &self.sql
    }

    #[cfg(test)]
    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }

    pub(crate) fn query_map<T, F>(&self, conn: &Connection, mut f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = conn.prepare(&self.sql)?;
        let mut rows = stmt.query(params_from_iter(self.params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(f(row)?);
        }
        Ok(out)
    }

    pub(crate) fn query_scalar(&self, conn: &Connection) -> rusqlite::Result<i64> {
        conn.query_row(&self.sql, params_from_iter(self.params.iter()), |row| {
            row.get(0)
        })
    }

    pub(crate) fn execute(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(&self.sql, params_from_iter(self.params.iter()))
    }
}

/// Equality predicates over the columns of one collection. A `NULL` value
/// matches rows where the column is absent.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    predicates: Vec<(&'static str, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.predicates.push((column, value.into()));
        self
    }

    pub(crate) fn apply(&self, qb: &mut SqlBuilder) {
        for (column, value) in &self.predicates {
            qb.and_where().push(column);
            match value {
                Value::Null => {
                    qb.push(" IS NULL");
                }
                other => {
                    qb.push(" = ").push_bind(other.clone());
                }
            }
        }
    }
}

/// Column assignments for an update-by-id.
#[derive(Debug, Clone, Default)]
pub struct Changes {
    assignments: Vec<(&'static str, Value)>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub(crate) fn apply(&self, qb: &mut SqlBuilder) {
        for (index, (column, value)) in self.assignments.iter().enumerate() {
            if index > 0 {
                qb.push(", ");
            }
            qb.push(column).push(" = ").push_bind(value.clone());
        }
    }
}
