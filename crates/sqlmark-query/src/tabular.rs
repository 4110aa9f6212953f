//! Tabular: the result-set value the query capability returns, and the
//! operations QA.Diff needs over it.

use rusqlite::types::Value;

use crate::error::{QueryError, Result};

/// An in-memory result set: ordered column names and row-major cell data.
#[derive(Debug, Clone, Default)]
pub struct Tabular {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(f) => Some(*f),
        _ => None,
    }
}

impl Tabular {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn col_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns a copy with every column name lower-cased.
    pub fn lower_columns(&self) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.to_lowercase()).collect(),
            rows: self.rows.clone(),
        }
    }

    /// Drops `cols` (by name), preserving remaining column order.
    pub fn drop_columns(&self, cols: &[String]) -> Self {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !cols.iter().any(|d| d == *c))
            .map(|(i, _)| i)
            .collect();
        let columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Self { columns, rows }
    }

    /// Groups rows by the distinct values of `col`, preserving first-seen
    /// order of both the groups and the rows within each group.
    pub fn partition_by(&self, col: &str) -> Result<Vec<(Value, Tabular)>> {
        let idx = self
            .col_index(col)
            .ok_or_else(|| QueryError::ColumnNotFound(col.to_string()))?;
        let mut groups: Vec<(Value, Vec<Vec<Value>>)> = Vec::new();
        for row in &self.rows {
            let key = row[idx].clone();
            if let Some(group) = groups.iter_mut().find(|(k, _)| values_eq(k, &key)) {
                group.1.push(row.clone());
            } else {
                groups.push((key, vec![row.clone()]));
            }
        }
        Ok(groups
            .into_iter()
            .map(|(key, rows)| (key, Tabular::new(self.columns.clone(), rows)))
            .collect())
    }

    /// Maximum absolute difference between `self` and `other` on shared
    /// numeric column `col`, row-by-row in declared order. `None` if
    /// either side lacks the column, row counts differ, or no row pair
    /// is numeric.
    pub fn max_abs_diff(&self, other: &Tabular, col: &str) -> Option<f64> {
        let a = self.col_index(col)?;
        let b = other.col_index(col)?;
        if self.rows.len() != other.rows.len() {
            return None;
        }
        self.rows
            .iter()
            .zip(&other.rows)
            .filter_map(|(ra, rb)| {
                let x = as_f64(&ra[a])?;
                let y = as_f64(&rb[b])?;
                Some((x - y).abs())
            })
            .fold(None, |acc, d| Some(acc.map_or(d, |m: f64| m.max(d))))
    }

    /// Maximum relative difference `|x/y - 1|` between `self` and `other`
    /// on shared numeric column `col`. Rows where `y == 0` are skipped.
    pub fn max_rel_diff(&self, other: &Tabular, col: &str) -> Option<f64> {
        let a = self.col_index(col)?;
        let b = other.col_index(col)?;
        if self.rows.len() != other.rows.len() {
            return None;
        }
        self.rows
            .iter()
            .zip(&other.rows)
            .filter_map(|(ra, rb)| {
                let x = as_f64(&ra[a])?;
                let y = as_f64(&rb[b])?;
                if y == 0.0 {
                    return None;
                }
                Some((x / y - 1.0).abs())
            })
            .fold(None, |acc, d| Some(acc.map_or(d, |m: f64| m.max(d))))
    }
}

fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Real(x), Value::Real(y)) => x == y,
        (Value::Text(x), Value::Text(y)) => x == y,
        (Value::Blob(x), Value::Blob(y)) => x == y,
        _ => false,
    }
}
