//! ### Results
//! Read access to a case's result tables after they have been exported
//! from GDX with `gdx2sqlite`. Every symbol is a table named after it,
//! indexed by columns named after its domain sets and holding its number
//! in a `value` column.

use anyhow::{anyhow, bail, ensure, Context};
use indexmap::IndexMap;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;

pub const TECHNOLOGY_KEY: &str = "technologies";
pub const HOUR_KEY: &str = "hours";
pub const VALUE_KEY: &str = "value";

/// `gdx2sqlite` collects scalars into this table unless they are exported one per table.
const SCALARS_TABLE: &str = "scalars";

pub struct ResultsDb {
    conn: Connection,
    label: String,
}

impl ResultsDb {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if !path.is_file() {
            bail!("Results database not found: {}", path.display());
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Self {
            conn,
            label: path.display().to_string(),
        })
    }

    /// Wraps an already open connection, e.g. an in-memory fixture.
    pub fn from_connection(conn: Connection, label: impl Into<String>) -> Self {
        Self {
            conn,
            label: label.into(),
        }
    }

    pub fn has_table(&self, symbol: &str) -> anyhow::Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [symbol],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn columns(&self, symbol: &str) -> anyhow::Result<Vec<String>> {
        if !self.has_table(symbol)? {
            bail!("Symbol `{symbol}` not found in {}", self.label);
        }
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let cols = stmt
            .query_map([symbol], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cols)
    }

    fn require_columns(&self, symbol: &str, required: &[&str]) -> anyhow::Result<()> {
        let cols = self.columns(symbol)?;
        for key in required {
            ensure!(
                cols.iter().any(|c| c == key),
                "Symbol `{symbol}` in {} has no `{key}` column (found {cols:?})",
                self.label
            );
        }
        Ok(())
    }

    /// One value per technology, in table order.
    pub fn technology_values(&self, symbol: &str) -> anyhow::Result<IndexMap<String, Option<f64>>> {
        self.require_columns(symbol, &[TECHNOLOGY_KEY, VALUE_KEY])?;
        let sql = format!(
            "SELECT {}, {} FROM {} ORDER BY rowid",
            quote_ident(TECHNOLOGY_KEY),
            quote_ident(VALUE_KEY),
            quote_ident(symbol)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut values = IndexMap::new();
        while let Some(row) = rows.next()? {
            let tech = text_field(row, 0)?;
            let value: Option<f64> = row.get(1)?;
            if values.insert(tech.clone(), value).is_some() {
                bail!("Symbol `{symbol}` has more than one row for technology `{tech}`");
            }
        }
        Ok(values)
    }

    pub fn hourly_values(&self, symbol: &str) -> anyhow::Result<Vec<(i64, Option<f64>)>> {
        self.require_columns(symbol, &[HOUR_KEY, VALUE_KEY])?;
        let sql = format!(
            "SELECT {}, {} FROM {} ORDER BY rowid",
            quote_ident(HOUR_KEY),
            quote_ident(VALUE_KEY),
            quote_ident(symbol)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push((hour_field(row, 0)?, row.get(1)?));
        }
        Ok(values)
    }

    pub fn hourly_technology_values(
        &self,
        symbol: &str,
    ) -> anyhow::Result<Vec<(i64, String, Option<f64>)>> {
        self.require_columns(symbol, &[HOUR_KEY, TECHNOLOGY_KEY, VALUE_KEY])?;
        let sql = format!(
            "SELECT {}, {}, {} FROM {} ORDER BY rowid",
            quote_ident(HOUR_KEY),
            quote_ident(TECHNOLOGY_KEY),
            quote_ident(VALUE_KEY),
            quote_ident(symbol)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push((hour_field(row, 0)?, text_field(row, 1)?, row.get(2)?));
        }
        Ok(values)
    }

    /// Value of a scalar symbol. Reads the first row of its own table, or
    /// its row in the shared scalars table.
    pub fn scalar(&self, symbol: &str) -> anyhow::Result<f64> {
        let value: Option<Option<f64>> = if self.has_table(symbol)? {
            self.require_columns(symbol, &[VALUE_KEY])?;
            let sql = format!(
                "SELECT {} FROM {} ORDER BY rowid LIMIT 1",
                quote_ident(VALUE_KEY),
                quote_ident(symbol)
            );
            self.conn.query_row(&sql, [], |row| row.get(0)).optional()?
        } else if self.has_table(SCALARS_TABLE)? {
            let sql = format!(
                "SELECT {} FROM {} WHERE name = ?1 LIMIT 1",
                quote_ident(VALUE_KEY),
                quote_ident(SCALARS_TABLE)
            );
            self.conn
                .query_row(&sql, [symbol], |row| row.get(0))
                .optional()?
        } else {
            None
        };

        value
            .ok_or_else(|| anyhow!("Scalar `{symbol}` not found in {}", self.label))?
            .ok_or_else(|| anyhow!("Scalar `{symbol}` in {} has no value", self.label))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn text_field(row: &Row, idx: usize) -> anyhow::Result<String> {
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(num) => Ok(num.to_string()),
        other => bail!("Expected a set element, found {other:?}"),
    }
}

/// GDX set elements are strings, so hours usually arrive as text.
fn hour_field(row: &Row, idx: usize) -> anyhow::Result<i64> {
    match row.get_ref(idx)? {
        ValueRef::Integer(num) => Ok(num),
        ValueRef::Real(num) if num.fract() == 0. => Ok(num as i64),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            text.trim()
                .parse::<i64>()
                .with_context(|| format!("Hour `{text}` is not an integer"))
        }
        other => bail!("Expected an hour, found {other:?}"),
    }
}
