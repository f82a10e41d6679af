// src/table.rs

//! In-memory string tables and their CSV encoding.
//!
//! Every table written by the pipeline carries a leading unnamed column
//! holding a 0-based row index. Reading a table drops that column again,
//! so stages never see each other's bookkeeping.

use crate::error::{LedgerError, LedgerResult};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Cell values that stand for "no value" in tables written by other tools
const MISSING_MARKERS: [&str; 4] = ["NaN", "nan", "None", "null"];

/// A table of string cells with named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Reads a CSV file, dropping a leading row-index column if there is one.
    /// Short rows are padded with empty cells; rows longer than the header are an error.
    pub fn read_csv(path: &Path) -> LedgerResult<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let mut columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let skip_index = columns.first().is_some_and(|c| is_index_header(c));
        if skip_index {
            columns.remove(0);
        }

        let mut table = Self::new(path.display().to_string(), columns);
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record
                .iter()
                .skip(usize::from(skip_index))
                .map(str::to_string)
                .collect();
            if row.len() > table.columns.len() {
                return Err(LedgerError::ShapeMismatch {
                    left: table.columns.len(),
                    right: row.len(),
                });
            }
            row.resize(table.columns.len(), String::new());
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Writes the table with a fresh 0-based index column.
    pub fn write_csv(&self, path: &Path) -> LedgerResult<()> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
        writer.write_field("")?;
        writer.write_record(&self.columns)?;
        for (index, row) in self.rows.iter().enumerate() {
            writer.write_field(index.to_string())?;
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn push_row(&mut self, row: Vec<String>) -> LedgerResult<()> {
        if row.len() != self.columns.len() {
            return Err(LedgerError::ShapeMismatch {
                left: self.columns.len(),
                right: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> LedgerResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| LedgerError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, name: &str) -> LedgerResult<impl Iterator<Item = &str> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| row[idx].as_str()))
    }

    /// Projects `(source, target)` column pairs into a new table, renaming as it goes.
    pub fn select(&self, mapping: &[(&str, &str)]) -> LedgerResult<Table> {
        let indices = mapping
            .iter()
            .map(|(source, _)| self.column_index(source))
            .collect::<LedgerResult<Vec<_>>>()?;
        let columns = mapping.iter().map(|(_, target)| target.to_string()).collect();

        let mut table = Table::new(self.name.clone(), columns);
        table.rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(table)
    }

    /// Appends the rows of `other`, which must have the same columns in the same order.
    pub fn concat(mut self, other: Table) -> LedgerResult<Table> {
        if self.columns != other.columns {
            return Err(LedgerError::ShapeMismatch {
                left: self.columns.len(),
                right: other.columns.len(),
            });
        }
        self.rows.extend(other.rows);
        Ok(self)
    }

    /// Removes rows equal to an earlier row. First occurrence wins.
    pub fn drop_duplicates(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    pub fn drop_columns(&mut self, names: &[&str]) -> LedgerResult<()> {
        let mut indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<LedgerResult<Vec<_>>>()?;
        indices.sort_unstable();
        indices.dedup();
        for &idx in indices.iter().rev() {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> LedgerResult<()> {
        if from != to && self.has_column(to) {
            return Err(LedgerError::DuplicateColumn(to.to_string()));
        }
        let idx = self.column_index(from)?;
        self.columns[idx] = to.to_string();
        Ok(())
    }

    /// Adds (or overwrites) `target` with a copy of `source`.
    pub fn copy_column(&mut self, source: &str, target: &str) -> LedgerResult<()> {
        let src = self.column_index(source)?;
        match self.column_index(target) {
            Ok(dst) => {
                for row in &mut self.rows {
                    row[dst] = row[src].clone();
                }
            }
            Err(_) => {
                self.columns.push(target.to_string());
                for row in &mut self.rows {
                    let value = row[src].clone();
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Replaces cells of `column` equal to `from` with `to`.
    pub fn replace_value(&mut self, column: &str, from: &str, to: &str) -> LedgerResult<usize> {
        let idx = self.column_index(column)?;
        let mut replaced = 0;
        for row in &mut self.rows {
            if row[idx] == from {
                row[idx] = to.to_string();
                replaced += 1;
            }
        }
        Ok(replaced)
    }

    /// Normalizes every "missing" marker to the empty string.
    pub fn fill_missing(&mut self) {
        for cell in self.rows.iter_mut().flatten() {
            if MISSING_MARKERS.contains(&cell.as_str()) {
                cell.clear();
            }
        }
    }

    /// Inner join on a column present in both tables.
    ///
    /// Output columns are the left columns followed by the right columns
    /// without the key. Other names present on both sides get `_x` (left)
    /// and `_y` (right) suffixes. Rows keep left order, then right order
    /// among the matches of one left row.
    pub fn inner_join(&self, right: &Table, on: &str) -> LedgerResult<Table> {
        let left_key = self.column_index(on)?;
        let right_key = right.column_index(on)?;

        let shared: HashSet<&str> = self
            .columns
            .iter()
            .filter(|c| c.as_str() != on && right.has_column(c))
            .map(String::as_str)
            .collect();
        let suffixed = |column: &str, suffix: &str| {
            if shared.contains(column) {
                format!("{column}{suffix}")
            } else {
                column.to_string()
            }
        };

        let right_keep: Vec<usize> = (0..right.columns.len()).filter(|&i| i != right_key).collect();
        let mut columns: Vec<String> = self.columns.iter().map(|c| suffixed(c, "_x")).collect();
        columns.extend(right_keep.iter().map(|&i| suffixed(&right.columns[i], "_y")));

        let mut by_key: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            by_key.entry(row[right_key].as_str()).or_default().push(i);
        }

        let mut joined = Table::new(format!("{} + {}", self.name, right.name), columns);
        for row in &self.rows {
            let Some(matches) = by_key.get(row[left_key].as_str()) else {
                continue;
            };
            for &m in matches {
                let mut out = row.clone();
                out.extend(right_keep.iter().map(|&i| right.rows[m][i].clone()));
                joined.rows.push(out);
            }
        }
        Ok(joined)
    }
}

/// `""` is what the pipeline writes; `Unnamed: 0` is how dataframe tools name it
fn is_index_header(header: &str) -> bool {
    header.is_empty() || header.starts_with("Unnamed: ")
}

/// Writes typed records under an explicit header, with a leading index column.
pub fn write_records<T: Serialize>(path: &Path, columns: &[&str], records: &[T]) -> LedgerResult<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_field("")?;
    writer.write_record(columns)?;
    for (index, record) in records.iter().enumerate() {
        writer.write_field(index.to_string())?;
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
