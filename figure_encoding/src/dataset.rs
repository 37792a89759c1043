// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use thiserror::Error;

/// The scalar type stored in a [`Column`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    /// Seconds since the Unix epoch.
    Temporal,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Temporal => "temporal",
        })
    }
}

/// A single named column of a [`Dataset`].
///
/// Missing cells are `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
    Temporal(Vec<Option<i64>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical(values) => values.len(),
            Self::Temporal(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Numeric(_) => ColumnKind::Numeric,
            Self::Categorical(_) => ColumnKind::Categorical,
            Self::Temporal(_) => ColumnKind::Temporal,
        }
    }

    /// Whether values of this column lie on a continuous axis.
    pub fn is_continuous(&self) -> bool {
        !matches!(self, Self::Categorical(_))
    }

    /// The value at `row` as a number.
    ///
    /// Returns `None` for missing or non-finite cells, and for every cell of a
    /// categorical column.
    pub fn number(&self, row: usize) -> Option<f64> {
        match self {
            Self::Numeric(values) => values.get(row).copied().flatten().filter(|v| v.is_finite()),
            Self::Temporal(values) => values.get(row).copied().flatten().map(|v| v as f64),
            Self::Categorical(_) => None,
        }
    }

    /// The value at `row` as a category label.
    ///
    /// Returns `None` for missing cells and for every cell of a continuous column.
    pub fn category(&self, row: usize) -> Option<&str> {
        match self {
            Self::Categorical(values) => values.get(row).and_then(|v| v.as_deref()),
            _ => None,
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Self::Numeric(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<f64>>> for Column {
    fn from(values: Vec<Option<f64>>) -> Self {
        Self::Numeric(values)
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Self::Categorical(values.into_iter().map(|v| Some(v.to_owned())).collect())
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Self::Categorical(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<String>>> for Column {
    fn from(values: Vec<Option<String>>) -> Self {
        Self::Categorical(values)
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Self::Temporal(values.into_iter().map(Some).collect())
    }
}

/// Errors produced while assembling a [`Dataset`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("column names must not be empty")]
    EmptyName,
    #[error("column '{0}' is defined more than once")]
    DuplicateColumn(String),
    #[error("column '{name}' has {found} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// A column-oriented table with named columns.
///
/// Every column has the same number of rows and column names are unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Dataset {
    /// Creates a dataset without any columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    ///
    /// Leading and trailing whitespace is stripped from `name`.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: impl Into<Column>,
    ) -> Result<Self, DatasetError> {
        let name = name.into().trim().to_owned();
        let column = column.into();
        if name.is_empty() {
            return Err(DatasetError::EmptyName);
        }
        if self.names.contains(&name) {
            return Err(DatasetError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first() {
            if first.len() != column.len() {
                return Err(DatasetError::LengthMismatch {
                    name,
                    expected: first.len(),
                    found: column.len(),
                });
            }
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_columns() {
        let err = Dataset::new()
            .with_column("a", vec![1.0, 2.0, 3.0])
            .and_then(|d| d.with_column("b", vec!["x", "y"]))
            .unwrap_err();
        assert_eq!(
            err,
            DatasetError::LengthMismatch {
                name: "b".into(),
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn rejects_duplicate_and_blank_names() {
        let data = Dataset::new().with_column("a", vec![1.0]).unwrap();
        assert_eq!(
            data.clone().with_column(" a ", vec![2.0]).unwrap_err(),
            DatasetError::DuplicateColumn("a".into())
        );
        assert_eq!(
            data.with_column("   ", vec![2.0]).unwrap_err(),
            DatasetError::EmptyName
        );
    }

    #[test]
    fn non_finite_numbers_read_as_missing() {
        let column = Column::from(vec![Some(1.0), None, Some(f64::NAN), Some(f64::INFINITY)]);
        assert_eq!(column.number(0), Some(1.0));
        assert_eq!(column.number(1), None);
        assert_eq!(column.number(2), None);
        assert_eq!(column.number(3), None);
        assert_eq!(column.category(0), None);
    }

    #[test]
    fn lookup_by_name() {
        let data = Dataset::new()
            .with_column("class", vec!["suv", "compact"])
            .unwrap()
            .with_column("year", vec![1_199_145_600_i64, 883_612_800])
            .unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.num_columns(), 2);
        assert_eq!(Dataset::new().num_columns(), 0);
        assert_eq!(data.column_names().collect::<Vec<_>>(), ["class", "year"]);
        assert_eq!(data.column("class").map(Column::kind), Some(ColumnKind::Categorical));
        assert_eq!(data.column("year").and_then(|c| c.number(1)), Some(883_612_800.0));
        assert!(data.column("missing").is_none());
    }
}
