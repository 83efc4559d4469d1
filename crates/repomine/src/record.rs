//! Flat output rows.

use chrono::NaiveDate;

/// Column written after the variable columns on every row.
pub const DATE_COLUMN: &str = "date";

/// Date format of the [`DATE_COLUMN`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shape of the table produced for one variable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Variable type name, e.g. `contributors`.
    pub name: &'static str,
    /// Column holding the resource key.
    pub key_column: &'static str,
    /// Variable-specific columns, in order.
    pub columns: &'static [&'static str],
}

impl Schema {
    /// Full header: key column, variable columns, date.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.key_column)
            .chain(self.columns.iter().copied())
            .chain(std::iter::once(DATE_COLUMN))
            .map(String::from)
            .collect()
    }

    /// Number of columns in a full row.
    pub fn width(&self) -> usize {
        self.columns.len() + 2
    }
}

/// One enriched row for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Resource key.
    pub resource: String,
    /// Values for the schema's variable columns.
    pub values: Vec<String>,
}

impl Record {
    pub fn new(resource: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            resource: resource.into(),
            values,
        }
    }

    /// The full row as written: key, values, collection date.
    pub fn row(&self, date: NaiveDate) -> Vec<String> {
        let mut row = Vec::with_capacity(self.values.len() + 2);
        row.push(self.resource.clone());
        row.extend(self.values.iter().cloned());
        row.push(date.format(DATE_FORMAT).to_string());
        row
    }
}
