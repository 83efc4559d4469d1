//! Whole-table transformations applied between collection runs.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::variables::ReadmeSignals;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column: {0}")]
    MissingColumn(String),
}

/// An in-memory CSV table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn read_csv(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_from(file)
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers()?.iter().map(String::from).collect();
        let rows = reader
            .records()
            .map(|r| r.map(|record| record.iter().map(String::from).collect::<Vec<String>>()))
            .collect::<Result<_, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let file = std::fs::File::create(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_to(file)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Index of `name` in the header.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require(&self, name: &str) -> Result<usize, TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cell<'a>(row: &'a [String], index: usize) -> &'a str {
    row.get(index).map(String::as_str).unwrap_or_default()
}

/// Drop repeated rows, keeping the first occurrence.
///
/// Columns named in `ignore` (typically the collection date) are left out of
/// the comparison, so the same rows collected on different days collapse.
pub fn dedupe_rows(table: &Table, ignore: &[&str]) -> Table {
    let compared: Vec<usize> = (0..table.headers.len())
        .filter(|&i| !ignore.contains(&table.headers[i].as_str()))
        .collect();

    let mut seen = HashSet::new();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .filter(|row| {
            let key: Vec<&str> = compared.iter().map(|&i| cell(row, i)).collect();
            seen.insert(key)
        })
        .cloned()
        .collect();

    tracing::debug!(before = table.len(), after = rows.len(), "Deduplicated rows");
    Table {
        headers: table.headers.clone(),
        rows,
    }
}

/// Clean a repositories table: drop repeated ids, forks and GitHub Pages
/// sites (`*.github.io`).
pub fn filter_repositories(table: &Table) -> Result<Table, TableError> {
    let id = table.require("id")?;
    let fork = table.require("fork")?;
    let name = table.column("name");
    let html_url = table.column("html_url");

    let is_pages = |row: &[String]| {
        [name, html_url]
            .into_iter()
            .flatten()
            .any(|i| cell(row, i).trim_end_matches('/').ends_with(".github.io"))
    };

    let mut seen = HashSet::new();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .filter(|row| !cell(row, fork).eq_ignore_ascii_case("true"))
        .filter(|row| !is_pages(row))
        .filter(|row| seen.insert(cell(row, id).to_string()))
        .cloned()
        .collect();

    tracing::debug!(before = table.len(), after = rows.len(), "Filtered repositories");
    Ok(Table {
        headers: table.headers.clone(),
        rows,
    })
}

/// Append the README signal columns computed from `column`.
pub fn add_readme_signals(table: &Table, column: &str) -> Result<Table, TableError> {
    let source = table.require(column)?;

    let mut headers = table.headers.clone();
    headers.extend(ReadmeSignals::COLUMNS.iter().map(|c| c.to_string()));

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let signals = ReadmeSignals::detect(cell(row, source));
            let mut row = row.clone();
            row.extend(signals.values().iter().map(|v| v.to_string()));
            row
        })
        .collect();

    Ok(Table { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        Table::read_from(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_read_and_write_preserves_content() {
        let t = table("a,b\n1,\"x, y\"\n2,z\n");
        assert_eq!(t.headers, vec!["a", "b"]);
        assert_eq!(t.rows[0], vec!["1", "x, y"]);

        let mut out = Vec::new();
        t.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b\n1,\"x, y\"\n2,z\n");
    }

    #[test]
    fn test_dedupe_rows_first_occurrence_wins() {
        let t = table(
            "html_url,topic,date\n\
             u1,rust,2024-01-01\n\
             u2,go,2024-01-01\n\
             u1,rust,2024-01-02\n\
             u1,cli,2024-01-02\n",
        );

        let full = dedupe_rows(&t, &[]);
        assert_eq!(full.len(), 4);

        let ignoring_date = dedupe_rows(&t, &["date"]);
        assert_eq!(
            ignoring_date.rows,
            vec![
                vec!["u1", "rust", "2024-01-01"],
                vec!["u2", "go", "2024-01-01"],
                vec!["u1", "cli", "2024-01-02"],
            ]
        );
    }

    #[test]
    fn test_filter_repositories() {
        let t = table(
            "id,name,html_url,fork\n\
             1,tool,https://github.com/a/tool,False\n\
             2,fork-of-x,https://github.com/a/fork-of-x,True\n\
             3,a.github.io,https://github.com/a/a.github.io,False\n\
             1,tool,https://github.com/a/tool,False\n\
             4,lib,https://github.com/a/lib,false\n",
        );

        let filtered = filter_repositories(&t).unwrap();
        let ids: Vec<&str> = filtered.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_filter_repositories_requires_columns() {
        let t = table("name\nx\n");
        let err = filter_repositories(&t).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(c) if c == "id"));
    }

    #[test]
    fn test_add_readme_signals() {
        let t = table(
            "html_url,readme\n\
             u1,\"## Installation\nRun pip install.\n## Contributing\"\n\
             u2,Nothing here\n",
        );

        let out = add_readme_signals(&t, "readme").unwrap();
        assert_eq!(
            out.headers,
            vec![
                "html_url",
                "readme",
                "has_install_instruction",
                "has_usage_examples",
                "has_contrib_guidelines"
            ]
        );
        assert_eq!(&out.rows[0][2..], ["true", "false", "true"]);
        assert_eq!(&out.rows[1][2..], ["false", "false", "false"]);
    }
}
