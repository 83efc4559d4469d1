use std::path::Path;

use repomine::record::DATE_COLUMN;
use repomine::table::{Table, add_readme_signals, dedupe_rows};

/// Handle `dedupe`: drop repeated rows, ignoring the given columns.
///
/// Writes to `output`, or back to `input` when no output is given.
pub(crate) fn handle_dedupe(
    input: &Path,
    output: Option<&Path>,
    ignore: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let ignore: Vec<&str> = if ignore.is_empty() {
        vec![DATE_COLUMN]
    } else {
        ignore.iter().map(String::as_str).collect()
    };

    let table = Table::read_csv(input)?;
    let deduped = dedupe_rows(&table, &ignore);
    let target = output.unwrap_or(input);
    deduped.write_csv(target)?;

    tracing::info!(
        input = %input.display(),
        output = %target.display(),
        before = table.len(),
        after = deduped.len(),
        "Deduplicated"
    );
    Ok(())
}

/// Handle `readme-signals`: append install/usage/contributing flags.
pub(crate) fn handle_readme_signals(
    input: &Path,
    output: &Path,
    column: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = Table::read_csv(input)?;
    let enriched = add_readme_signals(&table, column)?;
    enriched.write_csv(output)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        rows = enriched.len(),
        "Added README signals"
    );
    Ok(())
}
