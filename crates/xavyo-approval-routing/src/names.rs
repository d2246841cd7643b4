//! CSV helpers for scheme lists and approver names.
//!
//! Approver strings travel through the workflow engine as CSV. A name that
//! itself contains a comma (`Smith, John`) must be quoted so that splitting
//! the string yields one logical approver.

use csv::{QuoteStyle, ReaderBuilder, Trim, WriterBuilder};

use crate::error::{ApprovalRoutingError, Result};

/// Join names into one CSV string, quoting only where needed.
///
/// # Errors
///
/// Returns `ApprovalRoutingError::Configuration` if the names cannot be
/// written as CSV.
pub fn join_names<S: AsRef<str>>(names: &[S]) -> Result<String> {
    write_names(names, QuoteStyle::Necessary)
}

/// Join names into one CSV string, quoting every name.
///
/// # Errors
///
/// Returns `ApprovalRoutingError::Configuration` if the names cannot be
/// written as CSV.
pub fn join_quoted_names<S: AsRef<str>>(names: &[S]) -> Result<String> {
    write_names(names, QuoteStyle::Always)
}

/// Split a CSV string, honouring double-quoted fields.
///
/// Fields are trimmed and empty fields are dropped.
///
/// # Errors
///
/// Returns `ApprovalRoutingError::Configuration` for malformed CSV.
pub fn split_csv(input: &str) -> Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let mut fields = Vec::new();
    for record in reader.records() {
        let record = record?;
        fields.extend(
            record
                .iter()
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        );
    }
    Ok(fields)
}

fn write_names<S: AsRef<str>>(names: &[S], style: QuoteStyle) -> Result<String> {
    if names.is_empty() {
        return Ok(String::new());
    }

    let mut wtr = WriterBuilder::new()
        .quote_style(style)
        .from_writer(Vec::new());
    wtr.write_record(names.iter().map(|n| n.as_ref()))?;

    let bytes = wtr
        .into_inner()
        .map_err(|e| ApprovalRoutingError::Configuration(e.to_string()))?;
    let line = String::from_utf8(bytes)
        .map_err(|e| ApprovalRoutingError::Configuration(e.to_string()))?;

    // Remove the record terminator.
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
