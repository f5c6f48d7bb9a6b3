//! Delimiter detection and row helpers for bulk CSV input.

/// Delimiters recognised in uploaded files, in tie-breaking order.
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Picks the delimiter that occurs most often in `line`.
///
/// Ties resolve to the earliest entry of [`CANDIDATE_DELIMITERS`]; a line with
/// none of them falls back to `,`.
pub fn detect_delimiter(line: &str) -> u8 {
    let mut best = b',';
    let mut best_count = 0usize;

    for candidate in CANDIDATE_DELIMITERS {
        let count = line.bytes().filter(|b| *b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    best
}

/// Returns the first line of `content`, without its line terminator.
pub fn first_line(content: &str) -> &str {
    content
        .lines()
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r')
}

/// Joins `fields` into one CSV record using `delimiter`, quoting where needed.
pub fn write_record(fields: &[&str], delimiter: u8) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(fields)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;

    Ok(String::from_utf8_lossy(&bytes)
        .trim_end_matches('\n')
        .to_string())
}
