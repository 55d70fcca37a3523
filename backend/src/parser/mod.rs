//! CSV to grid loader with encoding and delimiter auto-detection.
//!
//! Turns raw spreadsheet exports into a [`Grid`] of typed cells. No budget
//! logic here: rows keep their original positions (blank lines included)
//! so that row indices in warnings match the sheet.

use std::path::Path;

use serde::Serialize;

use crate::error::{GridError, GridResult};
use crate::models::{Cell, Grid};

/// Candidate separators, in preference order on ties.
const SEPARATORS: [char; 4] = [',', ';', '\t', '|'];

/// Lines sampled when guessing the delimiter.
const DELIMITER_SAMPLE_LINES: usize = 10;

/// A loaded grid with the settings used to read it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedGrid {
    pub grid: Grid,
    pub encoding: String,
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using the specified encoding, dropping a UTF-8 byte order mark.
pub fn decode_content(bytes: &[u8], encoding: &str) -> GridResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => {
            let Some(codec) = encoding_rs::Encoding::for_label(other.as_bytes()) else {
                return Err(GridError::Encoding(format!("unsupported encoding '{}'", other)));
            };
            codec.decode(bytes).0.into_owned()
        }
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences over the first few non-empty lines.
///
/// Budget exports often open with a title line that has no separators at all,
/// so a single line is not enough. Falls back to `,`.
pub fn detect_delimiter(content: &str) -> char {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();

    let mut best_sep = ',';
    let mut best_count = 0;

    for sep in SEPARATORS {
        let count: usize = sample.iter().map(|line| line.matches(sep).count()).sum();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Convert one raw field into a cell: blank, plain number, or text.
///
/// Formatted amounts such as `$1,200` stay text; cost parsing handles them.
pub fn to_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::Text(trimmed.to_string()),
    }
}

/// Parse decoded CSV text with an explicit delimiter.
///
/// Rows may have different lengths; blank lines are kept as empty rows so
/// row indices match the sheet.
pub fn parse_grid(content: &str, delimiter: char) -> GridResult<Grid> {
    if content.trim().is_empty() {
        return Err(GridError::Empty);
    }

    let delimiter = u8::try_from(delimiter).map_err(|_| GridError::Parse {
        line: 0,
        message: format!("delimiter '{}' is not a single byte", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| GridError::Parse {
            line: e.position().map(|p| p.line() as usize).unwrap_or(0),
            message: e.to_string(),
        })?;

        // The reader skips blank lines; pad them back in.
        if let Some(position) = record.position() {
            let line_index = (position.line() as usize).saturating_sub(1);
            while rows.len() < line_index {
                rows.push(Vec::new());
            }
        }
        rows.push(record.iter().map(to_cell).collect());
    }

    Ok(Grid::new(rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_grid_bytes(bytes: &[u8]) -> GridResult<ParsedGrid> {
    if bytes.is_empty() {
        return Err(GridError::Empty);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let grid = parse_grid(&content, delimiter)?;

    Ok(ParsedGrid {
        grid,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_grid_file<P: AsRef<Path>>(path: P) -> GridResult<ParsedGrid> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_grid_bytes(&bytes)
}
