use anyhow::{anyhow, bail, Context, Result};
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Helper for parsing delimited instrument/configuration tables,
/// validating their headers and providing good error messages.
#[derive(Debug)]
pub struct TableParser {
    filetype: String,
    filename: PathBuf,
    rows: Vec<StringRecord>,
    col_map: HashMap<String, usize>,
    line: usize,
}

impl TableParser {
    /// Open a comma-delimited table. `required_headers` are checked and an
    /// error is returned if any is not present. `filetype` is a readable
    /// description of the kind of file being parsed, used in error messages.
    pub fn new_csv<T: AsRef<str>>(
        filename: &Path,
        required_headers: impl IntoIterator<Item = T>,
        filetype: &str,
    ) -> Result<TableParser> {
        TableParser::new(filename, b',', required_headers, filetype)
    }

    /// Open a tab-delimited table.
    pub fn new_tsv<T: AsRef<str>>(
        filename: &Path,
        required_headers: impl IntoIterator<Item = T>,
        filetype: &str,
    ) -> Result<TableParser> {
        TableParser::new(filename, b'\t', required_headers, filetype)
    }

    fn new<T: AsRef<str>>(
        filename: &Path,
        delimiter: u8,
        required_headers: impl IntoIterator<Item = T>,
        filetype: &str,
    ) -> Result<TableParser> {
        let file = File::open(filename).with_context(|| filename.display().to_string())?;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut headers = rdr.headers()?.clone();
        headers.trim();
        let headers: Vec<String> = headers.iter().map(String::from).collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let mut record = result?;
            record.trim();
            rows.push(record);
        }

        let col_map = TableParser::check_headers(filename, required_headers, &headers)?;

        Ok(TableParser {
            filetype: filetype.to_string(),
            filename: filename.to_path_buf(),
            rows,
            col_map,
            line: 0,
        })
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Set the line number (not including the header) to pull data from.
    pub fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    /// Get a value of type `T` from column `col` on the current line.
    /// Returns `Ok(None)` for an empty field and an error if the cell
    /// cannot be parsed as `T`.
    pub fn try_parse_field<T>(&self, col: &str, expected: &str) -> Result<Option<T>>
    where
        T: FromStr,
        Result<T, <T as FromStr>::Err>: anyhow::Context<T, <T as FromStr>::Err>,
    {
        let v = match self.cell(col) {
            Some(v) => v,
            None => return Ok(None),
        };
        if v.is_empty() {
            return Ok(None);
        }

        Ok(Some(v.parse::<T>().with_context(|| {
            format!(
                "Error in {} file '{}'. On line {} in '{col}' column: \
                 Expected a {expected} but received '{v}'",
                self.filetype,
                self.filename.display(),
                self.line + 1,
            )
        })?))
    }

    /// Like [`TableParser::try_parse_field`], but an empty cell is an error.
    pub fn parse_field<T>(&self, col: &str, expected: &str) -> Result<T>
    where
        T: FromStr,
        Result<T, <T as FromStr>::Err>: anyhow::Context<T, <T as FromStr>::Err>,
    {
        match self.try_parse_field(col, expected)? {
            Some(v) => Ok(v),
            None => {
                bail!(
                    "Error in {} file '{}'. On line {} in '{col}' column: \
                     Expected a {expected}, but got empty value",
                    self.filetype,
                    self.filename.display(),
                    self.line + 1,
                );
            }
        }
    }

    /// Get a string from column `col` on the current line.
    /// Returns an error for an empty cell.
    pub fn require_string(&self, col: &str) -> Result<String> {
        self.try_get_string(col).ok_or_else(|| {
            anyhow!(
                "Error in {} file '{}'. On line {} in '{col}' column: \
                 Value required but cell is empty.",
                self.filetype,
                self.filename.display(),
                self.line + 1,
            )
        })
    }

    /// Get a string from column `col` on the current line, "" if empty.
    pub fn get_string(&self, col: &str) -> String {
        self.try_get_string(col).unwrap_or_default()
    }

    /// Get a string from column `col` on the current line, `None` if empty.
    pub fn try_get_string(&self, col: &str) -> Option<String> {
        match self.cell(col) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => None,
        }
    }

    // Instrument exports occasionally pad short rows; treat a cell past
    // the end of its row as empty rather than a hard error.
    fn cell(&self, col: &str) -> Option<&str> {
        let i = self.col_map[col];
        self.rows[self.line].get(i).map(str::trim)
    }

    fn check_headers<T: AsRef<str>>(
        file_arg: &Path,
        required: impl IntoIterator<Item = T>,
        headers: &[String],
    ) -> Result<HashMap<String, usize>> {
        for r in required {
            if !headers.contains(&r.as_ref().into()) {
                bail!(
                    "The input file '{}' must contain a column named '{}', but it was not found. \
                     Please check the headers in the file.",
                    file_arg.display(),
                    r.as_ref()
                );
            }
        }

        Ok(headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_string(), i))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str, ext: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_required_header_is_an_error() {
        let f = write_tmp("Well,Sample ID\nA1,P1_S1_A1\n", ".csv");
        let err = TableParser::new_csv(f.path(), ["Well", "ng/uL"], "FA smear").unwrap_err();
        assert!(err.to_string().contains("ng/uL"));
    }

    #[test]
    fn empty_numeric_cell_parses_as_none() {
        let f = write_tmp("Well\tng/uL\nA1\t\nB1\t4.5\n", ".txt");
        let mut parser = TableParser::new_tsv(f.path(), ["Well", "ng/uL"], "test").unwrap();
        assert_eq!(
            parser.try_parse_field::<f64>("ng/uL", "number").unwrap(),
            None
        );
        parser.set_line(1);
        assert_eq!(
            parser.try_parse_field::<f64>("ng/uL", "number").unwrap(),
            Some(4.5)
        );
    }

    #[test]
    fn bad_numeric_cell_names_file_and_column() {
        let f = write_tmp("Well,ng/uL\nA1,abc\n", ".csv");
        let parser = TableParser::new_csv(f.path(), ["ng/uL"], "FA smear").unwrap();
        let err = parser.parse_field::<f64>("ng/uL", "number").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("FA smear"));
        assert!(msg.contains("ng/uL"));
        assert!(msg.contains("abc"));
    }
}
