use crate::error::Result;
use std::collections::HashMap;

/// A decoded spreadsheet: header names in column order and one
/// header-to-cell mapping per row.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodedTable {
    pub headers: Vec<String>,
    pub records: Vec<HashMap<String, String>>,
}

impl DecodedTable {
    pub fn new(headers: Vec<String>, records: Vec<HashMap<String, String>>) -> Self {
        Self { headers, records }
    }

    /// Decodes CSV text whose first line holds the headers.
    ///
    /// Short rows simply lack the trailing cells; a repeated header keeps the
    /// cell of its last column.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|text| text.to_string()).collect();

        let records = reader
            .records()
            .map(|record| -> Result<HashMap<String, String>> {
                let record = record?;
                let row = headers
                    .iter()
                    .cloned()
                    .zip(record.iter().map(|text| text.to_string()))
                    .collect();
                Ok(row)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { headers, records })
    }
}
