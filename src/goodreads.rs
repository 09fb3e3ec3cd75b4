use crate::error::{ImportError, Result};
use crate::models::{AnnotatedBook, Book};
use crate::reading_history::{PartialDate, ReadingHistory};
use crate::table::DecodedTable;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Columns read from a Goodreads library export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoodreadsHeader {
    Title,
    Author,
    Isbn,
    Isbn13,
    Rating,
    Publisher,
    NumberOfPages,
    YearPublished,
    OriginalPublicationYear,
    DateRead,
    DateAdded,
    ExclusiveShelf,
    ReadCount,
    Review,
}

impl GoodreadsHeader {
    pub const ALL: [GoodreadsHeader; 14] = [
        GoodreadsHeader::Title,
        GoodreadsHeader::Author,
        GoodreadsHeader::Isbn,
        GoodreadsHeader::Isbn13,
        GoodreadsHeader::Rating,
        GoodreadsHeader::Publisher,
        GoodreadsHeader::NumberOfPages,
        GoodreadsHeader::YearPublished,
        GoodreadsHeader::OriginalPublicationYear,
        GoodreadsHeader::DateRead,
        GoodreadsHeader::DateAdded,
        GoodreadsHeader::ExclusiveShelf,
        GoodreadsHeader::ReadCount,
        GoodreadsHeader::Review,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GoodreadsHeader::Title => "title",
            GoodreadsHeader::Author => "author",
            GoodreadsHeader::Isbn => "isbn",
            GoodreadsHeader::Isbn13 => "isbn13",
            GoodreadsHeader::Rating => "My Rating",
            GoodreadsHeader::Publisher => "publisher",
            GoodreadsHeader::NumberOfPages => "Number of Pages",
            GoodreadsHeader::YearPublished => "Year Published",
            GoodreadsHeader::OriginalPublicationYear => "Original Publication Year",
            GoodreadsHeader::DateRead => "Date Read",
            GoodreadsHeader::DateAdded => "Date Added",
            GoodreadsHeader::ExclusiveShelf => "Exclusive Shelf",
            GoodreadsHeader::ReadCount => "Read Count",
            GoodreadsHeader::Review => "My review",
        }
    }
}

const DATE_FORMAT: &str = "%Y/%m/%d";

/// Maps each known column to the actual header naming it.
///
/// Every actual header is checked against every column, so when several
/// headers match the same column the last one wins.
// TODO: ask whether ambiguous headers should fail the import instead
pub fn match_headers(headers: &[String]) -> HashMap<GoodreadsHeader, &str> {
    let mut columns = HashMap::new();

    for expected in GoodreadsHeader::ALL {
        let expected_name = expected.name().to_lowercase();
        for actual in headers {
            if actual.trim().to_lowercase() == expected_name {
                columns.insert(expected, actual.as_str());
            }
        }
    }

    columns
}

/// Strips the `="…"` wrapper spreadsheet tools put around cells they should
/// keep as text, e.g. `="0131103628"` becomes `0131103628`.
pub fn unwrap_text(value: &str) -> &str {
    value
        .strip_prefix("=\"")
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}

/// Converts a Goodreads export into annotated books, in row order.
///
/// Fails only when no column names the title or the author. Optional cells
/// that do not parse leave their field absent; a row with a blank title is
/// skipped.
pub fn parse_table(table: &DecodedTable) -> Result<Vec<AnnotatedBook>> {
    info!(
        rows = table.records.len(),
        headers = ?table.headers,
        "reading goodreads export"
    );

    let columns = match_headers(&table.headers);
    for (column, actual) in &columns {
        debug!(column = column.name(), actual, "matched goodreads column");
    }

    let title_header = *columns
        .get(&GoodreadsHeader::Title)
        .ok_or(ImportError::MissingColumn("title"))?;
    let author_header = *columns
        .get(&GoodreadsHeader::Author)
        .ok_or(ImportError::MissingColumn("author"))?;

    let items = table
        .records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let row = Row {
                record,
                columns: &columns,
            };

            let title = record.get(title_header).map(String::as_str).unwrap_or("");
            let authors = record
                .get(author_header)
                .filter(|text| !text.trim().is_empty())
                .map(|text| vec![text.to_string()])
                .unwrap_or_default();

            let book = match Book::new(title, authors) {
                Ok(book) => book,
                Err(err) => {
                    warn!(row = index, %err, "skipping goodreads row");
                    return None;
                }
            };

            Some(row.annotate(book))
        })
        .collect();

    Ok(items)
}

pub fn parse_csv(text: &str) -> Result<Vec<AnnotatedBook>> {
    parse_table(&DecodedTable::from_csv(text)?)
}

struct Row<'a> {
    record: &'a HashMap<String, String>,
    columns: &'a HashMap<GoodreadsHeader, &'a str>,
}

impl Row<'_> {
    fn value(&self, header: GoodreadsHeader) -> Option<&str> {
        let actual = self.columns.get(&header)?;
        let value = unwrap_text(self.record.get(*actual)?).trim();
        (!value.is_empty()).then_some(value)
    }

    fn number<T: std::str::FromStr>(&self, header: GoodreadsHeader) -> Option<T> {
        self.value(header)?.parse().ok()
    }

    fn string(&self, header: GoodreadsHeader) -> Option<String> {
        self.value(header).map(|text| text.to_string())
    }

    fn annotate(&self, mut book: Book) -> AnnotatedBook {
        book.isbn = self.string(GoodreadsHeader::Isbn);
        book.isbn13 = self.string(GoodreadsHeader::Isbn13);
        book.publisher = self.string(GoodreadsHeader::Publisher);
        book.number_of_pages = self.number(GoodreadsHeader::NumberOfPages);
        book.year_published = self.number(GoodreadsHeader::YearPublished);
        book.original_year_published = self.number(GoodreadsHeader::OriginalPublicationYear);

        // 0 means "not rated"
        let rating = self
            .number::<i32>(GoodreadsHeader::Rating)
            .filter(|rating| (1..=5).contains(rating));

        let date_added = self
            .value(GoodreadsHeader::DateAdded)
            .and_then(|text| NaiveDate::parse_from_str(text, DATE_FORMAT).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|date| date.and_utc())
            .unwrap_or_else(Utc::now);

        AnnotatedBook {
            book,
            review: self.string(GoodreadsHeader::Review),
            rating,
            date_added: Some(date_added),
            reading_history: self.reading_history(),
        }
    }

    fn reading_history(&self) -> Option<ReadingHistory> {
        let shelf = self
            .value(GoodreadsHeader::ExclusiveShelf)
            .map(|text| text.to_lowercase());
        let date_read = self.value(GoodreadsHeader::DateRead).and_then(PartialDate::parse);
        let read_count: Option<u32> = self.number(GoodreadsHeader::ReadCount);

        let mut history = ReadingHistory::default();

        if let Some(finish) = date_read {
            history.finish_reading(finish);
            history.set_has_read(true);
        } else if shelf.as_deref() == Some("read") {
            history.finish_reading(PartialDate::default());
            history.set_has_read(true);
        }

        if shelf.as_deref() == Some("currently-reading") {
            history.start_reading(None);
        }

        match read_count {
            Some(count) if count > 1 => history.set_multiple_readings(true),
            Some(1) => history.set_has_read(true),
            _ => {}
        }

        (history != ReadingHistory::default()).then_some(history)
    }
}
