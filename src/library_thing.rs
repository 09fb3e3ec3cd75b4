use crate::error::{ImportError, Result};
use crate::models::{AnnotatedBook, Book};
use crate::reading_history::PartialDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::{collections::HashMap, str::FromStr};
use tracing::{info, warn};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// keys of the isbn mapping
const ISBN_10_CODE: &str = "0";
const ISBN_13_CODE: &str = "2";

/// A book as found in a LibraryThing JSON export.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LibraryThingBook {
    pub title: String,
    pub authors: Vec<LibraryThingAuthor>,
    pub date: Option<i32>,
    pub review: Option<String>,
    pub rating: Option<i32>,
    pub isbn: Option<HashMap<String, String>>,
    pub entrydate: Option<PartialDate>,
    pub genre: Option<Vec<String>>,
    pub pages: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LibraryThingAuthor {
    /// "Last, First"
    pub lf: Option<String>,
    /// "First Last"
    pub fl: Option<String>,
}

impl LibraryThingAuthor {
    /// The "First Last" name, reshaped from "Last, First" when that is all
    /// the export carries.
    pub fn first_last(&self) -> Option<String> {
        if let Some(fl) = self.fl.as_deref().map(str::trim).filter(|text| !text.is_empty()) {
            return Some(fl.to_string());
        }

        let lf = self.lf.as_deref()?.trim();
        match lf.split_once(',') {
            Some((last, first)) if !first.trim().is_empty() => {
                Some(format!("{} {}", first.trim(), last.trim()))
            }
            _ => (!lf.is_empty()).then(|| lf.trim_end_matches(',').trim().to_string()),
        }
    }
}

/// Decodes one exported record. Only the title is required; every other
/// field that is missing or malformed is left absent.
pub fn parse_book(node: &Value) -> Result<LibraryThingBook> {
    let title = node
        .get("title")
        .and_then(|node| node.as_str())
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ImportError::Schema("missing title".to_string()))?
        .to_string();

    // "no authors" is exported as `[[]]`, so anything that is not an author object is skipped
    let authors = node
        .get("authors")
        .and_then(|node| node.as_array())
        .map(|node| {
            node.iter()
                .filter(|node| node.is_object())
                .map(|node| LibraryThingAuthor {
                    lf: string(node.get("lf")),
                    fl: string(node.get("fl")),
                })
                .collect()
        })
        .unwrap_or_default();

    let isbn = node.get("isbn").and_then(|node| node.as_object()).map(|node| {
        node.iter()
            .filter_map(|(code, value)| Some((code.clone(), value.as_str()?.trim().to_string())))
            .collect()
    });

    let entrydate = node.get("entrydate").and_then(|node| match node {
        Value::String(text) => PartialDate::parse(text),
        Value::Object(_) => serde_json::from_value(node.clone()).ok(),
        _ => None,
    });

    let genre = node.get("genre").and_then(|node| node.as_array()).map(|node| {
        node.iter()
            .filter_map(|node| node.as_str())
            .map(|text| text.to_string())
            .collect()
    });

    Ok(LibraryThingBook {
        title,
        authors,
        date: number(node.get("date")),
        review: string(node.get("review")),
        rating: number::<i32>(node.get("rating")).filter(|rating| (1..=5).contains(rating)),
        isbn,
        entrydate,
        genre,
        pages: number(node.get("pages")),
    })
}

/// Converts a whole export, either an object keyed by book id or an array of
/// records. Records without a title are skipped.
pub fn parse_export(root: &Value) -> Vec<AnnotatedBook> {
    let records: Vec<&Value> = match root {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => vec![],
    };
    info!(records = records.len(), "reading librarything export");

    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, node)| match parse_book(node) {
            Ok(book) => Some(book.into()),
            Err(err) => {
                warn!(record = index, %err, "skipping librarything record");
                None
            }
        })
        .collect()
}

/// Turns a free-text genre into a `#genre/…` tag. Returns `None` when
/// nothing is left after normalizing.
pub fn as_genre_tag(genre: &str) -> Option<String> {
    let lowered = genre.to_lowercase();
    let stripped = NON_WORD.replace_all(lowered.trim(), "");
    let core_genre = WHITESPACE.replace_all(&stripped, "-");

    if core_genre.is_empty() {
        None
    } else {
        Some(format!("#genre/{core_genre}"))
    }
}

impl From<&LibraryThingBook> for Book {
    fn from(val: &LibraryThingBook) -> Self {
        let code = |code: &str| {
            val.isbn
                .as_ref()
                .and_then(|isbn| isbn.get(code))
                .filter(|text| !text.is_empty())
                .cloned()
        };

        let tags: Vec<String> = val
            .genre
            .iter()
            .flatten()
            .filter_map(|genre| as_genre_tag(genre))
            .collect();

        Book {
            title: val.title.clone(),
            authors: val.authors.iter().filter_map(|author| author.first_last()).collect(),
            year_published: val.date,
            original_year_published: None,
            publisher: None,
            isbn: code(ISBN_10_CODE),
            isbn13: code(ISBN_13_CODE),
            number_of_pages: val.pages,
            tags: (!tags.is_empty()).then_some(tags),
        }
    }
}

impl From<LibraryThingBook> for AnnotatedBook {
    fn from(val: LibraryThingBook) -> Self {
        AnnotatedBook {
            book: Book::from(&val),
            review: val.review,
            rating: val.rating,
            date_added: val.entrydate.and_then(|date| date.to_date_time()),
            reading_history: None,
        }
    }
}

fn string(node: Option<&Value>) -> Option<String> {
    node?
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .map(|text| text.to_string())
}

// accepts numbers and numeric-looking strings with surrounding whitespace
fn number<T: FromStr>(node: Option<&Value>) -> Option<T> {
    match node? {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.to_string().parse().ok(),
        _ => None,
    }
}
