use crate::error::{ImportError, Result};
use crate::reading_history::ReadingHistory;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// A book itself, as opposed to a person's relationship with it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(deserialize_with = "non_empty")]
    pub title: String,

    #[serde(default, deserialize_with = "lenient_vec")]
    pub authors: Vec<String>,

    /// Year this edition was published.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub year_published: Option<i32>,

    /// Year the work was first published, across editions.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub original_year_published: Option<i32>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub number_of_pages: Option<u32>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Book {
    /// Fails with [`ImportError::Schema`] when the title is blank.
    pub fn new(title: impl Into<String>, authors: Vec<String>) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ImportError::Schema("title is empty".to_string()));
        }

        Ok(Self {
            title,
            authors,
            ..Self::default()
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_flat(bytes)
    }
}

/// A [`Book`] plus personal annotations: review, rating, when it was added,
/// and the reading history.
///
/// The annotations are encoded as siblings of the book fields, so an encoded
/// `AnnotatedBook` decodes as a `Book` and an encoded `Book` decodes as an
/// `AnnotatedBook` with every annotation absent.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedBook {
    #[serde(flatten)]
    pub book: Book,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,

    /// Scale depends on the source; see the adapters.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub date_added: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient_object", skip_serializing_if = "Option::is_none")]
    pub reading_history: Option<ReadingHistory>,
}

impl AnnotatedBook {
    pub fn new(title: impl Into<String>, authors: Vec<String>) -> Result<Self> {
        Ok(Book::new(title, authors)?.into())
    }

    pub fn title(&self) -> &str {
        &self.book.title
    }

    pub fn authors(&self) -> &[String] {
        &self.book.authors
    }

    pub fn isbn(&self) -> Option<&str> {
        self.book.isbn.as_deref()
    }

    pub fn isbn13(&self) -> Option<&str> {
        self.book.isbn13.as_deref()
    }

    pub fn has_annotations(&self) -> bool {
        self.review.is_some()
            || self.rating.is_some()
            || self.date_added.is_some()
            || self.reading_history.is_some()
    }

    pub fn reading_history_mut(&mut self) -> &mut ReadingHistory {
        self.reading_history.get_or_insert_with(ReadingHistory::default)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_flat(bytes)
    }
}

impl From<Book> for AnnotatedBook {
    fn from(book: Book) -> Self {
        Self {
            book,
            ..Self::default()
        }
    }
}

impl From<AnnotatedBook> for Book {
    fn from(val: AnnotatedBook) -> Self {
        val.book
    }
}

impl AsRef<Book> for AnnotatedBook {
    fn as_ref(&self) -> &Book {
        &self.book
    }
}

impl AsMut<Book> for AnnotatedBook {
    fn as_mut(&mut self) -> &mut Book {
        &mut self.book
    }
}

// malformed bytes stay a json error; a well-formed payload with a bad shape is a schema error
fn decode_flat<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|err| {
        if err.is_data() {
            ImportError::Schema(err.to_string())
        } else {
            ImportError::Json(err)
        }
    })
}

fn non_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    if text.trim().is_empty() {
        return Err(serde::de::Error::custom("title is empty"));
    }
    Ok(text)
}

// a present but wrong-typed optional field decodes as absent
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// struct derives also take sequences, so only a json object counts here
fn lenient_object<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match serde_json::Value::deserialize(deserializer)? {
        value @ serde_json::Value::Object(_) => Ok(serde_json::from_value(value).ok()),
        _ => Ok(None),
    }
}

fn lenient_vec<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod test {
    use super::{AnnotatedBook, Book};
    use crate::error::ImportError;
    use crate::reading_history::PartialDate;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    fn sample() -> AnnotatedBook {
        let mut book = AnnotatedBook::new("Testing", vec!["Brian Dewey".to_string()]).unwrap();
        book.book.publisher = Some("Charlie Press".to_string());
        book.book.tags = Some(vec!["#testing".to_string()]);
        book.book.isbn13 = Some("9780131103627".to_string());
        book.rating = Some(3);
        book.review = Some("This is a test".to_string());
        book.date_added = Some(Utc.with_ymd_and_hms(2021, 6, 28, 12, 30, 0).unwrap());
        book.reading_history_mut().start_reading(Some(PartialDate::year(2021)));
        book
    }

    #[test]
    fn test_round_trip() {
        let book = sample();
        let data = book.encode().unwrap();

        let round_trip = AnnotatedBook::decode(&data).unwrap();
        assert_eq!(round_trip, book);

        // the same payload decodes as just the book
        let round_trip_book = Book::decode(&data).unwrap();
        assert_eq!(round_trip_book, book.book);
    }

    #[test]
    fn test_annotations_are_siblings() {
        let value: Value = serde_json::from_slice(&sample().encode().unwrap()).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "title",
            "authors",
            "publisher",
            "isbn13",
            "tags",
            "review",
            "rating",
            "dateAdded",
            "readingHistory",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert!(!object.contains_key("book"));
        assert_eq!(value["readingHistory"]["entries"][0]["start"]["year"], 2021);
    }

    #[test]
    fn test_book_payload_decodes_without_annotations() {
        let book = sample().book;
        let data = book.encode().unwrap();

        assert_eq!(Book::decode(&data).unwrap(), book);

        let annotated = AnnotatedBook::decode(&data).unwrap();
        assert_eq!(annotated.book, book);
        assert_eq!(annotated.review, None);
        assert_eq!(annotated.rating, None);
        assert_eq!(annotated.date_added, None);
        assert_eq!(annotated.reading_history, None);
        assert!(!annotated.has_annotations());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let data = json!({
            "title": "Dune",
            "authors": ["Frank Herbert"],
            "shelf": "favorites",
            "rating": 5
        })
        .to_string();

        let book = AnnotatedBook::decode(data.as_bytes()).unwrap();
        assert_eq!(book.title(), "Dune");
        assert_eq!(book.rating, Some(5));
    }

    #[test]
    fn test_wrong_typed_optional_fields_are_absent() {
        let data = json!({
            "title": "Dune",
            "authors": "Frank Herbert",
            "numberOfPages": "lots",
            "rating": "five",
            "dateAdded": 12,
            "readingHistory": []
        })
        .to_string();

        let book = AnnotatedBook::decode(data.as_bytes()).unwrap();
        assert!(book.authors().is_empty());
        assert_eq!(book.book.number_of_pages, None);
        assert_eq!(book.rating, None);
        assert_eq!(book.date_added, None);
        assert_eq!(book.reading_history, None);
    }

    #[test]
    fn test_reading_history_must_be_object() {
        for history in [json!([false, true, []]), json!(true), json!("read")] {
            let data = json!({ "title": "Dune", "readingHistory": history }).to_string();
            let book = AnnotatedBook::decode(data.as_bytes()).unwrap();
            assert_eq!(book.reading_history, None);
            assert!(!book.has_annotations());
        }

        let data = json!({ "title": "Dune", "readingHistory": { "hasRead": true } }).to_string();
        let book = AnnotatedBook::decode(data.as_bytes()).unwrap();
        assert!(book.reading_history.unwrap().has_read());
    }

    #[test]
    fn test_missing_title_is_schema_error() {
        let cases = [
            json!({ "authors": ["Frank Herbert"] }),
            json!({ "title": 42 }),
            json!({ "title": "  " }),
        ];

        for case in cases {
            let data = case.to_string();
            assert!(matches!(AnnotatedBook::decode(data.as_bytes()), Err(ImportError::Schema(_))));
            assert!(matches!(Book::decode(data.as_bytes()), Err(ImportError::Schema(_))));
        }
    }

    #[test]
    fn test_malformed_payload_is_json_error() {
        assert!(matches!(Book::decode(b"{\"title\":"), Err(ImportError::Json(_))));
    }

    #[test]
    fn test_blank_title_rejected() {
        assert!(matches!(Book::new(" ", vec![]), Err(ImportError::Schema(_))));
    }
}
