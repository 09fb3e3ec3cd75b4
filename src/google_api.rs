use crate::models::Book;
use actix_web::web::Buf;
use awc::Client;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::error::Error;
use tracing::debug;

type E = Box<dyn Error>;

/// A search response from the Google Books volumes endpoint.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub total_items: u32,
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<Item>,
}

// one malformed item is dropped instead of failing the page
fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<Item>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(vec![]),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

// a present but wrong-typed field decodes as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_identifiers<'de, D>(deserializer: D) -> Result<Option<Vec<IndustryIdentifier>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };

    Ok(Some(
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
    ))
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum IndustryIdentifierType {
    #[serde(rename = "ISBN_10")]
    Isbn10,
    #[serde(rename = "ISBN_13")]
    Isbn13,
    #[serde(rename = "ISSN")]
    Issn,
    #[serde(rename = "OTHER", other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndustryIdentifier {
    #[serde(rename = "type")]
    pub kind: IndustryIdentifierType,
    pub identifier: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subtitle: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub authors: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub published_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub image_links: Option<ImageLinks>,
    #[serde(default, deserialize_with = "lenient_identifiers")]
    pub industry_identifiers: Option<Vec<IndustryIdentifier>>,
    #[serde(default, deserialize_with = "lenient")]
    pub page_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub publisher: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    pub small_thumbnail: Option<String>,
    pub thumbnail: Option<String>,
}

impl Item {
    /// Largest cover image the item links to.
    pub fn cover_url(&self) -> Option<&str> {
        let links = self.volume_info.image_links.as_ref()?;
        links
            .thumbnail
            .as_deref()
            .or(links.small_thumbnail.as_deref())
    }
}

/// Builds a book from a search item; `None` when the item has no title.
///
/// The year is the first four characters of the published date. Of several
/// identifiers of one type the last one is kept.
pub fn parse_book(item: &Item) -> Option<Book> {
    let info = &item.volume_info;
    let title = info.title.as_deref().filter(|text| !text.trim().is_empty())?;

    let year_published = info
        .published_date
        .as_deref()
        .and_then(|text| text.get(..4))
        .and_then(|text| text.parse().ok());

    let mut book = Book {
        title: title.to_string(),
        authors: info.authors.clone().unwrap_or_default(),
        year_published,
        publisher: info.publisher.clone(),
        number_of_pages: info.page_count,
        ..Book::default()
    };

    for identifier in info.industry_identifiers.iter().flatten() {
        match identifier.kind {
            IndustryIdentifierType::Isbn10 => book.isbn = Some(identifier.identifier.clone()),
            IndustryIdentifierType::Isbn13 => book.isbn13 = Some(identifier.identifier.clone()),
            IndustryIdentifierType::Issn | IndustryIdentifierType::Other => {}
        }
    }

    Some(book)
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct BookChunk {
    pub items: Vec<Book>,
    pub total_count: u32,
}

impl From<&SearchResponse> for BookChunk {
    fn from(val: &SearchResponse) -> Self {
        BookChunk {
            items: val.items.iter().filter_map(parse_book).collect(),
            total_count: val.total_items,
        }
    }
}

// widened so large page numbers cannot overflow
fn start_index(page_size: u32, page: u32) -> u64 {
    u64::from(page_size) * u64::from(page)
}

#[derive(Debug, Clone)]
pub struct GoogleAppState {
    appkey: String,
}

impl GoogleAppState {
    pub fn new(appkey: &str) -> Self {
        Self {
            appkey: appkey.to_string(),
        }
    }

    pub async fn search(&self, any: &str, page_size: u32, page: u32) -> Result<SearchResponse, E> {
        let start_record = start_index(page_size, page).to_string();
        let max_record = page_size.to_string();

        let reader = Client::default()
            .get("https://www.googleapis.com/books/v1/volumes")
            .query(&[
                ("key", self.appkey.as_str()),
                ("q", any),
                ("startIndex", start_record.as_str()),
                ("maxResults", max_record.as_str()),
            ])?
            .send()
            .await?
            .body()
            .await?
            .reader();

        let response: SearchResponse = serde_json::from_reader(reader)?;
        debug!(query = any, total = response.total_items, "google books search");

        Ok(response)
    }

    pub async fn book_query(&self, any: &str, page_size: u32, page: u32) -> Result<BookChunk, E> {
        let response = self.search(any, page_size, page).await?;
        Ok(BookChunk::from(&response))
    }
}

#[cfg(test)]
mod test {
    use super::{parse_book, start_index, BookChunk, GoogleAppState, SearchResponse};
    use serde_json::json;
    use std::env;

    fn response(volume_info: serde_json::Value) -> SearchResponse {
        serde_json::from_value(json!({
            "totalItems": 1,
            "items": [{ "id": "zyTCAlFPjgYC", "volumeInfo": volume_info }]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_book() {
        let res = response(json!({
            "title": "The Google Story",
            "subtitle": "Inside the Hottest Business",
            "authors": ["David A. Vise", "Mark Malseed"],
            "publisher": "Random House",
            "publishedDate": "2005-11-15",
            "pageCount": 207,
            "industryIdentifiers": [
                { "type": "ISBN_10", "identifier": "055380457X" },
                { "type": "ISBN_13", "identifier": "9780553804577" },
                { "type": "ISSN", "identifier": "1234-5678" }
            ],
            "imageLinks": {
                "smallThumbnail": "http://books.google.com/small",
                "thumbnail": "http://books.google.com/thumb"
            }
        }));

        let book = parse_book(&res.items[0]).unwrap();
        assert_eq!(book.title, "The Google Story");
        assert_eq!(book.authors, ["David A. Vise", "Mark Malseed"]);
        assert_eq!(book.publisher.as_deref(), Some("Random House"));
        assert_eq!(book.year_published, Some(2005));
        assert_eq!(book.number_of_pages, Some(207));
        assert_eq!(book.isbn.as_deref(), Some("055380457X"));
        assert_eq!(book.isbn13.as_deref(), Some("9780553804577"));
        assert_eq!(res.items[0].cover_url(), Some("http://books.google.com/thumb"));
    }

    #[test]
    fn test_missing_title() {
        let res = response(json!({ "authors": ["Anonymous"], "publishedDate": "2005" }));
        assert!(parse_book(&res.items[0]).is_none());

        let chunk = BookChunk::from(&res);
        assert!(chunk.items.is_empty());
        assert_eq!(chunk.total_count, 1);
    }

    #[test]
    fn test_last_identifier_wins() {
        let res = response(json!({
            "title": "Twice",
            "industryIdentifiers": [
                { "type": "ISBN_13", "identifier": "9780000000001" },
                { "type": "OTHER", "identifier": "UOM:39015" },
                { "type": "ISBN_13", "identifier": "9780000000002" }
            ]
        }));

        let book = parse_book(&res.items[0]).unwrap();
        assert_eq!(book.isbn, None);
        assert_eq!(book.isbn13.as_deref(), Some("9780000000002"));
    }

    #[test]
    fn test_unknown_identifier_type() {
        let res = response(json!({
            "title": "Odd",
            "industryIdentifiers": [{ "type": "DOI", "identifier": "10.1000/1" }]
        }));

        let book = parse_book(&res.items[0]).unwrap();
        assert_eq!(book.isbn, None);
        assert_eq!(book.isbn13, None);
    }

    #[test]
    fn test_year_published() {
        for (date, year) in [("2005-11-15", Some(2005)), ("1999", Some(1999)), ("199", None), ("c.1999", None)] {
            let res = response(json!({ "title": "Dated", "publishedDate": date }));
            assert_eq!(parse_book(&res.items[0]).unwrap().year_published, year, "{date}");
        }
    }

    #[test]
    fn test_malformed_item_dropped() {
        let res: SearchResponse = serde_json::from_value(json!({
            "totalItems": 2,
            "items": [
                { "id": "a", "volumeInfo": { "title": "Good" } },
                { "id": "b", "volumeInfo": "not an object" },
                42
            ]
        }))
        .unwrap();

        let chunk = BookChunk::from(&res);
        assert_eq!(chunk.items.len(), 1);
        assert_eq!(chunk.items[0].title, "Good");
        assert_eq!(chunk.total_count, 2);
    }

    #[test]
    fn test_malformed_fields_are_absent() {
        let res: SearchResponse = serde_json::from_value(json!({
            "totalItems": 2,
            "items": [
                { "id": "a", "volumeInfo": { "title": "Good" } },
                {
                    "id": "b",
                    "volumeInfo": {
                        "title": "Bad",
                        "pageCount": "lots",
                        "authors": "Someone",
                        "industryIdentifiers": [
                            { "type": "ISBN_13" },
                            { "type": "ISBN_10", "identifier": "055380457X" }
                        ]
                    }
                }
            ]
        }))
        .unwrap();

        let chunk = BookChunk::from(&res);
        assert_eq!(chunk.items.len(), 2);

        let bad = &chunk.items[1];
        assert_eq!(bad.title, "Bad");
        assert_eq!(bad.number_of_pages, None);
        assert!(bad.authors.is_empty());
        assert_eq!(bad.isbn13, None);
        assert_eq!(bad.isbn.as_deref(), Some("055380457X"));
    }

    #[test]
    fn test_start_index() {
        assert_eq!(start_index(20, 3), 60);
        assert_eq!(start_index(u32::MAX, u32::MAX), u64::from(u32::MAX) * u64::from(u32::MAX));
    }

    #[test]
    fn test_empty_response() {
        let res: SearchResponse = serde_json::from_value(json!({ "totalItems": 0 })).unwrap();
        assert!(res.items.is_empty());
    }

    #[actix_web::test]
    #[ignore = "needs GOOGLE_APPKEY and network access"]
    async fn test_google() {
        let appkey = env::var("GOOGLE_APPKEY").unwrap();
        let app = GoogleAppState::new(&appkey);

        let res = app.book_query("domain driven design", 20, 0).await.unwrap();
        println!("book query: \"{res:?}\"");
        println!("book query count: \"{:?}\"", res.items.len());
    }
}
