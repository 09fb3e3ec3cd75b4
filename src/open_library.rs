use actix_web::{http::header::CONTENT_TYPE, web::Bytes};
use anyhow::anyhow;
use awc::Client;
use std::error::Error;

type E = Box<dyn Error>;

/// Medium-sized cover image for an ISBN on the Open Library cover host.
pub fn cover_url(isbn: &str) -> String {
    format!("https://covers.openlibrary.org/b/isbn/{isbn}-M.jpg")
}

/// Raw image bytes plus the content type the host reported.
#[derive(Debug, Clone)]
pub struct Cover {
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Default, Clone)]
pub struct OpenLibraryAppState;

impl OpenLibraryAppState {
    pub fn new() -> Self {
        Self
    }

    pub async fn cover_get(&self, isbn: &str) -> Result<Cover, E> {
        let isbn: String = isbn.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

        let mut response = Client::default().get(cover_url(&isbn)).send().await?;

        if response.status().as_u16() != 200 {
            return Err(anyhow!("cover host answered {}", response.status()).into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|text| text.to_string());

        let data = response
            .body()
            .limit(1024 * 1024 * 8) // 8Mib
            .await?;

        Cover::new(content_type, data)
    }
}

impl Cover {
    fn new(content_type: Option<String>, data: Bytes) -> Result<Self, E> {
        if data.is_empty() {
            return Err(anyhow!("empty cover").into());
        }

        Ok(Cover {
            content_type: content_type.unwrap_or_else(|| "image/jpeg".to_string()),
            data,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{cover_url, Cover, OpenLibraryAppState};
    use actix_web::web::Bytes;

    #[test]
    fn test_cover_url() {
        assert_eq!(
            cover_url("0131103628"),
            "https://covers.openlibrary.org/b/isbn/0131103628-M.jpg"
        );
    }

    #[test]
    fn test_empty_cover_rejected() {
        assert!(Cover::new(Some("image/jpeg".to_string()), Bytes::new()).is_err());

        let cover = Cover::new(None, Bytes::from_static(b"\xff\xd8")).unwrap();
        assert_eq!(cover.content_type, "image/jpeg");
        assert_eq!(cover.data.len(), 2);
    }

    #[actix_web::test]
    #[ignore = "needs network access"]
    async fn test_cover_get() {
        let app = OpenLibraryAppState::new();

        let res = app.cover_get("9780131103627").await.unwrap();
        println!("cover: {} {} bytes", res.content_type, res.data.len());
    }
}
