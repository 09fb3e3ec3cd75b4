use actix_web::{
    get, post,
    web::{route, Data, Json, JsonConfig, Path, PayloadConfig, Query},
    App, HttpResponse, HttpServer,
};
use bookshelf_api::{
    goodreads, google_api::GoogleAppState, library_thing, open_library::OpenLibraryAppState,
};
use serde::Deserialize;
use serde_json::Value;
use std::{
    env::var,
    error::Error,
    net::{Ipv4Addr, SocketAddrV4},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type E = Box<dyn Error>;

// 16Mib
const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024 * 16;

#[actix_web::main]
async fn main() -> Result<(), E> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port: u16 = var("FUNCTIONS_CUSTOMHANDLER_PORT")
        .ok()
        .and_then(|text| text.parse().ok())
        .unwrap_or(3000);

    let max_payload: usize = var("BOOKSHELF_MAX_PAYLOAD")
        .ok()
        .and_then(|text| text.parse().ok())
        .unwrap_or(DEFAULT_MAX_PAYLOAD);

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);

    let google_app_state = GoogleAppState::new(var("GOOGLE_APPKEY")?.as_str());
    let open_library_app_state = OpenLibraryAppState::new();

    info!(%addr, max_payload, "starting bookshelf api");

    HttpServer::new(move || {
        App::new()
            .app_data(PayloadConfig::new(max_payload))
            .app_data(JsonConfig::default().limit(max_payload))
            .app_data(Data::new(google_app_state.clone()))
            .app_data(Data::new(open_library_app_state.clone()))
            .service(goodreads_import)
            .service(library_thing_import)
            .service(book_query)
            .service(cover_get)
            .default_service(route().to(fallback))
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}

#[post("/import/goodreads")]
async fn goodreads_import(body: String) -> HttpResponse {
    match goodreads::parse_csv(&body) {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(err) => {
            warn!(%err, "goodreads import failed");
            HttpResponse::BadRequest().body(err.to_string())
        }
    }
}

#[post("/import/librarything")]
async fn library_thing_import(data: Json<Value>) -> HttpResponse {
    let result = library_thing::parse_export(&data);

    HttpResponse::Ok().json(result)
}

#[derive(Debug, Deserialize)]
struct BookQuery {
    filter: String,
    page_size: u32,
    page: u32,
}

#[get("/search")]
async fn book_query(query: Query<BookQuery>, google: Data<GoogleAppState>) -> HttpResponse {
    let Ok(result) = google.book_query(
        query.filter.as_str(),
        query.page_size,
        query.page
    ).await else {
        return HttpResponse::NotFound().body("failed to fetch data");
    };

    HttpResponse::Ok().json(result)
}

#[get("/cover/{_}")]
async fn cover_get(isbn: Path<String>, open_library: Data<OpenLibraryAppState>) -> HttpResponse {
    let Ok(cover) = open_library.cover_get(isbn.as_str()).await else {
        return HttpResponse::NotFound().body("failed to fetch cover");
    };

    HttpResponse::Ok()
        .content_type(cover.content_type)
        .body(cover.data)
}

async fn fallback() -> HttpResponse {
    HttpResponse::NotFound().body("no endpoint, but connection to api is successful.")
}
