//! Reconciles book-collection data from spreadsheet exports, catalog JSON
//! exports and a search API into one canonical book model.

pub mod error;
pub mod goodreads;
pub mod google_api;
pub mod library_thing;
pub mod models;
pub mod open_library;
pub mod reading_history;
pub mod table;
