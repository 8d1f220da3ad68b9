pub mod api;
pub mod models;

pub use models::{Page, PAGE_SIZE};
