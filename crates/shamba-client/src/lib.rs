//! Client side of the marketplace: a typed HTTP client, a query cache with
//! in-flight dedupe, session state and the per-page state machines.

pub mod cache;
pub mod client;
pub mod error;
pub mod filters;
pub mod forms;
pub mod routes;
pub mod screens;
pub mod session;

pub use cache::{QueryCache, QueryKey};
pub use client::MarketClient;
pub use error::{ClientError, Result};
pub use filters::FilterState;
pub use routes::Route;
pub use screens::{AppContext, Outcome, Toast, ViewState};
pub use session::{Session, SessionContext};
