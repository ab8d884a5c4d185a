//! Typed async client for the Bullhorn REST API.
//!
//! ```no_run
//! # async fn run() -> bullhorn::Result<()> {
//! use bullhorn::{BullhornClient, SearchParams, types::Candidate};
//!
//! let client = BullhornClient::new(
//!     Some("session-token".to_string()),
//!     "https://rest123.bullhornstaffing.com/rest-services/1234/",
//! );
//! let candidates: Vec<Candidate> = client
//!     .search_all(&SearchParams::of::<Candidate>("isDeleted:0").fields("id,firstName").count(100))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod route;
pub mod types;

pub use client::{BullhornClient, QueryParams, SearchParams};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiFailure, Error, Result};
pub use route::{Method, ParamValue, Params, Route, TemplateError};
