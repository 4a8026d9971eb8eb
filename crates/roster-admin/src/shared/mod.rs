//! Shared infrastructure for the admin crate.

pub mod api_common;
pub mod error;
pub mod flash;
pub mod i18n;
pub mod memory_store;
pub mod request;
pub mod sequence;
pub mod views;

pub use api_common::{Page, PageRequest, PagingLimits, SortDirection};
pub use error::{AdminError, ErrorResponse, Result};
