//! Integration pipeline: the studio session, overlay fetching and the
//! integrate / prompt-edit flows built on `carmod-core` and
//! `carmod-gemini`.

pub mod error;
pub mod fetch;
pub mod studio;

pub use error::IntegrateError;
pub use fetch::{BlobFetcher, HttpBlobFetcher};
pub use studio::{IntegrationOutcome, IntegrationTicket, Studio, StudioConfig, StudioResult, TicketKind};
