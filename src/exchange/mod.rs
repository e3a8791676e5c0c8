//! Exchange module - market data over HTTP
//!
//! A transport performs single GETs, the client adds bounded retries, and
//! venues know each exchange's URLs and payload shapes.

mod client;
mod transport;
pub mod venues;

pub use client::{detect_rejection, ExchangeClient, RejectionPolicy, RetryPolicy};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use venues::{venue_for, BinanceVenue, BybitVenue, Venue};

#[cfg(test)]
pub use transport::MockHttpTransport;
