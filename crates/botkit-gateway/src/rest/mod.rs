//! Control channel: transport abstraction, HTTP implementation and routes

mod http;
#[cfg(test)]
pub(crate) mod recording;
pub mod routes;
mod transport;

pub use http::HttpTransport;
pub use transport::{FileAttachment, RestRequest, RestResponse, Transport};
