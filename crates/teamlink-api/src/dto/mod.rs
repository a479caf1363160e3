//! Request and response bodies for the JSON endpoints.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
