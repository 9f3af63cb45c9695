//! Wire models shared between the ingestion backend and its clients.

pub mod model;
pub mod responses;
