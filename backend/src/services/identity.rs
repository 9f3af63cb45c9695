//! Caller identity forwarded by the authenticating gateway.

use crate::error::IngestError;
use crate::middleware::CorrelationId;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, Ready};

pub const ORG_HEADER: &str = "x-org-id";
pub const USER_HEADER: &str = "x-user-id";

/// The organization and user a request acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub org_id: i64,
    pub user_id: i64,
    /// `-` when the correlation middleware is not mounted.
    pub request_id: String,
}

fn header_id(req: &HttpRequest, name: &str) -> Option<i64> {
    req.headers()
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

impl FromRequest for Caller {
    type Error = IngestError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let request_id = req
            .extensions()
            .get::<CorrelationId>()
            .map(|c| c.0.clone())
            .unwrap_or_else(|| "-".to_string());

        match (header_id(req, ORG_HEADER), header_id(req, USER_HEADER)) {
            (Some(org_id), Some(user_id)) => ready(Ok(Caller {
                org_id,
                user_id,
                request_id,
            })),
            _ => ready(Err(IngestError::Authentication)),
        }
    }
}
