//! The JSON envelope wrapping every response body.
//!
//! ```text
//! {"status_code":200,"message":"Success","data":[...],"page":1,"limit":10,
//!  "total":42,"total_page":5,"next":2}
//! ```
//!
//! `data` is always an array; single resources are wrapped in a one-element
//! list. Pagination fields appear only on listings.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use pagination::{Page, PageInfo};
use serde::Serialize;

/// Standard response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status_code: u16,
    pub message: String,
    pub data: Vec<T>,
    #[serde(flatten)]
    pub pagination: Option<PageInfo>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: Vec<T>) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.into(),
            data,
            pagination: None,
        }
    }

    /// Envelope for one page of a listing.
    pub fn page(message: impl Into<String>, page: Page<T>) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: page.items,
            pagination: Some(page.info),
        }
    }

    /// Render as an HTTP response whose status matches `status_code`.
    pub fn into_response(self) -> HttpResponse {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::build(status).json(self)
    }
}

/// `200 OK` with `data`.
pub fn ok<T: Serialize>(message: &str, data: Vec<T>) -> HttpResponse {
    Envelope::new(StatusCode::OK, message, data).into_response()
}

/// `201 Created` with `data`.
pub fn created<T: Serialize>(message: &str, data: Vec<T>) -> HttpResponse {
    Envelope::new(StatusCode::CREATED, message, data).into_response()
}
