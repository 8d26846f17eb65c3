use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_LANGUAGE, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use hotel_ingestion::{PageQuery, DEFAULT_REVIEW_LIMIT, DEFAULT_REVIEW_SORT, MAX_REVIEW_LIMIT};

use crate::AppState;

/// RFC 7807 error body.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Problem {
    pub fn new(status: StatusCode, title: &str, detail: &str) -> Self {
        Self {
            kind: "about:blank".to_string(),
            title: title.to_string(),
            status: status.as_u16(),
            detail: Some(detail.to_string()),
        }
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_vec(&self).unwrap_or_default();
        (status, [(CONTENT_TYPE, "application/problem+json")], body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct HotelParams {
    lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewParams {
    limit: Option<String>,
}

pub async fn healthz() -> &'static str {
    "ok"
}

/// `fr` or `es` when the header starts with them, `en` otherwise.
pub fn select_lang(accept_language: &str) -> &'static str {
    let s = accept_language.trim().to_ascii_lowercase();
    if s.starts_with("fr") {
        "fr"
    } else if s.starts_with("es") {
        "es"
    } else {
        "en"
    }
}

/// Weak validator over the exact response bytes.
pub fn etag_for(body: &[u8]) -> String {
    format!("W/\"{:x}\"", Sha256::digest(body))
}

fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.split(',').map(str::trim).any(|tag| tag == etag || tag == "*"))
}

fn parse_id(raw: &str) -> Result<i64, Problem> {
    raw.parse::<i64>()
        .map_err(|_| Problem::new(StatusCode::BAD_REQUEST, "Invalid ID", "id must be a number"))
}

/// Serialize once, then answer 304 or 200 with `ETag` (and `Content-Language` when given).
fn conditional_json<T: Serialize>(headers: &HeaderMap, value: &T, language: Option<&str>) -> Response {
    let body = match serde_json::to_vec(value) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response body");
            return Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", "failed to encode response")
                .into_response();
        }
    };
    let etag = etag_for(&body);
    let etag_value = HeaderValue::from_str(&etag).ok();

    if if_none_match(headers, &etag) {
        let mut resp = StatusCode::NOT_MODIFIED.into_response();
        if let Some(v) = etag_value {
            resp.headers_mut().insert(ETAG, v);
        }
        return resp;
    }

    let mut resp = (StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response();
    if let Some(v) = etag_value {
        resp.headers_mut().insert(ETAG, v);
    }
    if let Some(lang) = language.and_then(|l| HeaderValue::from_str(l).ok()) {
        resp.headers_mut().insert(CONTENT_LANGUAGE, lang);
    }
    resp
}

pub async fn get_hotel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HotelParams>,
    headers: HeaderMap,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(problem) => return problem.into_response(),
    };
    let lang = params
        .lang
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| {
            let header = headers
                .get(axum::http::header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            select_lang(header).to_string()
        });

    match state.query.get_hotel(id, &lang).await {
        Ok(Some(view)) => conditional_json(&headers, &view, Some(&view.language)),
        Ok(None) => Problem::new(StatusCode::NOT_FOUND, "Not Found", "hotel not found").into_response(),
        Err(e) => {
            tracing::error!(property_id = id, error = %e, "Hotel lookup failed");
            Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", "hotel lookup failed")
                .into_response()
        }
    }
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ReviewParams>,
    headers: HeaderMap,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(problem) => return problem.into_response(),
    };
    let limit = match params.limit.as_deref() {
        None | Some("") => DEFAULT_REVIEW_LIMIT,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if (1..=MAX_REVIEW_LIMIT).contains(&n) => n,
            _ => {
                return Problem::new(
                    StatusCode::BAD_REQUEST,
                    "Invalid limit",
                    "limit must be an integer between 1 and 200",
                )
                .into_response()
            }
        },
    };

    let page = PageQuery { limit, sort: DEFAULT_REVIEW_SORT.to_string() };
    match state.query.list_reviews(id, &page).await {
        Ok(result) => conditional_json(&headers, &result, None),
        Err(e) => {
            tracing::error!(property_id = id, error = %e, "Review listing failed");
            Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", "review listing failed")
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_negotiation() {
        assert_eq!(select_lang("fr-FR,fr;q=0.9"), "fr");
        assert_eq!(select_lang("ES"), "es");
        assert_eq!(select_lang("de-DE"), "en");
        assert_eq!(select_lang(""), "en");
    }

    #[test]
    fn etag_is_weak_sha256() {
        let tag = etag_for(b"{}");
        assert!(tag.starts_with("W/\"") && tag.ends_with('"'));
        assert_eq!(tag.len(), 3 + 64 + 1);
        assert_eq!(tag, etag_for(b"{}"));
        assert_ne!(tag, etag_for(b"[]"));
    }

    #[test]
    fn if_none_match_accepts_lists_and_wildcard() {
        let mut headers = HeaderMap::new();
        assert!(!if_none_match(&headers, "W/\"a\""));
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("W/\"b\", W/\"a\""));
        assert!(if_none_match(&headers, "W/\"a\""));
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(if_none_match(&headers, "W/\"z\""));
    }
}
