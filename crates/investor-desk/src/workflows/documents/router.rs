use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query},
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::{parse_document, ParsedDocument, MAX_DOCUMENT_BYTES};
use crate::error::AppError;

/// Router accepting raw document uploads (`?filename=` names the file).
pub fn documents_router() -> Router {
    Router::new()
        .route("/api/v1/documents/parse", post(parse_handler))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParseQuery {
    #[serde(default)]
    pub(crate) filename: Option<String>,
}

pub(crate) async fn parse_handler(
    Query(query): Query<ParseQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ParsedDocument>, AppError> {
    let file_name = query
        .filename
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "document".to_string());
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let parsed = parse_document(&file_name, content_type, &body)?;
    Ok(Json(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    async fn upload(uri: &str, content_type: &str, body: &'static str) -> Response {
        documents_router()
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .expect("request builds"),
            )
            .await
            .expect("route executes")
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn csv_upload_returns_markdown() {
        let response = upload(
            "/api/v1/documents/parse?filename=holdings.csv",
            "application/octet-stream",
            "Holder,Shares\nAda Park,120\n",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(
            payload["markdown"],
            "## Document Data\n\n| Holder | Shares |\n|---|---|\n| Ada Park | 120 |\n"
        );
        assert_eq!(payload["metadata"]["file_name"], "holdings.csv");
        assert_eq!(payload["metadata"]["file_type"], "text/csv");
    }

    #[tokio::test]
    async fn pdf_upload_reports_unavailable_conversion() {
        let response = upload(
            "/api/v1/documents/parse?filename=statement.pdf",
            "application/pdf",
            "%PDF-1.7",
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let payload = json_body(response).await;
        assert!(payload["error"]
            .as_str()
            .expect("error message")
            .contains("PDF conversion is not available"));
    }

    #[tokio::test]
    async fn unknown_upload_is_bad_request() {
        let response = upload("/api/v1/documents/parse", "text/plain", "hello").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
