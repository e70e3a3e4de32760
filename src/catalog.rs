//! Catalog API client: list pending work and report outcomes.
//!
//! The catalog is the system of record. It decides what is pending, hands the
//! worker one batch at a time, and receives exactly one outcome report per
//! item. Response shapes are validated here, at the boundary, so the
//! orchestration loop only ever sees typed [`WorkItem`]s.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;
use crate::error::CatalogError;

/// Longest failure reason forwarded to the catalog, in characters. Engine and
/// upload errors can dump page-sized diagnostics; the catalog stores a column,
/// not a log.
pub const MAX_REASON_CHARS: usize = 500;

/// Timeout applied to every catalog request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One unit of backlog work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkItem {
    /// Opaque unique identifier assigned by the catalog.
    pub id: String,
    /// Address to render.
    pub url: String,
}

/// One page of the pending backlog.
#[derive(Debug, Clone)]
pub struct PendingBatch {
    /// Items in this batch, in catalog order.
    pub items: Vec<WorkItem>,
    /// Total backlog size reported by the catalog.
    pub total: u64,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    success: bool,
    total: u64,
    items: Vec<WorkItem>,
}

/// Outcome report for one item.
///
/// Success and failure fields are mutually exclusive on the wire; the enum
/// makes a mixed payload unrepresentable.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportPayload {
    /// Artifact stored and publicly addressable.
    #[serde(rename_all = "camelCase")]
    Success {
        /// Public address of the stored artifact.
        screenshot_url: String,
        /// When processing finished.
        screenshot_updated_at: DateTime<Utc>,
    },
    /// Item failed somewhere in the pipeline.
    #[serde(rename_all = "camelCase")]
    Failure {
        /// Bounded failure reason.
        screenshot_error: String,
    },
}

impl ReportPayload {
    /// Success payload stamped with the completion time.
    pub fn success(public_url: String, completed_at: DateTime<Utc>) -> Self {
        Self::Success {
            screenshot_url: public_url,
            screenshot_updated_at: completed_at,
        }
    }

    /// Failure payload. The reason is truncated to [`MAX_REASON_CHARS`].
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            screenshot_error: truncate_reason(reason.into()),
        }
    }

    /// Whether this payload reports a stored artifact.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

fn truncate_reason(reason: String) -> String {
    if reason.chars().count() <= MAX_REASON_CHARS {
        reason
    } else {
        reason.chars().take(MAX_REASON_CHARS).collect()
    }
}

/// HTTP client for the catalog's two worker-facing operations.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl CatalogClient {
    /// Build a client from catalog settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    /// Fetch one batch of pending items.
    ///
    /// With `explicit_ids`, the catalog returns only matching items (possibly
    /// none). Without, it returns the next page of the backlog; an empty
    /// batch means the backlog is exhausted.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to the run: transport errors, non-success
    /// statuses, and responses the catalog itself flags as unsuccessful.
    pub async fn list_pending(
        &self,
        explicit_ids: Option<&[String]>,
    ) -> Result<PendingBatch, CatalogError> {
        let url = format!("{}/api/admin/captures/pending", self.base_url);
        let mut request = self.http.get(&url).bearer_auth(&self.api_token);
        if let Some(ids) = explicit_ids {
            request = request.query(&[("ids", ids.join(","))]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ListFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body: ListResponse = response.json().await?;
        if !body.success {
            return Err(CatalogError::ListRejected(
                "response carried success=false".to_string(),
            ));
        }

        Ok(PendingBatch {
            items: body.items,
            total: body.total,
        })
    }

    /// Report the outcome for one item.
    ///
    /// Safe to call once per item; the caller treats failures as that item's
    /// processing failure, never as a reason to stop the run.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn report(
        &self,
        item_id: &str,
        payload: &ReportPayload,
    ) -> Result<(), CatalogError> {
        let url = format!("{}/api/admin/captures/{}", self.base_url, item_id);
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.api_token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ReportFailed {
                item_id: item_id.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CatalogClient {
        CatalogClient::new(&CatalogConfig {
            base_url: server.uri(),
            api_token: "token-123".into(),
        })
        .unwrap()
    }

    fn pending_body(items: serde_json::Value) -> serde_json::Value {
        let count = items.as_array().map(|a| a.len()).unwrap_or_default();
        json!({ "success": true, "total": count, "items": items })
    }

    // -----------------------------------------------------------------------
    // ReportPayload wire shape
    // -----------------------------------------------------------------------

    #[test]
    fn success_payload_serializes_camel_case_with_no_error_field() {
        let completed = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let payload =
            ReportPayload::success("https://cdn.test/screenshots/a.jpg".into(), completed);

        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value,
            json!({
                "screenshotUrl": "https://cdn.test/screenshots/a.jpg",
                "screenshotUpdatedAt": "2024-05-01T12:00:00Z",
            })
        );
        assert!(value.get("screenshotError").is_none());
    }

    #[test]
    fn failure_payload_serializes_only_the_error_field() {
        let value = serde_json::to_value(ReportPayload::failure("navigation failed")).unwrap();

        assert_eq!(value, json!({ "screenshotError": "navigation failed" }));
        assert!(value.get("screenshotUrl").is_none());
        assert!(value.get("screenshotUpdatedAt").is_none());
    }

    #[test]
    fn failure_reason_is_truncated_to_the_bound() {
        let long_reason = "x".repeat(MAX_REASON_CHARS + 100);

        let ReportPayload::Failure { screenshot_error } = ReportPayload::failure(long_reason)
        else {
            panic!("failure() must build a Failure payload");
        };

        assert_eq!(screenshot_error.chars().count(), MAX_REASON_CHARS);
    }

    #[test]
    fn short_reason_is_kept_verbatim() {
        let ReportPayload::Failure { screenshot_error } = ReportPayload::failure("timed out")
        else {
            panic!("failure() must build a Failure payload");
        };

        assert_eq!(screenshot_error, "timed out");
    }

    // -----------------------------------------------------------------------
    // list_pending
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn list_pending_hits_the_pending_path_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/captures/pending"))
            .and(header("authorization", "Bearer token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pending_body(json!([
                { "id": "a", "url": "https://one.test" },
                { "id": "b", "url": "https://two.test" },
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let batch = client_for(&server).list_pending(None).await.unwrap();

        assert_eq!(batch.total, 2);
        assert_eq!(
            batch.items,
            vec![
                WorkItem {
                    id: "a".into(),
                    url: "https://one.test".into()
                },
                WorkItem {
                    id: "b".into(),
                    url: "https://two.test".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn list_pending_sends_explicit_ids_as_a_comma_joined_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/captures/pending"))
            .and(query_param("ids", "a,b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pending_body(json!([
                { "id": "a", "url": "https://one.test" },
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let ids = vec!["a".to_string(), "b".to_string()];
        let batch = client_for(&server).list_pending(Some(&ids)).await.unwrap();

        assert_eq!(batch.items.len(), 1, "catalog may return fewer than asked");
    }

    #[tokio::test]
    async fn list_pending_non_success_status_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/captures/pending"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_pending(None).await.unwrap_err();

        match err {
            CatalogError::ListFailed { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected ListFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_pending_rejects_success_false_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/captures/pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "total": 0, "items": [],
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).list_pending(None).await.unwrap_err();

        assert!(matches!(err, CatalogError::ListRejected(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn list_pending_rejects_malformed_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/captures/pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "total": 1, "items": [{ "id": "a" }],
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).list_pending(None).await.unwrap_err();

        assert!(matches!(err, CatalogError::Transport(_)), "got {err:?}");
    }

    // -----------------------------------------------------------------------
    // report
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn report_patches_the_item_path_with_the_exact_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/admin/captures/item-7"))
            .and(header("authorization", "Bearer token-123"))
            .and(body_json(json!({ "screenshotError": "capture failed" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .report("item-7", &ReportPayload::failure("capture failed"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn report_non_success_status_names_the_item() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/admin/captures/item-9"))
            .respond_with(ResponseTemplate::new(410).set_body_string("gone"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .report("item-9", &ReportPayload::failure("x"))
            .await
            .unwrap_err();

        match err {
            CatalogError::ReportFailed {
                item_id,
                status,
                body,
            } => {
                assert_eq!(item_id, "item-9");
                assert_eq!(status, 410);
                assert_eq!(body, "gone");
            }
            other => panic!("expected ReportFailed, got {other:?}"),
        }
    }
}
