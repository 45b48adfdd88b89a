use crate::adapters::http::WorkflowClient;
use crate::domain::model::{WorkflowActionSet, WorkflowSearchResult};
use crate::utils::error::{ImportError, Result};
use crate::utils::url::{append_timeout_params, SchemeRewrite};
use std::collections::HashMap;
use std::time::Duration;

/// Name of the workflow action that accepts a document upload.
pub const UPLOAD_ACTION: &str = "uploadDocumentWithoutTranslation";

pub const SORT_FIELD: &str = "lastUpdateTime";
pub const SORT_ORDER: &str = "desc";

/// Task code -> workflow type lookup. Built from configuration.
#[derive(Debug, Clone)]
pub struct WorkflowTypeMapper {
    mapping: HashMap<String, String>,
}

impl WorkflowTypeMapper {
    pub fn new(mapping: HashMap<String, String>) -> Self {
        Self { mapping }
    }

    pub fn workflow_type(&self, task_code: &str) -> Result<&str> {
        self.mapping
            .get(task_code)
            .map(String::as_str)
            .ok_or_else(|| ImportError::UnknownTask {
                task_code: task_code.to_string(),
            })
    }
}

/// Finds the most recently updated workflow for an identity and workflow type.
#[derive(Debug, Clone)]
pub struct WorkflowLocator {
    client: WorkflowClient,
    search_url: String,
    identity_param: String,
    rewrite: SchemeRewrite,
}

impl WorkflowLocator {
    pub fn new(
        client: WorkflowClient,
        search_url: impl Into<String>,
        identity_param: impl Into<String>,
        rewrite: SchemeRewrite,
    ) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            identity_param: identity_param.into(),
            rewrite,
        }
    }

    /// Returns the (scheme-rewritten) self link of the newest matching workflow.
    pub async fn locate(&self, identity: &str, workflow_type: &str) -> Result<String> {
        let query = [
            (self.identity_param.as_str(), identity),
            ("definition", workflow_type),
            ("sortField", SORT_FIELD),
            ("sortOrder", SORT_ORDER),
        ];
        let result: WorkflowSearchResult = self.client.get_json(&self.search_url, &query).await?;

        let href = result
            .most_recent_href()
            .ok_or_else(|| ImportError::WorkflowNotFound {
                identity: identity.to_string(),
                workflow_type: workflow_type.to_string(),
            })?;

        let workflow_href = self.rewrite.apply(href);
        tracing::info!("🔎 Found workflow {}", workflow_href);
        Ok(workflow_href)
    }
}

/// Reads a workflow's executable actions and resolves the upload target.
#[derive(Debug, Clone)]
pub struct WorkflowDetailFetcher {
    client: WorkflowClient,
    rewrite: SchemeRewrite,
    upload_timeout: Duration,
}

impl WorkflowDetailFetcher {
    pub fn new(client: WorkflowClient, rewrite: SchemeRewrite, upload_timeout: Duration) -> Self {
        Self {
            client,
            rewrite,
            upload_timeout,
        }
    }

    /// Upload URL for `workflow_href`, with the timeout parameters appended.
    pub async fn upload_href(&self, workflow_href: &str) -> Result<String> {
        let actions: WorkflowActionSet = self.client.get_json(workflow_href, &[]).await?;

        let target = actions
            .target_href(UPLOAD_ACTION)
            .ok_or_else(|| ImportError::NoUploadTransition {
                workflow_href: workflow_href.to_string(),
            })?;

        let upload_href = append_timeout_params(&self.rewrite.apply(target), self.upload_timeout)?;
        tracing::info!("📤 Upload document to {}", upload_href);
        Ok(upload_href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client() -> WorkflowClient {
        WorkflowClient::new(Some("Basic abc".to_string()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_mapper_known_and_unknown_tasks() {
        let mapper = WorkflowTypeMapper::new(HashMap::from([(
            "PUBLIC_RETIREMENT_ESTIMATION".to_string(),
            "Estimation".to_string(),
        )]));

        assert_eq!(
            mapper.workflow_type("PUBLIC_RETIREMENT_ESTIMATION").unwrap(),
            "Estimation"
        );
        let err = mapper.workflow_type("SOMETHING_ELSE").unwrap_err();
        assert!(matches!(err, ImportError::UnknownTask { ref task_code } if task_code == "SOMETHING_ELSE"));
    }

    #[tokio::test]
    async fn test_locate_uses_first_workflow_and_sort_parameters() {
        let server = MockServer::start_async().await;
        let search_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/workflows")
                    .query_param("identity", "01234567890")
                    .query_param("definition", "Estimation")
                    .query_param("sortField", "lastUpdateTime")
                    .query_param("sortOrder", "desc");
                then.status(200).json_body(serde_json::json!({
                    "_embedded": {"workflows": [
                        {"_links": {"self": {"href": "http://wf.local/workflows/9"}}},
                        {"_links": {"self": {"href": "http://wf.local/workflows/3"}}}
                    ]}
                }));
            })
            .await;

        let locator = WorkflowLocator::new(
            client(),
            server.url("/api/workflows"),
            "identity",
            SchemeRewrite::default(),
        );
        let href = locator.locate("01234567890", "Estimation").await.unwrap();

        search_mock.assert_async().await;
        assert_eq!(href, "http://wf.local/workflows/9");
    }

    #[tokio::test]
    async fn test_locate_rewrites_scheme_and_honours_identity_param() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search").query_param("niss", "01234567890");
                then.status(200).json_body(serde_json::json!({
                    "_embedded": {"workflows": [
                        {"_links": {"self": {"href": "http://wf.local/workflows/9"}}}
                    ]}
                }));
            })
            .await;

        let rewrite = SchemeRewrite::new(HashMap::from([("http".to_string(), "http4".to_string())]));
        let locator = WorkflowLocator::new(client(), server.url("/search"), "niss", rewrite);

        let href = locator.locate("01234567890", "Estimation").await.unwrap();
        assert_eq!(href, "http4://wf.local/workflows/9");
    }

    #[tokio::test]
    async fn test_locate_empty_result_is_workflow_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/workflows");
                then.status(200)
                    .json_body(serde_json::json!({"_embedded": {"workflows": []}}));
            })
            .await;

        let locator = WorkflowLocator::new(
            client(),
            server.url("/api/workflows"),
            "identity",
            SchemeRewrite::default(),
        );
        let err = locator.locate("01234567890", "Estimation").await.unwrap_err();

        assert!(matches!(err, ImportError::WorkflowNotFound { .. }));
    }

    #[tokio::test]
    async fn test_upload_href_found_with_timeouts() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/workflows/9");
                then.status(200).json_body(serde_json::json!({
                    "_forms": {"execute": [
                        {"_links": {"target": {"name": "close", "href": "http://wf.local/workflows/9/close"}}},
                        {"_links": {"target": {"name": "uploadDocumentWithoutTranslation",
                                                "href": "http://wf.local/workflows/9/transitions/4?form=upload"}}}
                    ]}
                }));
            })
            .await;

        let fetcher = WorkflowDetailFetcher::new(client(), SchemeRewrite::default(), Duration::from_secs(60));
        let href = fetcher.upload_href(&server.url("/workflows/9")).await.unwrap();

        assert_eq!(
            href,
            "http://wf.local/workflows/9/transitions/4?form=upload&connectionRequestTimeout=60000&connectTimeout=60000&socketTimeout=60000"
        );
    }

    #[tokio::test]
    async fn test_missing_upload_action_is_no_upload_transition() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/workflows/9");
                then.status(200).json_body(serde_json::json!({
                    "_forms": {"execute": [
                        {"_links": {"target": {"name": "close", "href": "http://wf.local/workflows/9/close"}}}
                    ]}
                }));
            })
            .await;

        let fetcher = WorkflowDetailFetcher::new(client(), SchemeRewrite::default(), Duration::from_secs(60));
        let err = fetcher.upload_href(&server.url("/workflows/9")).await.unwrap_err();

        assert!(matches!(err, ImportError::NoUploadTransition { .. }));
    }
}
