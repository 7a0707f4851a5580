//! HTTPS backend for the control plane REST API.
//!
//! Requests authenticate with an API key sent as `Authorization: apk <key>`.
//! Reads (including the search endpoints) are retried with backoff; calls
//! that create jobs are sent exactly once.

use crate::backend::Backend;
use crate::error::Result;
use crate::retry::{RetryConfig, with_retry};
use crate::types::{
    CreatedEnvironment, DSource, Environment, EnvironmentCreateParams, EnvironmentUpdateParams,
    EnvironmentUser, EnvironmentUserParams, HostUpdateParams, Job, Source, Tag, Vdb,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Page size requested from the search endpoints.
const SEARCH_LIMIT: u32 = 1000;

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL, e.g. `https://dct.example.com/v3`.
    pub base_url: String,
    /// API key.
    pub api_key: String,
    /// Global timeout for a single request.
    pub timeout: Duration,
    /// Retry policy for reads.
    pub retry: RetryConfig,
}

/// Backend talking to a live control plane.
///
/// # Example
///
/// ```no_run
/// use dctkit::backend::Backend;
/// use dctkit::backend::http::{HttpBackend, HttpConfig};
/// use dctkit::RetryConfig;
/// use std::time::Duration;
///
/// let backend = HttpBackend::new(HttpConfig {
///     base_url: "https://dct.example.com/v3".to_string(),
///     api_key: "1.secret".to_string(),
///     timeout: Duration::from_secs(30),
///     retry: RetryConfig::default(),
/// });
/// let env = backend.get_environment("1-UNIX_HOST_ENVIRONMENT-1").unwrap();
/// println!("{} has {} hosts", env.name, env.hosts.len());
/// ```
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
    retry: RetryConfig,
}

#[derive(Deserialize)]
struct JobResponse {
    job: Job,
}

#[derive(Deserialize)]
struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Default, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<EnvironmentUser>,
}

#[derive(Serialize)]
struct SearchBody {
    filter_expression: String,
}

#[derive(Serialize)]
struct TagsBody<'a> {
    tags: &'a [Tag],
}

#[derive(Serialize)]
struct EmptyBody {}

impl HttpBackend {
    /// Create a backend from connection settings.
    #[must_use]
    pub fn new(config: HttpConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authorization: format!("apk {}", config.api_key),
            retry: config.retry,
        }
    }

    /// Get the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        with_retry(&self.retry, &format!("GET {path}"), || {
            log::trace!("GET {url}");
            Ok(self
                .agent
                .get(&url)
                .header("Authorization", &self.authorization)
                .header("Accept", "application/json")
                .call()?
                .body_mut()
                .read_json()?)
        })
    }

    /// Run a search, following the pagination cursor until the last page.
    fn search<T: DeserializeOwned>(&self, path: &str, filter: String) -> Result<Vec<T>> {
        let body = SearchBody {
            filter_expression: filter,
        };
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        let url = self.url(path);
        let limit = SEARCH_LIMIT.to_string();
        loop {
            let page: ItemsResponse<T> = with_retry(&self.retry, &format!("POST {path}"), || {
                log::trace!("POST {url} filter={}", body.filter_expression);
                let mut request = self
                    .agent
                    .post(&url)
                    .query("limit", &limit)
                    .header("Authorization", &self.authorization)
                    .header("Accept", "application/json");
                if let Some(cursor) = &cursor {
                    request = request.query("cursor", cursor);
                }
                Ok(request.send_json(&body)?.body_mut().read_json()?)
            })?;
            items.extend(page.items);

            match page.response_metadata.next_cursor {
                Some(next) if !next.is_empty() && cursor.as_deref() != Some(next.as_str()) => {
                    log::debug!("POST {path}: {} item(s) so far, fetching next page", items.len());
                    cursor = Some(next);
                }
                _ => return Ok(items),
            }
        }
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        log::trace!("POST {url}");
        Ok(self
            .agent
            .post(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .send_json(body)?
            .body_mut()
            .read_json()?)
    }

    fn post_job<B: Serialize>(&self, path: &str, body: &B) -> Result<Job> {
        let response: JobResponse = self.post(path, body)?;
        Ok(response.job)
    }

    fn patch_job<B: Serialize>(&self, path: &str, body: &B) -> Result<Job> {
        let url = self.url(path);
        log::trace!("PATCH {url}");
        let response: JobResponse = self
            .agent
            .patch(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .send_json(body)?
            .body_mut()
            .read_json()?;
        Ok(response.job)
    }
}

/// Quote values for a filter expression.
fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "\\'"))
}

impl Backend for HttpBackend {
    fn create_environment(&self, params: &EnvironmentCreateParams) -> Result<CreatedEnvironment> {
        self.post("/environments", params)
    }

    fn get_environment(&self, environment_id: &str) -> Result<Environment> {
        self.get(&format!("/environments/{environment_id}"))
    }

    fn update_environment(
        &self,
        environment_id: &str,
        params: &EnvironmentUpdateParams,
    ) -> Result<Job> {
        self.patch_job(&format!("/environments/{environment_id}"), params)
    }

    fn delete_environment(&self, environment_id: &str) -> Result<Job> {
        let url = self.url(&format!("/environments/{environment_id}"));
        log::trace!("DELETE {url}");
        let response: JobResponse = self
            .agent
            .delete(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .call()?
            .body_mut()
            .read_json()?;
        Ok(response.job)
    }

    fn list_environment_users(&self, environment_id: &str) -> Result<Vec<EnvironmentUser>> {
        let response: UsersResponse = self.get(&format!("/environments/{environment_id}/users"))?;
        Ok(response.users)
    }

    fn update_environment_user(
        &self,
        environment_id: &str,
        user_ref: &str,
        params: &EnvironmentUserParams,
    ) -> Result<Job> {
        let url = self.url(&format!("/environments/{environment_id}/users/{user_ref}"));
        log::trace!("PUT {url}");
        let response: JobResponse = self
            .agent
            .put(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .send_json(params)?
            .body_mut()
            .read_json()?;
        Ok(response.job)
    }

    fn update_host(
        &self,
        environment_id: &str,
        host_id: &str,
        params: &HostUpdateParams,
    ) -> Result<Job> {
        self.patch_job(
            &format!("/environments/{environment_id}/hosts/{host_id}"),
            params,
        )
    }

    fn create_tags(&self, environment_id: &str, tags: &[Tag]) -> Result<()> {
        let _: serde_json::Value = self.post(
            &format!("/environments/{environment_id}/tags"),
            &TagsBody { tags },
        )?;
        Ok(())
    }

    fn delete_all_tags(&self, environment_id: &str) -> Result<()> {
        let url = self.url(&format!("/environments/{environment_id}/tags/delete"));
        log::trace!("POST {url}");
        self.agent
            .post(&url)
            .header("Authorization", &self.authorization)
            .send_json(&EmptyBody {})?;
        Ok(())
    }

    fn list_vdbs_by_environment(&self, environment_id: &str) -> Result<Vec<Vdb>> {
        self.search(
            "/vdbs/search",
            format!("environment_id EQ {}", quoted(environment_id)),
        )
    }

    fn list_sources_by_environment(&self, environment_id: &str) -> Result<Vec<Source>> {
        self.search(
            "/sources/search",
            format!("environment_id EQ {}", quoted(environment_id)),
        )
    }

    fn search_dsources(&self, source_ids: &[String]) -> Result<Vec<DSource>> {
        if source_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = source_ids.iter().map(|id| quoted(id)).collect();
        self.search(
            "/dsources/search",
            format!("source_id IN [{}]", ids.join(", ")),
        )
    }

    fn enable_vdb(&self, vdb_id: &str) -> Result<Job> {
        self.post_job(&format!("/vdbs/{vdb_id}/enable"), &EmptyBody {})
    }

    fn disable_vdb(&self, vdb_id: &str) -> Result<Job> {
        self.post_job(&format!("/vdbs/{vdb_id}/disable"), &EmptyBody {})
    }

    fn enable_dsource(&self, dsource_id: &str) -> Result<Job> {
        self.post_job(&format!("/dsources/{dsource_id}/enable"), &EmptyBody {})
    }

    fn disable_dsource(&self, dsource_id: &str) -> Result<Job> {
        self.post_job(&format!("/dsources/{dsource_id}/disable"), &EmptyBody {})
    }

    fn get_job(&self, job_id: &str) -> Result<Job> {
        self.get(&format!("/jobs/{job_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(HttpConfig {
            base_url: base_url.to_string(),
            api_key: "1.abc".to_string(),
            timeout: Duration::from_secs(1),
            retry: RetryConfig::no_retry(),
        })
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = backend("https://dct.example.com/v3/");
        assert_eq!(backend.base_url(), "https://dct.example.com/v3");
        assert_eq!(
            backend.url("/jobs/1"),
            "https://dct.example.com/v3/jobs/1"
        );
    }

    #[test]
    fn test_authorization_header_format() {
        assert_eq!(backend("http://x").authorization, "apk 1.abc");
    }

    #[test]
    fn test_quoted_filter_values() {
        assert_eq!(quoted("1-ENV"), "'1-ENV'");
        assert_eq!(quoted("o'brien"), "'o\\'brien'");
    }

    #[test]
    fn test_job_response_decodes() {
        let response: JobResponse =
            serde_json::from_str(r#"{"job":{"id":"j1","status":"STARTED"}}"#).unwrap();
        assert_eq!(response.job.id, "j1");
    }

    #[test]
    fn test_items_response_decodes_cursor() {
        let page: ItemsResponse<Vdb> = serde_json::from_str(
            r#"{"items":[{"id":"V1","environment_id":"E1"}],"response_metadata":{"next_cursor":"abc"}}"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.response_metadata.next_cursor.as_deref(), Some("abc"));

        let last: ItemsResponse<Vdb> = serde_json::from_str(r#"{"response_metadata":{}}"#).unwrap();
        assert!(last.items.is_empty());
        assert!(last.response_metadata.next_cursor.is_none());
    }

    #[test]
    fn test_search_dsources_empty_skips_request() {
        let backend = backend("http://127.0.0.1:1");
        assert!(backend.search_dsources(&[]).unwrap().is_empty());
    }
}
