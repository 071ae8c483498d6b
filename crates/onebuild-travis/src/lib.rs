//! Travis API v3 implementation of the control-plane capability.
//!
//! One client per invocation, scoped to a single repository. Any
//! unexpected status code or decode failure surfaces as an error the
//! caller treats as fatal; there is no retry here.

use async_trait::async_trait;
use onebuild_core::{Build, BuildQuery, BuildState, ControlPlane, Error, Result, SortKey};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Client for the Travis API v3.
pub struct TravisClient {
    client: reqwest::Client,
    endpoint: Url,
    token: String,
    repo_slug: String,
}

impl TravisClient {
    pub fn new(endpoint: Url, token: String, repo_slug: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            token,
            repo_slug,
        }
    }

    /// Build the listing URL for a query.
    ///
    /// <https://developer.travis-ci.com/resource/builds#find>
    fn builds_url(&self, query: &BuildQuery) -> Result<Url> {
        let path = format!("/repo/{}/builds", urlencoding::encode(&self.repo_slug));
        let mut url = self
            .endpoint
            .join(&path)
            .map_err(|e| Error::Request(e.to_string()))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("build.event_type", &query.event_type);
            pairs.append_pair("build.branch", &query.branch);
            pairs.append_pair("sort_by", sort_param(query.sort));
            if !query.states.is_empty() {
                pairs.append_pair("build.state", &states_param(&query.states));
            }
            pairs.append_pair("limit", &query.limit.to_string());
        }

        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url.clone())
            .header("Travis-API-Version", "3")
            .header("Authorization", format!("token {}", self.token))
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(Error::Api(format!(
                "request to {} failed: {}",
                url,
                response.status()
            )));
        }

        response.json().await.map_err(|e| Error::Parse(e.to_string()))
    }

    async fn post_accepted(&self, path: &str) -> Result<()> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|e| Error::Request(e.to_string()))?;

        let response = self
            .client
            .post(url.clone())
            .header("Travis-API-Version", "3")
            .header("Authorization", format!("token {}", self.token))
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        // Cancel and restart acknowledge with 202; the state change
        // itself lands later.
        if response.status() != StatusCode::ACCEPTED {
            return Err(Error::Api(format!(
                "request to {} failed: {}",
                url,
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ControlPlane for TravisClient {
    async fn find(&self, query: &BuildQuery) -> Result<Build> {
        let url = self.builds_url(query)?;
        debug!(%url, "Listing builds");
        let page: BuildsPage = self.get_json(url).await?;
        page.builds.into_iter().next().ok_or(Error::NoMatch)
    }

    async fn cancel(&self, id: u64) -> Result<()> {
        debug!(id, "Requesting build cancellation");
        self.post_accepted(&format!("/build/{id}/cancel")).await
    }

    async fn restart(&self, id: u64) -> Result<()> {
        debug!(id, "Requesting build restart");
        self.post_accepted(&format!("/build/{id}/restart")).await
    }
}

/// One page of the builds listing.
///
/// <https://developer.travis-ci.com/resource/builds>
#[derive(Debug, Deserialize)]
struct BuildsPage {
    builds: Vec<Build>,
}

fn sort_param(sort: SortKey) -> &'static str {
    match sort {
        SortKey::StartedAt => "started_at",
        SortKey::IdDescending => "id:desc",
    }
}

fn states_param(states: &[BuildState]) -> String {
    states.iter().map(state_param).collect::<Vec<_>>().join(",")
}

fn state_param(state: &BuildState) -> &'static str {
    match state {
        BuildState::Created => "created",
        BuildState::Started => "started",
        BuildState::Passed => "passed",
        BuildState::Failed => "failed",
        BuildState::Errored => "errored",
        BuildState::Canceled => "canceled",
        BuildState::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn client() -> TravisClient {
        TravisClient::new(
            Url::parse("https://api.travis-ci.com").unwrap(),
            "secret".to_string(),
            "owner/repo".to_string(),
        )
    }

    #[test]
    fn builds_url_carries_filters_sort_and_limit() {
        let url = client()
            .builds_url(&BuildQuery::earliest_started("main", "push"))
            .unwrap();

        assert_eq!(url.path(), "/repo/owner%2Frepo/builds");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("build.event_type".into(), "push".into())));
        assert!(pairs.contains(&("build.branch".into(), "main".into())));
        assert!(pairs.contains(&("sort_by".into(), "started_at".into())));
        assert!(pairs.contains(&("build.state".into(), "started".into())));
        assert!(pairs.contains(&("limit".into(), "1".into())));
    }

    #[test]
    fn finished_states_join_with_commas() {
        let url = client()
            .builds_url(&BuildQuery::newest_finished("main", "push"))
            .unwrap();

        let state = url
            .query_pairs()
            .find(|(k, _)| k == "build.state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(state, "passed,failed,errored");

        let sort = url
            .query_pairs()
            .find(|(k, _)| k == "sort_by")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(sort, "id:desc");
    }

    #[test]
    fn any_state_query_omits_the_state_filter() {
        let url = client()
            .builds_url(&BuildQuery::newest("main", "push"))
            .unwrap();

        assert!(url.query_pairs().all(|(k, _)| k != "build.state"));
    }

    #[test]
    fn builds_page_decodes_provider_payload() {
        let page: BuildsPage = serde_json::from_str(
            r#"{
                "@type": "builds",
                "builds": [
                    {
                        "id": 42,
                        "number": "7",
                        "state": "started",
                        "started_at": "2019-03-04T05:06:07Z"
                    },
                    {
                        "id": 41,
                        "number": "6",
                        "state": "created",
                        "started_at": null
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(page.builds.len(), 2);
        let first = &page.builds[0];
        assert_eq!(first.id, 42);
        assert_eq!(first.state, BuildState::Started);
        assert_eq!(
            first.started_at,
            Some(Utc.with_ymd_and_hms(2019, 3, 4, 5, 6, 7).unwrap())
        );
        assert_eq!(page.builds[1].started_at, None);
    }
}
