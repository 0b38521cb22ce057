//! GitHub REST client.
//!
//! Branches and files go to the collector's fork (`owner/repository`); pull
//! requests, listings and searches target upstream (`base_owner/repository`).

use super::Hosting;
use crate::config::GitHubConfig;
use crate::error::{CollectorError, Result};
use crate::utils::truncate_for_log;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct GitRef {
    url: String,
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: HtmlUrl,
}

#[derive(Debug, Deserialize)]
struct HtmlUrl {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    html_url: String,
    user: Login,
}

#[derive(Debug, Deserialize)]
struct Login {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    clone_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    items: Vec<HtmlUrl>,
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubConfig,
    token: String,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig, token: impl Into<String>, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            config,
            token: token.into(),
        })
    }

    fn fork_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.config.api_base, self.config.owner, self.config.repository, tail
        )
    }

    fn upstream_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.config.api_base, self.config.base_owner, self.config.repository, tail
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Send and reject non-2xx answers with their body.
    async fn send(&self, action: &'static str, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::Hosting {
                action,
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, action: &'static str, request: RequestBuilder) -> Result<T> {
        Ok(self.send(action, request).await?.json::<T>().await?)
    }

    async fn try_create_branch(&self, name: &str) -> Result<String> {
        let base: GitRef = self
            .send_json(
                "read base branch",
                self.request(
                    Method::GET,
                    &self.fork_url(&format!("/git/ref/heads/{}", self.config.base_branch)),
                ),
            )
            .await?;
        let created: GitRef = self
            .send_json(
                "create branch",
                self.request(Method::POST, &self.fork_url("/git/refs")).json(&json!({
                    "ref": format!("refs/heads/{name}"),
                    "sha": base.object.sha,
                })),
            )
            .await?;
        Ok(created.url)
    }

    async fn try_create_file(&self, branch: &str, path: &str, content: &str, message: &str) -> Result<String> {
        let encoded_path = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let created: ContentResponse = self
            .send_json(
                "create file",
                self.request(Method::PUT, &self.fork_url(&format!("/contents/{encoded_path}")))
                    .json(&json!({
                        "message": message,
                        "content": STANDARD.encode(content),
                        "branch": branch,
                    })),
            )
            .await?;
        Ok(created.content.html_url)
    }

    async fn try_create_pull_request(&self, branch: &str, title: &str) -> Result<String> {
        let created: HtmlUrl = self
            .send_json(
                "open pull request",
                self.request(Method::POST, &self.upstream_url("/pulls")).json(&json!({
                    "title": title,
                    "head": format!("{}:{}", self.config.owner, branch),
                    "base": self.config.base_branch,
                    "body": format!("This article is collected by {}.", self.config.owner),
                    "maintainer_can_modify": true,
                })),
            )
            .await?;
        Ok(created.html_url)
    }
}

/// Log a best-effort failure and turn it into `None`.
fn best_effort(step: &'static str, result: Result<String>) -> Option<String> {
    match result {
        Ok(url) => {
            info!(step, %url, "Hosting step succeeded");
            Some(url)
        }
        Err(e) => {
            warn!(step, error = %e, "Hosting step failed");
            None
        }
    }
}

impl Hosting for GitHubClient {
    #[instrument(level = "info", skip(self))]
    async fn create_branch(&self, name: &str) -> Option<String> {
        best_effort("branch", self.try_create_branch(name).await)
    }

    #[instrument(level = "info", skip(self, content, message))]
    async fn create_file(&self, branch: &str, path: &str, content: &str, message: &str) -> Option<String> {
        best_effort("file", self.try_create_file(branch, path, content, message).await)
    }

    #[instrument(level = "info", skip(self))]
    async fn create_pull_request(&self, branch: &str, title: &str) -> Option<String> {
        best_effort("pull request", self.try_create_pull_request(branch, title).await)
    }

    #[instrument(level = "info", skip_all)]
    async fn list_open_pull_requests(&self) -> Result<Vec<String>> {
        let mut mine = Vec::new();
        for page in 1.. {
            let batch: Vec<PullRequest> = self
                .send_json(
                    "list pull requests",
                    self.request(Method::GET, &self.upstream_url("/pulls")).query(&[
                        ("state", "open".to_string()),
                        ("per_page", PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ]),
                )
                .await?;
            let full_page = batch.len() == PER_PAGE;
            mine.extend(
                batch
                    .into_iter()
                    .filter(|pr| pr.user.login.eq_ignore_ascii_case(&self.config.owner))
                    .map(|pr| pr.html_url),
            );
            if !full_page {
                break;
            }
        }
        debug!(count = mine.len(), "Listed open pull requests");
        Ok(mine)
    }

    #[instrument(level = "info", skip_all)]
    async fn delete_repository(&self) -> Result<()> {
        self.send("delete fork", self.request(Method::DELETE, &self.fork_url("")))
            .await?;
        info!(owner = %self.config.owner, repository = %self.config.repository, "Fork deleted");
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    async fn fork_repository(&self) -> Result<String> {
        let fork: Repository = self
            .send_json(
                "fork repository",
                self.request(Method::POST, &self.upstream_url("/forks")),
            )
            .await?;
        info!(clone_url = %fork.clone_url, "Repository forked");
        Ok(fork.clone_url)
    }

    #[instrument(level = "info", skip(self))]
    async fn search_first_match(&self, url: &str) -> Result<Option<String>> {
        let query = format!(
            "\"via: {url}\" repo:{}/{}",
            self.config.base_owner, self.config.repository
        );
        let results: SearchResults = self
            .send_json(
                "search code",
                self.request(Method::GET, &format!("{}/search/code", self.config.api_base))
                    .query(&[("q", query)]),
            )
            .await?;
        Ok(results.items.into_iter().next().map(|item| item.html_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubClient {
        let config = GitHubConfig {
            api_base: server.uri(),
            owner: "me".to_string(),
            ..GitHubConfig::default()
        };
        GitHubClient::new(config, "t0ken", "lctt_collector/test").unwrap()
    }

    #[tokio::test]
    async fn test_create_branch_from_base_tip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/me/TranslateProject/git/ref/heads/master"))
            .and(header("authorization", "Bearer t0ken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://api.github.com/repos/me/TranslateProject/git/refs/heads/master",
                "object": { "sha": "abc123" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/me/TranslateProject/git/refs"))
            .and(body_partial_json(json!({ "ref": "refs/heads/20240102-0-Hello", "sha": "abc123" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "url": "https://api.github.com/repos/me/TranslateProject/git/refs/heads/20240102-0-Hello",
                "object": { "sha": "abc123" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = client(&server).create_branch("20240102-0-Hello").await;
        assert_eq!(
            url.as_deref(),
            Some("https://api.github.com/repos/me/TranslateProject/git/refs/heads/20240102-0-Hello")
        );
    }

    #[tokio::test]
    async fn test_failed_steps_become_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
            .mount(&server)
            .await;

        let github = client(&server);
        assert_eq!(github.create_branch("b").await, None);
        assert_eq!(github.create_pull_request("b", "t").await, None);
    }

    #[tokio::test]
    async fn test_create_file_sends_base64_content() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/repos/me/TranslateProject/contents/sources/tech/.+\.md$"))
            .and(body_partial_json(json!({
                "message": "[手动选题][tech]: 20240102.0 a.md",
                "content": "IyBIZWxsbw==",
                "branch": "20240102-0-a",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "content": { "html_url": "https://github.com/me/TranslateProject/blob/x/sources/tech/a.md" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = client(&server)
            .create_file(
                "20240102-0-a",
                "sources/tech/20240102.0 a.md",
                "# Hello",
                "[手动选题][tech]: 20240102.0 a.md",
            )
            .await;
        assert_eq!(
            url.as_deref(),
            Some("https://github.com/me/TranslateProject/blob/x/sources/tech/a.md")
        );
    }

    #[tokio::test]
    async fn test_pull_request_targets_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/LCTT/TranslateProject/pulls"))
            .and(body_partial_json(json!({
                "head": "me:20240102-0-a",
                "base": "master",
                "body": "This article is collected by me.",
                "maintainer_can_modify": true,
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "html_url": "https://github.com/LCTT/TranslateProject/pull/1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = client(&server).create_pull_request("20240102-0-a", "title").await;
        assert_eq!(url.as_deref(), Some("https://github.com/LCTT/TranslateProject/pull/1"));
    }

    #[tokio::test]
    async fn test_list_open_pull_requests_keeps_own() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/LCTT/TranslateProject/pulls"))
            .and(query_param("state", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "html_url": "https://github.com/LCTT/TranslateProject/pull/1", "user": { "login": "me" } },
                { "html_url": "https://github.com/LCTT/TranslateProject/pull/2", "user": { "login": "other" } },
            ])))
            .mount(&server)
            .await;

        let open = client(&server).list_open_pull_requests().await.unwrap();
        assert_eq!(open, vec!["https://github.com/LCTT/TranslateProject/pull/1"]);
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).list_open_pull_requests().await.unwrap_err();
        assert!(matches!(err, CollectorError::Hosting { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_delete_and_fork() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/me/TranslateProject"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/LCTT/TranslateProject/forks"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "clone_url": "https://github.com/me/TranslateProject.git"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let github = client(&server);
        github.delete_repository().await.unwrap();
        assert_eq!(
            github.fork_repository().await.unwrap(),
            "https://github.com/me/TranslateProject.git"
        );
    }

    #[tokio::test]
    async fn test_search_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/code"))
            .and(query_param(
                "q",
                "\"via: https://news.itsfoss.com/a/\" repo:LCTT/TranslateProject",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "html_url": "https://github.com/LCTT/TranslateProject/blob/master/sources/tech/a.md" },
                    { "html_url": "https://github.com/LCTT/TranslateProject/blob/master/translated/tech/a.md" }
                ]
            })))
            .mount(&server)
            .await;

        let hit = client(&server)
            .search_first_match("https://news.itsfoss.com/a/")
            .await
            .unwrap();
        assert_eq!(
            hit.as_deref(),
            Some("https://github.com/LCTT/TranslateProject/blob/master/sources/tech/a.md")
        );
    }
}
