use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ReleaseConfig;
use crate::error::{BuildError, Result};
use crate::release::{ReleaseHost, ReleaseRequest};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: String,
    upload_url: String,
    #[serde(default)]
    assets: Vec<AssetResponse>,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    id: u64,
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    name: &'a str,
    prerelease: bool,
    draft: bool,
}

/// Releases hosted on GitHub, through its REST API.
pub struct GitHubReleases {
    client: Client,
    api_url: String,
    token: Option<String>,
}

/// Strips the URI template suffix (`{?name,label}`) from an upload URL.
fn upload_endpoint(upload_url: &str) -> &str {
    match upload_url.find('{') {
        Some(idx) => &upload_url[..idx],
        None => upload_url,
    }
}

/// URL of the `rel="next"` entry of a `Link` header, if any.
///
/// `<https://api.github.com/...&page=2>; rel="next", <...>; rel="last"`
fn next_page_url(link: &str) -> Option<String> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';').map(str::trim);
        let url = parts.next()?.strip_prefix('<')?.strip_suffix('>')?;
        parts
            .any(|param| param == r#"rel="next""#)
            .then(|| url.to_string())
    })
}

/// Concatenates pages starting at `first`. `fetch` returns one page and the
/// URL of the next; an empty page or a missing next URL ends the walk.
fn collect_pages<F>(first: String, mut fetch: F) -> Result<Vec<String>>
where
    F: FnMut(&str) -> Result<(Vec<String>, Option<String>)>,
{
    let mut items = Vec::new();
    let mut url = Some(first);
    while let Some(current) = url.take() {
        let (page, next) = fetch(&current)?;
        if page.is_empty() {
            break;
        }
        items.extend(page);
        url = next;
    }
    Ok(items)
}

fn check_status(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(BuildError::release(format!(
        "{} failed with HTTP {}: {}",
        action,
        status,
        body.trim()
    )))
}

impl GitHubReleases {
    pub fn new(config: &ReleaseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(GitHubReleases {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token(),
        })
    }

    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            BuildError::release("no GitHub token available; set the configured token variable")
        })
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(USER_AGENT, concat!("esgf-build/", env!("CARGO_PKG_VERSION")));
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    fn release_by_tag(&self, slug: &str, tag: &str) -> Result<ReleaseResponse> {
        let url = format!("{}/repos/{}/releases/tags/{}", self.api_url, slug, tag);
        let response = self.request(self.client.get(&url)).send()?;
        let response = check_status(response, &format!("Fetching release {} of {}", tag, slug))?;
        Ok(response.json()?)
    }

    fn delete_asset(&self, slug: &str, asset: &AssetResponse) -> Result<()> {
        let url = format!("{}/repos/{}/releases/assets/{}", self.api_url, slug, asset.id);
        debug!("Deleting existing asset {} from {}", asset.name, slug);
        let response = self.request(self.client.delete(&url)).send()?;
        check_status(response, &format!("Deleting asset {}", asset.name))?;
        Ok(())
    }
}

impl ReleaseHost for GitHubReleases {
    /// Tags of all releases, following `Link: rel="next"` across pages.
    fn list_release_tags(&self, slug: &str) -> Result<Vec<String>> {
        let first = format!(
            "{}/repos/{}/releases?per_page={}",
            self.api_url, slug, PAGE_SIZE
        );
        collect_pages(first, |url| {
            debug!("Listing releases of {}: {}", slug, url);
            let response = self.request(self.client.get(url)).send()?;
            let response = check_status(response, &format!("Listing releases of {}", slug))?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_url);
            let releases: Vec<ReleaseResponse> = response.json()?;
            Ok((releases.into_iter().map(|r| r.tag_name).collect(), next))
        })
    }

    fn create_release(&self, slug: &str, request: &ReleaseRequest) -> Result<()> {
        self.token()?;
        let url = format!("{}/repos/{}/releases", self.api_url, slug);
        let body = CreateReleaseBody {
            tag_name: &request.tag,
            name: &request.name,
            prerelease: request.prerelease,
            draft: false,
        };
        let response = self.request(self.client.post(&url).json(&body)).send()?;
        check_status(response, &format!("Creating release {} of {}", request.tag, slug))?;
        info!("Created release {} for {}", request.tag, slug);
        Ok(())
    }

    fn upload_assets(&self, slug: &str, tag: &str, assets: &[PathBuf]) -> Result<()> {
        self.token()?;
        let release = self.release_by_tag(slug, tag)?;
        let endpoint = upload_endpoint(&release.upload_url).to_string();

        for path in assets {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    BuildError::release(format!("{} is not a file", path.display()))
                })?;

            if let Some(existing) = release.assets.iter().find(|a| a.name == name) {
                self.delete_asset(slug, existing)?;
            }

            let bytes = fs::read(path)?;
            info!("Uploading {} ({} bytes) to {} {}", name, bytes.len(), slug, tag);
            let response = self
                .request(
                    self.client
                        .post(&endpoint)
                        .query(&[("name", name.as_str())])
                        .header(CONTENT_TYPE, "application/octet-stream")
                        .body(bytes),
                )
                .send()?;
            check_status(response, &format!("Uploading {}", name))?;
        }
        Ok(())
    }
}
