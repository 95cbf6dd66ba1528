//! Maven repository over HTTP.
//!
//! Checksums come from the `.sha1` files next to each artifact; reverse
//! lookups use the Solr search API of the repository manager.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

use super::{Artifact, ArtifactCoordinates, Repository};
use crate::error::{RepositoryError, Result};
use crate::plan::{ArtifactType, Checksum, Version};

/// Default timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maven repository client.
#[derive(Debug, Clone)]
pub struct MavenRepository {
    /// HTTP client.
    client: Client,
    /// Base URL of the Maven layout.
    base_url: String,
    /// URL of the search endpoint.
    search_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    num_found: u64,
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    g: String,
    a: String,
    v: String,
    #[serde(default)]
    p: Option<String>,
}

impl MavenRepository {
    /// Maven Central.
    pub const DEFAULT_URL: &'static str = "https://repo1.maven.org/maven2";

    /// Maven Central search.
    pub const DEFAULT_SEARCH_URL: &'static str = "https://search.maven.org/solrsearch/select";

    /// Creates a client for Maven Central.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_urls(Self::DEFAULT_URL, Self::DEFAULT_SEARCH_URL, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client for another repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_urls(base_url: &str, search_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RepositoryError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            search_url: search_url.to_string(),
        })
    }

    /// URL of the artifact file in the Maven layout.
    #[must_use]
    pub fn artifact_url(&self, coordinates: &ArtifactCoordinates) -> String {
        let classifier = coordinates
            .classifier
            .as_ref()
            .map(|c| format!("-{c}"))
            .unwrap_or_default();
        format!(
            "{}/{}/{}/{}/{}-{}{}.{}",
            self.base_url,
            coordinates.group_id.replace('.', "/"),
            coordinates.artifact_id,
            coordinates.version,
            coordinates.artifact_id,
            coordinates.version,
            classifier,
            coordinates.artifact_type.type_name()
        )
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        trace!("GET {}", url);
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| RepositoryError::network(format!("Request to {url} failed: {e}")).into())
    }
}

#[async_trait]
impl Repository for MavenRepository {
    async fn resolve_artifact(&self, coordinates: &ArtifactCoordinates) -> Result<Option<Artifact>> {
        let url = format!("{}.sha1", self.artifact_url(coordinates));
        let response = self.get(&url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} not found in repository", coordinates);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RepositoryError::RequestFailed {
                status: response.status().as_u16(),
                message: url,
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| RepositoryError::network(format!("Failed to read checksum: {e}")))?;
        let sha1 = body
            .split_whitespace()
            .next()
            .filter(|s| s.len() == 40 && hex::decode(s).is_ok())
            .ok_or_else(|| RepositoryError::invalid_response(format!("malformed checksum file {url}")))?;

        Ok(Some(Artifact {
            group_id: coordinates.group_id.clone(),
            artifact_id: coordinates.artifact_id.clone(),
            version: coordinates.version.clone(),
            artifact_type: coordinates.artifact_type,
            classifier: coordinates.classifier.clone(),
            checksum: Checksum::new(sha1),
        }))
    }

    async fn lookup_by_checksum(&self, checksum: &Checksum) -> Result<Artifact> {
        let query = format!("1:\"{checksum}\"");
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query.as_str()), ("rows", "20"), ("wt", "json")])
            .send()
            .await
            .map_err(|e| RepositoryError::network(format!("Search failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RepositoryError::RequestFailed {
                status: response.status().as_u16(),
                message: format!("search for {checksum}"),
            }
            .into());
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| RepositoryError::invalid_response(format!("Failed to parse search response: {e}")))?;

        let found = search.response.num_found;
        let doc = search
            .response
            .docs
            .into_iter()
            .next()
            .filter(|_| found > 0)
            .ok_or_else(|| RepositoryError::UnknownChecksum {
                checksum: checksum.to_string(),
            })?;

        Ok(Artifact {
            group_id: doc.g,
            artifact_id: doc.a,
            version: Version::new(doc.v),
            artifact_type: doc
                .p
                .as_deref()
                .and_then(ArtifactType::from_name)
                .unwrap_or(ArtifactType::Unknown),
            classifier: None,
            checksum: checksum.clone(),
        })
    }

    async fn fetch_content(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        let url = self.artifact_url(&artifact.coordinates());
        let response = self.get(&url).await?;
        if !response.status().is_success() {
            return Err(RepositoryError::RequestFailed {
                status: response.status().as_u16(),
                message: url,
            }
            .into());
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RepositoryError::network(format!("Failed to download {url}: {e}")))?;
        debug!("Downloaded {} bytes for {}", bytes.len(), artifact.coordinates());
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployerError;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SHA1: &str = "0123456789abcdef0123456789abcdef01234567";

    fn coordinates() -> ArtifactCoordinates {
        ArtifactCoordinates {
            group_id: "org.foo".into(),
            artifact_id: "foo-war".into(),
            version: Version::new("1.0.0"),
            artifact_type: ArtifactType::War,
            classifier: None,
        }
    }

    async fn repository(server: &MockServer) -> MavenRepository {
        MavenRepository::with_urls(&server.uri(), &format!("{}/search", server.uri()), 5).expect("repository")
    }

    #[tokio::test]
    async fn test_artifact_url() {
        let server = MockServer::start().await;
        let repo = repository(&server).await;
        let mut coords = coordinates();
        assert_eq!(
            repo.artifact_url(&coords),
            format!("{}/org/foo/foo-war/1.0.0/foo-war-1.0.0.war", server.uri())
        );
        coords.classifier = Some("jdk11".into());
        assert!(repo.artifact_url(&coords).ends_with("foo-war-1.0.0-jdk11.war"));
    }

    #[tokio::test]
    async fn test_resolve_reads_sha1() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/foo/foo-war/1.0.0/foo-war-1.0.0.war.sha1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("{SHA1}  foo-war-1.0.0.war\n")))
            .mount(&server)
            .await;

        let artifact = repository(&server)
            .await
            .resolve_artifact(&coordinates())
            .await
            .expect("resolve")
            .expect("found");
        assert_eq!(artifact.checksum, Checksum::new(SHA1));
        assert_eq!(artifact.version, Version::new("1.0.0"));
    }

    #[tokio::test]
    async fn test_resolve_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let artifact = repository(&server).await.resolve_artifact(&coordinates()).await.expect("resolve");
        assert!(artifact.is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_checksum() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", format!("1:\"{SHA1}\"")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "numFound": 1,
                    "docs": [{"g": "org.foo", "a": "foo-war", "v": "1.0.0", "p": "war"}]
                }
            })))
            .mount(&server)
            .await;

        let artifact = repository(&server)
            .await
            .lookup_by_checksum(&Checksum::new(SHA1))
            .await
            .expect("lookup");
        assert_eq!(artifact.group_id, "org.foo");
        assert_eq!(artifact.artifact_type, ArtifactType::War);
    }

    #[tokio::test]
    async fn test_lookup_unknown_checksum() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 0, "docs": []}
            })))
            .mount(&server)
            .await;

        let err = repository(&server)
            .await
            .lookup_by_checksum(&Checksum::new(SHA1))
            .await
            .expect_err("unknown");
        assert!(matches!(err, DeployerError::Repository(RepositoryError::UnknownChecksum { .. })));
    }

    #[tokio::test]
    async fn test_fetch_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/foo/foo-war/1.0.0/foo-war-1.0.0.war"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
            .mount(&server)
            .await;

        let repo = repository(&server).await;
        let artifact = Artifact {
            group_id: "org.foo".into(),
            artifact_id: "foo-war".into(),
            version: Version::new("1.0.0"),
            artifact_type: ArtifactType::War,
            classifier: None,
            checksum: Checksum::new(SHA1),
        };
        assert_eq!(repo.fetch_content(&artifact).await.expect("content"), b"PK\x03\x04".to_vec());
    }
}
