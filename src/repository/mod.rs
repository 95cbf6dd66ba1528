//! Artifact repository.
//!
//! Deployables are resolved by Maven coordinates to a checksum and content,
//! and live deployments are traced back to their coordinates by checksum.

mod maven;

pub use maven::MavenRepository;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::error::Result;
use crate::plan::{ArtifactType, Checksum, Version};

/// Coordinates of an artifact to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoordinates {
    /// Group id.
    pub group_id: String,
    /// Artifact id.
    pub artifact_id: String,
    /// Concrete version, never `CURRENT`.
    pub version: Version,
    /// Packaging.
    pub artifact_type: ArtifactType,
    /// Classifier.
    pub classifier: Option<String>,
}

impl fmt::Display for ArtifactCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.version, self.artifact_type
        )?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

/// A resolved artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Artifact {
    /// Group id.
    pub group_id: String,
    /// Artifact id.
    pub artifact_id: String,
    /// Version.
    pub version: Version,
    /// Packaging.
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    /// Classifier.
    pub classifier: Option<String>,
    /// SHA-1 of the content.
    pub checksum: Checksum,
}

impl Artifact {
    /// Group id of placeholder artifacts.
    pub const ERROR_GROUP_ID: &'static str = "*error*";

    /// Placeholder for a checksum that could not be traced back.
    #[must_use]
    pub fn unknown(checksum: Checksum, reason: impl Into<String>) -> Self {
        Self {
            group_id: Self::ERROR_GROUP_ID.to_string(),
            artifact_id: reason.into(),
            version: Version::new("unknown"),
            artifact_type: ArtifactType::Unknown,
            classifier: None,
            checksum,
        }
    }

    /// Returns true for placeholders.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.group_id == Self::ERROR_GROUP_ID
    }

    /// The coordinates of this artifact.
    #[must_use]
    pub fn coordinates(&self) -> ArtifactCoordinates {
        ArtifactCoordinates {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
            artifact_type: self.artifact_type,
            classifier: self.classifier.clone(),
        }
    }
}

/// Source of deployable artifacts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// Resolves coordinates to an artifact, `None` if there is none.
    async fn resolve_artifact(&self, coordinates: &ArtifactCoordinates) -> Result<Option<Artifact>>;

    /// Finds the artifact with the given checksum.
    async fn lookup_by_checksum(&self, checksum: &Checksum) -> Result<Artifact>;

    /// Downloads the content of an artifact.
    async fn fetch_content(&self, artifact: &Artifact) -> Result<Vec<u8>>;
}

/// Looks up a checksum, degrading every failure to [`Artifact::unknown`].
pub async fn lookup_or_unknown(repository: &dyn Repository, checksum: &Checksum) -> Artifact {
    if checksum.is_empty() {
        return Artifact::unknown(checksum.clone(), "empty checksum");
    }
    match repository.lookup_by_checksum(checksum).await {
        Ok(artifact) => artifact,
        Err(e) => {
            warn!("Cannot trace checksum {} to an artifact: {}", checksum, e);
            Artifact::unknown(checksum.clone(), "unknown")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_placeholder() {
        let mut repository = MockRepository::new();
        repository.expect_lookup_by_checksum().returning(|checksum| {
            Err(RepositoryError::UnknownChecksum {
                checksum: checksum.to_string(),
            }
            .into())
        });

        let artifact = lookup_or_unknown(&repository, &Checksum::new("abc123")).await;
        assert!(artifact.is_unknown());
        assert_eq!(artifact.artifact_id, "unknown");
        assert_eq!(artifact.checksum, Checksum::new("abc123"));
    }

    #[tokio::test]
    async fn test_empty_checksum_is_not_looked_up() {
        let mut repository = MockRepository::new();
        repository.expect_lookup_by_checksum().never();

        let artifact = lookup_or_unknown(&repository, &Checksum::new("")).await;
        assert_eq!(artifact.artifact_id, "empty checksum");
    }

    #[test]
    fn test_coordinates_display() {
        let coordinates = ArtifactCoordinates {
            group_id: "org.foo".into(),
            artifact_id: "foo-war".into(),
            version: Version::new("1.0.0"),
            artifact_type: ArtifactType::War,
            classifier: Some("jdk11".into()),
        };
        assert_eq!(coordinates.to_string(), "org.foo:foo-war:1.0.0:war:jdk11");
    }
}
