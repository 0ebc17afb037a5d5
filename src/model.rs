use chrono::{DateTime, Utc};
use prometheus_client::encoding::EncodeLabelSet;
use serde::Deserialize;
use std::fmt;

/// A repository being monitored: `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoIdentity {
    pub owner: String,
    pub name: String,
}

impl RepoIdentity {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One search result: an open pull request as returned by the search API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
}

impl Issue {
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| label.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueLabel {
    pub name: String,
}

/// Facts extracted from a dependency-bump pull request title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyBump {
    pub library: String,
    pub language: String, // resolved from labels, empty when unknown
    pub from_version: String,
    pub to_version: String,
    pub directory: String, // empty means repository root
    pub security: bool,
}

/// Label set of the `open_pull_requests` gauge family.
///
/// Field order is the label order in the exposition output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
pub struct OpenPullRequestLabels {
    pub reponame: String,
    pub full_reponame: String,
    pub library: String,
    pub language: String,
    pub from_version: String,
    pub to_version: String,
    pub directory: String,
    pub security: String,
}

impl OpenPullRequestLabels {
    pub fn new(repo: &RepoIdentity, bump: DependencyBump) -> Self {
        Self {
            reponame: repo.name.clone(),
            full_reponame: repo.full_name(),
            library: bump.library,
            language: bump.language,
            from_version: bump.from_version,
            to_version: bump.to_version,
            directory: bump.directory,
            security: bump.security.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_deserializes_from_search_item() {
        let json = r#"{
            "number": 42,
            "title": "Bump jsdom from 12.2.0 to 16.3.0",
            "created_at": "2020-07-01T12:00:00Z",
            "state": "open",
            "labels": [{"id": 1, "name": "dependencies"}, {"id": 2, "name": "javascript"}]
        }"#;

        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.number, 42);
        assert_eq!(
            issue.label_names().collect::<Vec<_>>(),
            vec!["dependencies", "javascript"]
        );
        assert_eq!(issue.created_at.to_rfc3339(), "2020-07-01T12:00:00+00:00");
    }

    #[test]
    fn test_labels_render_security_as_string() {
        let repo = RepoIdentity::new("octo", "widgets");
        let bump = DependencyBump {
            library: "bar-lib".to_string(),
            language: "javascript".to_string(),
            from_version: "6.0.0".to_string(),
            to_version: "6.0.1".to_string(),
            directory: "bar-service".to_string(),
            security: true,
        };

        let labels = OpenPullRequestLabels::new(&repo, bump);
        assert_eq!(labels.reponame, "widgets");
        assert_eq!(labels.full_reponame, "octo/widgets");
        assert_eq!(labels.security, "true");
    }
}
