use anyhow::Result;
use std::path::PathBuf;

/// `group:artifact:version[:classifier][@extension]` coordinate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenArtifact {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl MavenArtifact {
    pub fn parse(name: &str) -> Result<Self> {
        let (coords, extension) = match name.split_once('@') {
            Some((coords, ext)) => (coords, ext.to_string()),
            None => (name, "jar".to_string()),
        };

        let parts: Vec<&str> = coords.split(':').collect();
        if parts.len() < 3 || parts.iter().take(3).any(|p| p.is_empty()) {
            return Err(anyhow::anyhow!("Invalid maven coordinate: {}", name));
        }

        Ok(Self {
            group: parts[0].to_string(),
            artifact: parts[1].to_string(),
            version: parts[2].to_string(),
            classifier: parts.get(3).map(|c| c.to_string()),
            extension,
        })
    }

    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact, self.version, self.extension),
        }
    }

    /// Path under a `libraries/` root
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.group.split('.') {
            path.push(segment);
        }
        path.join(&self.artifact)
            .join(&self.version)
            .join(self.file_name())
    }

    /// Slash-separated path for repository URLs
    pub fn url_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version,
            self.file_name()
        )
    }

    pub fn url(&self, repository: &str) -> String {
        format!("{}/{}", repository.trim_end_matches('/'), self.url_path())
    }
}
