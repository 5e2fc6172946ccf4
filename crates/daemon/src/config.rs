//! Credential loading.
//!
//! Credentials come either inline from the CLI or from a TOML file
//! (`~/.ossfs/credentials.toml` by default):
//!
//! ```toml
//! access_id = "AKID..."
//! access_key = "secret"
//! endpoint = "https://oss-cn-beijing.aliyuncs.com"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use client::S3Config;

/// Account credentials and endpoint for the object store.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub access_id: String,
    pub access_key: String,
    pub endpoint: String,
    #[serde(default)]
    pub region: Option<String>,
}

impl Credentials {
    /// Default credentials file location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".ossfs").join("credentials.toml"))
            .ok_or(ConfigError::NoHome)
    }

    /// Load credentials from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Connection parameters for one bucket under this account.
    pub fn s3_config(&self, bucket: &str) -> S3Config {
        S3Config {
            endpoint: self.endpoint.clone(),
            access_key_id: self.access_id.clone(),
            secret_access_key: self.access_key.clone(),
            bucket: bucket.to_string(),
            region: self.region.clone(),
        }
    }
}

/// Errors loading credentials.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("credentials file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read credentials file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed credentials file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("--access-id requires --access-key and --endpoint")]
    IncompleteInline,

    #[error("no home directory; pass a credentials file explicitly")]
    NoHome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "access_id = \"AKID\"\naccess_key = \"secret\"\nendpoint = \"https://oss.example.com\""
        )
        .unwrap();

        let creds = Credentials::load(&path).unwrap();
        assert_eq!(creds.access_id, "AKID");
        assert_eq!(creds.region, None);

        let config = creds.s3_config("media");
        assert_eq!(config.bucket, "media");
        assert_eq!(config.endpoint, "https://oss.example.com");
    }

    #[test]
    fn missing_file_is_a_distinct_error() {
        let err = Credentials::load(Path::new("/nonexistent/credentials.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_file_fails_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(&path, "access_id = ").unwrap();

        let err = Credentials::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
