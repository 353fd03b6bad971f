use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum StorageConfig {
    Local(LocalStorageConfig),
    Memory(MemoryStorageConfig),
    S3(S3StorageConfig),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalStorageConfig {
    pub directory: PathBuf,
    /// URL prefix the server mounts the directory under.
    #[serde(default = "default_local_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryStorageConfig {
    #[serde(default = "default_local_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3StorageConfig {
    pub bucket: String,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Defaults to `https://{bucket}.s3.amazonaws.com`.
    pub base_url: Option<String>,
}

impl S3StorageConfig {
    pub fn public_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", self.bucket))
    }
}

impl StorageConfig {
    pub fn local_directory(&self) -> Option<&PathBuf> {
        match self {
            StorageConfig::Local(local) => Some(&local.directory),
            _ => None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local(LocalStorageConfig {
            directory: PathBuf::from("data/photos"),
            base_url: default_local_base_url(),
        })
    }
}

fn default_local_base_url() -> String {
    "/photos".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_config() {
        let config: StorageConfig = toml_edit::de::from_str(
            r#"
provider = "local"
directory = "/var/lib/photoshare"
"#,
        )
        .unwrap();

        match config {
            StorageConfig::Local(local) => {
                assert_eq!(local.directory, PathBuf::from("/var/lib/photoshare"));
                assert_eq!(local.base_url, "/photos");
            }
            other => panic!("Expected local config, got {:?}", other),
        }
    }

    #[test]
    fn test_s3_default_base_url() {
        let config: StorageConfig = toml_edit::de::from_str(
            r#"
provider = "s3"
bucket = "whartonphotos"
region = "us-east-1"
"#,
        )
        .unwrap();

        match config {
            StorageConfig::S3(s3) => {
                assert_eq!(s3.public_base_url(), "https://whartonphotos.s3.amazonaws.com");
            }
            other => panic!("Expected s3 config, got {:?}", other),
        }
    }
}
