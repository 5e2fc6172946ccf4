//! Command-line arguments for the `ossfs` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{ConfigError, Credentials};
use crate::fs::FsConfig;

/// Mount an object-storage bucket as a read-only filesystem.
#[derive(Debug, Parser)]
#[command(name = "ossfs", version, about)]
pub struct Args {
    /// Access key id (requires --access-key and --endpoint)
    #[arg(short = 'i', long)]
    pub access_id: Option<String>,

    /// Access key secret
    #[arg(short = 'k', long)]
    pub access_key: Option<String>,

    /// Service endpoint, e.g. https://oss-cn-beijing.aliyuncs.com
    #[arg(short = 'e', long)]
    pub endpoint: Option<String>,

    /// Credentials file (default: ~/.ossfs/credentials.toml)
    #[arg(short = 'f', long)]
    pub credentials: Option<PathBuf>,

    /// Bucket to mount at startup
    #[arg(short = 'b', long)]
    pub bucket: String,

    /// Where to mount it
    #[arg(short = 'm', long)]
    pub mountpoint: PathBuf,

    /// Listing page size
    #[arg(long, default_value_t = 1000)]
    pub page_size: usize,

    /// Seconds a not-found answer is remembered
    #[arg(long, default_value_t = 3600)]
    pub negative_ttl_secs: u64,
}

impl Args {
    pub fn fs_config(&self) -> FsConfig {
        FsConfig {
            negative_ttl: Duration::from_secs(self.negative_ttl_secs),
            page_size: self.page_size,
            ..FsConfig::default()
        }
    }
}

/// Resolve credentials from the arguments: inline flags win over the
/// credentials file; a partial inline set is an error rather than a silent
/// fall-through.
pub fn resolve_credentials(args: &Args) -> Result<Credentials, ConfigError> {
    match (&args.access_id, &args.access_key, &args.endpoint) {
        (Some(id), Some(key), Some(endpoint)) => Ok(Credentials {
            access_id: id.clone(),
            access_key: key.clone(),
            endpoint: endpoint.clone(),
            region: None,
        }),
        (None, None, None) => {
            let path = match &args.credentials {
                Some(p) => p.clone(),
                None => Credentials::default_path()?,
            };
            Credentials::load(&path)
        }
        _ => Err(ConfigError::IncompleteInline),
    }
}
