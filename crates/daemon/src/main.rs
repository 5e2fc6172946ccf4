use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use client::S3Client;

use ossfs_daemon::cli::{self, Args};
use ossfs_daemon::console::Console;
use ossfs_daemon::fuse::FuseBackend;
use ossfs_daemon::registry::{MountIdentity, MountRegistry};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let credentials = cli::resolve_credentials(&args).context("resolving credentials")?;
    let fs_config = args.fs_config();

    // FUSE callbacks arrive on fuser's own threads and bridge onto this
    // runtime; it must outlive every mounted session.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    let registry = Arc::new(MountRegistry::new(FuseBackend::new(rt.handle().clone())));

    let client = S3Client::connect(&credentials.s3_config(&args.bucket))
        .context("building object-store client")?;
    let identity = MountIdentity {
        access_id: credentials.access_id.clone(),
        bucket: args.bucket.clone(),
    };
    registry
        .mount(identity, Arc::new(client), &args.mountpoint, fs_config.clone())
        .with_context(|| {
            format!(
                "mounting {} at {}",
                args.bucket,
                args.mountpoint.display()
            )
        })?;
    println!("mounted {} at {}", args.bucket, args.mountpoint.display());

    let console = Console::new(registry.clone(), credentials, fs_config);
    let result = console.run();

    registry.unmount_all();
    result
}
