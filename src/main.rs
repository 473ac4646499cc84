//! fenix-inject - assemble a Fenix addon-collection manifest and write it
//! into the browser's private extension cache over adb.
//!
//! Main entry point: CLI dispatch and the build/inject orchestration.

mod cli;
mod payload;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fenix_inject_bridge::{with_session, AdbBridge, Fwmark};
use fenix_inject_catalog::{assemble, is_expired, CatalogClient, ManifestDocument};
use fenix_inject_config::{Config, ConfigLoader, SourceTable};
use fenix_inject_rdp::{
    resolve_main_process, DebuggerClient, TransportAddress, FRAME_WAIT, GECKOVIEW_ROOT_URL,
};

use cli::{Cli, Commands};

/// Stock collection used when no sources are configured.
const DEFAULT_COLLECTION_OWNER: &str = "16201230";
const DEFAULT_COLLECTION_NAME: &str = "What-I-want-on-Fenix";

/// Initialize tracing to stderr so stdout stays clean for `build -`.
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (mut config, config_path) = load_config(cli.config.clone())?;
    if let Some(device) = &cli.device {
        config.device = Some(device.clone());
    }
    if let Some(app) = &cli.app {
        config.app = app.clone();
    }
    ensure_default_source(&mut config);

    match cli.command {
        Some(Commands::Build { file }) => build(&config, file).await,
        Some(Commands::Inject { file }) => {
            let path = file.unwrap_or_else(|| config.resolved_output_path());
            inject(&config, &path).await
        }
        Some(Commands::Run) | None => {
            let path = ensure_manifest(&config, config_path.as_deref(), cli.force).await?;
            inject(&config, &path).await
        }
    }
}

/// Load `--config`, or the default path when it exists, or built-in
/// defaults.
fn load_config(flag: Option<PathBuf>) -> anyhow::Result<(Config, Option<PathBuf>)> {
    let path = match flag {
        Some(path) => path,
        None => {
            let path = ConfigLoader::default_path();
            if !path.exists() {
                debug!("no config file; using defaults");
                return Ok((Config::default(), None));
            }
            path
        }
    };
    let config = ConfigLoader::load(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    Ok((config, Some(path)))
}

/// Without configured sources, fall back to the stock collection.
fn ensure_default_source(config: &mut Config) {
    if !config.use_sources.is_empty() {
        return;
    }
    info!(
        "no sources configured; using collection {}/{}",
        DEFAULT_COLLECTION_OWNER, DEFAULT_COLLECTION_NAME
    );
    config.sources.insert(
        "default-collection".to_string(),
        SourceTable {
            kind: Some("collection".to_string()),
            owner: Some(DEFAULT_COLLECTION_OWNER.to_string()),
            collection: Some(DEFAULT_COLLECTION_NAME.to_string()),
            ..Default::default()
        },
    );
    config.use_sources.push("default-collection".to_string());
}

/// `build [FILE]`: assemble and write, `-` streaming to stdout.
async fn build(config: &Config, file: Option<PathBuf>) -> anyhow::Result<()> {
    let document = assemble(config, &CatalogClient::new()).await?;
    let serialized = serde_json::to_string(&document)?;
    match file {
        Some(path) if path.as_os_str() == "-" => println!("{serialized}"),
        Some(path) => write_manifest(&path, &serialized)?,
        None => write_manifest(&config.resolved_output_path(), &serialized)?,
    }
    Ok(())
}

fn write_manifest(path: &Path, serialized: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serialized)
        .with_context(|| format!("writing manifest to {}", path.display()))?;
    info!(path = %path.display(), "wrote manifest");
    Ok(())
}

/// Rebuild the cached manifest when forced or stale; return its path.
async fn ensure_manifest(
    config: &Config,
    config_path: Option<&Path>,
    force: bool,
) -> anyhow::Result<PathBuf> {
    let path = config.resolved_output_path();
    if force || is_expired(&path, config, config_path)? {
        let document = assemble(config, &CatalogClient::new()).await?;
        write_manifest(&path, &serde_json::to_string(&document)?)?;
    } else {
        info!(path = %path.display(), "using cached manifest");
    }
    Ok(path)
}

/// Ship the manifest into the target app through the debugging bridge.
async fn inject(config: &Config, manifest_path: &Path) -> anyhow::Result<()> {
    let manifest = fs::read_to_string(manifest_path)
        .with_context(|| format!("reading manifest from {}", manifest_path.display()))?;
    // validate before shipping it into the target
    serde_json::from_str::<ManifestDocument>(&manifest)
        .with_context(|| format!("{} is not a manifest document", manifest_path.display()))?;

    let script = payload::build_eval_script(&manifest, &config.app, config.fixup_addon_data)?;

    let fwmark = match config.no_fwmark.resolved() {
        Some(true) => Fwmark::On,
        Some(false) => Fwmark::Off,
        None => Fwmark::Auto,
    };
    let bridge = AdbBridge::new(fwmark, config.device.as_deref()).await;
    let app = config.app.clone();

    let summary = with_session(&bridge, &config.app, |socket| {
        let bridge = bridge.clone();
        let app = app.clone();
        async move {
            let addr = TransportAddress::LocalSocket { path: socket };
            let client = Arc::new(DebuggerClient::connect(&addr).await?);
            let target = resolve_main_process(client).await?;
            if !target.has_frame(GECKOVIEW_ROOT_URL).await? {
                info!("no browser frame yet; launching {app}");
                bridge.launch_app(&app).await?;
                target.wait_for_frame(GECKOVIEW_ROOT_URL, FRAME_WAIT).await?;
            }
            info!("executing manifest write in the target");
            Ok::<_, anyhow::Error>(target.evaluate_js(&script).await?)
        }
    })
    .await?;

    let summary = match summary.as_str() {
        Some(text) => text.to_string(),
        None => summary.to_string(),
    };
    if summary == payload::NO_CACHE_SENTINEL {
        bail!(
            "{} has no addon collection cache to overwrite; open the browser's add-ons \
             screen once, then retry",
            config.app
        );
    }
    println!("{summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_source_installed_when_unconfigured() {
        let mut config = Config::default();
        ensure_default_source(&mut config);
        assert_eq!(config.use_sources, vec!["default-collection"]);
        let table = &config.sources["default-collection"];
        assert_eq!(table.kind.as_deref(), Some("collection"));
        assert_eq!(table.owner.as_deref(), Some(DEFAULT_COLLECTION_OWNER));
        // and it resolves cleanly
        config.resolve_source("default-collection").unwrap();
    }

    #[test]
    fn test_default_source_not_installed_over_configured_ones() {
        let mut config = Config::default();
        config.use_sources.push("mine".to_string());
        ensure_default_source(&mut config);
        assert_eq!(config.use_sources, vec!["mine"]);
        assert!(config.sources.is_empty());
    }
}
