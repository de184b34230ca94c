//! A thin Axum binary wiring the FileGate HTTP surface (specification §6)
//! to the core `Provider` trait. Routing, auth and a real configuration
//! layer are explicitly out of the core's scope (§1); this binary exists
//! only to prove the contracts it carries are drivable end to end, the way
//! `examples/basic.rs`/`examples/gcs.rs` prove libunftp's `Server` is
//! drivable without being a deployable FTP daemon in their own right.

mod api_error;
mod body;
mod presentation;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use filegate::callback::HmacAlgorithm;
use filegate::registry::ProviderRegistry;
use filegate::Settings;

/// Serves the FileGate HTTP surface over one or more backend providers.
#[derive(Debug, Parser)]
struct Args {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "GATEWAY_BIND_ADDR", default_value = "127.0.0.1")]
    bind_addr: std::net::IpAddr,

    /// Port to bind the HTTP listener to.
    #[arg(long, env = "GATEWAY_PORT", default_value_t = 7777)]
    port: u16,

    /// Root directory the `filesystem` provider is sandboxed to. Created if
    /// it doesn't already exist.
    #[arg(long, env = "GATEWAY_FS_ROOT")]
    fs_root: Option<PathBuf>,

    /// S3-compatible endpoint. Registers the `s3` provider when this and
    /// every other `--s3-*` flag are present.
    #[arg(long, env = "GATEWAY_S3_ENDPOINT")]
    s3_endpoint: Option<String>,
    #[arg(long, env = "GATEWAY_S3_BUCKET")]
    s3_bucket: Option<String>,
    #[arg(long, env = "GATEWAY_S3_REGION", default_value = "us-east-1")]
    s3_region: String,
    #[arg(long, env = "GATEWAY_S3_ACCESS_KEY_ID")]
    s3_access_key_id: Option<String>,
    #[arg(long, env = "GATEWAY_S3_SECRET_ACCESS_KEY")]
    s3_secret_access_key: Option<String>,

    /// Microsoft Graph bearer token. Registers the `onedrive` provider when
    /// present.
    #[arg(long, env = "GATEWAY_ONEDRIVE_ACCESS_TOKEN")]
    onedrive_access_token: Option<String>,
    #[arg(long, env = "GATEWAY_ONEDRIVE_GRAPH_BASE_URL")]
    onedrive_graph_base_url: Option<String>,

    /// Secret used to HMAC-sign callback payloads. Callbacks are disabled
    /// (specification §6, "Callback channel") when not supplied.
    #[arg(long, env = "GATEWAY_CALLBACK_HMAC_SECRET")]
    callback_hmac_secret: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut gateway_settings = Settings::default();
    gateway_settings.callback_hmac_secret = args.callback_hmac_secret.clone();
    gateway_settings.callback_hmac_algorithm = HmacAlgorithm::Sha256;

    let registry = build_registry(&args, &gateway_settings)?;
    let state = state::AppState::new(registry, gateway_settings);

    let app = routes::router(state);
    let bind_addr = std::net::SocketAddr::new(args.bind_addr, args.port);
    tracing::info!(%bind_addr, "starting gateway-http");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Registers every provider the supplied flags/environment have enough
/// configuration for. `filesystem` is always registered (falling back to a
/// temp directory, mirroring libunftp's `basic.rs` example); `s3` and
/// `onedrive` are registered only when their credentials are present, so a
/// bare `gateway-http` invocation still serves something useful.
fn build_registry(args: &Args, gateway_settings: &Settings) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    let fs_root = args.fs_root.clone().unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&fs_root)?;
    let filesystem = Arc::new(filegate_sbe_fs::Filesystem::new(fs_root)?);
    registry.register(
        "filesystem",
        Arc::new(move |_settings, _config| Ok(filesystem.clone() as Arc<dyn filegate::Provider>)),
    );

    if let (Some(endpoint), Some(bucket), Some(access_key_id), Some(secret_access_key)) = (
        args.s3_endpoint.clone(),
        args.s3_bucket.clone(),
        args.s3_access_key_id.clone(),
        args.s3_secret_access_key.clone(),
    ) {
        let region = args.s3_region.clone();
        let s3 = Arc::new(filegate_sbe_s3::S3Provider::new(
            gateway_settings.clone(),
            filegate_sbe_s3::S3Settings {
                endpoint,
                bucket,
                credentials: filegate_sbe_s3::Credentials {
                    access_key_id,
                    secret_access_key,
                    region,
                },
            },
        )?);
        registry.register(
            "s3",
            Arc::new(move |_settings, _config| Ok(s3.clone() as Arc<dyn filegate::Provider>)),
        );
        tracing::info!("registered s3 provider");
    }

    if let Some(access_token) = args.onedrive_access_token.clone() {
        let mut onedrive_settings = filegate_sbe_onedrive::OneDriveSettings {
            access_token,
            ..Default::default()
        };
        if let Some(graph_base_url) = args.onedrive_graph_base_url.clone() {
            onedrive_settings.graph_base_url = graph_base_url;
        }
        let onedrive = Arc::new(filegate_sbe_onedrive::OneDriveProvider::new(
            gateway_settings.clone(),
            onedrive_settings,
        )?);
        registry.register(
            "onedrive",
            Arc::new(move |_settings, _config| Ok(onedrive.clone() as Arc<dyn filegate::Provider>)),
        );
        tracing::info!("registered onedrive provider");
    }

    Ok(registry)
}
