use std::sync::Arc;

use clap::Parser;
use envconfig::Envconfig;
use kube::Client;
use ns_auditor::{
    config::AuditorConfig, identity::EntraVerifier, init_tracing, runtime,
};
use tracing::info;

#[derive(clap::Parser, Clone, Debug)]
#[clap(author, version, about = "Retires namespaces whose recorded owner no longer exists in the identity directory", long_about = None)]
struct Cli {
    /// Compute and log decisions without mutating the cluster
    #[arg(long)]
    dry_run: bool,
    /// Bind port for the health endpoint (overrides HTTP_PORT)
    #[arg(long)]
    http_port: Option<u16>,
    /// Gate the controller behind a coordination Lease
    #[arg(long)]
    leader_elect: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    // Ensure rustls uses the aws-lc-rs provider explicitly.
    // This avoids runtime errors when no default provider is set.
    if let Err(e) = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::aws_lc_rs::default_provider(),
    ) {
        // It's fine if a compatible provider was already installed.
        tracing::debug!(
            ?e,
            "CryptoProvider already installed or incompatible; proceeding"
        );
    }

    let cli = Cli::parse();
    let cfg = AuditorConfig::init_from_env()?.apply_cli_overrides(
        cli.dry_run,
        cli.http_port,
        cli.leader_elect,
    );
    info!(?cfg, "Starting namespace auditor");

    let verifier = Arc::new(EntraVerifier::new(cfg.entra.clone())?);
    let client = Client::try_default().await?;
    runtime::run_all(client, cfg, verifier).await
}
