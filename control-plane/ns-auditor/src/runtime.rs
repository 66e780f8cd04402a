use std::net::SocketAddr;
use std::sync::Arc;

use kube::Client;
use tokio::{task::JoinHandle, try_join};

use crate::{
    config::AuditorConfig,
    controller::run_controller,
    identity::IdentityVerifier,
    lease::LeaderLease,
    web::run_http_server,
};

/// Compute the HTTP bind address based on config.
pub fn compute_http_addr(cfg: &AuditorConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

/// Spawn the namespace controller loop.
pub fn spawn_controller(
    client: Client,
    cfg: AuditorConfig,
    verifier: Arc<dyn IdentityVerifier>,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_controller(client, cfg, verifier).await })
}

/// Spawn the HTTP health server on the provided address.
pub fn spawn_http(addr: SocketAddr) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_http_server(addr).await })
}

/// Start the health server and the controller and wait until either
/// finishes. With leader election enabled the controller is held back until
/// the lease is ours; the health endpoint serves either way.
pub async fn run_all(
    client: Client,
    cfg: AuditorConfig,
    verifier: Arc<dyn IdentityVerifier>,
) -> anyhow::Result<()> {
    let http_addr = compute_http_addr(&cfg);
    let http = spawn_http(http_addr);

    if cfg.leader_elect {
        LeaderLease::new(client.clone(), &cfg)
            .acquire_and_hold()
            .await?;
    }

    let controller = spawn_controller(client, cfg, verifier);
    let (c_res, h_res) = try_join!(controller, http)?;
    c_res?;
    h_res?;
    Ok(())
}
