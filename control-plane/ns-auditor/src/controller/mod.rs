pub mod lifecycle;
pub mod reconcile;

use std::sync::Arc;

use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    Client,
    api::Api,
    runtime::{Controller, controller, controller::Action, watcher},
};
use tokio::time::Duration;
use tracing::{error, info};

use crate::config::AuditorConfig;
use crate::identity::{IdentityError, IdentityVerifier};
use self::lifecycle::{LifecyclePolicy, PolicyError};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("kube api error: {0}")]
    Kube(#[from] kube::Error),
    #[error("identity directory error: {0}")]
    Identity(#[from] IdentityError),
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
}

pub struct ControllerContext {
    pub client: Client,
    pub cfg: AuditorConfig,
    pub policy: LifecyclePolicy,
    pub verifier: Arc<dyn IdentityVerifier>,
}

pub async fn run_controller(
    client: Client,
    cfg: AuditorConfig,
    verifier: Arc<dyn IdentityVerifier>,
) -> anyhow::Result<()> {
    let api: Api<Namespace> = Api::all(client.clone());
    let workers = cfg.workers;
    let policy = LifecyclePolicy::new(&cfg);
    let ctx = Arc::new(ControllerContext {
        client,
        cfg,
        policy,
        verifier,
    });

    Controller::new(api, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(workers))
        .shutdown_on_signal()
        .run(reconcile::reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(namespace = %obj_ref.name, "reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

fn error_policy(
    _obj: Arc<Namespace>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    match error {
        // A corrupt mark annotation needs an operator; a timer would just
        // spin on the same bad data. The next edit to the namespace
        // re-triggers reconciliation.
        ReconcileErr::Policy(PolicyError::InvalidMarkTimestamp { .. }) => {
            Action::await_change()
        }
        _ => Action::requeue(Duration::from_secs(ctx.cfg.error_retry_secs)),
    }
}
