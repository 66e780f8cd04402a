use std::sync::Arc;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde_json::json;
use tracing::{debug, info, instrument};

use super::lifecycle::{
    Decision, LifecyclePolicy, MARKED_FOR_DELETION_ANNOTATION,
    NamespaceRecord, format_mark,
};
use super::{ControllerContext, ReconcileErr};
use crate::identity::IdentityVerifier;

#[instrument(skip_all, fields(namespace = %obj.name_any()))]
pub async fn reconcile(
    obj: Arc<Namespace>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let name = obj.name_any();
    let api: Api<Namespace> = Api::all(ctx.client.clone());

    // Re-read instead of trusting the watch event: the namespace may already
    // be gone, and the mark patch below needs a current resourceVersion.
    let Some(namespace) = api.get_opt(&name).await? else {
        debug!("namespace no longer exists; nothing to do");
        return Ok(Action::await_change());
    };

    let record = NamespaceRecord::from_namespace(&namespace);
    let decision =
        evaluate(&record, ctx.verifier.as_ref(), &ctx.policy).await?;
    let action = scheduled_action(&decision);

    match decision {
        Decision::Keep => {}
        Decision::Recheck { after } => {
            debug!(
                requeue_secs = after.as_secs(),
                "owner present; rechecking later"
            );
        }
        Decision::Wait { requeue } => {
            info!(
                requeue_secs = requeue.as_secs(),
                "marked namespace still within grace period"
            );
        }
        Decision::Mark { marked_at, .. } => {
            if ctx.cfg.dry_run {
                info!(
                    dry_run = true,
                    marked_at = %format_mark(marked_at),
                    "would mark namespace for deletion"
                );
            } else {
                mark_namespace(&api, &namespace, marked_at).await?;
                info!(
                    marked_at = %format_mark(marked_at),
                    "marked namespace for deletion"
                );
            }
        }
        Decision::Delete => {
            if ctx.cfg.dry_run {
                info!(dry_run = true, "would delete namespace");
            } else {
                delete_namespace(&api, &name).await?;
                info!("deleted namespace");
            }
        }
    }

    Ok(action)
}

/// Screen the record, consult the directory only when necessary, then run
/// the policy. Protected and unmanaged namespaces never reach the verifier.
pub async fn evaluate(
    record: &NamespaceRecord,
    verifier: &dyn IdentityVerifier,
    policy: &LifecyclePolicy,
) -> Result<Decision, ReconcileErr> {
    if !policy.subject_to_lifecycle(record) {
        return Ok(Decision::Keep);
    }
    let email = record.owner_email.as_deref().unwrap_or_default();
    let owner_exists = verifier.exists(email).await?;
    Ok(policy.decide(record, owner_exists, Utc::now())?)
}

/// Requeue directive for a decision. Dry-run and live reconciles share this
/// mapping, so the two modes differ only in persisted side effects.
pub fn scheduled_action(decision: &Decision) -> Action {
    match decision {
        Decision::Keep | Decision::Delete => Action::await_change(),
        Decision::Recheck { after } => Action::requeue(*after),
        Decision::Mark { requeue, .. } | Decision::Wait { requeue } => {
            Action::requeue(*requeue)
        }
    }
}

async fn mark_namespace(
    api: &Api<Namespace>,
    namespace: &Namespace,
    marked_at: DateTime<Utc>,
) -> Result<(), ReconcileErr> {
    // Merge patch guarded by the resourceVersion of the snapshot the
    // decision was made on. Unrelated annotations survive the merge; a
    // concurrent edit surfaces as a conflict and the next reconcile
    // re-derives the decision from fresh state.
    let patch = json!({
        "metadata": {
            "resourceVersion": namespace.resource_version(),
            "annotations": {
                MARKED_FOR_DELETION_ANNOTATION: format_mark(marked_at),
            },
        }
    });
    api.patch(
        &namespace.name_any(),
        &PatchParams::default(),
        &Patch::Merge(&patch),
    )
    .await?;
    Ok(())
}

async fn delete_namespace(
    api: &Api<Namespace>,
    name: &str,
) -> Result<(), ReconcileErr> {
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        // Someone else finished the job; deletion is idempotent.
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}
