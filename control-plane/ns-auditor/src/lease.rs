use std::time::Duration;

use chrono::Utc;
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::MicroTime;
use kube::Client;
use kube::api::{Api, ObjectMeta, Patch, PatchParams, PostParams};
use tracing::{debug, info, warn};

use crate::config::AuditorConfig;

const LEASE_NAME: &str = "ns-auditor-leader";

/// Lease-based leadership gate. One replica acquires the lease before its
/// controller starts and renews it in the background; candidates that lose
/// keep retrying, so a standby takes over once the holder stops renewing.
pub struct LeaderLease {
    api: Api<Lease>,
    identity: String,
    duration: Duration,
}

impl LeaderLease {
    pub fn new(client: Client, cfg: &AuditorConfig) -> Self {
        Self {
            api: Api::namespaced(client, &cfg.k8s_namespace),
            identity: leader_identity(),
            duration: Duration::from_secs(cfg.lease_duration_secs),
        }
    }

    /// Block until the lease is ours, then keep renewing it from a
    /// background task.
    pub async fn acquire_and_hold(self) -> anyhow::Result<()> {
        loop {
            match self.try_claim().await {
                Ok(true) => break,
                Ok(false) => {
                    debug!(lease = LEASE_NAME, "lease held elsewhere; waiting")
                }
                Err(e) => warn!(error = %e, "lease claim attempt failed"),
            }
            tokio::time::sleep(self.duration / 2).await;
        }
        info!(
            lease = LEASE_NAME,
            identity = %self.identity,
            "acquired leadership"
        );
        tokio::spawn(async move { self.renew_loop().await });
        Ok(())
    }

    async fn try_claim(&self) -> Result<bool, kube::Error> {
        let now = MicroTime(Utc::now());
        let Some(current) = self.api.get_opt(LEASE_NAME).await? else {
            let lease = Lease {
                metadata: ObjectMeta {
                    name: Some(LEASE_NAME.into()),
                    ..Default::default()
                },
                spec: Some(self.desired_spec(&now, None)),
            };
            return match self.api.create(&PostParams::default(), &lease).await
            {
                Ok(_) => Ok(true),
                Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(false),
                Err(e) => Err(e),
            };
        };

        let spec = current.spec.clone().unwrap_or_default();
        let held_by_us =
            spec.holder_identity.as_deref() == Some(self.identity.as_str());
        if !held_by_us && !lease_expired(&spec, &now) {
            return Ok(false);
        }

        // Renewals keep the original acquire time; takeovers reset it.
        let acquired = if held_by_us { spec.acquire_time } else { None };
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": current.metadata.resource_version,
            },
            "spec": self.desired_spec(&now, acquired),
        });
        match self
            .api
            .patch(LEASE_NAME, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn desired_spec(
        &self,
        now: &MicroTime,
        acquired: Option<MicroTime>,
    ) -> LeaseSpec {
        LeaseSpec {
            holder_identity: Some(self.identity.clone()),
            lease_duration_seconds: Some(self.duration.as_secs() as i32),
            acquire_time: Some(acquired.unwrap_or_else(|| now.clone())),
            renew_time: Some(now.clone()),
            ..Default::default()
        }
    }

    async fn renew_loop(self) {
        loop {
            tokio::time::sleep(self.duration / 3).await;
            match self.try_claim().await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(lease = LEASE_NAME, "lost leadership to another holder")
                }
                Err(e) => warn!(error = %e, "lease renewal failed"),
            }
        }
    }
}

fn lease_expired(spec: &LeaseSpec, now: &MicroTime) -> bool {
    let Some(renewed) = spec.renew_time.as_ref() else {
        return true;
    };
    let ttl =
        chrono::Duration::seconds(spec.lease_duration_seconds.unwrap_or(0) as i64);
    renewed.0 + ttl < now.0
}

fn leader_identity() -> String {
    let host =
        std::env::var("HOSTNAME").unwrap_or_else(|_| "ns-auditor".into());
    format!("{}-{}", host, std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(renewed_secs_ago: i64, ttl: i32) -> LeaseSpec {
        LeaseSpec {
            holder_identity: Some("other".into()),
            lease_duration_seconds: Some(ttl),
            renew_time: Some(MicroTime(
                Utc::now() - chrono::Duration::seconds(renewed_secs_ago),
            )),
            ..Default::default()
        }
    }

    #[test]
    fn fresh_lease_is_not_expired() {
        let now = MicroTime(Utc::now());
        assert!(!lease_expired(&spec(5, 30), &now));
    }

    #[test]
    fn stale_lease_is_expired() {
        let now = MicroTime(Utc::now());
        assert!(lease_expired(&spec(60, 30), &now));
    }

    #[test]
    fn lease_without_renew_time_is_expired() {
        let now = MicroTime(Utc::now());
        assert!(lease_expired(&LeaseSpec::default(), &now));
    }
}
