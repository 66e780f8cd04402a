#![allow(dead_code)]

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;
use ns_auditor::config::{AuditorConfig, EntraConfig};
use ns_auditor::controller::lifecycle::OWNER_EMAIL_ANNOTATION;

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn owned_namespace(name: &str, email: &str) -> Namespace {
    let mut annotations = BTreeMap::new();
    annotations.insert(OWNER_EMAIL_ANNOTATION.to_string(), email.to_string());
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            annotations: Some(annotations),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Config wired at a wiremock directory stub, with short enough timings for
/// an integration run.
pub fn test_config(directory_uri: &str, grace_period_secs: u64) -> AuditorConfig {
    AuditorConfig {
        http_port: 0,
        k8s_namespace: "default".into(),
        dry_run: false,
        leader_elect: false,
        lease_duration_secs: 30,
        workers: 2,
        owner_domain: "@statcan.gc.ca".into(),
        grace_period_secs,
        verify_interval_secs: 3600,
        error_retry_secs: 5,
        entra: EntraConfig {
            tenant_id: "tenant".into(),
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            authority: directory_uri.to_string(),
            graph_url: format!("{directory_uri}/v1.0"),
            scope: "https://graph.microsoft.com/.default".into(),
            timeout_secs: 5,
        },
    }
}
