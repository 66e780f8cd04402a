use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct AuditorConfig {
    #[envconfig(from = "HTTP_PORT", default = "8088")]
    pub http_port: u16,

    /// Namespace the leader Lease lives in.
    /// Env: NSA_K8S_NAMESPACE
    #[envconfig(from = "NSA_K8S_NAMESPACE", default = "default")]
    pub k8s_namespace: String,

    /// Compute and log every decision without patching or deleting anything.
    /// Env: NSA_DRY_RUN (also --dry-run)
    #[envconfig(from = "NSA_DRY_RUN", default = "false")]
    pub dry_run: bool,

    /// Gate the controller behind a coordination Lease so only one replica
    /// acts at a time.
    /// Env: NSA_LEADER_ELECT (also --leader-elect)
    #[envconfig(from = "NSA_LEADER_ELECT", default = "false")]
    pub leader_elect: bool,

    #[envconfig(from = "NSA_LEASE_DURATION_SECS", default = "30")]
    pub lease_duration_secs: u64,

    /// Bound on concurrent reconciles. Kept small so bursts of namespace
    /// events cannot flood the directory API with lookups.
    /// Env: NSA_WORKERS
    #[envconfig(from = "NSA_WORKERS", default = "2")]
    pub workers: u16,

    /// Email domain suffix whose owners are subject to the lifecycle.
    /// Env: NSA_OWNER_DOMAIN
    #[envconfig(from = "NSA_OWNER_DOMAIN", default = "@statcan.gc.ca")]
    pub owner_domain: String,

    /// How long a marked namespace survives before it is deleted.
    /// Env: NSA_GRACE_PERIOD_SECS
    #[envconfig(from = "NSA_GRACE_PERIOD_SECS", default = "604800")]
    pub grace_period_secs: u64,

    /// How often a namespace with a present owner is re-verified against
    /// the directory.
    /// Env: NSA_VERIFY_INTERVAL_SECS
    #[envconfig(from = "NSA_VERIFY_INTERVAL_SECS", default = "86400")]
    pub verify_interval_secs: u64,

    /// Requeue delay after a reconcile fails with a transient error.
    /// Env: NSA_ERROR_RETRY_SECS
    #[envconfig(from = "NSA_ERROR_RETRY_SECS", default = "60")]
    pub error_retry_secs: u64,

    #[envconfig(nested)]
    pub entra: EntraConfig,
}

impl AuditorConfig {
    /// Fold the process flags into the config once at startup. Nothing below
    /// main consults CLI arguments or ambient global state; the reconciler
    /// only ever sees this struct.
    pub fn apply_cli_overrides(
        mut self,
        dry_run: bool,
        http_port: Option<u16>,
        leader_elect: bool,
    ) -> Self {
        if dry_run {
            self.dry_run = true;
        }
        if leader_elect {
            self.leader_elect = true;
        }
        if let Some(port) = http_port {
            self.http_port = port;
        }
        self
    }
}

/// Connection settings for the Entra ID directory.
#[derive(Envconfig, Clone)]
pub struct EntraConfig {
    #[envconfig(from = "NSA_ENTRA_TENANT_ID")]
    pub tenant_id: String,

    #[envconfig(from = "NSA_ENTRA_CLIENT_ID")]
    pub client_id: String,

    #[envconfig(from = "NSA_ENTRA_CLIENT_SECRET")]
    pub client_secret: String,

    #[envconfig(
        from = "NSA_ENTRA_AUTHORITY",
        default = "https://login.microsoftonline.com"
    )]
    pub authority: String,

    #[envconfig(
        from = "NSA_ENTRA_GRAPH_URL",
        default = "https://graph.microsoft.com/v1.0"
    )]
    pub graph_url: String,

    #[envconfig(
        from = "NSA_ENTRA_SCOPE",
        default = "https://graph.microsoft.com/.default"
    )]
    pub scope: String,

    /// Hard bound on every outbound directory call, token requests included.
    /// Env: NSA_ENTRA_TIMEOUT_SECS
    #[envconfig(from = "NSA_ENTRA_TIMEOUT_SECS", default = "10")]
    pub timeout_secs: u64,
}

impl EntraConfig {
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

impl std::fmt::Debug for EntraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntraConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority", &self.authority)
            .field("graph_url", &self.graph_url)
            .field("scope", &self.scope)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AuditorConfig {
        AuditorConfig {
            http_port: 8088,
            k8s_namespace: "default".into(),
            dry_run: false,
            leader_elect: false,
            lease_duration_secs: 30,
            workers: 2,
            owner_domain: "@statcan.gc.ca".into(),
            grace_period_secs: 604800,
            verify_interval_secs: 86400,
            error_retry_secs: 60,
            entra: EntraConfig {
                tenant_id: "tenant".into(),
                client_id: "client".into(),
                client_secret: "secret".into(),
                authority: "https://login.microsoftonline.com".into(),
                graph_url: "https://graph.microsoft.com/v1.0".into(),
                scope: "https://graph.microsoft.com/.default".into(),
                timeout_secs: 10,
            },
        }
    }

    #[test]
    fn cli_flags_override_env_values() {
        let cfg = base().apply_cli_overrides(true, Some(9090), true);
        assert!(cfg.dry_run);
        assert!(cfg.leader_elect);
        assert_eq!(cfg.http_port, 9090);
    }

    #[test]
    fn absent_cli_flags_keep_env_values() {
        let mut cfg = base();
        cfg.dry_run = true;
        let cfg = cfg.apply_cli_overrides(false, None, false);
        // --dry-run absent must not un-set an env-enabled dry run
        assert!(cfg.dry_run);
        assert!(!cfg.leader_elect);
        assert_eq!(cfg.http_port, 8088);
    }

    #[test]
    fn token_url_joins_authority_and_tenant() {
        let mut cfg = base();
        cfg.entra.authority = "https://login.microsoftonline.com/".into();
        assert_eq!(
            cfg.entra.token_url(),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn debug_output_redacts_client_secret() {
        let rendered = format!("{:?}", base().entra);
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("<redacted>"));
    }
}
