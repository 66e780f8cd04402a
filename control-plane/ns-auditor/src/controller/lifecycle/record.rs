use k8s_openapi::api::core::v1::Namespace;

/// Annotation carrying the owner email; written by the provisioning
/// pipeline, read-only to this controller.
pub const OWNER_EMAIL_ANNOTATION: &str = "user-email";

/// Annotation holding the RFC3339 instant at which the namespace was marked
/// for deletion; owned by this controller.
pub const MARKED_FOR_DELETION_ANNOTATION: &str = "marked-for-deletion";

/// Namespaces that are never subject to the retirement lifecycle.
pub const PROTECTED_NAMESPACES: &[&str] =
    &["kube-system", "kube-public", "default"];

/// Everything the policy needs to know about a namespace, projected out of
/// the live object. The mark annotation is kept raw; parsing happens at
/// decision time so a corrupt value surfaces as an explicit error.
#[derive(Clone, Debug, Default)]
pub struct NamespaceRecord {
    pub name: String,
    pub owner_email: Option<String>,
    pub mark: Option<String>,
    pub terminating: bool,
}

impl NamespaceRecord {
    pub fn from_namespace(ns: &Namespace) -> Self {
        let annotations = ns.metadata.annotations.as_ref();
        let non_empty = |key: &str| {
            annotations
                .and_then(|a| a.get(key))
                .filter(|v| !v.is_empty())
                .cloned()
        };
        let terminating = ns.metadata.deletion_timestamp.is_some()
            || ns.status.as_ref().and_then(|s| s.phase.as_deref())
                == Some("Terminating");
        Self {
            name: ns.metadata.name.clone().unwrap_or_default(),
            owner_email: non_empty(OWNER_EMAIL_ANNOTATION),
            mark: non_empty(MARKED_FOR_DELETION_ANNOTATION),
            terminating,
        }
    }

    pub fn is_system_protected(&self) -> bool {
        PROTECTED_NAMESPACES.contains(&self.name.as_str())
    }
}
