use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use super::domain::DomainFilter;
use super::record::NamespaceRecord;
use crate::config::AuditorConfig;

#[derive(thiserror::Error, Debug)]
pub enum PolicyError {
    /// The mark annotation exists but does not parse as RFC3339. There is no
    /// automatic repair; the annotation has to be fixed by hand.
    #[error(
        "namespace {namespace} has unparsable mark annotation {value:?}: {source}"
    )]
    InvalidMarkTimestamp {
        namespace: String,
        value: String,
        source: chrono::ParseError,
    },
}

/// Next step for a namespace, with the delay after which it should be
/// revisited. Requeue delays are part of the decision itself so that dry-run
/// and live reconciles schedule identically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Not subject to the lifecycle; watch events drive any future work.
    Keep,
    /// Owner exists today; verify again after the poll interval. The
    /// directory entry may still be removed later.
    Recheck { after: Duration },
    /// Owner is gone and the namespace carries no mark yet.
    Mark {
        marked_at: DateTime<Utc>,
        requeue: Duration,
    },
    /// Owner is gone but the grace period is still running.
    Wait { requeue: Duration },
    /// Owner is gone and the grace period has fully elapsed.
    Delete,
}

#[derive(Clone, Debug)]
pub struct LifecyclePolicy {
    domain: DomainFilter,
    grace_period: chrono::Duration,
    verify_interval: Duration,
}

impl LifecyclePolicy {
    pub fn new(cfg: &AuditorConfig) -> Self {
        Self::with_config(
            cfg.owner_domain.clone(),
            chrono::Duration::seconds(cfg.grace_period_secs as i64),
            Duration::from_secs(cfg.verify_interval_secs),
        )
    }

    pub fn with_config(
        domain_suffix: impl Into<String>,
        grace_period: chrono::Duration,
        verify_interval: Duration,
    ) -> Self {
        Self {
            domain: DomainFilter::new(domain_suffix),
            grace_period,
            verify_interval,
        }
    }

    /// Whether the namespace is subject to owner verification at all. The
    /// reconciler consults this before touching the directory, so protected
    /// and terminating namespaces never cause an outbound lookup.
    pub fn subject_to_lifecycle(&self, record: &NamespaceRecord) -> bool {
        if record.terminating || record.is_system_protected() {
            return false;
        }
        match record.owner_email.as_deref() {
            Some(email) => self.domain.matches(email),
            None => false,
        }
    }

    /// The state machine. Inputs are the persisted record and a fresh
    /// directory verdict; the output is the single action to take now.
    pub fn decide(
        &self,
        record: &NamespaceRecord,
        owner_exists: bool,
        now: DateTime<Utc>,
    ) -> Result<Decision, PolicyError> {
        if !self.subject_to_lifecycle(record) {
            return Ok(Decision::Keep);
        }

        // An existing owner only defers the next check. A mark left over
        // from an earlier absence stays in place; deletion still requires
        // the owner to be missing once the grace period has elapsed.
        if owner_exists {
            return Ok(Decision::Recheck {
                after: self.verify_interval,
            });
        }

        let marked_at = match record.mark.as_deref() {
            None => {
                return Ok(Decision::Mark {
                    marked_at: now,
                    requeue: self
                        .grace_period
                        .to_std()
                        .unwrap_or_default(),
                });
            }
            Some(raw) => parse_mark(&record.name, raw)?,
        };

        if now.signed_duration_since(marked_at) > self.grace_period {
            Ok(Decision::Delete)
        } else {
            let deadline = marked_at + self.grace_period;
            let remaining = deadline
                .signed_duration_since(now)
                .to_std()
                .unwrap_or(Duration::from_secs(1));
            Ok(Decision::Wait {
                requeue: remaining.max(Duration::from_secs(1)),
            })
        }
    }
}

/// RFC3339 with a `Z` suffix, the exact format written into the mark
/// annotation.
pub fn format_mark(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_mark(
    namespace: &str,
    raw: &str,
) -> Result<DateTime<Utc>, PolicyError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| PolicyError::InvalidMarkTimestamp {
            namespace: namespace.to_string(),
            value: raw.to_string(),
            source,
        })
}
