#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};

    use crate::controller::lifecycle::{
        Decision, LifecyclePolicy, NamespaceRecord, PolicyError, format_mark,
    };

    const DAY: Duration = Duration::from_secs(86400);

    fn policy() -> LifecyclePolicy {
        LifecyclePolicy::with_config(
            "@statcan.gc.ca",
            chrono::Duration::days(7),
            DAY,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn record(
        name: &str,
        email: Option<&str>,
        mark: Option<&str>,
    ) -> NamespaceRecord {
        NamespaceRecord {
            name: name.into(),
            owner_email: email.map(Into::into),
            mark: mark.map(Into::into),
            terminating: false,
        }
    }

    #[test]
    fn protected_namespaces_are_kept_regardless_of_other_inputs() {
        let policy = policy();
        for name in ["kube-system", "kube-public", "default"] {
            let rec = record(
                name,
                Some("alice@statcan.gc.ca"),
                Some("2024-01-01T00:00:00Z"),
            );
            assert!(!policy.subject_to_lifecycle(&rec));
            for exists in [true, false] {
                let decision = policy.decide(&rec, exists, now()).unwrap();
                assert_eq!(decision, Decision::Keep, "{name}/{exists}");
            }
        }
    }

    #[test]
    fn terminating_namespace_is_kept() {
        let policy = policy();
        let mut rec = record("team-x", Some("alice@statcan.gc.ca"), None);
        rec.terminating = true;
        assert!(!policy.subject_to_lifecycle(&rec));
        assert_eq!(policy.decide(&rec, false, now()).unwrap(), Decision::Keep);
    }

    #[test]
    fn missing_or_foreign_owner_email_is_kept() {
        let policy = policy();
        for email in [None, Some("bob@example.com"), Some("")] {
            let rec = record("team-x", email, None);
            assert!(!policy.subject_to_lifecycle(&rec));
            assert_eq!(
                policy.decide(&rec, false, now()).unwrap(),
                Decision::Keep,
                "email={email:?}"
            );
        }
    }

    #[test]
    fn existing_owner_defers_the_next_check() {
        let policy = policy();
        let rec = record("team-x", Some("alice@statcan.gc.ca"), None);
        assert_eq!(
            policy.decide(&rec, true, now()).unwrap(),
            Decision::Recheck { after: DAY }
        );
    }

    #[test]
    fn missing_owner_marks_with_the_full_grace_period() {
        let policy = policy();
        let rec = record("team-x", Some("alice@statcan.gc.ca"), None);
        assert_eq!(
            policy.decide(&rec, false, now()).unwrap(),
            Decision::Mark {
                marked_at: now(),
                requeue: 7 * DAY,
            }
        );
    }

    #[test]
    fn marked_namespace_is_never_re_marked() {
        // The second pass over a marked namespace must leave the original
        // timestamp in place: anything but another Mark is acceptable here,
        // and within grace the expected step is Wait.
        let policy = policy();
        let marked_at = now() - chrono::Duration::hours(1);
        let rec = record(
            "team-x",
            Some("alice@statcan.gc.ca"),
            Some(&format_mark(marked_at)),
        );
        let decision = policy.decide(&rec, false, now()).unwrap();
        assert!(
            matches!(decision, Decision::Wait { .. }),
            "got {decision:?}"
        );
    }

    #[test]
    fn grace_period_boundary_is_monotonic() {
        let policy = policy();
        let marked_at = now() - chrono::Duration::days(7);

        // One second short of the deadline: still waiting.
        let rec = record(
            "team-x",
            Some("alice@statcan.gc.ca"),
            Some(&format_mark(marked_at + chrono::Duration::seconds(1))),
        );
        assert_eq!(
            policy.decide(&rec, false, now()).unwrap(),
            Decision::Wait {
                requeue: Duration::from_secs(1)
            }
        );

        // One second past the deadline: delete.
        let rec = record(
            "team-x",
            Some("alice@statcan.gc.ca"),
            Some(&format_mark(marked_at - chrono::Duration::seconds(1))),
        );
        assert_eq!(
            policy.decide(&rec, false, now()).unwrap(),
            Decision::Delete
        );
    }

    #[test]
    fn wait_requeues_the_remaining_grace_time() {
        let policy = policy();
        let marked_at = now() - chrono::Duration::days(5);
        let rec = record(
            "team-x",
            Some("alice@statcan.gc.ca"),
            Some(&format_mark(marked_at)),
        );
        assert_eq!(
            policy.decide(&rec, false, now()).unwrap(),
            Decision::Wait { requeue: 2 * DAY }
        );
    }

    #[test]
    fn owner_reappearing_after_mark_leaves_the_mark_in_place() {
        // There is no un-marking path: a directory entry that comes back
        // after the namespace was marked only defers the next check. The
        // mark annotation itself is untouched.
        let policy = policy();
        let rec = record(
            "team-x",
            Some("alice@statcan.gc.ca"),
            Some(&format_mark(now() - chrono::Duration::days(3))),
        );
        assert_eq!(
            policy.decide(&rec, true, now()).unwrap(),
            Decision::Recheck { after: DAY }
        );
    }

    #[test]
    fn unparsable_mark_is_a_data_corruption_error() {
        let policy = policy();
        let rec = record(
            "team-x",
            Some("alice@statcan.gc.ca"),
            Some("not-a-timestamp"),
        );
        let err = policy.decide(&rec, false, now()).unwrap_err();
        match err {
            PolicyError::InvalidMarkTimestamp {
                namespace, value, ..
            } => {
                assert_eq!(namespace, "team-x");
                assert_eq!(value, "not-a-timestamp");
            }
        }
    }

    #[test]
    fn mark_format_uses_utc_zulu_suffix() {
        assert_eq!(format_mark(now()), "2024-05-10T12:00:00Z");
    }
}
