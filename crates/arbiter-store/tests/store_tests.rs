#[cfg(test)]
mod tests {
    use arbiter_core::*;
    use chrono::{Duration, Utc};

    fn decision_entry(agent: &str, status: DecisionStatus, score: u8) -> AuditEntry {
        let decision = match status {
            DecisionStatus::Approved => Decision::approved("ok", score, "Execute"),
            DecisionStatus::Denied => Decision::denied("no", score, "None"),
            other => Decision::escalated(other, "wait", score, "Human Approval (HITL)"),
        };
        AuditEntry::new(AuditRecord::GovernanceDecision {
            agent_id: agent.to_string(),
            command: "ls".into(),
            target_system: "dev-box".into(),
            decision,
        })
    }

    fn stop_entry() -> AuditEntry {
        AuditEntry::new(AuditRecord::EmergencyStop {
            initiated_by: "opX".into(),
            reason: "test".into(),
            severity: "critical".into(),
        })
    }

    fn stop_state(active: bool) -> EmergencyStopState {
        EmergencyStopState {
            active,
            reason: "incident".into(),
            initiated_by: "opX".into(),
            activated_at: Utc::now(),
            resumed_by: None,
            resumed_at: None,
        }
    }

    // ── SQLite store ───────────────────────────────────────────

    mod sqlite {
        use super::*;
        use arbiter_store::SqliteStore;

        #[test]
        fn test_empty_store_has_no_policy() {
            let store = SqliteStore::open_in_memory().unwrap();
            assert!(store.load_active().unwrap().is_none());
            assert!(store.load_emergency_stop().unwrap().is_none());
        }

        #[test]
        fn test_save_and_load_constitution() {
            let store = SqliteStore::open_in_memory().unwrap();
            let mut c = Constitution::default();
            c.forbidden_commands.push("mkfs".into());
            let now = Utc::now();
            store.save_active(&c, now).unwrap();

            let loaded = store.load_active().unwrap().unwrap();
            assert_eq!(loaded.constitution, c);
            assert_eq!(loaded.updated_at, now);
        }

        #[test]
        fn test_save_active_upserts() {
            let store = SqliteStore::open_in_memory().unwrap();
            store.save_active(&Constitution::default(), Utc::now()).unwrap();
            let mut c = Constitution::default();
            c.approval_thresholds.blocked = 90;
            store.save_active(&c, Utc::now()).unwrap();

            let loaded = store.load_active().unwrap().unwrap();
            assert_eq!(loaded.constitution.approval_thresholds.blocked, 90);
        }

        #[test]
        fn test_emergency_state_roundtrip() {
            let store = SqliteStore::open_in_memory().unwrap();
            let state = stop_state(true);
            store.save_emergency_stop(&state).unwrap();
            assert_eq!(store.load_emergency_stop().unwrap(), Some(state));
        }

        #[test]
        fn test_audit_page_newest_first() {
            let store = SqliteStore::open_in_memory().unwrap();
            let first = decision_entry("a", DecisionStatus::Approved, 5);
            let second = stop_entry();
            let third = decision_entry("b", DecisionStatus::Denied, 100);
            for e in [&first, &second, &third] {
                store.append(e).unwrap();
            }

            let page = store.page(2, 0).unwrap();
            assert_eq!(page.total, 3);
            assert_eq!(page.entries.len(), 2);
            assert_eq!(page.entries[0].id, third.id);
            assert_eq!(page.entries[1].id, second.id);

            let rest = store.page(10, 2).unwrap();
            assert_eq!(rest.entries.len(), 1);
            assert_eq!(rest.entries[0].id, first.id);
        }

        #[test]
        fn test_stored_entries_still_verify() {
            let store = SqliteStore::open_in_memory().unwrap();
            store.append(&decision_entry("a", DecisionStatus::Paused, 65)).unwrap();
            let page = store.page(1, 0).unwrap();
            assert!(page.entries[0].verify());
        }

        #[test]
        fn test_decisions_since_filters_kind_and_time() {
            let store = SqliteStore::open_in_memory().unwrap();
            let old = AuditEntry::at(
                AuditRecord::GovernanceDecision {
                    agent_id: "old".into(),
                    command: "ls".into(),
                    target_system: "dev".into(),
                    decision: Decision::approved("ok", 0, "Execute"),
                },
                Utc::now() - Duration::hours(48),
            );
            store.append(&old).unwrap();
            store.append(&stop_entry()).unwrap();
            store.append(&decision_entry("new", DecisionStatus::Approved, 10)).unwrap();

            let recent = store.decisions_since(Utc::now() - Duration::hours(24)).unwrap();
            assert_eq!(recent.len(), 1);
            assert_eq!(recent[0].actor(), "new");
        }

        #[test]
        fn test_on_disk_persistence() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("arbiter.db");
            {
                let store = SqliteStore::open(&path).unwrap();
                store.save_active(&Constitution::default(), Utc::now()).unwrap();
                store.append(&stop_entry()).unwrap();
            }
            let store = SqliteStore::open(&path).unwrap();
            assert!(store.load_active().unwrap().is_some());
            assert_eq!(store.page(10, 0).unwrap().total, 1);
        }
    }

    // ── Memory store ───────────────────────────────────────────

    mod memory {
        use super::*;
        use arbiter_store::MemoryStore;

        #[test]
        fn test_save_and_load() {
            let store = MemoryStore::new();
            assert!(store.load_active().unwrap().is_none());
            store.save_active(&Constitution::default(), Utc::now()).unwrap();
            assert!(store.load_active().unwrap().is_some());

            store.save_emergency_stop(&stop_state(false)).unwrap();
            assert!(!store.load_emergency_stop().unwrap().unwrap().active);
        }

        #[test]
        fn test_page_and_total() {
            let store = MemoryStore::new();
            for i in 0..5 {
                store
                    .append(&decision_entry(&format!("agent-{i}"), DecisionStatus::Approved, 1))
                    .unwrap();
            }
            assert_eq!(store.audit_len(), 5);
            let page = store.page(2, 1).unwrap();
            assert_eq!(page.total, 5);
            assert_eq!(page.entries.len(), 2);
            assert_eq!(page.entries[0].actor(), "agent-3");
            assert_eq!(page.entries[1].actor(), "agent-2");
        }

        #[test]
        fn test_decisions_since_skips_other_kinds() {
            let store = MemoryStore::new();
            store.append(&stop_entry()).unwrap();
            store.append(&decision_entry("a", DecisionStatus::Denied, 100)).unwrap();
            let since = Utc::now() - Duration::hours(1);
            assert_eq!(store.decisions_since(since).unwrap().len(), 1);
        }
    }
}
