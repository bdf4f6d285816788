//! Black-box contract tests: both cache variants, built through the factory,
//! must agree on every set-level query.

use std::sync::Arc;

use hashbrown::HashSet;

use setcache_core::{new_dirty_cache, Config, CountingReporter, DirtyCache, InvariantReporter, IpSet, SetKind, Violation};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn both_variants() -> Vec<(&'static str, Box<dyn DirtyCache>, Arc<CountingReporter>)> {
    [("member-aware", Config::linux()), ("coarse", Config::windows())]
        .into_iter()
        .map(|(label, config)| {
            let reporter = Arc::new(CountingReporter::new());
            let cache = new_dirty_cache(&config, Arc::clone(&reporter) as Arc<dyn InvariantReporter>);
            (label, cache, reporter)
        })
        .collect()
}

fn hash_set(name: &str, members: &[&str]) -> IpSet {
    let mut set = IpSet::new(name, SetKind::Hash);
    for m in members {
        set.insert_member(*m);
    }
    set
}

fn names(list: &[&str]) -> HashSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn sorted(members: Option<&HashSet<String>>) -> Vec<String> {
    let mut v: Vec<String> = members.map(|m| m.iter().cloned().collect()).unwrap_or_default();
    v.sort_unstable();
    v
}

// ---------------------------------------------------------------------------
// Set-level contract (both variants)
// ---------------------------------------------------------------------------

#[test]
fn test_reset() {
    for (label, mut dc, _) in both_variants() {
        let s1 = hash_set("set1", &["1.2.3.4"]);
        let s2 = hash_set("set2", &[]);
        dc.create(&s1);
        dc.destroy(&s2);
        dc.reset();

        assert_eq!(dc.num_sets_to_add_or_update(), 0, "{}", label);
        assert_eq!(dc.num_sets_to_destroy(), 0, "{}", label);
        assert!(!dc.is_set_to_add_or_update("set1"), "{}", label);
        assert!(!dc.is_set_to_destroy("set2"), "{}", label);
    }
}

#[test]
fn test_create() {
    for (label, mut dc, reporter) in both_variants() {
        dc.create(&hash_set("set1", &[]));
        dc.create(&hash_set("set2", &["1.2.3.4"]));

        assert_eq!(dc.sets_to_add_or_update(), names(&["set1", "set2"]), "{}", label);
        assert!(dc.sets_to_destroy().is_empty(), "{}", label);
        assert_eq!(reporter.total(), 0, "{}", label);
    }
}

#[test]
fn test_create_after_destroy() {
    for (label, mut dc, _) in both_variants() {
        let s = hash_set("set1", &["1.2.3.4"]);
        dc.destroy(&s);
        dc.create(&s);

        assert_eq!(dc.sets_to_add_or_update(), names(&["set1"]), "{}", label);
        assert!(dc.sets_to_destroy().is_empty(), "{}", label);
        assert!(!dc.is_set_to_destroy("set1"), "{}", label);
    }
}

#[test]
fn test_update_then_destroy() {
    for (label, mut dc, _) in both_variants() {
        let mut s = hash_set("set1", &[]);
        s.insert_member("1.2.3.4");
        dc.add_member(&s, "1.2.3.4");
        s.remove_member("1.2.3.4");
        dc.delete_member(&s, "1.2.3.4");
        dc.destroy(&s);

        assert!(dc.sets_to_add_or_update().is_empty(), "{}", label);
        assert_eq!(dc.sets_to_destroy(), names(&["set1"]), "{}", label);
    }
}

#[test]
fn test_destroy_twice_reported() {
    for (label, mut dc, reporter) in both_variants() {
        let s = hash_set("set1", &["1.2.3.4"]);
        dc.destroy(&s);
        dc.destroy(&s);

        assert_eq!(dc.num_sets_to_destroy(), 1, "{}", label);
        assert_eq!(reporter.count(Violation::DestroyWhileDestroying), 1, "{}", label);
    }
}

#[test]
fn test_predicates_mutually_exclusive() {
    for (label, mut dc, _) in both_variants() {
        let a = hash_set("a", &["x"]);
        let b = hash_set("b", &["y"]);
        dc.create(&a);
        dc.destroy(&b);
        dc.add_member(&a, "z");
        dc.destroy(&a);
        dc.create(&b);

        for name in ["a", "b"] {
            assert!(
                !(dc.is_set_to_add_or_update(name) && dc.is_set_to_destroy(name)),
                "{}: {} in both buckets",
                label,
                name
            );
        }
        assert!(dc.is_set_to_destroy("a"), "{}", label);
        assert!(dc.is_set_to_add_or_update("b"), "{}", label);
    }
}

#[test]
fn test_print_caches_name_dirty_sets() {
    for (label, mut dc, _) in both_variants() {
        dc.create(&hash_set("alpha", &[]));
        dc.destroy(&hash_set("omega", &[]));
        assert!(dc.print_add_or_update_cache().contains("alpha"), "{}", label);
        assert!(dc.print_destroy_cache().contains("omega"), "{}", label);
        assert!(!dc.print_destroy_cache().contains("alpha"), "{}", label);
    }
}

// ---------------------------------------------------------------------------
// Member-level contract (member-aware only)
// ---------------------------------------------------------------------------

#[test]
fn test_member_accessors_by_variant() {
    for (label, mut dc, _) in both_variants() {
        let s = hash_set("set1", &["a", "b"]);
        dc.create(&s);
        if dc.tracks_members() {
            assert_eq!(sorted(dc.members_to_add("set1")), vec!["a", "b"], "{}", label);
        } else {
            assert!(dc.members_to_add("set1").is_none(), "{}", label);
            assert!(dc.members_to_delete("set1").is_none(), "{}", label);
        }
    }
}

#[test]
fn test_destroy_then_create_keeps_forced_deletes() {
    let mut dc = new_dirty_cache(&Config::linux(), Arc::new(CountingReporter::new()));
    let s = hash_set("s", &["a"]);
    dc.destroy(&s);
    dc.create(&hash_set("s", &[]));

    assert!(dc.is_set_to_add_or_update("s"));
    assert_eq!(sorted(dc.members_to_delete("s")), vec!["a"]);

    dc.add_member(&s, "a");
    assert!(sorted(dc.members_to_delete("s")).is_empty());
    assert!(sorted(dc.members_to_add("s")).is_empty());
}

#[test]
fn test_clean_set_has_no_diff() {
    let dc = new_dirty_cache(&Config::linux(), Arc::new(CountingReporter::new()));
    assert!(dc.members_to_add("nothing").is_none());
    assert!(dc.members_to_delete("nothing").is_none());
}

#[test]
fn test_many_sets_bursty_churn() {
    let mut dc = new_dirty_cache(&Config::linux(), Arc::new(CountingReporter::new()));
    let mut sets: Vec<IpSet> = (0..50).map(|i| hash_set(&format!("ns-{}", i), &[])).collect();

    for set in &sets {
        dc.create(set);
    }
    for (i, set) in sets.iter_mut().enumerate() {
        for j in 0..20 {
            let member = format!("10.{}.{}.1", i, j);
            set.insert_member(member.clone());
            dc.add_member(set, &member);
        }
        // pods churn away again
        for j in 0..10 {
            let member = format!("10.{}.{}.1", i, j);
            set.remove_member(&member);
            dc.delete_member(set, &member);
        }
    }

    assert_eq!(dc.num_sets_to_add_or_update(), 50);
    for set in &sets {
        assert_eq!(dc.members_to_add(set.name()).map(|m| m.len()), Some(10));
        assert_eq!(dc.members_to_delete(set.name()).map(|m| m.len()), Some(0));
    }
}
