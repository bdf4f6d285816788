//! Rendering sync plans in `ipset restore` syntax.
//!
//! Kernel names come from each operation's [`SetIdentity`], the same source
//! list sets use for their members.

use std::fmt::Write;

use setcache_core::{SetIdentity, SetKind, SetOperation, SyncPlan};

/// Kernel set type for IP and CIDR sets.
pub const HASH_NET_TYPE: &str = "hash:net";

/// Kernel set type for `ip,port` sets.
pub const NAMED_PORTS_TYPE: &str = "hash:ip,port";

/// Kernel set type for list sets: members are other sets.
pub const LIST_SET_TYPE: &str = "list:set";

/// Kernel set type backing a set kind.
pub fn set_type(kind: SetKind) -> &'static str {
    match kind {
        SetKind::Hash => HASH_NET_TYPE,
        SetKind::NamedPorts => NAMED_PORTS_TYPE,
        SetKind::List => LIST_SET_TYPE,
    }
}

fn create_line(set: &SetIdentity) -> String {
    if set.kind().is_list() {
        format!("create {} {} -exist", set.kernel_name(), LIST_SET_TYPE)
    } else {
        format!("create {} {} family inet -exist", set.kernel_name(), set_type(set.kind()))
    }
}

/// Render one operation as restore lines (no trailing newline).
///
/// A destroy is preceded by an idempotent create: `ipset restore` aborts on a
/// set it does not know, and a set created and destroyed within one window
/// never reached the kernel.
pub fn render_operation(op: &SetOperation) -> String {
    let set = op.set();
    let name = set.kernel_name();
    match op {
        SetOperation::Create { .. } => create_line(set),
        SetOperation::Flush { .. } => format!("flush {}", name),
        SetOperation::Add { member, .. } => format!("add {} {} -exist", name, member),
        SetOperation::Delete { member, .. } => format!("del {} {} -exist", name, member),
        SetOperation::Destroy { .. } => format!("{}\ndestroy {}", create_line(set), name),
    }
}

/// Render a whole plan as an `ipset restore` transaction.
pub fn render_restore(plan: &SyncPlan) -> String {
    let mut out = String::new();
    for op in plan.operations() {
        // writing to a String cannot fail
        let _ = writeln!(out, "{}", render_operation(op));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hashbrown::HashMap;
    use setcache_core::{Config, DirtyCache, IpSet, LogReporter, MemberAwareDirtyCache};

    fn live(sets: &[&IpSet]) -> HashMap<String, IpSet> {
        sets.iter().map(|s| (s.name().to_string(), (*s).clone())).collect()
    }

    #[test]
    fn test_render_operations() {
        let set = IpSet::new("s", SetKind::Hash);
        let id = set.identity().clone();
        let k = set.kernel_name();

        let create = SetOperation::Create { set: id.clone() };
        assert_eq!(render_operation(&create), format!("create {} hash:net family inet -exist", k));

        let list = IpSet::new("l", SetKind::List);
        let create_list = SetOperation::Create { set: list.identity().clone() };
        assert_eq!(render_operation(&create_list), format!("create {} list:set -exist", list.kernel_name()));

        let add = SetOperation::Add { set: id.clone(), member: "10.0.0.0/24".into() };
        assert_eq!(render_operation(&add), format!("add {} 10.0.0.0/24 -exist", k));

        let del = SetOperation::Delete { set: id.clone(), member: "10.0.0.1".into() };
        assert_eq!(render_operation(&del), format!("del {} 10.0.0.1 -exist", k));

        assert_eq!(render_operation(&SetOperation::Flush { set: id }), format!("flush {}", k));
    }

    #[test]
    fn test_render_named_ports_set() {
        let mut ports = IpSet::new("namedport:http", SetKind::NamedPorts);
        ports.insert_member("10.0.0.1,tcp:80");
        let mut cache = MemberAwareDirtyCache::new(Arc::new(LogReporter));
        cache.create(&ports);

        let text = render_restore(&SyncPlan::build(&cache, &live(&[&ports])));
        let k = ports.kernel_name();
        assert_eq!(
            text,
            format!("create {k} hash:ip,port family inet -exist\nadd {k} 10.0.0.1,tcp:80 -exist\n", k = k)
        );
    }

    #[test]
    fn test_destroy_never_fails_on_missing_set() {
        // created and destroyed in the same window: the kernel never saw it
        let fresh = IpSet::new("fresh", SetKind::List);
        let mut cache = MemberAwareDirtyCache::new(Arc::new(LogReporter));
        cache.create(&fresh);
        cache.destroy(&fresh);

        let text = render_restore(&SyncPlan::build(&cache, &HashMap::new()));
        let k = fresh.kernel_name();
        assert_eq!(text, format!("create {k} list:set -exist\ndestroy {k}\n", k = k));
    }

    #[test]
    fn test_configured_prefix_names_sets_and_members() {
        let config = Config { kernel_name_prefix: "npm-".into(), ..Config::linux() };
        let web = IpSet::for_config("podlabel-app:web", SetKind::Hash, &config);
        let mut tier = IpSet::for_config("nestedlabel-tier:frontend", SetKind::List, &config);
        let mut cache = MemberAwareDirtyCache::new(Arc::new(LogReporter));
        cache.create(&web);
        cache.create(&tier);
        let member = tier.insert_member_set(&web).unwrap();
        cache.add_member(&tier, &member);

        let text = render_restore(&SyncPlan::build(&cache, &live(&[&web, &tier])));
        let web_k = config.kernel_name("podlabel-app:web");
        let tier_k = config.kernel_name("nestedlabel-tier:frontend");
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec![
                format!("create {} hash:net family inet -exist", web_k),
                format!("create {} list:set -exist", tier_k),
                format!("add {} {} -exist", tier_k, web_k),
            ]
        );
        assert!(text.lines().all(|line| !line.contains("setcache-")));
    }

    #[test]
    fn test_render_plan_from_cache() {
        let mut cache = MemberAwareDirtyCache::new(Arc::new(LogReporter));
        let mut set = IpSet::new("podlabel-app:web", SetKind::Hash);
        set.insert_member("10.0.0.1");
        cache.create(&set);

        let plan = SyncPlan::build(&cache, &live(&[&set]));
        let text = render_restore(&plan);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&format!("create {}", set.kernel_name())));
        assert_eq!(lines[1], format!("add {} 10.0.0.1 -exist", set.kernel_name()));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_render_empty_plan() {
        assert_eq!(render_restore(&SyncPlan::default()), "");
    }
}
