use crate::error::Result;
use std::collections::HashSet;
use thrum_index::Database;

/// Expand a group to the flat set of agent names it resolves to, following
/// nested `group` members and `role` members (every agent currently holding
/// that role). `visited` guards against a group that (directly or through
/// another group) contains itself: once a group id has been expanded on this
/// call stack it is never expanded again, so a cycle just stops contributing
/// new members instead of recursing forever.
///
/// Every database call here returns a fully materialized `Vec` rather than
/// a live cursor, so recursing into a nested group's membership never holds
/// a statement open across the call that fetches it — necessary because the
/// store hands out one shared connection guarded by a single mutex.
pub fn resolve_group_members(db: &Database, root_group_id: &str) -> Result<HashSet<String>> {
    let mut agents = HashSet::new();
    let mut visited = HashSet::new();
    expand_group(db, root_group_id, &mut agents, &mut visited)?;
    Ok(agents)
}

fn expand_group(
    db: &Database,
    group_id: &str,
    agents: &mut HashSet<String>,
    visited: &mut HashSet<String>,
) -> Result<()> {
    if !visited.insert(group_id.to_string()) {
        return Ok(());
    }
    let members = db.group_members(group_id)?;
    for (kind, value) in members {
        match kind.as_str() {
            "agent" => {
                agents.insert(value);
            }
            "role" => {
                for name in db.agents_by_role(&value)? {
                    agents.insert(name);
                }
            }
            "group" => {
                expand_group(db, &value, agents, visited)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// The reverse direction: every group id that `agent_name` is, directly or
/// transitively, a member of — used to resolve which `scope_kind = "group"`
/// entries belong in an agent's inbox. Cycle-safe by the same visited-set
/// discipline as [`resolve_group_members`].
pub fn resolve_agent_memberships(db: &Database, agent_name: &str, role: Option<&str>) -> Result<HashSet<String>> {
    let mut groups = HashSet::new();
    let mut pending: Vec<String> = db
        .direct_group_membership("agent", agent_name)?
        .into_iter()
        .map(|m| m.group_id)
        .collect();
    if let Some(role) = role {
        pending.extend(
            db.direct_group_membership("role", role)?
                .into_iter()
                .map(|m| m.group_id),
        );
    }

    while let Some(group_id) = pending.pop() {
        if !groups.insert(group_id.clone()) {
            continue;
        }
        for parent in db.direct_group_membership("group", &group_id)? {
            if !groups.contains(&parent.group_id) {
                pending.push(parent.group_id);
            }
        }
    }
    Ok(groups)
}

/// Would adding `member_group_id` as a member of `into_group_id` create a
/// cycle? Checked before `group.memberAdd` is accepted so the store never
/// has to detect one after the fact.
pub fn would_create_cycle(db: &Database, into_group_id: &str, member_group_id: &str) -> Result<bool> {
    if into_group_id == member_group_id {
        return Ok(true);
    }
    let mut visited = HashSet::new();
    let mut stack = vec![member_group_id.to_string()];
    while let Some(current) = stack.pop() {
        if current == into_group_id {
            return Ok(true);
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        for (kind, value) in db.group_members(&current)? {
            if kind == "group" {
                stack.push(value);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_nested_group_membership() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_group("grp_inner", "inner", "t0").unwrap();
        db.upsert_group("grp_outer", "outer", "t0").unwrap();
        db.add_group_member("grp_inner", "agent", "alice").unwrap();
        db.add_group_member("grp_outer", "group", "grp_inner").unwrap();

        let members = resolve_group_members(&db, "grp_outer").unwrap();
        assert!(members.contains("alice"));
    }

    #[test]
    fn self_referential_group_does_not_infinite_loop() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_group("grp_a", "a", "t0").unwrap();
        db.add_group_member("grp_a", "agent", "alice").unwrap();
        db.add_group_member("grp_a", "group", "grp_a").unwrap();

        let members = resolve_group_members(&db, "grp_a").unwrap();
        assert_eq!(members.len(), 1);
        assert!(members.contains("alice"));
    }

    #[test]
    fn detects_two_cycle_before_it_is_created() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_group("grp_a", "a", "t0").unwrap();
        db.upsert_group("grp_b", "b", "t0").unwrap();
        db.upsert_group("grp_c", "c", "t0").unwrap();
        db.add_group_member("grp_b", "group", "grp_a").unwrap();

        // grp_a already contains grp_b (indirectly via grp_b -> grp_a means
        // grp_b contains grp_a); adding grp_b as a member of grp_a would close
        // the loop.
        assert!(would_create_cycle(&db, "grp_a", "grp_b").unwrap());
        // grp_c is unrelated, so nesting it into grp_a is safe.
        assert!(!would_create_cycle(&db, "grp_a", "grp_c").unwrap());
    }

    #[test]
    fn role_members_resolve_to_current_role_holders() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_agent("r1", None, Some("reviewer"), None, None, None, "t0").unwrap();
        db.upsert_group("grp_reviewers", "reviewers", "t0").unwrap();
        db.add_group_member("grp_reviewers", "role", "reviewer").unwrap();

        let members = resolve_group_members(&db, "grp_reviewers").unwrap();
        assert!(members.contains("r1"));
    }
}
