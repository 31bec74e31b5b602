use super::params::require_str;
use crate::state::AppState;
use serde_json::{json, Value};
use thrum_types::{EventPayload, EventRecord, Error, GroupId, MemberKind, Result};

fn parse_member_kind(raw: &str) -> Result<MemberKind> {
    match raw {
        "agent" => Ok(MemberKind::Agent),
        "role" => Ok(MemberKind::Role),
        "group" => Ok(MemberKind::Group),
        other => Err(Error::validation(format!("unknown member kind '{other}'"))),
    }
}

fn group_id_by_name(state: &AppState, name: &str) -> Result<String> {
    state
        .database()
        .get_group_by_name(name)?
        .map(|(id, _)| id)
        .ok_or_else(|| Error::not_found(format!("unknown group '{name}'")))
}

pub async fn create(state: &AppState, params: Value) -> Result<Value> {
    let name = require_str(&params, "name")?;
    if state.database().get_group_by_name(name)?.is_some() {
        return Err(Error::conflict(format!("group '{name}' already exists")));
    }
    let group_id = thrum_ids::new_group_id();
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::GroupCreate {
            group_id: group_id.clone(),
            name: name.to_string(),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "id": group_id, "name": name }))
}

pub async fn rename(state: &AppState, params: Value) -> Result<Value> {
    let name = require_str(&params, "name")?;
    let new_name = require_str(&params, "new_name")?;
    let group_id = group_id_by_name(state, name)?;
    if state.database().get_group_by_name(new_name)?.is_some() {
        return Err(Error::conflict(format!("group '{new_name}' already exists")));
    }
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::GroupRename {
            group_id: GroupId::from_raw(group_id),
            new_name: new_name.to_string(),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "renamed": true }))
}

pub async fn delete(state: &AppState, params: Value) -> Result<Value> {
    let name = require_str(&params, "name")?;
    let group_id = group_id_by_name(state, name)?;
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::GroupDelete {
            group_id: GroupId::from_raw(group_id),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "deleted": name }))
}

pub async fn member_add(state: &AppState, params: Value) -> Result<Value> {
    let name = require_str(&params, "name")?;
    let member_kind = parse_member_kind(require_str(&params, "member_kind")?)?;
    let member_value = require_str(&params, "member_value")?;
    let group_id = group_id_by_name(state, name)?;

    if member_kind == MemberKind::Group {
        let member_group_id = group_id_by_name(state, member_value)?;
        if thrum_engine::would_create_cycle(state.database(), &group_id, &member_group_id)? {
            return Err(Error::precondition("cycle detected"));
        }
    }

    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::GroupMemberAdd {
            group_id: GroupId::from_raw(group_id),
            member_kind,
            member_value: member_value.to_string(),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}

pub async fn member_remove(state: &AppState, params: Value) -> Result<Value> {
    let name = require_str(&params, "name")?;
    let member_kind = parse_member_kind(require_str(&params, "member_kind")?)?;
    let member_value = require_str(&params, "member_value")?;
    let group_id = group_id_by_name(state, name)?;

    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::GroupMemberRemove {
            group_id: GroupId::from_raw(group_id),
            member_kind,
            member_value: member_value.to_string(),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}

pub async fn members(state: &AppState, params: Value) -> Result<Value> {
    let name = require_str(&params, "name")?;
    let expand = super::params::optional_bool(&params, "expand").unwrap_or(false);
    let group_id = group_id_by_name(state, name)?;

    if expand {
        let agents = thrum_engine::resolve_group_members(state.database(), &group_id)?;
        let mut agents: Vec<String> = agents.into_iter().collect();
        agents.sort();
        Ok(json!({ "agents": agents }))
    } else {
        let members = state.database().group_members(&group_id)?;
        let members: Vec<Value> = members
            .into_iter()
            .map(|(kind, value)| json!({ "kind": kind, "value": value }))
            .collect();
        Ok(json!({ "members": members }))
    }
}
