use crate::error::Result;
use crate::groups;
use std::collections::HashMap;
use std::sync::Mutex;
use thrum_index::Database;
use thrum_types::{EventPayload, EventRecord};

#[derive(Debug, Clone)]
enum PendingMessageOp {
    Edit { new_content: String, edited_at: String },
    Delete { reason: Option<String> },
}

/// Applies journal events to the projection store. Idempotent: re-applying
/// an event whose id is already recorded is a no-op, so the same journal
/// range can be replayed safely after a crash or a sync pull that rewinds
/// the cursor.
///
/// `message.edit` and `message.delete` can arrive (via sync, or via a
/// daemon that pulls another daemon's events out of creation order) before
/// the `message.create` they target. Those are buffered per message id and
/// replayed in arrival order the moment the create lands.
pub struct Projector {
    db: Database,
    pending_message_ops: Mutex<HashMap<String, Vec<PendingMessageOp>>>,
}

impl Projector {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            pending_message_ops: Mutex::new(HashMap::new()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn apply(&self, record: &EventRecord) -> Result<bool> {
        let applied = self.db.mark_event_applied(
            record.event_id.as_str(),
            record.type_name(),
            record.origin_daemon.as_deref(),
            &record.timestamp.to_rfc3339(),
            &chrono::Utc::now().to_rfc3339(),
        )?;
        if !applied {
            return Ok(false);
        }
        self.apply_payload(&record.payload, &record.timestamp.to_rfc3339())?;
        Ok(true)
    }

    fn apply_payload(&self, payload: &EventPayload, occurred_at: &str) -> Result<()> {
        match payload {
            EventPayload::AgentRegister {
                name,
                agent_id,
                role,
                module,
                display,
                hostname,
            } => {
                self.db.upsert_agent(
                    name.as_str(),
                    Some(agent_id),
                    Some(role),
                    Some(module),
                    display.as_deref(),
                    hostname.as_deref(),
                    occurred_at,
                )?;
            }
            EventPayload::AgentDelete { name } => {
                self.db.mark_agent_deleted(name.as_str(), occurred_at)?;
            }
            EventPayload::SessionStart { session_id, agent } => {
                self.db
                    .upsert_session(session_id.as_str(), agent.as_str(), "active", occurred_at, occurred_at)?;
            }
            EventPayload::SessionEnd { session_id, reason } => {
                self.db.end_session(session_id.as_str(), occurred_at, reason_tag(*reason))?;
            }
            EventPayload::SessionHeartbeat { session_id } => {
                self.db.touch_session_heartbeat(session_id.as_str(), occurred_at)?;
            }
            EventPayload::SessionSetIntent { session_id, intent } => {
                if let Some(agent) = self.db.session_agent(session_id.as_str())? {
                    self.db.upsert_work_context(
                        &agent,
                        Some(session_id.as_str()),
                        None,
                        None,
                        Some(intent),
                        None,
                        None,
                        occurred_at,
                    )?;
                }
            }
            EventPayload::SessionSetTask { session_id, task } => {
                if let Some(agent) = self.db.session_agent(session_id.as_str())? {
                    self.db.upsert_work_context(
                        &agent,
                        Some(session_id.as_str()),
                        None,
                        None,
                        None,
                        Some(task),
                        None,
                        occurred_at,
                    )?;
                }
            }
            EventPayload::MessageCreate {
                message_id,
                author,
                content,
                format,
                scopes,
                refs,
                reply_to,
                acting_as,
                disclosed,
            } => {
                let scope_pairs: Vec<(String, String)> = scopes
                    .iter()
                    .map(|s| (scope_kind_tag(s.kind).to_string(), s.value.clone()))
                    .collect();
                let ref_pairs: Vec<(String, String)> = refs
                    .iter()
                    .map(|r| (reference_kind_tag(r.kind).to_string(), r.value.clone()))
                    .collect();
                self.db.insert_message(
                    message_id.as_str(),
                    author.as_str(),
                    content,
                    format_tag(*format),
                    reply_to.as_ref().map(|id| id.as_str()),
                    acting_as.as_deref(),
                    *disclosed,
                    occurred_at,
                    &scope_pairs,
                    &ref_pairs,
                )?;
                self.replay_pending_for(message_id.as_str())?;
            }
            EventPayload::MessageEdit { message_id, new_content } => {
                if self.db.message_exists(message_id.as_str())? {
                    self.db.edit_message(message_id.as_str(), new_content, occurred_at)?;
                } else {
                    self.defer(
                        message_id.as_str(),
                        PendingMessageOp::Edit {
                            new_content: new_content.clone(),
                            edited_at: occurred_at.to_string(),
                        },
                    );
                }
            }
            EventPayload::MessageDelete { message_id, reason } => {
                if self.db.message_exists(message_id.as_str())? {
                    self.db.delete_message(message_id.as_str(), reason.as_deref())?;
                } else {
                    self.defer(
                        message_id.as_str(),
                        PendingMessageOp::Delete {
                            reason: reason.clone(),
                        },
                    );
                }
            }
            EventPayload::MessageMarkRead { message_id, reader } => {
                self.db.mark_message_read(message_id.as_str(), reader.as_str(), occurred_at)?;
            }
            EventPayload::GroupCreate { group_id, name } => {
                self.db.upsert_group(group_id.as_str(), name, occurred_at)?;
            }
            EventPayload::GroupRename { group_id, new_name } => {
                self.db.rename_group(group_id.as_str(), new_name)?;
            }
            EventPayload::GroupDelete { group_id } => {
                self.db.delete_group(group_id.as_str(), occurred_at)?;
            }
            EventPayload::GroupMemberAdd {
                group_id,
                member_kind,
                member_value,
            } => {
                let kind = member_kind_tag(*member_kind);
                if kind == "group" && groups::would_create_cycle(&self.db, group_id.as_str(), member_value)? {
                    tracing::warn!(group_id = %group_id, member = %member_value, "refusing cyclic group membership");
                    return Ok(());
                }
                self.db.add_group_member(group_id.as_str(), kind, member_value)?;
            }
            EventPayload::GroupMemberRemove {
                group_id,
                member_kind,
                member_value,
            } => {
                self.db
                    .remove_group_member(group_id.as_str(), member_kind_tag(*member_kind), member_value)?;
            }
            EventPayload::ContextSave {
                agent,
                session_id,
                branch,
                worktree_path,
                intent,
                current_task,
                dirty_files,
            } => {
                self.db.upsert_work_context(
                    agent.as_str(),
                    session_id.as_ref().map(|id| id.as_str()),
                    branch.as_deref(),
                    worktree_path.as_deref(),
                    intent.as_deref(),
                    current_task.as_deref(),
                    Some(dirty_files.as_slice()),
                    occurred_at,
                )?;
            }
            EventPayload::ContextClear { agent } => {
                self.db.clear_work_context(agent.as_str())?;
            }
        }
        Ok(())
    }

    fn defer(&self, message_id: &str, op: PendingMessageOp) {
        let mut pending = self.pending_message_ops.lock().unwrap_or_else(|e| e.into_inner());
        pending.entry(message_id.to_string()).or_default().push(op);
    }

    fn replay_pending_for(&self, message_id: &str) -> Result<()> {
        let ops = {
            let mut pending = self.pending_message_ops.lock().unwrap_or_else(|e| e.into_inner());
            pending.remove(message_id).unwrap_or_default()
        };
        for op in ops {
            match op {
                PendingMessageOp::Edit { new_content, edited_at } => {
                    self.db.edit_message(message_id, &new_content, &edited_at)?;
                }
                PendingMessageOp::Delete { reason } => {
                    self.db.delete_message(message_id, reason.as_deref())?;
                }
            }
        }
        Ok(())
    }
}

fn reason_tag(reason: thrum_types::SessionEndReason) -> &'static str {
    match reason {
        thrum_types::SessionEndReason::Requested => "requested",
        thrum_types::SessionEndReason::ManualCleanup => "manual_cleanup",
        thrum_types::SessionEndReason::AutomatedCleanup => "automated_cleanup",
    }
}

fn format_tag(format: thrum_types::MessageFormat) -> &'static str {
    match format {
        thrum_types::MessageFormat::Text => "text",
        thrum_types::MessageFormat::Markdown => "markdown",
    }
}

fn scope_kind_tag(kind: thrum_types::ScopeKind) -> &'static str {
    match kind {
        thrum_types::ScopeKind::Agent => "agent",
        thrum_types::ScopeKind::Role => "role",
        thrum_types::ScopeKind::Group => "group",
        thrum_types::ScopeKind::Module => "module",
        thrum_types::ScopeKind::Worktree => "worktree",
    }
}

fn reference_kind_tag(kind: thrum_types::ReferenceKind) -> &'static str {
    match kind {
        thrum_types::ReferenceKind::ReplyTo => "reply_to",
        thrum_types::ReferenceKind::Mention => "mention",
        thrum_types::ReferenceKind::Thread => "thread",
    }
}

fn member_kind_tag(kind: thrum_types::MemberKind) -> &'static str {
    match kind {
        thrum_types::MemberKind::Agent => "agent",
        thrum_types::MemberKind::Role => "role",
        thrum_types::MemberKind::Group => "group",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrum_ids::{new_event_id, new_message_id};

    fn record(payload: EventPayload) -> EventRecord {
        EventRecord::new(new_event_id(), "daemon-a", payload)
    }

    #[test]
    fn applying_the_same_event_twice_is_a_no_op() {
        let projector = Projector::new(Database::open_in_memory().unwrap());
        let msg_id = new_message_id();
        let rec = record(EventPayload::MessageCreate {
            message_id: msg_id.clone(),
            author: thrum_types::AgentName::from_validated("alice"),
            content: "hi".to_string(),
            format: Default::default(),
            scopes: vec![],
            refs: vec![],
            reply_to: None,
            acting_as: None,
            disclosed: false,
        });
        assert!(projector.apply(&rec).unwrap());
        assert!(!projector.apply(&rec).unwrap());
    }

    #[test]
    fn edit_arriving_before_create_is_deferred_then_applied() {
        let projector = Projector::new(Database::open_in_memory().unwrap());
        let msg_id = new_message_id();

        let edit = record(EventPayload::MessageEdit {
            message_id: msg_id.clone(),
            new_content: "edited".to_string(),
        });
        projector.apply(&edit).unwrap();
        assert!(!projector.database().message_exists(msg_id.as_str()).unwrap());

        let create = record(EventPayload::MessageCreate {
            message_id: msg_id.clone(),
            author: thrum_types::AgentName::from_validated("alice"),
            content: "original".to_string(),
            format: Default::default(),
            scopes: vec![],
            refs: vec![],
            reply_to: None,
            acting_as: None,
            disclosed: false,
        });
        projector.apply(&create).unwrap();

        assert!(projector.database().message_exists(msg_id.as_str()).unwrap());
        let timeline = projector.database().thread_timeline(msg_id.as_str()).unwrap();
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn group_member_add_rejects_a_cycle() {
        let projector = Projector::new(Database::open_in_memory().unwrap());
        projector.database().upsert_group("grp_a", "a", "t0").unwrap();
        projector.database().upsert_group("grp_b", "b", "t0").unwrap();
        projector
            .database()
            .add_group_member("grp_b", "group", "grp_a")
            .unwrap();

        let cyclic_add = record(EventPayload::GroupMemberAdd {
            group_id: thrum_types::GroupId::from_raw("grp_a"),
            member_kind: thrum_types::MemberKind::Group,
            member_value: "grp_b".to_string(),
        });
        projector.apply(&cyclic_add).unwrap();

        let members = projector.database().group_members("grp_a").unwrap();
        assert!(members.is_empty(), "cyclic membership must not be recorded");
    }
}
