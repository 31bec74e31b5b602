use crate::error::Result;
use crate::schema;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// A row identifying a message that matched an inbox lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxEntry {
    pub message_id: String,
    pub author: String,
    pub created_at: String,
    pub read: bool,
}

/// A message's full projected row, for `message.get`/`message.list`
/// responses that need content rather than just identity.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    pub author: String,
    pub content: String,
    pub format: String,
    pub reply_to: Option<String>,
    pub acting_as: Option<String>,
    pub disclosed: bool,
    pub created_at: String,
    pub edited_at: Option<String>,
    pub deleted: bool,
    pub delete_reason: Option<String>,
    pub scopes: Vec<(String, String)>,
    pub refs: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentRecord {
    pub name: String,
    pub agent_id: Option<String>,
    pub role: Option<String>,
    pub module: Option<String>,
    pub display: Option<String>,
    pub hostname: Option<String>,
    pub registered_at: String,
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub agent: String,
    pub state: String,
    pub started_at: String,
    pub last_heartbeat_at: String,
    pub ended_at: Option<String>,
    pub end_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkContextRecord {
    pub agent: String,
    pub session_id: Option<String>,
    pub branch: Option<String>,
    pub worktree_path: Option<String>,
    pub intent: Option<String>,
    pub current_task: Option<String>,
    pub dirty_files: Vec<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncCheckpointRecord {
    pub peer_id: String,
    pub last_pushed_event_id: Option<String>,
    pub last_pulled_event_id: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupMembershipEntry {
    pub group_id: String,
    pub group_name: String,
}

/// The SQLite-backed projection store. Holds a single connection behind a
/// mutex: every write (and every read that must see a consistent snapshot
/// with its writes) goes through this one handle, matching the daemon's
/// single-writer discipline — SQLite's own locking would serialize writers
/// anyway, and a dedicated mutex lets readers get a clear error instead of
/// `SQLITE_BUSY` retries under normal load.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.pragma_update(None, "wal_autocheckpoint", 1000)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    // -- event idempotency -------------------------------------------------

    /// Record `event_id` as applied. Returns `false` without touching any
    /// other table if the event was already applied, so callers can treat
    /// projection as idempotent under at-least-once replay.
    pub fn mark_event_applied(
        &self,
        event_id: &str,
        event_type: &str,
        origin_daemon: Option<&str>,
        occurred_at: &str,
        applied_at: &str,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let changed = conn.execute(
            "INSERT OR IGNORE INTO events (event_id, event_type, origin_daemon, occurred_at, applied_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![event_id, event_type, origin_daemon, occurred_at, applied_at],
        )?;
        Ok(changed == 1)
    }

    pub fn has_applied_event(&self, event_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM events WHERE event_id = ?1",
                params![event_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    // -- agents -------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn upsert_agent(
        &self,
        name: &str,
        agent_id: Option<&str>,
        role: Option<&str>,
        module: Option<&str>,
        display: Option<&str>,
        hostname: Option<&str>,
        registered_at: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO agents (name, agent_id, role, module, display, hostname, registered_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)
             ON CONFLICT(name) DO UPDATE SET
                agent_id = excluded.agent_id,
                role = excluded.role,
                module = excluded.module,
                display = excluded.display,
                hostname = excluded.hostname,
                deleted_at = NULL",
            params![name, agent_id, role, module, display, hostname, registered_at],
        )?;
        Ok(())
    }

    pub fn mark_agent_deleted(&self, name: &str, deleted_at: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "UPDATE agents SET deleted_at = ?2 WHERE name = ?1",
            params![name, deleted_at],
        )?;
        Ok(())
    }

    pub fn agents_by_role(&self, role: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT name FROM agents WHERE role = ?1 AND deleted_at IS NULL",
        )?;
        let rows = stmt.query_map(params![role], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn agent_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM agents WHERE name = ?1 AND deleted_at IS NULL",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    // -- messages -------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn insert_message(
        &self,
        id: &str,
        author: &str,
        content: &str,
        format: &str,
        reply_to: Option<&str>,
        acting_as: Option<&str>,
        disclosed: bool,
        created_at: &str,
        scopes: &[(String, String)],
        refs: &[(String, String)],
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO messages (id, author, content, format, reply_to, acting_as, disclosed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![id, author, content, format, reply_to, acting_as, disclosed as i64, created_at],
        )?;
        for (kind, value) in scopes {
            tx.execute(
                "INSERT OR IGNORE INTO message_scopes (message_id, kind, value) VALUES (?1, ?2, ?3)",
                params![id, kind, value],
            )?;
        }
        for (kind, value) in refs {
            tx.execute(
                "INSERT OR IGNORE INTO message_refs (message_id, kind, value) VALUES (?1, ?2, ?3)",
                params![id, kind, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn edit_message(&self, id: &str, new_content: &str, edited_at: &str) -> Result<Option<String>> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        // Materialize the prior content before the UPDATE below changes it;
        // re-querying after the write would just read back the new value.
        let old_content: Option<String> = tx
            .query_row("SELECT content FROM messages WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        let Some(old_content) = old_content else {
            return Ok(None);
        };
        tx.execute(
            "UPDATE messages SET content = ?2, edited_at = ?3 WHERE id = ?1",
            params![id, new_content, edited_at],
        )?;
        tx.execute(
            "INSERT INTO message_edits (message_id, old_content, new_content, edited_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, old_content, new_content, edited_at],
        )?;
        tx.commit()?;
        Ok(Some(old_content))
    }

    pub fn delete_message(&self, id: &str, reason: Option<&str>) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "UPDATE messages SET deleted = 1, delete_reason = ?2 WHERE id = ?1",
            params![id, reason],
        )?;
        Ok(())
    }

    pub fn message_exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let exists: Option<i64> = conn
            .query_row("SELECT 1 FROM messages WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(exists.is_some())
    }

    pub fn mark_message_read(&self, message_id: &str, reader: &str, read_at: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT OR IGNORE INTO message_reads (message_id, reader, read_at) VALUES (?1, ?2, ?3)",
            params![message_id, reader, read_at],
        )?;
        Ok(())
    }

    /// Hot path: every message scoped to any of `(kind, value)` pairs a
    /// recipient resolves to (their own name, their role, every group they
    /// belong to), newest first, annotated with whether `reader` has read it.
    pub fn inbox_for_recipient(
        &self,
        reader: &str,
        scope_pairs: &[(String, String)],
        limit: u32,
    ) -> Result<Vec<InboxEntry>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        if scope_pairs.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (0..scope_pairs.len())
            .map(|i| format!("(?{}, ?{})", i * 2 + 2, i * 2 + 3))
            .collect();
        let sql = format!(
            "SELECT DISTINCT m.id, m.author, m.created_at,
                    EXISTS(SELECT 1 FROM message_reads r WHERE r.message_id = m.id AND r.reader = ?1) AS is_read
             FROM messages m
             JOIN message_scopes s ON s.message_id = m.id
             WHERE m.deleted = 0 AND (s.kind, s.value) IN ({})
             ORDER BY m.created_at DESC
             LIMIT {}",
            placeholders.join(", "),
            limit
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut bind_params: Vec<&dyn rusqlite::ToSql> = vec![&reader];
        for (kind, value) in scope_pairs {
            bind_params.push(kind);
            bind_params.push(value);
        }
        let rows = stmt.query_map(bind_params.as_slice(), |row| {
            Ok(InboxEntry {
                message_id: row.get(0)?,
                author: row.get(1)?,
                created_at: row.get(2)?,
                read: row.get::<_, i64>(3)? != 0,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn unread_count_for_recipient(&self, reader: &str, scope_pairs: &[(String, String)]) -> Result<u32> {
        let entries = self.inbox_for_recipient(reader, scope_pairs, u32::MAX)?;
        Ok(entries.iter().filter(|e| !e.read).count() as u32)
    }

    /// Hot path: every message in a reply chain rooted at `root_message_id`,
    /// oldest first.
    pub fn thread_timeline(&self, root_message_id: &str) -> Result<Vec<InboxEntry>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "WITH RECURSIVE chain(id) AS (
                SELECT id FROM messages WHERE id = ?1
                UNION ALL
                SELECT m.id FROM messages m JOIN chain c ON m.reply_to = c.id
            )
            SELECT m.id, m.author, m.created_at, 0 AS is_read
            FROM messages m JOIN chain c ON m.id = c.id
            ORDER BY m.created_at ASC",
        )?;
        let rows = stmt.query_map(params![root_message_id], |row| {
            Ok(InboxEntry {
                message_id: row.get(0)?,
                author: row.get(1)?,
                created_at: row.get(2)?,
                read: false,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    // -- groups ---------------------------------------------------------------

    pub fn upsert_group(&self, id: &str, name: &str, created_at: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO groups (id, name, created_at, deleted_at) VALUES (?1, ?2, ?3, NULL)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, deleted_at = NULL",
            params![id, name, created_at],
        )?;
        Ok(())
    }

    pub fn rename_group(&self, id: &str, new_name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("UPDATE groups SET name = ?2 WHERE id = ?1", params![id, new_name])?;
        Ok(())
    }

    pub fn delete_group(&self, id: &str, deleted_at: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("UPDATE groups SET deleted_at = ?2 WHERE id = ?1", params![id, deleted_at])?;
        Ok(())
    }

    pub fn add_group_member(&self, group_id: &str, kind: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, kind, value) VALUES (?1, ?2, ?3)",
            params![group_id, kind, value],
        )?;
        Ok(())
    }

    pub fn remove_group_member(&self, group_id: &str, kind: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND kind = ?2 AND value = ?3",
            params![group_id, kind, value],
        )?;
        Ok(())
    }

    /// Hot path: every non-deleted group containing `(kind, value)` as a
    /// direct member. Recursive (group-of-groups) expansion is done by the
    /// engine's cycle-safe resolver, not here.
    pub fn direct_group_membership(&self, kind: &str, value: &str) -> Result<Vec<GroupMembershipEntry>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT g.id, g.name FROM group_members gm
             JOIN groups g ON g.id = gm.group_id
             WHERE gm.kind = ?1 AND gm.value = ?2 AND g.deleted_at IS NULL",
        )?;
        let rows = stmt.query_map(params![kind, value], |row| {
            Ok(GroupMembershipEntry {
                group_id: row.get(0)?,
                group_name: row.get(1)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn group_members(&self, group_id: &str) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT kind, value FROM group_members WHERE group_id = ?1",
        )?;
        let rows = stmt.query_map(params![group_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    // -- sessions ---------------------------------------------------------------

    pub fn upsert_session(
        &self,
        id: &str,
        agent: &str,
        state: &str,
        started_at: &str,
        last_heartbeat_at: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO sessions (id, agent, state, started_at, last_heartbeat_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET state = excluded.state, last_heartbeat_at = excluded.last_heartbeat_at",
            params![id, agent, state, started_at, last_heartbeat_at],
        )?;
        Ok(())
    }

    pub fn touch_session_heartbeat(&self, id: &str, heartbeat_at: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "UPDATE sessions SET last_heartbeat_at = ?2 WHERE id = ?1",
            params![id, heartbeat_at],
        )?;
        Ok(())
    }

    pub fn end_session(&self, id: &str, ended_at: &str, reason: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "UPDATE sessions SET state = 'ended', ended_at = ?2, end_reason = ?3 WHERE id = ?1",
            params![id, ended_at, reason],
        )?;
        Ok(())
    }

    pub fn session_agent(&self, id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row("SELECT agent FROM sessions WHERE id = ?1", params![id], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    // -- subscriptions ---------------------------------------------------------------

    pub fn insert_subscription(
        &self,
        id: &str,
        session_id: &str,
        scope_kind: Option<&str>,
        scope_value: Option<&str>,
        mention_of: Option<&str>,
        created_at: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO subscriptions (id, session_id, scope_kind, scope_value, mention_of, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, session_id, scope_kind, scope_value, mention_of, created_at],
        )?;
        Ok(())
    }

    pub fn subscriptions_for_session(&self, session_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare("SELECT id FROM subscriptions WHERE session_id = ?1")?;
        let rows = stmt.query_map(params![session_id], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    // -- sync checkpoints ---------------------------------------------------------------

    pub fn upsert_sync_checkpoint(
        &self,
        peer_id: &str,
        last_pushed_event_id: Option<&str>,
        last_pulled_event_id: Option<&str>,
        updated_at: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO sync_checkpoints (peer_id, last_pushed_event_id, last_pulled_event_id, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(peer_id) DO UPDATE SET
                last_pushed_event_id = COALESCE(excluded.last_pushed_event_id, sync_checkpoints.last_pushed_event_id),
                last_pulled_event_id = COALESCE(excluded.last_pulled_event_id, sync_checkpoints.last_pulled_event_id),
                updated_at = excluded.updated_at",
            params![peer_id, last_pushed_event_id, last_pulled_event_id, updated_at],
        )?;
        Ok(())
    }

    pub fn vacuum(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute_batch("VACUUM;")?;
        Ok(())
    }

    // -- extended reads, for RPC handlers -------------------------------------

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let row: Option<(String, String, String, String, Option<String>, Option<String>, i64, String, Option<String>, i64, Option<String>)> = conn
            .query_row(
                "SELECT id, author, content, format, reply_to, acting_as, disclosed, created_at, edited_at, deleted, delete_reason
                 FROM messages WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?,
                        row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?, row.get(10)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, author, content, format, reply_to, acting_as, disclosed, created_at, edited_at, deleted, delete_reason)) = row else {
            return Ok(None);
        };

        let mut scope_stmt = conn.prepare("SELECT kind, value FROM message_scopes WHERE message_id = ?1")?;
        let scopes = scope_stmt
            .query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut ref_stmt = conn.prepare("SELECT kind, value FROM message_refs WHERE message_id = ?1")?;
        let refs = ref_stmt
            .query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(MessageRecord {
            id,
            author,
            content,
            format,
            reply_to,
            acting_as,
            disclosed: disclosed != 0,
            created_at,
            edited_at,
            deleted: deleted != 0,
            delete_reason,
            scopes,
            refs,
        }))
    }

    /// Messages scoped to any of `scope_pairs`, newest first, optionally
    /// restricted to those created strictly after `created_after` and always
    /// excluding `seen_ids` — the basis for `message.list`'s wait/poll
    /// semantics, where a `created_after` timestamp alone can't tell two
    /// same-millisecond messages apart.
    pub fn list_messages(
        &self,
        scope_pairs: &[(String, String)],
        created_after: Option<&str>,
        seen_ids: &[String],
        limit: u32,
    ) -> Result<Vec<MessageRecord>> {
        if scope_pairs.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let placeholders: Vec<String> = (0..scope_pairs.len())
            .map(|i| format!("(?{}, ?{})", i * 2 + 1, i * 2 + 2))
            .collect();
        let after_clause = created_after.map(|_| format!(" AND m.created_at > ?{}", scope_pairs.len() * 2 + 1));
        let sql = format!(
            "SELECT DISTINCT m.id FROM messages m
             JOIN message_scopes s ON s.message_id = m.id
             WHERE (s.kind, s.value) IN ({}){}
             ORDER BY m.created_at DESC
             LIMIT {}",
            placeholders.join(", "),
            after_clause.clone().unwrap_or_default(),
            limit
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut bind_params: Vec<&dyn rusqlite::ToSql> = Vec::new();
        for (kind, value) in scope_pairs {
            bind_params.push(kind);
            bind_params.push(value);
        }
        if let Some(after) = &created_after {
            bind_params.push(after);
        }
        let ids: Vec<String> = stmt
            .query_map(bind_params.as_slice(), |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        // `created_after` alone can't disambiguate two messages minted in
        // the same millisecond; the caller's seen-id set catches the ones
        // it already has so a poll never re-delivers them.
        let ids: Vec<String> = ids.into_iter().filter(|id| !seen_ids.iter().any(|seen| seen == id)).collect();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_message(&id)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    pub fn get_agent(&self, name: &str) -> Result<Option<AgentRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT name, agent_id, role, module, display, hostname, registered_at, deleted_at
             FROM agents WHERE name = ?1",
            params![name],
            |row| {
                Ok(AgentRecord {
                    name: row.get(0)?,
                    agent_id: row.get(1)?,
                    role: row.get(2)?,
                    module: row.get(3)?,
                    display: row.get(4)?,
                    hostname: row.get(5)?,
                    registered_at: row.get(6)?,
                    deleted_at: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn list_agents(&self, include_deleted: bool) -> Result<Vec<AgentRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let sql = if include_deleted {
            "SELECT name, agent_id, role, module, display, hostname, registered_at, deleted_at FROM agents ORDER BY name"
        } else {
            "SELECT name, agent_id, role, module, display, hostname, registered_at, deleted_at FROM agents WHERE deleted_at IS NULL ORDER BY name"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(AgentRecord {
                name: row.get(0)?,
                agent_id: row.get(1)?,
                role: row.get(2)?,
                module: row.get(3)?,
                display: row.get(4)?,
                hostname: row.get(5)?,
                registered_at: row.get(6)?,
                deleted_at: row.get(7)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get_group_by_name(&self, name: &str) -> Result<Option<(String, String)>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT id, name FROM groups WHERE name = ?1 AND deleted_at IS NULL",
            params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn list_groups(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare("SELECT id, name FROM groups WHERE deleted_at IS NULL ORDER BY name")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT id, agent, state, started_at, last_heartbeat_at, ended_at, end_reason FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok(SessionRecord {
                    id: row.get(0)?,
                    agent: row.get(1)?,
                    state: row.get(2)?,
                    started_at: row.get(3)?,
                    last_heartbeat_at: row.get(4)?,
                    ended_at: row.get(5)?,
                    end_reason: row.get(6)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn list_sessions_for_agent(&self, agent: &str) -> Result<Vec<SessionRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT id, agent, state, started_at, last_heartbeat_at, ended_at, end_reason
             FROM sessions WHERE agent = ?1 ORDER BY started_at DESC",
        )?;
        let rows = stmt.query_map(params![agent], |row| {
            Ok(SessionRecord {
                id: row.get(0)?,
                agent: row.get(1)?,
                state: row.get(2)?,
                started_at: row.get(3)?,
                last_heartbeat_at: row.get(4)?,
                ended_at: row.get(5)?,
                end_reason: row.get(6)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn remove_subscription(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM subscriptions WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn remove_subscriptions_for_session(&self, session_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM subscriptions WHERE session_id = ?1", params![session_id])?;
        Ok(())
    }

    pub fn get_subscription(&self, id: &str) -> Result<Option<(String, Option<String>, Option<String>, Option<String>)>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT session_id, scope_kind, scope_value, mention_of FROM subscriptions WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .map_err(Into::into)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn upsert_work_context(
        &self,
        agent: &str,
        session_id: Option<&str>,
        branch: Option<&str>,
        worktree_path: Option<&str>,
        intent: Option<&str>,
        current_task: Option<&str>,
        dirty_files: Option<&[String]>,
        updated_at: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let dirty_json = dirty_files
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| crate::Error::Query(format!("encoding dirty_files: {e}")))?;
        conn.execute(
            "INSERT INTO agent_work_contexts (agent, session_id, branch, worktree_path, intent, current_task, dirty_files, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, '[]'), ?8)
             ON CONFLICT(agent) DO UPDATE SET
                session_id = excluded.session_id,
                branch = COALESCE(?3, agent_work_contexts.branch),
                worktree_path = COALESCE(?4, agent_work_contexts.worktree_path),
                intent = COALESCE(?5, agent_work_contexts.intent),
                current_task = COALESCE(?6, agent_work_contexts.current_task),
                dirty_files = COALESCE(?7, agent_work_contexts.dirty_files),
                updated_at = excluded.updated_at",
            params![agent, session_id, branch, worktree_path, intent, current_task, dirty_json, updated_at],
        )?;
        Ok(())
    }

    pub fn get_work_context(&self, agent: &str) -> Result<Option<WorkContextRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let row: Option<(String, Option<String>, Option<String>, Option<String>, Option<String>, Option<String>, String, String)> = conn
            .query_row(
                "SELECT agent, session_id, branch, worktree_path, intent, current_task, dirty_files, updated_at
                 FROM agent_work_contexts WHERE agent = ?1",
                params![agent],
                |row| {
                    Ok((
                        row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?,
                        row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?,
                    ))
                },
            )
            .optional()?;
        let Some((agent, session_id, branch, worktree_path, intent, current_task, dirty_json, updated_at)) = row else {
            return Ok(None);
        };
        let dirty_files: Vec<String> = serde_json::from_str(&dirty_json).unwrap_or_default();
        Ok(Some(WorkContextRecord {
            agent,
            session_id,
            branch,
            worktree_path,
            intent,
            current_task,
            dirty_files,
            updated_at,
        }))
    }

    pub fn clear_work_context(&self, agent: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM agent_work_contexts WHERE agent = ?1", params![agent])?;
        Ok(())
    }

    pub fn list_sync_checkpoints(&self) -> Result<Vec<SyncCheckpointRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT peer_id, last_pushed_event_id, last_pulled_event_id, updated_at FROM sync_checkpoints ORDER BY peer_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SyncCheckpointRecord {
                peer_id: row.get(0)?,
                last_pushed_event_id: row.get(1)?,
                last_pulled_event_id: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_event_applied_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.mark_event_applied("evt_1", "message.create", None, "t0", "t0").unwrap());
        assert!(!db.mark_event_applied("evt_1", "message.create", None, "t0", "t0").unwrap());
        assert!(db.has_applied_event("evt_1").unwrap());
    }

    #[test]
    fn inbox_resolves_by_scope_and_tracks_read_state() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_agent("alice", None, None, None, None, None, "t0").unwrap();
        db.insert_message(
            "msg_1",
            "alice",
            "hi",
            "text",
            None,
            None,
            false,
            "t0",
            &[("agent".to_string(), "bob".to_string())],
            &[],
        )
        .unwrap();

        let inbox = db
            .inbox_for_recipient("bob", &[("agent".to_string(), "bob".to_string())], 50)
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(!inbox[0].read);

        db.mark_message_read("msg_1", "bob", "t1").unwrap();
        let inbox = db
            .inbox_for_recipient("bob", &[("agent".to_string(), "bob".to_string())], 50)
            .unwrap();
        assert!(inbox[0].read);
    }

    #[test]
    fn edit_message_materializes_old_content_before_overwriting() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message("msg_1", "alice", "v1", "text", None, None, false, "t0", &[], &[]).unwrap();
        let old = db.edit_message("msg_1", "v2", "t1").unwrap();
        assert_eq!(old, Some("v1".to_string()));
    }

    #[test]
    fn thread_timeline_follows_reply_chain_in_order() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message("msg_1", "alice", "root", "text", None, None, false, "t0", &[], &[]).unwrap();
        db.insert_message("msg_2", "bob", "reply", "text", Some("msg_1"), None, false, "t1", &[], &[]).unwrap();
        let timeline = db.thread_timeline("msg_1").unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].message_id, "msg_1");
        assert_eq!(timeline[1].message_id, "msg_2");
    }

    #[test]
    fn group_membership_reverse_lookup() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_group("grp_1", "backend", "t0").unwrap();
        db.add_group_member("grp_1", "agent", "alice").unwrap();
        let groups = db.direct_group_membership("agent", "alice").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_name, "backend");
    }
}
