use crate::error::Result;
use rusqlite::Connection;

/// Current schema version. Each entry in [`MIGRATIONS`] brings the database
/// from `index - 1` to `index`; a fresh database runs every migration in
/// order, an existing one resumes from its stored `user_version`.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

const MIGRATIONS: &[&str] = &[
    // v1: event idempotency ledger. Every applied event's id is recorded
    // here so a replay (startup, post-sync-pull) can skip events it has
    // already projected.
    r#"
    CREATE TABLE events (
        event_id TEXT PRIMARY KEY,
        event_type TEXT NOT NULL,
        origin_daemon TEXT,
        occurred_at TEXT NOT NULL,
        applied_at TEXT NOT NULL
    );
    "#,
    // v2: agents.
    r#"
    CREATE TABLE agents (
        name TEXT PRIMARY KEY,
        agent_id TEXT,
        role TEXT,
        module TEXT,
        display TEXT,
        hostname TEXT,
        registered_at TEXT NOT NULL,
        deleted_at TEXT
    );
    "#,
    // v3: sessions, plus the scopes/refs a session's work context carries.
    r#"
    CREATE TABLE sessions (
        id TEXT PRIMARY KEY,
        agent TEXT NOT NULL REFERENCES agents(name),
        state TEXT NOT NULL,
        started_at TEXT NOT NULL,
        last_heartbeat_at TEXT NOT NULL,
        ended_at TEXT,
        end_reason TEXT
    );
    CREATE INDEX idx_sessions_agent ON sessions(agent);
    CREATE INDEX idx_sessions_state ON sessions(state);
    "#,
    // v4: messages, the core timeline entity.
    r#"
    CREATE TABLE messages (
        id TEXT PRIMARY KEY,
        author TEXT NOT NULL,
        content TEXT NOT NULL,
        format TEXT NOT NULL DEFAULT 'text',
        reply_to TEXT,
        acting_as TEXT,
        disclosed INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        edited_at TEXT,
        deleted INTEGER NOT NULL DEFAULT 0,
        delete_reason TEXT
    );
    CREATE INDEX idx_messages_author_created ON messages(author, created_at);
    CREATE INDEX idx_messages_reply_to ON messages(reply_to);
    "#,
    // v5: the scope/reference fan-out tables that drive inbox resolution.
    r#"
    CREATE TABLE message_scopes (
        message_id TEXT NOT NULL REFERENCES messages(id),
        kind TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (message_id, kind, value)
    );
    CREATE INDEX idx_message_scopes_lookup ON message_scopes(kind, value, message_id);

    CREATE TABLE message_refs (
        message_id TEXT NOT NULL REFERENCES messages(id),
        kind TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (message_id, kind, value)
    );
    CREATE INDEX idx_message_refs_value ON message_refs(kind, value);
    "#,
    // v6: edit history, kept for audit even though `messages` holds the
    // current content.
    r#"
    CREATE TABLE message_edits (
        message_id TEXT NOT NULL REFERENCES messages(id),
        old_content TEXT NOT NULL,
        new_content TEXT NOT NULL,
        edited_at TEXT NOT NULL
    );
    CREATE INDEX idx_message_edits_message ON message_edits(message_id, edited_at);
    "#,
    // v7: read receipts, keyed by (message, reader) so a re-read is a no-op.
    r#"
    CREATE TABLE message_reads (
        message_id TEXT NOT NULL REFERENCES messages(id),
        reader TEXT NOT NULL,
        read_at TEXT NOT NULL,
        PRIMARY KEY (message_id, reader)
    );
    CREATE INDEX idx_message_reads_reader ON message_reads(reader, read_at);
    "#,
    // v8: threads, derived from reply_to chains and explicit thread refs.
    r#"
    CREATE TABLE threads (
        id TEXT PRIMARY KEY,
        root_message_id TEXT NOT NULL REFERENCES messages(id),
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_threads_root ON threads(root_message_id);
    "#,
    // v9: groups and membership, with cycle prevention enforced in the
    // projector rather than at the schema layer (SQLite has no recursive
    // check constraints).
    r#"
    CREATE TABLE groups (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL,
        deleted_at TEXT
    );
    CREATE TABLE group_members (
        group_id TEXT NOT NULL REFERENCES groups(id),
        kind TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (group_id, kind, value)
    );
    CREATE INDEX idx_group_members_reverse ON group_members(kind, value, group_id);
    "#,
    // v10: live subscriptions, rehydrated on daemon restart from the
    // projection rather than kept only in memory.
    r#"
    CREATE TABLE subscriptions (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL REFERENCES sessions(id),
        scope_kind TEXT,
        scope_value TEXT,
        mention_of TEXT,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_subscriptions_session ON subscriptions(session_id);
    "#,
    // v11: sync checkpoints and the work-context side table.
    r#"
    CREATE TABLE sync_checkpoints (
        peer_id TEXT PRIMARY KEY,
        last_pushed_event_id TEXT,
        last_pulled_event_id TEXT,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE agent_work_contexts (
        agent TEXT PRIMARY KEY REFERENCES agents(name),
        session_id TEXT,
        branch TEXT,
        worktree_path TEXT,
        intent TEXT,
        current_task TEXT,
        dirty_files TEXT NOT NULL DEFAULT '[]',
        updated_at TEXT NOT NULL
    );
    "#,
];

/// Bring `conn`'s schema up to [`SCHEMA_VERSION`], running only the
/// migrations it hasn't already applied. Unlike a drop-and-recreate reset,
/// this preserves the projection across daemon upgrades — the projection is
/// a cache, but rebuilding it from the full journal on every restart would
/// make startup latency scale with journal size instead of with the
/// upgrade delta.
pub fn migrate(conn: &Connection) -> Result<()> {
    let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current > SCHEMA_VERSION {
        return Err(crate::Error::Query(format!(
            "database schema version {current} is newer than this build supports ({SCHEMA_VERSION})"
        )));
    }
    for (idx, migration) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        conn.execute_batch(migration)?;
        conn.pragma_update(None, "user_version", (idx + 1) as u32)?;
        tracing::info!(version = idx + 1, "applied projection store migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
    }

    #[test]
    fn refuses_to_open_a_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1).unwrap();
        assert!(migrate(&conn).is_err());
    }
}
