use serde_json::json;
use thrum_runtime::Config;
use thrum_sdk::{Client, Error};
use thrum_testing::{assertions, fixtures, TestWorld};

fn daemon_error_kind(err: &Error) -> &'static str {
    match err {
        Error::Daemon(inner) => inner.kind(),
        Error::Transport(_) => "transport",
    }
}

/// Scenario 1: a DM to a recipient nobody has registered is rejected before
/// any event reaches the journal.
#[tokio::test]
async fn register_then_dm_to_unknown_recipient_is_rejected() {
    let world = TestWorld::new();
    world.active_session("alice", "impl", "auth").await;

    let err = world
        .client()
        .message_send(
            "alice",
            "hi",
            vec![json!({ "type": "agent", "value": "bob" })],
        )
        .await
        .expect_err("sending to an unregistered agent must fail");
    assert_eq!(daemon_error_kind(&err), "precondition");

    assertions::assert_inbox(&world, "alice", &[]).await;
}

/// Scenario 2: a role-scoped send fans out to every agent holding that role
/// and reports the fanout in `warnings`.
#[tokio::test]
async fn role_scoped_send_expands_to_every_role_member() {
    let world = TestWorld::new();
    world.active_session("alice", "impl", "auth").await;
    world.active_session("carol", "impl", "auth").await;

    let result = world
        .client()
        .message_send(
            "alice",
            "hi",
            vec![json!({ "type": "role", "value": "impl" })],
        )
        .await
        .expect("role-scoped send should succeed");
    let warnings = result["warnings"].as_array().expect("warnings must be an array");
    assert!(
        warnings.iter().any(|w| w.as_str().unwrap_or_default().contains("impl")),
        "expected a warning naming the 'impl' role fanout, got {warnings:?}"
    );

    assertions::assert_inbox(&world, "alice", &["hi"]).await;
    assertions::assert_inbox(&world, "carol", &["hi"]).await;
}

/// Scenario 3: a reply keeps its `reply_to` link and both messages are
/// visible newest-first to a participant of the thread.
#[tokio::test]
async fn reply_preserves_thread_and_ordering() {
    let world = TestWorld::new();
    world.active_session("alice", "impl", "auth").await;
    world.active_session("bob", "impl", "auth").await;

    let sent = world.send_to_everyone("alice", "hi").await;
    let original_id = sent["message_id"].as_str().expect("message_id").to_string();

    world
        .client()
        .call(
            "message.send",
            json!({
                "caller": "bob",
                "content": "ok",
                "scopes": [{ "type": "group", "value": "everyone" }],
                "reply_to": original_id,
            }),
        )
        .await
        .expect("reply should succeed");

    let listed = world
        .client()
        .message_list("alice")
        .await
        .expect("message.list should succeed");
    let messages = listed["messages"].as_array().expect("messages must be an array");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "ok");
    assert_eq!(messages[0]["reply_to"], json!(original_id));
    assert_eq!(messages[1]["content"], "hi");
}

/// Scenario 4: nesting a group as a member of its own member is rejected as
/// a cycle, and the rejected edge never shows up in `group.members --expand`.
#[tokio::test]
async fn group_cycle_is_rejected() {
    let world = TestWorld::new();
    let client = world.client();

    client.call("group.create", json!({ "name": "leads" })).await.unwrap();
    client.call("group.create", json!({ "name": "backend" })).await.unwrap();
    client
        .call(
            "group.memberAdd",
            json!({ "name": "backend", "member_kind": "group", "member_value": "leads" }),
        )
        .await
        .unwrap();

    let err = client
        .call(
            "group.memberAdd",
            json!({ "name": "leads", "member_kind": "group", "member_value": "backend" }),
        )
        .await
        .expect_err("nesting a group back into one of its own members must fail");
    assert_eq!(daemon_error_kind(&err), "precondition");

    let expanded = client
        .call("group.members", json!({ "name": "leads", "expand": true }))
        .await
        .unwrap();
    let agents = expanded["agents"].as_array().expect("agents must be an array");
    assert!(agents.is_empty());
}

/// Scenario 5: two daemons on the same git origin converge on the same
/// event history after both push and pull, and a repeat sync is a no-op.
#[tokio::test]
async fn two_daemons_converge_after_sync() {
    let remote_dir = tempfile::tempdir().unwrap();
    let init = tokio::process::Command::new("git")
        .args(["init", "--quiet", "--bare"])
        .arg(remote_dir.path())
        .output()
        .await
        .unwrap();
    assert!(init.status.success());
    let remote = remote_dir.path().to_string_lossy().to_string();

    let data_dir_a = tempfile::tempdir().unwrap();
    let mut config_a = Config::default();
    config_a.sync_remote = Some(remote.clone());
    config_a.save_to(data_dir_a.path()).unwrap();
    let client_a = Client::open(data_dir_a.path(), "r_sync_test", "node_a").unwrap();

    let data_dir_b = tempfile::tempdir().unwrap();
    let mut config_b = Config::default();
    config_b.sync_remote = Some(remote);
    config_b.save_to(data_dir_b.path()).unwrap();
    let client_b = Client::open(data_dir_b.path(), "r_sync_test", "node_b").unwrap();

    client_a.agent_register("alice", "impl", "auth").await.unwrap();
    client_a.session_start("alice").await.unwrap();
    client_a
        .message_send("alice", "from-a", vec![json!({ "type": "group", "value": "everyone" })])
        .await
        .unwrap();

    client_b.agent_register("bob", "impl", "auth").await.unwrap();
    client_b.session_start("bob").await.unwrap();
    client_b
        .message_send("bob", "from-b", vec![json!({ "type": "group", "value": "everyone" })])
        .await
        .unwrap();

    client_a.sync(true).await.unwrap();
    client_b.sync(true).await.unwrap();
    client_a.sync(true).await.unwrap();

    let on_a = client_a.message_list("alice").await.unwrap();
    let mut contents_a: Vec<String> = on_a["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    contents_a.sort();
    assert_eq!(contents_a, vec!["from-a".to_string(), "from-b".to_string()]);

    let on_b = client_b.message_list("bob").await.unwrap();
    let mut contents_b: Vec<String> = on_b["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    contents_b.sort();
    assert_eq!(contents_b, vec!["from-a".to_string(), "from-b".to_string()]);

    // Rerunning sync with nothing new to push or pull is a no-op.
    client_a.sync(true).await.unwrap();
    let on_a_again = client_a.message_list("alice").await.unwrap();
    assert_eq!(on_a_again["messages"].as_array().unwrap().len(), 2);
}

/// Scenario 6: `created_after` alone admits a same-timestamp re-delivery;
/// pairing it with the caller's seen-id set closes that gap.
#[tokio::test]
async fn wait_excludes_already_seen_messages_at_the_poll_boundary() {
    let world = TestWorld::new();
    world.active_session("alice", "impl", "auth").await;

    let before = chrono::Utc::now().to_rfc3339();
    let sent = world.send_to_everyone("alice", "m1").await;
    let message_id = sent["message_id"].as_str().expect("message_id").to_string();

    let first_page = world
        .client()
        .call("message.list", json!({ "for_agent": "alice", "created_after": before }))
        .await
        .unwrap();
    let first_messages = first_page["messages"].as_array().unwrap();
    assert_eq!(first_messages.len(), 1);
    assert_eq!(first_messages[0]["id"], json!(message_id));

    let created_at = first_messages[0]["created_at"].as_str().unwrap().to_string();
    let second_page = world
        .client()
        .call(
            "message.list",
            json!({
                "for_agent": "alice",
                "created_after": created_at,
                "seen": [message_id],
            }),
        )
        .await
        .unwrap();
    assert!(second_page["messages"].as_array().unwrap().is_empty());
}

/// Extra coverage beyond §8's minimum: the standard roster fixture and
/// `assert_roster` round-trip cleanly against `team.list`.
#[tokio::test]
async fn standard_roster_is_visible_in_team_list() {
    let world = TestWorld::new();
    fixtures::standard_roster(&world).await;
    assertions::assert_roster(&world, &["operator", "worker_a", "worker_b"]).await;
}
