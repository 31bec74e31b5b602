use crate::world::TestWorld;

/// Asserts `world`'s roster contains exactly `expected` agents (by name),
/// ignoring order. Panics with a readable diff on mismatch rather than a
/// bare `assert_eq!` on the raw JSON.
pub async fn assert_roster(world: &TestWorld, expected: &[&str]) {
    let roster = world
        .client()
        .team_list()
        .await
        .expect("team.list failed");
    let mut names: Vec<String> = roster["roster"]
        .as_array()
        .expect("roster must be an array")
        .iter()
        .map(|entry| entry["agent"]["name"].as_str().unwrap_or_default().to_string())
        .collect();
    names.sort();
    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(names, expected, "roster mismatch");
}

/// Asserts `agent`'s inbox (via `message.list`) contains exactly
/// `expected_contents`, in delivery order.
pub async fn assert_inbox(world: &TestWorld, agent: &str, expected_contents: &[&str]) {
    let listed = world
        .client()
        .message_list(agent)
        .await
        .unwrap_or_else(|e| panic!("message.list for '{agent}' failed: {e}"));
    let contents: Vec<String> = listed["messages"]
        .as_array()
        .expect("messages must be an array")
        .iter()
        .map(|m| m["content"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(contents, expected_contents, "inbox mismatch for '{agent}'");
}
