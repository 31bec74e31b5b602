use serde_json::Value;

/// Union-merge two versions of a JSONL journal file by `event_id`, keeping
/// exactly one line per id (the local copy wins on a byte-for-byte
/// disagreement, which should never happen since event ids are
/// content-addressed by mint time, not by content) and emitting lines in
/// ascending `event_id` order — which is also chronological order, since ids
/// are time-ordered.
pub fn union_by_event_id(local: &str, remote: &str) -> String {
    let mut by_id: std::collections::BTreeMap<String, String> = std::collections::BTreeMap::new();

    for line in remote.lines().chain(local.lines()) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(id) = extract_event_id(trimmed) {
            by_id.insert(id, trimmed.to_string());
        }
    }

    let mut out = String::new();
    for line in by_id.values() {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn extract_event_id(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line).ok()?;
    value.get("event_id")?.as_str().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_dedupes_by_event_id_and_sorts_chronologically() {
        let local = "{\"event_id\":\"evt_b\",\"type\":\"x\"}\n{\"event_id\":\"evt_a\",\"type\":\"x\"}\n";
        let remote = "{\"event_id\":\"evt_a\",\"type\":\"x\"}\n{\"event_id\":\"evt_c\",\"type\":\"x\"}\n";

        let merged = union_by_event_id(local, remote);
        let ids: Vec<&str> = merged
            .lines()
            .map(|l| l.split("evt_").nth(1).unwrap().split('"').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_inputs_merge_to_empty() {
        assert_eq!(union_by_event_id("", ""), "");
    }

    #[test]
    fn malformed_lines_are_skipped_rather_than_failing_the_merge() {
        let local = "not json\n{\"event_id\":\"evt_a\"}\n";
        let merged = union_by_event_id(local, "");
        assert_eq!(merged.lines().count(), 1);
    }
}
