//! End-to-end pruning passes over realistic transcripts.

use ctx_budget::pruning::{PruneContext, PruningSettings, prune_context_messages};
use ctx_budget::{ContentBlock, Message};

fn tool_text<'a>(messages: &'a [Message], call_id: &str) -> &'a str {
    messages
        .iter()
        .filter_map(Message::as_tool_result)
        .find(|r| r.tool_call_id == call_id)
        .and_then(|r| r.content.iter().find_map(ContentBlock::as_text))
        .unwrap_or("")
}

/// Every tool result fully eligible, both tiers firing on anything non-empty.
fn eager() -> PruningSettings {
    PruningSettings::default()
        .with_keep_last_assistants(0)
        .with_soft_trim_ratio(0.0)
        .with_hard_clear_ratio(0.0)
        .with_min_prunable_tool_chars(0)
}

fn window() -> PruneContext {
    PruneContext::new(1000)
}

#[test]
fn hard_clear_placeholder_includes_tool_name() {
    let mut messages = vec![
        Message::user("u1"),
        Message::assistant_text("a1"),
        Message::tool_result("t1", "read_file", "x".repeat(20_000)),
        Message::assistant_text("a2"),
    ];
    let settings = eager()
        .with_hard_clear(true, "content cleared")
        .with_soft_trim(10, 3, 3);

    prune_context_messages(&mut messages, &settings, &window());

    assert_eq!(tool_text(&messages, "t1"), "[read_file: content cleared]");
}

#[test]
fn soft_trim_note_includes_tool_name() {
    let mut messages = vec![
        Message::user("u1"),
        Message::tool_result("t1", "grep_search", "abcdefghij".repeat(1000)),
    ];
    let settings = PruningSettings::default()
        .with_keep_last_assistants(0)
        .with_soft_trim_ratio(0.0)
        .with_hard_clear_ratio(10.0)
        .with_min_prunable_tool_chars(0)
        .with_soft_trim(10, 6, 6);

    prune_context_messages(&mut messages, &settings, &window());

    let text = tool_text(&messages, "t1");
    assert!(text.contains("[grep_search result trimmed:"));
    assert!(text.contains("kept first 6 chars and last 6 chars of 10000 chars.]"));
}

#[test]
fn default_placeholder_is_actionable() {
    let mut messages = vec![
        Message::user("u1"),
        Message::assistant_text("a1"),
        Message::tool_result("t1", "exec_command", "x".repeat(20_000)),
        Message::assistant_text("a2"),
    ];

    prune_context_messages(&mut messages, &eager(), &window());

    let text = tool_text(&messages, "t1");
    assert!(text.contains("exec_command:"));
    assert!(text.contains("memory_search"));
    assert_eq!(
        text,
        "[exec_command: [Tool result cleared. Use memory_search to recall earlier findings or re-run the tool.]]"
    );
}

#[test]
fn zero_keep_includes_most_recent_tool_result() {
    let mut messages = vec![
        Message::user("u1"),
        Message::assistant_text("a1"),
        Message::tool_result("t1", "read_file", "a".repeat(500)),
        Message::tool_result("t2", "read_file", "b".repeat(500)),
    ];

    let report = prune_context_messages(&mut messages, &eager(), &window());

    assert_eq!(report.eligible, 2);
    assert_eq!(report.hard_cleared, 2);
    assert!(tool_text(&messages, "t2").starts_with("[read_file:"));
}

#[test]
fn recent_tool_results_are_never_mutated() {
    let build = || {
        vec![
            Message::user("u1"),
            Message::assistant_text("a1"),
            Message::tool_result("t1", "read_file", "a".repeat(5_000)),
            Message::assistant_text("a2"),
            Message::tool_result("t2", "read_file", "b".repeat(5_000)),
            Message::assistant_text("a3"),
            Message::tool_result("t3", "read_file", "c".repeat(5_000)),
            Message::assistant_text("a4"),
            Message::tool_result("t4", "read_file", "d".repeat(5_000)),
        ]
    };

    for keep in 1..=4 {
        let mut messages = build();
        let original = messages.clone();
        let settings = eager().with_keep_last_assistants(keep);
        prune_context_messages(&mut messages, &settings, &window());

        // The keep-th most recent assistant sits at index 9 - 2 * keep.
        let boundary = 9 - 2 * keep;
        assert_eq!(messages[boundary..], original[boundary..], "keep = {keep}");
        for i in (0..boundary).filter(|&i| original[i].as_tool_result().is_some()) {
            assert_ne!(messages[i], original[i], "keep = {keep}, index = {i}");
        }
    }
}

#[test]
fn fewer_assistants_than_keep_protects_everything() {
    let mut messages = vec![
        Message::user("u1"),
        Message::tool_result("t1", "read_file", "a".repeat(5_000)),
        Message::assistant_text("a1"),
    ];
    let original = messages.clone();

    let report =
        prune_context_messages(&mut messages, &eager().with_keep_last_assistants(2), &window());

    assert_eq!(report.eligible, 0);
    assert_eq!(messages, original);
}

#[test]
fn pruning_twice_equals_pruning_once() {
    let build = || {
        vec![
            Message::user("task"),
            Message::assistant_text("a1"),
            Message::tool_result("t1", "read_file", "r".repeat(60_000)),
            Message::assistant_text("a2"),
            Message::tool_result("t2", "grep_search", "g".repeat(20_000)),
            Message::assistant_text("a3"),
            Message::tool_result("t3", "exec_command", "e".repeat(3_000)),
            Message::assistant_text("a4"),
        ]
    };
    let configs = [
        eager(),
        eager().with_hard_clear(false, "unused"),
        PruningSettings::default()
            .with_keep_last_assistants(1)
            .with_min_prunable_tool_chars(0),
        PruningSettings::default(),
    ];
    for window in [1_000, 10_000, 50_000, 200_000] {
        for settings in &configs {
            let mut messages = build();
            prune_context_messages(&mut messages, settings, &PruneContext::new(window));
            let once = messages.clone();
            let second = prune_context_messages(&mut messages, settings, &PruneContext::new(window));
            assert!(!second.changed(), "window = {window}, settings = {settings:?}");
            assert_eq!(messages, once);
        }
    }
}

#[test]
fn soft_trim_keeps_at_most_head_plus_tail_of_original() {
    let original: String = (0..20_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let mut messages = vec![Message::tool_result("t1", "read_file", original.clone())];
    let settings = PruningSettings::default()
        .with_keep_last_assistants(0)
        .with_soft_trim_ratio(0.0)
        .with_hard_clear_ratio(100.0)
        .with_min_prunable_tool_chars(0)
        .with_soft_trim(100, 40, 25);

    prune_context_messages(&mut messages, &settings, &window());

    let text = tool_text(&messages, "t1");
    let head: String = original.chars().take(40).collect();
    let tail: String = original.chars().skip(20_000 - 25).collect();
    assert!(text.contains(&format!("{head}\n...\n{tail}")));
    let kept = text
        .strip_prefix("[read_file result trimmed: ")
        .and_then(|rest| rest.split("\n\nkept first").next())
        .unwrap();
    assert_eq!(kept.chars().count(), 40 + "\n...\n".len() + 25);
}

#[test]
fn identity_fields_survive_pruning() {
    let mut messages = vec![Message::tool_result("call-42", "read_file", "x".repeat(2_000))];
    if let Some(result) = messages[0].as_tool_result_mut() {
        result.is_error = true;
    }
    let before = messages[0].as_tool_result().cloned().unwrap();

    prune_context_messages(&mut messages, &eager(), &window());

    let after = messages[0].as_tool_result().unwrap();
    assert_eq!(after.tool_call_id, "call-42");
    assert_eq!(after.tool_name, before.tool_name);
    assert!(after.is_error);
    assert_eq!(after.timestamp, before.timestamp);
    assert_ne!(after.content, before.content);
}

#[test]
fn user_and_assistant_messages_are_read_only() {
    let mut messages = vec![
        Message::user("u".repeat(50_000)),
        Message::assistant_text("a".repeat(50_000)),
        Message::tool_result("t1", "read_file", "x".repeat(50_000)),
    ];
    let original = messages.clone();

    prune_context_messages(&mut messages, &eager(), &window());

    assert_eq!(messages[0], original[0]);
    assert_eq!(messages[1], original[1]);
    assert_eq!(messages.len(), original.len());
}

#[test]
fn messages_with_other_roles_are_read_only() {
    let shell_run: Message = serde_json::from_value(serde_json::json!({
        "role": "bashExecution",
        "command": "cat big.log",
        "output": "l".repeat(50_000),
        "exitCode": 0,
        "timestamp": 1
    }))
    .unwrap();
    let mut messages = vec![
        Message::user("u1"),
        shell_run.clone(),
        Message::tool_result("t1", "read_file", "x".repeat(50_000)),
    ];

    let report = prune_context_messages(&mut messages, &eager(), &window());

    assert_eq!(report.eligible, 1);
    assert_eq!(report.hard_cleared, 1);
    assert_eq!(messages[1], shell_run);
}
