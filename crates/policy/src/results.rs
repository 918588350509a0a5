//! Scope filtering applied to successful responses.
//!
//! Opt-in via [`CallGate::with_result_scoping`](crate::CallGate::with_result_scoping).
//! Understands bare JSON payloads and MCP tool results whose data is a JSON
//! string inside `content[].text`.

use {serde_json::Value, tracing::info};

use crate::scope::{ChannelScope, ScopeRestrictor};

/// Reduce a response to what the domain's scope permits.
pub fn scope_result(scope: &ScopeRestrictor, operation: &str, result: Value) -> Value {
    match scope {
        ScopeRestrictor::Board(board) => match board.allowed() {
            Some(allowed) => map_payload(result, |data| filter_boards(data, allowed, operation)),
            None => result,
        },
        ScopeRestrictor::Channel(channels) => {
            map_payload(result, |data| filter_channels(data, channels, operation))
        },
    }
}

/// Apply `f` to the payload, unwrapping and re-wrapping MCP text content.
fn map_payload(mut result: Value, f: impl Fn(&mut Value)) -> Value {
    let text_item = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .position(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        });

    let Some(index) = text_item else {
        f(&mut result);
        return result;
    };

    let item = &mut result["content"][index];
    // Non-JSON text carries no structured ids to filter.
    let parsed = item
        .get("text")
        .and_then(Value::as_str)
        .and_then(|text| serde_json::from_str::<Value>(text).ok());
    if let Some(mut data) = parsed {
        f(&mut data);
        item["text"] = Value::String(data.to_string());
    }
    result
}

fn id_of(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn filter_boards(data: &mut Value, allowed: &str, operation: &str) {
    retain_boards(data, allowed, operation);
    if let Some(inner) = data.get_mut("data") {
        retain_boards(inner, allowed, operation);
    }
}

fn retain_boards(data: &mut Value, allowed: &str, operation: &str) {
    if let Some(boards) = data.get_mut("boards").and_then(Value::as_array_mut) {
        let before = boards.len();
        boards.retain(|b| id_of(b).as_deref() == Some(allowed));
        if boards.len() != before {
            info!(
                operation,
                before,
                after = boards.len(),
                allowed_board_id = %allowed,
                "filtered boards from result"
            );
        }
    }
    if let Some(board) = data.get_mut("board")
        && board.is_object()
        && id_of(board).as_deref() != Some(allowed)
    {
        info!(operation, allowed_board_id = %allowed, "removed out-of-scope board from result");
        *board = Value::Null;
    }
}

fn filter_channels(data: &mut Value, scope: &ChannelScope, operation: &str) {
    let Some(channels) = data.get_mut("channels").and_then(Value::as_array_mut) else {
        return;
    };
    let before = channels.len();
    channels.retain(|c| {
        let private = ["is_private", "is_im", "is_mpim"]
            .iter()
            .any(|flag| c.get(*flag).and_then(Value::as_bool).unwrap_or(false));
        !private && id_of(c).is_some_and(|id| scope.is_channel_allowed(&id))
    });
    if channels.len() != before {
        info!(operation, before, after = channels.len(), "filtered channels from result");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, crate::scope::BoardScope, serde_json::json};

    fn board(allowed: &str) -> ScopeRestrictor {
        ScopeRestrictor::Board(BoardScope::new(Some(allowed.into())))
    }

    #[test]
    fn filters_top_level_and_nested_boards() {
        let out = scope_result(
            &board("555"),
            "get_boards",
            json!({"boards": [{"id": "555"}, {"id": 999}]}),
        );
        assert_eq!(out, json!({"boards": [{"id": "555"}]}));

        let out = scope_result(
            &board("555"),
            "get_boards",
            json!({"data": {"boards": [{"id": 555}, {"id": "1"}]}}),
        );
        assert_eq!(out, json!({"data": {"boards": [{"id": 555}]}}));
    }

    #[test]
    fn nulls_single_foreign_board() {
        let out = scope_result(
            &board("555"),
            "get_board_info",
            json!({"board": {"id": "999", "name": "Payroll"}}),
        );
        assert_eq!(out, json!({"board": null}));

        let kept = json!({"board": {"id": "555"}});
        assert_eq!(scope_result(&board("555"), "get_board_info", kept.clone()), kept);
    }

    #[test]
    fn rewraps_mcp_text_content() {
        let inner = json!({"boards": [{"id": "1"}, {"id": "555"}]}).to_string();
        let out = scope_result(
            &board("555"),
            "get_boards",
            json!({"content": [{"type": "text", "text": inner}], "isError": false}),
        );
        let text = out["content"][0]["text"].as_str().unwrap();
        let data: Value = serde_json::from_str(text).unwrap();
        assert_eq!(data, json!({"boards": [{"id": "555"}]}));
        assert_eq!(out["isError"], json!(false));
    }

    #[test]
    fn unrestricted_board_scope_is_identity() {
        let input = json!({"boards": [{"id": "1"}, {"id": "2"}]});
        let scope = ScopeRestrictor::Board(BoardScope::default());
        assert_eq!(scope_result(&scope, "get_boards", input.clone()), input);
    }

    #[test]
    fn channel_listing_drops_private_and_unlisted() {
        let scope = ScopeRestrictor::Channel(ChannelScope::from_csv("C1,C2"));
        let out = scope_result(
            &scope,
            "conversations.list",
            json!({"ok": true, "channels": [
                {"id": "C1"},
                {"id": "C2", "is_private": true},
                {"id": "C3"},
                {"id": "D1", "is_im": true}
            ]}),
        );
        assert_eq!(out, json!({"ok": true, "channels": [{"id": "C1"}]}));
    }
}
