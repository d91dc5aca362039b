use serde_json::Value;

use crate::error::EngineError;
use crate::models::GroupMembership;
use crate::Result;

/// Normalise a group membership document into a [`GroupMembership`].
///
/// Accepted shapes (optionally wrapped in a top-level `"themes"` object):
/// - dict of dicts: `{"<id>": {"name": "...", "stocks": [{"code": "..."}]}}`
/// - dict of lists: `{"<name>": ["<code>", ...]}`
/// - list of dicts: `[{"theme" | "name": "...", "tickers": ["<code>", ...]}]`
///
/// Entries without a name or without any member are skipped.
pub fn membership_from_json(doc: &Value) -> Result<GroupMembership> {
    let body = doc
        .as_object()
        .and_then(|o| o.get("themes"))
        .unwrap_or(doc);

    let mut membership = GroupMembership::new();

    match body {
        Value::Object(map) => {
            for (key, entry) in map {
                let (name, members) = match entry {
                    Value::Object(obj) => (
                        obj.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                        member_codes(obj.get("stocks").or_else(|| obj.get("tickers"))),
                    ),
                    Value::Array(_) => (key.clone(), member_codes(Some(entry))),
                    _ => continue,
                };
                push_group(&mut membership, name, members);
            }
        }
        Value::Array(items) => {
            for item in items {
                let Some(obj) = item.as_object() else {
                    continue;
                };
                let name = obj
                    .get("theme")
                    .or_else(|| obj.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let members = member_codes(obj.get("tickers").or_else(|| obj.get("stocks")));
                push_group(&mut membership, name, members);
            }
        }
        other => {
            return Err(EngineError::Membership(format!(
                "expected an object or array, found {}",
                json_type(other)
            )));
        }
    }

    Ok(membership)
}

fn push_group(membership: &mut GroupMembership, name: String, members: Vec<String>) {
    if name.is_empty() || members.is_empty() {
        tracing::debug!(group = %name, "skipping membership entry without name or members");
        return;
    }
    membership.insert(name, members);
}

/// Member codes from either `["005930", ...]` or `[{"code": "005930"}, ...]`
fn member_codes(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(code) => Some(code.clone()),
            Value::Object(obj) => obj.get("code").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
