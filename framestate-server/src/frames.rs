//! Built-in demo frame.

use framestate_core::{FrameContext, FrameResult, StateResult};
use serde_json::{json, Map, Value};

/// Counter frame: every continuation increments `count` in the carried state.
pub async fn counter(ctx: FrameContext) -> StateResult<FrameResult> {
    let count = ctx.state.get("count").and_then(Value::as_u64).unwrap_or(0);

    if ctx.is_initial() {
        return Ok(render(count));
    }

    let mut state = match ctx.state {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    state.insert("count".to_string(), json!(count + 1));

    Ok(render(count + 1).with_state(Value::Object(state)))
}

fn render(count: u64) -> FrameResult {
    FrameResult::new()
        .with_field("image", format!("/count/{}", count))
        .with_field("buttons", json!([{"label": "Increment", "action": "post"}]))
}
