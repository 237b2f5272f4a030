use rulechain::{ChainEngine, RuleError};
use serde_json::{json, Value};

fn build(nodes: Value, connections: Value) -> Result<ChainEngine, RuleError> {
    let dsl = json!({
        "id": "chain_v",
        "name": "chain_v",
        "metadata": {"nodes": nodes, "connections": connections}
    })
    .to_string();
    ChainEngine::new(dsl.as_bytes())
}

fn assert_validation_err(result: Result<ChainEngine, RuleError>, needle: &str) {
    match result {
        Err(RuleError::Validation(reason)) => {
            assert!(reason.contains(needle), "错误信息 {reason:?} 不含 {needle:?}")
        }
        Err(other) => panic!("期望 Validation，实际 {other:?}"),
        Ok(_) => panic!("期望校验失败"),
    }
}

#[test]
fn cycle_rejected_at_build() {
    let result = build(
        json!([
            {"id": "s1", "type": "start"},
            {"id": "a", "type": "exprAssign", "configuration": {"script": "#{x: 1}"}},
            {"id": "b", "type": "exprAssign", "configuration": {"script": "#{y: 1}"}},
            {"id": "e1", "type": "end"}
        ]),
        json!([
            {"fromId": "s1", "toId": "a", "type": "default"},
            {"fromId": "a", "toId": "b", "type": "default"},
            {"fromId": "b", "toId": "a", "type": "default"}
        ]),
    );
    assert_validation_err(result, "环");
}

#[test]
fn empty_metadata_rejected() {
    assert_validation_err(build(json!([]), json!([])), "必须同时包含节点和连接");
}

#[test]
fn missing_start_rejected() {
    let result = build(
        json!([{"id": "e1", "type": "end"}]),
        json!([{"fromId": "e1", "toId": "e1", "type": "default"}]),
    );
    assert_validation_err(result, "开始节点");
}

#[test]
fn two_starts_rejected() {
    let result = build(
        json!([
            {"id": "s1", "type": "start"},
            {"id": "s2", "type": "start"},
            {"id": "e1", "type": "end"}
        ]),
        json!([
            {"fromId": "s1", "toId": "e1", "type": "default"},
            {"fromId": "s2", "toId": "e1", "type": "default"}
        ]),
    );
    assert_validation_err(result, "开始节点");
}

#[test]
fn missing_end_rejected() {
    let result = build(
        json!([
            {"id": "s1", "type": "start"},
            {"id": "a", "type": "exprAssign", "configuration": {"script": "#{x: 1}"}}
        ]),
        json!([{"fromId": "s1", "toId": "a", "type": "default"}]),
    );
    assert_validation_err(result, "结束节点");
}

#[test]
fn unknown_edge_endpoint_rejected() {
    let result = build(
        json!([
            {"id": "s1", "type": "start"},
            {"id": "e1", "type": "end"}
        ]),
        json!([
            {"fromId": "s1", "toId": "ghost", "type": "default"}
        ]),
    );
    assert_validation_err(result, "不存在");
}

#[test]
fn filter_must_have_true_and_false() {
    let nodes = json!([
        {"id": "s1", "type": "start"},
        {"id": "f1", "type": "exprFilter", "configuration": {"script": "score > 1"}},
        {"id": "e1", "type": "end"},
        {"id": "e2", "type": "end"}
    ]);
    // 只有 true 分支
    let result = build(
        nodes.clone(),
        json!([
            {"fromId": "s1", "toId": "f1", "type": "default"},
            {"fromId": "f1", "toId": "e1", "type": "true"}
        ]),
    );
    assert_validation_err(result, "true 和 false");

    // 两条边但标签不对
    let result = build(
        nodes,
        json!([
            {"fromId": "s1", "toId": "f1", "type": "default"},
            {"fromId": "f1", "toId": "e1", "type": "true"},
            {"fromId": "f1", "toId": "e2", "type": "yes"}
        ]),
    );
    assert_validation_err(result, "true 和 false");
}

#[test]
fn switch_requires_default_edge() {
    let result = build(
        json!([
            {"id": "s1", "type": "start"},
            {"id": "sw", "type": "exprSwitch", "configuration": {"script": "\"A\""}},
            {"id": "e1", "type": "end"}
        ]),
        json!([
            {"fromId": "s1", "toId": "sw", "type": "default"},
            {"fromId": "sw", "toId": "e1", "type": "A"}
        ]),
    );
    assert_validation_err(result, "default");
}

#[test]
fn end_must_not_have_outgoing_edges() {
    let result = build(
        json!([
            {"id": "s1", "type": "start"},
            {"id": "e1", "type": "end"},
            {"id": "e2", "type": "end"}
        ]),
        json!([
            {"fromId": "s1", "toId": "e1", "type": "default"},
            {"fromId": "e1", "toId": "e2", "type": "default"}
        ]),
    );
    assert_validation_err(result, "不能有出边");
}

#[test]
fn assign_needs_exactly_one_default_edge() {
    let result = build(
        json!([
            {"id": "s1", "type": "start"},
            {"id": "a1", "type": "exprAssign", "configuration": {"script": "#{x: 1}"}},
            {"id": "e1", "type": "end"},
            {"id": "e2", "type": "end"}
        ]),
        json!([
            {"fromId": "s1", "toId": "a1", "type": "default"},
            {"fromId": "a1", "toId": "e1", "type": "default"},
            {"fromId": "a1", "toId": "e2", "type": "default"}
        ]),
    );
    assert_validation_err(result, "default 连接");
}

#[test]
fn duplicate_node_id_rejected() {
    let result = build(
        json!([
            {"id": "s1", "type": "start"},
            {"id": "s1", "type": "end"}
        ]),
        json!([{"fromId": "s1", "toId": "s1", "type": "default"}]),
    );
    assert_validation_err(result, "重复");
}

#[test]
fn unknown_node_kind_is_definition_error() {
    let dsl = json!({
        "id": "chain_v",
        "metadata": {
            "nodes": [{"id": "s1", "type": "teleport"}],
            "connections": [{"fromId": "s1", "toId": "s1", "type": "default"}]
        }
    })
    .to_string();
    let err = ChainEngine::new(dsl.as_bytes()).unwrap_err();
    assert!(matches!(err, RuleError::Definition(_)));
}

#[test]
fn switch_with_empty_case_fails_init() {
    let dsl = json!({
        "id": "chain_v",
        "metadata": {
            "nodes": [
                {"id": "s1", "type": "start"},
                {"id": "sw", "type": "exprSwitch", "configuration": {"cases": [{"case": " ", "then": "A"}]}},
                {"id": "e1", "type": "end"}
            ],
            "connections": [
                {"fromId": "s1", "toId": "sw", "type": "default"},
                {"fromId": "sw", "toId": "e1", "type": "default"}
            ]
        }
    })
    .to_string();
    let err = ChainEngine::new(dsl.as_bytes()).unwrap_err();
    assert!(matches!(err, RuleError::NodeInit { .. }));
}
