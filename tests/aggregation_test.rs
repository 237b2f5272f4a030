use rulechain::{ChainAggregationEngine, Engine, Message, RuleError};
use serde_json::{json, Map, Value};

fn input(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(map) => map,
        _ => panic!("input 必须是对象"),
    }
}

/// start -> end，end 脚本由调用方给出
fn sub_chain(id: &str, priority: i32, end_script: &str) -> Value {
    json!({
        "id": id,
        "name": id,
        "priority": priority,
        "metadata": {
            "nodes": [
                {"id": "s1", "type": "start"},
                {"id": "e1", "type": "end", "configuration": {"script": end_script}}
            ],
            "connections": [
                {"fromId": "s1", "toId": "e1", "type": "default"}
            ]
        }
    })
}

/// 校验通过但运行必错的链：过滤器引用不存在的变量
fn failing_chain(id: &str, priority: i32, terminal_on_err: bool) -> Value {
    json!({
        "id": id,
        "name": id,
        "priority": priority,
        "terminalOnErr": terminal_on_err,
        "metadata": {
            "nodes": [
                {"id": "s1", "type": "start"},
                {"id": "f1", "type": "exprFilter", "configuration": {"script": "no_such_field > 10"}},
                {"id": "t", "type": "end", "configuration": {"script": "#{}"}},
                {"id": "f", "type": "end", "configuration": {"script": "#{}"}}
            ],
            "connections": [
                {"fromId": "s1", "toId": "f1", "type": "default"},
                {"fromId": "f1", "toId": "t", "type": "true"},
                {"fromId": "f1", "toId": "f", "type": "false"}
            ]
        }
    })
}

#[tokio::test]
async fn short_circuit_stops_at_first_terminate() {
    let dsl = json!({
        "id": "agg_sc",
        "name": "agg_sc",
        "type": "shortCircuit",
        "metadata": {
            "chains": [
                sub_chain("c10", 10, "#{terminate: false, score: 10}"),
                sub_chain("c30", 30, "#{terminate: true, score: 30}"),
                sub_chain("c20", 20, "#{terminate: false, score: 20}")
            ]
        }
    })
    .to_string();

    let engine = ChainAggregationEngine::new(dsl.as_bytes()).unwrap();
    let mut msg = Message::new("", 0, input(json!({})));
    engine.on_msg(&mut msg).await.unwrap();

    // 优先级 30 的链先执行并命中 terminate，其余不再执行
    let output = msg.chain_aggregation_output().unwrap();
    assert_eq!(output.len(), 1);
    assert_eq!(
        output.get("c30"),
        Some(&json!({"terminate": true, "score": 30}))
    );
    assert!(msg.chain_output().is_none());
}

#[tokio::test]
async fn parallel_runs_every_chain() {
    let dsl = json!({
        "id": "agg_par",
        "name": "agg_par",
        "type": "parallel",
        "metadata": {
            "chains": [
                sub_chain("c1", 20, "#{terminate: true, score: 1}"),
                sub_chain("c2", 10, "#{terminate: true, score: 2}")
            ]
        }
    })
    .to_string();

    let engine = ChainAggregationEngine::new(dsl.as_bytes()).unwrap();
    let mut msg = Message::new("", 0, input(json!({})));
    engine.on_msg(&mut msg).await.unwrap();

    // parallel 不短路，terminate 标记被忽略
    let output = msg.chain_aggregation_output().unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output.get("c1"), Some(&json!({"terminate": true, "score": 1})));
    assert_eq!(output.get("c2"), Some(&json!({"terminate": true, "score": 2})));
}

#[tokio::test]
async fn policy_table_scores_collected_outputs() {
    let dsl = json!({
        "id": "agg_table",
        "name": "agg_table",
        "type": "policyTable",
        "configuration": {
            "aggregation": {
                "thresholds": {
                    "scoreExpr": "let total = c1.score + c2.score; let action = if total > 25 { \"reject\" } else { \"pass\" }; #{score: total, action: action}"
                }
            }
        },
        "metadata": {
            "chains": [
                sub_chain("c1", 20, "#{score: 20}"),
                sub_chain("c2", 10, "#{score: 10}")
            ]
        }
    })
    .to_string();

    let engine = ChainAggregationEngine::new(dsl.as_bytes()).unwrap();
    let mut msg = Message::new("", 0, input(json!({})));
    engine.on_msg(&mut msg).await.unwrap();

    assert_eq!(
        msg.aggregation_output(),
        Some(&input(json!({"score": 30, "action": "reject"})))
    );
    assert_eq!(msg.chain_aggregation_output().unwrap().len(), 2);
}

#[tokio::test]
async fn terminal_on_err_aborts_aggregation() {
    let dsl = json!({
        "id": "agg_abort",
        "name": "agg_abort",
        "type": "parallel",
        "metadata": {
            "chains": [
                failing_chain("c_bad", 20, true),
                sub_chain("c_ok", 10, "#{score: 1}")
            ]
        }
    })
    .to_string();

    let engine = ChainAggregationEngine::new(dsl.as_bytes()).unwrap();
    let mut msg = Message::new("", 0, input(json!({})));
    let err = engine.on_msg(&mut msg).await.unwrap_err();
    assert!(matches!(err, RuleError::NodeExecution { .. }));
    assert!(msg.chain_aggregation_output().is_none());
}

#[tokio::test]
async fn non_terminal_chain_error_is_logged_and_skipped() {
    let dsl = json!({
        "id": "agg_skip",
        "name": "agg_skip",
        "type": "parallel",
        "metadata": {
            "chains": [
                failing_chain("c_bad", 20, false),
                sub_chain("c_ok", 10, "#{score: 1}")
            ]
        }
    })
    .to_string();

    let engine = ChainAggregationEngine::new(dsl.as_bytes()).unwrap();
    let mut msg = Message::new("", 0, input(json!({})));
    engine.on_msg(&mut msg).await.unwrap();

    let output = msg.chain_aggregation_output().unwrap();
    assert_eq!(output.len(), 2);
    // 出错链的产出为空映射
    assert_eq!(output.get("c_bad"), Some(&json!({})));
    assert_eq!(output.get("c_ok"), Some(&json!({"score": 1})));
}

#[tokio::test]
async fn duplicate_priority_rejected_for_short_circuit() {
    let dsl = json!({
        "id": "agg_dup",
        "type": "shortCircuit",
        "metadata": {
            "chains": [
                sub_chain("c1", 10, "#{}"),
                sub_chain("c2", 10, "#{}")
            ]
        }
    })
    .to_string();

    let err = ChainAggregationEngine::new(dsl.as_bytes()).unwrap_err();
    assert!(matches!(err, RuleError::Validation(_)));
}

#[tokio::test]
async fn policy_table_requires_score_expr() {
    let dsl = json!({
        "id": "agg_no_expr",
        "type": "policyTable",
        "metadata": {
            "chains": [sub_chain("c1", 10, "#{}")]
        }
    })
    .to_string();

    let err = ChainAggregationEngine::new(dsl.as_bytes()).unwrap_err();
    assert!(matches!(err, RuleError::Validation(_)));
}

#[tokio::test]
async fn disabled_sub_chain_is_skipped() {
    let mut disabled = sub_chain("c_off", 30, "#{score: 0}");
    disabled["disabled"] = json!(true);
    let dsl = json!({
        "id": "agg_disabled",
        "name": "agg_disabled",
        "type": "parallel",
        "metadata": {
            "chains": [disabled, sub_chain("c_on", 10, "#{score: 1}")]
        }
    })
    .to_string();

    let engine = ChainAggregationEngine::new(dsl.as_bytes()).unwrap();
    let mut msg = Message::new("", 0, input(json!({})));
    engine.on_msg(&mut msg).await.unwrap();

    let output = msg.chain_aggregation_output().unwrap();
    assert_eq!(output.len(), 1);
    assert!(output.contains_key("c_on"));
}

#[tokio::test]
async fn invalid_sub_chain_fails_whole_build() {
    // 子链缺少结束节点
    let dsl = json!({
        "id": "agg_bad_sub",
        "type": "parallel",
        "metadata": {
            "chains": [{
                "id": "c_bad",
                "metadata": {
                    "nodes": [
                        {"id": "s1", "type": "start"},
                        {"id": "a1", "type": "exprAssign", "configuration": {"script": "#{x: 1}"}}
                    ],
                    "connections": [
                        {"fromId": "s1", "toId": "a1", "type": "default"}
                    ]
                }
            }]
        }
    })
    .to_string();

    let err = ChainAggregationEngine::new(dsl.as_bytes()).unwrap_err();
    assert!(matches!(err, RuleError::Validation(_)));
}
