use std::collections::{HashMap, HashSet};

use crate::aop::Aspect;
use crate::engine::{AggregationConfiguration, EngineConfig};
use crate::types::{
    AggregationDef, AggregationPolicy, ChainDef, Connection, NodeKind, RuleError,
    DEFAULT_RELATION, FALSE_RELATION, TRUE_RELATION,
};

/// 规则链构建前的结构校验切面，逐条规则执行，第一条失败即短路
pub struct ChainValidator;

impl Aspect for ChainValidator {
    fn order(&self) -> i32 {
        10
    }

    fn on_chain_before_init(
        &self,
        _config: &EngineConfig,
        def: &ChainDef,
    ) -> Result<(), RuleError> {
        validate_chain(def)
    }
}

/// 聚合构建前的校验切面
pub struct AggregationValidator;

impl Aspect for AggregationValidator {
    fn order(&self) -> i32 {
        10
    }

    fn on_aggregation_before_init(
        &self,
        _config: &EngineConfig,
        def: &AggregationDef,
    ) -> Result<(), RuleError> {
        validate_aggregation(def)
    }
}

fn validate_chain(def: &ChainDef) -> Result<(), RuleError> {
    let nodes = &def.metadata.nodes;
    let connections = &def.metadata.connections;

    if nodes.is_empty() || connections.is_empty() {
        return Err(RuleError::Validation(format!(
            "规则链 {} 必须同时包含节点和连接",
            def.id
        )));
    }

    let start_count = nodes.iter().filter(|n| n.kind == NodeKind::Start).count();
    if start_count != 1 {
        return Err(RuleError::Validation(format!(
            "规则链 {} 必须有且仅有一个开始节点，当前有 {} 个",
            def.id, start_count
        )));
    }
    if !nodes.iter().any(|n| n.kind == NodeKind::End) {
        return Err(RuleError::Validation(format!(
            "规则链 {} 必须至少包含一个结束节点",
            def.id
        )));
    }

    let mut ids = HashSet::new();
    for node in nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(RuleError::Validation(format!(
                "规则链 {} 中节点 id {} 重复",
                def.id, node.id
            )));
        }
    }
    for conn in connections {
        if !ids.contains(conn.from_id.as_str()) {
            return Err(RuleError::Validation(format!("节点 {} 不存在", conn.from_id)));
        }
        if !ids.contains(conn.to_id.as_str()) {
            return Err(RuleError::Validation(format!("节点 {} 不存在", conn.to_id)));
        }
    }

    if let Some(path) = find_cycle(connections) {
        return Err(RuleError::Validation(format!(
            "规则链 {} 检测到环: {}",
            def.id,
            path.join(" -> ")
        )));
    }

    validate_arity(def)
}

/// 连接构成的有向图做 DFS 环检测，在途栈命中即为环，返回环路径
fn find_cycle(connections: &[Connection]) -> Option<Vec<String>> {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut roots = Vec::new();
    for conn in connections {
        if !graph.contains_key(conn.from_id.as_str()) {
            roots.push(conn.from_id.as_str());
        }
        graph
            .entry(conn.from_id.as_str())
            .or_default()
            .push(conn.to_id.as_str());
    }

    let mut visited = HashSet::new();
    let mut stack = HashSet::new();
    let mut path = Vec::new();
    for root in roots {
        if !visited.contains(root)
            && dfs(root, &graph, &mut visited, &mut stack, &mut path)
        {
            return Some(path.into_iter().map(str::to_string).collect());
        }
    }
    None
}

fn dfs<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> bool {
    if stack.contains(node) {
        path.push(node);
        return true;
    }
    if visited.contains(node) {
        return false;
    }
    visited.insert(node);
    stack.insert(node);
    path.push(node);
    if let Some(nexts) = graph.get(node) {
        for next in nexts {
            if dfs(next, graph, visited, stack, path) {
                return true;
            }
        }
    }
    stack.remove(node);
    path.pop();
    false
}

/// 每类节点的出边数量与标签约束
fn validate_arity(def: &ChainDef) -> Result<(), RuleError> {
    let mut routes: HashMap<&str, Vec<&str>> = HashMap::new();
    for conn in &def.metadata.connections {
        routes
            .entry(conn.from_id.as_str())
            .or_default()
            .push(conn.relation.as_str());
    }

    for node in &def.metadata.nodes {
        let labels = routes
            .get(node.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        match node.kind {
            NodeKind::Start | NodeKind::ExprAssign => {
                if labels != [DEFAULT_RELATION] {
                    return Err(RuleError::Validation(format!(
                        "节点 {}({}) 必须有且仅有一个 default 连接，当前有 {} 个连接",
                        node.id,
                        node.kind,
                        labels.len()
                    )));
                }
            }
            NodeKind::End => {
                if !labels.is_empty() {
                    return Err(RuleError::Validation(format!(
                        "节点 {}({}) 不能有出边，当前有 {} 个连接",
                        node.id,
                        node.kind,
                        labels.len()
                    )));
                }
            }
            NodeKind::ExprFilter | NodeKind::JsFilter => {
                if labels.len() != 2
                    || !labels.contains(&TRUE_RELATION)
                    || !labels.contains(&FALSE_RELATION)
                {
                    return Err(RuleError::Validation(format!(
                        "节点 {}({}) 必须恰好有 true 和 false 两个连接",
                        node.id, node.kind
                    )));
                }
            }
            NodeKind::ExprSwitch | NodeKind::JsSwitch => {
                if labels.is_empty() || !labels.contains(&DEFAULT_RELATION) {
                    return Err(RuleError::Validation(format!(
                        "节点 {}({}) 必须至少有一个连接且包含 default 连接",
                        node.id, node.kind
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_aggregation(def: &AggregationDef) -> Result<(), RuleError> {
    if def.policy == AggregationPolicy::ShortCircuit {
        let mut priorities = HashSet::new();
        for chain in &def.metadata.chains {
            if !priorities.insert(chain.priority) {
                return Err(RuleError::Validation(format!(
                    "聚合 {} 的子链优先级 {} 重复",
                    def.id, chain.priority
                )));
            }
        }
    }
    if def.policy == AggregationPolicy::PolicyTable {
        let configuration: AggregationConfiguration =
            serde_json::from_value(serde_json::Value::Object(def.configuration.clone()))
                .map_err(|e| RuleError::Config(e.to_string()))?;
        if configuration
            .aggregation
            .thresholds
            .score_expr
            .trim()
            .is_empty()
        {
            return Err(RuleError::Validation(format!(
                "聚合 {} 缺少 aggregation.thresholds.scoreExpr",
                def.id
            )));
        }
    }
    Ok(())
}
