use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Configuration;

/// 节点类型，节点集合是封闭的
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Start,
    End,
    ExprFilter,
    JsFilter,
    ExprSwitch,
    JsSwitch,
    ExprAssign,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::ExprFilter => "exprFilter",
            NodeKind::JsFilter => "jsFilter",
            NodeKind::ExprSwitch => "exprSwitch",
            NodeKind::JsSwitch => "jsSwitch",
            NodeKind::ExprAssign => "exprAssign",
        };
        f.write_str(name)
    }
}

/// 聚合策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationPolicy {
    ShortCircuit,
    Parallel,
    PolicyTable,
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationPolicy::ShortCircuit => "shortCircuit",
            AggregationPolicy::Parallel => "parallel",
            AggregationPolicy::PolicyTable => "policyTable",
        };
        f.write_str(name)
    }
}

/// 节点定义
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Configuration::is_empty")]
    pub configuration: Configuration,
    #[serde(default)]
    pub terminal_on_err: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
}

/// 节点连接，`type` 即关系标签，由源节点类型约定其语义
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type")]
    pub relation: String,
    /// 仅用于展示
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

/// 规则链的节点与连接拓扑
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainMetadata {
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// 规则链定义
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    /// 聚合内按优先级从大到小依次执行
    #[serde(default)]
    pub priority: i32,
    /// 出错时终止所在聚合
    #[serde(default)]
    pub terminal_on_err: bool,
    /// 字典序
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// 字典序
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Configuration::is_empty")]
    pub configuration: Configuration,
    #[serde(default)]
    pub metadata: ChainMetadata,
}

/// 聚合的子链集合
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationMetadata {
    #[serde(default)]
    pub chains: Vec<ChainDef>,
}

/// 规则链聚合定义
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub policy: AggregationPolicy,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub terminal_on_err: bool,
    #[serde(default, skip_serializing_if = "Configuration::is_empty")]
    pub configuration: Configuration,
    #[serde(default)]
    pub metadata: AggregationMetadata,
}

/// switch 节点的 case 分支，then 为命中时发出的关系标签
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub case: String,
    pub then: String,
}

impl NodeDef {
    /// 节点定义的 JSON 形式，用于错误信息
    pub fn dsl(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
