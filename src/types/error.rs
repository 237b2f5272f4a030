use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("规则链定义解析失败: {0}")]
    Definition(String),

    #[error("规则链校验失败: {0}")]
    Validation(String),

    #[error("规则链已禁用: {0}")]
    EngineDisabled(String),

    #[error("引擎尚未初始化")]
    NotInitialized,

    #[error("组件已存在: {0}")]
    ComponentAlreadyExists(String),

    #[error("找不到组件: {0}")]
    ComponentNotFound(String),

    #[error("节点 {node_id} 初始化失败: {reason}")]
    NodeInit { node_id: String, reason: String },

    #[error("节点 {node_id} 执行失败: {reason}, 节点定义: {node_dsl}")]
    NodeExecution {
        node_id: String,
        node_dsl: String,
        reason: String,
    },

    #[error("节点 {node_id} 没有 {relation} 分支, 节点定义: {node_dsl}")]
    BranchMissing {
        node_id: String,
        node_dsl: String,
        relation: String,
    },

    #[error("脚本执行失败: {0}")]
    Script(String),

    #[error("返回类型不匹配, 期望 {expected}")]
    ScriptReturnType { expected: &'static str },

    #[error("配置错误: {0}")]
    Config(String),

    #[error("规则链 {chain_id} 遍历超出节点数上限 {limit}")]
    TraversalLimit { chain_id: String, limit: usize },
}
