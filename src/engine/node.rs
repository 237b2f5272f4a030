use serde_json::Value;

use crate::aop::AspectList;
use crate::engine::{substitute_properties, EngineConfig};
use crate::types::{Message, Node, NodeDef, NodeKind, RuleError};

/// 节点实例及其定义的包装，随所在规则链存活，构建后只读
pub struct RuleNodeCtx {
    def: NodeDef,
    node: Box<dyn Node>,
}

/// 实例化并初始化一个节点：
/// 先跑节点构建前切面，再做 ${global.key} 替换，最后交给组件 init
pub(crate) fn init_rule_node_ctx(
    config: &EngineConfig,
    aspects: &AspectList,
    def: &NodeDef,
) -> Result<RuleNodeCtx, RuleError> {
    for aspect in aspects.iter() {
        aspect
            .on_node_before_init(config, def)
            .map_err(|e| RuleError::NodeInit {
                node_id: def.id.clone(),
                reason: e.to_string(),
            })?;
    }

    let mut node = config
        .registry
        .new_node(def.kind)
        .map_err(|e| RuleError::NodeInit {
            node_id: def.id.clone(),
            reason: e.to_string(),
        })?;

    let mut configuration = Value::Object(def.configuration.clone());
    substitute_properties(&mut configuration, &config.properties);
    let configuration = match configuration {
        Value::Object(map) => map,
        _ => Default::default(),
    };

    node.init(config, &configuration)
        .map_err(|e| RuleError::NodeInit {
            node_id: def.id.clone(),
            reason: e.to_string(),
        })?;

    Ok(RuleNodeCtx {
        def: def.clone(),
        node,
    })
}

impl RuleNodeCtx {
    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn kind(&self) -> NodeKind {
        self.def.kind
    }

    pub fn terminal_on_err(&self) -> bool {
        self.def.terminal_on_err
    }

    pub fn def(&self) -> &NodeDef {
        &self.def
    }

    /// 节点定义的 JSON 形式，用于错误信息
    pub fn dsl(&self) -> String {
        self.def.dsl()
    }

    pub async fn on_msg(&self, msg: &mut Message) -> Result<Option<String>, RuleError> {
        self.node.on_msg(msg).await
    }

    pub fn destroy(&self) {
        self.node.destroy();
    }
}
