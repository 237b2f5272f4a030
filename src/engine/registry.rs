use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::components::{
    EndNode, ExprAssignNode, ExprFilterNode, ExprSwitchNode, JsFilterNode, JsSwitchNode,
    StartNode,
};
use crate::types::{Node, NodeKind, RuleError};

/// 节点工厂，产出零状态的新实例，配置在 init 时注入
pub type NodeFactory = Arc<dyn Fn() -> Box<dyn Node> + Send + Sync>;

/// 组件注册表：NodeKind -> 工厂。重复注册报错
pub struct ComponentRegistry {
    components: RwLock<HashMap<NodeKind, NodeFactory>>,
}

impl ComponentRegistry {
    pub fn empty() -> Self {
        Self {
            components: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, kind: NodeKind, factory: NodeFactory) -> Result<(), RuleError> {
        let mut components = self
            .components
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if components.contains_key(&kind) {
            return Err(RuleError::ComponentAlreadyExists(kind.to_string()));
        }
        components.insert(kind, factory);
        Ok(())
    }

    pub fn unregister(&self, kind: NodeKind) -> Result<(), RuleError> {
        let mut components = self
            .components
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        components
            .remove(&kind)
            .map(|_| ())
            .ok_or_else(|| RuleError::ComponentNotFound(kind.to_string()))
    }

    pub fn new_node(&self, kind: NodeKind) -> Result<Box<dyn Node>, RuleError> {
        let components = self
            .components
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match components.get(&kind) {
            Some(factory) => Ok(factory()),
            None => Err(RuleError::ComponentNotFound(kind.to_string())),
        }
    }

    pub fn kinds(&self) -> Vec<NodeKind> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}

impl Default for ComponentRegistry {
    /// 注册全部内置组件
    fn default() -> Self {
        let registry = Self::empty();
        let builtins: Vec<(NodeKind, NodeFactory)> = vec![
            (
                NodeKind::Start,
                Arc::new(|| Box::new(StartNode::default()) as Box<dyn Node>),
            ),
            (
                NodeKind::End,
                Arc::new(|| Box::new(EndNode::default()) as Box<dyn Node>),
            ),
            (
                NodeKind::ExprFilter,
                Arc::new(|| Box::new(ExprFilterNode::default()) as Box<dyn Node>),
            ),
            (
                NodeKind::JsFilter,
                Arc::new(|| Box::new(JsFilterNode::default()) as Box<dyn Node>),
            ),
            (
                NodeKind::ExprSwitch,
                Arc::new(|| Box::new(ExprSwitchNode::default()) as Box<dyn Node>),
            ),
            (
                NodeKind::JsSwitch,
                Arc::new(|| Box::new(JsSwitchNode::default()) as Box<dyn Node>),
            ),
            (
                NodeKind::ExprAssign,
                Arc::new(|| Box::new(ExprAssignNode::default()) as Box<dyn Node>),
            ),
        ];
        for (kind, factory) in builtins {
            let _ = registry.register(kind, factory);
        }
        registry
    }
}
