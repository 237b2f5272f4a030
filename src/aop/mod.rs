mod debug;
mod validator;

pub use debug::*;
pub use validator::*;

use async_trait::async_trait;
use std::sync::Arc;

use crate::engine::{ChainCtx, EngineConfig, RuleNodeCtx};
use crate::types::{AggregationDef, ChainDef, Message, NodeDef, RuleError};

/// 横切切面。钩子默认空实现，实现方只覆盖自己关心的点位，
/// 钩子返回错误会中止所在作用域
#[async_trait]
pub trait Aspect: Send + Sync {
    /// 执行顺序，越小越先执行，同序按注册顺序
    fn order(&self) -> i32 {
        0
    }

    /// 规则链构建前，可否决
    fn on_chain_before_init(
        &self,
        _config: &EngineConfig,
        _def: &ChainDef,
    ) -> Result<(), RuleError> {
        Ok(())
    }

    /// 聚合构建前，可否决
    fn on_aggregation_before_init(
        &self,
        _config: &EngineConfig,
        _def: &AggregationDef,
    ) -> Result<(), RuleError> {
        Ok(())
    }

    /// 节点构建前，可否决
    fn on_node_before_init(
        &self,
        _config: &EngineConfig,
        _def: &NodeDef,
    ) -> Result<(), RuleError> {
        Ok(())
    }

    /// 链级钩子是否对本次调用生效
    fn point_cut_chain(&self, _chain: &ChainCtx, _msg: &Message) -> bool {
        true
    }

    async fn before_chain(&self, _chain: &ChainCtx, _msg: &mut Message) -> Result<(), RuleError> {
        Ok(())
    }

    async fn after_chain(&self, _chain: &ChainCtx, _msg: &mut Message) -> Result<(), RuleError> {
        Ok(())
    }

    /// 节点级钩子是否对本次调用生效
    fn point_cut_node(&self, _node: &RuleNodeCtx, _msg: &Message, _relation: &str) -> bool {
        true
    }

    async fn before_node(
        &self,
        _node: &RuleNodeCtx,
        _msg: &mut Message,
        _relation: &str,
    ) -> Result<(), RuleError> {
        Ok(())
    }

    async fn after_node(
        &self,
        _node: &RuleNodeCtx,
        _msg: &mut Message,
        _relation: &str,
    ) -> Result<(), RuleError> {
        Ok(())
    }
}

/// 按 Order 升序排好的切面列表，构建后只读
#[derive(Clone, Default)]
pub struct AspectList {
    aspects: Vec<Arc<dyn Aspect>>,
}

impl AspectList {
    /// 稳定排序，同序保持加入顺序
    pub fn new(mut aspects: Vec<Arc<dyn Aspect>>) -> Self {
        aspects.sort_by_key(|a| a.order());
        Self { aspects }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<dyn Aspect>> {
        self.aspects.iter()
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }
}
