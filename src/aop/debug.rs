use async_trait::async_trait;
use tracing::debug;

use crate::aop::Aspect;
use crate::engine::{ChainCtx, RuleNodeCtx};
use crate::types::{Message, RuleError};

/// 链级调试切面，记录每次消息进出规则链
pub struct ChainDebug;

#[async_trait]
impl Aspect for ChainDebug {
    fn order(&self) -> i32 {
        900
    }

    async fn before_chain(&self, chain: &ChainCtx, msg: &mut Message) -> Result<(), RuleError> {
        debug!(chain_id = %chain.id(), msg_id = %msg.id(), input = ?msg.input(), "链执行开始");
        Ok(())
    }

    async fn after_chain(&self, chain: &ChainCtx, msg: &mut Message) -> Result<(), RuleError> {
        debug!(
            chain_id = %chain.id(),
            msg_id = %msg.id(),
            chain_output = ?msg.chain_output(),
            "链执行结束"
        );
        Ok(())
    }
}

/// 节点级调试切面，记录遍历中每一步的进出
pub struct NodeDebug;

#[async_trait]
impl Aspect for NodeDebug {
    fn order(&self) -> i32 {
        900
    }

    async fn before_node(
        &self,
        node: &RuleNodeCtx,
        msg: &mut Message,
        relation: &str,
    ) -> Result<(), RuleError> {
        debug!(
            node_id = %node.id(),
            kind = %node.kind(),
            relation,
            msg_id = %msg.id(),
            "节点执行开始"
        );
        Ok(())
    }

    async fn after_node(
        &self,
        node: &RuleNodeCtx,
        msg: &mut Message,
        relation: &str,
    ) -> Result<(), RuleError> {
        debug!(
            node_id = %node.id(),
            kind = %node.kind(),
            relation,
            msg_id = %msg.id(),
            "节点执行结束"
        );
        Ok(())
    }
}
