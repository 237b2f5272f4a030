use async_trait::async_trait;

use crate::engine::EngineConfig;
use crate::types::{Configuration, Message, Node, RuleError, DEFAULT_RELATION};

/// 开始节点，规则链的唯一入口，原样沿 default 分支转发
#[derive(Debug, Default)]
pub struct StartNode;

#[async_trait]
impl Node for StartNode {
    fn init(
        &mut self,
        _config: &EngineConfig,
        _configuration: &Configuration,
    ) -> Result<(), RuleError> {
        Ok(())
    }

    async fn on_msg(&self, _msg: &mut Message) -> Result<Option<String>, RuleError> {
        Ok(Some(DEFAULT_RELATION.to_string()))
    }
}
