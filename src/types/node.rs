use async_trait::async_trait;

use crate::engine::EngineConfig;
use crate::types::{Configuration, Message, RuleError};

/// 规则节点组件。实例由注册表创建，先 init 再参与消息处理，
/// init 之后只读，可被多条消息并发调用
#[async_trait]
pub trait Node: Send + Sync {
    /// 校验配置并编译脚本，失败则整条链构建失败
    fn init(&mut self, config: &EngineConfig, configuration: &Configuration)
        -> Result<(), RuleError>;

    /// 处理消息，返回发出的关系标签，None 表示链在此终止
    async fn on_msg(&self, msg: &mut Message) -> Result<Option<String>, RuleError>;

    /// 释放资源，可能被调用多次
    fn destroy(&self) {}
}
