use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::EngineConfig;
use crate::eval::{ExpectedKind, Program};
use crate::types::{
    Configuration, Message, Node, RuleError, FALSE_RELATION, TRUE_RELATION,
};

#[derive(Debug, Default, Deserialize)]
pub struct ExprFilterConfig {
    #[serde(default)]
    pub script: String,
}

/// 表达式过滤节点，布尔结果路由到 true/false 分支
#[derive(Default)]
pub struct ExprFilterNode {
    program: Option<Program>,
}

#[async_trait]
impl Node for ExprFilterNode {
    fn init(
        &mut self,
        _config: &EngineConfig,
        configuration: &Configuration,
    ) -> Result<(), RuleError> {
        let config: ExprFilterConfig =
            serde_json::from_value(Value::Object(configuration.clone()))
                .map_err(|e| RuleError::Config(e.to_string()))?;
        let script = config.script.trim();
        if script.is_empty() {
            return Err(RuleError::Config("exprFilter 缺少 script".to_string()));
        }
        self.program = Some(Program::compile_expr(script, ExpectedKind::Bool)?);
        Ok(())
    }

    async fn on_msg(&self, msg: &mut Message) -> Result<Option<String>, RuleError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| RuleError::Config("节点未初始化".to_string()))?;
        if program.run_bool(msg.input()).await? {
            Ok(Some(TRUE_RELATION.to_string()))
        } else {
            Ok(Some(FALSE_RELATION.to_string()))
        }
    }
}
