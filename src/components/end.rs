use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::EngineConfig;
use crate::eval::{ExpectedKind, Program};
use crate::types::{Configuration, Message, Node, RuleError};

#[derive(Debug, Default, Deserialize)]
pub struct EndNodeConfig {
    #[serde(default)]
    pub script: String,
}

/// 结束节点：表达式结果写入 chainOutput 并清空 priVars，不再转发
#[derive(Default)]
pub struct EndNode {
    program: Option<Program>,
}

#[async_trait]
impl Node for EndNode {
    fn init(
        &mut self,
        _config: &EngineConfig,
        configuration: &Configuration,
    ) -> Result<(), RuleError> {
        let config: EndNodeConfig =
            serde_json::from_value(Value::Object(configuration.clone()))
                .map_err(|e| RuleError::Config(e.to_string()))?;
        let script = config.script.trim().to_string();
        let script = if script.is_empty() {
            "#{}".to_string()
        } else {
            script
        };
        self.program = Some(Program::compile_expr(&script, ExpectedKind::Map)?);
        Ok(())
    }

    async fn on_msg(&self, msg: &mut Message) -> Result<Option<String>, RuleError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| RuleError::Config("节点未初始化".to_string()))?;
        let output = program.run_map(msg.input()).await?;
        msg.clear_pri_vars();
        msg.set_chain_output(output);
        Ok(None)
    }
}
