use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::EngineConfig;
use crate::eval::{ExpectedKind, Program};
use crate::types::{Configuration, Message, Node, RuleError, DEFAULT_RELATION};

#[derive(Debug, Default, Deserialize)]
pub struct ExprAssignConfig {
    #[serde(default)]
    pub script: String,
}

/// 赋值节点：表达式结果合并进 priVars，供下游脚本读取
#[derive(Default)]
pub struct ExprAssignNode {
    program: Option<Program>,
}

#[async_trait]
impl Node for ExprAssignNode {
    fn init(
        &mut self,
        _config: &EngineConfig,
        configuration: &Configuration,
    ) -> Result<(), RuleError> {
        let config: ExprAssignConfig =
            serde_json::from_value(Value::Object(configuration.clone()))
                .map_err(|e| RuleError::Config(e.to_string()))?;
        let script = config.script.trim();
        if script.is_empty() {
            return Err(RuleError::Config("exprAssign 缺少 script".to_string()));
        }
        self.program = Some(Program::compile_expr(script, ExpectedKind::Map)?);
        Ok(())
    }

    async fn on_msg(&self, msg: &mut Message) -> Result<Option<String>, RuleError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| RuleError::Config("节点未初始化".to_string()))?;
        let vars = program.run_map(msg.input()).await?;
        msg.merge_pri_vars(vars);
        Ok(Some(DEFAULT_RELATION.to_string()))
    }
}
