use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::components::expr_script_from_cases;
use crate::engine::EngineConfig;
use crate::eval::{ExpectedKind, Program};
use crate::types::{Case, Configuration, Message, Node, RuleError};

#[derive(Debug, Default, Deserialize)]
pub struct ExprSwitchConfig {
    /// 直接返回标签字符串的表达式，优先于 cases
    #[serde(default)]
    pub script: String,
    /// (case, then) 有序列表，init 时降级为一条表达式
    #[serde(default)]
    pub cases: Vec<Case>,
}

/// 表达式路由节点，按表达式结果选择出边
#[derive(Default)]
pub struct ExprSwitchNode {
    program: Option<Program>,
}

#[async_trait]
impl Node for ExprSwitchNode {
    fn init(
        &mut self,
        _config: &EngineConfig,
        configuration: &Configuration,
    ) -> Result<(), RuleError> {
        let config: ExprSwitchConfig =
            serde_json::from_value(Value::Object(configuration.clone()))
                .map_err(|e| RuleError::Config(e.to_string()))?;
        let script = config.script.trim().to_string();
        let script = if script.is_empty() {
            expr_script_from_cases(&config.cases)?
        } else {
            script
        };
        self.program = Some(Program::compile_expr(&script, ExpectedKind::Str)?);
        Ok(())
    }

    async fn on_msg(&self, msg: &mut Message) -> Result<Option<String>, RuleError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| RuleError::Config("节点未初始化".to_string()))?;
        let relation = program.run_str(msg.input()).await?;
        Ok(Some(relation))
    }
}
