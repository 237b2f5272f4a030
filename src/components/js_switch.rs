use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::components::js_script_from_cases;
use crate::engine::EngineConfig;
use crate::eval::{ExpectedKind, Program};
use crate::types::{Case, Configuration, Message, Node, RuleError};

#[derive(Debug, Default, Deserialize)]
pub struct JsSwitchConfig {
    /// 函数体，入参为 msg，必须 return 标签字符串，优先于 cases
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub cases: Vec<Case>,
}

/// JS 路由节点，按脚本返回的标签选择出边
#[derive(Default)]
pub struct JsSwitchNode {
    program: Option<Program>,
}

#[async_trait]
impl Node for JsSwitchNode {
    fn init(
        &mut self,
        _config: &EngineConfig,
        configuration: &Configuration,
    ) -> Result<(), RuleError> {
        let config: JsSwitchConfig =
            serde_json::from_value(Value::Object(configuration.clone()))
                .map_err(|e| RuleError::Config(e.to_string()))?;
        let script = config.script.trim().to_string();
        let script = if script.is_empty() {
            js_script_from_cases(&config.cases)?
        } else {
            script
        };
        self.program = Some(Program::compile_js(&script, ExpectedKind::Str)?);
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
