use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::EngineConfig;
use crate::eval::{ExpectedKind, Program};
use crate::types::{
    Configuration, Message, Node, RuleError, FALSE_RELATION, TRUE_RELATION,
};

#[derive(Debug, Default, Deserialize)]
pub struct JsFilterConfig {
    /// 函数体，入参为 msg，必须 return 布尔值
    #[serde(default)]
    pub script: String,
}

/// JS 过滤节点，脚本跑在按需增长的池化 VM 上
#[derive(Default)]
pub struct JsFilterNode {
    program: Option<Program>,
}

#[async_trait]
impl Node for JsFilterNode {
    fn init(
        &mut self,
        _config: &EngineConfig,
        configuration: &Configuration,
    ) -> Result<(), RuleError> {
        let config: JsFilterConfig =
            serde_json::from_value(Value::Object(configuration.clone()))
                .map_err(|e| RuleError::Config(e.to_string()))?;
        let script = config.script.trim();
        if script.is_empty() {
            return Err(RuleError::Config("jsFilter 缺少 script".to_string()));
        }
        self.program = Some(Program::compile_js(script, ExpectedKind::Bool)?);
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
