mod expr;
mod js;

pub use expr::ExprProgram;
pub use js::JsProgram;

use serde_json::{Map, Value};

use crate::types::RuleError;

/// 脚本结果的期望类型：filter 为 Bool，switch 为 Str，assign/end 为 Map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    Bool,
    Str,
    Map,
}

impl ExpectedKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExpectedKind::Bool => "bool",
            ExpectedKind::Str => "string",
            ExpectedKind::Map => "map",
        }
    }
}

/// 脚本产出的三种合法结果
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Bool(bool),
    Str(String),
    Map(Map<String, Value>),
}

/// 按期望类型收窄脚本结果，其它类型一律视为节点错误
fn classify(value: Value, kind: ExpectedKind) -> Result<ScriptValue, RuleError> {
    match (kind, value) {
        (ExpectedKind::Bool, Value::Bool(b)) => Ok(ScriptValue::Bool(b)),
        (ExpectedKind::Str, Value::String(s)) => Ok(ScriptValue::Str(s)),
        (ExpectedKind::Map, Value::Object(m)) => Ok(ScriptValue::Map(m)),
        (kind, _) => Err(RuleError::ScriptReturnType {
            expected: kind.name(),
        }),
    }
}

/// 编译后的脚本程序。节点不感知具体是哪种求值器
pub enum Program {
    Expr(ExprProgram),
    Js(JsProgram),
}

impl Program {
    pub fn compile_expr(source: &str, kind: ExpectedKind) -> Result<Self, RuleError> {
        Ok(Program::Expr(ExprProgram::compile(source, kind)?))
    }

    pub fn compile_js(source: &str, kind: ExpectedKind) -> Result<Self, RuleError> {
        Ok(Program::Js(JsProgram::compile(source, kind)?))
    }

    pub async fn run(&self, env: &Map<String, Value>) -> Result<ScriptValue, RuleError> {
        match self {
            Program::Expr(p) => p.run(env),
            Program::Js(p) => p.run(env).await,
        }
    }

    pub async fn run_bool(&self, env: &Map<String, Value>) -> Result<bool, RuleError> {
        match self.run(env).await? {
            ScriptValue::Bool(b) => Ok(b),
            _ => Err(RuleError::ScriptReturnType { expected: "bool" }),
        }
    }

    pub async fn run_str(&self, env: &Map<String, Value>) -> Result<String, RuleError> {
        match self.run(env).await? {
            ScriptValue::Str(s) => Ok(s),
            _ => Err(RuleError::ScriptReturnType { expected: "string" }),
        }
    }

    pub async fn run_map(
        &self,
        env: &Map<String, Value>,
    ) -> Result<Map<String, Value>, RuleError> {
        match self.run(env).await? {
            ScriptValue::Map(m) => Ok(m),
            _ => Err(RuleError::ScriptReturnType { expected: "map" }),
        }
    }
}
