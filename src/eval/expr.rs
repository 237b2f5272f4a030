use rhai::{Dynamic, Engine, Scope, AST};
use serde_json::{Map, Value};

use crate::eval::{classify, ExpectedKind, ScriptValue};
use crate::types::RuleError;

/// 类型化表达式程序：init 时编译一次，编译后只读，可并发执行。
/// 未定义的标识符按 unit 处理而不是报错
pub struct ExprProgram {
    engine: Engine,
    ast: AST,
    kind: ExpectedKind,
}

impl ExprProgram {
    pub fn compile(source: &str, kind: ExpectedKind) -> Result<Self, RuleError> {
        let mut engine = Engine::new();
        engine.on_var(|name, _, ctx| {
            if ctx.scope().contains(name) {
                Ok(None)
            } else {
                Ok(Some(Dynamic::UNIT))
            }
        });
        let ast = engine
            .compile(source)
            .map_err(|e| RuleError::Script(e.to_string()))?;
        Ok(Self { engine, ast, kind })
    }

    pub fn run(&self, env: &Map<String, Value>) -> Result<ScriptValue, RuleError> {
        let mut scope = Scope::new();
        for (key, value) in env {
            let dynamic =
                rhai::serde::to_dynamic(value).map_err(|e| RuleError::Script(e.to_string()))?;
            scope.push_dynamic(key.as_str(), dynamic);
        }
        let out = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
            .map_err(|e| RuleError::Script(e.to_string()))?;
        let value: Value =
            rhai::serde::from_dynamic(&out).map_err(|e| RuleError::Script(e.to_string()))?;
        classify(value, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => panic!("env 必须是对象"),
        }
    }

    #[test]
    fn bool_expression() {
        let program = ExprProgram::compile("score > 60", ExpectedKind::Bool).unwrap();
        assert_eq!(
            program.run(&env(json!({"score": 80}))).unwrap(),
            ScriptValue::Bool(true)
        );
        assert_eq!(
            program.run(&env(json!({"score": 10}))).unwrap(),
            ScriptValue::Bool(false)
        );
    }

    #[test]
    fn string_expression() {
        let program = ExprProgram::compile(
            r#"if student == "3" { "A" } else { "B" }"#,
            ExpectedKind::Str,
        )
        .unwrap();
        assert_eq!(
            program.run(&env(json!({"student": "3"}))).unwrap(),
            ScriptValue::Str("A".to_string())
        );
    }

    #[test]
    fn map_expression() {
        let program =
            ExprProgram::compile(r#"#{total: priVars.bonus + score}"#, ExpectedKind::Map).unwrap();
        let out = program
            .run(&env(json!({"score": 5, "priVars": {"bonus": 10}})))
            .unwrap();
        assert_eq!(out, ScriptValue::Map(env(json!({"total": 15}))));
    }

    #[test]
    fn return_type_mismatch() {
        let program = ExprProgram::compile(r#""not a bool""#, ExpectedKind::Bool).unwrap();
        let err = program.run(&env(json!({}))).unwrap_err();
        assert!(matches!(err, RuleError::ScriptReturnType { .. }));
    }

    #[test]
    fn undefined_identifier_is_unit() {
        let program = ExprProgram::compile(r#"missing == ()"#, ExpectedKind::Bool).unwrap();
        assert_eq!(
            program.run(&env(json!({}))).unwrap(),
            ScriptValue::Bool(true)
        );
    }

    #[test]
    fn compile_error() {
        assert!(ExprProgram::compile("score >", ExpectedKind::Bool).is_err());
    }
}
