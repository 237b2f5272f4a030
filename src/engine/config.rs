use serde_json::{Map, Value};
use std::sync::Arc;

use crate::aop::{AggregationValidator, Aspect, ChainDebug, ChainValidator, NodeDebug};
use crate::engine::{ComponentRegistry, DslParser, JsonParser};

/// 引擎配置：组件注册表、DSL 解析器与全局属性
#[derive(Clone)]
pub struct EngineConfig {
    pub registry: Arc<ComponentRegistry>,
    pub parser: Arc<dyn DslParser>,
    /// 全局属性，节点配置中的 ${global.key} 在节点初始化时替换一次
    pub properties: Map<String, Value>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            registry: Arc::new(ComponentRegistry::default()),
            parser: Arc::new(JsonParser),
            properties: Map::new(),
        }
    }
}

impl EngineConfig {
    pub fn with_registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn DslParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }
}

/// 内置切面：校验器与调试切面，引擎构建时追加到用户切面之后
pub fn builtin_aspects() -> Vec<Arc<dyn Aspect>> {
    vec![
        Arc::new(ChainValidator),
        Arc::new(AggregationValidator),
        Arc::new(ChainDebug),
        Arc::new(NodeDebug),
    ]
}

/// 递归替换配置里字符串值中的 ${global.key}
pub fn substitute_properties(value: &mut Value, properties: &Map<String, Value>) {
    if properties.is_empty() {
        return;
    }
    match value {
        Value::String(s) => {
            if s.contains("${global.") {
                *s = replace_globals(s, properties);
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_properties(item, properties);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_properties(item, properties);
            }
        }
        _ => {}
    }
}

fn replace_globals(s: &str, properties: &Map<String, Value>) -> String {
    let mut out = s.to_string();
    for (key, value) in properties {
        let pattern = format!("${{global.{}}}", key);
        if out.contains(&pattern) {
            let replacement = match value {
                Value::String(v) => v.clone(),
                other => other.to_string(),
            };
            out = out.replace(&pattern, &replacement);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_global_keys_recursively() {
        let mut value = json!({
            "script": "score > ${global.threshold}",
            "nested": {"url": "${global.base}/api"}
        });
        let properties = match json!({"threshold": 60, "base": "http://a"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        substitute_properties(&mut value, &properties);
        assert_eq!(value["script"], "score > 60");
        assert_eq!(value["nested"]["url"], "http://a/api");
    }
}
