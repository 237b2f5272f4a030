use crate::types::{AggregationDef, ChainDef, NodeDef, RuleError};

/// 规则链定义的编解码接口，默认 JSON，需要其它格式时自行实现
pub trait DslParser: Send + Sync {
    fn decode_chain(&self, dsl: &[u8]) -> Result<ChainDef, RuleError>;

    fn decode_aggregation(&self, dsl: &[u8]) -> Result<AggregationDef, RuleError>;

    fn encode_chain(&self, def: &ChainDef) -> Result<Vec<u8>, RuleError>;

    fn encode_aggregation(&self, def: &AggregationDef) -> Result<Vec<u8>, RuleError>;

    fn encode_node(&self, def: &NodeDef) -> Result<Vec<u8>, RuleError>;
}

/// 默认 JSON 解析器，输出带缩进格式化
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParser;

impl DslParser for JsonParser {
    fn decode_chain(&self, dsl: &[u8]) -> Result<ChainDef, RuleError> {
        serde_json::from_slice(dsl).map_err(|e| RuleError::Definition(e.to_string()))
    }

    fn decode_aggregation(&self, dsl: &[u8]) -> Result<AggregationDef, RuleError> {
        serde_json::from_slice(dsl).map_err(|e| RuleError::Definition(e.to_string()))
    }

    fn encode_chain(&self, def: &ChainDef) -> Result<Vec<u8>, RuleError> {
        serde_json::to_vec_pretty(def).map_err(|e| RuleError::Definition(e.to_string()))
    }

    fn encode_aggregation(&self, def: &AggregationDef) -> Result<Vec<u8>, RuleError> {
        serde_json::to_vec_pretty(def).map_err(|e| RuleError::Definition(e.to_string()))
    }

    fn encode_node(&self, def: &NodeDef) -> Result<Vec<u8>, RuleError> {
        serde_json::to_vec_pretty(def).map_err(|e| RuleError::Definition(e.to_string()))
    }
}
