use serde_json::{Map, Value};
use uuid::Uuid;

/// priVars 在 input 中的键，由引擎在消息构造时播种
pub const PRI_VARS_KEY: &str = "priVars";

/// 消息负载的四个区域
#[derive(Debug, Clone, Default)]
struct MessageData {
    /// 脚本可见的事实集，含 priVars
    input: Map<String, Value>,
    /// 单条规则链 end 节点的产出
    chain_output: Option<Map<String, Value>>,
    /// 链 id -> 该链 chainOutput
    chain_aggregation_output: Option<Map<String, Value>>,
    /// policyTable 评分表达式的决策产出
    aggregation_output: Option<Map<String, Value>>,
}

/// 流经规则引擎的消息，身份字段只在构造时设置一次
#[derive(Debug, Clone)]
pub struct Message {
    id: String,
    ts: i64,
    data: MessageData,
}

impl Message {
    /// id 为空则自动生成 UUID，ts <= 0 则取当前毫秒
    pub fn new(id: impl Into<String>, ts: i64, mut input: Map<String, Value>) -> Self {
        let mut id = id.into();
        if id.is_empty() {
            id = Uuid::new_v4().to_string();
        }
        let ts = if ts <= 0 {
            chrono::Utc::now().timestamp_millis()
        } else {
            ts
        };
        // 播种 priVars
        input.insert(PRI_VARS_KEY.to_string(), Value::Object(Map::new()));
        Self {
            id,
            ts,
            data: MessageData {
                input,
                ..Default::default()
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ts(&self) -> i64 {
        self.ts
    }

    pub fn input(&self) -> &Map<String, Value> {
        &self.data.input
    }

    pub fn input_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data.input
    }

    /// 将赋值节点的产出合并进 priVars，同键覆盖
    pub fn merge_pri_vars(&mut self, vars: Map<String, Value>) {
        match self.data.input.get_mut(PRI_VARS_KEY) {
            Some(Value::Object(pri_vars)) => pri_vars.extend(vars),
            _ => {
                self.data
                    .input
                    .insert(PRI_VARS_KEY.to_string(), Value::Object(vars));
            }
        }
    }

    pub fn clear_pri_vars(&mut self) {
        self.data
            .input
            .insert(PRI_VARS_KEY.to_string(), Value::Object(Map::new()));
    }

    pub fn pri_vars(&self) -> Option<&Map<String, Value>> {
        match self.data.input.get(PRI_VARS_KEY) {
            Some(Value::Object(vars)) => Some(vars),
            _ => None,
        }
    }

    pub fn set_chain_output(&mut self, output: Map<String, Value>) {
        self.data.chain_output = Some(output);
    }

    pub fn chain_output(&self) -> Option<&Map<String, Value>> {
        self.data.chain_output.as_ref()
    }

    /// 取走并清空 chainOutput，聚合在子链之间依赖该语义
    pub fn take_chain_output(&mut self) -> Option<Map<String, Value>> {
        self.data.chain_output.take()
    }

    pub fn set_chain_aggregation_output(&mut self, output: Map<String, Value>) {
        self.data.chain_aggregation_output = Some(output);
    }

    pub fn chain_aggregation_output(&self) -> Option<&Map<String, Value>> {
        self.data.chain_aggregation_output.as_ref()
    }

    pub fn set_aggregation_output(&mut self, output: Map<String, Value>) {
        self.data.aggregation_output = Some(output);
    }

    pub fn aggregation_output(&self) -> Option<&Map<String, Value>> {
        self.data.aggregation_output.as_ref()
    }
}
