use rquickjs::{Context, Runtime};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::eval::{classify, ExpectedKind, ScriptValue};
use crate::types::RuleError;

/// 单线程 JS 虚拟机，脚本在创建时装载为 __main 函数
struct JsVm {
    context: Context,
    _runtime: Runtime,
}

impl JsVm {
    fn new(fn_source: &str) -> Result<Self, RuleError> {
        let runtime = Runtime::new().map_err(|e| RuleError::Script(e.to_string()))?;
        let context = Context::full(&runtime).map_err(|e| RuleError::Script(e.to_string()))?;
        context.with(|ctx| {
            ctx.eval::<(), _>(fn_source.to_string()).map_err(|err| match err {
                rquickjs::Error::Exception => RuleError::Script(format!("{:?}", ctx.catch())),
                other => RuleError::Script(other.to_string()),
            })
        })?;
        Ok(Self {
            context,
            _runtime: runtime,
        })
    }

    /// 消息 input 以 JSON 文本注入为 msg 参数，结果经 JSON 编组带回
    fn eval_with_env(&self, env_json: &str) -> Result<Value, RuleError> {
        let code = format!("JSON.stringify({{v: __main({})}});", env_json);
        let out = self.context.with(|ctx| {
            ctx.eval::<String, _>(code).map_err(|err| match err {
                rquickjs::Error::Exception => RuleError::Script(format!("{:?}", ctx.catch())),
                other => RuleError::Script(other.to_string()),
            })
        })?;
        serde_json::from_str(&out).map_err(|e| RuleError::Script(e.to_string()))
    }
}

/// 脚本程序：同一份脚本，N 个按需增长的池化 VM，
/// 进入时借出、所有退出路径都归还
pub struct JsProgram {
    fn_source: String,
    kind: ExpectedKind,
    pool: Mutex<Vec<JsVm>>,
}

impl JsProgram {
    pub fn compile(script: &str, kind: ExpectedKind) -> Result<Self, RuleError> {
        let fn_source = format!("function __main(msg) {{ {} }}", script);
        // 先建一个 VM，把语法错误留在 init 阶段
        let vm = JsVm::new(&fn_source)?;
        Ok(Self {
            fn_source,
            kind,
            pool: Mutex::new(vec![vm]),
        })
    }

    pub async fn run(&self, env: &Map<String, Value>) -> Result<ScriptValue, RuleError> {
        let env_json =
            serde_json::to_string(env).map_err(|e| RuleError::Script(e.to_string()))?;
        let vm = { self.pool.lock().await.pop() };
        let vm = match vm {
            Some(vm) => vm,
            None => JsVm::new(&self.fn_source)?,
        };
        let result = vm.eval_with_env(&env_json);
        self.pool.lock().await.push(vm);

        // JSON.stringify 的产物是 {v: ...}，脚本返回 undefined 时 v 缺失
        let value = match result? {
            Value::Object(mut wrapper) => wrapper.remove("v"),
            _ => None,
        };
        match value {
            Some(value) => classify(value, self.kind),
            None => Err(RuleError::ScriptReturnType {
                expected: self.kind.name(),
            }),
        }
    }
}
