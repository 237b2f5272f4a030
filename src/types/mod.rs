mod dsl;
mod error;
mod message;
mod node;

pub use dsl::*;
pub use error::*;
pub use message::*;
pub use node::*;

use serde_json::Value;

/// 组件配置，具体键由各节点类型自行约定
pub type Configuration = serde_json::Map<String, Value>;

// 内置连接关系类型
pub const DEFAULT_RELATION: &str = "default";
pub const TRUE_RELATION: &str = "true";
pub const FALSE_RELATION: &str = "false";

/// switch 配置里 other 分支的 case 固定写法
pub const OTHER_CASE: &str = "other";
