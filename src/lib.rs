pub mod aop;
pub mod components;
pub mod engine;
pub mod eval;
pub mod types;

pub use engine::{
    ChainAggregationEngine, ChainEngine, Engine, EngineBuilder, EngineConfig, JsonParser,
};
pub use types::{Message, RuleError};
