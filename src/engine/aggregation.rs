use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::aop::AspectList;
use crate::engine::{ChainCtx, EngineConfig};
use crate::eval::{ExpectedKind, Program};
use crate::types::{AggregationDef, AggregationPolicy, Message, RuleError};

/// 子链 chainOutput 中的短路标记
pub const TERMINATE_KEY: &str = "terminate";

/// 聚合配置，policyTable 依赖 thresholds.scoreExpr
#[derive(Debug, Default, Deserialize)]
pub struct AggregationConfiguration {
    #[serde(default)]
    pub aggregation: AggregationSettings,
}

#[derive(Debug, Default, Deserialize)]
pub struct AggregationSettings {
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub score_expr: String,
}

/// 聚合运行时：按优先级从大到小排好的子链序列，
/// 在一条消息上依次执行并合并各链产出
pub struct AggregationCtx {
    def: AggregationDef,
    chains: Vec<Arc<ChainCtx>>,
    aspects: AspectList,
    /// policyTable 的评分程序，构建时编译
    score_program: Option<Program>,
}

impl AggregationCtx {
    pub fn new(
        config: &EngineConfig,
        aspects: &AspectList,
        mut def: AggregationDef,
    ) -> Result<Self, RuleError> {
        for aspect in aspects.iter() {
            aspect.on_aggregation_before_init(config, &def)?;
        }

        // 稳定排序，优先级大的先执行
        def.metadata
            .chains
            .sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut chains = Vec::new();
        for chain_def in &def.metadata.chains {
            if chain_def.disabled {
                tracing::info!(chain_id = %chain_def.id, "跳过已禁用的子规则链");
                continue;
            }
            chains.push(Arc::new(ChainCtx::new(config, aspects, chain_def.clone())?));
        }

        let configuration: AggregationConfiguration =
            serde_json::from_value(Value::Object(def.configuration.clone()))
                .map_err(|e| RuleError::Config(e.to_string()))?;
        let score_program = if def.policy == AggregationPolicy::PolicyTable {
            // 空表达式已被聚合校验器拦截
            Some(Program::compile_expr(
                configuration.aggregation.thresholds.score_expr.trim(),
                ExpectedKind::Map,
            )?)
        } else {
            None
        };

        Ok(Self {
            def,
            chains,
            aspects: aspects.clone(),
            score_program,
        })
    }

    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.def.policy
    }

    pub fn def(&self) -> &AggregationDef {
        &self.def
    }

    pub fn chains(&self) -> &[Arc<ChainCtx>] {
        &self.chains
    }

    /// 依次执行子链：每条链前后跑链级切面，链出错时按该链的
    /// terminalOnErr 决定中止还是记日志继续；每条链执行完把
    /// chainOutput 快照进聚合输出并清空，shortCircuit 命中
    /// terminate 标记即停止
    pub async fn on_msg(&self, msg: &mut Message) -> Result<(), RuleError> {
        let mut output = Map::new();
        for chain in &self.chains {
            self.on_before(chain, msg).await?;
            if let Err(err) = chain.on_msg(msg).await {
                if chain.terminal_on_err() {
                    return Err(err);
                }
                tracing::warn!(chain_id = %chain.id(), error = %err, "子规则链执行失败");
            }
            self.on_after(chain, msg).await?;

            let chain_output = msg.take_chain_output().unwrap_or_default();
            let terminate = self.def.policy == AggregationPolicy::ShortCircuit
                && chain_output
                    .get(TERMINATE_KEY)
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
            output.insert(chain.id().to_string(), Value::Object(chain_output));
            if terminate {
                break;
            }
        }

        if let Some(program) = &self.score_program {
            let decision = program.run_map(&output).await?;
            msg.set_aggregation_output(decision);
        }
        msg.set_chain_aggregation_output(output);
        Ok(())
    }

    async fn on_before(&self, chain: &ChainCtx, msg: &mut Message) -> Result<(), RuleError> {
        for aspect in self.aspects.iter() {
            if aspect.point_cut_chain(chain, msg) {
                aspect.before_chain(chain, msg).await?;
            }
        }
        Ok(())
    }

    async fn on_after(&self, chain: &ChainCtx, msg: &mut Message) -> Result<(), RuleError> {
        for aspect in self.aspects.iter() {
            if aspect.point_cut_chain(chain, msg) {
                aspect.after_chain(chain, msg).await?;
            }
        }
        Ok(())
    }

    pub fn destroy(&self) {
        for chain in &self.chains {
            chain.destroy();
        }
    }
}
