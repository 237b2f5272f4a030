use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::aop::{Aspect, AspectList};
use crate::engine::{builtin_aspects, record_request, AggregationCtx, ChainCtx, EngineConfig};
use crate::types::{Message, RuleError};

/// 规则引擎统一接口，单链引擎与聚合引擎共同实现
#[async_trait]
pub trait Engine: Send + Sync {
    async fn id(&self) -> String;

    /// 同步处理一条消息：链前切面 -> 遍历 -> 链后切面，并记录指标
    async fn on_msg(&self, msg: &mut Message) -> Result<(), RuleError>;

    /// 热重载：解析新定义并原子替换运行图，失败保持现有图不变
    async fn reload_self(&self, dsl: &[u8]) -> Result<(), RuleError>;

    /// 当前定义的序列化形式
    async fn dsl(&self) -> Result<Vec<u8>, RuleError>;

    /// 销毁所有节点并标记未初始化，可重复调用
    async fn stop(&self);
}

type ChainCallback = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;
type DeletedCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// 生命周期回调：首次构建成功触发 OnNew，后续重载触发 OnUpdated，
/// 停止触发 OnDeleted
#[derive(Clone, Default)]
pub struct Callbacks {
    pub(crate) on_new: Option<ChainCallback>,
    pub(crate) on_updated: Option<ChainCallback>,
    pub(crate) on_deleted: Option<DeletedCallback>,
}

impl Callbacks {
    pub fn with_on_new(mut self, f: impl Fn(&str, &[u8]) + Send + Sync + 'static) -> Self {
        self.on_new = Some(Arc::new(f));
        self
    }

    pub fn with_on_updated(mut self, f: impl Fn(&str, &[u8]) + Send + Sync + 'static) -> Self {
        self.on_updated = Some(Arc::new(f));
        self
    }

    pub fn with_on_deleted(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_deleted = Some(Arc::new(f));
        self
    }
}

/// 引擎构建器，可定制注册表、解析器、全局属性、切面与回调
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    aspects: Vec<Arc<dyn Aspect>>,
    callbacks: Callbacks,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn aspects(mut self, aspects: Vec<Arc<dyn Aspect>>) -> Self {
        self.aspects = aspects;
        self
    }

    pub fn callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn build_chain(self, dsl: &[u8]) -> Result<ChainEngine, RuleError> {
        ChainEngine::build(self.config, self.aspects, self.callbacks, dsl)
    }

    pub fn build_aggregation(self, dsl: &[u8]) -> Result<ChainAggregationEngine, RuleError> {
        ChainAggregationEngine::build(self.config, self.aspects, self.callbacks, dsl)
    }
}

/// 内置切面追加在用户切面之后，整体按 Order 稳定排序，
/// 首次构建也因此经过校验器
fn full_aspects(user: Vec<Arc<dyn Aspect>>) -> AspectList {
    let mut aspects = user;
    aspects.extend(builtin_aspects());
    AspectList::new(aspects)
}

fn metric_name<'a>(name: &'a str, id: &'a str) -> &'a str {
    if name.is_empty() {
        id
    } else {
        name
    }
}

/// 单链引擎：持有一条规则链的运行图，重载时整体原子替换，
/// 在途消息继续跑旧图
pub struct ChainEngine {
    config: EngineConfig,
    aspects: AspectList,
    callbacks: Callbacks,
    chain: RwLock<Option<Arc<ChainCtx>>>,
}

impl std::fmt::Debug for ChainEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainEngine").finish()
    }
}

impl ChainEngine {
    pub fn new(dsl: &[u8]) -> Result<Self, RuleError> {
        EngineBuilder::new().build_chain(dsl)
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    fn build(
        config: EngineConfig,
        user_aspects: Vec<Arc<dyn Aspect>>,
        callbacks: Callbacks,
        dsl: &[u8],
    ) -> Result<Self, RuleError> {
        let aspects = full_aspects(user_aspects);
        let ctx = Arc::new(Self::new_ctx(&config, &aspects, dsl)?);
        info!(chain_id = %ctx.id(), "规则链引擎已创建");
        if let Some(on_new) = &callbacks.on_new {
            let encoded = config.parser.encode_chain(ctx.def()).unwrap_or_default();
            on_new(ctx.id(), &encoded);
        }
        Ok(Self {
            config,
            aspects,
            callbacks,
            chain: RwLock::new(Some(ctx)),
        })
    }

    fn new_ctx(
        config: &EngineConfig,
        aspects: &AspectList,
        dsl: &[u8],
    ) -> Result<ChainCtx, RuleError> {
        let def = config.parser.decode_chain(dsl)?;
        if def.disabled {
            return Err(RuleError::EngineDisabled(def.id));
        }
        ChainCtx::new(config, aspects, def)
    }

    async fn current(&self) -> Result<Arc<ChainCtx>, RuleError> {
        self.chain
            .read()
            .await
            .clone()
            .ok_or(RuleError::NotInitialized)
    }

    async fn dispatch(&self, chain: &ChainCtx, msg: &mut Message) -> Result<(), RuleError> {
        for aspect in self.aspects.iter() {
            if aspect.point_cut_chain(chain, msg) {
                aspect.before_chain(chain, msg).await?;
            }
        }

        let result = chain.on_msg(msg).await;

        // 出错路径也尽量执行链后切面
        for aspect in self.aspects.iter() {
            if aspect.point_cut_chain(chain, msg) {
                if let Err(err) = aspect.after_chain(chain, msg).await {
                    if result.is_ok() {
                        return Err(err);
                    }
                    warn!(chain_id = %chain.id(), error = %err, "链后切面执行失败");
                }
            }
        }
        result
    }
}

#[async_trait]
impl Engine for ChainEngine {
    async fn id(&self) -> String {
        match self.chain.read().await.as_ref() {
            Some(ctx) => ctx.id().to_string(),
            None => String::new(),
        }
    }

    async fn on_msg(&self, msg: &mut Message) -> Result<(), RuleError> {
        let chain = self.current().await?;
        let start = Instant::now();
        let result = self.dispatch(&chain, msg).await;
        record_request(
            metric_name(chain.name(), chain.id()),
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    async fn reload_self(&self, dsl: &[u8]) -> Result<(), RuleError> {
        let ctx = Arc::new(Self::new_ctx(&self.config, &self.aspects, dsl)?);
        let encoded = self
            .config
            .parser
            .encode_chain(ctx.def())
            .unwrap_or_default();
        let chain_id = ctx.id().to_string();
        // 在途消息继续持有旧图的 Arc 跑完，这里只做指针替换
        let previous = { self.chain.write().await.replace(ctx) };
        match previous {
            Some(_) => {
                info!(chain_id = %chain_id, "规则链已重载");
                if let Some(on_updated) = &self.callbacks.on_updated {
                    on_updated(&chain_id, &encoded);
                }
            }
            None => {
                info!(chain_id = %chain_id, "规则链已创建");
                if let Some(on_new) = &self.callbacks.on_new {
                    on_new(&chain_id, &encoded);
                }
            }
        }
        Ok(())
    }

    async fn dsl(&self) -> Result<Vec<u8>, RuleError> {
        let chain = self.current().await?;
        self.config.parser.encode_chain(chain.def())
    }

    async fn stop(&self) {
        let previous = { self.chain.write().await.take() };
        if let Some(ctx) = previous {
            if let Some(on_deleted) = &self.callbacks.on_deleted {
                on_deleted(ctx.id());
            }
            ctx.destroy();
            info!(chain_id = %ctx.id(), "规则链引擎已停止");
        }
    }
}

/// 聚合引擎：持有一组子链，按聚合策略依次执行并合并产出
pub struct ChainAggregationEngine {
    config: EngineConfig,
    aspects: AspectList,
    callbacks: Callbacks,
    aggregation: RwLock<Option<Arc<AggregationCtx>>>,
}

impl std::fmt::Debug for ChainAggregationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainAggregationEngine").finish()
    }
}

impl ChainAggregationEngine {
    pub fn new(dsl: &[u8]) -> Result<Self, RuleError> {
        EngineBuilder::new().build_aggregation(dsl)
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    fn build(
        config: EngineConfig,
        user_aspects: Vec<Arc<dyn Aspect>>,
        callbacks: Callbacks,
        dsl: &[u8],
    ) -> Result<Self, RuleError> {
        let aspects = full_aspects(user_aspects);
        let ctx = Arc::new(Self::new_ctx(&config, &aspects, dsl)?);
        info!(aggregation_id = %ctx.id(), "聚合引擎已创建");
        if let Some(on_new) = &callbacks.on_new {
            let encoded = config
                .parser
                .encode_aggregation(ctx.def())
                .unwrap_or_default();
            on_new(ctx.id(), &encoded);
        }
        Ok(Self {
            config,
            aspects,
            callbacks,
            aggregation: RwLock::new(Some(ctx)),
        })
    }

    fn new_ctx(
        config: &EngineConfig,
        aspects: &AspectList,
        dsl: &[u8],
    ) -> Result<AggregationCtx, RuleError> {
        let def = config.parser.decode_aggregation(dsl)?;
        if def.disabled {
            return Err(RuleError::EngineDisabled(def.id));
        }
        AggregationCtx::new(config, aspects, def)
    }

    async fn current(&self) -> Result<Arc<AggregationCtx>, RuleError> {
        self.aggregation
            .read()
            .await
            .clone()
            .ok_or(RuleError::NotInitialized)
    }
}

#[async_trait]
impl Engine for ChainAggregationEngine {
    async fn id(&self) -> String {
        match self.aggregation.read().await.as_ref() {
            Some(ctx) => ctx.id().to_string(),
            None => String::new(),
        }
    }

    async fn on_msg(&self, msg: &mut Message) -> Result<(), RuleError> {
        let aggregation = self.current().await?;
        let start = Instant::now();
        let result = aggregation.on_msg(msg).await;
        record_request(
            metric_name(aggregation.name(), aggregation.id()),
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    async fn reload_self(&self, dsl: &[u8]) -> Result<(), RuleError> {
        let ctx = Arc::new(Self::new_ctx(&self.config, &self.aspects, dsl)?);
        let encoded = self
            .config
            .parser
            .encode_aggregation(ctx.def())
            .unwrap_or_default();
        let aggregation_id = ctx.id().to_string();
        // 在途消息继续持有旧图的 Arc 跑完，这里只做指针替换
        let previous = { self.aggregation.write().await.replace(ctx) };
        match previous {
            Some(_) => {
                info!(aggregation_id = %aggregation_id, "聚合已重载");
                if let Some(on_updated) = &self.callbacks.on_updated {
                    on_updated(&aggregation_id, &encoded);
                }
            }
            None => {
                info!(aggregation_id = %aggregation_id, "聚合已创建");
                if let Some(on_new) = &self.callbacks.on_new {
                    on_new(&aggregation_id, &encoded);
                }
            }
        }
        Ok(())
    }

    async fn dsl(&self) -> Result<Vec<u8>, RuleError> {
        let aggregation = self.current().await?;
        self.config.parser.encode_aggregation(aggregation.def())
    }

    async fn stop(&self) {
        let previous = { self.aggregation.write().await.take() };
        if let Some(ctx) = previous {
            if let Some(on_deleted) = &self.callbacks.on_deleted {
                on_deleted(ctx.id());
            }
            ctx.destroy();
            info!(aggregation_id = %ctx.id(), "聚合引擎已停止");
        }
    }
}
