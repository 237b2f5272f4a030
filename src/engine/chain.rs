use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::aop::AspectList;
use crate::engine::{init_rule_node_ctx, EngineConfig, RuleNodeCtx};
use crate::types::{ChainDef, Connection, Message, NodeKind, RuleError};

/// 单条规则链的运行时图：按 id 索引的节点、按源节点索引的出边、
/// 开始节点指针。构建完成后只读，可被多条消息并发遍历
pub struct ChainCtx {
    def: ChainDef,
    nodes: HashMap<String, Arc<RuleNodeCtx>>,
    node_routes: HashMap<String, Vec<Connection>>,
    root_node_id: String,
    aspects: AspectList,
}

impl ChainCtx {
    /// 构建规则链：先跑链构建前切面（校验器在其中），
    /// 再逐个实例化节点并按源节点建立出边索引
    pub fn new(
        config: &EngineConfig,
        aspects: &AspectList,
        def: ChainDef,
    ) -> Result<Self, RuleError> {
        for aspect in aspects.iter() {
            aspect.on_chain_before_init(config, &def)?;
        }

        let mut nodes = HashMap::new();
        let mut root_node_id = String::new();
        for node_def in &def.metadata.nodes {
            let node_ctx = init_rule_node_ctx(config, aspects, node_def)?;
            if node_def.kind == NodeKind::Start {
                root_node_id = node_def.id.clone();
            }
            nodes.insert(node_def.id.clone(), Arc::new(node_ctx));
        }

        // 出边保持声明顺序
        let mut node_routes: HashMap<String, Vec<Connection>> = HashMap::new();
        for conn in &def.metadata.connections {
            node_routes
                .entry(conn.from_id.clone())
                .or_default()
                .push(conn.clone());
        }

        Ok(Self {
            def,
            nodes,
            node_routes,
            root_node_id,
            aspects: aspects.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn terminal_on_err(&self) -> bool {
        self.def.terminal_on_err
    }

    pub fn def(&self) -> &ChainDef {
        &self.def
    }

    pub fn node(&self, id: &str) -> Option<&Arc<RuleNodeCtx>> {
        self.nodes.get(id)
    }

    pub fn node_routes(&self, id: &str) -> Option<&Vec<Connection>> {
        self.node_routes.get(id)
    }

    /// 按声明顺序取第一条标签匹配的出边，重复标签后者不可达
    fn next_node(&self, id: &str, relation: &str) -> Option<&Arc<RuleNodeCtx>> {
        self.node_routes
            .get(id)?
            .iter()
            .find(|conn| conn.relation == relation)
            .and_then(|conn| self.nodes.get(&conn.to_id))
    }

    /// 同步遍历：从开始节点出发，沿节点发出的标签逐边推进，
    /// 空标签即正常终止。校验器保证无环，步数上限兜底畸形图
    pub async fn on_msg(&self, msg: &mut Message) -> Result<(), RuleError> {
        let mut current = self.nodes.get(&self.root_node_id).ok_or_else(|| {
            RuleError::Validation(format!("规则链 {} 缺少开始节点", self.def.id))
        })?;
        let limit = self.nodes.len();
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps > limit {
                return Err(RuleError::TraversalLimit {
                    chain_id: self.def.id.clone(),
                    limit,
                });
            }

            // 用户脚本或切面的 panic 一律收敛为节点错误
            let step = AssertUnwindSafe(self.step(current, msg)).catch_unwind().await;
            let relation = match step {
                Ok(result) => result?,
                Err(_) => {
                    return Err(RuleError::NodeExecution {
                        node_id: current.id().to_string(),
                        node_dsl: current.dsl(),
                        reason: "节点执行发生 panic".to_string(),
                    })
                }
            };

            let Some(relation) = relation else {
                return Ok(());
            };
            current = self.next_node(current.id(), &relation).ok_or_else(|| {
                RuleError::BranchMissing {
                    node_id: current.id().to_string(),
                    node_dsl: current.dsl(),
                    relation: relation.clone(),
                }
            })?;
        }
    }

    /// 单个节点步骤：节点前切面 -> 节点 -> 节点后切面，
    /// 后置切面能看到节点发出的标签
    async fn step(
        &self,
        node: &Arc<RuleNodeCtx>,
        msg: &mut Message,
    ) -> Result<Option<String>, RuleError> {
        for aspect in self.aspects.iter() {
            if aspect.point_cut_node(node, msg, "") {
                aspect.before_node(node, msg, "").await?;
            }
        }

        let relation = node.on_msg(msg).await.map_err(|e| wrap_node_error(node, e))?;

        let label = relation.as_deref().unwrap_or_default();
        for aspect in self.aspects.iter() {
            if aspect.point_cut_node(node, msg, label) {
                aspect.after_node(node, msg, label).await?;
            }
        }
        Ok(relation)
    }

    pub fn destroy(&self) {
        for node in self.nodes.values() {
            node.destroy();
        }
    }
}

/// 运行期节点错误统一带上节点 id 与定义
fn wrap_node_error(node: &RuleNodeCtx, err: RuleError) -> RuleError {
    match err {
        wrapped @ (RuleError::NodeExecution { .. } | RuleError::BranchMissing { .. }) => wrapped,
        other => RuleError::NodeExecution {
            node_id: node.id().to_string(),
            node_dsl: node.dsl(),
            reason: other.to_string(),
        },
    }
}
