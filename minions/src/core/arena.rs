//! Arena holding the task tree.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Each node
//! knows its boss; a boss owns an ordered plan of minion ids. Minions dropped
//! by a replan move to the boss's `retired` list so the tree stays a complete
//! record of the run.

use serde::Serialize;

use crate::core::knowledge::KnowledgeBank;
use crate::core::palette::ActionKind;
use crate::core::status::{Status, StatusReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskNode {
    pub id: NodeId,
    pub kind: ActionKind,
    pub args: [Option<String>; 3],
    pub boss: Option<NodeId>,
    pub plan: Vec<NodeId>,
    pub retired: Vec<NodeId>,
    pub knowledge: KnowledgeBank,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskNode {
    /// Argument by zero-based position.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index)?.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskArena {
    nodes: Vec<TaskNode>,
}

impl TaskArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &TaskNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TaskNode {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, kind: ActionKind, args: [Option<String>; 3], boss: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TaskNode {
            id,
            kind,
            args,
            boss,
            plan: Vec::new(),
            retired: Vec::new(),
            knowledge: KnowledgeBank::new(),
            status: Status::NotStarted,
            message: None,
        });
        id
    }

    pub fn add_root(&mut self, kind: ActionKind, args: [Option<String>; 3]) -> NodeId {
        self.push(kind, args, None)
    }

    /// Create a minion of `boss`. It joins the boss's plan only through
    /// [`TaskArena::splice_plan`].
    pub fn add_minion(&mut self, boss: NodeId, kind: ActionKind, args: [Option<String>; 3]) -> NodeId {
        self.push(kind, args, Some(boss))
    }

    pub fn plan(&self, boss: NodeId) -> &[NodeId] {
        &self.node(boss).plan
    }

    /// Replace the unexecuted tail of `boss`'s plan (from `cursor` on) with
    /// `minions`. The replaced entries are retired and returned.
    pub fn splice_plan(&mut self, boss: NodeId, cursor: usize, minions: Vec<NodeId>) -> Vec<NodeId> {
        let node = self.node_mut(boss);
        let cursor = cursor.min(node.plan.len());
        let dropped: Vec<NodeId> = node.plan.drain(cursor..).collect();
        node.plan.extend(minions);
        node.retired.extend(dropped.iter().copied());
        dropped
    }

    /// Bosses of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).boss, |current| self.node(*current).boss)
    }

    /// Minions in `boss`'s plan that have already run.
    pub fn executed_minions(&self, boss: NodeId) -> impl Iterator<Item = &TaskNode> + '_ {
        self.plan(boss)
            .iter()
            .map(|id| self.node(*id))
            .filter(|node| node.status.is_terminal())
    }

    /// The node's own knowledge layered over its boss's.
    pub fn knowledge_with_boss(&self, id: NodeId) -> KnowledgeBank {
        let node = self.node(id);
        match node.boss {
            Some(boss) => node.knowledge.with_fallback(&self.node(boss).knowledge),
            None => node.knowledge.clone(),
        }
    }

    pub fn store_knowledge(&mut self, id: NodeId, question: impl Into<String>, answer: impl Into<String>) {
        self.node_mut(id).knowledge.insert(question, answer);
    }

    pub fn merge_knowledge(&mut self, id: NodeId, incoming: &KnowledgeBank) {
        self.node_mut(id).knowledge.merge(incoming);
    }

    pub fn set_report(&mut self, id: NodeId, report: &StatusReport) {
        let node = self.node_mut(id);
        node.status = report.status;
        node.message = report.message.clone();
    }
}
