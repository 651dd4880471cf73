//! DAG documents as supplied by the floor service.
//!
//! Nodes carry only relative data (sizes, turns, door offsets). Decoding
//! validates each node on its own; [`DagGraph`] validates the document as a
//! whole (unique names, no dangling children, exactly one root).

use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction as EdgeDirection;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::direction::{GridPos, RelativeDirection};
use super::error::LayoutError;

/// One floor's worth of dungeon nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagDocument {
    /// Logical floor identifier
    #[serde(default)]
    pub root_hint: String,
    pub nodes: Vec<DungeonNode>,
}

impl DagDocument {
    pub fn new(root_hint: impl Into<String>, nodes: Vec<DungeonNode>) -> Self {
        Self {
            root_hint: root_hint.into(),
            nodes,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Stair markers, carried through placement untouched
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StairInfo {
    #[serde(default)]
    pub has_up_stairs: bool,
    #[serde(default)]
    pub has_down_stairs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_stairs_location: Option<GridPos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_stairs_location: Option<GridPos>,
}

impl StairInfo {
    pub fn is_empty(&self) -> bool {
        *self == StairInfo::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Room {
        width: u32,
        height: u32,
        stairs: StairInfo,
    },
    Hallway {
        length: u32,
    },
}

/// How a node hangs off its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attachment {
    pub direction: RelativeDirection,
    pub door_offset: u32,
}

/// A room or hallway with no world position yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDungeonNode", into = "RawDungeonNode")]
pub struct DungeonNode {
    pub id: String,
    pub name: String,
    pub children: Vec<String>,
    pub kind: NodeKind,
    pub attachment: Attachment,
}

impl DungeonNode {
    pub fn room(name: impl Into<String>, width: u32, height: u32) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            children: Vec::new(),
            kind: NodeKind::Room {
                width,
                height,
                stairs: StairInfo::default(),
            },
            attachment: Attachment::default(),
        }
    }

    pub fn hallway(name: impl Into<String>, length: u32) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            children: Vec::new(),
            kind: NodeKind::Hallway { length },
            attachment: Attachment::default(),
        }
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn attached(mut self, direction: RelativeDirection, door_offset: u32) -> Self {
        self.attachment = Attachment {
            direction,
            door_offset,
        };
        self
    }

    pub fn with_stairs(mut self, info: StairInfo) -> Self {
        if let NodeKind::Room { stairs, .. } = &mut self.kind {
            *stairs = info;
        }
        self
    }

    pub fn is_room(&self) -> bool {
        matches!(self.kind, NodeKind::Room { .. })
    }
}

/// Wire form of [`DungeonNode`]: flat, camelCase, kind chosen by `isRoom`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDungeonNode {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub is_room: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_direction: Option<RelativeDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_door_offset: Option<i64>,
    #[serde(flatten)]
    pub stairs: StairInfo,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Text(String),
        Number(i64),
    }
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(s) => s,
        IdRepr::Number(n) => n.to_string(),
    })
}

fn positive(name: &str, field: &str, value: Option<i64>) -> Result<u32, LayoutError> {
    match value {
        Some(v) if v > 0 && v <= i64::from(u32::MAX) => Ok(v as u32),
        Some(v) => Err(LayoutError::InvalidNode {
            name: name.to_string(),
            reason: format!("{field} must be a positive integer, got {v}"),
        }),
        None => Err(LayoutError::InvalidNode {
            name: name.to_string(),
            reason: format!("missing {field}"),
        }),
    }
}

impl TryFrom<RawDungeonNode> for DungeonNode {
    type Error = LayoutError;

    fn try_from(raw: RawDungeonNode) -> Result<Self, Self::Error> {
        if raw.name.is_empty() {
            return Err(LayoutError::InvalidNode {
                name: raw.id,
                reason: "empty name".into(),
            });
        }

        let kind = if raw.is_room {
            NodeKind::Room {
                width: positive(&raw.name, "width", raw.width)?,
                height: positive(&raw.name, "height", raw.height)?,
                stairs: raw.stairs,
            }
        } else {
            NodeKind::Hallway {
                length: positive(&raw.name, "length", raw.length)?,
            }
        };

        let door_offset = match raw.parent_door_offset {
            None => 0,
            Some(v) if (0..=i64::from(u32::MAX)).contains(&v) => v as u32,
            Some(v) => {
                return Err(LayoutError::InvalidNode {
                    name: raw.name,
                    reason: format!("parentDoorOffset must be >= 0, got {v}"),
                })
            }
        };

        Ok(Self {
            id: raw.id,
            name: raw.name,
            children: raw.children,
            kind,
            attachment: Attachment {
                direction: raw.parent_direction.unwrap_or_default(),
                door_offset,
            },
        })
    }
}

impl From<DungeonNode> for RawDungeonNode {
    fn from(node: DungeonNode) -> Self {
        let (is_room, width, height, length, stairs) = match node.kind {
            NodeKind::Room {
                width,
                height,
                stairs,
            } => (true, Some(width.into()), Some(height.into()), None, stairs),
            NodeKind::Hallway { length } => {
                (false, None, None, Some(length.into()), StairInfo::default())
            }
        };
        Self {
            id: node.id,
            name: node.name,
            children: node.children,
            is_room,
            width,
            height,
            length,
            parent_direction: Some(node.attachment.direction),
            parent_door_offset: Some(node.attachment.door_offset.into()),
            stairs,
        }
    }
}

/// Validated view of a [`DagDocument`]: names resolved, root found.
pub struct DagGraph<'a> {
    graph: DiGraph<&'a DungeonNode, ()>,
    by_name: HashMap<&'a str, NodeIndex>,
    root: NodeIndex,
}

impl<'a> DagGraph<'a> {
    /// Checks, in order: duplicate names, dangling children, root uniqueness.
    pub fn build(doc: &'a DagDocument) -> Result<Self, LayoutError> {
        let mut graph = DiGraph::with_capacity(doc.nodes.len(), doc.nodes.len());
        let mut by_name = HashMap::with_capacity(doc.nodes.len());

        for node in &doc.nodes {
            let idx = graph.add_node(node);
            if by_name.insert(node.name.as_str(), idx).is_some() {
                return Err(LayoutError::DuplicateName(node.name.clone()));
            }
        }

        for (i, node) in doc.nodes.iter().enumerate() {
            let parent = NodeIndex::new(i);
            for child in &node.children {
                let Some(&child_idx) = by_name.get(child.as_str()) else {
                    return Err(LayoutError::DanglingReference {
                        parent: node.name.clone(),
                        child: child.clone(),
                    });
                };
                graph.add_edge(parent, child_idx, ());
            }
        }

        let candidates: Vec<NodeIndex> = graph.externals(EdgeDirection::Incoming).collect();
        let &[root] = candidates.as_slice() else {
            return Err(LayoutError::MissingRoot {
                candidates: candidates
                    .iter()
                    .map(|&i| graph[i].name.clone())
                    .collect(),
            });
        };

        let dag = Self {
            graph,
            by_name,
            root,
        };
        dag.report_structure(&doc.root_hint);
        Ok(dag)
    }

    /// Shapes the traversal tolerates but that usually mean a bad document
    fn report_structure(&self, floor: &str) {
        if is_cyclic_directed(&self.graph) {
            warn!(floor, "dungeon DAG contains a cycle; revisits will be skipped");
        }

        let shared: Vec<&str> = self
            .graph
            .node_indices()
            .filter(|&i| {
                self.graph
                    .neighbors_directed(i, EdgeDirection::Incoming)
                    .count()
                    > 1
            })
            .map(|i| self.graph[i].name.as_str())
            .collect();
        if !shared.is_empty() {
            warn!(floor, ?shared, "nodes with several parents are placed once, under the first parent visited");
        }

        let unreachable = self.unreachable();
        if !unreachable.is_empty() {
            warn!(floor, ?unreachable, "nodes not reachable from the root will not be placed");
        }
    }

    pub fn root(&self) -> &'a DungeonNode {
        self.graph[self.root]
    }

    pub fn node(&self, name: &str) -> Option<&'a DungeonNode> {
        self.by_name.get(name).map(|&i| self.graph[i])
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Names of nodes the root cannot reach, in document order
    pub fn unreachable(&self) -> Vec<&'a str> {
        let mut seen = vec![false; self.graph.node_count()];
        let mut dfs = Dfs::new(&self.graph, self.root);
        while let Some(i) = dfs.next(&self.graph) {
            seen[i.index()] = true;
        }
        self.graph
            .node_indices()
            .filter(|i| !seen[i.index()])
            .map(|i| self.graph[i].name.as_str())
            .collect()
    }
}
