//! Deterministic placement of a dungeon DAG into layout space.
//!
//! Every placement carries a heading (direction of travel into the node).
//! The parent applies a child's relative turn exactly once, so a child's
//! heading is `parent_heading.turn(child.parentDirection)`. Rooms are
//! positioned so that their entrance door sits on the anchor cell handed
//! down by the parent; hallways start on it.
//!
//! Overlaps are never repaired: a footprint that shares a cell with an
//! earlier footprint fails the whole generation with [`LayoutError::Overlap`].

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::{debug, info, warn};

use super::dag::{DagDocument, DagGraph, DungeonNode, NodeKind, StairInfo};
use super::direction::{Direction, DoorSide, GridPos};
use super::error::LayoutError;
use super::fallback;
use crate::constants::MAX_NODE_EXTENT;
use crate::logging::TimingSpan;

/// What to do with a `parentDoorOffset` that runs past the parent's wall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorOffsetPolicy {
    /// Use the last cell of the wall
    #[default]
    Clamp,
    /// Fail with `InvalidNode`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub root_heading: Direction,
    pub door_offset_policy: DoorOffsetPolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            root_heading: Direction::North,
            door_offset_policy: DoorOffsetPolicy::Clamp,
        }
    }
}

/// Half-open cell rectangle `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    pub min: GridPos,
    pub max: GridPos,
}

impl CellRect {
    pub fn new(position: GridPos, width: u32, height: u32) -> Self {
        Self {
            min: position,
            max: GridPos::new(position.x + width as i32, position.y + height as i32),
        }
    }

    /// Smallest rectangle covering both cells
    pub fn spanning(a: GridPos, b: GridPos) -> Self {
        Self {
            min: GridPos::new(a.x.min(b.x), a.y.min(b.y)),
            max: GridPos::new(a.x.max(b.x) + 1, a.y.max(b.y) + 1),
        }
    }

    pub fn contains(&self, cell: GridPos) -> bool {
        cell.x >= self.min.x && cell.x < self.max.x && cell.y >= self.min.y && cell.y < self.max.y
    }

    /// Lowest shared cell, if any
    pub fn intersection(&self, other: &CellRect) -> Option<GridPos> {
        let min_x = self.min.x.max(other.min.x);
        let min_y = self.min.y.max(other.min.y);
        let max_x = self.max.x.min(other.max.x);
        let max_y = self.max.y.min(other.max.y);
        (min_x < max_x && min_y < max_y).then_some(GridPos::new(min_x, min_y))
    }

    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (self.min.y..self.max.y).flat_map(move |y| (self.min.x..self.max.x).map(move |x| GridPos::new(x, y)))
    }
}

/// Opening in a room wall leading to a placed child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doorway {
    pub side: DoorSide,
    pub position: GridPos,
    pub child: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedRoom {
    pub id: String,
    pub name: String,
    pub parent: Option<String>,
    /// Lower-left cell
    pub position: GridPos,
    pub width: u32,
    pub height: u32,
    pub door_side: DoorSide,
    pub door_position: GridPos,
    pub stairs: StairInfo,
    pub children: Vec<String>,
    pub exits: Vec<Doorway>,
}

impl PositionedRoom {
    pub fn rect(&self) -> CellRect {
        CellRect::new(self.position, self.width, self.height)
    }

    pub fn corners(&self) -> [GridPos; 4] {
        let CellRect { min, max } = self.rect();
        [
            min,
            GridPos::new(max.x, min.y),
            GridPos::new(min.x, max.y),
            max,
        ]
    }

    pub fn exit_to(&self, child: &str) -> Option<&Doorway> {
        self.exits.iter().find(|d| d.child == child)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedHallway {
    pub id: String,
    pub name: String,
    pub parent: Option<String>,
    pub start_position: GridPos,
    /// One cell past the last hallway cell
    pub end_position: GridPos,
    pub direction: Direction,
    pub length: u32,
    pub children: Vec<String>,
}

impl PositionedHallway {
    /// Unit step vector of the hallway direction
    pub fn step(&self) -> GridPos {
        self.direction.step()
    }

    pub fn last_cell(&self) -> GridPos {
        self.start_position.offset(self.direction, self.length as i32 - 1)
    }

    /// Cells sampled at unit steps from the start, `length` of them
    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.length as i32).map(move |i| self.start_position.offset(self.direction, i))
    }

    pub fn rect(&self) -> CellRect {
        CellRect::spanning(self.start_position, self.last_cell())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum NodeRef {
    Room(usize),
    Hallway(usize),
}

#[derive(Debug, Clone, Copy)]
pub enum PlacedNode<'a> {
    Room(&'a PositionedRoom),
    Hallway(&'a PositionedHallway),
}

/// Axis-aligned extent of all placed geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: GridPos,
    pub max: GridPos,
}

impl Bounds {
    fn around(p: GridPos) -> Self {
        Self { min: p, max: p }
    }

    fn include(&mut self, p: GridPos) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn width(&self) -> u32 {
        (self.max.x - self.min.x) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max.y - self.min.y) as u32
    }
}

/// A fully positioned floor. Built once per floor load, read-only afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorLayout {
    pub source_id: String,
    pub root: String,
    pub rooms: Vec<PositionedRoom>,
    pub hallways: Vec<PositionedHallway>,
    pub node_index: BTreeMap<String, NodeRef>,
    pub bounds: Bounds,
}

impl FloorLayout {
    pub fn node(&self, name: &str) -> Option<PlacedNode<'_>> {
        match self.node_index.get(name)? {
            NodeRef::Room(i) => self.rooms.get(*i).map(PlacedNode::Room),
            NodeRef::Hallway(i) => self.hallways.get(*i).map(PlacedNode::Hallway),
        }
    }

    pub fn room(&self, name: &str) -> Option<&PositionedRoom> {
        match self.node(name)? {
            PlacedNode::Room(r) => Some(r),
            PlacedNode::Hallway(_) => None,
        }
    }

    pub fn hallway(&self, name: &str) -> Option<&PositionedHallway> {
        match self.node(name)? {
            PlacedNode::Hallway(h) => Some(h),
            PlacedNode::Room(_) => None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    /// sha3-256 of the JSON encoding, first 8 bytes. Equal layouts hash equal.
    pub fn fingerprint(&self) -> u64 {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha3_256::digest(&bytes);
        let mut out = [0u8; 8];
        out.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(out)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Result of [`LayoutGenerator::generate_or_fallback`]. `degraded` holds the
/// error that forced the fallback layout, if one did.
#[derive(Debug, Clone)]
pub struct FloorOutcome {
    pub layout: FloorLayout,
    pub degraded: Option<LayoutError>,
}

impl FloorOutcome {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Pending work item: where a node goes and how it was reached
struct Placement<'a> {
    name: &'a str,
    anchor: GridPos,
    heading: Direction,
    parent: Option<&'a str>,
    /// Parent room index and the doorway this placement leaves through
    via: Option<(usize, Doorway)>,
}

#[derive(Default)]
struct LayoutBuilder {
    rooms: Vec<PositionedRoom>,
    hallways: Vec<PositionedHallway>,
    node_index: BTreeMap<String, NodeRef>,
    footprints: Vec<(String, CellRect)>,
}

impl LayoutBuilder {
    fn claim(&mut self, name: &str, rect: CellRect) -> Result<(), LayoutError> {
        if let Some((existing, cell)) = self
            .footprints
            .iter()
            .find_map(|(owner, other)| rect.intersection(other).map(|cell| (owner, cell)))
        {
            return Err(LayoutError::Overlap {
                node: name.to_string(),
                existing: existing.clone(),
                cell,
            });
        }
        self.footprints.push((name.to_string(), rect));
        Ok(())
    }

    fn link(&mut self, via: Option<(usize, Doorway)>) {
        if let Some((room, doorway)) = via {
            if let Some(parent) = self.rooms.get_mut(room) {
                parent.exits.push(doorway);
            }
        }
    }

    fn finish(self, source_id: String, root: String) -> FloorLayout {
        let first = self
            .rooms
            .first()
            .map(|r| r.position)
            .or_else(|| self.hallways.first().map(|h| h.start_position))
            .unwrap_or(GridPos::ORIGIN);
        let mut bounds = Bounds::around(first);
        for room in &self.rooms {
            for corner in room.corners() {
                bounds.include(corner);
            }
        }
        for hallway in &self.hallways {
            bounds.include(hallway.start_position);
            bounds.include(hallway.end_position);
        }

        FloorLayout {
            source_id,
            root,
            rooms: self.rooms,
            hallways: self.hallways,
            node_index: self.node_index,
            bounds,
        }
    }
}

/// Door cell: midpoint of the given wall
fn door_cell(position: GridPos, width: u32, height: u32, side: DoorSide) -> GridPos {
    let (w, h) = (width as i32, height as i32);
    match side {
        DoorSide::Top => GridPos::new(position.x + w / 2, position.y + h - 1),
        DoorSide::Bottom => GridPos::new(position.x + w / 2, position.y),
        DoorSide::Right => GridPos::new(position.x + w - 1, position.y + h / 2),
        DoorSide::Left => GridPos::new(position.x, position.y + h / 2),
    }
}

/// Lower-left corner of a room entered while travelling `heading`, such that
/// its entrance door lands on `anchor`.
fn room_origin(anchor: GridPos, heading: Direction, width: u32, height: u32) -> GridPos {
    let (w, h) = (width as i32, height as i32);
    match heading {
        Direction::North => GridPos::new(anchor.x - w / 2, anchor.y),
        Direction::South => GridPos::new(anchor.x - w / 2, anchor.y - (h - 1)),
        Direction::East => GridPos::new(anchor.x, anchor.y - h / 2),
        Direction::West => GridPos::new(anchor.x - (w - 1), anchor.y - h / 2),
    }
}

/// Wall cell `offset` cells along the wall facing `toward`
fn exit_cell(position: GridPos, width: u32, height: u32, toward: Direction, offset: u32) -> GridPos {
    let (w, h, off) = (width as i32, height as i32, offset as i32);
    match toward {
        Direction::North => GridPos::new(position.x + off, position.y + h - 1),
        Direction::South => GridPos::new(position.x + off, position.y),
        Direction::East => GridPos::new(position.x + w - 1, position.y + off),
        Direction::West => GridPos::new(position.x, position.y + off),
    }
}

fn check_extent(node: &DungeonNode, field: &str, value: u32) -> Result<(), LayoutError> {
    if value == 0 || value > MAX_NODE_EXTENT {
        return Err(LayoutError::InvalidNode {
            name: node.name.clone(),
            reason: format!("{field} {value} outside 1..={MAX_NODE_EXTENT}"),
        });
    }
    Ok(())
}

/// Turns a [`DagDocument`] into a [`FloorLayout`].
#[derive(Debug, Clone, Default)]
pub struct LayoutGenerator {
    config: LayoutConfig,
}

impl LayoutGenerator {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Place every node reachable from the root. Fails atomically.
    pub fn generate(&self, doc: &DagDocument) -> Result<FloorLayout, LayoutError> {
        let _span = TimingSpan::new("generate_layout");
        let dag = DagGraph::build(doc)?;
        let root = dag.root();

        let mut builder = LayoutBuilder::default();
        let mut visited: HashSet<&str> = HashSet::with_capacity(dag.len());
        let mut stack = vec![Placement {
            name: root.name.as_str(),
            anchor: GridPos::ORIGIN,
            heading: self.config.root_heading,
            parent: None,
            via: None,
        }];

        while let Some(placement) = stack.pop() {
            if !visited.insert(placement.name) {
                debug!(node = placement.name, "already placed, skipping revisit");
                continue;
            }
            let Some(node) = dag.node(placement.name) else {
                continue;
            };

            let children = match &node.kind {
                NodeKind::Room {
                    width,
                    height,
                    stairs,
                } => self.place_room(&dag, &mut builder, node, placement, *width, *height, stairs)?,
                NodeKind::Hallway { length } => {
                    self.place_hallway(&dag, &mut builder, node, placement, *length)?
                }
            };
            stack.extend(children.into_iter().rev());
        }

        let layout = builder.finish(doc.root_hint.clone(), root.name.clone());
        info!(
            floor = %layout.source_id,
            rooms = layout.rooms.len(),
            hallways = layout.hallways.len(),
            width = layout.bounds.width(),
            height = layout.bounds.height(),
            "floor layout generated"
        );
        Ok(layout)
    }

    /// Like [`generate`](Self::generate), but a failed document yields the
    /// seeded fallback layout instead. The failure is kept in the outcome.
    pub fn generate_or_fallback(&self, doc: &DagDocument, seed: u64) -> FloorOutcome {
        match self.generate(doc) {
            Ok(layout) => FloorOutcome {
                layout,
                degraded: None,
            },
            Err(err) => {
                warn!(
                    floor = %doc.root_hint,
                    error = %err,
                    seed,
                    "layout generation failed, substituting fallback layout"
                );
                FloorOutcome {
                    layout: fallback::fallback_layout(self, &doc.root_hint, seed),
                    degraded: Some(err),
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn place_room<'a>(
        &self,
        dag: &DagGraph<'a>,
        builder: &mut LayoutBuilder,
        node: &'a DungeonNode,
        placement: Placement<'a>,
        width: u32,
        height: u32,
        stairs: &StairInfo,
    ) -> Result<Vec<Placement<'a>>, LayoutError> {
        check_extent(node, "width", width)?;
        check_extent(node, "height", height)?;

        let heading = placement.heading;
        // The root has no parent to face, so its door opens onto its heading
        let (position, door_side) = match placement.parent {
            None => (placement.anchor, heading.door_side()),
            Some(_) => (
                room_origin(placement.anchor, heading, width, height),
                heading.opposite().door_side(),
            ),
        };
        builder.claim(&node.name, CellRect::new(position, width, height))?;

        let mut next = Vec::with_capacity(node.children.len());
        let room_index = builder.rooms.len();
        for child_name in &node.children {
            let Some(child) = dag.node(child_name) else {
                continue;
            };
            let toward = heading.turn(child.attachment.direction);
            let offset = self.door_offset(node, child, toward, width, height)?;
            let exit = exit_cell(position, width, height, toward, offset);
            next.push(Placement {
                name: child.name.as_str(),
                anchor: exit + toward.step(),
                heading: toward,
                parent: Some(node.name.as_str()),
                via: Some((
                    room_index,
                    Doorway {
                        side: toward.door_side(),
                        position: exit,
                        child: child.name.clone(),
                    },
                )),
            });
        }

        builder.rooms.push(PositionedRoom {
            id: node.id.clone(),
            name: node.name.clone(),
            parent: placement.parent.map(str::to_string),
            position,
            width,
            height,
            door_side,
            door_position: door_cell(position, width, height, door_side),
            stairs: stairs.clone(),
            children: node.children.clone(),
            exits: Vec::new(),
        });
        builder
            .node_index
            .insert(node.name.clone(), NodeRef::Room(room_index));
        builder.link(placement.via);
        Ok(next)
    }

    fn place_hallway<'a>(
        &self,
        dag: &DagGraph<'a>,
        builder: &mut LayoutBuilder,
        node: &'a DungeonNode,
        placement: Placement<'a>,
        length: u32,
    ) -> Result<Vec<Placement<'a>>, LayoutError> {
        check_extent(node, "length", length)?;

        let hallway = PositionedHallway {
            id: node.id.clone(),
            name: node.name.clone(),
            parent: placement.parent.map(str::to_string),
            start_position: placement.anchor,
            end_position: placement.anchor.offset(placement.heading, length as i32),
            direction: placement.heading,
            length,
            children: node.children.clone(),
        };
        builder.claim(&node.name, hallway.rect())?;

        // A straight continuation starts exactly at the end position; a turn
        // starts beside the last cell so the corner stays connected.
        let last = hallway.last_cell();
        let next = node
            .children
            .iter()
            .filter_map(|child_name| dag.node(child_name))
            .map(|child| {
                let toward = hallway.direction.turn(child.attachment.direction);
                Placement {
                    name: child.name.as_str(),
                    anchor: last + toward.step(),
                    heading: toward,
                    parent: Some(node.name.as_str()),
                    via: None,
                }
            })
            .collect();

        builder
            .node_index
            .insert(node.name.clone(), NodeRef::Hallway(builder.hallways.len()));
        builder.hallways.push(hallway);
        builder.link(placement.via);
        Ok(next)
    }

    fn door_offset(
        &self,
        parent: &DungeonNode,
        child: &DungeonNode,
        toward: Direction,
        width: u32,
        height: u32,
    ) -> Result<u32, LayoutError> {
        let wall = if toward.is_vertical() { width } else { height };
        let offset = child.attachment.door_offset;
        if offset < wall {
            return Ok(offset);
        }
        match self.config.door_offset_policy {
            DoorOffsetPolicy::Clamp => {
                debug!(
                    node = %child.name,
                    parent = %parent.name,
                    offset,
                    wall,
                    "door offset clamped to wall"
                );
                Ok(wall - 1)
            }
            DoorOffsetPolicy::Reject => Err(LayoutError::InvalidNode {
                name: child.name.clone(),
                reason: format!(
                    "parentDoorOffset {offset} exceeds the {wall}-cell wall of '{}'",
                    parent.name
                ),
            }),
        }
    }
}
