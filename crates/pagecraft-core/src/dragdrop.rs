//! Drag sessions, container hit-testing and the drop preview.
//!
//! A drag moves either existing nodes or a node that is about to be created.
//! While an existing node is dragged, the container under the centre of its
//! rectangle becomes the hover candidate; it only turns into the active drop
//! target after the pointer has stayed over it for the activation delay.

use crate::coords::CoordinateTransform;
use crate::node::{ComponentNode, LayoutMode, Padding, Sizing};
use crate::snap::{SnapLine, SnapOptions, SnapResult, SnapTarget, snap_rect};
use crate::tree::{ComponentTree, ParentRef};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// How long a container must stay under the dragged rectangle before it
/// accepts the drop.
pub const HOVER_ACTIVATE_MS: u64 = 400;

/// A container that can receive a drop, with its resolved geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHit {
    pub id: String,
    pub rect: Rect,
    /// Ancestor z-indices followed by the container's own.
    pub stack: Vec<i64>,
    /// Document order, used to break stacking ties.
    pub order: usize,
    pub layout: LayoutMode,
    pub padding: Padding,
}

impl ContainerHit {
    /// The padded content box. Width and height never go negative.
    pub fn content_box(&self) -> Rect {
        let x = self.rect.x0 + self.padding.left;
        let y = self.rect.y0 + self.padding.top;
        let width = (self.rect.width() - self.padding.left - self.padding.right).max(0.0);
        let height = (self.rect.height() - self.padding.top - self.padding.bottom).max(0.0);
        Rect::new(x, y, x + width, y + height)
    }

    /// Position of `ghost` relative to the content box.
    pub fn local_position(&self, ghost: Rect) -> Point {
        let content = self.content_box();
        Point::new(ghost.x0 - content.x0, ghost.y0 - content.y0)
    }
}

/// Every container of `tree`, leaving out the subtrees of `exclude`.
pub fn container_hits(tree: &ComponentTree, exclude: &[String]) -> Vec<ContainerHit> {
    let mut skipped: HashSet<String> = HashSet::new();
    for id in exclude {
        if let Some(node) = tree.find_node(id) {
            skipped.extend(node.subtree_ids());
        }
    }
    tree.placed_nodes()
        .into_iter()
        .filter(|placed| placed.node.is_container() && !skipped.contains(&placed.node.id))
        .map(|placed| ContainerHit {
            id: placed.node.id.clone(),
            rect: placed.rect,
            stack: placed.stack,
            order: placed.order,
            layout: placed.node.layout_mode(),
            padding: placed.node.padding(),
        })
        .collect()
}

fn contains_inclusive(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// The topmost container whose rectangle contains `point`.
///
/// Stacks are compared lexicographically, so a nested container beats its
/// parent. On a tie `prefer` (the current hover) is kept, otherwise the one
/// declared last wins.
pub fn find_container_hit<'a>(hits: &'a [ContainerHit], point: Point, prefer: Option<&str>) -> Option<&'a ContainerHit> {
    let mut best: Option<&ContainerHit> = None;
    for hit in hits.iter().filter(|h| contains_inclusive(h.rect, point)) {
        best = Some(match best {
            None => hit,
            Some(current) => match hit.stack.cmp(&current.stack) {
                Ordering::Greater => hit,
                Ordering::Less => current,
                Ordering::Equal => {
                    if prefer == Some(current.id.as_str()) {
                        current
                    } else if prefer == Some(hit.id.as_str()) || hit.order > current.order {
                        hit
                    } else {
                        current
                    }
                }
            },
        });
    }
    best
}

/// Where the dragged rectangle would land inside `hit`.
///
/// Flow containers place it at the content origin, shrunk to the content box
/// when that is non-empty. Manual containers keep its size and clamp its
/// top-left into the content box.
pub fn ghost_rect(drag: Rect, hit: &ContainerHit) -> Rect {
    let content = hit.content_box();
    match hit.layout {
        LayoutMode::Flow => {
            let width = if content.width() > 0.0 { content.width() } else { drag.width() };
            let height = if content.height() > 0.0 { content.height() } else { drag.height() };
            Rect::from_origin_size(
                content.origin(),
                Size::new(drag.width().min(width), drag.height().min(height)),
            )
        }
        LayoutMode::Manual => {
            let max_x = content.x0 + (content.width() - drag.width()).max(0.0);
            let max_y = content.y0 + (content.height() - drag.height()).max(0.0);
            let x = drag.x0.max(content.x0).min(max_x);
            let y = drag.y0.max(content.y0).min(max_y);
            Rect::from_origin_size(Point::new(x, y), drag.size())
        }
    }
}

/// What the renderer shows while a drop target is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropPreview {
    pub container_id: String,
    pub container_rect: Rect,
    pub ghost: Rect,
    pub layout: LayoutMode,
}

/// A pending hover activation. Cancelled by replacing or dropping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverTimer {
    pub target: String,
    pub deadline_ms: u64,
}

/// Hover candidate, active target and the activation timer.
#[derive(Debug, Clone)]
pub struct DropTracker {
    delay_ms: u64,
    hover: Option<ContainerHit>,
    active: Option<String>,
    timer: Option<HoverTimer>,
}

impl Default for DropTracker {
    fn default() -> Self {
        Self::new(HOVER_ACTIVATE_MS)
    }
}

impl DropTracker {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            hover: None,
            active: None,
            timer: None,
        }
    }

    pub fn hover_id(&self) -> Option<&str> {
        self.hover.as_ref().map(|h| h.id.as_str())
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn pending(&self) -> Option<&HoverTimer> {
        self.timer.as_ref()
    }

    /// Record the container under the dragged rectangle. A new candidate
    /// clears the active target and restarts the timer.
    pub fn hover(&mut self, hit: Option<&ContainerHit>, now_ms: u64) {
        let Some(hit) = hit else {
            self.reset();
            return;
        };
        if self.hover_id() != Some(hit.id.as_str()) {
            log::debug!("Hovering container {}", hit.id);
            self.active = None;
            self.timer = Some(HoverTimer {
                target: hit.id.clone(),
                deadline_ms: now_ms.saturating_add(self.delay_ms),
            });
        }
        self.hover = Some(hit.clone());
    }

    /// Fire the timer if it is due. Returns true when a target was activated.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match &self.timer {
            Some(timer) if now_ms >= timer.deadline_ms => {}
            _ => return false,
        }
        let Some(timer) = self.timer.take() else {
            return false;
        };
        if self.hover_id() != Some(timer.target.as_str()) {
            return false;
        }
        log::debug!("Container {} accepts the drop", timer.target);
        self.active = Some(timer.target);
        true
    }

    pub fn reset(&mut self) {
        self.hover = None;
        self.active = None;
        self.timer = None;
    }

    /// The active target with the ghost for `drag`, when the hover and the
    /// active target agree.
    pub fn target(&self, drag: Rect) -> Option<(&ContainerHit, Rect)> {
        let hover = self.hover.as_ref()?;
        if self.active.as_deref() != Some(hover.id.as_str()) {
            return None;
        }
        Some((hover, ghost_rect(drag, hover)))
    }

    pub fn preview(&self, drag: Rect) -> Option<DropPreview> {
        self.target(drag).map(|(hit, ghost)| DropPreview {
            container_id: hit.id.clone(),
            container_rect: hit.rect,
            ghost,
            layout: hit.layout,
        })
    }
}

/// One node taking part in a drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragMember {
    pub id: String,
    /// Stored `x,y` at the start of the drag.
    pub start: Point,
    pub lock_x: bool,
    pub lock_y: bool,
}

impl DragMember {
    fn from_node(node: &ComponentNode) -> Self {
        Self {
            id: node.id.clone(),
            start: node.position(),
            lock_x: node.width_sizing() == Sizing::Fill,
            lock_y: node.height_sizing() == Sizing::Fill,
        }
    }

    fn moved_by(&self, delta: Vec2) -> Point {
        Point::new(
            if self.lock_x { self.start.x } else { self.start.x + delta.x },
            if self.lock_y { self.start.y } else { self.start.y + delta.y },
        )
    }
}

/// What is being dragged.
#[derive(Debug, Clone, PartialEq)]
pub enum DragSource {
    /// Nodes already in the tree. More than one member is a group drag.
    Existing { members: Vec<DragMember> },
    /// A node that is inserted when the drag ends.
    New { node: ComponentNode },
}

/// How a drag ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Existing nodes stay where the drag left them.
    Released { members: Vec<DragMember>, moved: bool },
    /// An existing node goes into a container at `local`.
    Reparent {
        member: DragMember,
        container_id: String,
        local: Point,
    },
    /// A new node is inserted.
    Insert {
        node: ComponentNode,
        parent: ParentRef,
        position: Point,
        z_index: i64,
    },
    /// Nothing changes. Members go back to their starting positions.
    Abandoned { members: Vec<DragMember> },
}

/// An active drag gesture.
#[derive(Debug, Clone)]
pub struct DragSession {
    pub source: DragSource,
    pub pointer_id: Option<u32>,
    start_device: Point,
    /// Offset from the dragged node's local coordinates to content space.
    local_origin: Vec2,
    /// Current content-space rectangle of the dragged node.
    rect: Rect,
    snap_targets: Vec<SnapTarget>,
    hits: Vec<ContainerHit>,
    tracker: DropTracker,
    snap: Option<SnapResult>,
    moved: bool,
}

impl DragSession {
    /// Start dragging `id`. When `id` is part of a multi-selection every
    /// selected node moves with it and container drops are disabled.
    /// `can_enter` says whether the node may be dropped into a container.
    pub fn existing(
        tree: &ComponentTree,
        id: &str,
        selected: &[String],
        start_device: Point,
        pointer_id: Option<u32>,
        hover_delay_ms: u64,
        can_enter: bool,
    ) -> Option<Self> {
        let node = tree.find_node(id)?;
        let rect = tree.resolve_rect(&node.id)?;
        let group = selected.len() > 1 && selected.iter().any(|s| *s == node.id);

        let members: Vec<DragMember> = if group {
            selected
                .iter()
                .filter_map(|s| tree.find_node(s))
                .map(|n| DragMember::from_node(n))
                .collect()
        } else {
            vec![DragMember::from_node(node)]
        };

        let placed: HashMap<String, Rect> = tree
            .placed_nodes()
            .into_iter()
            .map(|p| (p.node.id.clone(), p.rect))
            .collect();
        let snap_targets = tree
            .siblings(&node.id)
            .unwrap_or_default()
            .iter()
            .filter(|s| s.id != node.id)
            .filter_map(|s| placed.get(&s.id).map(|r| SnapTarget::new(s.id.clone(), *r)))
            .collect();

        let hits = if group || !can_enter {
            Vec::new()
        } else {
            container_hits(tree, std::slice::from_ref(&node.id))
        };

        log::debug!("Drag start {} ({} member(s))", node.id, members.len());
        Some(Self {
            source: DragSource::Existing { members },
            pointer_id,
            start_device,
            local_origin: rect.origin() - node.position(),
            rect,
            snap_targets,
            hits,
            tracker: DropTracker::new(hover_delay_ms),
            snap: None,
            moved: false,
        })
    }

    /// Start placing `node` at content point `at`.
    pub fn new_node(
        tree: &ComponentTree,
        node: ComponentNode,
        at: Point,
        start_device: Point,
        pointer_id: Option<u32>,
        hover_delay_ms: u64,
    ) -> Self {
        let rect = Rect::from_origin_size(at, node.effective_size());
        log::debug!("Drag start new {} node", node.kind);
        Self {
            source: DragSource::New { node },
            pointer_id,
            start_device,
            local_origin: Vec2::ZERO,
            rect,
            snap_targets: Vec::new(),
            hits: container_hits(tree, &[]),
            tracker: DropTracker::new(hover_delay_ms),
            snap: None,
            moved: false,
        }
    }

    pub fn accepts(&self, pointer_id: Option<u32>) -> bool {
        self.pointer_id.is_none() || pointer_id.is_none() || self.pointer_id == pointer_id
    }

    pub fn is_group(&self) -> bool {
        matches!(&self.source, DragSource::Existing { members } if members.len() > 1)
    }

    /// Current content-space rectangle of the dragged node.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn hover_id(&self) -> Option<&str> {
        self.tracker.hover_id()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.tracker.active_id()
    }

    pub fn preview(&self) -> Option<DropPreview> {
        self.tracker.preview(self.rect)
    }

    pub fn snap_lines(&self) -> &[SnapLine] {
        self.snap.as_ref().map(|s| s.lines.as_slice()).unwrap_or_default()
    }

    /// Let the hover timer fire without a pointer event.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        self.tracker.poll(now_ms)
    }

    /// Follow the pointer to `device`. Returns the new stored positions of
    /// the dragged nodes; empty for new-node drags.
    pub fn update(
        &mut self,
        device: Point,
        now_ms: u64,
        transform: &CoordinateTransform,
        canvas: Size,
        snap: &SnapOptions,
    ) -> Vec<(String, Point)> {
        let positions = match &self.source {
            DragSource::New { .. } => {
                self.rect = Rect::from_origin_size(transform.device_to_content(device), self.rect.size());
                self.moved = true;
                Vec::new()
            }
            DragSource::Existing { members } => {
                let delta = transform.delta_to_content(device - self.start_device);
                if delta != Vec2::ZERO {
                    self.moved = true;
                }
                if members.len() > 1 {
                    return members.iter().map(|m| (m.id.clone(), m.moved_by(delta))).collect();
                }
                let Some(member) = members.first() else {
                    return Vec::new();
                };
                let local = member.moved_by(delta);
                let raw = Rect::from_origin_size(local + self.local_origin, self.rect.size());
                let result = snap_rect(raw, &self.snap_targets, canvas, snap);
                let snapped = Point::new(
                    if member.lock_x { raw.x0 } else { result.position.x },
                    if member.lock_y { raw.y0 } else { result.position.y },
                );
                self.rect = Rect::from_origin_size(snapped, raw.size());
                self.snap = Some(result);
                vec![(member.id.clone(), snapped - self.local_origin)]
            }
        };

        self.tracker.poll(now_ms);
        let hit = find_container_hit(&self.hits, self.rect.center(), self.tracker.hover_id()).cloned();
        self.tracker.hover(hit.as_ref(), now_ms);
        self.tracker.poll(now_ms);
        positions
    }

    /// End the gesture. `cancelled` abandons it.
    pub fn finish(mut self, tree: &ComponentTree, now_ms: u64, cancelled: bool) -> DropOutcome {
        if cancelled {
            log::debug!("Drag cancelled");
            return match self.source {
                DragSource::Existing { members } => DropOutcome::Abandoned { members },
                DragSource::New { .. } => DropOutcome::Abandoned { members: Vec::new() },
            };
        }
        self.tracker.poll(now_ms);
        match self.source {
            DragSource::Existing { members } => {
                let target = match members.as_slice() {
                    [member] => self
                        .tracker
                        .target(self.rect)
                        .map(|(hit, ghost)| (member.clone(), hit.id.clone(), hit.local_position(ghost))),
                    _ => None,
                };
                match target {
                    Some((member, container_id, local)) => DropOutcome::Reparent {
                        member,
                        container_id,
                        local,
                    },
                    None => DropOutcome::Released {
                        members,
                        moved: self.moved,
                    },
                }
            }
            DragSource::New { node } => {
                match find_container_hit(&self.hits, self.rect.center(), self.tracker.hover_id()) {
                    Some(hit) => {
                        let position = match hit.layout {
                            LayoutMode::Manual => hit.local_position(ghost_rect(self.rect, hit)),
                            LayoutMode::Flow => Point::ZERO,
                        };
                        DropOutcome::Insert {
                            node,
                            parent: ParentRef::Node(hit.id.clone()),
                            position,
                            z_index: 1,
                        }
                    }
                    None => DropOutcome::Insert {
                        node,
                        parent: ParentRef::TopLevel,
                        position: self.rect.origin(),
                        z_index: tree.next_top_level_z(),
                    },
                }
            }
        }
    }
}
