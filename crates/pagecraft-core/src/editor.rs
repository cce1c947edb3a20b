//! The editing facade.
//!
//! [`Editor`] owns a page and everything needed to edit it: camera,
//! selection, history and the active pointer gesture. Every tree mutation is
//! recorded as a history [`Command`] before it lands, and the selection is
//! re-resolved against the new tree afterwards.

use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::coords::Space;
use crate::custom::{ComponentDefinition, instantiate, sync_instance, template_from_selection, wrap_in_container};
use crate::dragdrop::{DragMember, DragSession, DropOutcome, DropPreview};
use crate::error::{EditError, EditResult};
use crate::history::{Command, History, Placement};
use crate::input::{PointerEvent, PointerHub, PointerKind};
use crate::loop_instance;
use crate::node::{ComponentNode, LayoutMode, Props, prop};
use crate::page::Page;
use crate::registry::{ComponentRegistry, create_node, new_node_id};
use crate::resize::{
    HANDLE_HIT_TOLERANCE, Handle, HandleKind, ResizeSession, ResizeUpdate, active_handles, handles_for,
    hit_test_handles,
};
use crate::selection::{SelectScope, Selection, resolve_target};
use crate::snap::SnapLine;
use crate::tree::{ComponentTree, ParentRef, PropPatch, capture_patch, content_origin, patch_from_props};
use crate::zorder::{self, ZOrderOp};
use kurbo::{Point, Rect};
use serde_json::json;
use std::sync::Arc;

/// Props written by a resize gesture.
const GEOMETRY_KEYS: [&str; 4] = [prop::X, prop::Y, prop::WIDTH, prop::HEIGHT];

/// What the editor is editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditorMode {
    #[default]
    Page,
    /// The template of a reusable component. Its top-level container cannot
    /// be deleted and every inner node is selectable on its own.
    DefinitionEdit { definition_id: String },
}

/// The pointer gesture in progress.
#[derive(Debug)]
enum Interaction {
    Idle,
    Drag(DragSession),
    Resize { session: ResizeSession, before: PropPatch },
    Pan,
}

pub struct Editor {
    page: Page,
    camera: Camera,
    selection: Selection,
    history: History,
    mode: EditorMode,
    config: EditorConfig,
    registry: Box<dyn ComponentRegistry>,
    pointer: PointerHub,
    interaction: Interaction,
}

impl Editor {
    pub fn new(page: Page, registry: impl ComponentRegistry + 'static) -> Self {
        Self::with_config(page, registry, EditorConfig::default())
    }

    pub fn with_config(page: Page, registry: impl ComponentRegistry + 'static, config: EditorConfig) -> Self {
        let camera = Camera::with_limits(config.min_scale, config.max_scale, config.scale_step);
        Self {
            page,
            camera,
            selection: Selection::new(),
            history: History::new(config.history_limit),
            mode: EditorMode::Page,
            config,
            registry: Box::new(registry),
            pointer: PointerHub::new(),
            interaction: Interaction::Idle,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.page.components
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn registry(&self) -> &dyn ComponentRegistry {
        self.registry.as_ref()
    }

    /// Replace the page being edited. History, selection and any gesture are
    /// dropped.
    pub fn load_page(&mut self, mut page: Page) {
        self.interaction = Interaction::Idle;
        self.camera.end_pan();
        page.components.set_protect_root(self.is_definition_edit());
        self.page = page;
        self.selection.clear();
        self.history.clear();
        log::info!("Loaded page {}", self.page.id);
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.cancel_interaction();
        self.mode = mode;
        let protect = self.is_definition_edit();
        self.page.components.set_protect_root(protect);
        self.selection.clear();
    }

    fn is_definition_edit(&self) -> bool {
        matches!(self.mode, EditorMode::DefinitionEdit { .. })
    }

    fn scope(&self) -> SelectScope {
        if self.is_definition_edit() {
            SelectScope::Definition
        } else {
            SelectScope::Page
        }
    }

    /// Space held turns left-button presses into pans.
    pub fn set_space_pressed(&mut self, pressed: bool) {
        self.pointer.set_space_pressed(pressed);
    }

    /// A node of registered type `kind` with its default props and a fresh id.
    pub fn create_node(&self, kind: &str) -> ComponentNode {
        create_node(self.registry.as_ref(), kind)
    }

    pub fn fit_to_view(&mut self) {
        self.camera.fit_canvas(self.page.size(), self.config.fit_padding);
    }

    // --- Tree mutations -------------------------------------------------

    /// Apply `command` to a copy of the tree, record it, then swap the copy
    /// in. A refused command leaves tree and history untouched.
    fn commit(&mut self, command: Command) -> EditResult<()> {
        let mut next = self.page.components.clone();
        command.apply(&mut next)?;
        log::debug!("Commit {}", command.label());
        self.history.push(command);
        self.page.components = next;
        self.selection.refresh(&self.page.components);
        Ok(())
    }

    fn node(&self, id: &str) -> EditResult<Arc<ComponentNode>> {
        let id = loop_instance::source_id(id);
        self.tree()
            .find_node(id)
            .cloned()
            .ok_or_else(|| EditError::NotFound(id.to_string()))
    }

    fn child_count(&self, parent: &ParentRef) -> EditResult<usize> {
        self.tree()
            .children_of(parent)
            .map(<[_]>::len)
            .ok_or_else(|| EditError::ContainerNotFound(parent.id().unwrap_or_default().to_string()))
    }

    /// Whether children of `parent` keep an explicit `x,y`.
    fn places_manually(&self, parent: &ParentRef) -> bool {
        match parent.id() {
            Some(pid) => self
                .tree()
                .find_node(pid)
                .is_some_and(|n| n.layout_mode() == LayoutMode::Manual),
            None => true,
        }
    }

    /// Append `node` to the top level. Returns its id.
    pub fn add_node(&mut self, node: ComponentNode) -> EditResult<String> {
        let id = node.id.clone();
        let index = self.tree().roots().len();
        self.commit(Command::Add {
            node: Arc::new(node),
            parent: ParentRef::TopLevel,
            index,
        })?;
        Ok(id)
    }

    /// Append `node` to the children of `container_id`. Returns its id.
    pub fn add_to_container(&mut self, container_id: &str, node: ComponentNode) -> EditResult<String> {
        let parent = ParentRef::Node(loop_instance::source_id(container_id).to_string());
        let index = self.child_count(&parent)?;
        let id = node.id.clone();
        self.commit(Command::Add {
            node: Arc::new(node),
            parent,
            index,
        })?;
        Ok(id)
    }

    /// Reparent `id` under `new_parent` (`None` for the top level). `index`
    /// is clamped and `None` appends; `local` sets the stored position.
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent: Option<&str>,
        index: Option<usize>,
        local: Option<Point>,
    ) -> EditResult<()> {
        let node = self.node(id)?;
        let (from_parent, from_index) = self
            .tree()
            .parent_of(&node.id)
            .ok_or_else(|| EditError::NotFound(node.id.clone()))?;
        let target = ParentRef::from_option(new_parent.map(loop_instance::source_id));
        let mut len = self.child_count(&target)?;
        if target == from_parent {
            len = len.saturating_sub(1);
        }
        let command = Command::Move {
            id: node.id.clone(),
            from: Placement {
                parent: from_parent,
                index: from_index,
                position: node.position(),
            },
            to: Placement {
                index: index.map_or(len, |i| i.min(len)),
                position: local
                    .filter(|_| self.places_manually(&target))
                    .unwrap_or_else(|| node.position()),
                parent: target,
            },
        };
        self.commit(command)
    }

    /// Shallow-merge `props` into the node's props.
    pub fn patch_node(&mut self, id: &str, props: Props) -> EditResult<()> {
        let node = self.node(id)?;
        let before = capture_patch(&node.props, props.keys().map(String::as_str));
        self.commit(Command::Update {
            id: node.id.clone(),
            before,
            after: patch_from_props(&props),
        })
    }

    pub fn delete_node(&mut self, id: &str) -> EditResult<()> {
        let command = delete_command(self.tree(), loop_instance::source_id(id))?;
        self.commit(command)
    }

    /// Delete every selected node as one undo step. Nodes whose ancestor is
    /// also selected go with that ancestor. Returns how many subtrees went.
    pub fn delete_selected(&mut self) -> EditResult<usize> {
        let ids = self.selected_roots();
        if ids.is_empty() {
            return Ok(0);
        }
        let mut scratch = self.tree().clone();
        let mut commands = Vec::with_capacity(ids.len());
        for id in &ids {
            let command = delete_command(&scratch, id)?;
            command.apply(&mut scratch)?;
            commands.push(command);
        }
        self.commit(Command::Batch {
            label: format!("delete {} node(s)", ids.len()),
            commands,
        })?;
        Ok(ids.len())
    }

    /// Copy the subtree of `id` with fresh ids, offset from the original and
    /// appended at the top level. The copy becomes the selection.
    pub fn duplicate(&mut self, id: &str) -> EditResult<String> {
        let node = self.node(id)?;
        let rect = self
            .tree()
            .resolve_rect(&node.id)
            .ok_or_else(|| EditError::NotFound(node.id.clone()))?;
        let mut copy = with_fresh_ids(&node.strip_transient());
        let offset = self.config.duplicate_offset;
        copy.set_prop(prop::X, rect.x0 + offset);
        copy.set_prop(prop::Y, rect.y0 + offset);
        let copy_id = self.add_node(copy)?;
        self.select(&copy_id, false);
        Ok(copy_id)
    }

    /// Wrap the selected nodes in a new manual container sized to their
    /// union. The container becomes the selection.
    pub fn group_selected(&mut self) -> EditResult<String> {
        let ids = self.selected_roots();
        let nodes: Vec<(Arc<ComponentNode>, Rect)> = ids
            .iter()
            .filter_map(|id| Some((self.tree().find_node(id)?.clone(), self.tree().resolve_rect(id)?)))
            .collect();
        if nodes.len() < 2 {
            return Err(EditError::NothingToGroup);
        }
        let (wrapped, _) =
            wrap_in_container(&nodes, "Group", self.config.min_group_size).ok_or(EditError::NothingToGroup)?;
        let container_id = wrapped.id.clone();

        let mut scratch = self.tree().clone();
        let mut commands = Vec::with_capacity(nodes.len() + 1);
        let add = Command::Add {
            node: Arc::new(ComponentNode {
                children: Vec::new(),
                ..wrapped.clone()
            }),
            parent: ParentRef::TopLevel,
            index: scratch.roots().len(),
        };
        add.apply(&mut scratch)?;
        commands.push(add);

        for (index, ((node, _), child)) in nodes.iter().zip(&wrapped.children).enumerate() {
            let (parent, from_index) = scratch
                .parent_of(&node.id)
                .ok_or_else(|| EditError::NotFound(node.id.clone()))?;
            let command = Command::Move {
                id: node.id.clone(),
                from: Placement {
                    parent,
                    index: from_index,
                    position: node.position(),
                },
                to: Placement {
                    parent: ParentRef::Node(container_id.clone()),
                    index,
                    position: child.position(),
                },
            };
            command.apply(&mut scratch)?;
            commands.push(command);
        }

        self.commit(Command::Batch {
            label: format!("group {} node(s)", nodes.len()),
            commands,
        })?;
        self.select(&container_id, false);
        Ok(container_id)
    }

    /// Lift the children of container `id` into its parent, keeping their
    /// canvas positions, and remove the container. Clears the selection.
    pub fn ungroup(&mut self, id: &str) -> EditResult<()> {
        let container = self.node(id)?;
        if !container.is_container() || container.children.is_empty() {
            return Err(EditError::NothingToUngroup(container.id.clone()));
        }
        let (parent, index) = self
            .tree()
            .parent_of(&container.id)
            .ok_or_else(|| EditError::NotFound(container.id.clone()))?;
        let parent_origin = match &parent {
            ParentRef::TopLevel => Point::ZERO,
            ParentRef::Node(pid) => {
                let parent_node = self.node(pid)?;
                let rect = self
                    .tree()
                    .resolve_rect(pid)
                    .ok_or_else(|| EditError::NotFound(pid.clone()))?;
                content_origin(&parent_node, rect)
            }
        };

        let mut commands = Vec::with_capacity(container.children.len() + 1);
        for (offset, child) in container.children.iter().enumerate() {
            let rect = self
                .tree()
                .resolve_rect(&child.id)
                .ok_or_else(|| EditError::NotFound(child.id.clone()))?;
            commands.push(Command::Move {
                id: child.id.clone(),
                from: Placement {
                    parent: ParentRef::Node(container.id.clone()),
                    index: 0,
                    position: child.position(),
                },
                to: Placement {
                    parent: parent.clone(),
                    index: index + 1 + offset,
                    position: Point::ZERO + (rect.origin() - parent_origin),
                },
            });
        }
        commands.push(Command::Delete {
            node: Arc::new(ComponentNode {
                children: Vec::new(),
                ..(*container).clone()
            }),
            parent,
            index,
        });

        self.commit(Command::Batch {
            label: format!("ungroup {}", container.id),
            commands,
        })?;
        self.selection.clear();
        Ok(())
    }

    /// Selected ids without those whose ancestor is selected too.
    fn selected_roots(&self) -> Vec<String> {
        let ids = self.selection.ids();
        ids.iter()
            .filter(|id| {
                self.tree()
                    .ancestors(id)
                    .is_some_and(|(path, _)| !path.iter().any(|a| ids.contains(&a.id)))
            })
            .cloned()
            .collect()
    }

    // --- Reusable components --------------------------------------------

    /// A definition whose template is built from the current selection.
    pub fn definition_from_selection(&self, name: &str) -> Option<ComponentDefinition> {
        let nodes: Vec<(Arc<ComponentNode>, Rect)> = self
            .selected_roots()
            .iter()
            .filter_map(|id| Some((self.tree().find_node(id)?.clone(), self.tree().resolve_rect(id)?)))
            .collect();
        let template = template_from_selection(&nodes, name, self.config.min_group_size)?;
        Some(ComponentDefinition::new(name, template))
    }

    /// Rebuild every instance of `definition` from its current template, as
    /// one undo step. Returns the number of instances updated.
    pub fn sync_definition(&mut self, definition: &ComponentDefinition) -> EditResult<usize> {
        let mut instances = Vec::new();
        self.tree().walk(&mut |node| {
            if node.custom.as_ref().is_some_and(|c| c.def_id == definition.id) {
                instances.push(node.id.clone());
            }
        });
        let mut commands = Vec::with_capacity(instances.len() * 2);
        for id in &instances {
            let old = self.node(id)?;
            let (parent, index) = self
                .tree()
                .parent_of(id)
                .ok_or_else(|| EditError::NotFound(id.clone()))?;
            commands.push(Command::Delete {
                node: old.clone(),
                parent: parent.clone(),
                index,
            });
            commands.push(Command::Add {
                node: Arc::new(sync_instance(definition, &old)),
                parent,
                index,
            });
        }
        if commands.is_empty() {
            return Ok(0);
        }
        self.commit(Command::Batch {
            label: format!("sync {}", definition.name),
            commands,
        })?;
        Ok(instances.len())
    }

    // --- Z-order --------------------------------------------------------

    pub fn bring_to_front(&mut self, id: &str) -> EditResult<bool> {
        self.reorder(id, ZOrderOp::BringToFront)
    }

    pub fn bring_forward(&mut self, id: &str) -> EditResult<bool> {
        self.reorder(id, ZOrderOp::BringForward)
    }

    pub fn send_backward(&mut self, id: &str) -> EditResult<bool> {
        self.reorder(id, ZOrderOp::SendBackward)
    }

    pub fn send_to_back(&mut self, id: &str) -> EditResult<bool> {
        self.reorder(id, ZOrderOp::SendToBack)
    }

    /// Apply a z-order operation as one undo step. Returns false when nothing
    /// had to change.
    pub fn reorder(&mut self, id: &str, op: ZOrderOp) -> EditResult<bool> {
        let changes = zorder::plan(self.tree(), loop_instance::source_id(id), op)?;
        if changes.is_empty() {
            return Ok(false);
        }
        let commands = changes
            .into_iter()
            .map(|change| {
                let before = self
                    .tree()
                    .find_node(&change.id)
                    .map(|n| capture_patch(&n.props, [prop::Z_INDEX]))
                    .unwrap_or_default();
                Command::Update {
                    id: change.id,
                    before,
                    after: PropPatch::from([(prop::Z_INDEX.to_string(), Some(json!(change.after)))]),
                }
            })
            .collect();
        self.commit(Command::Batch {
            label: format!("{} {}", op.label(), id),
            commands,
        })?;
        Ok(true)
    }

    // --- Selection ------------------------------------------------------

    pub fn select(&mut self, id: &str, multi: bool) -> bool {
        let scope = self.scope();
        self.selection.select(&self.page.components, id, multi, scope)
    }

    pub fn select_many<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        let scope = self.scope();
        self.selection.select_many(&self.page.components, ids, scope);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Topmost node under the device point.
    pub fn node_at(&self, device: Point) -> Option<String> {
        let point = self.camera.transform().device_to_content(device);
        self.tree()
            .placed_nodes()
            .into_iter()
            .filter(|placed| placed.rect.contains(point))
            .max_by(|a, b| a.stack.cmp(&b.stack).then(a.order.cmp(&b.order)))
            .map(|placed| placed.node.id.clone())
    }

    // --- History --------------------------------------------------------

    /// Undo the last step. Any gesture in progress is abandoned first.
    pub fn undo(&mut self) -> Option<String> {
        self.cancel_interaction();
        let label = self.history.undo(&mut self.page.components)?;
        self.selection.refresh(&self.page.components);
        Some(label)
    }

    pub fn redo(&mut self) -> Option<String> {
        self.cancel_interaction();
        let label = self.history.redo(&mut self.page.components)?;
        self.selection.refresh(&self.page.components);
        Some(label)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Interaction ----------------------------------------------------

    /// Start dragging the node under `id`. A node outside the selection
    /// becomes the selection first.
    pub fn begin_drag(&mut self, id: &str, device: Point, pointer_id: Option<u32>) -> bool {
        self.cancel_interaction();
        let scope = self.scope();
        let Some(target) = resolve_target(self.tree(), id, scope) else {
            return false;
        };
        if !self.selection.contains(&target.id) {
            self.selection.select(&self.page.components, &target.id, false, scope);
        }
        let is_protected_root =
            self.tree().protects_root() && self.tree().roots().iter().any(|root| root.id == target.id);
        // A selected child already moves with its selected ancestor.
        let selected = self.selected_roots();
        match DragSession::existing(
            self.tree(),
            &target.id,
            &selected,
            device,
            pointer_id,
            self.config.hover_activate_ms,
            !is_protected_root,
        ) {
            Some(session) => {
                self.interaction = Interaction::Drag(session);
                true
            }
            None => false,
        }
    }

    /// Start placing a new node of registered type `kind`. Returns the id it
    /// will have once dropped.
    pub fn begin_new_drop(&mut self, kind: &str, device: Point, pointer_id: Option<u32>) -> String {
        let node = self.create_node(kind);
        self.begin_insert(node, device, pointer_id)
    }

    /// Start placing a new instance of `definition`.
    pub fn begin_definition_drop(
        &mut self,
        definition: &ComponentDefinition,
        device: Point,
        pointer_id: Option<u32>,
    ) -> String {
        self.begin_insert(instantiate(definition), device, pointer_id)
    }

    fn begin_insert(&mut self, node: ComponentNode, device: Point, pointer_id: Option<u32>) -> String {
        self.cancel_interaction();
        let id = node.id.clone();
        let at = self.camera.transform().device_to_content(device);
        let session = DragSession::new_node(
            self.tree(),
            node,
            at,
            device,
            pointer_id,
            self.config.hover_activate_ms,
        );
        self.interaction = Interaction::Drag(session);
        id
    }

    /// Resize handles of `id` in content space.
    pub fn resize_handles(&self, id: &str) -> Vec<Handle> {
        let Ok(node) = self.node(id) else {
            return Vec::new();
        };
        let Some(bounds) = self.tree().resolve_rect(&node.id) else {
            return Vec::new();
        };
        handles_for(&node, self.registry.resize_profile(&node.kind), bounds)
    }

    /// Handle of `id` under the device point, if any.
    pub fn handle_at(&self, id: &str, device: Point) -> Option<HandleKind> {
        let transform = self.camera.transform();
        let point = transform.device_to_content(device);
        let tolerance = HANDLE_HIT_TOLERANCE / self.camera.scale.max(f64::EPSILON);
        hit_test_handles(&self.resize_handles(id), point, tolerance)
    }

    pub fn begin_resize(&mut self, id: &str, handle: HandleKind, device: Point, pointer_id: Option<u32>) -> bool {
        self.cancel_interaction();
        let Ok(node) = self.node(id) else {
            return false;
        };
        let profile = self.registry.resize_profile(&node.kind);
        if !active_handles(profile, node.auto_width(), node.auto_height()).contains(&handle) {
            log::debug!("Handle {:?} is not active on {}", handle, node.id);
            return false;
        }
        log::debug!("Resize start {} {:?}", node.id, handle);
        self.interaction = Interaction::Resize {
            session: ResizeSession::new(&node, handle, device, pointer_id, self.config.min_size),
            before: capture_patch(&node.props, GEOMETRY_KEYS),
        };
        true
    }

    pub fn begin_pan(&mut self, device: Point) {
        self.cancel_interaction();
        self.camera.begin_pan(device);
        self.interaction = Interaction::Pan;
    }

    pub fn is_interacting(&self) -> bool {
        !matches!(self.interaction, Interaction::Idle)
    }

    /// Feed one pointer event to the active gesture. Returns whether the
    /// page tree changed.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> EditResult<bool> {
        let transform = self.camera.transform();
        let message = self.pointer.process(event, &transform);
        let now = message.timestamp_ms;
        let device = message.device();

        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::Idle => {
                if self.pointer.starts_pan(&event) {
                    self.begin_pan(device);
                }
                Ok(false)
            }
            Interaction::Pan => {
                match message.kind {
                    PointerKind::Move => {
                        self.camera.update_pan(device);
                        self.interaction = Interaction::Pan;
                    }
                    PointerKind::Up | PointerKind::Cancel => self.camera.end_pan(),
                    _ => self.interaction = Interaction::Pan,
                }
                Ok(false)
            }
            Interaction::Drag(mut session) => {
                if !session.accepts(message.pointer_id) {
                    self.interaction = Interaction::Drag(session);
                    return Ok(false);
                }
                match message.kind {
                    PointerKind::Move | PointerKind::Down => {
                        let positions = self.follow(&mut session, device, now);
                        self.interaction = Interaction::Drag(session);
                        Ok(positions)
                    }
                    PointerKind::Up => {
                        self.follow(&mut session, device, now);
                        let outcome = session.finish(self.tree(), now, false);
                        self.settle_drag(outcome)
                    }
                    PointerKind::Cancel => {
                        let outcome = session.finish(self.tree(), now, true);
                        self.settle_drag(outcome)
                    }
                    PointerKind::EnterStage | PointerKind::LeaveStage => {
                        self.interaction = Interaction::Drag(session);
                        Ok(false)
                    }
                }
            }
            Interaction::Resize { session, before } => {
                if !session.accepts(message.pointer_id) {
                    self.interaction = Interaction::Resize { session, before };
                    return Ok(false);
                }
                match message.kind {
                    PointerKind::Move => {
                        let changed = self.apply_resize(&session.node_id, &session.update(device, &transform));
                        self.interaction = Interaction::Resize { session, before };
                        Ok(changed)
                    }
                    PointerKind::Up => {
                        self.apply_resize(&session.node_id, &session.update(device, &transform));
                        Ok(self.finish_resize(&session.node_id, before))
                    }
                    PointerKind::Cancel => {
                        log::debug!("Resize cancelled {}", session.node_id);
                        self.page.components.apply_patch(&session.node_id, &before)?;
                        self.selection.refresh(&self.page.components);
                        Ok(true)
                    }
                    _ => {
                        self.interaction = Interaction::Resize { session, before };
                        Ok(false)
                    }
                }
            }
        }
    }

    /// Abandon the active gesture, putting back whatever it changed.
    pub fn cancel_interaction(&mut self) {
        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::Idle => {}
            Interaction::Pan => self.camera.end_pan(),
            Interaction::Drag(session) => {
                let outcome = session.finish(self.tree(), 0, true);
                if let Err(err) = self.settle_drag(outcome) {
                    log::warn!("Failed to abandon drag: {}", err);
                }
            }
            Interaction::Resize { session, before } => {
                if let Err(err) = self.page.components.apply_patch(&session.node_id, &before) {
                    log::warn!("Failed to abandon resize of {}: {}", session.node_id, err);
                }
                self.selection.refresh(&self.page.components);
            }
        }
    }

    /// Let the drop-target hover timer fire between pointer events.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match &mut self.interaction {
            Interaction::Drag(session) => session.tick(now_ms),
            _ => false,
        }
    }

    pub fn drop_preview(&self) -> Option<DropPreview> {
        match &self.interaction {
            Interaction::Drag(session) => session.preview(),
            _ => None,
        }
    }

    pub fn snap_lines(&self) -> &[SnapLine] {
        match &self.interaction {
            Interaction::Drag(session) => session.snap_lines(),
            _ => &[],
        }
    }

    /// Content-space rectangle of the node being dragged.
    pub fn drag_rect(&self) -> Option<Rect> {
        match &self.interaction {
            Interaction::Drag(session) => Some(session.rect()),
            _ => None,
        }
    }

    /// Move the drag to `device` and write the live positions, without
    /// history.
    fn follow(&mut self, session: &mut DragSession, device: Point, now: u64) -> bool {
        let transform = self.camera.transform();
        let positions = session.update(device, now, &transform, self.page.size(), &self.config.snap_options());
        for (id, position) in &positions {
            if let Err(err) = self.page.components.apply_patch(id, &position_patch(*position)) {
                log::warn!("Dropping live position for {}: {}", id, err);
            }
        }
        if !positions.is_empty() {
            self.selection.refresh(&self.page.components);
        }
        !positions.is_empty()
    }

    fn settle_drag(&mut self, outcome: DropOutcome) -> EditResult<bool> {
        match outcome {
            DropOutcome::Released { members, moved } => {
                let mut commands: Vec<Command> = members
                    .iter()
                    .filter_map(|member| {
                        let current = self.tree().find_node(&member.id)?.position();
                        (current != member.start).then(|| Command::Update {
                            id: member.id.clone(),
                            before: position_patch(member.start),
                            after: position_patch(current),
                        })
                    })
                    .collect();
                if !moved || commands.is_empty() {
                    log::debug!("Drag released without movement");
                    return Ok(false);
                }
                let command = match commands.len() {
                    1 => commands.remove(0),
                    n => Command::Batch {
                        label: format!("move {n} node(s)"),
                        commands,
                    },
                };
                log::debug!("Drag commit {}", command.label());
                // Live updates already put the tree in its final state.
                self.history.push(command);
                Ok(true)
            }
            DropOutcome::Reparent {
                member,
                container_id,
                local,
            } => {
                let result = self.reparent(&member, &container_id, local);
                if let Err(err) = &result {
                    log::warn!("Drop of {} into {} refused: {}", member.id, container_id, err);
                    self.restore_positions(std::slice::from_ref(&member));
                }
                result.map(|()| true)
            }
            DropOutcome::Insert {
                mut node,
                parent,
                position,
                z_index,
            } => {
                node.set_prop(prop::X, position.x);
                node.set_prop(prop::Y, position.y);
                node.set_prop(prop::Z_INDEX, z_index);
                let id = node.id.clone();
                let index = self.child_count(&parent)?;
                self.commit(Command::Add {
                    node: Arc::new(node),
                    parent,
                    index,
                })?;
                self.select(&id, false);
                Ok(true)
            }
            DropOutcome::Abandoned { members } => {
                self.restore_positions(&members);
                Ok(!members.is_empty())
            }
        }
    }

    fn reparent(&mut self, member: &DragMember, container_id: &str, local: Point) -> EditResult<()> {
        let (parent, index) = self
            .tree()
            .parent_of(&member.id)
            .ok_or_else(|| EditError::NotFound(member.id.clone()))?;
        let target = ParentRef::Node(container_id.to_string());
        let mut len = self.child_count(&target)?;
        if target == parent {
            len = len.saturating_sub(1);
        }
        log::debug!("Drop {} into {}", member.id, container_id);
        self.commit(Command::Move {
            id: member.id.clone(),
            from: Placement {
                parent,
                index,
                position: member.start,
            },
            to: Placement {
                parent: target,
                index: len,
                position: local,
            },
        })
    }

    fn restore_positions(&mut self, members: &[DragMember]) {
        for member in members {
            if let Err(err) = self.page.components.apply_patch(&member.id, &position_patch(member.start)) {
                log::warn!("Failed to restore {}: {}", member.id, err);
            }
        }
        self.selection.refresh(&self.page.components);
    }

    fn apply_resize(&mut self, id: &str, update: &ResizeUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        match self.page.components.patch_node(id, update.to_props()) {
            Ok(()) => {
                self.selection.refresh(&self.page.components);
                true
            }
            Err(err) => {
                log::warn!("Dropping resize of {}: {}", id, err);
                false
            }
        }
    }

    fn finish_resize(&mut self, id: &str, before: PropPatch) -> bool {
        let Some(node) = self.tree().find_node(id) else {
            return false;
        };
        let after = capture_patch(&node.props, GEOMETRY_KEYS);
        if after == before {
            log::debug!("Resize end {} (unchanged)", id);
            return false;
        }
        log::debug!("Resize end {}", id);
        self.history.push(Command::Update {
            id: id.to_string(),
            before,
            after,
        });
        true
    }

    // --- Measurement ----------------------------------------------------

    /// Record the rendered content-space rectangle of `id`.
    ///
    /// Repetitions after the first are ignored, as are changes within
    /// `measure_threshold` of the stored values. Returns whether anything was
    /// written. Measurements never enter history.
    pub fn report_measurement(&mut self, id: &str, rect: Rect) -> bool {
        let instance = loop_instance::parse(id);
        if !instance.is_primary() {
            return false;
        }
        if !rect.is_finite() {
            log::warn!("Discarding non-finite measurement for {}", id);
            return false;
        }
        let Some(node) = self.tree().find_node(instance.source_id) else {
            log::warn!("Discarding measurement for unknown node {}", id);
            return false;
        };

        let threshold = self.config.measure_threshold;
        let width = node.number(prop::MEASURED_WIDTH).unwrap_or(0.0);
        let height = node.number(prop::MEASURED_HEIGHT).unwrap_or(0.0);
        let size_changed =
            (rect.width() - width).abs() > threshold || (rect.height() - height).abs() > threshold;
        let position_changed = match (
            node.number(prop::MEASURED_CANVAS_X),
            node.number(prop::MEASURED_CANVAS_Y),
        ) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                (rect.x0 - x).abs() > threshold || (rect.y0 - y).abs() > threshold
            }
            _ => true,
        };
        if !size_changed && !position_changed {
            return false;
        }

        let node_id = node.id.clone();
        let props = Props::from_iter([
            (prop::MEASURED_WIDTH.to_string(), json!(rect.width())),
            (prop::MEASURED_HEIGHT.to_string(), json!(rect.height())),
            (prop::MEASURED_CANVAS_X.to_string(), json!(rect.x0)),
            (prop::MEASURED_CANVAS_Y.to_string(), json!(rect.y0)),
        ]);
        match self.page.components.patch_node(&node_id, props) {
            Ok(()) => {
                self.selection.refresh(&self.page.components);
                true
            }
            Err(err) => {
                log::warn!("Discarding measurement for {}: {}", id, err);
                false
            }
        }
    }

    /// Like [`Editor::report_measurement`] for a rectangle in device pixels.
    pub fn report_device_measurement(&mut self, id: &str, device_rect: Rect) -> bool {
        let rect = self
            .camera
            .transform()
            .convert_rect(device_rect, Space::Device, Space::Content);
        self.report_measurement(id, rect)
    }
}

fn position_patch(position: Point) -> PropPatch {
    PropPatch::from([
        (prop::X.to_string(), Some(json!(position.x))),
        (prop::Y.to_string(), Some(json!(position.y))),
    ])
}

fn delete_command(tree: &ComponentTree, id: &str) -> EditResult<Command> {
    let node = tree
        .find_node(id)
        .cloned()
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;
    let (parent, index) = tree.parent_of(id).ok_or_else(|| EditError::NotFound(id.to_string()))?;
    Ok(Command::Delete { node, parent, index })
}

fn with_fresh_ids(node: &ComponentNode) -> ComponentNode {
    ComponentNode {
        id: new_node_id(&node.kind),
        children: node
            .children
            .iter()
            .map(|child| Arc::new(with_fresh_ids(child)))
            .collect(),
        ..node.clone()
    }
}
