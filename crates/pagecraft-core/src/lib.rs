//! Pagecraft Core Library
//!
//! Canvas editing engine for the Pagecraft page builder: the component tree,
//! coordinate spaces, drag-and-drop with snapping, resizing, stacking order,
//! selection and undo history. Rendering and persistence backends live
//! outside this crate.

pub mod binding;
pub mod camera;
pub mod config;
pub mod coords;
pub mod custom;
pub mod dragdrop;
pub mod editor;
pub mod error;
pub mod history;
pub mod input;
pub mod loop_instance;
pub mod node;
pub mod page;
pub mod registry;
pub mod resize;
pub mod selection;
pub mod snap;
pub mod storage;
pub mod tree;
pub mod zorder;

pub use binding::{BindingRef, BindingResolver};
pub use camera::Camera;
pub use config::EditorConfig;
pub use coords::{CoordinateSnapshot, CoordinateTransform, Space, ViewSource};
pub use custom::{ComponentDefinition, PropSchema, instantiate};
pub use dragdrop::{DragSession, DropOutcome, DropPreview};
pub use editor::{Editor, EditorMode};
pub use error::{EditError, EditResult};
pub use history::{Command, History, Placement};
pub use input::{Modifiers, MouseButton, PointerEvent, PointerHub, PointerKind, PointerMessage};
pub use node::{ComponentNode, CustomMeta, LayoutMode, Padding, Props, Sizing};
pub use page::Page;
pub use registry::{BasicRegistry, ComponentRegistry};
pub use resize::{Corner, Edge, Handle, HandleKind, ResizeProfile, ResizeSession};
pub use selection::{SelectScope, Selection};
pub use snap::{SnapLine, SnapOptions, SnapResult, SnapStrategy, SnapTarget, snap_rect};
pub use storage::{MemoryStorage, Storage, StorageError};
pub use tree::{ComponentTree, ParentRef, PropPatch};
pub use zorder::ZOrderOp;
