//! The seam between the lifecycle manager and whatever draws the messages.

use super::kind::MessageKind;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Display payload of a message. The manager never looks inside it.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    /// Structured node understood by the renderer.
    Node(Value),
}

impl std::fmt::Display for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Content::Text(text) => f.write_str(text),
            Content::Node(node) => write!(f, "{node}"),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Value> for Content {
    fn from(node: Value) -> Self {
        Content::Node(node)
    }
}

/// Auto-hide behaviour requested from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoHide {
    /// Whatever the renderer does by default.
    #[default]
    Default,
    After(Duration),
    /// Stay until destroyed.
    Never,
}

/// Called exactly once when a widget's exit transition has finished.
pub type LeaveCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct RenderOptions {
    pub auto_hide: AutoHide,
    /// Caller fields forwarded verbatim.
    pub extra: Map<String, Value>,
    pub on_after_leave: Option<LeaveCallback>,
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("auto_hide", &self.auto_hide)
            .field("extra", &self.extra)
            .field("on_after_leave", &self.on_after_leave.is_some())
            .finish()
    }
}

/// A live widget created by a [`Renderer`].
///
/// Destruction is two-phase: [`destroy`](MessageHandle::destroy) starts the
/// exit transition and the renderer later runs the `on_after_leave` callback
/// it was given at creation. `destroy` on a widget that is already leaving is
/// a no-op.
pub trait MessageHandle: Send + Sync {
    fn id(&self) -> u64;
    fn kind(&self) -> MessageKind;
    fn set_kind(&self, kind: MessageKind);
    fn content(&self) -> Content;
    fn set_content(&self, content: Content);
    fn destroy(&self);
}

pub type Handle = Arc<dyn MessageHandle>;

/// Rendering primitive wrapped by the manager.
///
/// `create` is called while the manager holds its state lock, so it must not
/// run the leave callback synchronously. `MessageHandle::destroy` is always
/// called without the lock held.
pub trait Renderer: Send + Sync {
    fn create(&self, kind: MessageKind, content: Content, options: RenderOptions) -> Handle;
}

impl<R: Renderer + ?Sized> Renderer for Arc<R> {
    fn create(&self, kind: MessageKind, content: Content, options: RenderOptions) -> Handle {
        (**self).create(kind, content, options)
    }
}
