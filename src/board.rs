//! In-memory message board.
//!
//! `Board` is a [`Renderer`] that keeps its widgets in memory. It honours the
//! requested auto-hide, runs an exit transition of `leave_duration` on the
//! scheduler before reporting completion, and dismisses the oldest widget
//! when more than `max_visible` are up. That limit is the front end's
//! notification container cap, applied here to messages as well. The egui
//! overlay in [`crate::gui`] draws it; headless callers can inspect it
//! through [`Board::visible`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::message::{
    AutoHide, Content, Handle, LeaveCallback, MessageHandle, MessageKind, RenderOptions,
    Renderer, Scheduler,
};
use crate::settings::BoardSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub max_visible: usize,
    pub leave_duration: Duration,
    /// Auto-hide applied for [`AutoHide::Default`].
    pub default_duration: Duration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig::from(&BoardSettings::default())
    }
}

impl From<&BoardSettings> for BoardConfig {
    fn from(settings: &BoardSettings) -> Self {
        Self {
            max_visible: settings.max_visible.max(1),
            leave_duration: settings.leave_duration(),
            default_duration: settings.default_duration(),
        }
    }
}

/// Copy of a widget's state at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSnapshot {
    pub id: u64,
    pub kind: MessageKind,
    pub content: Content,
    pub auto_hide: AutoHide,
    pub extra: Map<String, Value>,
    pub leaving: bool,
}

struct WidgetState {
    kind: MessageKind,
    content: Content,
    leaving: bool,
    on_after_leave: Option<LeaveCallback>,
}

struct Widget {
    id: u64,
    auto_hide: AutoHide,
    extra: Map<String, Value>,
    state: Mutex<WidgetState>,
    board: Weak<BoardInner>,
}

impl Widget {
    fn lock(&self) -> MutexGuard<'_, WidgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> WidgetSnapshot {
        let state = self.lock();
        WidgetSnapshot {
            id: self.id,
            kind: state.kind,
            content: state.content.clone(),
            auto_hide: self.auto_hide,
            extra: self.extra.clone(),
            leaving: state.leaving,
        }
    }

    fn is_leaving(&self) -> bool {
        self.lock().leaving
    }
}

impl MessageHandle for Widget {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> MessageKind {
        self.lock().kind
    }

    fn set_kind(&self, kind: MessageKind) {
        self.lock().kind = kind;
    }

    fn content(&self) -> Content {
        self.lock().content.clone()
    }

    fn set_content(&self, content: Content) {
        self.lock().content = content;
    }

    fn destroy(&self) {
        {
            let mut state = self.lock();
            if state.leaving {
                return;
            }
            state.leaving = true;
        }
        let Some(board) = self.board.upgrade() else {
            return;
        };
        board.dismissed.fetch_add(1, Ordering::SeqCst);
        let id = self.id;
        let weak = self.board.clone();
        board.scheduler.schedule(
            board.config.leave_duration,
            Box::new(move || {
                if let Some(board) = weak.upgrade() {
                    board.finish_leave(id);
                }
            }),
        );
    }
}

struct BoardInner {
    scheduler: Arc<dyn Scheduler>,
    config: BoardConfig,
    widgets: Mutex<Vec<Arc<Widget>>>,
    next_id: AtomicU64,
    dismissed: AtomicU64,
}

impl BoardInner {
    fn widgets(&self) -> MutexGuard<'_, Vec<Arc<Widget>>> {
        self.widgets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_leave(&self, id: u64) {
        let widget = {
            let mut widgets = self.widgets();
            let Some(pos) = widgets.iter().position(|w| w.id == id) else {
                return;
            };
            widgets.remove(pos)
        };
        let callback = widget.lock().on_after_leave.take();
        tracing::trace!(id, "widget left the board");
        if let Some(callback) = callback {
            callback();
        }
    }
}

#[derive(Clone)]
pub struct Board {
    inner: Arc<BoardInner>,
}

impl Board {
    pub fn new(scheduler: Arc<dyn Scheduler>, config: BoardConfig) -> Self {
        Self {
            inner: Arc::new(BoardInner {
                scheduler,
                config,
                widgets: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                dismissed: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.inner.config
    }

    /// Widgets on the board, oldest first, including those still leaving.
    pub fn visible(&self) -> Vec<WidgetSnapshot> {
        self.inner.widgets().iter().map(|w| w.snapshot()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.widgets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of widgets ever created.
    pub fn created_count(&self) -> u64 {
        self.inner.next_id.load(Ordering::SeqCst) - 1
    }

    /// Total number of exit transitions started.
    pub fn dismissed_count(&self) -> u64 {
        self.inner.dismissed.load(Ordering::SeqCst)
    }

    /// Starts the exit transition of the widget with `id`, e.g. when the
    /// user clicks its close button.
    pub fn dismiss(&self, id: u64) -> bool {
        let widget = self.inner.widgets().iter().find(|w| w.id == id).cloned();
        match widget {
            Some(widget) => {
                widget.destroy();
                true
            }
            None => false,
        }
    }
}

impl Renderer for Board {
    fn create(&self, kind: MessageKind, content: Content, options: RenderOptions) -> Handle {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let widget = Arc::new(Widget {
            id,
            auto_hide: options.auto_hide,
            extra: options.extra,
            state: Mutex::new(WidgetState {
                kind,
                content,
                leaving: false,
                on_after_leave: options.on_after_leave,
            }),
            board: Arc::downgrade(&self.inner),
        });

        let overflow = {
            let mut widgets = self.inner.widgets();
            widgets.push(widget.clone());
            let live: Vec<Arc<Widget>> =
                widgets.iter().filter(|w| !w.is_leaving()).cloned().collect();
            let excess = live.len().saturating_sub(self.inner.config.max_visible);
            live.into_iter().take(excess).collect::<Vec<_>>()
        };
        for old in overflow {
            tracing::debug!(id = old.id, "board full; dismissing oldest widget");
            old.destroy();
        }

        let hide_after = match options.auto_hide {
            AutoHide::Default => Some(self.inner.config.default_duration),
            AutoHide::After(d) if !d.is_zero() => Some(d),
            AutoHide::After(_) | AutoHide::Never => None,
        };
        if let Some(delay) = hide_after {
            let weak = Arc::downgrade(&widget);
            self.inner.scheduler.schedule(
                delay,
                Box::new(move || {
                    if let Some(widget) = weak.upgrade() {
                        widget.destroy();
                    }
                }),
            );
        }

        widget
    }
}
