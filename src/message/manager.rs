//! Keyed message lifecycle.
//!
//! A message shown with a key occupies that key's slot until it is dismissed.
//! Showing again under the same key updates the existing widget in place and
//! restarts its removal timer, so a slot that keeps getting refreshed (a
//! progress message, say) never disappears mid-update. Messages without a key
//! are handed straight to the renderer.
//!
//! Timers and exit callbacks carry the generation of the record they were
//! created for and do nothing once that record has been replaced.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use slab::Slab;

use super::kind::MessageKind;
use super::options::MessageOptions;
use super::render::{
    AutoHide, Content, Handle, LeaveCallback, MessageHandle, RenderOptions, Renderer,
};
use super::scheduler::{Scheduler, ThreadScheduler, TimerId};
use crate::error::{Error, Result};
use crate::settings::MessageSettings;
use crate::toast_log::append_message_log;

#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Removal delay for keyed messages shown without a duration.
    pub default_duration: Duration,
    /// Delay used by [`MessageManager::destroy`].
    pub destroy_delay: Duration,
    pub history_file: Option<PathBuf>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        MessageSettings::default().into()
    }
}

impl From<&MessageSettings> for ManagerConfig {
    fn from(settings: &MessageSettings) -> Self {
        Self {
            default_duration: settings.default_duration(),
            destroy_delay: settings.destroy_delay(),
            history_file: settings.history_file.as_ref().map(PathBuf::from),
        }
    }
}

impl From<MessageSettings> for ManagerConfig {
    fn from(settings: MessageSettings) -> Self {
        Self::from(&settings)
    }
}

/// Read-only view of an active keyed message.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSnapshot {
    pub key: String,
    pub kind: MessageKind,
    pub content: Content,
    pub generation: u64,
    pub widget_id: u64,
}

struct Record {
    key: String,
    handle: Handle,
    kind: MessageKind,
    content: Content,
    generation: u64,
}

struct PendingRemoval {
    timer: TimerId,
    stamp: u64,
    generation: u64,
}

#[derive(Default)]
struct State {
    records: Slab<Record>,
    index: HashMap<String, usize>,
    timers: HashMap<String, PendingRemoval>,
    next_stamp: u64,
}

impl State {
    fn bump(&mut self) -> u64 {
        self.next_stamp += 1;
        self.next_stamp
    }

    fn current(&self, key: &str) -> Option<&Record> {
        self.index.get(key).map(|&slot| &self.records[slot])
    }

    /// The handle under `key` if it still belongs to `generation`.
    fn handle_for(&self, key: &str, generation: u64) -> Option<Handle> {
        self.current(key)
            .filter(|r| r.generation == generation)
            .map(|r| r.handle.clone())
    }
}

struct Shared {
    renderer: Arc<dyn Renderer>,
    scheduler: Arc<dyn Scheduler>,
    config: ManagerConfig,
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lifecycle manager for transient messages.
///
/// Cloning is cheap; every clone shares the same slots and timers.
#[derive(Clone)]
pub struct MessageManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MessageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageManager")
            .field("config", &self.shared.config)
            .field("active", &self.active_count())
            .finish()
    }
}

#[derive(Default)]
pub struct MessageManagerBuilder {
    renderer: Option<Arc<dyn Renderer>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    config: ManagerConfig,
}

impl MessageManagerBuilder {
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[must_use]
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails when no renderer was given. Starts a [`ThreadScheduler`] when no
    /// scheduler was given.
    pub fn build(self) -> Result<MessageManager> {
        let renderer = self.renderer.ok_or(Error::MissingRenderer)?;
        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(s) => s,
            None => Arc::new(ThreadScheduler::new()?),
        };
        Ok(MessageManager::new(renderer, scheduler, self.config))
    }
}

impl MessageManager {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        scheduler: Arc<dyn Scheduler>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                renderer,
                scheduler,
                config,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn builder() -> MessageManagerBuilder {
        MessageManagerBuilder::default()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    /// Shows a message, reusing the widget of its key if one is active.
    pub fn show(
        &self,
        kind: MessageKind,
        content: impl Into<Content>,
        options: MessageOptions,
    ) -> Handle {
        let content = content.into();
        if let Some(path) = &self.shared.config.history_file {
            append_message_log(path, kind, options.slot(), &content);
        }

        let Some(key) = options.slot().map(str::to_owned) else {
            let auto_hide = options.duration.map_or(AutoHide::Default, AutoHide::After);
            return self.shared.renderer.create(
                kind,
                content,
                RenderOptions {
                    auto_hide,
                    extra: options.extra,
                    on_after_leave: None,
                },
            );
        };
        let duration = options
            .duration
            .unwrap_or(self.shared.config.default_duration);

        let mut state = self.shared.lock();
        let handle = match state.index.get(&key).copied() {
            Some(slot) => {
                let record = &mut state.records[slot];
                record.handle.set_kind(kind);
                record.handle.set_content(content.clone());
                record.kind = kind;
                record.content = content;
                tracing::debug!(key = %key, %kind, generation = record.generation, "updated message in place");
                record.handle.clone()
            }
            None => {
                let generation = state.bump();
                let handle = self.shared.renderer.create(
                    kind,
                    content.clone(),
                    RenderOptions {
                        auto_hide: AutoHide::Never,
                        extra: options.extra,
                        on_after_leave: Some(self.leave_callback(key.clone(), generation)),
                    },
                );
                let slot = state.records.insert(Record {
                    key: key.clone(),
                    handle: handle.clone(),
                    kind,
                    content,
                    generation,
                });
                state.index.insert(key.clone(), slot);
                tracing::debug!(key = %key, %kind, generation, "created keyed message");
                handle
            }
        };
        self.arm_removal(&mut state, &key, duration);
        handle
    }

    pub fn loading(&self, content: impl Into<Content>, options: MessageOptions) -> Handle {
        self.show(MessageKind::Loading, content, options)
    }

    pub fn success(&self, content: impl Into<Content>, options: MessageOptions) -> Handle {
        self.show(MessageKind::Success, content, options)
    }

    pub fn error(&self, content: impl Into<Content>, options: MessageOptions) -> Handle {
        self.show(MessageKind::Error, content, options)
    }

    pub fn info(&self, content: impl Into<Content>, options: MessageOptions) -> Handle {
        self.show(MessageKind::Info, content, options)
    }

    pub fn warning(&self, content: impl Into<Content>, options: MessageOptions) -> Handle {
        self.show(MessageKind::Warning, content, options)
    }

    /// Dismisses the message under `key` after the configured destroy delay.
    ///
    /// Returns `false` without scheduling anything when no message is active
    /// under `key`.
    pub fn destroy(&self, key: &str) -> bool {
        self.destroy_after(key, self.shared.config.destroy_delay)
    }

    /// Dismisses the message under `key` once `delay` has passed, leaving the
    /// removal timer alone. A message that replaced it in the meantime is
    /// not touched.
    pub fn destroy_after(&self, key: &str, delay: Duration) -> bool {
        let state = self.shared.lock();
        let Some(generation) = state.current(key).map(|r| r.generation) else {
            tracing::debug!(key, "destroy requested for inactive key");
            return false;
        };
        let weak = Arc::downgrade(&self.shared);
        let key_owned = key.to_owned();
        self.shared.scheduler.schedule(
            delay,
            Box::new(move || {
                let Some(shared) = weak.upgrade() else { return };
                let handle = shared.lock().handle_for(&key_owned, generation);
                match handle {
                    Some(handle) => {
                        tracing::debug!(key = %key_owned, generation, "destroying message");
                        handle.destroy();
                    }
                    None => tracing::trace!(key = %key_owned, generation, "stale destroy ignored"),
                }
            }),
        );
        true
    }

    /// Cancels any pending timer for `key` and arms a new one.
    fn arm_removal(&self, state: &mut State, key: &str, duration: Duration) {
        let Some(generation) = state.current(key).map(|r| r.generation) else {
            return;
        };
        let stamp = state.bump();
        let weak = Arc::downgrade(&self.shared);
        let key_owned = key.to_owned();
        let timer = self.shared.scheduler.schedule(
            duration,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    fire_removal(&shared, &key_owned, stamp);
                }
            }),
        );
        // The previous timer is only dropped once its replacement exists.
        let previous = state.timers.insert(
            key.to_owned(),
            PendingRemoval {
                timer,
                stamp,
                generation,
            },
        );
        if let Some(previous) = previous {
            self.shared.scheduler.cancel(previous.timer);
        }
    }

    fn leave_callback(&self, key: String, generation: u64) -> LeaveCallback {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        Box::new(move || {
            let Some(shared) = weak.upgrade() else { return };
            let mut state = shared.lock();
            let Some(&slot) = state.index.get(&key) else {
                return;
            };
            if state.records[slot].generation != generation {
                tracing::trace!(key = %key, generation, "stale leave callback ignored");
                return;
            }
            state.index.remove(&key);
            let record = state.records.remove(slot);
            if let Some(pending) = state.timers.remove(&key) {
                if pending.generation == generation {
                    shared.scheduler.cancel(pending.timer);
                } else {
                    state.timers.insert(key.clone(), pending);
                }
            }
            tracing::debug!(key = %record.key, generation, "message left");
        })
    }

    /// Keys with an active message, sorted.
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.shared.lock().index.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn active_count(&self) -> usize {
        self.shared.lock().records.len()
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.shared.lock().index.contains_key(key)
    }

    pub fn record(&self, key: &str) -> Option<RecordSnapshot> {
        self.shared.lock().current(key).map(|r| RecordSnapshot {
            key: r.key.clone(),
            kind: r.kind,
            content: r.content.clone(),
            generation: r.generation,
            widget_id: r.handle.id(),
        })
    }

    pub fn handle(&self, key: &str) -> Option<Handle> {
        self.shared.lock().current(key).map(|r| r.handle.clone())
    }

    /// Number of keys with an armed removal timer.
    pub fn pending_removals(&self) -> usize {
        self.shared.lock().timers.len()
    }
}

fn fire_removal(shared: &Shared, key: &str, stamp: u64) {
    let handle = {
        let mut state = shared.lock();
        let current = state.timers.get(key).map(|p| (p.stamp, p.generation));
        let Some((_, generation)) = current.filter(|&(s, _)| s == stamp) else {
            tracing::trace!(key, stamp, "stale removal timer ignored");
            return;
        };
        state.timers.remove(key);
        state.handle_for(key, generation)
    };
    if let Some(handle) = handle {
        tracing::debug!(key, "removal timer fired");
        handle.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, BoardConfig};
    use crate::message::scheduler::ManualScheduler;

    struct Fixture {
        clock: Arc<ManualScheduler>,
        board: Board,
        manager: MessageManager,
    }

    fn fixture_with(leave: Duration) -> Fixture {
        let clock = Arc::new(ManualScheduler::new());
        let board = Board::new(
            clock.clone(),
            BoardConfig {
                leave_duration: leave,
                ..BoardConfig::default()
            },
        );
        let manager = MessageManager::new(
            Arc::new(board.clone()),
            clock.clone(),
            ManagerConfig::default(),
        );
        Fixture {
            clock,
            board,
            manager,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Duration::from_millis(300))
    }

    #[test]
    fn keyed_shows_keep_one_record_per_key() {
        let f = fixture();
        for i in 0..10 {
            f.manager.info(format!("step {i}"), MessageOptions::keyed("k"));
        }
        assert_eq!(f.manager.active_count(), 1);
        assert_eq!(f.board.len(), 1);
        assert_eq!(f.board.created_count(), 1);
        assert_eq!(f.manager.pending_removals(), 1);
    }

    #[test]
    fn second_show_updates_in_place() {
        let f = fixture();
        let first = f.manager.loading("saving…", MessageOptions::keyed("save"));
        f.clock.advance_ms(200);
        let second = f.manager.success("saved", MessageOptions::keyed("save"));

        assert_eq!(first.id(), second.id());
        let visible = f.board.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].kind, MessageKind::Success);
        assert_eq!(visible[0].content, Content::from("saved"));

        let record = f.manager.record("save").unwrap();
        assert_eq!(record.kind, MessageKind::Success);
        assert_eq!(record.widget_id, first.id());
    }

    #[test]
    fn save_scenario_dismisses_five_seconds_after_last_show() {
        let f = fixture();
        f.manager.loading("saving…", MessageOptions::keyed("save"));
        f.clock.advance_ms(200);
        f.manager.success("saved", MessageOptions::keyed("save"));

        // The first show's deadline (5000ms) passes without effect.
        f.clock.advance_ms(4999);
        assert!(!f.board.visible()[0].leaving);
        f.clock.advance_ms(1);
        assert!(f.board.visible()[0].leaving);
        assert_eq!(f.board.dismissed_count(), 1);

        // Still indexed until the exit transition completes.
        assert!(f.manager.is_active("save"));
        f.clock.advance_ms(300);
        assert!(!f.manager.is_active("save"));
        assert_eq!(f.board.len(), 0);
        assert_eq!(f.board.created_count(), 1);
    }

    #[test]
    fn refreshing_within_duration_never_dismisses() {
        let f = fixture();
        let opts = || MessageOptions::keyed("progress").duration_ms(5000);
        for i in 0..20 {
            f.manager.loading(format!("{i}%"), opts());
            f.clock.advance_ms(1000);
            assert_eq!(f.board.dismissed_count(), 0);
        }
        // Last show was at t=19000; 1000ms already passed.
        f.clock.advance_ms(3999);
        assert_eq!(f.board.dismissed_count(), 0);
        f.clock.advance_ms(1);
        assert_eq!(f.board.dismissed_count(), 1);
        f.clock.advance_ms(10_000);
        assert_eq!(f.board.dismissed_count(), 1);
        assert_eq!(f.manager.active_count(), 0);
    }

    #[test]
    fn destroy_without_record_is_noop() {
        let f = fixture();
        f.manager.info("other", MessageOptions::keyed("other"));
        assert!(!f.manager.destroy("missing"));
        f.clock.advance_ms(1000);
        assert_eq!(f.board.dismissed_count(), 0);
        assert!(f.manager.is_active("other"));
    }

    #[test]
    fn destroy_dismisses_after_delay() {
        let f = fixture();
        f.manager.loading("working", MessageOptions::keyed("job"));
        assert!(f.manager.destroy("job"));
        f.clock.advance_ms(199);
        assert_eq!(f.board.dismissed_count(), 0);
        f.clock.advance_ms(1);
        assert_eq!(f.board.dismissed_count(), 1);
        f.clock.advance_ms(300);
        assert!(!f.manager.is_active("job"));
        assert_eq!(f.manager.pending_removals(), 0);
    }

    #[test]
    fn keys_do_not_interfere() {
        let f = fixture();
        f.manager.info("a1", MessageOptions::keyed("a"));
        f.clock.advance_ms(3000);
        f.manager.info("b1", MessageOptions::keyed("b"));
        f.manager.destroy("a");
        f.clock.advance_ms(500);
        assert!(!f.manager.is_active("a"));
        assert!(f.manager.is_active("b"));

        f.manager.warning("b2", MessageOptions::keyed("b"));
        let b = f.manager.record("b").unwrap();
        assert_eq!(b.content, Content::from("b2"));
        assert_eq!(f.manager.active_keys(), vec!["b".to_string()]);
    }

    #[test]
    fn anonymous_shows_are_independent() {
        let f = fixture();
        let first = f.manager.info("hello", MessageOptions::new());
        let second = f.manager.info("hello", MessageOptions::new());
        assert_ne!(first.id(), second.id());
        assert_eq!(f.board.len(), 2);
        assert_eq!(f.manager.active_count(), 0);
        assert_eq!(f.manager.pending_removals(), 0);

        // Board default auto-hide applies.
        f.clock.advance_ms(3000);
        assert_eq!(f.board.dismissed_count(), 2);
    }

    #[test]
    fn anonymous_duration_is_forwarded() {
        let f = fixture();
        f.manager
            .error("boom", MessageOptions::new().duration_ms(100).with("closable", true));
        let visible = f.board.visible();
        assert_eq!(visible[0].auto_hide, AutoHide::After(Duration::from_millis(100)));
        assert_eq!(visible[0].extra["closable"], serde_json::Value::Bool(true));
    }

    #[test]
    fn keyed_widgets_never_auto_hide_on_their_own() {
        let f = fixture();
        f.manager.info("x", MessageOptions::keyed("x").with("closable", true));
        let visible = f.board.visible();
        assert_eq!(visible[0].auto_hide, AutoHide::Never);
        assert!(visible[0].extra.contains_key("closable"));
        assert!(!visible[0].extra.contains_key("duration"));
    }

    #[test]
    fn show_during_exit_keeps_updating_leaving_widget() {
        let f = fixture();
        f.manager.info("first", MessageOptions::keyed("k").duration_ms(100));
        f.clock.advance_ms(100);
        assert!(f.board.visible()[0].leaving);

        // Record is still indexed while leaving, so this updates it.
        f.manager.success("second", MessageOptions::keyed("k"));
        assert_eq!(f.board.created_count(), 1);
        f.clock.advance_ms(300);
        assert!(!f.manager.is_active("k"));
        assert_eq!(f.manager.pending_removals(), 0);

        f.manager.info("third", MessageOptions::keyed("k"));
        assert_eq!(f.board.created_count(), 2);
    }

    #[test]
    fn stale_destroy_does_not_touch_newer_record() {
        let f = fixture_with(Duration::ZERO);
        f.manager.info("old", MessageOptions::keyed("k").duration_ms(50));
        // Queued before the old record leaves.
        assert!(f.manager.destroy_after("k", Duration::from_millis(500)));
        f.clock.advance_ms(50);
        assert!(!f.manager.is_active("k"));

        f.manager.info("new", MessageOptions::keyed("k"));
        let generation = f.manager.record("k").unwrap().generation;
        f.clock.advance_ms(600);
        let record = f.manager.record("k").unwrap();
        assert_eq!(record.generation, generation);
        assert_eq!(f.board.dismissed_count(), 1);
    }

    #[test]
    fn huge_duration_keeps_slot_until_destroyed() {
        let f = fixture();
        f.manager.info("pinned", MessageOptions::keyed("k").duration(Duration::MAX));
        f.clock.advance_ms(1000);
        f.manager.success("still pinned", MessageOptions::keyed("k").duration(Duration::MAX));
        f.clock.advance(Duration::from_secs(86_400));
        assert!(f.manager.is_active("k"));
        assert_eq!(f.manager.pending_removals(), 1);
        assert_eq!(f.board.dismissed_count(), 0);

        // A later finite show still rearms a working timer.
        f.manager.success("done", MessageOptions::keyed("k").duration_ms(100));
        assert_eq!(f.manager.pending_removals(), 1);
        f.clock.advance_ms(100);
        assert_eq!(f.board.dismissed_count(), 1);

        f.manager.info("again", MessageOptions::keyed("j").duration(Duration::MAX));
        assert!(f.manager.destroy("j"));
        f.clock.advance_ms(200);
        assert_eq!(f.board.dismissed_count(), 2);
    }

    /// Reports every cancel as too late while leaving the job queued, like a
    /// timer whose job is already running on another thread.
    struct LateCancel(Arc<ManualScheduler>);

    impl Scheduler for LateCancel {
        fn schedule(&self, delay: Duration, job: crate::message::scheduler::Job) -> TimerId {
            self.0.schedule(delay, job)
        }

        fn cancel(&self, _id: TimerId) -> bool {
            false
        }
    }

    #[test]
    fn superseded_timer_that_still_fires_is_ignored() {
        let clock = Arc::new(ManualScheduler::new());
        let board = Board::new(clock.clone(), BoardConfig::default());
        let manager = MessageManager::new(
            Arc::new(board.clone()),
            Arc::new(LateCancel(clock.clone())),
            ManagerConfig::default(),
        );
        manager.loading("saving…", MessageOptions::keyed("save"));
        clock.advance_ms(1000);
        manager.success("saved", MessageOptions::keyed("save"));

        // The first timer runs at t=5000 but its stamp is stale.
        clock.advance_ms(4000);
        assert_eq!(board.dismissed_count(), 0);
        assert!(manager.is_active("save"));
        assert_eq!(manager.pending_removals(), 1);

        clock.advance_ms(999);
        assert_eq!(board.dismissed_count(), 0);
        clock.advance_ms(1);
        assert_eq!(board.dismissed_count(), 1);
        assert_eq!(manager.pending_removals(), 0);
    }

    #[test]
    fn default_duration_comes_from_config() {
        let clock = Arc::new(ManualScheduler::new());
        let board = Board::new(clock.clone(), BoardConfig::default());
        let manager = MessageManager::new(
            Arc::new(board.clone()),
            clock.clone(),
            ManagerConfig {
                default_duration: Duration::from_millis(750),
                ..ManagerConfig::default()
            },
        );
        manager.info("short", MessageOptions::keyed("k"));
        clock.advance_ms(749);
        assert_eq!(board.dismissed_count(), 0);
        clock.advance_ms(1);
        assert_eq!(board.dismissed_count(), 1);
    }

    #[test]
    fn builder_requires_renderer() {
        let err = MessageManager::builder()
            .scheduler(Arc::new(ManualScheduler::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingRenderer));
    }

    #[test]
    fn history_file_records_shows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.log");
        let clock = Arc::new(ManualScheduler::new());
        let board = Board::new(clock.clone(), BoardConfig::default());
        let manager = MessageManager::builder()
            .renderer(Arc::new(board))
            .scheduler(clock)
            .config(ManagerConfig {
                history_file: Some(path.clone()),
                ..ManagerConfig::default()
            })
            .build()
            .unwrap();
        manager.success("saved", MessageOptions::keyed("save"));
        manager.info("hi", MessageOptions::new());
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[success] save: saved"));
        assert!(lines[1].ends_with("[info] -: hi"));
    }
}
