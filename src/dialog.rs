//! Confirm dialogs with the application's default buttons filled in.

use crate::message::Content;
use crate::settings::DialogSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogKind {
    Info,
    Success,
    #[default]
    Warning,
    Error,
}

pub type DialogAction = Arc<dyn Fn() + Send + Sync>;

/// What the caller asks for. Every `Some` field overrides the filled default.
#[derive(Clone, Default)]
pub struct ConfirmOptions {
    pub kind: Option<DialogKind>,
    pub title: Option<String>,
    pub content: Option<Content>,
    pub show_icon: Option<bool>,
    pub positive_text: Option<String>,
    pub negative_text: Option<String>,
    pub on_confirm: Option<DialogAction>,
    pub on_cancel: Option<DialogAction>,
}

impl ConfirmOptions {
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: DialogKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn on_confirm(mut self, action: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_confirm = Some(Arc::new(action));
        self
    }

    #[must_use]
    pub fn on_cancel(mut self, action: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Arc::new(action));
        self
    }
}

/// Fully resolved dialog handed to the renderer.
#[derive(Clone)]
pub struct DialogProps {
    pub kind: DialogKind,
    pub title: Option<String>,
    pub content: Option<Content>,
    pub show_icon: bool,
    pub positive_text: String,
    pub negative_text: String,
    pub on_positive_click: Option<DialogAction>,
    pub on_negative_click: Option<DialogAction>,
    /// Clicking outside the dialog counts as cancel.
    pub on_mask_click: Option<DialogAction>,
}

impl std::fmt::Debug for DialogProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogProps")
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("content", &self.content)
            .field("show_icon", &self.show_icon)
            .field("positive_text", &self.positive_text)
            .field("negative_text", &self.negative_text)
            .finish_non_exhaustive()
    }
}

pub trait DialogRenderer {
    type Handle;

    fn open(&self, props: DialogProps) -> Self::Handle;
}

/// Resolves `options` against `defaults` without opening anything.
pub fn confirm_props(options: ConfirmOptions, defaults: &DialogSettings) -> DialogProps {
    let show_icon = options.show_icon.unwrap_or(options.title.is_some());
    DialogProps {
        kind: options.kind.unwrap_or_default(),
        show_icon,
        positive_text: options
            .positive_text
            .unwrap_or_else(|| defaults.positive_text.clone()),
        negative_text: options
            .negative_text
            .unwrap_or_else(|| defaults.negative_text.clone()),
        on_positive_click: options.on_confirm,
        on_negative_click: options.on_cancel.clone(),
        on_mask_click: options.on_cancel,
        title: options.title,
        content: options.content,
    }
}

/// Opens a confirm dialog with default buttons and icon visibility filled in.
pub fn confirm<R: DialogRenderer>(
    renderer: &R,
    options: ConfirmOptions,
    defaults: &DialogSettings,
) -> R::Handle {
    let props = confirm_props(options, defaults);
    tracing::debug!(kind = ?props.kind, title = ?props.title, "opening confirm dialog");
    renderer.open(props)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        opened: Mutex<Vec<DialogProps>>,
    }

    impl DialogRenderer for Recorder {
        type Handle = usize;

        fn open(&self, props: DialogProps) -> usize {
            let mut opened = self.opened.lock().unwrap();
            opened.push(props);
            opened.len()
        }
    }

    #[test]
    fn fills_defaults() {
        let recorder = Recorder::default();
        let handle = confirm(
            &recorder,
            ConfirmOptions::new("Delete this holding?"),
            &DialogSettings::default(),
        );
        assert_eq!(handle, 1);
        let opened = recorder.opened.lock().unwrap();
        let props = &opened[0];
        assert_eq!(props.kind, DialogKind::Warning);
        assert!(!props.show_icon);
        assert_eq!(props.positive_text, "OK");
        assert_eq!(props.negative_text, "Cancel");
    }

    #[test]
    fn title_enables_icon_and_overrides_win() {
        let mut options = ConfirmOptions::new("body").title("Heads up").kind(DialogKind::Error);
        options.positive_text = Some("Delete".into());
        options.show_icon = Some(false);
        let props = confirm_props(options, &DialogSettings::default());
        assert_eq!(props.kind, DialogKind::Error);
        assert!(!props.show_icon);
        assert_eq!(props.positive_text, "Delete");
        assert_eq!(props.negative_text, "Cancel");

        let props = confirm_props(ConfirmOptions::new("b").title("t"), &DialogSettings::default());
        assert!(props.show_icon);
    }

    #[test]
    fn cancel_handles_negative_and_mask_clicks() {
        let confirmed = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicUsize::new(0));
        let (c, x) = (confirmed.clone(), cancelled.clone());
        let props = confirm_props(
            ConfirmOptions::new("sure?")
                .on_confirm(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .on_cancel(move || {
                    x.fetch_add(1, Ordering::SeqCst);
                }),
            &DialogSettings::default(),
        );
        (props.on_positive_click.unwrap())();
        (props.on_negative_click.unwrap())();
        (props.on_mask_click.unwrap())();
        assert_eq!(confirmed.load(Ordering::SeqCst), 1);
        assert_eq!(cancelled.load(Ordering::SeqCst), 2);
    }
}
