use crate::board::{Board, WidgetSnapshot};
use crate::message::MessageKind;
use crate::settings::{BoardSettings, Placement};
use egui::{Align2, Color32, Context, Frame, Id, Order, RichText, Ui};
use std::time::Duration;

const EDGE_MARGIN: f32 = 10.0;
const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

fn accent(kind: MessageKind) -> Color32 {
    match kind {
        MessageKind::Loading => Color32::from_rgb(0x31, 0x6C, 0x72),
        MessageKind::Success => Color32::from_rgb(0x18, 0xA0, 0x58),
        MessageKind::Error => Color32::from_rgb(0xD0, 0x30, 0x50),
        MessageKind::Info => Color32::from_rgb(0x20, 0x80, 0xF0),
        MessageKind::Warning => Color32::from_rgb(0xF0, 0xA0, 0x20),
    }
}

fn glyph(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Loading => "…",
        MessageKind::Success => "✔",
        MessageKind::Error => "✖",
        MessageKind::Info => "ℹ",
        MessageKind::Warning => "⚠",
    }
}

/// Anchor and offset of the board for `settings`.
pub fn anchor(settings: &BoardSettings) -> (Align2, [f32; 2]) {
    let bottom = -settings.margin_bottom.max(0.0);
    match settings.placement {
        Placement::Top => (Align2::CENTER_TOP, [0.0, EDGE_MARGIN]),
        Placement::TopLeft => (Align2::LEFT_TOP, [EDGE_MARGIN, EDGE_MARGIN]),
        Placement::TopRight => (Align2::RIGHT_TOP, [-EDGE_MARGIN, EDGE_MARGIN]),
        Placement::Bottom => (Align2::CENTER_BOTTOM, [0.0, bottom]),
        Placement::BottomLeft => (Align2::LEFT_BOTTOM, [EDGE_MARGIN, bottom]),
        Placement::BottomRight => (Align2::RIGHT_BOTTOM, [-EDGE_MARGIN, bottom]),
    }
}

fn widget_row(ui: &mut Ui, widget: &WidgetSnapshot) -> bool {
    let mut close = false;
    Frame::popup(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            if widget.kind == MessageKind::Loading {
                ui.spinner();
            } else {
                ui.colored_label(accent(widget.kind), glyph(widget.kind));
            }
            let text = RichText::new(widget.content.to_string());
            if widget.leaving {
                ui.label(text.weak());
            } else {
                ui.label(text);
            }
            let closable = widget
                .extra
                .get("closable")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if closable && !widget.leaving && ui.small_button("✕").clicked() {
                close = true;
            }
        });
    });
    close
}

/// Draws the board's widgets in the configured corner. Call once per frame.
pub fn show_board(ctx: &Context, board: &Board, settings: &BoardSettings) {
    let widgets = board.visible();
    if widgets.is_empty() {
        return;
    }
    let (align, offset) = anchor(settings);
    let mut closed = Vec::new();
    egui::Area::new(Id::new("keyed_messages_board"))
        .anchor(align, offset)
        .order(Order::Foreground)
        .show(ctx, |ui| {
            for widget in &widgets {
                if widget_row(ui, widget) {
                    closed.push(widget.id);
                }
            }
        });
    for id in closed {
        board.dismiss(id);
    }
    ctx.request_repaint_after(REPAINT_INTERVAL);
}
