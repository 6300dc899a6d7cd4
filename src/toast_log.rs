use crate::message::{Content, MessageKind};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Appends one line per shown message: timestamp, kind, key (`-` when
/// anonymous) and content.
pub fn append_message_log(path: &Path, kind: MessageKind, key: Option<&str>, content: &Content) {
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| {
            writeln!(
                file,
                "{} - [{}] {}: {}",
                Local::now().to_rfc3339(),
                kind,
                key.unwrap_or("-"),
                content
            )
        });
    if let Err(e) = result {
        tracing::warn!("failed to append to message log {}: {e}", path.display());
    }
}
