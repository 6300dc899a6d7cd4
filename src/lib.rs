pub mod board;
pub mod dialog;
pub mod error;
pub mod gui;
pub mod logging;
pub mod message;
pub mod settings;
pub mod toast_log;

pub use error::{Error, Result};
pub use message::{Content, MessageKind, MessageManager, MessageOptions};

use board::{Board, BoardConfig};
use message::{ManagerConfig, Scheduler};
use settings::Settings;
use std::sync::Arc;

/// Builds a board and a manager rendering into it from `settings`, sharing
/// `scheduler`.
pub fn board_manager(settings: &Settings, scheduler: Arc<dyn Scheduler>) -> (Board, MessageManager) {
    let board = Board::new(scheduler.clone(), BoardConfig::from(&settings.board));
    let manager = MessageManager::new(
        Arc::new(board.clone()),
        scheduler,
        ManagerConfig::from(&settings.messages),
    );
    (board, manager)
}
