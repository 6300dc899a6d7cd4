//! Transient message lifecycle: severities, options, the renderer seam, the
//! scheduler and the keyed manager itself.

pub mod global;
mod kind;
mod manager;
mod options;
mod render;
pub mod scheduler;

pub use kind::MessageKind;
pub use manager::{ManagerConfig, MessageManager, MessageManagerBuilder, RecordSnapshot};
pub use options::MessageOptions;
pub use render::{AutoHide, Content, Handle, LeaveCallback, MessageHandle, RenderOptions, Renderer};
pub use scheduler::{ManualScheduler, Scheduler, ThreadScheduler, TimerId};
