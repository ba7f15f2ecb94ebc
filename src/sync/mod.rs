//! Markdown value synchronization
//!
//! Keeps an external markdown string and a live document tree in step
//! without feedback loops.

mod controller;
mod session;

pub use controller::{
    ChangeCallback, CommonMarkCodec, DocumentHost, FocusPolicy, Inbound, MarkdownCodec, Outbound,
    SyncController,
};
pub use session::{EditorSession, SessionHost};
