//! Terminal Narrative: the narrative core of a typewriter-style hacker
//! terminal.
//!
//! Loads a static scene graph, types narrative text out one character at a
//! time and tracks scene selection, narrative advancement and history-based
//! backtracking through an explicit state machine. Rendering is left to the
//! host; see the `terminal-narrative-wasm` crate for the browser bridge.

pub mod core;
pub mod schema;
