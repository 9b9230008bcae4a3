//! Runtime: story repository, typewriter, navigation and the terminal runner.

pub mod archive;
pub mod config;
pub mod navigation;
pub mod story;
pub mod terminal;
pub mod typewriter;
