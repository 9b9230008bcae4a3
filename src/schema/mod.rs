//! Story data model: scenes, choices and the authored document shapes.

pub mod document;
pub mod scene;
