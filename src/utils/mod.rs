//! Shared helpers with no project state.

pub mod date;
pub mod html;
pub mod mime;
pub mod path;
