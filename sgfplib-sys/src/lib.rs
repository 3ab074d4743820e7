#![warn(clippy::all)]

mod bindings;
mod library;

pub use bindings::*;
pub use library::*;
