#![warn(clippy::all)]

mod config;
mod response;
mod server;
mod store;

pub use crate::{config::*, response::*, server::*, store::*};
