#![allow(clippy::collapsible_if)]
pub mod error;
pub mod rebuild;
pub mod routes;
pub mod state;
