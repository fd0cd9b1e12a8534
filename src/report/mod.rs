//! Check-run output rendering.

pub mod generator;

pub use generator::{render_json, render_output};
