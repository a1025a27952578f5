//! External JSON text for records.
//!
//! The transcoder itself works on [`ExternalRecord`](crate::ExternalRecord)
//! values; this module is the thin layer turning them into and out of the
//! JSON text served to clients.

pub mod reader;
pub mod render;

pub use reader::{parse_record, JsonReader};
pub use render::{render_record, JsonRenderer};
