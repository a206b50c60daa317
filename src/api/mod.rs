//! REST client for the lecture server
//!
//! Snapshot endpoints used by the CLI subcommands; the live feed goes
//! through the push channel in `net`.

pub mod lecture;

pub use lecture::{LectureClient, LectureError};
