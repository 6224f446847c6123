//! Run state management.
//!
//! This module provides the copy-with-changes transitions applied to a
//! [`RunState`](mg_protocol::RunState) as it moves through the pipeline.

pub mod run;
