//! Shared utilities

pub mod helpers;

pub use helpers::{export_file_name, is_aws_url};
