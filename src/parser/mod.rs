//! Parsing of page text, colors and selectors

pub mod account_number;
pub mod color;
pub mod selector;

pub use selector::{Selector, SelectorError};
