//! Command-line front end (behind the `cli` feature)

pub mod interactive;

pub use interactive::run_interactive_mode;
