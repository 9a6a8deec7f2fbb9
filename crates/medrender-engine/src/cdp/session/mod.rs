//! CDP page session for interacting with a single page.

mod content;
mod core;
mod js;
mod network;
mod print;

pub use self::core::PageSession;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
