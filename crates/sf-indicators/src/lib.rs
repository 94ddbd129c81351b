#![forbid(unsafe_code)]

//! Builtin indicator commands for the directive language.
//!
//! Every formula is a pure function over whole arrays; the command
//! presets wrap them with an argument schema and a lookback so that the
//! column cache can extend results incrementally.

mod args;
pub mod bands;
pub mod oscillators;
pub mod tools;
pub mod trend;

use std::sync::{Arc, LazyLock};

use sf_directive::CommandRegistry;

static BUILTINS: LazyLock<Arc<CommandRegistry>> =
    LazyLock::new(|| Arc::new(registry_with_builtins()));

/// The process-wide registry holding every builtin command.
#[must_use]
pub fn builtin_registry() -> Arc<CommandRegistry> {
    Arc::clone(&BUILTINS)
}

/// A fresh registry with the builtin commands, free to be extended.
#[must_use]
pub fn registry_with_builtins() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    trend::register(&mut registry);
    bands::register(&mut registry);
    oscillators::register(&mut registry);
    tools::register(&mut registry);
    registry
}
