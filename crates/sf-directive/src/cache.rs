use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{ArgumentValue, Command, Directive, Operand};

/// Memoized directives keyed by source text and by canonical string.
///
/// Entries are never evicted or replaced, so a key keeps resolving to the
/// same `Arc` for the lifetime of the cache. Clones share the directives.
#[derive(Debug, Clone, Default)]
pub struct DirectiveCache {
    entries: HashMap<String, Arc<Directive>>,
}

impl DirectiveCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<Directive>> {
        self.entries.get(key).cloned()
    }

    /// Stores `directive` under `key` unless the key is taken, and returns
    /// whichever directive the key now resolves to.
    pub fn set(&mut self, key: impl Into<String>, directive: Arc<Directive>) -> Arc<Directive> {
        Arc::clone(self.entries.entry(key.into()).or_insert(directive))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers `directive` and every nested directive under their
    /// canonical strings.
    pub(crate) fn intern(&mut self, directive: Arc<Directive>) -> Arc<Directive> {
        self.intern_command(&directive.command);
        if let Some((_, Operand::Command(command))) = &directive.operation {
            self.intern_command(command);
        }

        let canonical = directive.to_string();
        self.set(canonical, directive)
    }

    fn intern_command(&mut self, command: &Command) {
        for arg in &command.args {
            if let ArgumentValue::Nested(nested) = &arg.value {
                self.intern(Arc::clone(nested));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sf_types::ArgValue;

    use super::DirectiveCache;
    use crate::ast::{Argument, ArgumentValue, Command, Directive};
    use crate::registry::{ArgSpec, CommandPreset};

    fn directive(name: &str, nested: Option<Directive>) -> Directive {
        let preset = Arc::new(CommandPreset::new(
            |_, series| Ok((series[0].to_vec(), 0)),
            |_| 0,
            vec![ArgSpec::series(Some("close"))],
        ));
        let value = match nested {
            Some(inner) => ArgumentValue::Nested(Arc::new(inner)),
            None => ArgumentValue::Scalar(ArgValue::from("close")),
        };

        Directive {
            command: Command {
                name: name.to_owned(),
                sub: None,
                args: vec![Argument { value }],
                preset,
            },
            operation: None,
        }
    }

    #[test]
    fn first_writer_wins() {
        let mut cache = DirectiveCache::new();
        let first = Arc::new(directive("a", None));
        let second = Arc::new(directive("a", None));

        let stored = cache.set("a", Arc::clone(&first));
        assert!(Arc::ptr_eq(&stored, &first));

        let stored = cache.set("a", second);
        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn intern_registers_nested_directives() {
        let mut cache = DirectiveCache::new();
        let outer = Arc::new(directive("outer", Some(directive("inner", None))));

        cache.intern(Arc::clone(&outer));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("inner").is_some());
        let stored = cache.get("outer:(inner)").expect("outer interned");
        assert!(Arc::ptr_eq(&stored, &outer));
    }

    #[test]
    fn clones_share_entries() {
        let mut cache = DirectiveCache::new();
        let stored = cache.set("a", Arc::new(directive("a", None)));

        let copy = cache.clone();
        let shared = copy.get("a").expect("copied entry");
        assert!(Arc::ptr_eq(&stored, &shared));
        assert!(DirectiveCache::new().is_empty());
    }
}
