use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;

use sf_directive::{
    ColumnInfo, CommandRegistry, DataSource, Directive, DirectiveCache, EvalError, exec, parse, run,
};
use sf_indicators::builtin_registry;

use crate::error::FrameError;

/// A table of equally long `f64` columns that evaluates directives.
///
/// Input columns and computed columns live side by side; a computed column
/// is stored under the canonical string of its directive together with a
/// [`ColumnInfo`] telling how many leading rows are still valid.
#[derive(Debug, Clone)]
pub struct StockFrame {
    pub(crate) len: usize,
    pub(crate) columns: BTreeMap<String, Vec<f64>>,
    pub(crate) infos: BTreeMap<String, ColumnInfo>,
    pub(crate) aliases: BTreeMap<String, String>,
    pub(crate) directives: DirectiveCache,
    pub(crate) registry: Arc<CommandRegistry>,
}

impl Default for StockFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl StockFrame {
    /// An empty frame resolving directives against the builtin commands.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(builtin_registry())
    }

    #[must_use]
    pub fn with_registry(registry: Arc<CommandRegistry>) -> Self {
        Self {
            len: 0,
            columns: BTreeMap::new(),
            infos: BTreeMap::new(),
            aliases: BTreeMap::new(),
            directives: DirectiveCache::new(),
            registry,
        }
    }

    pub fn from_columns<I, K>(columns: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = (K, Vec<f64>)>,
        K: Into<String>,
    {
        let mut frame = Self::new();
        for (name, values) in columns {
            let name = name.into();
            if frame.columns.contains_key(&name) {
                return Err(FrameError::DuplicateColumn(name));
            }
            frame.set_column(name, values)?;
        }
        Ok(frame)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Input and computed column names, in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// A stored column, following aliases. Computed columns are returned as
    /// stored; use [`StockFrame::get`] to bring them up to date first.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(self.resolve(name)).map(Vec::as_slice)
    }

    /// Metadata of a computed column, keyed by canonical directive.
    #[must_use]
    pub fn column_info(&self, key: &str) -> Option<&ColumnInfo> {
        self.infos.get(key)
    }

    /// Inserts or replaces an input column.
    ///
    /// Computed columns that read `name`, directly or through an alias,
    /// are dropped.
    pub fn set_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), FrameError> {
        let name = self.resolve(&name.into()).to_owned();
        if self.columns.is_empty() {
            self.len = values.len();
        } else if values.len() != self.len {
            return Err(FrameError::LengthMismatch {
                name,
                expected: self.len,
                actual: values.len(),
            });
        }

        let spellings = self.spellings(&name);
        self.infos.remove(&name);
        self.remove_dependents(&spellings);
        self.columns.insert(name, values);
        Ok(())
    }

    /// Makes `as_name` read the same data as the existing input column
    /// `src_name`. Computed columns cannot be aliased.
    pub fn alias(
        &mut self,
        as_name: impl Into<String>,
        src_name: impl Into<String>,
    ) -> Result<(), FrameError> {
        let as_name = as_name.into();
        let src_name = src_name.into();
        if self.columns.contains_key(&as_name) || self.aliases.contains_key(&as_name) {
            return Err(FrameError::DuplicateColumn(as_name));
        }
        if self.infos.contains_key(&src_name) {
            return Err(FrameError::ComputedColumn(src_name));
        }
        if !self.columns.contains_key(&src_name) {
            return Err(FrameError::UnknownColumn(src_name));
        }

        self.aliases.insert(as_name, src_name);
        Ok(())
    }

    /// Parses `directive` through the frame's directive cache.
    pub fn parse(&mut self, directive: &str) -> Result<Arc<Directive>, FrameError> {
        Ok(parse(directive, &mut self.directives, &self.registry)?)
    }

    /// Evaluates `directive` and stores the result as a column named by
    /// its canonical string. Rows appended since the last evaluation are
    /// computed incrementally.
    pub fn exec(&mut self, directive: &str) -> Result<Vec<f64>, FrameError> {
        let directive = self.parse(directive)?;
        Ok(exec(self, &directive)?)
    }

    /// Evaluates `directive` over every row without storing a column.
    pub fn calc(&mut self, directive: &str) -> Result<Vec<f64>, FrameError> {
        let directive = self.parse(directive)?;
        let key = directive.to_string();
        if let Some((values, info)) = self.cached_column(&key)
            && info.size == self.len
            && *info.directive == *directive
        {
            return Ok(values.to_vec());
        }

        Ok(run(&directive, self, 0..self.len)?.0)
    }

    /// An input column or alias when `key` names one, otherwise the result
    /// of executing `key` as a directive.
    pub fn get(&mut self, key: &str) -> Result<Vec<f64>, FrameError> {
        let name = self.resolve(key);
        if !self.infos.contains_key(name)
            && let Some(values) = self.columns.get(name)
        {
            return Ok(values.clone());
        }
        self.exec(key)
    }

    pub(crate) fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    pub(crate) fn is_input(&self, name: &str) -> bool {
        self.columns.contains_key(name) && !self.infos.contains_key(name)
    }

    /// `name` and every alias pointing at it.
    pub(crate) fn spellings(&self, name: &str) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .aliases
            .iter()
            .filter(|(_, target)| *target == name)
            .map(|(alias, _)| alias.clone())
            .collect();
        names.insert(name.to_owned());
        names
    }

    /// Drops every computed column whose directive reads one of `names`.
    pub(crate) fn remove_dependents(&mut self, names: &BTreeSet<String>) {
        let stale: Vec<String> = self
            .infos
            .iter()
            .filter(|(_, info)| !info.directive.columns().is_disjoint(names))
            .map(|(key, _)| key.clone())
            .collect();

        #[cfg(feature = "tracing")]
        if !stale.is_empty() {
            tracing::debug!(columns = ?names, dropped = stale.len(), "dropped dependent computed columns");
        }

        for key in stale {
            self.infos.remove(&key);
            self.columns.remove(&key);
        }
    }
}

impl DataSource for StockFrame {
    fn row_count(&self) -> usize {
        self.len
    }

    fn series(&self, name: &str, range: Range<usize>) -> Result<&[f64], EvalError> {
        let values = self
            .columns
            .get(self.resolve(name))
            .ok_or_else(|| EvalError::UnknownSeries(name.to_owned()))?;
        values.get(range.clone()).ok_or(EvalError::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            len: values.len(),
        })
    }

    fn cached_column(&self, key: &str) -> Option<(&[f64], &ColumnInfo)> {
        let info = self.infos.get(key)?;
        let values = self.columns.get(key)?;
        Some((values.as_slice(), info))
    }

    /// A directive whose canonical string names an input column or an
    /// alias is evaluated but never stored.
    fn set_cached_column(&mut self, key: &str, values: Vec<f64>, info: ColumnInfo) {
        if self.is_input(key) || self.aliases.contains_key(key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(key, "computed column not stored over an input column");
            return;
        }
        self.columns.insert(key.to_owned(), values);
        self.infos.insert(key.to_owned(), info);
    }
}
