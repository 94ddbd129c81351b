use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sf_types::ArgValue;

use crate::error::{FormulaError, RegistryError};
use crate::operator::{BUILTIN_OPERATORS, Operator};

/// Lookback of formulas whose every row depends on all previous rows
/// (recursive smoothing). Forces a full recomputation on append.
pub const UNBOUNDED_LOOKBACK: usize = usize::MAX;

pub type Coerce = Arc<dyn Fn(&str) -> Result<ArgValue, String> + Send + Sync>;

/// `formula(params, series) -> (values, lookback)`, one value per input row.
pub type Formula =
    Arc<dyn Fn(&[ArgValue], &[&[f64]]) -> Result<(Vec<f64>, usize), FormulaError> + Send + Sync>;

pub type LookbackFn = Arc<dyn Fn(&[ArgValue]) -> usize + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgSpecKind {
    /// A scalar parameter handed to the formula.
    Param,
    /// An input series: a column name or a nested directive.
    Series,
}

#[derive(Clone)]
pub struct ArgSpec {
    pub default: Option<ArgValue>,
    pub coerce: Option<Coerce>,
    pub kind: ArgSpecKind,
}

impl ArgSpec {
    /// A required scalar parameter.
    #[must_use]
    pub fn param() -> Self {
        Self {
            default: None,
            coerce: None,
            kind: ArgSpecKind::Param,
        }
    }

    /// An input series, optionally defaulting to a column name.
    #[must_use]
    pub fn series(default: Option<&str>) -> Self {
        Self {
            default: default.map(ArgValue::from),
            coerce: None,
            kind: ArgSpecKind::Series,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<ArgValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_coerce(
        mut self,
        coerce: impl Fn(&str) -> Result<ArgValue, String> + Send + Sync + 'static,
    ) -> Self {
        self.coerce = Some(Arc::new(coerce));
        self
    }

    pub fn coerce_raw(&self, raw: &str) -> Result<ArgValue, String> {
        match &self.coerce {
            Some(coerce) => coerce(raw),
            None => Ok(ArgValue::from(raw)),
        }
    }
}

impl fmt::Debug for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgSpec")
            .field("default", &self.default)
            .field("coerce", &self.coerce.is_some())
            .field("kind", &self.kind)
            .finish()
    }
}

/// How to compute one command (or sub command).
///
/// The argument schema lists the scalar parameters first and the input
/// series after them.
#[derive(Clone)]
pub struct CommandPreset {
    formula: Formula,
    lookback: LookbackFn,
    args: Vec<ArgSpec>,
}

impl CommandPreset {
    #[must_use]
    pub fn new(
        formula: impl Fn(&[ArgValue], &[&[f64]]) -> Result<(Vec<f64>, usize), FormulaError>
        + Send
        + Sync
        + 'static,
        lookback: impl Fn(&[ArgValue]) -> usize + Send + Sync + 'static,
        args: Vec<ArgSpec>,
    ) -> Self {
        Self {
            formula: Arc::new(formula),
            lookback: Arc::new(lookback),
            args,
        }
    }

    #[must_use]
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    pub fn compute(
        &self,
        params: &[ArgValue],
        series: &[&[f64]],
    ) -> Result<(Vec<f64>, usize), FormulaError> {
        (self.formula)(params, series)
    }

    #[must_use]
    pub fn lookback(&self, params: &[ArgValue]) -> usize {
        (self.lookback)(params)
    }
}

impl fmt::Debug for CommandPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandPreset")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// A named command: a top-level preset, sub commands, or both.
///
/// An alias maps a sub command spelling to a canonical sub command, or to
/// `None` for the top-level preset (`macd.dif` is `macd`).
#[derive(Debug, Clone, Default)]
pub struct CommandDefinition {
    pub preset: Option<Arc<CommandPreset>>,
    pub sub_commands: Option<BTreeMap<String, Arc<CommandPreset>>>,
    pub aliases: Option<BTreeMap<String, Option<String>>>,
}

impl CommandDefinition {
    #[must_use]
    pub fn new(preset: CommandPreset) -> Self {
        Self {
            preset: Some(Arc::new(preset)),
            sub_commands: None,
            aliases: None,
        }
    }

    /// A command that must always be called with a sub command.
    #[must_use]
    pub fn sub_commands_only() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sub_command(mut self, name: impl Into<String>, preset: CommandPreset) -> Self {
        self.sub_commands
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), Arc::new(preset));
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, target: Option<&str>) -> Self {
        self.aliases
            .get_or_insert_with(BTreeMap::new)
            .insert(alias.into(), target.map(str::to_owned));
        self
    }

    #[must_use]
    pub fn sub_command(&self, name: &str) -> Option<&Arc<CommandPreset>> {
        self.sub_commands.as_ref()?.get(name)
    }

    /// `Some(target)` when `name` is an alias.
    #[must_use]
    pub fn alias(&self, name: &str) -> Option<Option<&str>> {
        self.aliases
            .as_ref()?
            .get(name)
            .map(|target| target.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefineMode {
    /// Reject names that are already defined.
    #[default]
    Strict,
    /// Replace an existing definition.
    Overwrite,
}

/// Commands and operators known to the parser.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandDefinition>,
    operators: Vec<Operator>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// A registry without commands, carrying the builtin operator table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
            operators: BUILTIN_OPERATORS.to_vec(),
        }
    }

    pub fn define_command(
        &mut self,
        name: impl Into<String>,
        definition: CommandDefinition,
        mode: DefineMode,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if definition.preset.is_none()
            && definition
                .sub_commands
                .as_ref()
                .is_none_or(BTreeMap::is_empty)
        {
            return Err(RegistryError::EmptyDefinition(name));
        }
        if mode == DefineMode::Strict && self.commands.contains_key(&name) {
            return Err(RegistryError::AlreadyDefined(name));
        }

        self.commands.insert(name, definition);
        Ok(())
    }

    /// Inserts or replaces a definition without validation. Meant for
    /// trusted builtin tables; user code goes through `define_command`.
    pub fn register(&mut self, name: impl Into<String>, definition: CommandDefinition) {
        self.commands.insert(name.into(), definition);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    #[must_use]
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    #[must_use]
    pub fn operator(&self, symbol: &str) -> Option<Operator> {
        self.operators
            .iter()
            .find(|op| op.symbol() == symbol)
            .copied()
    }
}

/// Names must survive the lexer as a single text token without a `.`.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_')
}
