use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use sf_types::ArgValue;

use crate::operator::Operator;
use crate::registry::{ArgSpecKind, CommandPreset};

/// A parsed directive: a command, optionally combined with an operand.
///
/// `Display` prints the canonical form, which parses back to an equal
/// directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub command: Command,
    pub operation: Option<(Operator, Operand)>,
}

/// A command resolved against the registry. `args` has exactly one entry
/// per schema slot of `preset`, defaults filled in.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub sub: Option<String>,
    pub args: Vec<Argument>,
    pub preset: Arc<CommandPreset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub value: ArgumentValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Scalar(ArgValue),
    Nested(Arc<Directive>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Command(Command),
}

impl Directive {
    /// Rows before the first requested row needed to compute it exactly.
    #[must_use]
    pub fn lookback(&self) -> usize {
        let left = self.command.lookback();
        match &self.operation {
            None => left,
            Some((operator, operand)) => left
                .max(operand.lookback())
                .saturating_add(operator.extra_lookback()),
        }
    }

    /// Names of the input columns read by the directive, nested
    /// directives included.
    #[must_use]
    pub fn columns(&self) -> BTreeSet<String> {
        let mut columns = BTreeSet::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns(&self, columns: &mut BTreeSet<String>) {
        self.command.collect_columns(columns);
        if let Some((_, Operand::Command(command))) = &self.operation {
            command.collect_columns(columns);
        }
    }
}

impl Command {
    /// `name` or `name.sub`.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.sub {
            Some(sub) => format!("{}.{sub}", self.name),
            None => self.name.clone(),
        }
    }

    /// Scalar parameters in schema order.
    #[must_use]
    pub fn params(&self) -> Vec<ArgValue> {
        self.slots()
            .filter(|(kind, _)| *kind == ArgSpecKind::Param)
            .filter_map(|(_, arg)| match &arg.value {
                ArgumentValue::Scalar(value) => Some(value.clone()),
                ArgumentValue::Nested(_) => None,
            })
            .collect()
    }

    /// Input series in schema order.
    pub fn series(&self) -> impl Iterator<Item = &ArgumentValue> {
        self.slots()
            .filter(|(kind, _)| *kind == ArgSpecKind::Series)
            .map(|(_, arg)| &arg.value)
    }

    #[must_use]
    pub fn lookback(&self) -> usize {
        let nested = self
            .series()
            .filter_map(|value| match value {
                ArgumentValue::Nested(directive) => Some(directive.lookback()),
                ArgumentValue::Scalar(_) => None,
            })
            .max()
            .unwrap_or(0);

        self.preset.lookback(&self.params()).saturating_add(nested)
    }

    fn collect_columns(&self, columns: &mut BTreeSet<String>) {
        for value in self.series() {
            match value {
                ArgumentValue::Scalar(name) => {
                    columns.insert(name.to_string());
                }
                ArgumentValue::Nested(directive) => directive.collect_columns(columns),
            }
        }
    }

    fn slots(&self) -> impl Iterator<Item = (ArgSpecKind, &Argument)> {
        self.preset
            .args()
            .iter()
            .map(|spec| spec.kind)
            .zip(&self.args)
    }

    /// Arguments that make it into the canonical string: trailing series
    /// left at their default are implied.
    fn printed_args(&self) -> &[Argument] {
        let specs = self.preset.args();
        let mut end = self.args.len();
        while end > 0 {
            let spec = &specs[end - 1];
            let implied = spec.kind == ArgSpecKind::Series
                && matches!(
                    (&self.args[end - 1].value, &spec.default),
                    (ArgumentValue::Scalar(value), Some(default)) if value == default
                );
            if !implied {
                break;
            }
            end -= 1;
        }
        &self.args[..end]
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.sub == other.sub
            && self.args == other.args
            && Arc::ptr_eq(&self.preset, &other.preset)
    }
}

impl Argument {
    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(self.value, ArgumentValue::Nested(_))
    }
}

impl Operand {
    #[must_use]
    pub fn lookback(&self) -> usize {
        match self {
            Self::Number(_) => 0,
            Self::Command(command) => command.lookback(),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        if let Some((operator, operand)) = &self.operation {
            write!(f, "{operator}{operand}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(sub) = &self.sub {
            write!(f, ".{sub}")?;
        }

        let args = self.printed_args();
        if !args.is_empty() {
            f.write_str(":")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{arg}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            ArgumentValue::Scalar(value) => write!(f, "{value}"),
            ArgumentValue::Nested(directive) => write!(f, "({directive})"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Command(command) => write!(f, "{command}"),
        }
    }
}
