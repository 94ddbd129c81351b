//! Recursive descent over the directive grammar:
//!
//! ```text
//! directive   := command (operator expression)?
//! command     := NAME ('.' NAME)? (':' arg? (',' arg?)*)?
//! arg         := '(' directive ')' | '-'? SCALAR
//! expression  := '-'? NUMBER | command
//! ```
//!
//! Parsing runs in two passes. The first pass checks the token sequence
//! and keeps locations; the second resolves commands against the registry
//! and coerces arguments. Syntax errors therefore win over value errors.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::ast::{Argument, ArgumentValue, Command, Directive, Operand};
use crate::cache::DirectiveCache;
use crate::error::DirectiveError;
use crate::lexer::{Lexer, Loc, Token};
use crate::operator::Operator;
use crate::registry::{ArgSpecKind, CommandPreset, CommandRegistry};

static SUB_COMMAND_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*").expect("valid regex"));

/// Parses `input`, reusing and filling `cache`.
///
/// The same trimmed text always yields the same `Arc`. Nothing is cached
/// when parsing fails.
pub fn parse(
    input: &str,
    cache: &mut DirectiveCache,
    registry: &CommandRegistry,
) -> Result<Arc<Directive>, DirectiveError> {
    let key = input.trim();
    if let Some(hit) = cache.get(key) {
        #[cfg(feature = "tracing")]
        tracing::trace!(directive = key, "directive cache hit");
        return Ok(hit);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(directive = key, "directive cache miss");

    let directive = parse_uncached(input, registry)?;
    let stored = cache.intern(directive);
    Ok(cache.set(key, stored))
}

pub fn parse_uncached(
    input: &str,
    registry: &CommandRegistry,
) -> Result<Arc<Directive>, DirectiveError> {
    let mut parser = Parser::new(input, registry);
    let syntax = parser.directive()?;
    parser.expect_eof()?;

    parser.resolve_directive(syntax).map(Arc::new)
}

struct SyntaxDirective {
    command: SyntaxCommand,
    operation: Option<(Operator, SyntaxOperand)>,
}

struct SyntaxCommand {
    name: Token,
    args: Vec<Option<SyntaxArg>>,
}

enum SyntaxArg {
    Scalar { raw: String, loc: Loc },
    Nested { directive: Box<SyntaxDirective>, loc: Loc },
}

enum SyntaxOperand {
    Number(f64),
    Command(SyntaxCommand),
}

struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    registry: &'a CommandRegistry,
    token: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, registry: &'a CommandRegistry) -> Self {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token();
        Self {
            input,
            lexer,
            registry,
            token,
        }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.token, next)
    }

    fn syntax_error(&self, message: impl Into<String>, loc: Loc) -> DirectiveError {
        DirectiveError::syntax(self.input, message, loc)
    }

    fn value_error(&self, message: impl Into<String>, loc: Loc) -> DirectiveError {
        DirectiveError::value(self.input, message, loc)
    }

    fn unexpected(&self) -> DirectiveError {
        if self.token.eof {
            self.syntax_error("unexpected EOF", self.token.loc)
        } else {
            self.syntax_error(
                format!("unexpected token \"{}\"", self.token.value),
                self.token.loc,
            )
        }
    }

    fn at_text(&self) -> bool {
        !self.token.special && !self.token.eof
    }

    fn at_operator(&self) -> bool {
        self.token.special && !matches!(self.token.value.as_str(), "(" | ")" | ":" | ",")
    }

    fn at_number(&self) -> bool {
        self.at_text()
            && self
                .token
                .value
                .starts_with(|c: char| c.is_ascii_digit() || c == '.')
    }

    fn expect_eof(&self) -> Result<(), DirectiveError> {
        if self.token.eof {
            return Ok(());
        }
        if self.token.is(")") {
            return Err(self.syntax_error("unbalanced parenthesis", self.token.loc));
        }
        Err(self.syntax_error(
            format!("expect EOF, but got \"{}\"", self.token.value),
            self.token.loc,
        ))
    }

    // First pass: token structure.

    fn directive(&mut self) -> Result<SyntaxDirective, DirectiveError> {
        let command = self.command()?;
        let operation = if self.at_operator() {
            Some(self.operation()?)
        } else {
            None
        };

        Ok(SyntaxDirective { command, operation })
    }

    fn command(&mut self) -> Result<SyntaxCommand, DirectiveError> {
        if !self.at_text() {
            return Err(self.unexpected());
        }
        let name = self.advance();

        let args = if self.token.is(":") {
            self.advance();
            self.args()?
        } else {
            Vec::new()
        };

        Ok(SyntaxCommand { name, args })
    }

    fn args(&mut self) -> Result<Vec<Option<SyntaxArg>>, DirectiveError> {
        let mut args = Vec::new();
        loop {
            let starts_arg = self.at_text() || self.token.is("(") || self.token.is("-");
            args.push(if starts_arg { Some(self.arg()?) } else { None });

            if !self.token.is(",") {
                break;
            }
            self.advance();
        }

        // `name:` and `name:5,` leave empty trailing slots.
        while matches!(args.last(), Some(None)) {
            args.pop();
        }
        Ok(args)
    }

    fn arg(&mut self) -> Result<SyntaxArg, DirectiveError> {
        if self.token.is("(") {
            let open = self.advance();
            let directive = self.directive()?;
            self.close_paren()?;
            return Ok(SyntaxArg::Nested {
                directive: Box::new(directive),
                loc: open.loc,
            });
        }

        if self.token.is("-") {
            let sign = self.advance();
            if !self.at_text() {
                return Err(self.unexpected());
            }
            let text = self.advance();
            return Ok(SyntaxArg::Scalar {
                raw: format!("-{}", text.value),
                loc: sign.loc,
            });
        }

        let text = self.advance();
        Ok(SyntaxArg::Scalar {
            raw: text.value,
            loc: text.loc,
        })
    }

    fn close_paren(&mut self) -> Result<(), DirectiveError> {
        if self.token.is(")") {
            self.advance();
            return Ok(());
        }
        if self.token.eof {
            return Err(self.syntax_error("unbalanced parenthesis", self.token.loc));
        }
        Err(self.unexpected())
    }

    fn operation(&mut self) -> Result<(Operator, SyntaxOperand), DirectiveError> {
        let symbol = self.advance();
        let operator = self.registry.operator(&symbol.value).ok_or_else(|| {
            self.syntax_error(
                format!("\"{}\" is an invalid operator", symbol.value),
                symbol.loc,
            )
        })?;

        Ok((operator, self.operand()?))
    }

    fn operand(&mut self) -> Result<SyntaxOperand, DirectiveError> {
        if self.token.is("-") {
            let sign = self.advance();
            if !self.at_number() {
                return Err(self.unexpected());
            }
            let digits = self.advance();
            return self
                .number(&format!("-{}", digits.value), sign.loc)
                .map(SyntaxOperand::Number);
        }

        if self.at_number() {
            let digits = self.advance();
            return self
                .number(&digits.value, digits.loc)
                .map(SyntaxOperand::Number);
        }

        self.command().map(SyntaxOperand::Command)
    }

    fn number(&self, raw: &str, loc: Loc) -> Result<f64, DirectiveError> {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| self.syntax_error(format!("\"{raw}\" is not a valid number"), loc))
    }

    // Second pass: registry resolution and argument coercion.

    fn resolve_directive(&self, syntax: SyntaxDirective) -> Result<Directive, DirectiveError> {
        let command = self.resolve_command(syntax.command)?;
        let operation = match syntax.operation {
            None => None,
            Some((operator, SyntaxOperand::Number(value))) => {
                Some((operator, Operand::Number(value)))
            }
            Some((operator, SyntaxOperand::Command(operand))) => {
                Some((operator, Operand::Command(self.resolve_command(operand)?)))
            }
        };

        Ok(Directive { command, operation })
    }

    fn resolve_command(&self, syntax: SyntaxCommand) -> Result<Command, DirectiveError> {
        let loc = syntax.name.loc;
        let mut parts = SUB_COMMAND_SEPARATOR.splitn(&syntax.name.value, 2);
        let name = parts.next().unwrap_or_default().trim_end().to_owned();
        let sub = parts.next().map(str::to_owned);

        let (preset, sub) = self.resolve_preset(&name, sub, loc)?;
        let args = self.resolve_args(&name, &preset, syntax.args, loc)?;

        Ok(Command {
            name,
            sub,
            args,
            preset,
        })
    }

    fn resolve_preset(
        &self,
        name: &str,
        sub: Option<String>,
        loc: Loc,
    ) -> Result<(Arc<CommandPreset>, Option<String>), DirectiveError> {
        let definition = self
            .registry
            .get(name)
            .ok_or_else(|| self.value_error(format!("unknown command \"{name}\""), loc))?;

        let sub = match sub {
            Some(sub) => match definition.alias(&sub) {
                Some(target) => target.map(str::to_owned),
                None => Some(sub),
            },
            None => None,
        };

        let Some(sub) = sub else {
            let preset = definition.preset.clone().ok_or_else(|| {
                self.value_error(
                    format!("sub command should be specified for command \"{name}\""),
                    loc,
                )
            })?;
            return Ok((preset, None));
        };

        if definition.sub_commands.is_none() {
            return Err(self.value_error(format!("command \"{name}\" has no sub commands"), loc));
        }

        let preset = definition.sub_command(&sub).cloned().ok_or_else(|| {
            self.value_error(
                format!("unknown sub command \"{sub}\" for command \"{name}\""),
                loc,
            )
        })?;
        Ok((preset, Some(sub)))
    }

    fn resolve_args(
        &self,
        name: &str,
        preset: &CommandPreset,
        args: Vec<Option<SyntaxArg>>,
        loc: Loc,
    ) -> Result<Vec<Argument>, DirectiveError> {
        let specs = preset.args();
        if args.len() > specs.len() {
            return Err(self.value_error(
                format!(
                    "command \"{name}\" accepts max {} args, but got {}",
                    specs.len(),
                    args.len()
                ),
                loc,
            ));
        }

        let mut supplied = args.into_iter();
        let mut resolved = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            let value = match supplied.next().flatten() {
                Some(SyntaxArg::Scalar { raw, loc }) => ArgumentValue::Scalar(
                    spec.coerce_raw(&raw)
                        .map_err(|message| self.value_error(message, loc))?,
                ),
                Some(SyntaxArg::Nested { directive, loc }) => {
                    if spec.kind == ArgSpecKind::Param {
                        return Err(self.value_error(
                            format!("args[{index}] of command \"{name}\" must not be a directive"),
                            loc,
                        ));
                    }
                    ArgumentValue::Nested(Arc::new(self.resolve_directive(*directive)?))
                }
                None => match &spec.default {
                    Some(default) => ArgumentValue::Scalar(default.clone()),
                    None => {
                        return Err(self.value_error(
                            format!("args[{index}] is required for command \"{name}\""),
                            loc,
                        ));
                    }
                },
            };
            resolved.push(Argument { value });
        }

        Ok(resolved)
    }
}
