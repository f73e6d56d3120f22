//! Matching positional arguments against a format.
//!
//! The matcher makes a single left-to-right pass over the format. The number
//! of arguments missing compared to the format length (the *deficit*) decides
//! how many optional fields must be skipped; optional fields are consumed
//! greedily until the remaining optional slots exactly cover the deficit.
//! A field whose checks reject the current argument may still be skipped
//! (*rescued*) if it is optional and the deficit allows it. There is no
//! backtracking: the first field that can neither match nor be rescued fails
//! the whole call.

use indexmap::IndexMap;
use log::debug;

use crate::error::Error::{InvalidArgument, NotEnoughArguments};
use crate::error::{Error, Rejection, Result};
use crate::format::{CompiledField, CompiledFormat, Format, Rule};
use crate::value::{type_tag_of, Value};

/// Field name to value, in format order. Optional fields skipped without a
/// default are absent.
pub type Matches = IndexMap<String, Value>;

/// Matches `arguments` against `format`, returning the failure as a value.
///
/// # Errors
///
/// Returns [`Error::NotEnoughArguments`] if fewer arguments were given than
/// the format requires, or [`Error::InvalidArgument`] if an argument fails its
/// field's checks and the field cannot be skipped.
///
/// # Examples
///
/// ```
/// use arguer::{arguer, Error, FieldDescriptor, Format, Value};
///
/// let format = Format::new(vec![
///     "a".into(),
///     FieldDescriptor::new("b").optional().into(),
///     "c".into(),
/// ]);
///
/// let matches = arguer(&[Value::from("hello"), Value::from("world")], &format)?;
/// assert_eq!(matches.get("a"), Some(&Value::from("hello")));
/// assert!(!matches.contains_key("b"));
/// assert_eq!(matches.get("c"), Some(&Value::from("world")));
///
/// let failure = arguer(&[Value::from("hello")], &format);
/// assert!(matches!(failure, Err(Error::NotEnoughArguments { .. })));
/// # Ok::<(), arguer::Error>(())
/// ```
pub fn arguer(arguments: &[Value], format: &Format) -> Result<Matches> {
    match_compiled(arguments, format.compiled())
}

/// Matches `arguments` against `format`, raising a failure into the caller's
/// error type so it can be propagated with `?`.
///
/// # Errors
///
/// Same failures as [`arguer`], converted with `E::from`.
pub fn thrower<E>(arguments: &[Value], format: &Format) -> std::result::Result<Matches, E>
where
    E: From<Error>,
{
    arguer(arguments, format).map_err(E::from)
}

impl Format {
    /// Bound-style form of [`arguer`].
    ///
    /// # Errors
    ///
    /// See [`arguer`].
    pub fn apply(&self, arguments: &[Value]) -> Result<Matches> {
        arguer(arguments, self)
    }

    /// Bound-style form of [`thrower`].
    ///
    /// # Errors
    ///
    /// See [`thrower`].
    pub fn apply_or_raise<E>(&self, arguments: &[Value]) -> std::result::Result<Matches, E>
    where
        E: From<Error>,
    {
        thrower(arguments, self)
    }
}

struct MatchState<'a> {
    arguments: &'a [Value],
    deficit: isize,
    optional: isize,
    arg_index: usize,
    optional_included: isize,
    optional_skipped: isize,
    result: Matches,
}

impl<'a> MatchState<'a> {
    fn current(&self) -> Option<&'a Value> {
        self.arguments.get(self.arg_index)
    }

    fn is_defined(&self, name: &str) -> bool {
        self.result.contains_key(name)
    }

    fn bind(&mut self, name: &str, value: Option<&Value>) {
        if let Some(value) = value {
            self.result.insert(name.to_string(), value.clone());
        }
    }

    fn consume(&mut self, name: &str) {
        let current = self.current();
        self.bind(name, current);
        self.arg_index += 1;
    }

    fn skip(&mut self, rule: &Rule) {
        self.bind(&rule.name, rule.default.as_ref());
        self.optional_skipped += 1;
    }

    /// First check of `rule` that the current argument fails, if any.
    fn rejection(&self, rule: &Rule) -> Option<Rejection> {
        let argument = self.current();
        let found = type_tag_of(argument);

        if let Some(expected) = rule.type_tag {
            if found != expected {
                return Some(Rejection::Type { expected, found });
            }
        }

        if let Some(negated) = rule.negated_type {
            if found == negated {
                return Some(Rejection::NegatedType(negated));
            }
        }

        if let Some(capability) = rule.instance {
            if !argument.is_some_and(|value| value.satisfies(capability)) {
                return Some(Rejection::Instance(capability));
            }
        }

        if let Some(capability) = rule.negated_instance {
            if argument.is_some_and(|value| value.satisfies(capability)) {
                return Some(Rejection::NegatedInstance(capability));
            }
        }

        if let Some(mutex) = &rule.mutex {
            if let Some(conflict) = mutex.iter().find(|name| self.is_defined(name)) {
                return Some(Rejection::Mutex(conflict.clone()));
            }
        }

        if let Some(requires) = &rule.requires {
            if let Some(missing) = requires.iter().find(|name| !self.is_defined(name)) {
                return Some(Rejection::Requires(missing.clone()));
            }
        }

        None
    }

    fn can_rescue(&self, rule: &Rule) -> bool {
        let obligated = rule
            .required_by
            .as_ref()
            .is_some_and(|required_by| required_by.iter().any(|name| self.is_defined(name)));

        rule.optional && self.optional_skipped < self.deficit && !obligated
    }

    fn match_rule(&mut self, rule: &Rule) -> Result<()> {
        if let Some(reason) = self.rejection(rule) {
            if !self.can_rescue(rule) {
                debug!("Field `{}` rejected its argument: {}", rule.name, reason);
                return Err(InvalidArgument {
                    field: rule.name.clone(),
                    position: self.arg_index,
                    reason,
                });
            }

            debug!("Skipping optional field `{}` ({})", rule.name, reason);
            self.skip(rule);
            return Ok(());
        }

        if rule.optional {
            if self.optional - self.optional_included > self.deficit {
                self.optional_included += 1;
            } else {
                debug!("Skipping optional field `{}` to cover missing arguments", rule.name);
                self.skip(rule);
                return Ok(());
            }
        }

        self.consume(&rule.name);
        Ok(())
    }
}

#[allow(clippy::cast_possible_wrap)]
fn match_compiled(arguments: &[Value], format: &CompiledFormat) -> Result<Matches> {
    let deficit = format.len() as isize - arguments.len() as isize;
    let optional = format.optional_count() as isize;

    if deficit > optional {
        debug!(
            "Not enough arguments: {} given, {} required",
            arguments.len(),
            format.required_count()
        );
        return Err(NotEnoughArguments {
            required: format.required_count(),
            provided: arguments.len(),
        });
    }

    let mut state = MatchState {
        arguments,
        deficit,
        optional,
        arg_index: 0,
        optional_included: 0,
        optional_skipped: 0,
        result: Matches::with_capacity(format.len()),
    };

    for field in format.fields() {
        match field {
            CompiledField::Bare(name) => state.consume(name),
            CompiledField::Structured(rule) => state.match_rule(rule)?,
        }
    }

    Ok(state.result)
}
