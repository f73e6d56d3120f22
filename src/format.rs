//! Format descriptors and their compiled form.
//!
//! A [`Format`] is an ordered list of [`FieldSpec`]s. Before it can be matched
//! it is compiled once into a [`CompiledFormat`]: constraint lists become
//! ordered sets, implicit optionality is resolved and the optional fields are
//! counted. The compiled form is cached inside the `Format`, so formats are
//! usually built once (e.g. in a `static`) and reused for every call.

use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

use indexmap::IndexSet;
use log::debug;
use serde::{Deserialize, Deserializer};

use crate::value::{Capability, TypeTag, Value};

/// One field name or a list of field names.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Names {
    One(String),
    Many(Vec<String>),
}

impl Names {
    fn to_set(&self) -> IndexSet<String> {
        match self {
            Names::One(name) => IndexSet::from([name.clone()]),
            Names::Many(names) => names.iter().cloned().collect(),
        }
    }
}

impl From<&str> for Names {
    fn from(value: &str) -> Self {
        Names::One(value.to_string())
    }
}

impl From<String> for Names {
    fn from(value: String) -> Self {
        Names::One(value)
    }
}

impl From<Vec<&str>> for Names {
    fn from(value: Vec<&str>) -> Self {
        Names::Many(value.into_iter().map(ToString::to_string).collect())
    }
}

impl From<Vec<String>> for Names {
    fn from(value: Vec<String>) -> Self {
        Names::Many(value)
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(value: [&str; N]) -> Self {
        Names::Many(value.iter().map(ToString::to_string).collect())
    }
}

// `default: null` is a present default, so a missing key and an explicit null
// must deserialize differently.
fn deserialize_some<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A structured field with optional checks and constraints.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_tag: Option<TypeTag>,
    #[serde(rename = "negatedType", alias = "nType", default)]
    pub negated_type: Option<TypeTag>,
    #[serde(default)]
    pub instance: Option<Capability>,
    #[serde(rename = "negatedInstance", alias = "nInstance", default)]
    pub negated_instance: Option<Capability>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub default: Option<Value>,
    #[serde(default)]
    pub mutex: Option<Names>,
    #[serde(default)]
    pub requires: Option<Names>,
    #[serde(rename = "requiredBy", default)]
    pub required_by: Option<Names>,
}

impl FieldDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_tag: None,
            negated_type: None,
            instance: None,
            negated_instance: None,
            optional: false,
            default: None,
            mutex: None,
            requires: None,
            required_by: None,
        }
    }

    #[must_use]
    pub fn of_type(mut self, type_tag: TypeTag) -> Self {
        self.type_tag = Some(type_tag);
        self
    }

    #[must_use]
    pub fn not_of_type(mut self, type_tag: TypeTag) -> Self {
        self.negated_type = Some(type_tag);
        self
    }

    #[must_use]
    pub fn instance_of(mut self, capability: Capability) -> Self {
        self.instance = Some(capability);
        self
    }

    #[must_use]
    pub fn not_instance_of(mut self, capability: Capability) -> Self {
        self.negated_instance = Some(capability);
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn mutex(mut self, names: impl Into<Names>) -> Self {
        self.mutex = Some(names.into());
        self
    }

    #[must_use]
    pub fn requires(mut self, names: impl Into<Names>) -> Self {
        self.requires = Some(names.into());
        self
    }

    #[must_use]
    pub fn required_by(mut self, names: impl Into<Names>) -> Self {
        self.required_by = Some(names.into());
        self
    }

    /// Whether the field may be skipped. Declaring any constraint or a default
    /// makes a field optional even without `optional: true`.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
            || self.mutex.is_some()
            || self.requires.is_some()
            || self.required_by.is_some()
            || self.default.is_some()
    }
}

/// One entry of a format: a bare required name or a structured descriptor.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FieldSpec {
    Bare(String),
    Structured(FieldDescriptor),
}

impl FieldSpec {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            FieldSpec::Bare(name) => name,
            FieldSpec::Structured(descriptor) => &descriptor.name,
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(value: &str) -> Self {
        FieldSpec::Bare(value.to_string())
    }
}

impl From<String> for FieldSpec {
    fn from(value: String) -> Self {
        FieldSpec::Bare(value)
    }
}

impl From<FieldDescriptor> for FieldSpec {
    fn from(value: FieldDescriptor) -> Self {
        FieldSpec::Structured(value)
    }
}

impl Display for FieldSpec {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "`{}`", self.name())?;

        if let FieldSpec::Structured(descriptor) = self {
            if descriptor.is_optional() {
                formatter.write_str("?")?;
            }
            if let Some(type_tag) = descriptor.type_tag {
                write!(formatter, ": {type_tag}")?;
            }
            if let Some(capability) = descriptor.instance {
                write!(formatter, ": {capability}")?;
            }
        }

        Ok(())
    }
}

/// A field after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub type_tag: Option<TypeTag>,
    pub negated_type: Option<TypeTag>,
    pub instance: Option<Capability>,
    pub negated_instance: Option<Capability>,
    pub optional: bool,
    pub default: Option<Value>,
    pub mutex: Option<IndexSet<String>>,
    pub requires: Option<IndexSet<String>>,
    pub required_by: Option<IndexSet<String>>,
}

impl From<&FieldDescriptor> for Rule {
    fn from(descriptor: &FieldDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            type_tag: descriptor.type_tag,
            negated_type: descriptor.negated_type,
            instance: descriptor.instance,
            negated_instance: descriptor.negated_instance,
            optional: descriptor.is_optional(),
            default: descriptor.default.clone(),
            mutex: descriptor.mutex.as_ref().map(Names::to_set),
            requires: descriptor.requires.as_ref().map(Names::to_set),
            required_by: descriptor.required_by.as_ref().map(Names::to_set),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledField {
    Bare(String),
    Structured(Rule),
}

/// Immutable, normalized form of a [`Format`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormat {
    fields: Vec<CompiledField>,
    optional: usize,
}

impl CompiledFormat {
    pub fn compile(fields: &[FieldSpec]) -> Self {
        let fields: Vec<CompiledField> = fields
            .iter()
            .map(|field| match field {
                FieldSpec::Bare(name) => CompiledField::Bare(name.clone()),
                FieldSpec::Structured(descriptor) => {
                    CompiledField::Structured(Rule::from(descriptor))
                }
            })
            .collect();

        let optional = fields
            .iter()
            .filter(|field| matches!(field, CompiledField::Structured(rule) if rule.optional))
            .count();

        debug!(
            "Compiled format with {} fields, {} optional",
            fields.len(),
            optional
        );

        Self { fields, optional }
    }

    #[must_use]
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields that may be skipped.
    #[must_use]
    pub fn optional_count(&self) -> usize {
        self.optional
    }

    /// Fewest arguments that can satisfy this format.
    #[must_use]
    pub fn required_count(&self) -> usize {
        self.fields.len() - self.optional
    }
}

/// An ordered list of field specifications.
///
/// # Examples
///
/// ```
/// use arguer::{FieldDescriptor, Format, TypeTag, Value};
///
/// let format = Format::new(vec![
///     "host".into(),
///     FieldDescriptor::new("port")
///         .of_type(TypeTag::Number)
///         .with_default(80)
///         .into(),
/// ]);
///
/// let matches = format.apply(&[Value::from("localhost")])?;
/// assert_eq!(matches.get("port"), Some(&Value::from(80)));
/// # Ok::<(), arguer::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Format {
    fields: Vec<FieldSpec>,
    compiled: OnceLock<CompiledFormat>,
}

impl Format {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            compiled: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The compiled form, built on first call and shared afterwards.
    pub fn compiled(&self) -> &CompiledFormat {
        self.compiled.get_or_init(|| CompiledFormat::compile(&self.fields))
    }
}

impl Clone for Format {
    fn clone(&self) -> Self {
        Self::new(self.fields.clone())
    }
}

impl PartialEq for Format {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl From<Vec<FieldSpec>> for Format {
    fn from(value: Vec<FieldSpec>) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Format {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<FieldSpec>::deserialize(deserializer).map(Format::new)
    }
}

impl Display for Format {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("(")?;
        for (index, field) in self.fields.iter().enumerate() {
            if index > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{field}")?;
        }
        formatter.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implicit_optional() {
        assert!(!FieldDescriptor::new("a").is_optional());
        assert!(FieldDescriptor::new("a").optional().is_optional());
        assert!(FieldDescriptor::new("a").mutex("b").is_optional());
        assert!(FieldDescriptor::new("a").requires("b").is_optional());
        assert!(FieldDescriptor::new("a").required_by("b").is_optional());
        assert!(FieldDescriptor::new("a").with_default(1).is_optional());
        assert!(!FieldDescriptor::new("a")
            .of_type(TypeTag::String)
            .is_optional());
    }

    #[test]
    fn test_compile_normalizes_names() {
        let format = Format::new(vec![
            "a".into(),
            FieldDescriptor::new("b").mutex("a").into(),
            FieldDescriptor::new("c").requires(["a", "b"]).into(),
        ]);

        let compiled = format.compiled();
        assert_eq!(compiled.len(), 3);
        assert_eq!(compiled.optional_count(), 2);
        assert_eq!(compiled.required_count(), 1);

        match &compiled.fields()[1] {
            CompiledField::Structured(rule) => {
                let mutex = rule.mutex.as_ref().unwrap();
                assert_eq!(mutex.len(), 1);
                assert!(mutex.contains("a"));
            }
            other => panic!("Expected structured field, got {other:?}"),
        }

        match &compiled.fields()[2] {
            CompiledField::Structured(rule) => {
                let requires: Vec<&str> =
                    rule.requires.as_ref().unwrap().iter().map(String::as_str).collect();
                assert_eq!(requires, vec!["a", "b"]);
            }
            other => panic!("Expected structured field, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_is_cached_and_idempotent() {
        let format = Format::new(vec![
            "a".into(),
            FieldDescriptor::new("b").optional().into(),
        ]);

        let first = format.compiled();
        let second = format.compiled();
        assert!(std::ptr::eq(first, second));
        assert_eq!(*first, CompiledFormat::compile(format.fields()));
    }

    #[test]
    fn test_deserialize_fields() {
        let yaml = r#"
- a
- name: b
  type: number
  nType: string
  default: 3
  requiredBy: a
- name: c
  instance: Array
  negatedInstance: Function
  mutex: [a, b]
- name: d
  default: null
"#;
        let format: Format = serde_yaml::from_str(yaml).unwrap();
        let fields = format.fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], FieldSpec::Bare("a".to_string()));

        let FieldSpec::Structured(b) = &fields[1] else {
            panic!("Expected structured field");
        };
        assert_eq!(b.type_tag, Some(TypeTag::Number));
        assert_eq!(b.negated_type, Some(TypeTag::String));
        assert_eq!(b.default, Some(Value::from(3)));
        assert_eq!(b.required_by, Some(Names::One("a".to_string())));

        let FieldSpec::Structured(c) = &fields[2] else {
            panic!("Expected structured field");
        };
        assert_eq!(c.instance, Some(Capability::Array));
        assert_eq!(c.negated_instance, Some(Capability::Function));
        assert_eq!(
            c.mutex,
            Some(Names::Many(vec!["a".to_string(), "b".to_string()]))
        );

        let FieldSpec::Structured(d) = &fields[3] else {
            panic!("Expected structured field");
        };
        assert_eq!(d.default, Some(Value::Null));
        assert!(d.is_optional());

        assert_eq!(format.compiled().optional_count(), 3);
    }

    #[test]
    fn test_display() {
        let format = Format::new(vec![
            "a".into(),
            FieldDescriptor::new("b")
                .of_type(TypeTag::Number)
                .optional()
                .into(),
            FieldDescriptor::new("c")
                .instance_of(Capability::Array)
                .into(),
        ]);
        assert_eq!(format!("{format}"), "(`a`, `b`?: number, `c`: Array)");
    }
}
