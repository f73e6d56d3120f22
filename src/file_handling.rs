//! Loading and validation of format definition files.
//!
//! A definition file is a YAML mapping from format name to a list of fields:
//!
//! ```yaml
//! connect:
//!   - host
//!   - name: port
//!     type: number
//!     default: 80
//!   - name: callback
//!     type: function
//!     optional: true
//! ```

use std::collections::HashSet;
use std::fs::File;

use indexmap::IndexMap;
use log::info;

use crate::error::Error::{
    EmptyName, NameWithSpace, NonUniqueFieldName, UnknownFieldReference,
};
use crate::error::{Error, Result};
use crate::format::{FieldSpec, Format, Names};

fn get_reader(file_description: &str, path: &str) -> Result<File> {
    match File::open(path) {
        Ok(reader) => Ok(reader),
        Err(e) => Err(Error::io_error(
            file_description.to_string(),
            path.to_string(),
            e,
        )),
    }
}

/// Expands a leading `~` in a definition file path.
pub fn expand_path(path: &str) -> String {
    shellexpand::tilde(path).to_string()
}

fn validate_name(format_name: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EmptyName(format_name.to_string()));
    }

    if name.chars().any(char::is_whitespace) {
        return Err(NameWithSpace(format_name.to_string(), name.to_string()));
    }

    Ok(())
}

fn referenced_names(field: &FieldSpec) -> Vec<&str> {
    let FieldSpec::Structured(descriptor) = field else {
        return Vec::new();
    };

    [&descriptor.mutex, &descriptor.requires, &descriptor.required_by]
        .into_iter()
        .flatten()
        .flat_map(|names| match names {
            Names::One(name) => vec![name.as_str()],
            Names::Many(names) => names.iter().map(String::as_str).collect(),
        })
        .collect()
}

/// Checks that field names are well formed and unique, and that every
/// `mutex`, `requires` and `requiredBy` entry names a field of the format.
///
/// The matcher does not call this; it accepts any format.
///
/// # Errors
///
/// Returns the first of [`Error::EmptyName`], [`Error::NameWithSpace`],
/// [`Error::NonUniqueFieldName`] or [`Error::UnknownFieldReference`] found.
pub fn validate_format(format_name: &str, format: &Format) -> Result<()> {
    let mut names = HashSet::new();
    for field in format.fields() {
        validate_name(format_name, field.name())?;

        if !names.insert(field.name()) {
            return Err(NonUniqueFieldName(
                format_name.to_string(),
                field.name().to_string(),
            ));
        }
    }

    for field in format.fields() {
        for reference in referenced_names(field) {
            if !names.contains(reference) {
                return Err(UnknownFieldReference(
                    format_name.to_string(),
                    field.name().to_string(),
                    reference.to_string(),
                ));
            }
        }
    }

    Ok(())
}

/// Loads and validates named formats from a YAML definition file.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The YAML is malformed or doesn't match the expected structure
/// - The file defines no formats
/// - A format fails [`validate_format`]
///
/// # Examples
///
/// ```no_run
/// use arguer::file_handling::get_format_definitions;
///
/// let formats = get_format_definitions("~/.config/formats.yml")?;
/// println!("Loaded {} formats", formats.len());
/// # Ok::<(), arguer::Error>(())
/// ```
pub fn get_format_definitions(path: &str) -> Result<IndexMap<String, Format>> {
    let path = expand_path(path);
    let reader = get_reader("format definition", &path)?;

    let formats: IndexMap<String, Format> = serde_yaml::from_reader(reader).map_err(|e| {
        Error::yaml_error(
            "reading".to_string(),
            "format definition".to_string(),
            path.clone(),
            e,
        )
    })?;

    if formats.is_empty() {
        return Err(Error::empty_format_definition(path));
    }

    for (name, format) in &formats {
        validate_format(name, format)?;
    }

    info!("Loaded {} formats from `{}`", formats.len(), path);

    Ok(formats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FieldDescriptor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_definitions(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{content}").unwrap();
        temp_file
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("f", "valid_name").is_ok());
        assert!(matches!(validate_name("f", ""), Err(EmptyName(_))));
        assert!(matches!(
            validate_name("f", "has space"),
            Err(NameWithSpace(_, _))
        ));
    }

    #[test]
    fn test_validate_format_duplicate_names() {
        let format = Format::new(vec![
            "a".into(),
            FieldDescriptor::new("a").optional().into(),
        ]);
        let result = validate_format("dup", &format);
        assert!(matches!(result, Err(NonUniqueFieldName(_, ref name)) if name == "a"));
    }

    #[test]
    fn test_validate_format_unknown_reference() {
        let format = Format::new(vec![
            "a".into(),
            FieldDescriptor::new("b").requires(["a", "z"]).into(),
        ]);
        let result = validate_format("refs", &format);
        assert!(matches!(
            result,
            Err(UnknownFieldReference(_, ref field, ref reference))
                if field == "b" && reference == "z"
        ));
    }

    #[test]
    fn test_validate_format_forward_reference_is_allowed() {
        let format = Format::new(vec![
            FieldDescriptor::new("a").required_by("b").into(),
            "b".into(),
        ]);
        assert!(validate_format("forward", &format).is_ok());
    }

    #[test]
    fn test_get_format_definitions_valid_yaml() {
        let temp_file = write_definitions(
            r#"
connect:
  - host
  - name: port
    type: number
    default: 80
"#,
        );
        let path = temp_file.path().to_str().unwrap();

        let formats = get_format_definitions(path).unwrap();
        assert_eq!(formats.len(), 1);
        let connect = &formats["connect"];
        assert_eq!(connect.len(), 2);
        assert_eq!(connect.compiled().optional_count(), 1);
    }

    #[test]
    fn test_get_format_definitions_empty_file() {
        let temp_file = write_definitions("{}");
        let path = temp_file.path().to_str().unwrap();
        let result = get_format_definitions(path);
        assert!(matches!(result, Err(Error::EmptyFormatDefinition { .. })));
    }

    #[test]
    fn test_get_format_definitions_invalid_yaml() {
        let temp_file = write_definitions("invalid: yaml: content: [");
        let path = temp_file.path().to_str().unwrap();
        let result = get_format_definitions(path);
        assert!(matches!(result, Err(Error::Yaml { .. })));
    }

    #[test]
    fn test_get_format_definitions_unknown_attribute() {
        let temp_file = write_definitions(
            r#"
bad:
  - name: a
    kind: string
"#,
        );
        let path = temp_file.path().to_str().unwrap();
        assert!(get_format_definitions(path).is_err());
    }

    #[test]
    fn test_get_format_definitions_file_not_found() {
        let result = get_format_definitions("/this/path/does/not/exist.yml");
        let error = result.unwrap_err();
        assert!(matches!(error, Error::Io { .. }));
        assert!(!error.is_match_failure());
    }

    #[test]
    fn test_get_format_definitions_with_validation_errors() {
        let temp_file = write_definitions(
            r#"
pair:
  - a
  - a
"#,
        );
        let path = temp_file.path().to_str().unwrap();
        let result = get_format_definitions(path);
        assert!(matches!(result, Err(NonUniqueFieldName(_, _))));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        assert_eq!(expand_path("/absolute/path.yml"), "/absolute/path.yml");
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = expand_path("~/formats.yml");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("formats.yml"));
    }
}
