//! Free-form tool parameters passed through `other_parameters`.
//!
//! The accepted syntax is `NONE` or a `;` separated list of items written as
//! `--name=value` or `--name`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A single pass-through parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    /// The name without leading dashes.
    pub name: String,

    /// The value, if the parameter takes one.
    pub value: Option<String>,
}

impl Parameter {
    /// Renders the parameter as it is written on a command line.
    pub fn to_argument(&self) -> String {
        match &self.value {
            Some(value) => format!("--{} {}", self.name, value),
            None => format!("--{}", self.name),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "--{}={}", self.name, value),
            None => write!(f, "--{}", self.name),
        }
    }
}

/// Why a parameter list was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParameterError {
    /// An item does not follow `--name[=value]`.
    Malformed(String),

    /// The parameter is managed by ngscloud itself.
    NotAllowed(String),
}

fn item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^--([^=\s]+)(?:=(.+))?$").expect("valid parameter regex"))
}

/// Parses an `other_parameters` value.
///
/// Every problem is returned, not just the first one.
pub fn parse_parameter_list(
    raw: &str,
    not_allowed: &[&str],
) -> Result<Vec<Parameter>, Vec<ParameterError>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("NONE") {
        return Ok(Vec::new());
    }

    let mut parameters = Vec::new();
    let mut errors = Vec::new();

    for item in raw.split(';').map(str::trim).filter(|item| !item.is_empty()) {
        match item_regex().captures(item) {
            Some(captures) => {
                let name = captures[1].to_string();
                if not_allowed.contains(&name.as_str()) {
                    errors.push(ParameterError::NotAllowed(name));
                } else {
                    parameters.push(Parameter {
                        name,
                        value: captures.get(2).map(|m| m.as_str().trim().to_string()),
                    });
                }
            }
            None => errors.push(ParameterError::Malformed(item.to_string())),
        }
    }

    if parameters.is_empty() && errors.is_empty() {
        errors.push(ParameterError::Malformed(raw.to_string()));
    }

    if errors.is_empty() {
        Ok(parameters)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_empty() {
        assert_eq!(parse_parameter_list("none", &[]).unwrap(), vec![]);
    }

    #[test]
    fn test_valued_and_bare_items() {
        let parameters = parse_parameter_list("--seed=7; --reorder", &["threads"]).unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0].to_argument(), "--seed 7");
        assert_eq!(parameters[1].to_argument(), "--reorder");
        assert_eq!(parameters[0].to_string(), "--seed=7");
    }

    #[test]
    fn test_errors_are_collected() {
        let errors = parse_parameter_list("--threads=4; seed=7; --ok", &["threads"]).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ParameterError::NotAllowed(String::from("threads")),
                ParameterError::Malformed(String::from("seed=7")),
            ]
        );
    }

    #[test]
    fn test_empty_list_is_malformed() {
        assert!(parse_parameter_list(" ; ", &[]).is_err());
    }
}
