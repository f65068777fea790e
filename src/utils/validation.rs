//! Semantic checks of config files.
//!
//! Checks never stop at the first problem: every issue found is recorded in
//! a [`ValidationReport`] so the user can fix the file in one pass.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::utils::codes::{Code, Software};
use crate::utils::options::OptionDict;
use crate::utils::parameters::{parse_parameter_list, Parameter, ParameterError};

//========//
// Report //
//========//

/// A single problem found in a config file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    /// The section the problem belongs to, if any.
    pub section: Option<String>,

    /// The key the problem belongs to, if any.
    pub key: Option<String>,

    /// A description of the problem.
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*** ERROR: {}", self.message)
    }
}

/// Every problem found while checking the config file of one tool.
#[derive(Clone, Debug, Serialize)]
pub struct ValidationReport {
    /// The name of the tool whose config file was checked.
    pub tool: String,

    /// Whether the file is usable.
    pub valid: bool,

    /// The problems found.
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    /// Creates an empty (valid) report.
    pub fn new(tool: impl Into<String>) -> Self {
        ValidationReport {
            tool: tool.into(),
            valid: true,
            issues: Vec::new(),
        }
    }

    /// Creates a report holding a single file level problem.
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        let mut report = Self::new(tool);
        report.push(None, None, message);
        report
    }

    /// Records a problem.
    pub fn push(&mut self, section: Option<&str>, key: Option<&str>, message: impl Into<String>) {
        self.valid = false;
        self.issues.push(Issue {
            section: section.map(String::from),
            key: key.map(String::from),
            message: message.into(),
        });
    }

    /// Whether no problem was found.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Turns the report into an error when it holds problems.
    pub fn into_result(self) -> anyhow::Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("{}", self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "The {} config file is OK.", self.tool);
        }

        for issue in &self.issues {
            writeln!(f, "{}", issue)?;
        }

        write!(
            f,
            "\nThe {} config file is not valid. Please, correct this file or recreate it.",
            self.tool
        )
    }
}

//=========//
// Checker //
//=========//

fn numbered_section_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+)-([0-9]+)$").expect("valid section regex"))
}

/// Splits a comma separated literal into its trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Whether a raw value is the `NONE` placeholder.
pub fn is_none(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("NONE")
}

/// Reads values out of an [`OptionDict`], recording every problem found.
///
/// Each accessor returns `None` when the value is missing or invalid, after
/// the corresponding issue has been added to the report.
pub struct Checker<'a> {
    options: &'a OptionDict,
    report: ValidationReport,
    missing_sections: HashSet<String>,
}

impl<'a> Checker<'a> {
    /// Creates a checker for the config file of `tool`.
    pub fn new(tool: &str, options: &'a OptionDict) -> Self {
        Checker {
            options,
            report: ValidationReport::new(tool),
            missing_sections: HashSet::new(),
        }
    }

    /// The options being checked.
    pub fn options(&self) -> &'a OptionDict {
        self.options
    }

    /// Records a problem not covered by the other accessors.
    pub fn error(&mut self, section: &str, key: &str, message: impl Into<String>) {
        self.report.push(Some(section), Some(key), message);
    }

    /// Records a problem with a whole section.
    pub fn section_error(&mut self, section: &str, message: impl Into<String>) {
        self.report.push(Some(section), None, message);
    }

    /// Checks that a section exists. The missing section is reported once.
    pub fn require_section(&mut self, section: &str) -> bool {
        if self.options.has_section(section) {
            return true;
        }

        if self.missing_sections.insert(section.to_string()) {
            self.report.push(
                Some(section),
                None,
                format!("the section \"{}\" is not found.", section),
            );
        }

        false
    }

    /// Gets the raw value of a required key.
    pub fn raw(&mut self, section: &str, key: &str) -> Option<&'a str> {
        if !self.require_section(section) {
            return None;
        }

        let options: &'a OptionDict = self.options;
        match options.get(section, key) {
            Some(value) => Some(value),
            None => {
                self.error(
                    section,
                    key,
                    format!(
                        "the key \"{}\" is not found in the section \"{}\".",
                        key, section
                    ),
                );
                None
            }
        }
    }

    /// Gets a required integer `>= minimum`.
    pub fn int(&mut self, section: &str, key: &str, minimum: i64) -> Option<i64> {
        let raw = self.raw(section, key)?;
        match raw.trim().parse::<i64>() {
            Ok(value) if value >= minimum => Some(value),
            _ => {
                self.error(
                    section,
                    key,
                    format!(
                        "the key \"{}\" has to be an integer number greater than or equal to {}.",
                        key, minimum
                    ),
                );
                None
            }
        }
    }

    /// Gets a required integer in `minimum..=maximum`.
    pub fn int_between(
        &mut self,
        section: &str,
        key: &str,
        minimum: i64,
        maximum: i64,
    ) -> Option<i64> {
        let raw = self.raw(section, key)?;
        match raw.trim().parse::<i64>() {
            Ok(value) if (minimum..=maximum).contains(&value) => Some(value),
            _ => {
                self.error(
                    section,
                    key,
                    format!(
                        "the key \"{}\" has to be an integer number between {} and {}.",
                        key, minimum, maximum
                    ),
                );
                None
            }
        }
    }

    /// Gets an integer `>= minimum` or `NONE`.
    pub fn int_or_none(&mut self, section: &str, key: &str, minimum: i64) -> Option<Option<i64>> {
        let raw = self.raw(section, key)?;
        if is_none(raw) {
            return Some(None);
        }

        match raw.trim().parse::<i64>() {
            Ok(value) if value >= minimum => Some(Some(value)),
            _ => {
                self.error(
                    section,
                    key,
                    format!(
                        "the key \"{}\" has to be an integer number greater than or equal to {} or NONE.",
                        key, minimum
                    ),
                );
                None
            }
        }
    }

    /// Gets a comma separated list of integers, each `>= minimum`.
    pub fn int_list(&mut self, section: &str, key: &str, minimum: i64) -> Option<Vec<i64>> {
        let raw = self.raw(section, key)?;
        let parsed: Option<Vec<i64>> = split_list(raw)
            .iter()
            .map(|item| item.parse::<i64>().ok().filter(|value| *value >= minimum))
            .collect();

        match parsed {
            Some(values) if !values.is_empty() => Some(values),
            _ => {
                self.error(
                    section,
                    key,
                    format!(
                        "the key \"{}\" has to be an integer number or a list of integer numbers greater than or equal to {} separated by comma.",
                        key, minimum
                    ),
                );
                None
            }
        }
    }

    /// Gets a required float in `minimum..=maximum`.
    pub fn float(&mut self, section: &str, key: &str, minimum: f64, maximum: f64) -> Option<f64> {
        let raw = self.raw(section, key)?;
        match raw.trim().parse::<f64>() {
            Ok(value) if value >= minimum && value <= maximum => Some(value),
            _ => {
                self.error(
                    section,
                    key,
                    format!(
                        "the key \"{}\" has to be a float number between {:.1} and {:.1}.",
                        key, minimum, maximum
                    ),
                );
                None
            }
        }
    }

    /// Gets a code from the full set of `C`.
    pub fn code<C: Code>(&mut self, section: &str, key: &str) -> Option<C> {
        self.code_in(section, key, C::ALL)
    }

    /// Gets a code restricted to `allowed`.
    pub fn code_in<C: Code>(&mut self, section: &str, key: &str, allowed: &[C]) -> Option<C> {
        let raw = self.raw(section, key)?;
        match C::from_code_in(raw, allowed) {
            Some(value) => Some(value),
            None => {
                self.error(
                    section,
                    key,
                    format!("the key \"{}\" has to be {}.", key, C::list_text(allowed)),
                );
                None
            }
        }
    }

    /// Gets a `YES`/`NO` switch.
    pub fn yes_no(&mut self, section: &str, key: &str) -> Option<bool> {
        self.switch(section, key, "YES", "NO")
    }

    /// Gets a `TRUE`/`FALSE` switch.
    pub fn true_false(&mut self, section: &str, key: &str) -> Option<bool> {
        self.switch(section, key, "TRUE", "FALSE")
    }

    fn switch(&mut self, section: &str, key: &str, on: &str, off: &str) -> Option<bool> {
        let raw = self.raw(section, key)?.trim();
        if raw.eq_ignore_ascii_case(on) {
            Some(true)
        } else if raw.eq_ignore_ascii_case(off) {
            Some(false)
        } else {
            self.error(
                section,
                key,
                format!("the key \"{}\" has to be {} or {}.", key, on, off),
            );
            None
        }
    }

    /// Gets a dataset identifier that starts with the code of one of
    /// `allowed`, returning the identifier and the software it belongs to.
    pub fn dataset_id(
        &mut self,
        section: &str,
        key: &str,
        allowed: &[Software],
    ) -> Option<(&'a str, Software)> {
        let raw = self.raw(section, key)?;
        match Software::of_dataset(raw, allowed) {
            Some(software) => Some((raw, software)),
            None => {
                self.error(
                    section,
                    key,
                    format!(
                        "the key \"{}\" has to start with {}.",
                        key,
                        Software::list_text(allowed)
                    ),
                );
                None
            }
        }
    }

    /// Gets a file name that has to end with one of `extensions` (ignoring
    /// case). When `allow_none` is set, `NONE` is accepted and returned as
    /// `Some(None)`.
    pub fn file_name(
        &mut self,
        section: &str,
        key: &str,
        extensions: &[&str],
        allow_none: bool,
    ) -> Option<Option<&'a str>> {
        let raw = self.raw(section, key)?;
        if allow_none && is_none(raw) {
            return Some(None);
        }

        let lowered = raw.to_lowercase();
        if extensions.iter().any(|extension| lowered.ends_with(extension)) {
            return Some(Some(raw));
        }

        let mut expected = extensions.join(" or ");
        if allow_none {
            expected.push_str(" or NONE");
        }
        self.error(
            section,
            key,
            format!(
                "the key \"{}\" has to be a file name with extension {}.",
                key, expected
            ),
        );
        None
    }

    /// Gets the pass-through parameters of a tool.
    pub fn parameter_list(
        &mut self,
        section: &str,
        key: &str,
        not_allowed: &[&str],
    ) -> Option<Vec<Parameter>> {
        let raw = self.raw(section, key)?;
        match parse_parameter_list(raw, not_allowed) {
            Ok(parameters) => Some(parameters),
            Err(errors) => {
                for error in errors {
                    let message = match error {
                        ParameterError::Malformed(item) => format!(
                            "the key \"{}\" has to be NONE or a valid parameter list: \"{}\" is not --parameter=value or --parameter.",
                            key, item
                        ),
                        ParameterError::NotAllowed(name) => format!(
                            "the parameter \"{}\" is not allowed in the key \"{}\" because it is controlled by ngscloud.",
                            name, key
                        ),
                    };
                    self.error(section, key, message);
                }
                None
            }
        }
    }

    /// Lists the sections named `{prefix}-n`, ordered by `n`.
    pub fn numbered_sections(&self, prefix: &str) -> Vec<&'a str> {
        let options: &'a OptionDict = self.options;
        let mut sections: Vec<(u64, &'a str)> = options
            .sections()
            .filter_map(|(name, _)| {
                let captures = numbered_section_regex().captures(name)?;
                if &captures[1] != prefix {
                    return None;
                }
                let n = captures[2].parse::<u64>().ok()?;
                Some((n, name))
            })
            .collect();
        sections.sort_unstable();
        sections.into_iter().map(|(_, name)| name).collect()
    }

    /// Reports every section that is neither one of `fixed` nor named
    /// `{prefix}-n` for one of `numbered`.
    pub fn reject_unknown_sections(&mut self, fixed: &[&str], numbered: &[&str]) {
        let options: &'a OptionDict = self.options;
        let unknown: Vec<&'a str> = options
            .sorted_section_names()
            .into_iter()
            .filter(|name| !fixed.contains(name))
            .filter(|name| match numbered_section_regex().captures(name) {
                Some(captures) => !numbered.contains(&&captures[1]),
                None => true,
            })
            .collect();

        for name in unknown {
            self.section_error(
                name,
                format!("the section \"{}\" has a wrong identification.", name),
            );
        }
    }

    /// Consumes the checker, returning the report.
    pub fn finish(self) -> ValidationReport {
        self.report
    }

    /// Consumes the checker, returning `value` when nothing was reported.
    pub fn finish_with<T>(self, value: Option<T>) -> Result<T, ValidationReport> {
        let mut report = self.report;
        match value {
            Some(value) if report.is_valid() => Ok(value),
            _ => {
                if report.is_valid() {
                    report.push(None, None, "the config file could not be read.");
                }
                Err(report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::codes::{ReadType, ASSEMBLERS};

    fn dict(text: &str) -> OptionDict {
        text.parse().unwrap()
    }

    #[test]
    fn test_missing_section_reported_once() {
        let options = dict("[a]\nk = 1\n");
        let mut checker = Checker::new("Tool", &options);
        assert!(checker.raw("b", "x").is_none());
        assert!(checker.raw("b", "y").is_none());
        assert!(checker.raw("a", "z").is_none());
        let report = checker.finish();

        assert!(!report.is_valid());
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].message, "the section \"b\" is not found.");
        assert_eq!(
            report.issues[1].message,
            "the key \"z\" is not found in the section \"a\"."
        );
    }

    #[test]
    fn test_numeric_checks() {
        let options = dict(
            "[p]\nthreads = 0\nmin = 2\nfrac = 1.5\nok = 0.05\nkmer = 25, 32\nbad = 25,x\ncrop = none\ncleanup = 4\n",
        );
        let mut checker = Checker::new("Tool", &options);
        assert_eq!(checker.int("p", "threads", 1), None);
        assert_eq!(checker.int("p", "min", 0), Some(2));
        assert_eq!(checker.float("p", "frac", 0.0, 1.0), None);
        assert_eq!(checker.float("p", "ok", 0.0, 1.0), Some(0.05));
        assert_eq!(checker.int_list("p", "kmer", 1), Some(vec![25, 32]));
        assert_eq!(checker.int_list("p", "bad", 1), None);
        assert_eq!(checker.int_or_none("p", "crop", 1), Some(None));
        assert_eq!(checker.int_between("p", "cleanup", 0, 3), None);
        let report = checker.finish();

        assert_eq!(report.issues.len(), 4);
        assert!(report.issues[0]
            .message
            .contains("greater than or equal to 1"));
        assert!(report.issues[1].message.contains("between 0.0 and 1.0"));
    }

    #[test]
    fn test_codes_and_switches() {
        let options = dict("[l]\nread_type = pe\nconcat = maybe\nuse = yes\n");
        let mut checker = Checker::new("Tool", &options);
        assert_eq!(checker.code::<ReadType>("l", "read_type"), Some(ReadType::PairedEnd));
        assert_eq!(checker.yes_no("l", "concat"), None);
        assert_eq!(checker.yes_no("l", "use"), Some(true));
        let report = checker.finish();
        assert_eq!(report.issues[0].message, "the key \"concat\" has to be YES or NO.");
    }

    #[test]
    fn test_dataset_ids_and_file_names() {
        let options = dict(
            "[i]\nassembly_dataset_id = trinity-170101-111111\nother = star-1\ngtf = genes.GTF\nmask = NONE\n",
        );
        let mut checker = Checker::new("Tool", &options);
        assert_eq!(
            checker.dataset_id("i", "assembly_dataset_id", ASSEMBLERS),
            Some(("trinity-170101-111111", Software::Trinity))
        );
        assert_eq!(checker.dataset_id("i", "other", ASSEMBLERS), None);
        assert_eq!(
            checker.file_name("i", "gtf", &[".gtf", ".gff"], false),
            Some(Some("genes.GTF"))
        );
        assert_eq!(
            checker.file_name("i", "mask", &[".gtf", ".gff"], true),
            Some(None)
        );
        assert_eq!(checker.file_name("i", "mask", &[".gtf"], false), None);
        assert_eq!(checker.finish().issues.len(), 2);
    }

    #[test]
    fn test_numbered_and_unknown_sections() {
        let options = dict(
            "[identification]\n[library]\n[library-10]\n[library-2]\n[library-x]\n[extra]\n",
        );
        let mut checker = Checker::new("Tool", &options);
        assert_eq!(
            checker.numbered_sections("library"),
            vec!["library-2", "library-10"]
        );
        checker.reject_unknown_sections(&["identification", "library"], &["library"]);
        let report = checker.finish();

        assert_eq!(report.issues.len(), 2);
        assert_eq!(
            report.issues[0].message,
            "the section \"extra\" has a wrong identification."
        );
        assert_eq!(report.issues[1].section.as_deref(), Some("library-x"));
    }

    #[test]
    fn test_report_display() {
        let mut report = ValidationReport::new("QUAST");
        assert_eq!(report.to_string(), "The QUAST config file is OK.");

        report.push(Some("s"), Some("k"), "something is wrong.");
        let text = report.to_string();
        assert!(text.starts_with("*** ERROR: something is wrong.\n"));
        assert!(text.ends_with(
            "The QUAST config file is not valid. Please, correct this file or recreate it."
        ));
        assert!(report.into_result().is_err());
    }
}
