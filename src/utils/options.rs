//! Reading and writing of the `key = value` config files used by every tool.
//!
//! A config file is a sequence of `[section]` headers, each followed by
//! `key = value` entries. A `#` starts a comment that runs to the end of the
//! line. Order of sections and keys is preserved so that the files written by
//! `ngscloud create` round-trip in the same shape.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context};
use indexmap::IndexMap;

/// The column at which the comment of an entry starts in generated files.
pub const COMMENT_COLUMN: usize = 50;

//================//
// Option section //
//================//

/// A single `[section]` of a config file.
pub type OptionSection = IndexMap<String, String>;

/// An error encountered while reading the syntax of a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// The one-based line number where the problem was found.
    pub line: usize,

    /// The description of the problem.
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for SyntaxError {}

//===================//
// Option dictionary //
//===================//

/// The parsed contents of a config file: sections mapped to their entries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OptionDict {
    sections: IndexMap<String, OptionSection>,
}

impl OptionDict {
    /// Reads and parses the config file at `path`.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        contents
            .parse()
            .with_context(|| format!("parsing config file: {}", path.display()))
    }

    /// Gets a section by name.
    pub fn section(&self, name: &str) -> Option<&OptionSection> {
        self.sections.get(name)
    }

    /// Whether the section exists.
    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Gets a raw value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Gets a raw value, failing when it is missing.
    pub fn value(&self, section: &str, key: &str) -> anyhow::Result<&str> {
        match self.get(section, key) {
            Some(value) => Ok(value),
            None => bail!(
                "the key \"{}\" is not found in the section \"{}\"",
                key,
                section
            ),
        }
    }

    /// Gets a value and parses it into `T`.
    pub fn parse<T>(&self, section: &str, key: &str) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.value(section, key)?;
        raw.parse::<T>().map_err(|e| {
            anyhow::anyhow!(
                "invalid value \"{}\" for the key \"{}\" in the section \"{}\": {}",
                raw,
                key,
                section,
                e
            )
        })
    }

    /// The names of all sections, sorted alphabetically.
    pub fn sorted_section_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sets a value, creating the section when needed.
    pub fn insert(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Iterates over every section in file order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &OptionSection)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromStr for OptionDict {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut sections: IndexMap<String, OptionSection> = IndexMap::new();
        let mut current: Option<String> = None;

        for (i, raw_line) in s.lines().enumerate() {
            let line_number = i + 1;
            let line = strip_comment(raw_line).trim();

            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = match rest.strip_suffix(']') {
                    Some(name) => name.trim(),
                    None => {
                        return Err(SyntaxError {
                            line: line_number,
                            message: format!("the section header \"{}\" is not closed", line),
                        })
                    }
                };

                if name.is_empty() {
                    return Err(SyntaxError {
                        line: line_number,
                        message: String::from("the section name is empty"),
                    });
                }

                if sections.contains_key(name) {
                    return Err(SyntaxError {
                        line: line_number,
                        message: format!("the section \"{}\" is duplicated", name),
                    });
                }

                sections.insert(name.to_string(), OptionSection::new());
                current = Some(name.to_string());
                continue;
            }

            let (key, value) = match line.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => {
                    return Err(SyntaxError {
                        line: line_number,
                        message: format!("\"{}\" is not a \"key = value\" entry", line),
                    })
                }
            };

            if key.is_empty() {
                return Err(SyntaxError {
                    line: line_number,
                    message: String::from("the key is empty"),
                });
            }

            let section = match current.as_ref().and_then(|name| sections.get_mut(name)) {
                Some(section) => section,
                None => {
                    return Err(SyntaxError {
                        line: line_number,
                        message: format!("the key \"{}\" is outside of any section", key),
                    })
                }
            };

            if section.contains_key(key) {
                return Err(SyntaxError {
                    line: line_number,
                    message: format!("the key \"{}\" is duplicated", key),
                });
            }

            section.insert(key.to_string(), value.to_string());
        }

        Ok(OptionDict { sections })
    }
}

/// Cuts a line at the first `#` that opens it or follows whitespace.
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (i, c) in line.char_indices() {
        if c == '#' && previous.map_or(true, char::is_whitespace) {
            return &line[..i];
        }
        previous = Some(c);
    }
    line
}

//===============//
// Config writer //
//===============//

/// Builds the text of a config file with documented defaults.
#[derive(Debug, Default)]
pub struct ConfigWriter {
    buffer: String,
}

impl ConfigWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a `# ...` comment line. An empty string writes a bare `#`.
    pub fn comment(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            self.buffer.push_str("#\n");
        } else {
            self.buffer.push_str("# ");
            self.buffer.push_str(text);
            self.buffer.push('\n');
        }
        self
    }

    /// Writes an empty line.
    pub fn blank(&mut self) -> &mut Self {
        self.buffer.push('\n');
        self
    }

    /// Writes a section header preceded by its description.
    pub fn section(&mut self, name: &str, description: &str) -> &mut Self {
        self.comment(description);
        self.buffer.push('[');
        self.buffer.push_str(name);
        self.buffer.push_str("]\n");
        self
    }

    /// Writes an entry, padding it so the trailing comment lines up.
    pub fn entry(&mut self, key: &str, value: impl fmt::Display, comment: &str) -> &mut Self {
        let entry = format!("{} = {}", key, value);
        self.buffer.push_str(&format!(
            "{:<width$} # {}\n",
            entry,
            comment,
            width = COMMENT_COLUMN
        ));
        self
    }

    /// Consumes the writer, returning the text.
    pub fn finish(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_and_comments() {
        let text = "# header\n\
                    \n\
                    [identification]\n\
                    experiment_id = exp001        # experiment identification\n\
                    [QUAST parameters]\n\
                    threads = 4\n";
        let dict: OptionDict = text.parse().unwrap();

        assert_eq!(dict.get("identification", "experiment_id"), Some("exp001"));
        assert_eq!(dict.get("QUAST parameters", "threads"), Some("4"));
        assert_eq!(dict.parse::<usize>("QUAST parameters", "threads").unwrap(), 4);
        assert!(dict.get("identification", "threads").is_none());
        assert_eq!(
            dict.sorted_section_names(),
            vec!["QUAST parameters", "identification"]
        );
    }

    #[test]
    fn test_values_may_contain_equals_and_colons() {
        let dict: OptionDict = "[s]\nother = --a=1; --b\nclip = x:2:30:10\n"
            .parse()
            .unwrap();
        assert_eq!(dict.get("s", "other"), Some("--a=1; --b"));
        assert_eq!(dict.get("s", "clip"), Some("x:2:30:10"));
    }

    #[test]
    fn test_hash_inside_a_value_is_kept() {
        let dict: OptionDict = "[s]
#k = hidden
file = run#2.fq   # read file
label = a#b#c
tail = x #
"
            .parse()
            .unwrap();
        assert!(dict.get("s", "k").is_none());
        assert_eq!(dict.get("s", "file"), Some("run#2.fq"));
        assert_eq!(dict.get("s", "label"), Some("a#b#c"));
        assert_eq!(dict.get("s", "tail"), Some("x"));
    }

    #[test]
    fn test_syntax_errors() {
        let err = "key = value\n".parse::<OptionDict>().unwrap_err();
        assert_eq!(err.line, 1);

        let err = "[a]\nnot an entry\n".parse::<OptionDict>().unwrap_err();
        assert_eq!(err.line, 2);

        let err = "[a]\nk = 1\nk = 2\n".parse::<OptionDict>().unwrap_err();
        assert_eq!(err.line, 3);

        let err = "[a]\n[a]\n".parse::<OptionDict>().unwrap_err();
        assert!(err.message.contains("duplicated"));

        assert!("[a\n".parse::<OptionDict>().is_err());
        assert!("[ ]\n".parse::<OptionDict>().is_err());
    }

    #[test]
    fn test_missing_value_error() {
        let dict: OptionDict = "[a]\nk = v\n".parse().unwrap();
        let err = dict.value("a", "missing").unwrap_err();
        assert!(err.to_string().contains("\"missing\""));
        assert!(dict.parse::<u32>("a", "k").is_err());
    }

    #[test]
    fn test_writer_pads_entries() {
        let mut writer = ConfigWriter::new();
        writer
            .comment("first line")
            .comment("")
            .blank()
            .section("identification", "This section identifies the experiment.")
            .entry("experiment_id", "exp001", "experiment identification");
        let text = writer.finish();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# first line");
        assert_eq!(lines[1], "#");
        assert_eq!(lines[2], "");
        assert_eq!(lines[4], "[identification]");
        assert_eq!(lines[5].find('#'), Some(COMMENT_COLUMN + 1));
        assert!(lines[5].starts_with("experiment_id = exp001 "));

        let dict: OptionDict = text.parse().unwrap();
        assert_eq!(dict.get("identification", "experiment_id"), Some("exp001"));
    }
}
