//! The `[library]` and `[library-n]` sections shared by read based tools.

use crate::tools::Seed;
use crate::utils::codes::{Code, ReadType};
use crate::utils::options::ConfigWriter;
use crate::utils::validation::{is_none, Checker};

/// The name of the section holding the settings common to all libraries.
pub const LIBRARY_SECTION: &str = "library";

/// The prefix of the per-library sections.
pub const LIBRARY_PREFIX: &str = "library";

/// The read files of one library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Library {
    /// The read file (SE) or the + strand read file (PE).
    pub read_file_1: String,

    /// The - strand read file (PE only).
    pub read_file_2: Option<String>,
}

impl Library {
    /// Both read files, for paired-end libraries.
    pub fn pair(&self) -> Option<(&str, &str)> {
        self.read_file_2
            .as_deref()
            .map(|read_file_2| (self.read_file_1.as_str(), read_file_2))
    }
}

/// Writes the `[library-n]` sections for the libraries of `seed`.
pub fn write_library_sections(writer: &mut ConfigWriter, seed: &Seed) {
    let read_type = seed.read_type();

    for (i, (read_file_1, read_file_2)) in seed.libraries().into_iter().enumerate() {
        writer.blank();
        let name = format!("{}-{}", LIBRARY_PREFIX, i + 1);
        if i == 0 {
            writer.section(&name, "This section has the information of the first library.");
        } else {
            writer.section(&name, &format!("This section has the information of library {}.", i + 1));
        }

        writer.entry(
            "read_file_1",
            &read_file_1,
            "name of the read file in SE read type or the + strand read file in PE case",
        );
        let read_file_2 = match read_type {
            ReadType::SingleEnd => String::from("NONE"),
            ReadType::PairedEnd => read_file_2,
        };
        writer.entry(
            "read_file_2",
            read_file_2,
            "name of the - strand reads file in PE read type or NONE in SE case",
        );

        if i == 0 {
            writer
                .blank()
                .comment("If there are more libraries, you have to repeat the section library-1 with the data of each file.")
                .comment("The section identification has to be library-n (n is an integer not repeated)");
        }
    }
}

/// Writes the `read_type` entry of the `[library]` section.
pub fn write_read_type(writer: &mut ConfigWriter, seed: &Seed) {
    writer.entry(
        "read_type",
        seed.read_type(),
        &format!("read type: {}", ReadType::all_text()),
    );
}

/// Checks every `[library-n]` section. `read_type` is `None` when the read
/// type itself is invalid, in which case the pairing is not checked.
pub fn check_libraries(checker: &mut Checker<'_>, read_type: Option<ReadType>) -> Option<Vec<Library>> {
    let sections = checker.numbered_sections(LIBRARY_PREFIX);
    if sections.is_empty() {
        checker.section_error(
            "library-1",
            "the section \"library-1\" is not found.",
        );
        return None;
    }

    let mut libraries = Vec::new();
    let mut ok = true;

    for section in sections {
        let read_file_1 = checker.raw(section, "read_file_1");
        let read_file_2 = checker.raw(section, "read_file_2");

        let (read_file_1, read_file_2) = match (read_file_1, read_file_2) {
            (Some(read_file_1), Some(read_file_2)) => (read_file_1, read_file_2),
            _ => {
                ok = false;
                continue;
            }
        };

        if is_none(read_file_1) {
            checker.error(
                section,
                "read_file_1",
                format!("the key \"read_file_1\" has to be a file name in the section \"{}\".", section),
            );
            ok = false;
            continue;
        }

        match read_type {
            Some(ReadType::PairedEnd) if is_none(read_file_2) => {
                checker.error(
                    section,
                    "read_file_2",
                    format!(
                        "the key \"read_file_2\" has to be a file name in the section \"{}\" because the read type is PE.",
                        section
                    ),
                );
                ok = false;
            }
            Some(ReadType::PairedEnd) => libraries.push(Library {
                read_file_1: read_file_1.to_string(),
                read_file_2: Some(read_file_2.to_string()),
            }),
            Some(ReadType::SingleEnd) => libraries.push(Library {
                read_file_1: read_file_1.to_string(),
                read_file_2: None,
            }),
            None => ok = false,
        }
    }

    if ok {
        Some(libraries)
    } else {
        None
    }
}

/// Joins the given files, each prefixed with `dir`, with commas.
pub fn join_paths<'a, I>(dir: &str, files: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    files
        .into_iter()
        .map(|file| format!("{}/{}", dir, file))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::options::OptionDict;

    #[test]
    fn test_written_sections_check_out() {
        let seed = Seed {
            read_type: Some(ReadType::SingleEnd),
            read_files_1: vec![String::from("a.fq"), String::from("b.fq")],
            ..Seed::default()
        };
        let mut writer = ConfigWriter::new();
        writer.section(LIBRARY_SECTION, "libraries");
        write_read_type(&mut writer, &seed);
        write_library_sections(&mut writer, &seed);
        let options: OptionDict = writer.finish().parse().unwrap();

        assert_eq!(options.get("library-2", "read_file_2"), Some("NONE"));

        let mut checker = Checker::new("Tool", &options);
        let libraries = check_libraries(&mut checker, Some(ReadType::SingleEnd)).unwrap();
        assert_eq!(libraries.len(), 2);
        assert_eq!(libraries[1].read_file_1, "b.fq");
        assert!(libraries[0].pair().is_none());
        assert!(checker.finish().is_valid());
    }

    #[test]
    fn test_paired_end_needs_second_file() {
        let options: OptionDict = "[library-1]\nread_file_1 = a_1.fq\nread_file_2 = NONE\n[library-2]\nread_file_1 = b_1.fq\n"
            .parse()
            .unwrap();
        let mut checker = Checker::new("Tool", &options);
        assert!(check_libraries(&mut checker, Some(ReadType::PairedEnd)).is_none());
        let report = checker.finish();

        assert_eq!(report.issues.len(), 2);
        assert!(report.issues[0].message.contains("because the read type is PE"));
        assert_eq!(
            report.issues[1].message,
            "the key \"read_file_2\" is not found in the section \"library-2\"."
        );
    }

    #[test]
    fn test_missing_libraries() {
        let options: OptionDict = "[library]\nread_type = SE\n".parse().unwrap();
        let mut checker = Checker::new("Tool", &options);
        assert!(check_libraries(&mut checker, Some(ReadType::SingleEnd)).is_none());
        assert_eq!(
            checker.finish().issues[0].message,
            "the section \"library-1\" is not found."
        );
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/r", ["a.fq", "b.fq"]), "/r/a.fq,/r/b.fq");
    }
}
