//! Reference datasets.

use crate::utils::layout::ClusterLayout;
use crate::utils::validation::{is_none, Checker};

/// A reference file within a reference dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    /// The dataset identification.
    pub dataset_id: String,

    /// The file name within the dataset.
    pub file: String,
}

impl Reference {
    /// The path of the reference file on the cluster.
    pub fn path(&self, layout: &ClusterLayout) -> String {
        layout.reference_file(&self.dataset_id, &self.file)
    }

    /// The path of another file of the same dataset.
    pub fn sibling(&self, layout: &ClusterLayout, file: &str) -> String {
        layout.reference_file(&self.dataset_id, file)
    }
}

/// Checks the `reference_dataset_id` and `reference_file` keys of `section`.
///
/// With `optional` set both may be `NONE` (then `Some(None)` is returned);
/// otherwise both are required.
pub fn check_reference(
    checker: &mut Checker<'_>,
    section: &str,
    optional: bool,
) -> Option<Option<Reference>> {
    let dataset_id = checker.raw(section, "reference_dataset_id");
    let file = checker.raw(section, "reference_file");
    let (dataset_id, file) = match (dataset_id, file) {
        (Some(dataset_id), Some(file)) => (dataset_id, file),
        _ => return None,
    };

    match (is_none(dataset_id), is_none(file)) {
        (false, false) => Some(Some(Reference {
            dataset_id: dataset_id.to_string(),
            file: file.to_string(),
        })),
        (true, true) if optional => Some(None),
        (true, _) if !optional => {
            checker.error(
                section,
                "reference_dataset_id",
                "the key \"reference_dataset_id\" has to be a reference dataset identification.",
            );
            None
        }
        (true, false) => {
            checker.error(
                section,
                "reference_file",
                "the key \"reference_file\" has to be NONE if the key \"reference_dataset_id\" is NONE.",
            );
            None
        }
        (false, true) => {
            checker.error(
                section,
                "reference_file",
                "the key \"reference_file\" has to be a file name if the key \"reference_dataset_id\" is not NONE.",
            );
            None
        }
        (true, true) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::options::OptionDict;

    fn check(text: &str, optional: bool) -> (Option<Option<Reference>>, Vec<String>) {
        let options: OptionDict = text.parse().unwrap();
        let mut checker = Checker::new("Tool", &options);
        let reference = check_reference(&mut checker, "i", optional);
        let messages = checker
            .finish()
            .issues
            .into_iter()
            .map(|issue| issue.message)
            .collect();
        (reference, messages)
    }

    #[test]
    fn test_optional_reference() {
        let (reference, messages) = check("[i]\nreference_dataset_id = NONE\nreference_file = NONE\n", true);
        assert_eq!(reference, Some(None));
        assert!(messages.is_empty());

        let (reference, messages) = check("[i]\nreference_dataset_id = NONE\nreference_file = g.fa\n", true);
        assert!(reference.is_none());
        assert!(messages[0].contains("has to be NONE"));

        let (reference, messages) = check("[i]\nreference_dataset_id = Athaliana\nreference_file = none\n", true);
        assert!(reference.is_none());
        assert!(messages[0].contains("has to be a file name"));
    }

    #[test]
    fn test_required_reference() {
        let (reference, messages) = check("[i]\nreference_dataset_id = NONE\nreference_file = NONE\n", false);
        assert!(reference.is_none());
        assert_eq!(messages.len(), 1);

        let (reference, _) = check("[i]\nreference_dataset_id = Athaliana\nreference_file = g.fa\n", false);
        let reference = reference.unwrap().unwrap();
        assert_eq!(
            reference.path(&ClusterLayout::default()),
            "/ngscloud2/references/Athaliana/g.fa"
        );
    }
}
