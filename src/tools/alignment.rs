//! The `[alignment-dataset-n]` sections used by the Cufflinks suite.

use crate::utils::codes::{Code, Software, ALIGNERS};
use crate::utils::layout::ClusterLayout;
use crate::utils::options::ConfigWriter;
use crate::utils::validation::Checker;

/// The prefix of the alignment dataset sections.
pub const ALIGNMENT_DATASET_PREFIX: &str = "alignment-dataset";

/// An alignment dataset produced by STAR or TopHat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignmentDataset {
    /// The aligner that produced the dataset.
    pub software: Software,

    /// The dataset identification.
    pub dataset_id: String,

    /// The group of the sample (Cuffquant only).
    pub group_label: Option<String>,
}

impl AlignmentDataset {
    /// The sorted BAM file written by the aligner.
    pub fn bam_file(&self, layout: &ClusterLayout, experiment_id: &str) -> String {
        let file = match self.software {
            Software::TopHat => "accepted_hits.bam",
            _ => "starAligned.sortedByCoord.out.bam",
        };
        format!(
            "{}/{}",
            layout.result_dataset_dir(experiment_id, &self.dataset_id),
            file
        )
    }
}

/// Writes one `[alignment-dataset-n]` section per dataset id. Group labels are
/// written as `individual_n` when `with_group_label` is set.
pub fn write_alignment_sections(
    writer: &mut ConfigWriter,
    dataset_ids: &[String],
    with_group_label: bool,
) {
    for (i, dataset_id) in dataset_ids.iter().enumerate() {
        let software = Software::of_dataset(dataset_id, ALIGNERS).unwrap_or(Software::Star);

        writer.blank();
        let name = format!("{}-{}", ALIGNMENT_DATASET_PREFIX, i + 1);
        if i == 0 {
            writer.section(&name, "This section has the information of the first alignment dataset.");
        } else {
            writer.section(
                &name,
                &format!("This section has the information of alignment dataset {}.", i + 1),
            );
        }
        writer.entry(
            "alignment_software",
            software.code(),
            &format!("alignment software: {}", Software::list_text(ALIGNERS)),
        );
        writer.entry(
            "alignment_dataset_id",
            dataset_id,
            "alignment dataset identification",
        );
        if with_group_label {
            writer.entry(
                "group_label",
                format!("individual_{}", i + 1),
                "group label",
            );
        }

        if i == 0 {
            writer
                .blank()
                .comment("If there are more alignment datasets, you have to repeat the section alignment-dataset-1 with the data of each dataset.")
                .comment("The section identification has to be alignment-dataset-n (n is an integer not repeated)");
        }
    }
}

/// Checks every `[alignment-dataset-n]` section; at least `minimum` sections
/// numbered from 1 have to exist.
pub fn check_alignment_datasets(
    checker: &mut Checker<'_>,
    minimum: usize,
    with_group_label: bool,
) -> Option<Vec<AlignmentDataset>> {
    let mut ok = true;

    for n in 1..=minimum {
        let name = format!("{}-{}", ALIGNMENT_DATASET_PREFIX, n);
        if !checker.options().has_section(&name) {
            checker.section_error(&name, format!("the section \"{}\" is not found.", name));
            ok = false;
        }
    }

    let mut datasets = Vec::new();
    for section in checker.numbered_sections(ALIGNMENT_DATASET_PREFIX) {
        let software = checker.code_in(section, "alignment_software", ALIGNERS);
        let dataset = checker.dataset_id(section, "alignment_dataset_id", ALIGNERS);
        let group_label = if with_group_label {
            checker.raw(section, "group_label").map(Some)
        } else {
            Some(None)
        };

        match (software, dataset, group_label) {
            (Some(software), Some((dataset_id, dataset_software)), Some(group_label)) => {
                if software != dataset_software {
                    checker.error(
                        section,
                        "alignment_dataset_id",
                        format!(
                            "the key \"alignment_dataset_id\" has to start with {} in the section \"{}\".",
                            software.code(),
                            section
                        ),
                    );
                    ok = false;
                    continue;
                }

                datasets.push(AlignmentDataset {
                    software,
                    dataset_id: dataset_id.to_string(),
                    group_label: group_label.map(String::from),
                });
            }
            _ => ok = false,
        }
    }

    if ok {
        Some(datasets)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::options::OptionDict;

    #[test]
    fn test_written_sections_check_out() {
        let mut writer = ConfigWriter::new();
        write_alignment_sections(
            &mut writer,
            &[
                String::from("star-170101-235959"),
                String::from("tophat-170101-235959"),
            ],
            true,
        );
        let options: OptionDict = writer.finish().parse().unwrap();
        let mut checker = Checker::new("Tool", &options);
        let datasets = check_alignment_datasets(&mut checker, 1, true).unwrap();

        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[1].software, Software::TopHat);
        assert_eq!(datasets[1].group_label.as_deref(), Some("individual_2"));
        assert!(checker.finish().is_valid());
    }

    #[test]
    fn test_mismatched_software_and_minimum() {
        let options: OptionDict =
            "[alignment-dataset-1]\nalignment_software = tophat\nalignment_dataset_id = star-1\n"
                .parse()
                .unwrap();
        let mut checker = Checker::new("Tool", &options);
        assert!(check_alignment_datasets(&mut checker, 2, false).is_none());
        let report = checker.finish();

        assert_eq!(
            report.issues[0].message,
            "the section \"alignment-dataset-2\" is not found."
        );
        assert!(report.issues[1].message.contains("has to start with tophat"));
    }

    #[test]
    fn test_bam_files() {
        let layout = ClusterLayout::default();
        let dataset = AlignmentDataset {
            software: Software::TopHat,
            dataset_id: String::from("tophat-1"),
            group_label: None,
        };
        assert_eq!(
            dataset.bam_file(&layout, "exp001"),
            "/ngscloud2/results/exp001/tophat-1/accepted_hits.bam"
        );
    }
}
