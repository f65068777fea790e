//! Assembly datasets used as input by QUAST and Bowtie2.

use crate::utils::codes::{AssemblyType, Code, Software};
use crate::utils::layout::ClusterLayout;
use crate::utils::validation::{is_none, Checker};

/// An assembly dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assembly {
    /// The assembler that produced the dataset.
    pub software: Software,

    /// The dataset identification.
    pub dataset_id: String,

    /// Which output to use, for assemblers writing both contigs and scaffolds.
    pub assembly_type: AssemblyType,
}

impl Assembly {
    /// The file holding the assembled transcripts.
    pub fn transcriptome_file(&self, layout: &ClusterLayout, experiment_id: &str) -> String {
        let file = match (self.software, self.assembly_type) {
            (Software::SoapDenovoTrans | Software::SoapDenovo2, AssemblyType::Scaffolds) => {
                format!("{}-{}.scafSeq", experiment_id, self.dataset_id)
            }
            (Software::SoapDenovoTrans | Software::SoapDenovo2, _) => {
                format!("{}-{}.contig", experiment_id, self.dataset_id)
            }
            (Software::TransAbyss, _) => String::from("transabyss-final.fa"),
            (Software::Trinity, _) => String::from("Trinity.fasta"),
            (Software::GgTrinity, _) => String::from("Trinity-GG.fasta"),
            (Software::CdHitEst, _) => String::from("clustered-transcriptome.fasta"),
            (Software::TranscriptFilter, _) => String::from("filtered-transcriptome.fasta"),
            (Software::Starcode, _) => String::from("starcode.fasta"),
            (Software::CufflinksCuffmerge, _) => String::from("merged.gtf"),
            (_, _) => String::from("transcriptome.fasta"),
        };

        format!(
            "{}/{}",
            layout.result_dataset_dir(experiment_id, &self.dataset_id),
            file
        )
    }
}

/// The comment of the `assembly_type` entry.
pub fn assembly_type_text() -> String {
    format!(
        "assembly type: CONTIGS or SCAFFOLDS in {} or {}; NONE in any other case",
        Software::SoapDenovoTrans.name(),
        Software::SoapDenovo2.name()
    )
}

/// The assembly type matching a seed dataset id.
pub fn default_assembly_type(dataset_id: &str, assembly_type: Option<AssemblyType>) -> AssemblyType {
    let has_types = Software::of_dataset(dataset_id, Software::ALL)
        .map(|software| software.has_assembly_types())
        .unwrap_or(false);

    match (has_types, assembly_type) {
        (true, Some(AssemblyType::None)) | (true, None) => AssemblyType::Contigs,
        (true, Some(assembly_type)) => assembly_type,
        (false, _) => AssemblyType::None,
    }
}

/// Checks the `assembly_software`, `assembly_dataset_id` and `assembly_type`
/// keys of `section`.
///
/// When `allow_none` is set, `assembly_software = NONE` means no assembly is
/// used; the dataset and type have to be `NONE` as well and `Some(None)` is
/// returned.
pub fn check_assembly(
    checker: &mut Checker<'_>,
    section: &str,
    allowed: &[Software],
    allow_none: bool,
) -> Option<Option<Assembly>> {
    let raw_software = checker.raw(section, "assembly_software");
    let raw_dataset_id = checker.raw(section, "assembly_dataset_id");
    let raw_type = checker.raw(section, "assembly_type");

    let (raw_software, raw_dataset_id, raw_type) = match (raw_software, raw_dataset_id, raw_type) {
        (Some(software), Some(dataset_id), Some(assembly_type)) => {
            (software, dataset_id, assembly_type)
        }
        _ => return None,
    };

    if allow_none && is_none(raw_software) {
        let mut ok = true;
        if !is_none(raw_dataset_id) {
            checker.error(
                section,
                "assembly_dataset_id",
                "the key \"assembly_dataset_id\" has to be NONE if the assembly software is NONE.",
            );
            ok = false;
        }
        if !is_none(raw_type) {
            checker.error(
                section,
                "assembly_type",
                "the key \"assembly_type\" has to be NONE if the assembly software is NONE.",
            );
            ok = false;
        }
        return if ok { Some(None) } else { None };
    }

    let software = checker.code_in(section, "assembly_software", allowed);
    let dataset = checker.dataset_id(section, "assembly_dataset_id", allowed);

    let (software, dataset_id) = match (software, dataset) {
        (Some(software), Some((dataset_id, dataset_software))) => {
            if software != dataset_software {
                checker.error(
                    section,
                    "assembly_dataset_id",
                    format!(
                        "the key \"assembly_dataset_id\" has to start with the assembly software code ({}).",
                        software.code()
                    ),
                );
                return None;
            }
            (software, dataset_id)
        }
        _ => return None,
    };

    let assembly_type = match AssemblyType::from_code(raw_type) {
        Some(t @ (AssemblyType::Contigs | AssemblyType::Scaffolds)) if software.has_assembly_types() => {
            Some(t)
        }
        Some(AssemblyType::None) if !software.has_assembly_types() => Some(AssemblyType::None),
        _ => None,
    };

    match assembly_type {
        Some(assembly_type) => Some(Some(Assembly {
            software,
            dataset_id: dataset_id.to_string(),
            assembly_type,
        })),
        None => {
            checker.error(
                section,
                "assembly_type",
                format!(
                    "the key \"assembly_type\" has to be CONTIGS or SCAFFOLDS in {} or {}, or NONE in any other case.",
                    Software::SoapDenovoTrans.name(),
                    Software::SoapDenovo2.name()
                ),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::codes::{ASSEMBLERS, EXTENDED_ASSEMBLERS};
    use crate::utils::options::OptionDict;

    fn check(text: &str, allowed: &[Software], allow_none: bool) -> (Option<Option<Assembly>>, usize) {
        let options: OptionDict = text.parse().unwrap();
        let mut checker = Checker::new("Tool", &options);
        let assembly = check_assembly(&mut checker, "identification", allowed, allow_none);
        (assembly, checker.finish().issues.len())
    }

    #[test]
    fn test_soapdenovo_needs_type() {
        let (assembly, issues) = check(
            "[identification]\nassembly_software = sdnt\nassembly_dataset_id = sdnt-1\nassembly_type = scaffolds\n",
            ASSEMBLERS,
            false,
        );
        assert_eq!(issues, 0);
        assert_eq!(assembly.unwrap().unwrap().assembly_type, AssemblyType::Scaffolds);

        let (assembly, issues) = check(
            "[identification]\nassembly_software = sdnt\nassembly_dataset_id = sdnt-1\nassembly_type = NONE\n",
            ASSEMBLERS,
            false,
        );
        assert!(assembly.is_none());
        assert_eq!(issues, 1);
    }

    #[test]
    fn test_other_assemblers_need_none() {
        let (assembly, issues) = check(
            "[identification]\nassembly_software = trinity\nassembly_dataset_id = trinity-1\nassembly_type = CONTIGS\n",
            ASSEMBLERS,
            false,
        );
        assert!(assembly.is_none());
        assert_eq!(issues, 1);
    }

    #[test]
    fn test_none_software() {
        let (assembly, issues) = check(
            "[identification]\nassembly_software = NONE\nassembly_dataset_id = NONE\nassembly_type = NONE\n",
            EXTENDED_ASSEMBLERS,
            true,
        );
        assert_eq!(assembly, Some(None));
        assert_eq!(issues, 0);

        let (assembly, issues) = check(
            "[identification]\nassembly_software = NONE\nassembly_dataset_id = trinity-1\nassembly_type = CONTIGS\n",
            EXTENDED_ASSEMBLERS,
            true,
        );
        assert!(assembly.is_none());
        assert_eq!(issues, 2);
    }

    #[test]
    fn test_transcriptome_files() {
        let layout = ClusterLayout::default();
        let assembly = Assembly {
            software: Software::SoapDenovoTrans,
            dataset_id: String::from("sdnt-170101-235959"),
            assembly_type: AssemblyType::Contigs,
        };
        assert_eq!(
            assembly.transcriptome_file(&layout, "exp001"),
            "/ngscloud2/results/exp001/sdnt-170101-235959/exp001-sdnt-170101-235959.contig"
        );

        let assembly = Assembly {
            software: Software::GgTrinity,
            dataset_id: String::from("ggtrinity-1"),
            assembly_type: AssemblyType::None,
        };
        assert!(assembly
            .transcriptome_file(&layout, "exp001")
            .ends_with("/ggtrinity-1/Trinity-GG.fasta"));
    }

    #[test]
    fn test_default_assembly_type() {
        assert_eq!(default_assembly_type("sdnt-1", None), AssemblyType::Contigs);
        assert_eq!(
            default_assembly_type("sdn2-1", Some(AssemblyType::Scaffolds)),
            AssemblyType::Scaffolds
        );
        assert_eq!(
            default_assembly_type("trinity-1", Some(AssemblyType::Contigs)),
            AssemblyType::None
        );
    }
}
