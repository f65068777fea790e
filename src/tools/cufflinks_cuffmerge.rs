//! Cufflinks followed by Cuffmerge: per-sample transcript assembly and
//! merging of the assemblies into one transcriptome.

use crate::tools::alignment::{
    check_alignment_datasets, write_alignment_sections, AlignmentDataset,
    ALIGNMENT_DATASET_PREFIX,
};
use crate::tools::reference::{check_reference, Reference};
use crate::tools::{config_of, report_of, Driver, PlanContext, Seed};
use crate::utils::codes::{Code, LibraryType};
use crate::utils::layout::ClusterLayout;
use crate::utils::options::{ConfigWriter, OptionDict};
use crate::utils::parameters::Parameter;
use crate::utils::script::{CommandLine, ProcessScript, ShellFunction};
use crate::utils::validation::{Checker, ValidationReport};

const NAME: &str = "Cufflinks-Cuffmerge";
const ENVIRONMENT: &str = "cufflinks";
const IDENTIFICATION: &str = "identification";
const CUFFLINKS_PARAMETERS: &str = "Cufflinks parameters";
const CUFFMERGE_PARAMETERS: &str = "Cuffmerge parameters";

/// Annotation file extensions accepted for the guide and the mask.
pub const ANNOTATION_EXTENSIONS: &[&str] = &[".gtf", ".gff"];

/// Parameters of `other_parameters` that are set from other keys.
pub const NOT_ALLOWED_PARAMETERS: &[&str] = &[
    "no-update-check",
    "num-threads",
    "GTF-guide",
    "mask-file",
    "library-type",
    "library-norm-method",
    "output-dir",
];

/// The Cufflinks-Cuffmerge driver.
pub struct CufflinksCuffmerge;

/// A checked Cufflinks-Cuffmerge config file.
#[derive(Debug)]
pub struct CufflinksCuffmergeConfig {
    /// Experiment identification.
    pub experiment_id: String,

    /// The reference genome.
    pub reference: Reference,

    /// Annotation guiding the assembly, within the reference dataset.
    pub gtf_guide: String,

    /// Annotation of the regions to ignore, within the reference dataset.
    pub mask_file: Option<String>,

    /// The alignment datasets; one Cufflinks run each.
    pub alignment_datasets: Vec<AlignmentDataset>,

    /// Number of threads.
    pub threads: i64,

    /// Library strandedness.
    pub library_type: LibraryType,

    /// Pass-through Cufflinks parameters.
    pub other_parameters: Vec<Parameter>,

    /// Minimum isoform fraction kept by Cuffmerge.
    pub min_isoform_fraction: f64,
}

impl CufflinksCuffmergeConfig {
    /// Checks and reads a Cufflinks-Cuffmerge config file.
    pub fn parse(options: &OptionDict) -> Result<Self, ValidationReport> {
        let mut checker = Checker::new(NAME, options);
        let config = Self::read(&mut checker);
        checker.finish_with(config)
    }

    fn read(checker: &mut Checker<'_>) -> Option<Self> {
        let experiment_id = checker.raw(IDENTIFICATION, "experiment_id");
        let reference = check_reference(checker, IDENTIFICATION, false);
        let gtf_guide = checker.file_name(IDENTIFICATION, "gtf_guide", ANNOTATION_EXTENSIONS, false);
        let mask_file = checker.file_name(IDENTIFICATION, "mask_file", ANNOTATION_EXTENSIONS, true);

        let alignment_datasets = check_alignment_datasets(checker, 2, false);

        let threads = checker.int(CUFFLINKS_PARAMETERS, "threads", 1);
        let library_type = checker.code(CUFFLINKS_PARAMETERS, "library_type");
        let other_parameters =
            checker.parameter_list(CUFFLINKS_PARAMETERS, "other_parameters", NOT_ALLOWED_PARAMETERS);
        let min_isoform_fraction =
            checker.float(CUFFMERGE_PARAMETERS, "min_isoform_fraction", 0.0, 1.0);

        checker.reject_unknown_sections(
            &[IDENTIFICATION, CUFFLINKS_PARAMETERS, CUFFMERGE_PARAMETERS],
            &[ALIGNMENT_DATASET_PREFIX],
        );

        Some(CufflinksCuffmergeConfig {
            experiment_id: experiment_id?.to_string(),
            reference: reference??,
            gtf_guide: gtf_guide??.to_string(),
            mask_file: mask_file?.map(String::from),
            alignment_datasets: alignment_datasets?,
            threads: threads?,
            library_type: library_type?,
            other_parameters: other_parameters?,
            min_isoform_fraction: min_isoform_fraction?,
        })
    }
}

impl Driver for CufflinksCuffmerge {
    fn name(&self) -> &'static str {
        NAME
    }

    fn command_name(&self) -> &'static str {
        "cufflinks-cuffmerge"
    }

    fn code(&self) -> &'static str {
        "cufflnkmrg"
    }

    fn environments(&self) -> &'static [&'static str] {
        &[ENVIRONMENT]
    }

    fn default_config(&self, seed: &Seed, layout: &ClusterLayout) -> String {
        let mut writer = ConfigWriter::new();
        writer
            .comment("You must review the information of this file and update the values with the corresponding ones to the current run.")
            .comment("")
            .comment(&format!(
                "The reference and annotation files have to be located in the cluster directory {}/reference_dataset_id",
                layout.reference_dir
            ))
            .comment(&format!(
                "The alignment files have to be located in the cluster directory {}/experiment_id/alignment_dataset_id",
                layout.result_dir
            ))
            .comment("The experiment_id, reference_dataset_id, reference_file, gtf_guide and mask_file are fixed in the identification section.")
            .comment("")
            .comment("You can consult the parameters of Cufflinks and Cuffmerge and their meaning in \"http://cole-trapnell-lab.github.io/cufflinks/\".")
            .comment("")
            .comment("In section \"Cufflinks parameters\", the key \"other_parameters\" allows you to input additional parameters in the format:")
            .comment("")
            .comment("   other_parameters = --parameter-1[=value-1][; --parameter-2[=value-2][; ...; --parameter-n[=value-n]]]")
            .comment("")
            .comment("parameter-i is a parameter name of Cufflinks and value-i a valid value of parameter-i, e.g.")
            .comment("")
            .comment("   other_parameters = --frag-len-mean=200; --multi-read-correct")
            .blank()
            .section(IDENTIFICATION, "This section has the information that identifies the experiment.")
            .entry("experiment_id", seed.experiment_id(), "experiment identification")
            .entry(
                "reference_dataset_id",
                seed.reference_dataset_id.as_deref().unwrap_or("Athaliana"),
                "reference dataset identification",
            )
            .entry(
                "reference_file",
                seed.reference_file
                    .as_deref()
                    .unwrap_or("Arabidopsis_thaliana.TAIR10.dna.toplevel.fa"),
                "reference file name",
            )
            .entry(
                "gtf_guide",
                seed.annotation_file
                    .as_deref()
                    .unwrap_or("Arabidopsis_thaliana.TAIR10.36.gtf"),
                "GTF/GFF file name used as guide",
            )
            .entry(
                "mask_file",
                seed.mask_file.as_deref().unwrap_or("NONE"),
                "mask GTF/GFF file name or NONE",
            );

        write_alignment_sections(&mut writer, &seed.alignment_dataset_ids(), false);

        writer
            .blank()
            .section(CUFFLINKS_PARAMETERS, "This section has the information to set the Cufflinks parameters")
            .entry("threads", 4, "number of threads for use")
            .entry(
                "library_type",
                LibraryType::FrUnstranded,
                &format!("library type: {}", LibraryType::all_text()),
            )
            .entry(
                "other_parameters",
                "NONE",
                "additional parameters to the previous ones or NONE",
            )
            .blank()
            .section(CUFFMERGE_PARAMETERS, "This section has the information to set the Cuffmerge parameters")
            .entry(
                "min_isoform_fraction",
                0.05,
                "minimum isoform fraction: a value between 0.0 and 1.0",
            );
        writer.finish()
    }

    fn check(&self, options: &OptionDict) -> ValidationReport {
        report_of(NAME, CufflinksCuffmergeConfig::parse(options))
    }

    fn plan(
        &self,
        options: &OptionDict,
        context: &PlanContext<'_>,
    ) -> anyhow::Result<Vec<ProcessScript>> {
        let config = config_of(CufflinksCuffmergeConfig::parse(options))?;
        let layout = context.layout();
        let run_dir = context.run_dir(&config.experiment_id, self.code());
        let gtf_guide = config.reference.sibling(layout, &config.gtf_guide);
        let mask_file = config
            .mask_file
            .as_deref()
            .map(|file| config.reference.sibling(layout, file));
        let dataset_list_file = format!("{}/alignment_dataset_id_list.txt", run_dir);
        let gtf_list_file = format!("{}/cufflinks_output_gtf_list.txt", run_dir);

        let mut create_list = ShellFunction::new("create_alignment_dataset_list_file");
        create_list
            .line(format!("cd {}", run_dir))
            .separator()
            .line("echo \"Creation of alignment dataset list file ...\"")
            .line(format!("touch {}", dataset_list_file));
        for dataset in &config.alignment_datasets {
            create_list.line(format!("echo \"{}\" >> {}", dataset.dataset_id, dataset_list_file));
        }

        let mut cufflinks = ShellFunction::in_environment("run_cufflinks_process", ENVIRONMENT);
        for dataset in &config.alignment_datasets {
            let dataset_dir = format!("{}/{}", run_dir, dataset.dataset_id);
            cufflinks
                .line(format!("mkdir --parents {}", dataset_dir))
                .line(format!("cd {}", dataset_dir))
                .separator()
                .line(format!(
                    "echo \"Cufflinks process for alignment dataset {} ...\"",
                    dataset.dataset_id
                ))
                .command(
                    CommandLine::timed("cufflinks")
                        .arg("--no-update-check")
                        .arg(format!("--num-threads {}", config.threads))
                        .arg(format!("--GTF-guide {}", gtf_guide))
                        .args(mask_file.iter().map(|file| format!("--mask-file {}", file)))
                        .arg(format!("--library-type {}", config.library_type.argument()))
                        .args(config.other_parameters.iter().map(Parameter::to_argument))
                        .arg(format!("--output-dir {}", dataset_dir))
                        .arg(dataset.bam_file(layout, &config.experiment_id)),
                );
        }

        let mut create_gtf_list = ShellFunction::new("create_cufflinks_output_gtf_list_file");
        create_gtf_list
            .line(format!("cd {}", run_dir))
            .separator()
            .line("echo \"Creation of Cufflinks output GTF list file ...\"")
            .line(format!("touch {}", gtf_list_file));
        for dataset in &config.alignment_datasets {
            create_gtf_list.command(CommandLine::new("ls").arg(format!(
                "{}/{}/transcripts.gtf >> {}",
                run_dir, dataset.dataset_id, gtf_list_file
            )));
        }

        let mut cuffmerge = ShellFunction::in_environment("run_cuffmerge_process", ENVIRONMENT);
        cuffmerge
            .line(format!("cd {}", run_dir))
            .separator()
            .line("echo \"Cuffmerge process ...\"")
            .command(
                CommandLine::timed("cuffmerge")
                    .arg(format!("--num-threads {}", config.threads))
                    .arg(format!("--ref-sequence {}", config.reference.path(layout)))
                    .arg(format!("--ref-gtf {}", gtf_guide))
                    .arg(format!("--min-isoform-fraction {}", config.min_isoform_fraction))
                    .arg(format!("--output-dir {}", run_dir))
                    .arg(&gtf_list_file),
            );

        let mut script = ProcessScript::new(format!("{} process", NAME), run_dir);
        script
            .function(create_list)
            .function(cufflinks)
            .function(create_gtf_list)
            .function(cuffmerge);
        Ok(vec![script])
    }
}
