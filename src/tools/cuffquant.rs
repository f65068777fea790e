//! Cuffquant: expression quantitation of each alignment dataset against a
//! merged transcriptome.

use crate::tools::alignment::{
    check_alignment_datasets, write_alignment_sections, AlignmentDataset,
    ALIGNMENT_DATASET_PREFIX,
};
use crate::tools::assembly::{check_assembly, Assembly};
use crate::tools::cufflinks_cuffmerge::ANNOTATION_EXTENSIONS;
use crate::tools::{config_of, report_of, Driver, PlanContext, Seed};
use crate::utils::codes::{Code, LibraryType, Software};
use crate::utils::layout::ClusterLayout;
use crate::utils::options::{ConfigWriter, OptionDict};
use crate::utils::parameters::Parameter;
use crate::utils::script::{CommandLine, ProcessScript, ShellFunction};
use crate::utils::validation::{Checker, ValidationReport};

const NAME: &str = "Cuffquant";
const ENVIRONMENT: &str = "cufflinks";
const IDENTIFICATION: &str = "identification";
const PARAMETERS: &str = "Cuffquant parameters";

/// The only assembler whose output Cuffquant accepts.
pub const MERGED_ASSEMBLERS: &[Software] = &[Software::CufflinksCuffmerge];

/// Parameters of `other_parameters` that are set from other keys.
pub const NOT_ALLOWED_PARAMETERS: &[&str] = &[
    "no-update-check",
    "num-threads",
    "mask-file",
    "library-type",
    "output-dir",
    "frag-len-mean",
    "frag-len-std-dev",
    "max-mle-iterations",
    "max-bundle-frags",
];

/// The name of the file listing the quantified alignment datasets.
pub const DATASET_LIST_FILE: &str = "alignment_dataset_id_list.txt";

/// The name of the sample sheet pairing abundance files with group labels.
pub const SAMPLE_SHEET_FILE: &str = "sample_sheet.txt";

/// The Cuffquant driver.
pub struct Cuffquant;

/// Fragment model settings shared by Cuffquant and Cuffdiff.
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentModel {
    /// Average fragment length.
    pub frag_len_mean: i64,

    /// Fragment length standard deviation.
    pub frag_len_std_dev: i64,

    /// Maximum iterations of the maximum likelihood estimation.
    pub max_mle_iterations: i64,

    /// Maximum fragments per locus before skipping it.
    pub max_bundle_frags: i64,
}

impl FragmentModel {
    /// Checks the fragment model keys of `section`.
    pub fn check(checker: &mut Checker<'_>, section: &str) -> Option<Self> {
        let frag_len_mean = checker.int(section, "frag_len_mean", 1);
        let frag_len_std_dev = checker.int(section, "frag_len_std_dev", 1);
        let max_mle_iterations = checker.int(section, "max_mle_iterations", 1);
        let max_bundle_frags = checker.int(section, "max_bundle_frags", 1);

        Some(FragmentModel {
            frag_len_mean: frag_len_mean?,
            frag_len_std_dev: frag_len_std_dev?,
            max_mle_iterations: max_mle_iterations?,
            max_bundle_frags: max_bundle_frags?,
        })
    }

    /// Writes the default fragment model keys.
    pub fn write_defaults(writer: &mut ConfigWriter) {
        writer
            .entry("frag_len_mean", 200, "average fragment length (only unpaired alignments)")
            .entry(
                "frag_len_std_dev",
                80,
                "fragment length standard deviation (only unpaired alignments)",
            )
            .entry(
                "max_mle_iterations",
                5000,
                "maximum iterations allowed for maximum likelihood estimation",
            )
            .entry(
                "max_bundle_frags",
                1000000,
                "maximum fragments allowed in a bundle before skipping",
            );
    }

    /// The command line arguments.
    pub fn arguments(&self) -> Vec<String> {
        vec![
            format!("--frag-len-mean {}", self.frag_len_mean),
            format!("--frag-len-std-dev {}", self.frag_len_std_dev),
            format!("--max-mle-iterations {}", self.max_mle_iterations),
            format!("--max-bundle-frags {}", self.max_bundle_frags),
        ]
    }
}

/// A checked Cuffquant config file.
#[derive(Debug)]
pub struct CuffquantConfig {
    /// Experiment identification.
    pub experiment_id: String,

    /// Reference dataset holding the mask file.
    pub reference_dataset_id: String,

    /// Annotation of the regions to ignore.
    pub mask_file: Option<String>,

    /// The merged transcriptome.
    pub assembly: Assembly,

    /// The alignment datasets, each with its group label.
    pub alignment_datasets: Vec<AlignmentDataset>,

    /// Number of threads.
    pub threads: i64,

    /// Library strandedness.
    pub library_type: LibraryType,

    /// Fragment model.
    pub fragments: FragmentModel,

    /// Pass-through parameters.
    pub other_parameters: Vec<Parameter>,
}

impl CuffquantConfig {
    /// Checks and reads a Cuffquant config file.
    pub fn parse(options: &OptionDict) -> Result<Self, ValidationReport> {
        let mut checker = Checker::new(NAME, options);
        let config = Self::read(&mut checker);
        checker.finish_with(config)
    }

    fn read(checker: &mut Checker<'_>) -> Option<Self> {
        let experiment_id = checker.raw(IDENTIFICATION, "experiment_id");
        let reference_dataset_id = checker.raw(IDENTIFICATION, "reference_dataset_id");
        let mask_file = checker.file_name(IDENTIFICATION, "mask_file", ANNOTATION_EXTENSIONS, true);
        let assembly = check_assembly(checker, IDENTIFICATION, MERGED_ASSEMBLERS, false);

        let alignment_datasets = check_alignment_datasets(checker, 1, true);

        let threads = checker.int(PARAMETERS, "threads", 1);
        let library_type = checker.code(PARAMETERS, "library_type");
        let fragments = FragmentModel::check(checker, PARAMETERS);
        let other_parameters =
            checker.parameter_list(PARAMETERS, "other_parameters", NOT_ALLOWED_PARAMETERS);

        checker.reject_unknown_sections(&[IDENTIFICATION, PARAMETERS], &[ALIGNMENT_DATASET_PREFIX]);

        Some(CuffquantConfig {
            experiment_id: experiment_id?.to_string(),
            reference_dataset_id: reference_dataset_id?.to_string(),
            mask_file: mask_file?.map(String::from),
            assembly: assembly??,
            alignment_datasets: alignment_datasets?,
            threads: threads?,
            library_type: library_type?,
            fragments: fragments?,
            other_parameters: other_parameters?,
        })
    }
}

impl Driver for Cuffquant {
    fn name(&self) -> &'static str {
        NAME
    }

    fn command_name(&self) -> &'static str {
        "cuffquant"
    }

    fn code(&self) -> &'static str {
        "cuffquant"
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
                "The mask file has to be located in the cluster directory {}/reference_dataset_id",
                layout.reference_dir
            ))
            .comment(&format!(
                "The alignment and assembly files have to be located in the cluster directory {}/experiment_id/dataset_id",
                layout.result_dir
            ))
            .comment("The experiment_id, reference_dataset_id, mask_file and assembly_dataset_id are fixed in the identification section.")
            .comment("")
            .comment("You can consult the parameters of Cuffquant and their meaning in \"http://cole-trapnell-lab.github.io/cufflinks/\".")
            .comment("")
            .comment("In section \"Cuffquant parameters\", the key \"other_parameters\" allows you to input additional parameters in the format:")
            .comment("")
            .comment("   other_parameters = --parameter-1[=value-1][; --parameter-2[=value-2][; ...; --parameter-n[=value-n]]]")
            .comment("")
            .comment("parameter-i is a parameter name of Cuffquant and value-i a valid value of parameter-i, e.g.")
            .comment("")
            .comment("   other_parameters = --multi-read-correct; --no-effective-length-correction")
            .blank()
            .section(IDENTIFICATION, "This section has the information that identifies the experiment.")
            .entry("experiment_id", seed.experiment_id(), "experiment identification")
            .entry(
                "reference_dataset_id",
                seed.reference_dataset_id.as_deref().unwrap_or("Athaliana"),
                "reference dataset identification",
            )
            .entry(
                "mask_file",
                seed.mask_file.as_deref().unwrap_or("NONE"),
                "mask GTF/GFF file name or NONE",
            )
            .entry(
                "assembly_software",
                Software::CufflinksCuffmerge.code(),
                &format!("assembly software: {}", Software::list_text(MERGED_ASSEMBLERS)),
            )
            .entry(
                "assembly_dataset_id",
                seed.assembly_dataset_id("cufflnkmrg-170101-235959"),
                "assembly dataset identification",
            )
            .entry("assembly_type", "NONE", "assembly type: NONE");

        write_alignment_sections(&mut writer, &seed.alignment_dataset_ids(), true);

        writer
            .blank()
            .section(PARAMETERS, "This section has the information to set the Cuffquant parameters")
            .entry("threads", 4, "number of threads for use")
            .entry(
                "library_type",
                LibraryType::FrUnstranded,
                &format!("library type: {}", LibraryType::all_text()),
            );
        FragmentModel::write_defaults(&mut writer);
        writer.entry(
            "other_parameters",
            "NONE",
            "additional parameters to the previous ones or NONE",
        );
        writer.finish()
    }

    fn check(&self, options: &OptionDict) -> ValidationReport {
        report_of(NAME, CuffquantConfig::parse(options))
    }

    fn plan(
        &self,
        options: &OptionDict,
        context: &PlanContext<'_>,
    ) -> anyhow::Result<Vec<ProcessScript>> {
        let config = config_of(CuffquantConfig::parse(options))?;
        let layout = context.layout();
        let run_dir = context.run_dir(&config.experiment_id, self.code());
        let mask_file = config
            .mask_file
            .as_deref()
            .map(|file| layout.reference_file(&config.reference_dataset_id, file));
        let transcriptome = config.assembly.transcriptome_file(layout, &config.experiment_id);
        let dataset_list_file = format!("{}/{}", run_dir, DATASET_LIST_FILE);
        let sample_sheet_file = format!("{}/{}", run_dir, SAMPLE_SHEET_FILE);

        let mut create_list = ShellFunction::new("create_alignment_dataset_list_file");
        create_list
            .line(format!("cd {}", run_dir))
            .separator()
            .line("echo \"Creation of alignment dataset list file ...\"")
            .line(format!("touch {}", dataset_list_file));
        for dataset in &config.alignment_datasets {
            create_list.line(format!("echo \"{}\" >> {}", dataset.dataset_id, dataset_list_file));
        }

        let mut create_sheet = ShellFunction::new("create_sample_sheet_file");
        create_sheet
            .line(format!("cd {}", run_dir))
            .separator()
            .line("echo \"Creation of sample sheet file ...\"")
            .line(format!("touch {}", sample_sheet_file))
            .line(format!(
                "printf '%s\\t%s\\n' \"sample_id\" \"group_label\" >> {}",
                sample_sheet_file
            ));
        for dataset in &config.alignment_datasets {
            create_sheet.line(format!(
                "printf '%s\\t%s\\n' \"{}/{}/abundances.cxb\" \"{}\" >> {}",
                run_dir,
                dataset.dataset_id,
                dataset.group_label.as_deref().unwrap_or_default(),
                sample_sheet_file
            ));
        }

        let mut cuffquant = ShellFunction::in_environment("run_cuffquant_process", ENVIRONMENT);
        for dataset in &config.alignment_datasets {
            let dataset_dir = format!("{}/{}", run_dir, dataset.dataset_id);
            cuffquant
                .line(format!("mkdir --parents {}", dataset_dir))
                .line(format!("cd {}", dataset_dir))
                .separator()
                .line(format!(
                    "echo \"Cuffquant process for alignment dataset {} ...\"",
                    dataset.dataset_id
                ))
                .command(
                    CommandLine::timed("cuffquant")
                        .arg("--no-update-check")
                        .arg(format!("--num-threads {}", config.threads))
                        .args(mask_file.iter().map(|file| format!("--mask-file {}", file)))
                        .arg(format!("--library-type {}", config.library_type.argument()))
                        .args(config.fragments.arguments())
                        .args(config.other_parameters.iter().map(Parameter::to_argument))
                        .arg(format!("--output-dir {}", dataset_dir))
                        .arg(&transcriptome)
                        .arg(dataset.bam_file(layout, &config.experiment_id)),
                );
        }

        let mut script = ProcessScript::new(format!("{} process", NAME), run_dir);
        script
            .function(create_list)
            .function(create_sheet)
            .function(cuffquant);
        Ok(vec![script])
    }
}
