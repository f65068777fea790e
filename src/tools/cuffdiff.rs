//! Cuffdiff: differential expression between the groups quantified by a
//! previous Cuffquant run.

use crate::tools::cuffquant::{
    FragmentModel, DATASET_LIST_FILE, MERGED_ASSEMBLERS, SAMPLE_SHEET_FILE,
};
use crate::tools::{config_of, report_of, Driver, PlanContext, Seed};
use crate::utils::codes::{Code, LibraryType, Software};
use crate::utils::layout::ClusterLayout;
use crate::utils::options::{ConfigWriter, OptionDict};
use crate::utils::parameters::Parameter;
use crate::utils::script::{CommandLine, ProcessScript, ShellFunction};
use crate::utils::validation::{Checker, ValidationReport};

const NAME: &str = "Cuffdiff";
const ENVIRONMENT: &str = "cufflinks";
const IDENTIFICATION: &str = "identification";
const PARAMETERS: &str = "Cuffdiff parameters";

const QUANTITATORS: &[Software] = &[Software::Cuffquant];

/// Parameters of `other_parameters` that are set from other keys.
pub const NOT_ALLOWED_PARAMETERS: &[&str] = &[
    "no-update-check",
    "num-threads",
    "mask-file",
    "library-type",
    "total-hits-norm",
    "compatible-hits-norm",
    "min-alignment-count",
    "FDR",
    "output-dir",
    "frag-len-mean",
    "frag-len-std-dev",
    "max-mle-iterations",
    "max-bundle-frags",
];

/// The Cuffdiff driver.
pub struct Cuffdiff;

/// A checked Cuffdiff config file.
#[derive(Debug)]
pub struct CuffdiffConfig {
    /// Experiment identification.
    pub experiment_id: String,

    /// The Cufflinks-Cuffmerge dataset holding the merged transcriptome.
    pub assembly_dataset_id: String,

    /// The Cuffquant dataset holding the abundances.
    pub quantitation_dataset_id: String,

    /// Number of threads.
    pub threads: i64,

    /// Library strandedness.
    pub library_type: LibraryType,

    /// Whether every fragment counts towards the FPKM denominator.
    pub total_hits_norm: bool,

    /// Whether only fragments compatible with a reference transcript count.
    pub compatible_hits_norm: bool,

    /// Minimum alignments in a locus for significance testing.
    pub min_alignment_count: i64,

    /// Allowed false discovery rate.
    pub fdr: f64,

    /// Fragment model.
    pub fragments: FragmentModel,

    /// Pass-through parameters.
    pub other_parameters: Vec<Parameter>,
}

impl CuffdiffConfig {
    /// Checks and reads a Cuffdiff config file.
    pub fn parse(options: &OptionDict) -> Result<Self, ValidationReport> {
        let mut checker = Checker::new(NAME, options);
        let config = Self::read(&mut checker);
        checker.finish_with(config)
    }

    fn read(checker: &mut Checker<'_>) -> Option<Self> {
        let experiment_id = checker.raw(IDENTIFICATION, "experiment_id");
        let assembly_dataset_id = check_dataset(checker, "assembly", MERGED_ASSEMBLERS);
        let quantitation_dataset_id = check_dataset(checker, "quantitation", QUANTITATORS);

        let threads = checker.int(PARAMETERS, "threads", 1);
        let library_type = checker.code(PARAMETERS, "library_type");
        let total_hits_norm = checker.yes_no(PARAMETERS, "total_hits_norm");
        let compatible_hits_norm = checker.yes_no(PARAMETERS, "compatible_hits_norm");
        let min_alignment_count = checker.int(PARAMETERS, "min_alignment_count", 1);
        let fdr = checker.float(PARAMETERS, "fdr", 0.0, 1.0);
        let fragments = FragmentModel::check(checker, PARAMETERS);
        let other_parameters =
            checker.parameter_list(PARAMETERS, "other_parameters", NOT_ALLOWED_PARAMETERS);

        checker.reject_unknown_sections(&[IDENTIFICATION, PARAMETERS], &[]);

        Some(CuffdiffConfig {
            experiment_id: experiment_id?.to_string(),
            assembly_dataset_id: assembly_dataset_id?,
            quantitation_dataset_id: quantitation_dataset_id?,
            threads: threads?,
            library_type: library_type?,
            total_hits_norm: total_hits_norm?,
            compatible_hits_norm: compatible_hits_norm?,
            min_alignment_count: min_alignment_count?,
            fdr: fdr?,
            fragments: fragments?,
            other_parameters: other_parameters?,
        })
    }
}

/// Checks the `{kind}_software` and `{kind}_dataset_id` pair of the
/// identification section.
fn check_dataset(checker: &mut Checker<'_>, kind: &str, allowed: &[Software]) -> Option<String> {
    let software_key = format!("{}_software", kind);
    let dataset_key = format!("{}_dataset_id", kind);
    let software = checker.code_in(IDENTIFICATION, &software_key, allowed);
    let dataset = checker.dataset_id(IDENTIFICATION, &dataset_key, allowed);

    let (software, (dataset_id, dataset_software)) = (software?, dataset?);
    if software != dataset_software {
        checker.error(
            IDENTIFICATION,
            &dataset_key,
            format!(
                "the key \"{}\" has to start with the {} software code ({}).",
                dataset_key,
                kind,
                software.code()
            ),
        );
        return None;
    }

    Some(dataset_id.to_string())
}

impl Driver for Cuffdiff {
    fn name(&self) -> &'static str {
        NAME
    }

    fn command_name(&self) -> &'static str {
        "cuffdiff"
    }

    fn code(&self) -> &'static str {
        "cuffdiff"
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
                "The assembly files have to be located in the cluster directory {}/experiment_id/assembly_dataset_id",
                layout.result_dir
            ))
            .comment(&format!(
                "The quantitation files have to be located in the cluster directory {}/experiment_id/quantitation_dataset_id",
                layout.result_dir
            ))
            .comment("The experiment_id, assembly_dataset_id and quantitation_dataset_id are fixed in the identification section.")
            .comment("")
            .comment("You can consult the parameters of Cuffdiff and their meaning in \"http://cole-trapnell-lab.github.io/cufflinks/\".")
            .comment("")
            .comment("In section \"Cuffdiff parameters\", the key \"other_parameters\" allows you to input additional parameters in the format:")
            .comment("")
            .comment("   other_parameters = --parameter-1[=value-1][; --parameter-2[=value-2][; ...; --parameter-n[=value-n]]]")
            .comment("")
            .comment("parameter-i is a parameter name of Cuffdiff and value-i a valid value of parameter-i, e.g.")
            .comment("")
            .comment("   other_parameters = --multi-read-correct; --no-length-correction")
            .blank()
            .section(IDENTIFICATION, "This section has the information that identifies the experiment.")
            .entry("experiment_id", seed.experiment_id(), "experiment identification")
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
            .entry(
                "quantitation_software",
                Software::Cuffquant.code(),
                &format!("quantitation software: {}", Software::list_text(QUANTITATORS)),
            )
            .entry(
                "quantitation_dataset_id",
                seed.quantitation_dataset_id
                    .as_deref()
                    .unwrap_or("cuffquant-170101-235959"),
                "quantitation dataset identification",
            )
            .blank()
            .section(PARAMETERS, "This section has the information to set the Cuffdiff parameters")
            .entry("threads", 4, "number of threads for use")
            .entry(
                "library_type",
                LibraryType::FrUnstranded,
                &format!("library type: {}", LibraryType::all_text()),
            )
            .entry(
                "total_hits_norm",
                "NO",
                "count all fragments towards the FPKM denominator: YES or NO",
            )
            .entry(
                "compatible_hits_norm",
                "YES",
                "count only fragments compatible with a reference transcript: YES or NO",
            )
            .entry(
                "min_alignment_count",
                10,
                "minimum number of alignments in a locus for significance testing",
            )
            .entry("fdr", 0.05, "allowed false discovery rate");
        FragmentModel::write_defaults(&mut writer);
        writer.entry(
            "other_parameters",
            "NONE",
            "additional parameters to the previous ones or NONE",
        );
        writer.finish()
    }

    fn check(&self, options: &OptionDict) -> ValidationReport {
        report_of(NAME, CuffdiffConfig::parse(options))
    }

    fn plan(
        &self,
        options: &OptionDict,
        context: &PlanContext<'_>,
    ) -> anyhow::Result<Vec<ProcessScript>> {
        let config = config_of(CuffdiffConfig::parse(options))?;
        let layout = context.layout();
        let run_dir = context.run_dir(&config.experiment_id, self.code());
        let quantitation_dir =
            layout.result_dataset_dir(&config.experiment_id, &config.quantitation_dataset_id);
        let transcriptome = format!(
            "{}/merged.gtf",
            layout.result_dataset_dir(&config.experiment_id, &config.assembly_dataset_id)
        );
        let sample_sheet_file = format!("{}/{}", run_dir, SAMPLE_SHEET_FILE);

        let copy_function = |name: &str, description: &str, file: &str| {
            let mut function = ShellFunction::new(name);
            function
                .line(format!("cd {}", run_dir))
                .separator()
                .line(format!("echo \"Copying the {} ...\"", description))
                .command(CommandLine::new("cp").arg(format!(
                    "{}/{} {}/{}",
                    quantitation_dir, file, run_dir, file
                )));
            function
        };
        let copy_list = copy_function(
            "copy_alignment_dataset_list_file",
            "alignment dataset list file",
            DATASET_LIST_FILE,
        );
        let copy_sheet = copy_function("copy_sample_sheet_file", "sample sheet file", SAMPLE_SHEET_FILE);

        let mut cuffdiff = ShellFunction::in_environment("run_cuffdiff_process", ENVIRONMENT);
        cuffdiff
            .line(format!("cd {}", run_dir))
            .separator()
            .line("echo \"Cuffdiff process ...\"")
            .command(
                CommandLine::timed("cuffdiff")
                    .arg("--no-update-check")
                    .arg(format!("--num-threads {}", config.threads))
                    .arg(format!("--library-type {}", config.library_type.argument()))
                    .arg_if(config.total_hits_norm, "--total-hits-norm")
                    .arg_if(config.compatible_hits_norm, "--compatible-hits-norm")
                    .arg(format!("--min-alignment-count {}", config.min_alignment_count))
                    .arg(format!("--FDR {}", config.fdr))
                    .args(config.fragments.arguments())
                    .args(config.other_parameters.iter().map(Parameter::to_argument))
                    .arg(format!("--output-dir {}", run_dir))
                    .arg("--use-sample-sheet")
                    .arg(&transcriptome)
                    .arg(&sample_sheet_file),
            );

        let mut script = ProcessScript::new(format!("{} process", NAME), run_dir);
        script
            .function(copy_list)
            .function(copy_sheet)
            .function(cuffdiff);
        Ok(vec![script])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::script::ScriptContext;
    use crate::utils::settings::Settings;

    fn default_options() -> OptionDict {
        Cuffdiff
            .default_config(&Seed::default(), &ClusterLayout::default())
            .parse()
            .unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let options = default_options();
        let report = Cuffdiff.check(&options);
        assert!(report.is_valid(), "{}", report);
        assert_eq!(options.get(PARAMETERS, "total_hits_norm"), Some("NO"));
    }

    #[test]
    fn test_dataset_rules() {
        let mut options = default_options();
        options.insert(IDENTIFICATION, "quantitation_software", "cufflnkmrg");
        options.insert(IDENTIFICATION, "assembly_dataset_id", "cuffquant-170101-235959");
        options.insert(PARAMETERS, "compatible_hits_norm", "maybe");
        options.insert(PARAMETERS, "fdr", "2");
        let report = Cuffdiff.check(&options);
        let messages: Vec<&str> = report.issues.iter().map(|i| i.message.as_str()).collect();

        assert_eq!(
            messages,
            vec![
                "the key \"assembly_dataset_id\" has to start with cufflnkmrg (Cufflinks-Cuffmerge).",
                "the key \"quantitation_software\" has to be cuffquant (Cuffquant).",
                "the key \"compatible_hits_norm\" has to be YES or NO.",
                "the key \"fdr\" has to be a float number between 0.0 and 1.0.",
            ]
        );
    }

    #[test]
    fn test_script_commands() {
        let mut options = default_options();
        options.insert(PARAMETERS, "total_hits_norm", "YES");
        options.insert(PARAMETERS, "compatible_hits_norm", "NO");
        let settings = Settings::default();
        let context = PlanContext {
            run_dir: Some(String::from("/r/exp001/cuffdiff-run")),
            ..PlanContext::new(&settings)
        };
        let scripts = Cuffdiff.plan(&options, &context).unwrap();
        assert_eq!(
            scripts[0].function_names(),
            vec![
                "copy_alignment_dataset_list_file",
                "copy_sample_sheet_file",
                "run_cuffdiff_process",
            ]
        );
        let text = scripts[0].render(&ScriptContext {
            cluster_name: "c1",
            settings: &settings,
        });

        assert!(text.contains(
            "    cp /ngscloud2/results/exp001/cuffquant-170101-235959/sample_sheet.txt /r/exp001/cuffdiff-run/sample_sheet.txt\n"
        ));
        assert!(text.contains("            --total-hits-norm \\\n"));
        assert!(!text.contains("--compatible-hits-norm"));
        assert!(text.contains(
            "            --use-sample-sheet \\\n            /ngscloud2/results/exp001/cufflnkmrg-170101-235959/merged.gtf \\\n            /r/exp001/cuffdiff-run/sample_sheet.txt\n"
        ));
        assert!(text.contains("manage_error cuffdiff $RC"));
    }
}
