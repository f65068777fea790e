//! Trans-ABySS: de novo transcriptome assembly.
//!
//! Every k-mer size listed in `kmer` is assembled by its own process, each in
//! its own run directory.

use crate::tools::library::{
    check_libraries, write_library_sections, write_read_type, Library, LIBRARY_PREFIX,
    LIBRARY_SECTION,
};
use crate::tools::{config_of, report_of, Driver, PlanContext, Seed};
use crate::utils::codes::{Code, FileFormat, ReadType};
use crate::utils::layout::ClusterLayout;
use crate::utils::options::{ConfigWriter, OptionDict};
use crate::utils::parameters::Parameter;
use crate::utils::script::{CommandLine, ProcessScript, ShellFunction};
use crate::utils::validation::{Checker, ValidationReport};

const NAME: &str = "Trans-ABySS";
const IDENTIFICATION: &str = "identification";
const PARAMETERS: &str = "Trans-ABySS parameters";

/// Parameters of `other_parameters` that are set from other keys.
pub const NOT_ALLOWED_PARAMETERS: &[&str] = &[
    "threads", "length", "kmer", "cov", "eros", "seros", "gsim", "indel", "island", "useblat",
    "pid", "walk", "cleanup",
];

/// The Trans-ABySS driver.
pub struct TransAbyss;

/// A checked Trans-ABySS config file.
#[derive(Debug)]
pub struct TransAbyssConfig {
    /// Experiment identification.
    pub experiment_id: String,

    /// Read dataset holding the library files.
    pub read_dataset_id: String,

    /// Number of threads.
    pub threads: i64,

    /// Minimum output sequence length.
    pub length: i64,

    /// The k-mer sizes; one process is run for each.
    pub kmers: Vec<i64>,

    /// Minimum mean k-mer coverage of a unitig.
    pub cov: i64,

    /// Minimum erosion k-mer coverage.
    pub eros: i64,

    /// Minimum erosion k-mer coverage per strand.
    pub seros: i64,

    /// Maximum iterations of graph simplification.
    pub gsim: i64,

    /// Indel size tolerance.
    pub indel: i64,

    /// Minimum length of island unitigs.
    pub island: i64,

    /// Whether BLAT alignments are used to remove redundant sequences.
    pub useblat: bool,

    /// Minimum percent sequence identity of redundant sequences.
    pub pid: f64,

    /// Percentage of mean k-mer coverage of seed for path-walking.
    pub walk: f64,

    /// Level of clean-up of intermediate files. Checked only; Trans-ABySS
    /// has no matching option.
    pub cleanup: i64,

    /// Pass-through parameters.
    pub other_parameters: Vec<Parameter>,

    /// Format of the read files. Trans-ABySS detects it from the files, so
    /// it is checked but never passed on.
    pub format: FileFormat,

    /// Read type of the libraries.
    pub read_type: ReadType,

    /// The libraries.
    pub libraries: Vec<Library>,
}

impl TransAbyssConfig {
    /// Checks and reads a Trans-ABySS config file.
    pub fn parse(options: &OptionDict) -> Result<Self, ValidationReport> {
        let mut checker = Checker::new(NAME, options);
        let config = Self::read(&mut checker);
        checker.finish_with(config)
    }

    fn read(checker: &mut Checker<'_>) -> Option<Self> {
        let experiment_id = checker.raw(IDENTIFICATION, "experiment_id");
        let read_dataset_id = checker.raw(IDENTIFICATION, "read_dataset_id");

        let threads = checker.int(PARAMETERS, "threads", 1);
        let length = checker.int(PARAMETERS, "length", 1);
        let kmers = checker.int_list(PARAMETERS, "kmer", 1);
        let cov = checker.int(PARAMETERS, "cov", 0);
        let eros = checker.int(PARAMETERS, "eros", 0);
        let seros = checker.int(PARAMETERS, "seros", 0);
        let gsim = checker.int(PARAMETERS, "gsim", 0);
        let indel = checker.int(PARAMETERS, "indel", 0);
        let island = checker.int(PARAMETERS, "island", 0);
        let useblat = checker.yes_no(PARAMETERS, "useblat");
        let pid = checker.float(PARAMETERS, "pid", 0.0, 1.0);
        let walk = checker.float(PARAMETERS, "walk", 0.0, 1.0);
        let cleanup = checker.int_between(PARAMETERS, "cleanup", 0, 3);
        let other_parameters =
            checker.parameter_list(PARAMETERS, "other_parameters", NOT_ALLOWED_PARAMETERS);

        let format = checker.code(LIBRARY_SECTION, "format");
        let read_type = checker.code(LIBRARY_SECTION, "read_type");
        let libraries = check_libraries(checker, read_type);

        checker.reject_unknown_sections(
            &[IDENTIFICATION, PARAMETERS, LIBRARY_SECTION],
            &[LIBRARY_PREFIX],
        );

        Some(TransAbyssConfig {
            experiment_id: experiment_id?.to_string(),
            read_dataset_id: read_dataset_id?.to_string(),
            threads: threads?,
            length: length?,
            kmers: kmers?,
            cov: cov?,
            eros: eros?,
            seros: seros?,
            gsim: gsim?,
            indel: indel?,
            island: island?,
            useblat: useblat?,
            pid: pid?,
            walk: walk?,
            cleanup: cleanup?,
            other_parameters: other_parameters?,
            format: format?,
            read_type: read_type?,
            libraries: libraries?,
        })
    }

    /// Every read file, the two files of a pair next to each other.
    fn read_files(&self, layout: &ClusterLayout) -> Vec<String> {
        let read_dir = layout.read_dataset_dir(&self.experiment_id, &self.read_dataset_id);
        self.libraries
            .iter()
            .flat_map(|library| {
                std::iter::once(library.read_file_1.as_str()).chain(library.read_file_2.as_deref())
            })
            .map(|file| format!("{}/{}", read_dir, file))
            .collect()
    }
}

impl Driver for TransAbyss {
    fn name(&self) -> &'static str {
        NAME
    }

    fn command_name(&self) -> &'static str {
        "transabyss"
    }

    fn code(&self) -> &'static str {
        "transabyss"
    }

    fn environments(&self) -> &'static [&'static str] {
        &["transabyss"]
    }

    fn default_config(&self, seed: &Seed, layout: &ClusterLayout) -> String {
        let mut writer = ConfigWriter::new();
        writer
            .comment("You must review the information of this file and update the values with the corresponding ones to the current run.")
            .comment("")
            .comment(&format!(
                "The read files have to be located in the cluster directory {}/experiment_id/read_dataset_id",
                layout.read_dir
            ))
            .comment("The experiment_id and read_dataset_id names are fixed in the identification section.")
            .comment("")
            .comment("You can consult the parameters of Trans-ABySS and their meaning in \"http://www.bcgsc.ca/platform/bioinfo/software/trans-abyss\".")
            .comment("")
            .comment("There are two formats to set an option:")
            .comment("")
            .comment("   option = value                             <- if the option supports a single value")
            .comment("   option = value-1, value-2, ..., value-n    <- if the option supports a values list")
            .comment("")
            .comment("In section \"Trans-ABySS parameters\", the key \"other_parameters\" allows you to input additional parameters in the format:")
            .comment("")
            .comment("   other_parameters = --parameter-1[=value-1][; --parameter-2[=value-2][; ...; --parameter-n[=value-n]]]")
            .comment("")
            .comment("parameter-i is a parameter name of Trans-ABySS and value-i a valid value of parameter-i, e.g.")
            .comment("")
            .comment("   other_parameters = --qends=4; --noref")
            .blank()
            .section(IDENTIFICATION, "This section has the information that identifies the experiment.")
            .entry("experiment_id", seed.experiment_id(), "experiment identification")
            .entry("read_dataset_id", seed.read_dataset_id(), "read dataset identification")
            .blank()
            .section(PARAMETERS, "This section has the information to set the Trans-ABySS parameters")
            .entry("threads", 4, "number of threads for use")
            .entry("length", 100, "minimum output sequence length")
            .entry("kmer", 32, "value or values list of k-mer size")
            .entry("cov", 2, "minimum mean k-mer coverage of a unitig")
            .entry("eros", 2, "minimum erosion k-mer coverage")
            .entry("seros", 0, "minimum erosion k-mer coverage per strand")
            .entry("gsim", 2, "maximum iterations of graph simplification")
            .entry("indel", 1, "indel size tolerance")
            .entry("island", 0, "minimum length of island unitigs")
            .entry(
                "useblat",
                "NO",
                "use BLAT alignments to remove redundant sequences: YES or NO",
            )
            .entry("pid", 0.95, "minimum percent sequence identity of redundant sequences")
            .entry("walk", 0.05, "percentage of mean k-mer coverage of seed for path-walking")
            .entry(
                "cleanup",
                1,
                "level of clean-up of intermediate files: 0 or 1 or 2 or 3",
            )
            .entry(
                "other_parameters",
                "NONE",
                "additional parameters to the previous ones or NONE",
            )
            .blank()
            .section(LIBRARY_SECTION, "This section has the global information of all libraries.")
            .entry("format", FileFormat::Fastq, &format!("format: {}", FileFormat::all_text()));
        write_read_type(&mut writer, seed);
        write_library_sections(&mut writer, seed);
        writer.finish()
    }

    fn check(&self, options: &OptionDict) -> ValidationReport {
        report_of(NAME, TransAbyssConfig::parse(options))
    }

    fn plan(
        &self,
        options: &OptionDict,
        context: &PlanContext<'_>,
    ) -> anyhow::Result<Vec<ProcessScript>> {
        let config = config_of(TransAbyssConfig::parse(options))?;
        let read_files = config.read_files(context.layout()).join(" ");
        let reads_flag = match config.read_type {
            ReadType::PairedEnd => "--pe",
            ReadType::SingleEnd => "--se",
        };
        let run_dirs = context.run_dirs(&config.experiment_id, self.code(), config.kmers.len());

        let scripts = config
            .kmers
            .iter()
            .zip(run_dirs)
            .map(|(kmer, run_dir)| {
                let mut run = ShellFunction::in_environment("run_transabyss_process", "transabyss");
                run.line(format!("cd {}", run_dir))
                    .separator()
                    .line(format!("echo \"Assembling with k-mer size {} ...\"", kmer))
                    .command(
                        CommandLine::timed("transabyss")
                            .arg(format!("--threads {}", config.threads))
                            .arg("--stage final")
                            .arg(format!("{} {}", reads_flag, read_files))
                            .arg(format!("--length {}", config.length))
                            .arg(format!("--kmer {}", kmer))
                            .arg(format!("--cov {}", config.cov))
                            .arg(format!("--eros {}", config.eros))
                            .arg(format!("--seros {}", config.seros))
                            .arg(format!("--gsim {}", config.gsim))
                            .arg(format!("--indel {}", config.indel))
                            .arg(format!("--island {}", config.island))
                            .arg_if(config.useblat, "--useblat")
                            .arg(format!("--pid {}", config.pid))
                            .arg(format!("--walk {}", config.walk))
                            .arg(format!("--outdir {}", run_dir))
                            .arg("--name transabyss")
                            .args(config.other_parameters.iter().map(Parameter::to_argument)),
                    );

                let mut script = ProcessScript::new(format!("{} process", NAME), run_dir);
                script.function(run);
                script
            })
            .collect();

        Ok(scripts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::script::ScriptContext;
    use crate::utils::settings::Settings;

    fn default_options() -> OptionDict {
        TransAbyss
            .default_config(&Seed::default(), &ClusterLayout::default())
            .parse()
            .unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let report = TransAbyss.check(&default_options());
        assert!(report.is_valid(), "{}", report);
    }

    #[test]
    fn test_parameter_ranges() {
        let mut options = default_options();
        options.insert(PARAMETERS, "kmer", "25, 0");
        options.insert(PARAMETERS, "pid", "1.2");
        options.insert(PARAMETERS, "cleanup", "4");
        options.insert(PARAMETERS, "other_parameters", "--kmer=30; qends=4");
        let report = TransAbyss.check(&options);
        let messages: Vec<&str> = report.issues.iter().map(|i| i.message.as_str()).collect();

        assert_eq!(messages.len(), 5);
        assert!(messages[0].starts_with("the key \"kmer\" has to be an integer number or a list"));
        assert_eq!(
            messages[1],
            "the key \"pid\" has to be a float number between 0.0 and 1.0."
        );
        assert_eq!(
            messages[2],
            "the key \"cleanup\" has to be an integer number between 0 and 3."
        );
        assert!(messages[3].contains("\"kmer\" is not allowed"));
        assert!(messages[4].contains("\"qends=4\" is not --parameter=value or --parameter"));
    }

    #[test]
    fn test_one_process_per_kmer() {
        let settings = Settings::default();
        let context = PlanContext {
            run_dir: Some(String::from("/ngscloud2/results/exp001/transabyss-170101-235959")),
            ..PlanContext::new(&settings)
        };
        let mut options = default_options();
        options.insert(PARAMETERS, "kmer", "25,32, 41");
        options.insert(PARAMETERS, "useblat", "YES");
        let scripts = TransAbyss.plan(&options, &context).unwrap();

        let run_dirs: Vec<&str> = scripts.iter().map(ProcessScript::run_dir).collect();
        assert_eq!(
            run_dirs,
            vec![
                "/ngscloud2/results/exp001/transabyss-170101-235959",
                "/ngscloud2/results/exp001/transabyss-170101-235959-2",
                "/ngscloud2/results/exp001/transabyss-170101-235959-3",
            ]
        );

        let text = scripts[2].render(&ScriptContext {
            cluster_name: "c1",
            settings: &settings,
        });
        assert!(text.contains("            --pe /ngscloud2/reads/exp001/uploaded-reads/rnaseq-a_1.fastq /ngscloud2/reads/exp001/uploaded-reads/rnaseq-a_2.fastq \\\n"));
        assert!(text.contains("            --kmer 41 \\\n"));
        assert!(text.contains("            --useblat \\\n            --pid 0.95 \\\n            --walk 0.05 \\\n"));
        assert!(text.contains(
            "            --outdir /ngscloud2/results/exp001/transabyss-170101-235959-3 \\\n            --name transabyss\n"
        ));
        assert!(text.contains("STATUS_DIR=/ngscloud2/results/exp001/transabyss-170101-235959-3/status"));
    }

    #[test]
    fn test_format_and_cleanup_are_checked_only() {
        let settings = Settings::default();
        let context = PlanContext::new(&settings);
        let mut options = default_options();
        options.insert(LIBRARY_SECTION, "format", "fasta");
        options.insert(PARAMETERS, "cleanup", "2");
        assert!(TransAbyss.check(&options).is_valid());

        let scripts = TransAbyss.plan(&options, &context).unwrap();
        let text = scripts[0].render(&ScriptContext {
            cluster_name: "c1",
            settings: &settings,
        });
        assert!(!text.to_lowercase().contains("fasta"));
        assert!(!text.contains("--cleanup"));

        options.insert(LIBRARY_SECTION, "format", "SAM");
        let report = TransAbyss.check(&options);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].key.as_deref(), Some("format"));
    }
}
