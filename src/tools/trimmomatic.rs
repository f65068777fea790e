//! Trimmomatic: quality trimming of read libraries.
//!
//! The trimmed reads are written to a new read dataset named after the run
//! directory, so they can be used as input by the other read based tools.

use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;

use crate::tools::library::{
    check_libraries, write_library_sections, write_read_type, Library, LIBRARY_PREFIX,
    LIBRARY_SECTION,
};
use crate::tools::{config_of, report_of, Driver, PlanContext, Seed};
use crate::utils::codes::{Code, Phred};
use crate::utils::layout::{basename, ClusterLayout};
use crate::utils::options::{ConfigWriter, OptionDict};
use crate::utils::script::{CommandLine, ProcessScript, ShellFunction};
use crate::utils::validation::{is_none, split_list, Checker, ValidationReport};

const NAME: &str = "Trimmomatic";
const IDENTIFICATION: &str = "identification";
const PARAMETERS: &str = "Trimmomatic parameters";
const STEP_VALUES: &str = "Trimming step values";
const STEP_ORDER: &str = "Trimming step order";

/// Every trimming step, in the order their values are written.
pub const STEP_NAMES: &[&str] = &[
    "illuminaclip",
    "slidingwindow",
    "leading",
    "trailing",
    "crop",
    "headcrop",
    "minlen",
    "tophred33",
    "tophred64",
];

fn illuminaclip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\$TRIMMOMATIC_PATH/adapters/(.+):(.+):(.+):(.+)$")
            .expect("valid illuminaclip regex")
    })
}

fn slidingwindow_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+):(.+)$").expect("valid slidingwindow regex"))
}

/// The Trimmomatic driver.
pub struct Trimmomatic;

/// A trimming step with a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrimmingStep {
    /// The step name, as written in the config file.
    pub name: &'static str,

    /// The step argument; `None` for the bare `TOPHRED` steps.
    pub value: Option<String>,
}

impl TrimmingStep {
    /// The step as Trimmomatic expects it, e.g. `HEADCROP:12`.
    pub fn argument(&self) -> String {
        match &self.value {
            Some(value) => format!("{}:{}", self.name.to_uppercase(), value),
            None => self.name.to_uppercase(),
        }
    }
}

/// A checked Trimmomatic config file.
#[derive(Debug)]
pub struct TrimmomaticConfig {
    /// Experiment identification.
    pub experiment_id: String,

    /// Read dataset holding the library files.
    pub read_dataset_id: String,

    /// Number of threads.
    pub threads: i64,

    /// Quality score offset of the input reads.
    pub phred: Phred,

    /// The steps to perform, in order.
    pub steps: Vec<TrimmingStep>,

    /// The libraries.
    pub libraries: Vec<Library>,
}

impl TrimmomaticConfig {
    /// Checks and reads a Trimmomatic config file.
    pub fn parse(options: &OptionDict) -> Result<Self, ValidationReport> {
        let mut checker = Checker::new(NAME, options);
        let config = Self::read(&mut checker);
        checker.finish_with(config)
    }

    fn read(checker: &mut Checker<'_>) -> Option<Self> {
        let experiment_id = checker.raw(IDENTIFICATION, "experiment_id");
        let read_dataset_id = checker.raw(IDENTIFICATION, "read_dataset_id");
        let threads = checker.int(PARAMETERS, "threads", 1);
        let phred = checker.code::<Phred>(PARAMETERS, "phred");
        let selected = check_step_values(checker);
        let steps = check_step_order(checker, selected);
        let read_type = checker.code(LIBRARY_SECTION, "read_type");
        let libraries = check_libraries(checker, read_type);

        checker.reject_unknown_sections(
            &[IDENTIFICATION, PARAMETERS, STEP_VALUES, STEP_ORDER, LIBRARY_SECTION],
            &[LIBRARY_PREFIX],
        );

        Some(TrimmomaticConfig {
            experiment_id: experiment_id?.to_string(),
            read_dataset_id: read_dataset_id?.to_string(),
            threads: threads?,
            phred: phred?,
            steps: steps?,
            libraries: libraries?,
        })
    }
}

/// Reads every step value, returning the steps that have one. `None` means
/// some value is missing or wrong.
fn check_step_values(checker: &mut Checker<'_>) -> Option<Vec<TrimmingStep>> {
    let mut selected = Vec::new();
    let mut ok = true;

    for (name, regex, expected) in [
        (
            "illuminaclip",
            illuminaclip_regex(),
            "$TRIMMOMATIC_PATH/adapters/fastaWithAdaptersEtc:seedMismatches:palindromeClipThreshold:simpleClipThreshold",
        ),
        (
            "slidingwindow",
            slidingwindow_regex(),
            "windowSize:requiredQuality",
        ),
    ] {
        match checker.raw(STEP_VALUES, name) {
            Some(raw) if is_none(raw) => {}
            Some(raw) if regex.is_match(raw) => selected.push(TrimmingStep {
                name,
                value: Some(raw.to_string()),
            }),
            Some(_) => {
                checker.error(
                    STEP_VALUES,
                    name,
                    format!("the key \"{}\" has to be {} or NONE.", name, expected),
                );
                ok = false;
            }
            None => ok = false,
        }
    }

    for name in ["leading", "trailing", "crop", "headcrop", "minlen"] {
        match checker.int_or_none(STEP_VALUES, name, 1) {
            Some(Some(value)) => selected.push(TrimmingStep {
                name,
                value: Some(value.to_string()),
            }),
            Some(None) => {}
            None => ok = false,
        }
    }

    let tophred33 = checker.true_false(STEP_VALUES, "tophred33");
    let tophred64 = checker.true_false(STEP_VALUES, "tophred64");
    for (name, switch) in [("tophred33", tophred33), ("tophred64", tophred64)] {
        match switch {
            Some(true) => selected.push(TrimmingStep { name, value: None }),
            Some(false) => {}
            None => ok = false,
        }
    }
    if tophred33 == Some(true) && tophred64 == Some(true) {
        checker.error(
            STEP_VALUES,
            "tophred64",
            "the keys \"tophred33\" and \"tophred64\" can not be both TRUE.",
        );
        ok = false;
    }

    if !ok {
        return None;
    }

    if selected.is_empty() {
        checker.section_error(
            STEP_VALUES,
            format!(
                "in the section \"{}\" there are not steps selected to perform.",
                STEP_VALUES
            ),
        );
        return None;
    }

    Some(selected)
}

/// Checks `order` against the selected steps, returning them in order.
fn check_step_order(
    checker: &mut Checker<'_>,
    selected: Option<Vec<TrimmingStep>>,
) -> Option<Vec<TrimmingStep>> {
    let raw = checker.raw(STEP_ORDER, "order")?;
    let order = split_list(raw);
    if order.is_empty() {
        checker.error(STEP_ORDER, "order", "the key \"order\" is not a valid step list.");
        return None;
    }

    let mut ok = true;
    for step in &order {
        if !STEP_NAMES.contains(&step.as_str()) {
            checker.error(
                STEP_ORDER,
                "order",
                format!(
                    "the step {} in the section \"{}\" is an invalid step.",
                    step, STEP_ORDER
                ),
            );
            ok = false;
        }
    }

    let selected = selected?;
    for step in &order {
        let has_value = selected.iter().any(|s| s.name == step.as_str());
        if STEP_NAMES.contains(&step.as_str()) && !has_value {
            checker.error(
                STEP_ORDER,
                "order",
                format!(
                    "the step {} is in the section \"{}\" but it does not have value in the section \"{}\".",
                    step, STEP_ORDER, STEP_VALUES
                ),
            );
            ok = false;
        }
    }
    for step in &selected {
        if !order.iter().any(|name| name == step.name) {
            checker.error(
                STEP_ORDER,
                "order",
                format!(
                    "the step {} in the section \"{}\" has value but it is not in the section \"{}\".",
                    step.name, STEP_VALUES, STEP_ORDER
                ),
            );
            ok = false;
        }
    }

    if !ok {
        return None;
    }

    Some(
        order
            .iter()
            .filter_map(|name| selected.iter().find(|step| step.name == name.as_str()))
            .cloned()
            .collect(),
    )
}

fn unpaired(file: &str) -> String {
    match file.strip_suffix(".gz") {
        Some(stem) => format!("{}.unpaired.gz", stem),
        None => format!("{}.unpaired", file),
    }
}

impl Driver for Trimmomatic {
    fn name(&self) -> &'static str {
        NAME
    }

    fn command_name(&self) -> &'static str {
        "trimmomatic"
    }

    fn code(&self) -> &'static str {
        "trimmomatic"
    }

    fn environments(&self) -> &'static [&'static str] {
        &["trimmomatic"]
    }

    fn default_config(&self, seed: &Seed, layout: &ClusterLayout) -> String {
        let optional = "or NONE (do not perform this step)";

        let mut writer = ConfigWriter::new();
        writer
            .comment("You must review the information of this file and update the values with the corresponding ones to the current run.")
            .comment("")
            .comment(&format!(
                "The files have to be located in the cluster directory {}/experiment_id/read_dataset_id",
                layout.read_dir
            ))
            .comment("The experiment_id and read_dataset_id names are fixed in the identification section.")
            .comment("")
            .comment("You can consult the parameters and trimming sets of Trimmomatic and their meaning in \"http://www.usadellab.org/cms/index.php?page=trimmomatic\".")
            .blank()
            .section(IDENTIFICATION, "This section has the information identifies the experiment.")
            .entry("experiment_id", seed.experiment_id(), "experiment identification")
            .entry("read_dataset_id", seed.read_dataset_id(), "read dataset identification")
            .blank()
            .section(PARAMETERS, "This section has the information to set the Trimmomatic parameters.")
            .entry("threads", 4, "number of threads for use")
            .entry(
                "phred",
                Phred::Phred64,
                &format!("Phred quality score: {}", Phred::all_text()),
            )
            .blank()
            .section(STEP_VALUES, "This section has the information to set the trimming step values")
            .entry(
                "illuminaclip",
                "NONE",
                &format!("cutting of adapter and other illumina-specific sequences: $TRIMMOMATIC_PATH/adapters/fastaWithAdaptersEtc:seedMismatches:palindromeClipThreshold:simpleClipThreshold {}", optional),
            )
            .entry(
                "slidingwindow",
                "NONE",
                &format!("sliding window trimming approach: windowSize:requiredQuality {}", optional),
            )
            .entry(
                "leading",
                "NONE",
                &format!("threshold quality to cut bases off the start of a read (if below) {}", optional),
            )
            .entry(
                "trailing",
                "NONE",
                &format!("threshold quality to cut bases off the end of a read (if below) {}", optional),
            )
            .entry(
                "crop",
                "NONE",
                &format!("length to cut the read removing bases from the end {}", optional),
            )
            .entry(
                "headcrop",
                12,
                &format!("length to cut from the start of the read {}", optional),
            )
            .entry(
                "minlen",
                "NONE",
                &format!("length to drop the read if it is below {}", optional),
            )
            .entry("tophred33", "FALSE", "convert quality scores to Phred-33: TRUE or FALSE")
            .entry("tophred64", "FALSE", "convert quality scores to Phred-64: TRUE or FALSE")
            .blank()
            .section(STEP_ORDER, "This section has the information to set the performance order of every step with value")
            .entry("order", "headcrop", "if there are more than one step, they have to be separated by commas")
            .blank()
            .section(LIBRARY_SECTION, "This section has the global information of all libraries.");
        write_read_type(&mut writer, seed);
        write_library_sections(&mut writer, seed);
        writer.finish()
    }

    fn check(&self, options: &OptionDict) -> ValidationReport {
        report_of(NAME, TrimmomaticConfig::parse(options))
    }

    fn plan(
        &self,
        options: &OptionDict,
        context: &PlanContext<'_>,
    ) -> anyhow::Result<Vec<ProcessScript>> {
        let config = config_of(TrimmomaticConfig::parse(options))?;
        let layout = context.layout();
        let run_dir = context.run_dir(&config.experiment_id, self.code());
        let input_dir = layout.read_dataset_dir(&config.experiment_id, &config.read_dataset_id);
        let output_dir = layout.read_dataset_dir(&config.experiment_id, basename(&run_dir));
        let steps = config.steps.iter().map(TrimmingStep::argument).join(" ");

        let mut run = ShellFunction::in_environment("run_trimmomatic_process", "trimmomatic");
        run.command(CommandLine::new(format!("mkdir --parents {}", output_dir)))
            .line(format!("cd {}", run_dir))
            .separator()
            .line("echo \"Trimmomatic v`trimmomatic -version`\"");

        for library in &config.libraries {
            let input = |file: &str| format!("{}/{}", input_dir, file);
            let output = |file: &str| format!("{}/{}", output_dir, file);
            let (read_type, files) = match library.pair() {
                Some((file_1, file_2)) => (
                    "PE",
                    vec![
                        input(file_1),
                        input(file_2),
                        output(file_1),
                        output(&unpaired(file_1)),
                        output(file_2),
                        output(&unpaired(file_2)),
                    ],
                ),
                None => (
                    "SE",
                    vec![input(&library.read_file_1), output(&library.read_file_1)],
                ),
            };

            run.separator()
                .line(format!("echo \"Trimming {} ...\"", library.read_file_1))
                .command(
                    CommandLine::timed("trimmomatic")
                        .arg(read_type)
                        .arg(format!("-threads {}", config.threads))
                        .arg(format!("-phred{}", config.phred.offset()))
                        .arg(format!("-trimlog {}.log", library.read_file_1))
                        .args(files)
                        .arg(&steps),
                );
        }

        let mut script = ProcessScript::new(format!("{} process", NAME), run_dir.as_str());
        script
            .variable(
                "TRIMMOMATIC_PATH",
                format!("{}/bin", layout.conda_env_dir("trimmomatic")),
            )
            .function(run);
        Ok(vec![script])
    }
}
