//! Drivers for the tools that can be run on the cluster.
//!
//! Every driver knows how to write a default config file for its tool, how
//! to check that file, and how to turn a valid file into one or more process
//! scripts.

pub mod alignment;
pub mod assembly;
pub mod bowtie2;
pub mod cuffdiff;
pub mod cufflinks_cuffmerge;
pub mod cuffquant;
pub mod library;
pub mod quast;
pub mod reference;
pub mod transabyss;
pub mod trimmomatic;

use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::utils::codes::{AssemblyType, ReadType};
use crate::utils::layout::ClusterLayout;
use crate::utils::options::OptionDict;
use crate::utils::script::ProcessScript;
use crate::utils::settings::Settings;
use crate::utils::validation::ValidationReport;

use self::bowtie2::Bowtie2;
use self::cuffdiff::Cuffdiff;
use self::cufflinks_cuffmerge::CufflinksCuffmerge;
use self::cuffquant::Cuffquant;
use self::quast::Quast;
use self::transabyss::TransAbyss;
use self::trimmomatic::Trimmomatic;

//=================//
// Utility methods //
//=================//

/// Gets all of the supported drivers. When new tools are added, this needs to
/// be updated.
pub fn get_all_drivers() -> Vec<Box<dyn Driver>> {
    vec![
        Box::new(Bowtie2),
        Box::new(CufflinksCuffmerge),
        Box::new(Cuffquant),
        Box::new(Cuffdiff),
        Box::new(Quast),
        Box::new(TransAbyss),
        Box::new(Trimmomatic),
    ]
}

/// Gets a driver by its command name (e.g. `cufflinks-cuffmerge`), ignoring
/// case.
pub fn get_driver(s: &str) -> Option<Box<dyn Driver>> {
    get_all_drivers()
        .into_iter()
        .find(|driver| s.eq_ignore_ascii_case(driver.command_name()))
}

/// The command names of every driver.
pub fn get_all_command_names() -> Vec<&'static str> {
    get_all_drivers()
        .iter()
        .map(|driver| driver.command_name())
        .collect()
}

//======//
// Seed //
//======//

/// Values used to fill in a new config file. Anything left out gets a
/// placeholder the user is expected to edit.
#[derive(Clone, Debug, Default)]
pub struct Seed {
    /// Experiment identification.
    pub experiment_id: Option<String>,

    /// Read dataset identification.
    pub read_dataset_id: Option<String>,

    /// Read type of the libraries.
    pub read_type: Option<ReadType>,

    /// First read file of each library.
    pub read_files_1: Vec<String>,

    /// Second read file of each library (paired-end only).
    pub read_files_2: Vec<String>,

    /// Reference dataset identification.
    pub reference_dataset_id: Option<String>,

    /// Reference file name.
    pub reference_file: Option<String>,

    /// Annotation (GTF/GFF) file name.
    pub annotation_file: Option<String>,

    /// Mask file name.
    pub mask_file: Option<String>,

    /// Assembly dataset identification.
    pub assembly_dataset_id: Option<String>,

    /// Assembly type.
    pub assembly_type: Option<AssemblyType>,

    /// Alignment dataset identifications.
    pub alignment_dataset_ids: Vec<String>,

    /// Quantitation dataset identification.
    pub quantitation_dataset_id: Option<String>,
}

impl Seed {
    /// The experiment identification.
    pub fn experiment_id(&self) -> &str {
        self.experiment_id.as_deref().unwrap_or("exp001")
    }

    /// The read dataset identification.
    pub fn read_dataset_id(&self) -> &str {
        self.read_dataset_id.as_deref().unwrap_or("uploaded-reads")
    }

    /// The read type.
    pub fn read_type(&self) -> ReadType {
        self.read_type.unwrap_or(ReadType::PairedEnd)
    }

    /// The `(read_file_1, read_file_2)` pairs of every library.
    pub fn libraries(&self) -> Vec<(String, String)> {
        if self.read_files_1.is_empty() {
            return vec![(
                String::from("rnaseq-a_1.fastq"),
                String::from("rnaseq-a_2.fastq"),
            )];
        }

        self.read_files_1
            .iter()
            .enumerate()
            .map(|(i, file_1)| {
                let file_2 = self
                    .read_files_2
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| String::from("NONE"));
                (file_1.clone(), file_2)
            })
            .collect()
    }

    /// The assembly dataset identification.
    pub fn assembly_dataset_id<'a>(&'a self, default: &'a str) -> &'a str {
        self.assembly_dataset_id.as_deref().unwrap_or(default)
    }

    /// The alignment dataset identifications.
    pub fn alignment_dataset_ids(&self) -> Vec<String> {
        if self.alignment_dataset_ids.is_empty() {
            vec![
                String::from("star-170101-235959"),
                String::from("tophat-170101-235959"),
            ]
        } else {
            self.alignment_dataset_ids.clone()
        }
    }
}

//==============//
// Plan context //
//==============//

/// What a driver needs to know to plan its processes.
#[derive(Clone, Debug)]
pub struct PlanContext<'a> {
    /// Application settings.
    pub settings: &'a Settings,

    /// When the run was started; used to name run directories.
    pub started: DateTime<Local>,

    /// A fixed run directory, overriding the generated one.
    pub run_dir: Option<String>,
}

impl<'a> PlanContext<'a> {
    /// Creates a context for a run starting now.
    pub fn new(settings: &'a Settings) -> Self {
        PlanContext {
            settings,
            started: Local::now(),
            run_dir: None,
        }
    }

    /// The cluster layout.
    pub fn layout(&self) -> &'a ClusterLayout {
        &self.settings.cluster
    }

    /// The run directory of a single process.
    pub fn run_dir(&self, experiment_id: &str, code: &str) -> String {
        match &self.run_dir {
            Some(run_dir) => run_dir.clone(),
            None => self.layout().run_dir(experiment_id, code, &self.started),
        }
    }

    /// The run directories of `count` processes started together: the first
    /// one is the plain run directory, the next ones are suffixed with `-2`,
    /// `-3` and so on.
    pub fn run_dirs(&self, experiment_id: &str, code: &str, count: usize) -> Vec<String> {
        let base = self.run_dir(experiment_id, code);
        (1..=count)
            .map(|i| {
                if i == 1 {
                    base.clone()
                } else {
                    format!("{}-{}", base, i)
                }
            })
            .collect()
    }
}

//========//
// Driver //
//========//

/// A tool that can be configured, scripted and run on the cluster.
pub trait Driver {
    /// The display name of the tool.
    fn name(&self) -> &'static str;

    /// The name used on the command line.
    fn command_name(&self) -> &'static str;

    /// The code of the tool; it prefixes config files, scripts and run
    /// directories.
    fn code(&self) -> &'static str;

    /// The conda environments the process scripts activate.
    fn environments(&self) -> &'static [&'static str];

    /// Renders the default config file.
    fn default_config(&self, seed: &Seed, layout: &ClusterLayout) -> String;

    /// Checks a config file.
    fn check(&self, options: &OptionDict) -> ValidationReport;

    /// Plans the processes of a valid config file.
    fn plan(
        &self,
        options: &OptionDict,
        context: &PlanContext<'_>,
    ) -> anyhow::Result<Vec<ProcessScript>>;

    /// The local config file.
    fn config_file(&self, settings: &Settings) -> PathBuf {
        settings
            .local
            .config_dir
            .join(format!("{}-config.txt", self.code()))
    }

    /// The remote name of the process script.
    fn script_name(&self) -> String {
        format!("{}-process.sh", self.code())
    }

    /// The remote name of the process starter.
    fn starter_name(&self) -> String {
        format!("{}-process-starter.sh", self.code())
    }
}

/// Turns the outcome of a combined check-and-parse into a report.
pub(crate) fn report_of<T>(name: &str, parsed: Result<T, ValidationReport>) -> ValidationReport {
    match parsed {
        Ok(_) => ValidationReport::new(name),
        Err(report) => report,
    }
}

/// Turns the outcome of a combined check-and-parse into a config, failing
/// with the rendered report.
pub(crate) fn config_of<T>(parsed: Result<T, ValidationReport>) -> anyhow::Result<T> {
    parsed.map_err(|report| anyhow::anyhow!("{}", report))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_registry() {
        let names = get_all_command_names();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"cufflinks-cuffmerge"));
        assert_eq!(get_driver("QUAST").unwrap().code(), "quast");
        assert!(get_driver("trinity").is_none());

        let mut codes: Vec<&str> = get_all_drivers().iter().map(|d| d.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 7);
    }

    #[test]
    fn test_seed_defaults() {
        let seed = Seed::default();
        assert_eq!(seed.experiment_id(), "exp001");
        assert_eq!(seed.read_type(), ReadType::PairedEnd);
        assert_eq!(seed.libraries().len(), 1);
        assert_eq!(seed.alignment_dataset_ids().len(), 2);

        let seed = Seed {
            read_files_1: vec![String::from("a.fq"), String::from("b.fq")],
            read_files_2: vec![String::from("a2.fq")],
            ..Seed::default()
        };
        assert_eq!(
            seed.libraries(),
            vec![
                (String::from("a.fq"), String::from("a2.fq")),
                (String::from("b.fq"), String::from("NONE")),
            ]
        );
    }

    #[test]
    fn test_run_dirs() {
        let settings = Settings::default();
        let context = PlanContext {
            settings: &settings,
            started: Local.with_ymd_and_hms(2017, 1, 1, 23, 59, 59).unwrap(),
            run_dir: None,
        };
        assert_eq!(
            context.run_dirs("exp001", "transabyss", 3),
            vec![
                "/ngscloud2/results/exp001/transabyss-170101-235959",
                "/ngscloud2/results/exp001/transabyss-170101-235959-2",
                "/ngscloud2/results/exp001/transabyss-170101-235959-3",
            ]
        );
    }

    #[test]
    fn test_config_file_name() {
        let settings = Settings::default();
        let driver = get_driver("cufflinks-cuffmerge").unwrap();
        assert!(driver
            .config_file(&settings)
            .ends_with("config/cufflnkmrg-config.txt"));
        assert_eq!(driver.script_name(), "cufflnkmrg-process.sh");
        assert_eq!(driver.starter_name(), "cufflnkmrg-process-starter.sh");
    }
}
