//! QUAST: quality assessment of an assembled transcriptome.

use crate::tools::assembly::{assembly_type_text, check_assembly, default_assembly_type, Assembly};
use crate::tools::reference::{check_reference, Reference};
use crate::tools::{config_of, report_of, Driver, PlanContext, Seed};
use crate::utils::codes::{AssemblyType, Code, Software, ASSEMBLERS};
use crate::utils::layout::ClusterLayout;
use crate::utils::options::{ConfigWriter, OptionDict};
use crate::utils::script::{CommandLine, ProcessScript, ShellFunction};
use crate::utils::validation::{Checker, ValidationReport};

const NAME: &str = "QUAST";
const IDENTIFICATION: &str = "identification";
const PARAMETERS: &str = "QUAST parameters";

/// The QUAST driver.
pub struct Quast;

/// A checked QUAST config file.
#[derive(Debug)]
pub struct QuastConfig {
    /// Experiment identification.
    pub experiment_id: String,

    /// Optional reference genome.
    pub reference: Option<Reference>,

    /// The assembly to assess.
    pub assembly: Assembly,

    /// Number of threads.
    pub threads: i64,
}

impl QuastConfig {
    /// Checks and reads a QUAST config file.
    pub fn parse(options: &OptionDict) -> Result<Self, ValidationReport> {
        let mut checker = Checker::new(NAME, options);
        let config = Self::read(&mut checker);
        checker.finish_with(config)
    }

    fn read(checker: &mut Checker<'_>) -> Option<Self> {
        let experiment_id = checker.raw(IDENTIFICATION, "experiment_id");
        let reference = check_reference(checker, IDENTIFICATION, true);
        let assembly = check_assembly(checker, IDENTIFICATION, ASSEMBLERS, false);
        let threads = checker.int(PARAMETERS, "threads", 1);
        checker.reject_unknown_sections(&[IDENTIFICATION, PARAMETERS], &[]);

        Some(QuastConfig {
            experiment_id: experiment_id?.to_string(),
            reference: reference?,
            assembly: assembly??,
            threads: threads?,
        })
    }
}

impl Driver for Quast {
    fn name(&self) -> &'static str {
        NAME
    }

    fn command_name(&self) -> &'static str {
        "quast"
    }

    fn code(&self) -> &'static str {
        "quast"
    }

    fn environments(&self) -> &'static [&'static str] {
        &["quast"]
    }

    fn default_config(&self, seed: &Seed, layout: &ClusterLayout) -> String {
        let assembly_dataset_id = seed.assembly_dataset_id("sdnt-170101-235959");
        let assembly_software = Software::of_dataset(assembly_dataset_id, ASSEMBLERS)
            .unwrap_or(Software::SoapDenovoTrans);
        let assembly_type = default_assembly_type(assembly_dataset_id, seed.assembly_type);

        let mut writer = ConfigWriter::new();
        writer
            .comment("You must review the information of this file and update the values with the corresponding ones to the current run.")
            .comment("")
            .comment(&format!(
                "The reference file has to be located in the cluster directory {}/reference_dataset_id",
                layout.reference_dir
            ))
            .comment(&format!(
                "The assembly files have to be located in the cluster directory {}/experiment_id/assembly_dataset_id",
                layout.result_dir
            ))
            .comment("The experiment_id, reference_dataset_id, reference_file and assembly_dataset_id are fixed in the identification section.")
            .comment("")
            .comment("You can consult the parameters of QUAST and their meaning in \"http://quast.sourceforge.net/quast.html\".")
            .blank()
            .section(IDENTIFICATION, "This section has the information identifies the experiment.")
            .entry("experiment_id", seed.experiment_id(), "experiment identification")
            .entry(
                "reference_dataset_id",
                seed.reference_dataset_id.as_deref().unwrap_or("NONE"),
                "reference dataset identification or NONE",
            )
            .entry(
                "reference_file",
                seed.reference_file.as_deref().unwrap_or("NONE"),
                "reference file name or NONE",
            )
            .entry(
                "assembly_software",
                assembly_software.code(),
                &format!("assembly software: {}", Software::list_text(ASSEMBLERS)),
            )
            .entry("assembly_dataset_id", assembly_dataset_id, "assembly dataset identification")
            .entry("assembly_type", assembly_type, &assembly_type_text())
            .blank()
            .section(PARAMETERS, "This section has the information to set the QUAST parameters")
            .entry("threads", 4, "number of threads for use");
        writer.finish()
    }

    fn check(&self, options: &OptionDict) -> ValidationReport {
        report_of(NAME, QuastConfig::parse(options))
    }

    fn plan(
        &self,
        options: &OptionDict,
        context: &PlanContext<'_>,
    ) -> anyhow::Result<Vec<ProcessScript>> {
        let config = config_of(QuastConfig::parse(options))?;
        let layout = context.layout();
        let run_dir = context.run_dir(&config.experiment_id, self.code());

        let mut run = ShellFunction::in_environment("run_quast_process", "quast");
        run.line(format!("cd {}", run_dir))
            .separator()
            .line("quast.py --version")
            .separator()
            .command(
                CommandLine::timed("quast.py")
                    .arg(format!("--threads {}", config.threads))
                    .arg(format!("--output-dir {}", run_dir))
                    .args(
                        config
                            .reference
                            .iter()
                            .map(|reference| format!("-R {}", reference.path(layout))),
                    )
                    .arg_if(
                        config.assembly.assembly_type == AssemblyType::Scaffolds,
                        "--scaffolds",
                    )
                    .arg(config.assembly.transcriptome_file(layout, &config.experiment_id)),
            );

        let mut script = ProcessScript::new(format!("{} process", NAME), run_dir);
        script.function(run);
        Ok(vec![script])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::script::ScriptContext;
    use crate::utils::settings::Settings;

    fn plan(options: &OptionDict) -> String {
        let settings = Settings::default();
        let context = PlanContext {
            run_dir: Some(String::from("/r/exp001/quast-run")),
            ..PlanContext::new(&settings)
        };
        let scripts = Quast.plan(options, &context).unwrap();
        assert_eq!(scripts.len(), 1);
        scripts[0].render(&ScriptContext {
            cluster_name: "c1",
            settings: &settings,
        })
    }

    #[test]
    fn test_default_config_is_valid() {
        let text = Quast.default_config(&Seed::default(), &ClusterLayout::default());
        let options: OptionDict = text.parse().unwrap();
        let report = Quast.check(&options);
        assert!(report.is_valid(), "{}", report);
        assert_eq!(options.get(IDENTIFICATION, "assembly_type"), Some("CONTIGS"));
    }

    #[test]
    fn test_default_config_follows_seed() {
        let seed = Seed {
            assembly_dataset_id: Some(String::from("trinity-170101-000000")),
            assembly_type: Some(AssemblyType::Scaffolds),
            ..Seed::default()
        };
        let text = Quast.default_config(&seed, &ClusterLayout::default());
        let options: OptionDict = text.parse().unwrap();
        assert_eq!(options.get(IDENTIFICATION, "assembly_software"), Some("trinity"));
        assert_eq!(options.get(IDENTIFICATION, "assembly_type"), Some("NONE"));
        assert!(Quast.check(&options).is_valid());
    }

    #[test]
    fn test_check_collects_every_problem() {
        let options: OptionDict = "[identification]\nexperiment_id = exp001\nreference_dataset_id = NONE\nassembly_software = bogus\nassembly_dataset_id = x-1\nassembly_type = NONE\n"
            .parse()
            .unwrap();
        let report = Quast.check(&options);
        let messages: Vec<&str> = report.issues.iter().map(|i| i.message.as_str()).collect();

        assert_eq!(
            messages,
            vec![
                "the key \"reference_file\" is not found in the section \"identification\".",
                "the key \"assembly_software\" has to be sdnt (SOAPdenovo-Trans) or transabyss (Trans-ABySS) or trinity (Trinity) or ggtrinity (Genome-guided Trinity) or cdhit (CD-HIT-EST) or transfil (transcript-filter).",
                "the key \"assembly_dataset_id\" has to start with sdnt (SOAPdenovo-Trans) or transabyss (Trans-ABySS) or trinity (Trinity) or ggtrinity (Genome-guided Trinity) or cdhit (CD-HIT-EST) or transfil (transcript-filter).",
                "the section \"QUAST parameters\" is not found.",
            ]
        );
    }

    #[test]
    fn test_script_with_reference_and_scaffolds() {
        let options: OptionDict = "[identification]\nexperiment_id = exp001\nreference_dataset_id = Athaliana\nreference_file = genome.fa\nassembly_software = sdnt\nassembly_dataset_id = sdnt-170101-235959\nassembly_type = SCAFFOLDS\n[QUAST parameters]\nthreads = 8\n"
            .parse()
            .unwrap();
        let script = plan(&options);

        assert!(script.contains("    source activate quast\n    cd /r/exp001/quast-run\n"));
        assert!(script.contains(
            "        quast.py \\\n            --threads 8 \\\n            --output-dir /r/exp001/quast-run \\\n            -R /ngscloud2/references/Athaliana/genome.fa \\\n            --scaffolds \\\n            /ngscloud2/results/exp001/sdnt-170101-235959/exp001-sdnt-170101-235959.scafSeq\n"
        ));
        assert!(script.contains("manage_error quast.py $RC"));
    }

    #[test]
    fn test_script_without_reference() {
        let options: OptionDict = Quast
            .default_config(&Seed::default(), &ClusterLayout::default())
            .parse()
            .unwrap();
        let script = plan(&options);
        assert!(!script.contains(" -R "));
        assert!(!script.contains("--scaffolds"));
        assert!(script.contains(".contig\n"));
    }

    #[test]
    fn test_plan_fails_on_invalid_config() {
        let settings = Settings::default();
        let options: OptionDict = "[identification]\n".parse().unwrap();
        let err = Quast.plan(&options, &PlanContext::new(&settings)).unwrap_err();
        assert!(err.to_string().contains("The QUAST config file is not valid."));
    }
}
