//! Bowtie2: alignment of reads against a reference genome or an assembly.

use crate::tools::assembly::{assembly_type_text, check_assembly, default_assembly_type, Assembly};
use crate::tools::library::{
    check_libraries, write_library_sections, write_read_type, Library, LIBRARY_PREFIX,
    LIBRARY_SECTION,
};
use crate::tools::reference::{check_reference, Reference};
use crate::tools::{config_of, report_of, Driver, PlanContext, Seed};
use crate::utils::codes::{Code, FileFormat, Orientation, Phred, Software, EXTENDED_ASSEMBLERS};
use crate::utils::layout::{basename, strip_extension, ClusterLayout};
use crate::utils::options::{ConfigWriter, OptionDict};
use crate::utils::parameters::Parameter;
use crate::utils::script::{CommandLine, ProcessScript, ShellFunction};
use crate::utils::validation::{Checker, ValidationReport};

const NAME: &str = "Bowtie2";
const IDENTIFICATION: &str = "identification";
const PARAMETERS: &str = "Bowtie2 parameters";
const INDEX_BASENAME: &str = "bowtie2_indexes";

/// Parameters of `other_parameters` that are set from other keys.
pub const NOT_ALLOWED_PARAMETERS: &[&str] = &[
    "threads",
    "qseq",
    "phred33",
    "phred64",
    "mp",
    "np",
    "rdg",
    "rfg",
    "time",
    "un",
    "un-gz",
    "un-bz2",
    "un-lz4",
    "al",
    "al-gz",
    "al-bz2",
    "un-conc",
    "un-conc-gz",
    "un-conc-bz2",
    "un-conc-lz4",
    "al-conc",
    "al-conc-gz",
    "al-conc-bz2",
    "al-conc-lz4",
    "no-unal",
    "quiet",
    "met-file",
];

/// The Bowtie2 driver.
pub struct Bowtie2;

/// What the reads are aligned against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A genome of a reference dataset.
    Reference(Reference),

    /// The transcriptome of an assembly dataset.
    Assembly(Assembly),
}

impl Target {
    /// The FASTA file the indexes are built from.
    pub fn fasta_file(&self, layout: &ClusterLayout, experiment_id: &str) -> String {
        match self {
            Target::Reference(reference) => reference.path(layout),
            Target::Assembly(assembly) => assembly.transcriptome_file(layout, experiment_id),
        }
    }

    /// The directory holding the Bowtie2 indexes.
    pub fn index_dir(&self, layout: &ClusterLayout, experiment_id: &str) -> String {
        match self {
            Target::Reference(reference) => format!(
                "{}/{}-bowtie2_indexes",
                layout.reference_dataset_dir(&reference.dataset_id),
                strip_extension(&reference.file)
            ),
            Target::Assembly(assembly) => format!(
                "{}/{}-bowtie2_indexes",
                layout.result_dataset_dir(experiment_id, &assembly.dataset_id),
                assembly.dataset_id
            ),
        }
    }
}

/// A checked Bowtie2 config file.
#[derive(Debug)]
pub struct Bowtie2Config {
    /// Experiment identification.
    pub experiment_id: String,

    /// Read dataset holding the library files.
    pub read_dataset_id: String,

    /// Reference or assembly to align against.
    pub target: Target,

    /// Whether the indexes are built before mapping.
    pub index_building: bool,

    /// Whether a large index is forced.
    pub large_index: bool,

    /// Number of threads.
    pub threads: i64,

    /// Minimum mismatch penalty.
    pub min_mp: i64,

    /// Maximum mismatch penalty.
    pub max_mp: i64,

    /// Ambiguous character penalty.
    pub np: i64,

    /// Read gap open penalty.
    pub open_rdg: i64,

    /// Read gap extend penalty.
    pub extend_rdg: i64,

    /// Reference gap open penalty.
    pub open_rfg: i64,

    /// Reference gap extend penalty.
    pub extend_rfg: i64,

    /// Mate orientation.
    pub orientation: Orientation,

    /// Quality score offset.
    pub quality_score: Phred,

    /// Pass-through parameters.
    pub other_parameters: Vec<Parameter>,

    /// Format of the read files.
    pub format: FileFormat,

    /// Whether all libraries are mapped together.
    pub library_concatenation: bool,

    /// The libraries.
    pub libraries: Vec<Library>,
}

impl Bowtie2Config {
    /// Checks and reads a Bowtie2 config file.
    pub fn parse(options: &OptionDict) -> Result<Self, ValidationReport> {
        let mut checker = Checker::new(NAME, options);
        let config = Self::read(&mut checker);
        checker.finish_with(config)
    }

    fn read(checker: &mut Checker<'_>) -> Option<Self> {
        let experiment_id = checker.raw(IDENTIFICATION, "experiment_id");
        let reference = check_reference(checker, IDENTIFICATION, true);
        let assembly = check_assembly(checker, IDENTIFICATION, EXTENDED_ASSEMBLERS, true);
        let target = match (reference, assembly) {
            (Some(Some(reference)), Some(None)) => Some(Target::Reference(reference)),
            (Some(None), Some(Some(assembly))) => Some(Target::Assembly(assembly)),
            (Some(_), Some(_)) => {
                checker.error(
                    IDENTIFICATION,
                    "assembly_software",
                    "the key \"assembly_software\" has to be NONE if the key \"reference_dataset_id\" is not NONE, and vice versa.",
                );
                None
            }
            _ => None,
        };
        let read_dataset_id = checker.raw(IDENTIFICATION, "read_dataset_id");

        let index_building = checker.yes_no(PARAMETERS, "index_building");
        let large_index = checker.yes_no(PARAMETERS, "large_index");
        let threads = checker.int(PARAMETERS, "threads", 1);
        let min_mp = checker.int(PARAMETERS, "min_mp", 0);
        let max_mp = checker.int(PARAMETERS, "max_mp", 0);
        if let (Some(min_mp), Some(max_mp)) = (min_mp, max_mp) {
            if max_mp < min_mp {
                checker.error(
                    PARAMETERS,
                    "max_mp",
                    format!(
                        "the value of max_mp ({}) is less than the value of min_mp ({}).",
                        max_mp, min_mp
                    ),
                );
            }
        }
        let np = checker.int(PARAMETERS, "np", 0);
        let open_rdg = checker.int(PARAMETERS, "open_rdg", 0);
        let extend_rdg = checker.int(PARAMETERS, "extend_rdg", 0);
        let open_rfg = checker.int(PARAMETERS, "open_rfg", 0);
        let extend_rfg = checker.int(PARAMETERS, "extend_rfg", 0);
        let orientation = checker.code::<Orientation>(PARAMETERS, "orientation");
        let quality_score = checker.code::<Phred>(PARAMETERS, "quality_score");
        let other_parameters =
            checker.parameter_list(PARAMETERS, "other_parameters", NOT_ALLOWED_PARAMETERS);

        let format = checker.code::<FileFormat>(LIBRARY_SECTION, "format");
        let read_type = checker.code(LIBRARY_SECTION, "read_type");
        let library_concatenation = checker.yes_no(LIBRARY_SECTION, "library_concatenation");
        let libraries = check_libraries(checker, read_type);

        checker.reject_unknown_sections(
            &[IDENTIFICATION, PARAMETERS, LIBRARY_SECTION],
            &[LIBRARY_PREFIX],
        );

        Some(Bowtie2Config {
            experiment_id: experiment_id?.to_string(),
            read_dataset_id: read_dataset_id?.to_string(),
            target: target?,
            index_building: index_building?,
            large_index: large_index?,
            threads: threads?,
            min_mp: min_mp?,
            max_mp: max_mp?,
            np: np?,
            open_rdg: open_rdg?,
            extend_rdg: extend_rdg?,
            open_rfg: open_rfg?,
            extend_rfg: extend_rfg?,
            orientation: orientation?,
            quality_score: quality_score?,
            other_parameters: other_parameters?,
            format: format?,
            library_concatenation: library_concatenation?,
            libraries: libraries?,
        })
    }
}

/// One `bowtie2` call: the read files it maps and the prefix of its outputs.
#[derive(Debug, PartialEq, Eq)]
struct Mapping {
    name: String,
    read_files_1: String,
    read_files_2: Option<String>,
}

fn library_name(read_file: &str) -> &str {
    let file = basename(read_file);
    strip_extension(file.strip_suffix(".gz").unwrap_or(file))
}

fn mappings(config: &Bowtie2Config, read_dir: &str) -> Vec<Mapping> {
    let path = |file: &str| format!("{}/{}", read_dir, file);

    if config.library_concatenation {
        let paired = config.libraries.iter().all(|library| library.pair().is_some());
        let read_files_1 = config
            .libraries
            .iter()
            .map(|library| path(&library.read_file_1))
            .collect::<Vec<_>>()
            .join(",");
        let read_files_2 = config
            .libraries
            .iter()
            .filter_map(|library| library.read_file_2.as_deref())
            .map(path)
            .collect::<Vec<_>>()
            .join(",");

        return vec![Mapping {
            name: String::from("concatenated_libraries"),
            read_files_1,
            read_files_2: if paired { Some(read_files_2) } else { None },
        }];
    }

    config
        .libraries
        .iter()
        .map(|library| Mapping {
            name: library_name(&library.read_file_1).to_string(),
            read_files_1: path(&library.read_file_1),
            read_files_2: library.read_file_2.as_deref().map(path),
        })
        .collect()
}

fn write_bowtie2_parameters(writer: &mut ConfigWriter) {
    writer
        .entry("index_building", "YES", "index building: YES or NO")
        .entry(
            "large_index",
            "YES",
            "a large index is force, even if the reference is less than ~ 4 billion nucleotides long: YES or NO",
        )
        .entry("threads", 4, "number of threads for use")
        .entry("min_mp", 2, "minimum mismatch penalty")
        .entry("max_mp", 6, "maximum mismatch penalty")
        .entry(
            "np",
            1,
            "penalty for positions where the read, reference, or both, contain an ambiguous character such as N",
        )
        .entry("open_rdg", 5, "read gap open penalty")
        .entry("extend_rdg", 3, "read gap extend penalty")
        .entry("open_rfg", 5, "reference gap open penalty")
        .entry("extend_rfg", 3, "reference gap extend penalty")
        .entry(
            "orientation",
            Orientation::Fr,
            &format!("orientation of paired-end reads: {}", Orientation::all_text()),
        )
        .entry(
            "quality_score",
            Phred::Phred33,
            &format!("FASTQ quality score: {}", Phred::all_text()),
        )
        .entry(
            "other_parameters",
            "NONE",
            "additional parameters to the previous ones or NONE",
        );
}

impl Driver for Bowtie2 {
    fn name(&self) -> &'static str {
        NAME
    }

    fn command_name(&self) -> &'static str {
        "bowtie2"
    }

    fn code(&self) -> &'static str {
        "bowtie2"
    }

    fn environments(&self) -> &'static [&'static str] {
        &["bowtie2", "samtools"]
    }

    fn default_config(&self, seed: &Seed, layout: &ClusterLayout) -> String {
        let reference_dataset_id = seed.reference_dataset_id.as_deref().unwrap_or("NONE");
        let reference_file = seed.reference_file.as_deref().unwrap_or("NONE");
        let uses_reference = seed.reference_dataset_id.is_some();

        let (assembly_software, assembly_dataset_id, assembly_type) = if uses_reference {
            (String::from("NONE"), String::from("NONE"), String::from("NONE"))
        } else {
            let assembly_dataset_id = seed.assembly_dataset_id("sdnt-170101-235959");
            let software = Software::of_dataset(assembly_dataset_id, EXTENDED_ASSEMBLERS)
                .unwrap_or(Software::SoapDenovoTrans);
            (
                software.code().to_string(),
                assembly_dataset_id.to_string(),
                default_assembly_type(assembly_dataset_id, seed.assembly_type).to_string(),
            )
        };

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
            .comment(&format!(
                "The read files have to be located in the cluster directory {}/experiment_id/read_dataset_id",
                layout.read_dir
            ))
            .comment("The experiment_id, reference_dataset_id, reference_file, assembly_dataset_id and read_dataset_id are fixed in the identification section.")
            .comment("")
            .comment("You can consult the parameters of Bowtie2 and their meaning in \"http://bowtie-bio.sourceforge.net/bowtie2/\".")
            .comment("")
            .comment("In section \"Bowtie2 parameters\", the key \"other_parameters\" allows you to input additional parameters in the format:")
            .comment("")
            .comment("   other_parameters = --parameter-1[=value-1][; --parameter-2[=value-2][; ...; --parameter-n[=value-n]]]")
            .comment("")
            .comment("parameter-i is a parameter name of Bowtie2 and value-i a valid value of parameter-i, e.g.")
            .comment("")
            .comment("   other_parameters = --reorder; --score-min=L,0,-0.2")
            .blank()
            .section(IDENTIFICATION, "This section has the information identifies the experiment.")
            .entry("experiment_id", seed.experiment_id(), "experiment identification")
            .entry(
                "reference_dataset_id",
                reference_dataset_id,
                "reference dataset identification or NONE if an assembly is used",
            )
            .entry(
                "reference_file",
                reference_file,
                "reference file name or NONE if an assembly is used",
            )
            .entry(
                "assembly_software",
                &assembly_software,
                &format!(
                    "assembly software: {}; or NONE if a reference is used",
                    Software::list_text(EXTENDED_ASSEMBLERS)
                ),
            )
            .entry(
                "assembly_dataset_id",
                &assembly_dataset_id,
                "assembly dataset identification or NONE if a reference is used",
            )
            .entry("assembly_type", &assembly_type, &assembly_type_text())
            .entry("read_dataset_id", seed.read_dataset_id(), "read dataset identification")
            .blank()
            .section(PARAMETERS, "This section has the information to set the Bowtie2 parameters");
        write_bowtie2_parameters(&mut writer);
        writer
            .blank()
            .section(LIBRARY_SECTION, "This section has the global information of all libraries.")
            .entry("format", FileFormat::Fastq, &format!("format: {}", FileFormat::all_text()));
        write_read_type(&mut writer, seed);
        writer.entry("library_concatenation", "NO", "library concatenation: YES or NO");
        write_library_sections(&mut writer, seed);
        writer.finish()
    }

    fn check(&self, options: &OptionDict) -> ValidationReport {
        report_of(NAME, Bowtie2Config::parse(options))
    }

    fn plan(
        &self,
        options: &OptionDict,
        context: &PlanContext<'_>,
    ) -> anyhow::Result<Vec<ProcessScript>> {
        let config = config_of(Bowtie2Config::parse(options))?;
        let layout = context.layout();
        let experiment_id = &config.experiment_id;
        let run_dir = context.run_dir(experiment_id, self.code());
        let threads = config.threads;
        let index_dir = config.target.index_dir(layout, experiment_id);

        let mut script = ProcessScript::new(format!("{} process", NAME), run_dir.as_str());

        let mut version = ShellFunction::in_environment("print_bowtie2_version", "bowtie2");
        version.separator().line("bowtie2 --version");
        script.function(version);

        if config.index_building {
            let mut build = ShellFunction::in_environment("build_bowtie2_indexes", "bowtie2");
            build
                .line(format!("cd {}", run_dir))
                .separator()
                .line("echo \"Building indexes ...\"")
                .command(
                    CommandLine::timed("bowtie2-build")
                        .arg(format!("--threads {}", threads))
                        .arg_if(config.large_index, "--large-index")
                        .arg("-f")
                        .arg(config.target.fasta_file(layout, experiment_id))
                        .arg(INDEX_BASENAME),
                )
                .command(CommandLine::new(format!("mkdir --parents {}", index_dir)))
                .command(CommandLine::new(format!(
                    "mv -f {}.* {}",
                    INDEX_BASENAME, index_dir
                )))
                .line("echo \"Indexes are built.\"");
            script.function(build);
        }

        let read_dir = layout.read_dataset_dir(experiment_id, &config.read_dataset_id);
        let mut mapping = ShellFunction::in_environment("run_bowtie2_process", "bowtie2");
        mapping.line(format!("cd {}", run_dir));
        for library in mappings(&config, &read_dir) {
            let reads = match &library.read_files_2 {
                Some(read_files_2) => vec![
                    format!("-1 {}", library.read_files_1),
                    format!("-2 {}", read_files_2),
                ],
                None => vec![format!("-U {}", library.read_files_1)],
            };
            let format_flag = match config.format {
                FileFormat::Fastq => "-q",
                FileFormat::Fasta => "-f",
            };

            mapping
                .separator()
                .line(format!("echo \"Mapping reads of {} ...\"", library.name))
                .command(
                    CommandLine::timed("bowtie2")
                        .arg(format!("--threads {}", threads))
                        .arg("--mm")
                        .arg(format!("--mp {},{}", config.max_mp, config.min_mp))
                        .arg(format!("--np {}", config.np))
                        .arg(format!("--rdg {},{}", config.open_rdg, config.extend_rdg))
                        .arg(format!("--rfg {},{}", config.open_rfg, config.extend_rfg))
                        .arg(format!("--{}", config.orientation.code().to_lowercase()))
                        .arg(format!("--phred{}", config.quality_score.offset()))
                        .args(config.other_parameters.iter().map(Parameter::to_argument))
                        .arg(format!("-x {}/{}", index_dir, INDEX_BASENAME))
                        .arg(format_flag)
                        .args(reads)
                        .arg("--no-unal")
                        .arg(format!("-S {}-alignment.sam", library.name))
                        .arg(format!("--un-gz {}-unpairednotaligned.fastq.gz", library.name))
                        .arg(format!("--al-gz {}-unpairedaligned.fastq.gz", library.name))
                        .arg(format!("--un-conc-gz {}-pairednotaligned.fastq.gz", library.name))
                        .arg(format!("--al-conc-gz {}-pairedaligned.fastq.gz", library.name))
                        .arg(format!("--met-file {}-metrics.txt", library.name))
                        .arg("--time"),
                )
                .line("echo \"Reads are mapped.\"");
        }
        script.function(mapping);

        let mut convert = ShellFunction::in_environment("convert_sam2bam", "samtools");
        convert
            .line(format!("cd {}", run_dir))
            .separator()
            .line("echo \"Converting SAM files to BAM format ...\"")
            .line("ls *.sam > sam-files.txt")
            .line("while read FILE_SAM; do")
            .line("    FILE_BAM=`basename $FILE_SAM | sed \"s|.sam|.bam|g\"`")
            .line("    echo \"Converting file $FILE_SAM to BAM format ...\"")
            .line(format!(
                "    samtools view --threads {} -b -S -o $FILE_BAM $FILE_SAM",
                threads
            ))
            .line("    RC=$?")
            .line("    if [ $RC -ne 0 ]; then manage_error samtools-view $RC; fi")
            .line("    echo \"$FILE_BAM is created.\"")
            .line("    gzip $FILE_SAM")
            .line("    RC=$?")
            .line("    if [ $RC -ne 0 ]; then manage_error gzip $RC; fi")
            .line("    echo \"$FILE_SAM is compressed.\"")
            .line("done < sam-files.txt");
        script.function(convert);

        let mut sort = ShellFunction::in_environment("sort_and_index_bam_files", "samtools");
        sort.line(format!("cd {}", run_dir))
            .separator()
            .line("ls *.bam > bam-files.txt")
            .line("while read FILE_BAM; do")
            .line("    FILE_SORTED_BAM=`basename $FILE_BAM | sed \"s|.bam|.sorted.bam|g\"`")
            .line("    echo \"Sorting and indexing $FILE_BAM ...\"")
            .line(format!(
                "    samtools sort --threads {} $FILE_BAM -o $FILE_SORTED_BAM",
                threads
            ))
            .line("    RC=$?")
            .line("    if [ $RC -ne 0 ]; then manage_error samtools-sort $RC; fi")
            .line(format!("    samtools index -@ {} $FILE_SORTED_BAM", threads))
            .line("    RC=$?")
            .line("    if [ $RC -ne 0 ]; then manage_error samtools-index $RC; fi")
            .line("    echo \"$FILE_SORTED_BAM is created.\"")
            .line("    rm -f $FILE_BAM")
            .line("    RC=$?")
            .line("    if [ $RC -ne 0 ]; then manage_error rm $RC; fi")
            .line("done < bam-files.txt");
        script.function(sort);

        Ok(vec![script])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::codes::ReadType;
    use crate::utils::script::ScriptContext;
    use crate::utils::settings::Settings;

    fn default_options(seed: &Seed) -> OptionDict {
        Bowtie2
            .default_config(seed, &ClusterLayout::default())
            .parse()
            .unwrap()
    }

    fn render(options: &OptionDict) -> (Vec<String>, String) {
        let settings = Settings::default();
        let context = PlanContext {
            run_dir: Some(String::from("/run")),
            ..PlanContext::new(&settings)
        };
        let scripts = Bowtie2.plan(options, &context).unwrap();
        let names = scripts[0]
            .function_names()
            .into_iter()
            .map(String::from)
            .collect();
        let text = scripts[0].render(&ScriptContext {
            cluster_name: "c1",
            settings: &settings,
        });
        (names, text)
    }

    #[test]
    fn test_default_configs_are_valid() {
        let report = Bowtie2.check(&default_options(&Seed::default()));
        assert!(report.is_valid(), "{}", report);

        let seed = Seed {
            reference_dataset_id: Some(String::from("Athaliana")),
            reference_file: Some(String::from("genome.fa")),
            read_type: Some(ReadType::SingleEnd),
            ..Seed::default()
        };
        let options = default_options(&seed);
        assert_eq!(options.get(IDENTIFICATION, "assembly_software"), Some("NONE"));
        assert!(Bowtie2.check(&options).is_valid());
    }

    #[test]
    fn test_reference_and_assembly_are_exclusive() {
        let mut options = default_options(&Seed::default());
        options.insert(IDENTIFICATION, "reference_dataset_id", "Athaliana");
        options.insert(IDENTIFICATION, "reference_file", "genome.fa");
        let report = Bowtie2.check(&options);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].message.contains("and vice versa"));

        options.insert(IDENTIFICATION, "reference_dataset_id", "NONE");
        options.insert(IDENTIFICATION, "reference_file", "NONE");
        options.insert(IDENTIFICATION, "assembly_software", "NONE");
        options.insert(IDENTIFICATION, "assembly_dataset_id", "NONE");
        options.insert(IDENTIFICATION, "assembly_type", "NONE");
        assert!(!Bowtie2.check(&options).is_valid());
    }

    #[test]
    fn test_parameter_rules() {
        let mut options = default_options(&Seed::default());
        options.insert(PARAMETERS, "max_mp", "1");
        options.insert(PARAMETERS, "orientation", "XX");
        options.insert(PARAMETERS, "other_parameters", "--reorder; --threads=8; --met-file=m");
        let report = Bowtie2.check(&options);
        let messages: Vec<&str> = report.issues.iter().map(|i| i.message.as_str()).collect();

        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[0],
            "the value of max_mp (1) is less than the value of min_mp (2)."
        );
        assert!(messages[1].starts_with("the key \"orientation\" has to be FR"));
        assert!(messages[2].contains("\"threads\" is not allowed"));
        assert!(messages[3].contains("\"met-file\" is not allowed"));
    }

    #[test]
    fn test_script_per_library() {
        let seed = Seed {
            read_files_1: vec![String::from("a_1.fastq.gz"), String::from("b_1.fq")],
            read_files_2: vec![String::from("a_2.fastq.gz"), String::from("b_2.fq")],
            ..Seed::default()
        };
        let mut options = default_options(&seed);
        options.insert(PARAMETERS, "other_parameters", "--reorder; --score-min=L,0,-0.2");
        let (names, text) = render(&options);

        assert_eq!(
            names,
            vec![
                "print_bowtie2_version",
                "build_bowtie2_indexes",
                "run_bowtie2_process",
                "convert_sam2bam",
                "sort_and_index_bam_files",
            ]
        );
        let index_dir =
            "/ngscloud2/results/exp001/sdnt-170101-235959/sdnt-170101-235959-bowtie2_indexes";
        assert!(text.contains(&format!("    mkdir --parents {}\n", index_dir)));
        assert!(text.contains("            --large-index \\\n            -f \\\n            /ngscloud2/results/exp001/sdnt-170101-235959/exp001-sdnt-170101-235959.contig \\\n            bowtie2_indexes\n"));
        assert!(text.contains("            --mp 6,2 \\\n            --np 1 \\\n            --rdg 5,3 \\\n            --rfg 5,3 \\\n            --fr \\\n            --phred33 \\\n            --reorder \\\n            --score-min L,0,-0.2 \\\n"));
        assert!(text.contains(&format!("            -x {}/bowtie2_indexes \\\n            -q \\\n", index_dir)));
        assert!(text.contains("            -1 /ngscloud2/reads/exp001/uploaded-reads/a_1.fastq.gz \\\n            -2 /ngscloud2/reads/exp001/uploaded-reads/a_2.fastq.gz \\\n"));
        assert!(text.contains("-S a_1-alignment.sam \\\n"));
        assert!(text.contains("-S b_1-alignment.sam \\\n"));
        assert!(text.contains("            --met-file b_1-metrics.txt \\\n            --time\n"));
    }

    #[test]
    fn test_script_with_concatenation_and_reference() {
        let seed = Seed {
            reference_dataset_id: Some(String::from("Athaliana")),
            reference_file: Some(String::from("genome.fa")),
            read_type: Some(ReadType::SingleEnd),
            read_files_1: vec![String::from("a.fq"), String::from("b.fq")],
            ..Seed::default()
        };
        let mut options = default_options(&seed);
        options.insert(LIBRARY_SECTION, "library_concatenation", "YES");
        options.insert(PARAMETERS, "index_building", "NO");
        let (names, text) = render(&options);

        assert!(!names.contains(&String::from("build_bowtie2_indexes")));
        assert!(text.contains("-x /ngscloud2/references/Athaliana/genome-bowtie2_indexes/bowtie2_indexes \\\n"));
        assert!(text.contains("            -U /ngscloud2/reads/exp001/uploaded-reads/a.fq,/ngscloud2/reads/exp001/uploaded-reads/b.fq \\\n"));
        assert!(text.contains("-S concatenated_libraries-alignment.sam"));
        assert_eq!(text.matches("        bowtie2 \\\n").count(), 1);
    }

    #[test]
    fn test_library_name() {
        assert_eq!(library_name("/r/a_1.fastq.gz"), "a_1");
        assert_eq!(library_name("b.fq"), "b");
        assert_eq!(library_name("reads"), "reads");
    }
}
