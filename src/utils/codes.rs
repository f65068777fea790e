//! Coded values accepted in config files.
//!
//! Codes are matched case-insensitively and always written back in their
//! canonical spelling.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

/// A closed set of values identified by a short code.
pub trait Code: Copy + PartialEq + Sized + 'static {
    /// Every value of the set, in the order they are documented.
    const ALL: &'static [Self];

    /// The canonical code of this value.
    fn code(&self) -> &'static str;

    /// An optional human readable explanation shown next to the code.
    fn description(&self) -> Option<&'static str> {
        None
    }

    /// Finds the value whose code matches `s`, ignoring case.
    fn from_code(s: &str) -> Option<Self> {
        Self::from_code_in(s, Self::ALL)
    }

    /// Like [`Code::from_code`], restricted to the given values.
    fn from_code_in(s: &str, allowed: &[Self]) -> Option<Self> {
        allowed
            .iter()
            .find(|value| value.code().eq_ignore_ascii_case(s.trim()))
            .copied()
    }

    /// Renders the given values as `A (description) or B or C`.
    fn list_text(values: &[Self]) -> String {
        values
            .iter()
            .map(|value| match value.description() {
                Some(description) => format!("{} ({})", value.code(), description),
                None => value.code().to_string(),
            })
            .join(" or ")
    }

    /// Renders every value of the set.
    fn all_text() -> String {
        Self::list_text(Self::ALL)
    }
}

fn parse_code<C: Code>(s: &str, kind: &str) -> Result<C, String> {
    C::from_code(s).ok_or_else(|| format!("Unknown {}: {}", kind, s))
}

//===========//
// Read type //
//===========//

/// Whether reads are single-end or paired-end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadType {
    /// Single-end reads, one file per library.
    SingleEnd,

    /// Paired-end reads, two files per library.
    PairedEnd,
}

impl Code for ReadType {
    const ALL: &'static [Self] = &[ReadType::SingleEnd, ReadType::PairedEnd];

    fn code(&self) -> &'static str {
        match self {
            ReadType::SingleEnd => "SE",
            ReadType::PairedEnd => "PE",
        }
    }

    fn description(&self) -> Option<&'static str> {
        match self {
            ReadType::SingleEnd => Some("single-end"),
            ReadType::PairedEnd => Some("paired-end"),
        }
    }
}

impl FromStr for ReadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_code(s, "read type")
    }
}

impl fmt::Display for ReadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//=============//
// File format //
//=============//

/// The format of the read files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    /// FASTA.
    Fasta,

    /// FASTQ.
    Fastq,
}

impl Code for FileFormat {
    const ALL: &'static [Self] = &[FileFormat::Fasta, FileFormat::Fastq];

    fn code(&self) -> &'static str {
        match self {
            FileFormat::Fasta => "FASTA",
            FileFormat::Fastq => "FASTQ",
        }
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_code(s, "file format")
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//=======//
// Phred //
//=======//

/// The Phred offset of quality scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phred {
    /// Phred+33.
    Phred33,

    /// Phred+64.
    Phred64,
}

impl Phred {
    /// The numeric offset.
    pub fn offset(&self) -> u8 {
        match self {
            Phred::Phred33 => 33,
            Phred::Phred64 => 64,
        }
    }
}

impl Code for Phred {
    const ALL: &'static [Self] = &[Phred::Phred33, Phred::Phred64];

    fn code(&self) -> &'static str {
        match self {
            Phred::Phred33 => "33",
            Phred::Phred64 => "64",
        }
    }
}

impl FromStr for Phred {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_code(s, "phred offset")
    }
}

impl fmt::Display for Phred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//=============//
// Orientation //
//=============//

/// Mate orientation of paired-end reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// Forward/reverse.
    Fr,

    /// Reverse/forward.
    Rf,

    /// Forward/forward.
    Ff,
}

impl Code for Orientation {
    const ALL: &'static [Self] = &[Orientation::Fr, Orientation::Rf, Orientation::Ff];

    fn code(&self) -> &'static str {
        match self {
            Orientation::Fr => "FR",
            Orientation::Rf => "RF",
            Orientation::Ff => "FF",
        }
    }

    fn description(&self) -> Option<&'static str> {
        match self {
            Orientation::Fr => Some("fwd-rev, or typical Illumina"),
            Orientation::Rf => Some("rev-fwd, for circularized inserts"),
            Orientation::Ff => Some("fwd-fwd, same strand"),
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_code(s, "orientation")
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//==============//
// Library type //
//==============//

/// Strandedness protocol of the library, as understood by the Cufflinks suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LibraryType {
    FrFirstStrand,
    FrSecondStrand,
    FrUnstranded,
    FfFirstStrand,
    FfSecondStrand,
    FfUnstranded,
    Transfrags,
}

impl LibraryType {
    /// The spelling expected by the `--library-type` option.
    pub fn argument(&self) -> String {
        self.code().to_lowercase()
    }
}

impl Code for LibraryType {
    const ALL: &'static [Self] = &[
        LibraryType::FrFirstStrand,
        LibraryType::FrSecondStrand,
        LibraryType::FrUnstranded,
        LibraryType::FfFirstStrand,
        LibraryType::FfSecondStrand,
        LibraryType::FfUnstranded,
        LibraryType::Transfrags,
    ];

    fn code(&self) -> &'static str {
        match self {
            LibraryType::FrFirstStrand => "FR-FIRSTSTRAND",
            LibraryType::FrSecondStrand => "FR-SECONDSTRAND",
            LibraryType::FrUnstranded => "FR-UNSTRANDED",
            LibraryType::FfFirstStrand => "FF-FIRSTSTRAND",
            LibraryType::FfSecondStrand => "FF-SECONDSTRAND",
            LibraryType::FfUnstranded => "FF-UNSTRANDED",
            LibraryType::Transfrags => "TRANSFRAGS",
        }
    }
}

impl FromStr for LibraryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_code(s, "library type")
    }
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//===============//
// Assembly type //
//===============//

/// Which SOAPdenovo output is used as the assembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblyType {
    /// The `.contig` file.
    Contigs,

    /// The `.scafSeq` file.
    Scaffolds,

    /// Not applicable for the assembler in use.
    None,
}

impl Code for AssemblyType {
    const ALL: &'static [Self] = &[
        AssemblyType::Contigs,
        AssemblyType::Scaffolds,
        AssemblyType::None,
    ];

    fn code(&self) -> &'static str {
        match self {
            AssemblyType::Contigs => "CONTIGS",
            AssemblyType::Scaffolds => "SCAFFOLDS",
            AssemblyType::None => "NONE",
        }
    }
}

impl FromStr for AssemblyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_code(s, "assembly type")
    }
}

impl fmt::Display for AssemblyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//==========//
// Software //
//==========//

/// Upstream software whose result datasets feed into another tool.
///
/// Result dataset identifiers start with the code of the software that
/// produced them (e.g. `sdnt-170101-235959`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Software {
    /// SOAPdenovo-Trans.
    SoapDenovoTrans,

    /// SOAPdenovo2.
    SoapDenovo2,

    /// Trans-ABySS.
    TransAbyss,

    /// Trinity.
    Trinity,

    /// Genome-guided Trinity.
    GgTrinity,

    /// CD-HIT-EST.
    CdHitEst,

    /// The transcript filter.
    TranscriptFilter,

    /// starcode.
    Starcode,

    /// STAR.
    Star,

    /// TopHat.
    TopHat,

    /// Cufflinks followed by Cuffmerge.
    CufflinksCuffmerge,

    /// Cuffquant.
    Cuffquant,
}

impl Software {
    /// The full name of the software.
    pub fn name(&self) -> &'static str {
        match self {
            Software::SoapDenovoTrans => "SOAPdenovo-Trans",
            Software::SoapDenovo2 => "SOAPdenovo2",
            Software::TransAbyss => "Trans-ABySS",
            Software::Trinity => "Trinity",
            Software::GgTrinity => "Genome-guided Trinity",
            Software::CdHitEst => "CD-HIT-EST",
            Software::TranscriptFilter => "transcript-filter",
            Software::Starcode => "starcode",
            Software::Star => "STAR",
            Software::TopHat => "TopHat",
            Software::CufflinksCuffmerge => "Cufflinks-Cuffmerge",
            Software::Cuffquant => "Cuffquant",
        }
    }

    /// Whether this software writes both contigs and scaffolds, in which
    /// case the assembly type has to be chosen.
    pub fn has_assembly_types(&self) -> bool {
        matches!(self, Software::SoapDenovoTrans | Software::SoapDenovo2)
    }

    /// Finds the software whose code starts `dataset_id`.
    pub fn of_dataset(dataset_id: &str, allowed: &[Software]) -> Option<Software> {
        allowed
            .iter()
            .copied()
            .find(|software| dataset_id.starts_with(software.code()))
    }
}

/// Assemblers accepted by QUAST.
pub const ASSEMBLERS: &[Software] = &[
    Software::SoapDenovoTrans,
    Software::TransAbyss,
    Software::Trinity,
    Software::GgTrinity,
    Software::CdHitEst,
    Software::TranscriptFilter,
];

/// Assemblers accepted by Bowtie2.
pub const EXTENDED_ASSEMBLERS: &[Software] = &[
    Software::SoapDenovoTrans,
    Software::TransAbyss,
    Software::Trinity,
    Software::GgTrinity,
    Software::CdHitEst,
    Software::TranscriptFilter,
    Software::SoapDenovo2,
    Software::Starcode,
];

/// Aligners whose BAM files feed the Cufflinks suite.
pub const ALIGNERS: &[Software] = &[Software::Star, Software::TopHat];

impl Code for Software {
    const ALL: &'static [Self] = &[
        Software::SoapDenovoTrans,
        Software::SoapDenovo2,
        Software::TransAbyss,
        Software::Trinity,
        Software::GgTrinity,
        Software::CdHitEst,
        Software::TranscriptFilter,
        Software::Starcode,
        Software::Star,
        Software::TopHat,
        Software::CufflinksCuffmerge,
        Software::Cuffquant,
    ];

    fn code(&self) -> &'static str {
        match self {
            Software::SoapDenovoTrans => "sdnt",
            Software::SoapDenovo2 => "sdn2",
            Software::TransAbyss => "transabyss",
            Software::Trinity => "trinity",
            Software::GgTrinity => "ggtrinity",
            Software::CdHitEst => "cdhit",
            Software::TranscriptFilter => "transfil",
            Software::Starcode => "starcode",
            Software::Star => "star",
            Software::TopHat => "tophat",
            Software::CufflinksCuffmerge => "cufflnkmrg",
            Software::Cuffquant => "cuffquant",
        }
    }

    fn description(&self) -> Option<&'static str> {
        Some(self.name())
    }
}

impl FromStr for Software {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_code(s, "software")
    }
}

impl fmt::Display for Software {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_case_insensitive() {
        assert_eq!("pe".parse::<ReadType>().unwrap(), ReadType::PairedEnd);
        assert_eq!("Fastq".parse::<FileFormat>().unwrap(), FileFormat::Fastq);
        assert_eq!(
            "fr-unstranded".parse::<LibraryType>().unwrap(),
            LibraryType::FrUnstranded
        );
        assert!("XX".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_restricted_lookup() {
        assert_eq!(
            Software::from_code_in("STAR", ALIGNERS),
            Some(Software::Star)
        );
        assert_eq!(Software::from_code_in("trinity", ALIGNERS), None);
    }

    #[test]
    fn test_list_text() {
        assert_eq!(FileFormat::all_text(), "FASTA or FASTQ");
        assert_eq!(
            Software::list_text(ALIGNERS),
            "star (STAR) or tophat (TopHat)"
        );
    }

    #[test]
    fn test_dataset_software() {
        assert_eq!(
            Software::of_dataset("transfil-170101-000000", ASSEMBLERS),
            Some(Software::TranscriptFilter)
        );
        assert_eq!(
            Software::of_dataset("sdnt-170101-000000", ASSEMBLERS),
            Some(Software::SoapDenovoTrans)
        );
        assert_eq!(Software::of_dataset("sdn2-170101-000000", ASSEMBLERS), None);
        assert_eq!(Software::of_dataset("bogus", EXTENDED_ASSEMBLERS), None);
    }

    #[test]
    fn test_library_type_argument() {
        assert_eq!(LibraryType::FfSecondStrand.argument(), "ff-secondstrand");
    }
}
