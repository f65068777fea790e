//! `ngscloud` is a command line tool that prepares and runs RNA-seq tools
//! (Bowtie2, the Cufflinks suite, QUAST, Trans-ABySS and Trimmomatic) on a
//! cloud cluster. This package is composed of both a library crate, as well
//! as a binary crate.
//!
//! For every supported tool, the library knows how to write a documented
//! config file, how to check it, how to render the bash script that runs the
//! tool on the cluster, and how to submit that script over SSH.
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]

pub mod list;
pub mod process;
pub mod tools;
pub mod utils;
