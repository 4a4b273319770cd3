use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use swiftmock_core::Config;

use crate::commands::{generate_command, init_command};

#[derive(Parser, Debug)]
#[command(name = "swiftmock")]
#[command(version, about, long_about = None, propagate_version = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Overrides --logging-level")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate mocks for annotated protocols and classes
    #[command(visible_alias = "g")]
    Generate(GenerateArgs),
    /// Write a starter .swiftmock.json
    Init {
        /// Directory to initialize (defaults to the current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct GenerateArgs {
    /// Directories to scan recursively for Swift sources
    #[arg(short = 's', long = "sourcedirs", num_args = 1.., conflicts_with_all = ["source_files", "file_list"])]
    pub source_dirs: Vec<PathBuf>,

    /// Swift source files to scan
    #[arg(long = "sourcefiles", num_args = 1..)]
    pub source_files: Vec<PathBuf>,

    /// File listing source paths, one per line
    #[arg(short = 'f', long = "filelist")]
    pub file_list: Option<PathBuf>,

    /// Mock files generated by earlier runs
    #[arg(long = "mockfiles", num_args = 1..)]
    pub mock_files: Vec<PathBuf>,

    /// Directories holding mocks generated by earlier runs
    #[arg(long = "mockdirs", num_args = 1..)]
    pub mock_dirs: Vec<PathBuf>,

    /// File listing pre-generated mock paths, one per line
    #[arg(long = "depfilelist")]
    pub dep_file_list: Option<PathBuf>,

    /// Output file
    #[arg(short = 'd', long)]
    pub destination: Option<PathBuf>,

    /// Skip files whose name (without extension) ends with one of these
    #[arg(short = 'x', long = "exclude-suffixes", num_args = 1..)]
    pub exclude_suffixes: Vec<String>,

    /// Doc comment marker selecting declarations to mock [default: @mockable]
    #[arg(short = 'a', long)]
    pub annotation: Option<String>,

    /// Text written at the top of the output
    #[arg(long)]
    pub header: Option<String>,

    /// Wrap the output in `#if <MACRO>`
    #[arg(short = 'm', long = "macro")]
    pub macro_name: Option<String>,

    /// Modules imported with @testable
    #[arg(short = 'i', long = "testable-imports", num_args = 1..)]
    pub testable_imports: Vec<String>,

    /// Maximum units of work in flight [default: number of cores]
    #[arg(short = 'j', long = "concurrency-limit")]
    pub concurrency_limit: Option<usize>,

    /// 0 info, 1 verbose, 2 warning, 3 error
    #[arg(short = 'v', long = "logging-level", value_parser = clap::value_parser!(u8).range(0..=3))]
    pub logging_level: Option<u8>,

    /// Explicit configuration file instead of searching for .swiftmock.json
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl GenerateArgs {
    /// Flags as a partial configuration, to be layered over the config file
    pub fn to_overrides(&self) -> Config {
        Config {
            source_dirs: self.source_dirs.clone(),
            source_files: self.source_files.clone(),
            file_list: self.file_list.clone(),
            mock_files: self.mock_files.clone(),
            mock_dirs: self.mock_dirs.clone(),
            dep_file_list: self.dep_file_list.clone(),
            destination: self.destination.clone(),
            exclude_suffixes: self.exclude_suffixes.clone(),
            annotation: self.annotation.clone(),
            header: self.header.clone(),
            macro_name: self.macro_name.clone(),
            testable_imports: self.testable_imports.clone(),
            concurrency_limit: self.concurrency_limit,
            logging_level: self.logging_level,
        }
    }
}

impl Commands {
    /// Execute the command
    pub fn execute(self) -> Result<()> {
        match self {
            Commands::Generate(args) => generate_command(&args),
            Commands::Init { cwd, force } => init_command(cwd.as_deref(), force),
        }
    }
}
