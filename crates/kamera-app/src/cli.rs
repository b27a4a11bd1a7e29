// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kamera_core::{PackageFields, RecordId};

/// Camera inspection records and PDF reports.
#[derive(Parser, Debug)]
#[command(name = "kamera", author, version, about, long_about = None)]
pub struct Cli {
    /// Data directory (overrides KAMERA_DATA_DIR)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Manage test packages
    #[command(subcommand)]
    Package(PackageCommand),
    /// Manage pipe sections
    #[command(subcommand)]
    Line(LineCommand),
    /// Manage remarks
    #[command(subcommand)]
    Remark(RemarkCommand),
    /// Show or change the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// List projects, newest first
    List,
    /// Show a project and its packages
    Show { id: RecordId },
    Create { number: String, customer: String },
    Update { id: RecordId, number: String, customer: String },
    /// Delete a project with all packages, sections and remarks
    Delete { id: RecordId },
    /// Generate every package report and bundle them as a zip
    Report {
        id: RecordId,
        /// Output file or directory
        #[arg(long, short, value_name = "PATH", default_value = ".")]
        out: PathBuf,
    },
    /// Export records and attachments as a zip archive
    Export {
        id: RecordId,
        #[arg(long, short, value_name = "PATH", default_value = ".")]
        out: PathBuf,
    },
    /// Import a project export archive
    Import { archive: PathBuf },
}

#[derive(Args, Debug)]
pub struct PackageArgs {
    pub name: String,
    #[arg(long, default_value = "")]
    pub comment: String,
    #[arg(long)]
    pub pipe_type: Option<String>,
    #[arg(long)]
    pub lining: Option<String>,
}

impl From<PackageArgs> for PackageFields {
    fn from(args: PackageArgs) -> Self {
        Self {
            name: args.name,
            comment: args.comment,
            pipe_type: args.pipe_type,
            lining: args.lining,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum PackageCommand {
    /// List packages, optionally for one project
    List {
        #[arg(long)]
        project: Option<RecordId>,
    },
    /// Show a package with its sections and remarks
    Show { id: RecordId },
    Create {
        project: RecordId,
        #[command(flatten)]
        fields: PackageArgs,
    },
    Update {
        id: RecordId,
        #[command(flatten)]
        fields: PackageArgs,
    },
    /// Replace only the comment
    Comment { id: RecordId, text: String },
    Delete { id: RecordId },
    /// Generate the PDF report
    Report {
        id: RecordId,
        #[arg(long, short, value_name = "PATH", default_value = ".")]
        out: PathBuf,
    },
    /// Export the package as JSON (without files)
    Export {
        id: RecordId,
        #[arg(long, short, value_name = "PATH", default_value = ".")]
        out: PathBuf,
    },
    /// Import a package JSON export into a project
    Import { project: RecordId, file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum LineCommand {
    /// List the sections of a package by line number
    List { package: RecordId },
    /// Create a section; a multi-page drawing becomes one section per page
    Create {
        package: RecordId,
        name: String,
        #[arg(long, default_value_t = 0)]
        number: i64,
        #[arg(long, value_name = "PDF")]
        drawing: Option<PathBuf>,
    },
    Update { id: RecordId, name: String, number: i64 },
    Delete { id: RecordId },
}

#[derive(Subcommand, Debug)]
pub enum RemarkCommand {
    List { line: RecordId },
    /// Attach a photo with an optional comment
    Add {
        line: RecordId,
        image: PathBuf,
        #[arg(long, default_value = "")]
        comment: String,
    },
    Comment { id: RecordId, text: String },
    Delete { id: RecordId },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Show,
    /// Write the current configuration to kamera.json
    Init,
    /// Use this image as the header logo
    SetLogo { path: PathBuf },
    /// Seconds before served files are removed
    SetCleanupDelay { seconds: u64 },
}
