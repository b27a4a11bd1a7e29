// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kamerainspeksjon: camera inspection reports
//
// Entry point. Initialises logging, resolves the data directory, opens the
// services and runs one subcommand.

mod cli;
mod commands;
mod data_dir;

use std::process::ExitCode;

use clap::Parser;
use kamera_core::human_errors::humanize_error;

use cli::Cli;
use commands::Context;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = data_dir::data_dir(cli.data_dir.as_deref());
    tracing::info!(data_dir = %dir.display(), "Kamerainspeksjon starting");

    let result = match Context::open(dir).await {
        Ok(ctx) => commands::run(ctx, cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            let human = humanize_error(&e);
            eprintln!("Feil: {}", human.message);
            eprintln!("{}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}
