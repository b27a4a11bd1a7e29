// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand handlers. Each one drives the report services and prints a
// short Norwegian confirmation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kamera_core::error::{KameraError, Result};
use kamera_core::{AppConfig, PackageFields};
use kamera_report::{ReportService, schedule_cleanup};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cli::{Command, ConfigCommand, LineCommand, PackageCommand, ProjectCommand, RemarkCommand};

/// Everything a command may need.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub service: ReportService,
}

impl Context {
    pub async fn open(data_dir: PathBuf) -> Result<Self> {
        let config = AppConfig::load(&data_dir)?;
        let service = ReportService::open(&config, &data_dir)?;
        service.ensure_dirs().await?;
        Ok(Self {
            data_dir,
            config,
            service,
        })
    }
}

pub async fn run(ctx: Context, command: Command) -> Result<()> {
    match command {
        Command::Project(cmd) => project(&ctx, cmd).await,
        Command::Package(cmd) => package(&ctx, cmd).await,
        Command::Line(cmd) => line(&ctx, cmd).await,
        Command::Remark(cmd) => remark(&ctx, cmd).await,
        Command::Config(cmd) => config(ctx, cmd),
    }
}

async fn project(ctx: &Context, cmd: ProjectCommand) -> Result<()> {
    let service = &ctx.service;
    match cmd {
        ProjectCommand::List => {
            let projects = service.with_records(|store| store.list_projects()).await?;
            for p in &projects {
                println!("{:>4}  {:<20} {}", p.id, p.project_number, p.customer_name);
            }
        }
        ProjectCommand::Show { id } => {
            let (project, packages) = service
                .with_records(move |store| {
                    let project = store.get_project(id)?.ok_or_else(|| KameraError::not_found("project", id))?;
                    Ok((project, store.packages_by_project(id)?))
                })
                .await?;
            print_json(&serde_json::json!({ "project": project, "packages": packages }))?;
        }
        ProjectCommand::Create { number, customer } => {
            let project = service
                .with_records(move |store| store.create_project(&number, &customer))
                .await?;
            println!("Prosjekt {} opprettet (ID {}).", project.project_number, project.id);
        }
        ProjectCommand::Update { id, number, customer } => {
            service
                .with_records(move |store| store.update_project(id, &number, &customer))
                .await?;
            println!("Prosjekt {id} oppdatert.");
        }
        ProjectCommand::Delete { id } => {
            let removed = service.with_records(move |store| store.delete_project(id)).await?;
            if !removed {
                return Err(KameraError::not_found("project", id));
            }
            println!("Prosjekt {id} slettet.");
        }
        ProjectCommand::Report { id, out } => {
            let archive = service.generate_project_reports(id).await?;
            let (target, cleanup) = deliver_working(
                &archive.path,
                &out,
                &archive.file_name,
                archive.files(),
                service.cleanup_delay(),
            )
            .await?;
            println!("Rapporter lagret i {} ({} pakker).", target.display(), archive.reports.len());
            cleanup.await.ok();
        }
        ProjectCommand::Export { id, out } => {
            let export = service.export_project(id).await?;
            let working = vec![export.path.clone()];
            let (target, cleanup) =
                deliver_working(&export.path, &out, &export.file_name, working, service.cleanup_delay())
                    .await?;
            println!("Prosjekt eksportert til {} ({} filer).", target.display(), export.files);
            cleanup.await.ok();
        }
        ProjectCommand::Import { archive } => {
            let bytes = tokio::fs::read(&archive).await?;
            let summary = service.import_project_archive(bytes).await?;
            println!(
                "Prosjekt importert med alle filer! (ID {}: {} pakker, {} rørseksjoner, {} merknader, {} filer)",
                summary.project_id, summary.packages, summary.lines, summary.remarks, summary.files
            );
        }
    }
    Ok(())
}

async fn package(ctx: &Context, cmd: PackageCommand) -> Result<()> {
    let service = &ctx.service;
    match cmd {
        PackageCommand::List { project } => {
            let packages = service
                .with_records(move |store| match project {
                    Some(project_id) => store.packages_by_project(project_id),
                    None => store.list_packages(),
                })
                .await?;
            for p in &packages {
                println!("{:>4}  {:<30} prosjekt {}", p.id, p.name, p.project_id);
            }
        }
        PackageCommand::Show { id } => {
            let package = service.load_package(id).await?;
            print_json(&package)?;
        }
        PackageCommand::Create { project, fields } => {
            let fields = PackageFields::from(fields);
            let package = service
                .with_records(move |store| store.create_package(project, &fields))
                .await?;
            println!("Pakke {} opprettet (ID {}).", package.name, package.id);
        }
        PackageCommand::Update { id, fields } => {
            let fields = PackageFields::from(fields);
            service.with_records(move |store| store.update_package(id, &fields)).await?;
            println!("Pakke {id} oppdatert.");
        }
        PackageCommand::Comment { id, text } => {
            service
                .with_records(move |store| store.update_package_comment(id, &text))
                .await?;
            println!("Kommentar lagret.");
        }
        PackageCommand::Delete { id } => {
            let removed = service.with_records(move |store| store.delete_package(id)).await?;
            if !removed {
                return Err(KameraError::not_found("package", id));
            }
            println!("Pakke {id} slettet.");
        }
        PackageCommand::Report { id, out } => {
            let report = service.generate_package_report(id).await?;
            let working = vec![report.path.clone()];
            let (target, cleanup) =
                deliver_working(&report.path, &out, &report.file_name, working, service.cleanup_delay())
                    .await?;
            println!("Rapport lagret: {} ({} sider).", target.display(), report.page_count);
            if !report.skipped_drawings.is_empty() {
                println!("Tegninger som ikke kunne legges ved: {}", report.skipped_drawings.join(", "));
            }
            cleanup.await.ok();
        }
        PackageCommand::Export { id, out } => {
            let export = service.export_package_json(id).await?;
            let target = output_path(&out, &export.file_name);
            tokio::fs::write(&target, export.json).await?;
            println!("Pakke eksportert til {}.", target.display());
        }
        PackageCommand::Import { project, file } => {
            let json = tokio::fs::read_to_string(&file).await?;
            let package = service.import_package_json(project, &json).await?;
            println!("Pakke importert uten filer (PDFs og bilder) (ID {}).", package.id);
        }
    }
    Ok(())
}

async fn line(ctx: &Context, cmd: LineCommand) -> Result<()> {
    let service = &ctx.service;
    match cmd {
        LineCommand::List { package } => {
            let lines = service.with_records(move |store| store.lines_by_package(package)).await?;
            for l in &lines {
                let drawing = if l.drawing().is_some() { "tegning" } else { "" };
                println!("{:>4}  #{:<4} {:<30} {}", l.id, l.line_number, l.name, drawing);
            }
        }
        LineCommand::Create { package, name, number, drawing } => {
            let drawing = match drawing {
                Some(path) => Some(tokio::fs::read(&path).await?),
                None => None,
            };
            let ingested = service.create_line(package, &name, number, drawing).await?;
            if ingested.split {
                println!("PDF delt i {} rørseksjoner:", ingested.lines.len());
            }
            for l in &ingested.lines {
                println!("Rørseksjon {} opprettet (ID {}, nr. {}).", l.name, l.id, l.line_number);
            }
        }
        LineCommand::Update { id, name, number } => {
            service
                .with_records(move |store| store.update_line(id, &name, number))
                .await?;
            println!("Rørseksjon {id} oppdatert.");
        }
        LineCommand::Delete { id } => {
            let removed = service.with_records(move |store| store.delete_line(id)).await?;
            if !removed {
                return Err(KameraError::not_found("line", id));
            }
            println!("Rørseksjon {id} slettet.");
        }
    }
    Ok(())
}

async fn remark(ctx: &Context, cmd: RemarkCommand) -> Result<()> {
    let service = &ctx.service;
    match cmd {
        RemarkCommand::List { line } => {
            let remarks = service.with_records(move |store| store.remarks_by_line(line)).await?;
            for (index, r) in remarks.iter().enumerate() {
                println!("{:>4}  #{} {}", r.id, index + 1, r.comment);
            }
        }
        RemarkCommand::Add { line, image, comment } => {
            let bytes = tokio::fs::read(&image).await?;
            let extension = image.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
            let remark = service.add_remark(line, &bytes, extension, &comment).await?;
            println!("Merknad lagt til (ID {}).", remark.id);
        }
        RemarkCommand::Comment { id, text } => {
            service
                .with_records(move |store| store.update_remark_comment(id, &text))
                .await?;
            println!("Kommentar lagret.");
        }
        RemarkCommand::Delete { id } => {
            let removed = service.with_records(move |store| store.delete_remark(id)).await?;
            if !removed {
                return Err(KameraError::not_found("remark", id));
            }
            println!("Merknad {id} slettet.");
        }
    }
    Ok(())
}

fn config(ctx: Context, cmd: ConfigCommand) -> Result<()> {
    let Context { data_dir, mut config, .. } = ctx;
    match cmd {
        ConfigCommand::Show => {
            print_json(&config)?;
            match config.resolve_logo(&data_dir) {
                Some(logo) => println!("Logo: {}", logo.display()),
                None => println!("Logo: ingen"),
            }
            return Ok(());
        }
        ConfigCommand::Init => {}
        ConfigCommand::SetLogo { path } => {
            if !path.exists() {
                return Err(KameraError::Validation(format!("finner ikke {}", path.display())));
            }
            config.logo_path = Some(path);
        }
        ConfigCommand::SetCleanupDelay { seconds } => config.cleanup_delay_secs = seconds,
    }
    config.save(&data_dir)?;
    println!("Konfigurasjon lagret.");
    Ok(())
}

/// Deliver `source` and schedule removal of the working files. They go after
/// `delay` once delivered, and at once when delivery fails.
async fn deliver_working(
    source: &Path,
    out: &Path,
    file_name: &str,
    working: Vec<PathBuf>,
    delay: Duration,
) -> Result<(PathBuf, JoinHandle<()>)> {
    match deliver(source, out, file_name).await {
        Ok(target) => Ok((target, schedule_cleanup(working, delay))),
        Err(e) => {
            warn!(error = %e, "delivery failed, removing working files");
            schedule_cleanup(working, Duration::ZERO).await.ok();
            Err(e)
        }
    }
}

/// Copy a generated file to the user's chosen location.
async fn deliver(source: &Path, out: &Path, file_name: &str) -> Result<PathBuf> {
    let target = output_path(out, file_name);
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(source, &target).await?;
    info!(target = %target.display(), "file delivered");
    Ok(target)
}

/// `out` itself, or `out/<file_name>` when `out` is a directory.
fn output_path(out: &Path, file_name: &str) -> PathBuf {
    if out.is_dir() {
        out.join(file_name)
    } else {
        out.to_path_buf()
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    debug!(bytes = text.len(), "printing record");
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_targets_get_the_file_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(output_path(dir.path(), "a.pdf"), dir.path().join("a.pdf"));
        let file = dir.path().join("custom.pdf");
        assert_eq!(output_path(&file, "a.pdf"), file);
    }

    #[tokio::test]
    async fn delivers_into_new_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("work.pdf");
        tokio::fs::write(&source, b"%PDF").await.expect("write");

        let target = deliver(&source, &dir.path().join("out/rapport.pdf"), "ignored.pdf")
            .await
            .expect("deliver");
        assert_eq!(target, dir.path().join("out/rapport.pdf"));
        assert_eq!(tokio::fs::read(&target).await.expect("read"), b"%PDF");
    }

    #[tokio::test]
    async fn failed_delivery_still_removes_working_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = dir.path().join("work.pdf");
        let pages = dir.path().join("work-2.pdf");
        tokio::fs::write(&report, b"%PDF").await.expect("write");
        tokio::fs::write(&pages, b"%PDF").await.expect("write");
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, b"file").await.expect("write");

        let err = deliver_working(
            &report,
            &blocker.join("out/rapport.zip"),
            "rapport.zip",
            vec![report.clone(), pages.clone()],
            Duration::from_secs(60),
        )
        .await
        .expect_err("parent is a file");
        assert!(matches!(err, KameraError::Io(_)));
        assert!(!report.exists());
        assert!(!pages.exists());
    }

    #[tokio::test]
    async fn delivered_files_are_removed_after_the_delay() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = dir.path().join("work.pdf");
        tokio::fs::write(&report, b"%PDF").await.expect("write");

        let (target, cleanup) = deliver_working(
            &report,
            &dir.path().join("rapport.pdf"),
            "rapport.pdf",
            vec![report.clone()],
            Duration::from_millis(10),
        )
        .await
        .expect("deliver");
        cleanup.await.expect("cleanup task");
        assert!(target.exists());
        assert!(!report.exists());
    }

    #[tokio::test]
    async fn commands_share_one_data_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::open(dir.path().to_path_buf()).await.expect("open");
        run(
            ctx,
            Command::Project(ProjectCommand::Create {
                number: "P-1".into(),
                customer: "Kunde".into(),
            }),
        )
        .await
        .expect("create");

        let ctx = Context::open(dir.path().to_path_buf()).await.expect("reopen");
        let projects = ctx
            .service
            .with_records(|store| store.list_projects())
            .await
            .expect("list");
        assert_eq!(projects.len(), 1);
        assert!(dir.path().join("kamera_reports.db").exists());

        let err = run(ctx, Command::Project(ProjectCommand::Delete { id: 99 }))
            .await
            .expect_err("missing project");
        assert!(matches!(err, KameraError::NotFound { .. }));
    }
}
