use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bluebooth::paths::{check_privilege, effective_uid, needs_privilege, standard_config_path};
use bluebooth::report::{
    render_config_path, render_finished, render_host_found, render_json, render_key_found,
    render_parsing, render_patching, RunReport,
};
use bluebooth::settings::{default_settings, load_settings};
use bluebooth_core::{backup_path, patch_link_key, scan_export, ScanOutcome};
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, OutputFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.verbose);
    run(cli, effective_uid())
}

fn setup_logging(verbosity: &Verbosity<WarnLevel>) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli, euid: u32) -> Result<()> {
    // Checked before the settings file or the export is opened.
    let read_only = cli.show_path || cli.dry_run;
    if needs_privilege(cli.config_file.is_some(), read_only) {
        check_privilege(euid)?;
    }

    let text = cli.format == OutputFormat::Text;
    let storage_root = resolve_storage_root(&cli)?;

    if text {
        println!("{}", render_parsing(&cli.reg_file));
    }
    let scan = scan_export(&cli.reg_file, &cli.mac)
        .with_context(|| format!("failed to scan {}", cli.reg_file.display()))?;
    info!(lines = scan.lines_scanned, "registry export scanned");

    let host = scan.outcome.host();
    if text {
        if let Some(host) = &host {
            println!("{}", render_host_found(host));
        }
        if let Some(found) = scan.outcome.extraction() {
            println!("{}", render_key_found(&found.link_key));
        }
    }
    let standard_path = host.map(|host| standard_config_path(&storage_root, &host, &cli.mac));

    let mut report = RunReport {
        target_mac: cli.mac,
        host_mac: host,
        link_key: scan.outcome.extraction().map(|found| found.link_key.clone()),
        config_path: None,
        patched: false,
    };

    if cli.show_path {
        let Some(path) = standard_path else {
            bail!(
                "host bluetooth adapter not found in .reg file [{}]",
                cli.reg_file.display()
            );
        };
        return emit(cli.format, &report_with_path(report, &path), || {
            println!("{}", render_config_path(&path))
        });
    }

    let found = match &scan.outcome {
        ScanOutcome::Found(found) => found,
        ScanOutcome::DeviceNotFound { .. } | ScanOutcome::AdapterNotFound => bail!(
            "Pairing key not found in .reg file for given device's mac address [{}] [{}].",
            cli.reg_file.display(),
            cli.mac
        ),
    };

    let target_path = match (&cli.config_file, &standard_path) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => path.clone(),
        (None, None) => bail!("host bluetooth adapter not found; pass --config-file"),
    };

    if cli.dry_run {
        return emit(cli.format, &report_with_path(report, &target_path), || {
            println!("{}", render_config_path(&target_path))
        });
    }

    if text {
        println!("{}", render_patching(&target_path, &backup_path(&target_path)));
    }
    let summary = patch_link_key(&target_path, &found.link_key)?;
    debug!(backup = %summary.backup.display(), "backup removed");

    report = report_with_path(report, &target_path);
    report.patched = true;
    let extracted_from = match &cli.config_file {
        Some(_) => standard_path.as_deref(),
        None => None,
    };
    emit(cli.format, &report, || {
        println!(
            "{}",
            render_finished(summary.previous_key.as_deref(), extracted_from)
        )
    })
}

fn resolve_storage_root(cli: &Cli) -> Result<PathBuf> {
    if let Some(root) = &cli.storage_root {
        return Ok(root.clone());
    }
    let settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => default_settings(),
    };
    Ok(settings.storage.root)
}

fn report_with_path(mut report: RunReport, path: &std::path::Path) -> RunReport {
    report.config_path = Some(path.display().to_string());
    report
}

fn emit(format: OutputFormat, report: &RunReport, text: impl FnOnce()) -> Result<()> {
    match format {
        OutputFormat::Text => text(),
        OutputFormat::Json => println!("{}", render_json(report)?),
    }
    Ok(())
}
