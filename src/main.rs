use asn_labels::config::{self, AsnConfig, START_ENV_VAR};
use asn_labels::job::{self, Bookkeeping, JobError, JobSettings, LabelJob, StartRequest};
use asn_labels::models::RenderOutcome;
use asn_labels::renderer::{CommandRenderer, LabelRenderer, ManifestRenderer};
use asn_labels::{FormatScheme, RangeId, Result, StateStore};
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "asn-labels")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Print the next sheet of Archive Serial Number labels", long_about = None)]
struct Cli {
    /// Starting ASN (overridden by --start)
    #[arg(value_name = "START")]
    start_arg: Option<u32>,

    /// Starting ASN; wins over every other source and skips range bookkeeping
    #[arg(short, long)]
    start: Option<u32>,

    /// Two-digit range to continue from its recorded watermark (e.g. 01)
    #[arg(short, long, value_name = "RR")]
    range: Option<RangeId>,

    /// Token scheme (overrides the config file)
    #[arg(long, value_enum)]
    scheme: Option<FormatScheme>,

    /// Config file (default: asn-labels.toml next to the executable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for rendered artifacts
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory holding asn_state.json
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Show the batch that would be issued without rendering or saving
    #[arg(long)]
    dry_run: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(job::exit_code_for(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path().map_err(JobError::from)?,
    };
    let mut config = AsnConfig::load(&config_path).map_err(JobError::from)?;
    if let Some(scheme) = cli.scheme {
        config.scheme = scheme;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = Some(dir);
    }
    if let Some(dir) = cli.state_dir {
        config.state_dir = Some(dir);
    }

    let store = StateStore::new(config.resolve_state_dir().map_err(JobError::from)?);
    let settings = JobSettings {
        scheme: config.scheme,
        default_start: config.default_start,
        output_dir: config.resolve_output_dir(),
        show_progress: !cli.quiet && std::io::stderr().is_terminal(),
        ..Default::default()
    };

    let request = StartRequest {
        explicit: cli.start,
        positional: cli.start_arg,
        environment: config::env_start_value(std::env::var_os(START_ENV_VAR)),
        range: cli.range,
    };

    let mut renderer: Box<dyn LabelRenderer> = match &config.renderer.command {
        Some(command) => Box::new(CommandRenderer::new(command.clone(), config.renderer.args.clone())),
        None => Box::new(ManifestRenderer::new()),
    };

    let mut job = LabelJob::new(settings, store.clone());

    if cli.dry_run {
        let planned = job.plan(&request);
        print_warnings(&job);
        let planned = planned?;

        println!("{}", "🔎 Dry run, nothing rendered or saved".cyan());
        println!("   Start source: {}", planned.source.name());
        println!(
            "   ASNs:         {} - {} ({} labels)",
            planned.batch.start(),
            planned.batch.end(),
            planned.batch.count()
        );
        println!("   Output:       {}", renderer.output_path(&planned.artifact).display());
        match planned.bookkeeping {
            Bookkeeping::Range(range) => println!(
                "   Watermark:    range {} -> {} in {}",
                range,
                planned.batch.end(),
                store.path().display()
            ),
            Bookkeeping::Disabled => println!("   Watermark:    not recorded"),
        }
        return Ok(());
    }

    println!("{}", "🏷  Issuing ASN labels...".cyan());
    let report = job.run(&request, renderer.as_mut());
    print_warnings(&job);
    if let Some(batch) = job.last_batch() {
        if let RenderOutcome::Failed(_) = batch.outcome() {
            eprintln!(
                "   {} may be incomplete; no watermark was recorded for {} - {}",
                renderer.output_path(&job.settings().output_dir.join(batch.artifact_name())).display(),
                batch.start(),
                batch.end()
            );
        }
    }
    let report = report?;

    println!(
        "{}",
        format!(
            "✅ Issued {} - {} ({} labels, start from {})",
            report.batch.start(),
            report.batch.end(),
            report.batch.count(),
            report.source.name()
        )
        .green()
    );
    println!("   Output: {}", report.output.display());
    if let Some(watermark) = report.committed {
        println!(
            "   Range {} watermark is now {}",
            report.batch.range(),
            watermark
        );
    }

    Ok(())
}

fn print_warnings(job: &LabelJob) {
    for warning in job.warnings() {
        eprintln!("{}", format!("⚠️  {}", warning).yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_out_of_bounds_range_is_usage_error() {
        let err = Cli::try_parse_from(["asn-labels", "--range", "100"])
            .err()
            .expect("range 100 should be rejected");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_range_and_start_parse() {
        let cli = Cli::try_parse_from(["asn-labels", "-r", "03", "--dry-run"]).unwrap();
        assert_eq!(cli.range, Some(RangeId::new(3).unwrap()));
        assert!(cli.dry_run);
        assert_eq!(cli.start_arg, None);

        let cli = Cli::try_parse_from(["asn-labels", "190", "--scheme", "legacy"]).unwrap();
        assert_eq!(cli.start_arg, Some(190));
        assert_eq!(cli.scheme, Some(FormatScheme::Legacy));
    }
}
