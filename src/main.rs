use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use awgraph::artifacts::{ArtifactReport, DownloadSource, LookupMode};
use awgraph::config::Config;
use awgraph::manifest::{parse_manifest_file, Compilation};

#[derive(Parser)]
#[command(name = "awgraph")]
#[command(about = "Compile job manifests into GitHub Actions job graphs", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/awgraph/config.toml)
    #[arg(short, long, global = true, env = "AWGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a manifest and print its `jobs:` block
    Compile {
        /// Path to job manifest YAML file
        file: String,
        /// Output file path (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the job execution order
    Order {
        /// Path to job manifest YAML file
        file: String,
    },
    /// Print the job dependency tree
    Graph {
        /// Path to job manifest YAML file
        file: String,
    },
    /// Validate job dependencies, steps and artifact flow
    Validate {
        /// Path to job manifest YAML file
        file: String,
        /// Fail on unresolved artifacts and ignore producers outside `needs`
        #[arg(long)]
        strict: bool,
    },
    /// Show where every downloaded file ends up
    Artifacts {
        /// Path to job manifest YAML file
        file: String,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so rendered YAML on stdout stays clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "awgraph=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    match cli.command {
        Commands::Compile { file, output } => cmd_compile(&config, &file, output.as_deref())?,
        Commands::Order { file } => cmd_order(&config, &file)?,
        Commands::Graph { file } => cmd_graph(&config, &file)?,
        Commands::Validate { file, strict } => cmd_validate(&config, &file, strict)?,
        Commands::Artifacts { file } => cmd_artifacts(&config, &file)?,
        Commands::Completions { shell } => cmd_completions(shell)?,
    }

    Ok(())
}

/// Shell completion variants
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CompletionShell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::PowerShell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Generate shell completions
fn cmd_completions(shell: CompletionShell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let shell: Shell = shell.into();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}

fn load(config: &Config, file: &str, lookup: LookupMode) -> anyhow::Result<Compilation> {
    let path = Path::new(file);
    if !path.exists() {
        anyhow::bail!("File not found: {}", file);
    }

    let manifest = parse_manifest_file(path)?;
    Ok(Compilation::from_manifest(
        &manifest,
        config.render_options(),
        lookup,
    )?)
}

/// Run every check, flagging compiler bugs as untrusted output.
fn validate(compilation: &Compilation) -> anyhow::Result<ArtifactReport> {
    match compilation.validate() {
        Ok(report) => Ok(report),
        Err(e) if e.is_internal() => {
            anyhow::bail!("internal compiler error, output cannot be trusted: {}", e)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &ArtifactReport) {
    for failure in &report.failures {
        warn!(job = %failure.job, "{}", failure.message);
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_compile(config: &Config, file: &str, output: Option<&str>) -> anyhow::Result<()> {
    let compilation = load(config, file, config.artifacts.lookup)?;

    let report = validate(&compilation)?;
    if config.artifacts.fail_on_unresolved {
        report.into_result()?;
    } else {
        print_report(&report);
    }

    let yaml = compilation.jobs.render();
    match output {
        Some(path) => {
            let path = Path::new(path);

            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            std::fs::write(path, &yaml)?;
            info!(jobs = compilation.jobs.len(), path = %path.display(), "Wrote jobs block");
        }
        None => print!("{}", yaml),
    }

    Ok(())
}

fn cmd_order(config: &Config, file: &str) -> anyhow::Result<()> {
    let compilation = load(config, file, config.artifacts.lookup)?;
    let order = compilation.jobs.topological_order()?;

    println!("Execution order:");
    println!();
    for (i, name) in order.iter().enumerate() {
        let needs = compilation
            .jobs
            .job(name)
            .map(|job| job.needs.join(", "))
            .unwrap_or_default();
        if needs.is_empty() {
            println!("  {}. {}", i + 1, name);
        } else {
            println!("  {}. {}  (needs: {})", i + 1, name, needs);
        }
    }

    Ok(())
}

fn cmd_graph(config: &Config, file: &str) -> anyhow::Result<()> {
    let compilation = load(config, file, config.artifacts.lookup)?;
    compilation.jobs.validate_dependencies()?;

    println!("Dependency graph:");
    println!();
    println!("{}", compilation.jobs.to_text());

    Ok(())
}

fn cmd_validate(config: &Config, file: &str, strict: bool) -> anyhow::Result<()> {
    let lookup = if strict {
        LookupMode::Strict
    } else {
        config.artifacts.lookup
    };
    let compilation = load(config, file, lookup)?;

    let report = validate(&compilation)?;

    println!("✓ Job graph is valid");
    println!();
    println!("  Jobs: {}", compilation.jobs.len());
    println!("  Downloads: {}", compilation.artifacts.downloads().count());

    if report.is_empty() {
        println!("  Artifacts: all downloads resolved");
        return Ok(());
    }

    if strict || config.artifacts.fail_on_unresolved {
        report.into_result()?;
    } else {
        println!("  Artifacts: {} unresolved download(s)", report.len());
        print_report(&report);
    }

    Ok(())
}

fn cmd_artifacts(config: &Config, file: &str) -> anyhow::Result<()> {
    let compilation = load(config, file, config.artifacts.lookup)?;

    let mut any = false;
    for download in compilation.artifacts.downloads() {
        any = true;
        let (kind, selector) = match &download.source {
            DownloadSource::Name(name) => ("name", name.as_str()),
            DownloadSource::Pattern {
                pattern,
                merge_multiple: true,
            } => ("pattern, merged", pattern.as_str()),
            DownloadSource::Pattern { pattern, .. } => ("pattern", pattern.as_str()),
        };
        println!(
            "{} <- {} ({}) into {}",
            download.job_name, selector, kind, download.path
        );

        let plan = compilation.artifacts.plan_download(download);
        if plan.is_empty() {
            println!("  (unresolved)");
        }
        for file in plan {
            println!(
                "  {} [{}@{}] -> {}",
                file.original, file.artifact, file.source_job, file.local
            );
        }
    }

    if !any {
        println!("No artifact downloads found.");
    }

    Ok(())
}
