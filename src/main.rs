use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use patch_runner::config::{load_from_path, PatchScript};
use patch_runner::presets;
use patch_runner::{PatchRunner, RuleStatus, RunReport};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "patch-runner")]
#[command(about = "Apply ordered literal and regex substitutions to a file", long_about = None)]
#[command(version)]
struct Cli {
    /// Log rule-level diagnostics to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patch scripts and overwrite their targets
    Apply {
        #[command(flatten)]
        selection: Selection,

        /// Fail (without writing) if any rule matches nothing
        #[arg(long)]
        strict: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Show what patch scripts would change without writing anything
    Check {
        #[command(flatten)]
        selection: Selection,

        /// Fail if any rule matches nothing
        #[arg(long)]
        strict: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// List built-in patch scripts and those found in the workspace
    List {
        /// Workspace root (defaults to PATCH_RUNNER_WORKSPACE, then the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Print the TOML source of a built-in patch script
    Show {
        /// Built-in script name
        name: String,
    },
}

#[derive(Args)]
struct Selection {
    /// Workspace root that relative targets resolve against
    /// (defaults to PATCH_RUNNER_WORKSPACE, then the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Patch script file to run (otherwise runs every script in patches/)
    #[arg(short, long, conflicts_with = "builtin")]
    script: Option<PathBuf>,

    /// Built-in patch script to run
    #[arg(short, long)]
    builtin: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            selection,
            strict,
            diff,
        } => cmd_run(selection, strict, diff, false),

        Commands::Check {
            selection,
            strict,
            diff,
        } => cmd_run(selection, strict, diff, true),

        Commands::List { workspace } => cmd_list(workspace),

        Commands::Show { name } => cmd_show(&name),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Resolve the workspace root.
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. PATCH_RUNNER_WORKSPACE environment variable
/// 3. Current directory
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return Ok(path.canonicalize()?);
    }

    if let Ok(env_path) = env::var("PATCH_RUNNER_WORKSPACE") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: PATCH_RUNNER_WORKSPACE is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    Ok(env::current_dir()?)
}

/// Find `.toml` patch scripts in `<workspace>/patches`, then `./patches`.
fn discover_patch_files(workspace: &Path) -> Result<Vec<PathBuf>> {
    let candidate_dirs = std::iter::once(workspace.join("patches"))
        .chain(env::current_dir().ok().map(|cwd| cwd.join("patches")));

    for patches_dir in candidate_dirs {
        if !patches_dir.is_dir() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&patches_dir).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                files.push(entry.path().to_path_buf());
            }
        }
        files.sort();

        if !files.is_empty() {
            return Ok(files);
        }
    }

    anyhow::bail!(
        "No .toml patch scripts found in {}/patches or ./patches (use --script or --builtin)",
        workspace.display()
    )
}

/// Load the scripts a selection names, labelled for display.
fn load_selection(selection: &Selection, workspace: &Path) -> Result<Vec<(String, PatchScript)>> {
    if let Some(path) = &selection.script {
        return Ok(vec![(path.display().to_string(), load_from_path(path)?)]);
    }

    if let Some(name) = &selection.builtin {
        let Some(preset) = presets::find(name) else {
            let known: Vec<&str> = presets::all().iter().map(|p| p.name).collect();
            anyhow::bail!(
                "Unknown built-in script '{}' (available: {})",
                name,
                known.join(", ")
            );
        };
        return Ok(vec![(format!("built-in {}", preset.name), preset.load()?)]);
    }

    discover_patch_files(workspace)?
        .into_iter()
        .map(|path| -> Result<(String, PatchScript)> {
            let script = load_from_path(&path)?;
            Ok((path.display().to_string(), script))
        })
        .collect()
}

/// Helper: Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, patched: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, patched);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
    println!();
}

fn print_outcomes(report: &RunReport) {
    for outcome in &report.outcomes {
        let label = outcome.description.as_deref().unwrap_or("");
        match &outcome.status {
            RuleStatus::Applied => {
                println!(
                    "  {} {}: {} match(es) replaced {}",
                    "✓".green(),
                    outcome.id,
                    outcome.count,
                    label.dimmed()
                );
            }
            RuleStatus::NoMatch { hint } => {
                println!(
                    "  {} {}: no match, left unchanged {}",
                    "⊙".yellow(),
                    outcome.id,
                    label.dimmed()
                );
                if let Some(hint) = hint {
                    println!(
                        "    {}",
                        format!(
                            "closest line {} ({:.0}% similar): {}",
                            hint.line,
                            hint.similarity * 100.0,
                            hint.text
                        )
                        .dimmed()
                    );
                }
            }
            RuleStatus::CountMismatch { expected, found } => {
                eprintln!(
                    "  {} {}: expected {} match(es), found {}",
                    "✗".red(),
                    outcome.id,
                    expected,
                    found
                );
            }
        }
    }
}

fn cmd_run(selection: Selection, strict: bool, show_diff: bool, dry_run: bool) -> Result<()> {
    let workspace = resolve_workspace(selection.workspace.clone())?;
    let scripts = load_selection(&selection, &workspace)?;

    println!("Workspace: {}", workspace.display());
    if dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
    }
    println!();

    let mut total_written = 0;
    let mut total_unchanged = 0;
    let mut total_failed = 0;

    for (label, script) in scripts {
        println!("Running {}...", label);

        let runner = PatchRunner::from_script(&script, &workspace)?;
        println!("  Target: {}", runner.target().display());

        let mut report = match runner.plan() {
            Ok(report) => report,
            Err(e) => {
                eprintln!("  {} {}", "✗".red(), e);
                total_failed += 1;
                println!();
                continue;
            }
        };

        print_outcomes(&report);

        if show_diff && report.changed() {
            display_diff(&report.target, &report.original, &report.patched);
        }

        if let Err(e) = report.verify(strict) {
            eprintln!("  {} {}", "✗".red(), e);
            eprintln!("  {}", "Target left unchanged".red());
            total_failed += 1;
            println!();
            continue;
        }

        if dry_run {
            if report.changed() {
                println!("  {} Would write {}", "✓".green(), report.target.display());
            } else {
                println!("  {} No changes", "⊙".yellow());
            }
            total_unchanged += usize::from(!report.changed());
            total_written += usize::from(report.changed());
            println!();
            continue;
        }

        match report.commit() {
            Ok(true) => {
                println!("  {} {} updated", "✓".green(), report.target.display());
                for note in &script.meta.notes {
                    println!("    - {}", note);
                }
                total_written += 1;
            }
            Ok(false) => {
                println!("  {} No changes, target left as-is", "⊙".yellow());
                total_unchanged += 1;
            }
            Err(e) => {
                eprintln!("  {} {}", "✗".red(), e);
                total_failed += 1;
            }
        }

        println!();
    }

    println!("{}", "Summary:".bold());
    let written_label = if dry_run { "would be written" } else { "written" };
    println!("  {} {}", format!("{}", total_written).green(), written_label);
    println!("  {} unchanged", format!("{}", total_unchanged).yellow());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(workspace: Option<PathBuf>) -> Result<()> {
    println!("{}", "Built-in scripts:".bold());
    for preset in presets::all() {
        let script = preset.load()?;
        println!(
            "  {} -> {} ({} rules)",
            preset.name.green(),
            script.meta.target,
            script.rules.len()
        );
        if let Some(description) = &script.meta.description {
            println!("    {}", description.dimmed());
        }
    }

    let workspace = resolve_workspace(workspace)?;
    println!();
    println!("{}", "Workspace scripts:".bold());
    match discover_patch_files(&workspace) {
        Ok(files) => {
            for file in files {
                match load_from_path(&file) {
                    Ok(script) => println!(
                        "  {} -> {} ({} rules)",
                        file.display(),
                        script.meta.target,
                        script.rules.len()
                    ),
                    Err(e) => eprintln!("  {} {}", "✗".red(), e),
                }
            }
        }
        Err(_) => println!("  {}", "none".dimmed()),
    }

    Ok(())
}

fn cmd_show(name: &str) -> Result<()> {
    match presets::find(name) {
        Some(preset) => {
            print!("{}", preset.source);
            Ok(())
        }
        None => anyhow::bail!("Unknown built-in script '{}'", name),
    }
}
