//! oxidized-xenon - Xbox 360 recompilation toolkit
//!
//! Thin CLI over the codegen crate: `codegen` drives the emitter from a
//! project config plus the analysis listing the external analyzer wrote,
//! `init` scaffolds a project, `recompile-tests` prepares per-function
//! test inputs. The PPC disassembler is an external collaborator injected
//! through the library API; the CLI wires a null decoder so the pipeline
//! stays runnable for layout and idempotence checks.

mod analysis;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ox_codegen::{Disassembler, Instruction, Recompiler};
use ox_core::config::{CodegenConfig, LogLevel};

#[derive(Parser)]
#[command(name = "oxidized-xenon", about = "Xbox 360 recompilation toolkit")]
struct Cli {
    /// Generate output even if validation errors occur
    #[arg(long, global = true)]
    force: bool,

    /// Enable generation of SEH exception handler code
    #[arg(long, global = true)]
    enable_exception_handlers: bool,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a project config and generate C++ code
    Codegen {
        /// Path to the project config.toml
        config: PathBuf,
    },
    /// Initialize a new project
    Init {
        #[arg(long)]
        app_name: String,
        #[arg(long)]
        app_root: PathBuf,
    },
    /// Prepare single-function recompiler test inputs
    RecompileTests {
        /// Directory containing linked .bin files
        #[arg(long)]
        bin_dir: PathBuf,
        /// Directory containing .s assembly source files
        #[arg(long)]
        asm_dir: PathBuf,
        /// Output path for the generated test manifest
        #[arg(long)]
        output: PathBuf,
    },
}

/// Stand-in decoder: every word is left as a commented raw value. The
/// integrating project supplies the real disassembler through
/// [`Recompiler::new`].
struct NullDisassembler;

impl Disassembler for NullDisassembler {
    fn disassemble(&self, _word: u32, _addr: u32) -> Option<Instruction> {
        None
    }
}

fn parse_log_level(raw: &str) -> LogLevel {
    match raw {
        "off" => LogLevel::Off,
        "error" => LogLevel::Error,
        "warn" => LogLevel::Warn,
        "debug" => LogLevel::Debug,
        "trace" => LogLevel::Trace,
        _ => LogLevel::Info,
    }
}

fn main() {
    let cli = Cli::parse();
    ox_core::logging::init(parse_log_level(&cli.log_level), cli.log_file.as_deref());

    tracing::info!("oxidized-xenon v0.1.0 - Xbox 360 recompilation toolkit");

    let result = match &cli.command {
        Command::Codegen { config } => run_codegen(config, &cli),
        Command::Init { app_name, app_root } => run_init(app_name, app_root),
        Command::RecompileTests {
            bin_dir,
            asm_dir,
            output,
        } => run_recompile_tests(bin_dir, asm_dir, output),
    };

    match result {
        Ok(()) => {
            tracing::info!("Operation completed successfully");
        }
        Err(err) => {
            tracing::error!("Operation failed: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run_codegen(config_path: &PathBuf, cli: &Cli) -> Result<()> {
    let mut config = CodegenConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if cli.enable_exception_handlers {
        config.generate_exception_handlers = true;
    }

    let base_dir = config_path
        .parent()
        .unwrap_or(std::path::Path::new("."))
        .to_path_buf();
    let analysis = analysis::AnalysisListing::load(config_path)
        .with_context(|| format!("loading analysis listing from {}", config_path.display()))?;

    let image = analysis.load_image(&base_dir)?;
    let graph = analysis.build_graph();
    let entry_point = analysis.entry_point;

    // Output paths in the config are relative to the config file.
    let out_dir = base_dir.join(&config.out_directory_path);
    config.out_directory_path = out_dir.display().to_string();

    let mut recompiler =
        Recompiler::new(config, graph, image, entry_point, Box::new(NullDisassembler));
    recompiler
        .recompile_all(cli.force)
        .context("code generation failed")?;
    Ok(())
}

fn run_init(app_name: &str, app_root: &PathBuf) -> Result<()> {
    if app_name.is_empty() {
        bail!("--app-name is required");
    }
    let project_dir = app_root.join(app_name);
    std::fs::create_dir_all(project_dir.join("gen"))
        .with_context(|| format!("creating {}", project_dir.display()))?;

    let config_path = project_dir.join("config.toml");
    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }
    let skeleton = format!(
        "project_name = \"{app_name}\"\n\
         out_directory_path = \"gen\"\n\
         \n\
         image_path = \"{app_name}.xex.bin\"\n\
         image_base = 0x82000000\n\
         entry_point = 0x82000000\n\
         \n\
         [[section]]\n\
         base = 0x82000000\n\
         size = 0x1000\n\
         executable = true\n"
    );
    std::fs::write(&config_path, skeleton)
        .with_context(|| format!("writing {}", config_path.display()))?;
    tracing::info!("Initialized project at {}", project_dir.display());
    Ok(())
}

fn run_recompile_tests(bin_dir: &PathBuf, asm_dir: &PathBuf, output: &PathBuf) -> Result<()> {
    if !bin_dir.is_dir() {
        bail!("--bin-dir {} is not a directory", bin_dir.display());
    }
    if !asm_dir.is_dir() {
        bail!("--asm-dir {} is not a directory", asm_dir.display());
    }

    // Pair each assembly source with its linked binary; unmatched entries
    // are reported and skipped.
    let mut cases = Vec::new();
    for entry in std::fs::read_dir(asm_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("s") {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let bin = bin_dir.join(format!("{stem}.bin"));
        if bin.is_file() {
            cases.push((stem.to_string(), bin));
        } else {
            tracing::warn!("No linked binary for test '{}'", stem);
        }
    }
    cases.sort();

    let mut manifest = String::from("# Recompiler test manifest\n");
    for (name, bin) in &cases {
        manifest.push_str(&format!("{name} = \"{}\"\n", bin.display()));
    }
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, manifest)
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!("Prepared {} recompiler test cases", cases.len());
    Ok(())
}
