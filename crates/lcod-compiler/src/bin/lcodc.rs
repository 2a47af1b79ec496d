//! LCOD compiler CLI

use std::path::PathBuf;
use std::process;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use lcod_compiler::{Compiler, CompileOptions, CompileOutput, InstrumentationMode};

#[derive(Parser, Debug)]
#[command(name = "lcodc")]
#[command(about = "LCOD compiler - transforms LCOD component trees into Svelte components")]
#[command(version)]
struct Args {
    /// Input LCOD document
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Path components are resolved from (defaults to FILE)
    #[arg(long, value_name = "PATH")]
    document_path: Option<PathBuf>,

    /// Boundary markers to emit around each node
    #[arg(long, value_enum, default_value_t = InstrumentationMode::None)]
    instrument: InstrumentationMode,

    /// Mirror the output under the mirror directory
    #[arg(long)]
    persist: bool,

    /// Root of the mirror tree
    #[arg(long, value_name = "DIR")]
    mirror_dir: Option<PathBuf>,

    /// Write the generated component here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Compilation failed: {:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut options = CompileOptions::new()
        .persist_output(args.persist)
        .instrumentation(args.instrument);

    if let Some(dir) = args.mirror_dir {
        options = options.mirror_dir(dir);
    }

    let compiler = Compiler::new(options);

    let output = match &args.document_path {
        Some(document_path) => {
            let source = tokio::fs::read_to_string(&args.input).await?;
            compiler.compile(&source, document_path).await?
        }
        None => compiler.compile_file(&args.input).await?,
    };

    let CompileOutput { source_file, code, imports, assigned_ids, mirror } = output;

    if args.verbose {
        eprintln!("Compilation successful!");
        eprintln!("  Source: {}", source_file.display());
        eprintln!("  Generated {} bytes of Svelte", code.len());
        eprintln!("  Imports: {}", imports.len());
        for (name, path) in &imports {
            eprintln!("    {} -> {}", name, path.display());
        }
        if !assigned_ids.is_empty() {
            eprintln!("  Assigned ids:");
            for assigned in &assigned_ids {
                eprintln!("    {} = {}", assigned.path, assigned.id);
            }
        }
    }

    match &args.output {
        Some(path) => tokio::fs::write(path, &code).await?,
        None => print!("{}", code),
    }

    // The process would otherwise exit before the detached write lands.
    if let Some(mirror) = mirror {
        mirror.await?;
    }

    Ok(())
}
