use anyhow::{bail, Context};
use blade_spa_compiler::config::CONFIG_FILE;
use blade_spa_compiler::{
    compile_batch, discover_views, write_outputs, CompileCache, Compiler, CompilerConfig,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blade-spa", about = "Compile Blade views into SPA view modules", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every view under the views directory
    Build {
        /// Config file (default: ./blade-spa.config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the views input directory
        #[arg(long)]
        views: Option<PathBuf>,

        /// Override the output directory
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,

        /// Recompile everything, ignoring the content-hash cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Compile one template and print the module to stdout
    Compile {
        file: PathBuf,

        /// View name, e.g. `web.home`
        #[arg(short, long)]
        name: String,

        /// Wrapper resources file
        #[arg(long)]
        wrapper: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            views,
            out,
            verbose,
            no_cache,
        } => {
            let config_path = config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
            let mut config = CompilerConfig::load(&config_path)
                .with_context(|| format!("loading {}", config_path.display()))?;
            if let Some(views) = views {
                config.views_input = views;
            }
            if let Some(out) = out {
                config.output_dir = out;
            }
            init_tracing(verbose || config.verbose);

            let files = discover_views(&config.views_input, &config.blade_pattern)
                .context("discovering views")?;
            tracing::info!(count = files.len(), "found views");

            let compiler = Compiler::from_wrapper_file(&config.wrapper_file);
            let cache = if no_cache {
                None
            } else {
                Some(CompileCache::new(&config.cache_dir).context("opening cache")?)
            };
            let report = compile_batch(&compiler, &config.views_input, &files, cache.as_ref());
            let modules: Vec<_> = report.modules().cloned().collect();
            let written = write_outputs(&config.output_dir, &modules, config.auto_create_dirs)
                .context("writing compiled views")?;
            tracing::info!(
                written = written.len(),
                succeeded = report.succeeded,
                failed = report.failed,
                "build finished"
            );
            if report.failed > 0 {
                bail!("{} view(s) failed to compile", report.failed);
            }
        }
        Commands::Compile {
            file,
            name,
            wrapper,
        } => {
            init_tracing(false);
            let source = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let compiler = match wrapper {
                Some(path) => Compiler::from_wrapper_file(path),
                None => Compiler::from_wrapper_file(CompilerConfig::default().wrapper_file),
            };
            println!("{}", compiler.compile(&source, &name));
        }
    }
    Ok(())
}
