//! FireMarshal CLI
//!
//! Entry point for the `marshal` command-line tool.

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use fire_marshal::config::{
    default_user_config_path, ConfigError, EffectiveConfig, MarshalConfig, PROJECT_CONFIG_FILE,
};
use fire_marshal::handlers::{
    BuildHandler, CleanHandler, CommandHandler, InstallHandler, LaunchHandler, TestHandler,
};
use fire_marshal::ops::{
    BuildTargets, FireSimInstaller, RefTester, ScriptBuilder, SimLauncher, SimSettings, Simulator,
    TestOptions,
};
use fire_marshal::batch::check_warnings;
use fire_marshal::{
    BatchLog, BatchProcessor, BatchSummary, Command, ConfigCatalog, ExitCode, FatalError, SearchPath,
};
use tracing::{debug, error, info, warn};

/// Name of the summary written next to the batch log after `test`
const TEST_SUMMARY_FILE: &str = "summary.json";

#[derive(Parser)]
#[command(name = "marshal")]
#[command(about = "Build, launch, test and install simulation workloads", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Extra directory to search for workloads
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// Print debug output on the console
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Treat warnings as errors
    #[arg(long, global = true)]
    werr: bool,

    /// Boot with the root filesystem embedded in the binary (alias of --no-disk)
    #[arg(long, short = 'i', global = true)]
    initramfs: bool,

    /// Boot with the root filesystem embedded in the binary
    #[arg(long = "no-disk", short = 'd', global = true)]
    no_disk: bool,

    /// Project config file (default: ./marshal-config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build workload artifacts
    Build {
        /// Only build the boot binary
        #[arg(long = "binOnly", short = 'B')]
        bin_only: bool,

        /// Only build the disk image
        #[arg(long = "imgOnly", short = 'I')]
        img_only: bool,

        /// Workload configuration files
        #[arg(required = true)]
        configs: Vec<PathBuf>,
    },

    /// Boot a workload in a functional simulator
    Launch {
        /// Use spike instead of QEMU
        #[arg(long, short = 's')]
        spike: bool,

        /// Launch the named job (repeatable)
        #[arg(long = "job", short = 'j')]
        jobs: Vec<String>,

        /// Launch every job of the workload
        #[arg(long, short = 'a')]
        all: bool,

        /// Workload configuration file
        config: PathBuf,
    },

    /// Build, launch and compare against reference output
    Test {
        /// Use spike instead of QEMU
        #[arg(long, short = 's')]
        spike: bool,

        /// Compare this existing output directory instead of running
        #[arg(long, short = 'm')]
        manual: Option<PathBuf>,

        /// Workload configuration files
        #[arg(required = true)]
        configs: Vec<PathBuf>,
    },

    /// Delete workload artifacts
    Clean {
        /// Workload configuration files
        #[arg(required = true)]
        configs: Vec<PathBuf>,
    },

    /// Publish built workloads to a deployment target
    Install {
        /// Install target (default: the configured default-target)
        #[arg(long, short = 't')]
        target: Option<String>,

        /// Workload configuration files
        #[arg(required = true)]
        configs: Vec<PathBuf>,
    },
}

impl Commands {
    fn command(&self) -> Command {
        match self {
            Commands::Build { .. } => Command::Build,
            Commands::Launch { .. } => Command::Launch,
            Commands::Test { .. } => Command::Test,
            Commands::Clean { .. } => Command::Clean,
            Commands::Install { .. } => Command::Install,
        }
    }

    fn inputs(&self) -> Vec<PathBuf> {
        match self {
            Commands::Launch { config, .. } => vec![config.clone()],
            Commands::Build { configs, .. }
            | Commands::Test { configs, .. }
            | Commands::Clean { configs }
            | Commands::Install { configs, .. } => configs.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let cwd = match env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Cannot determine current directory: {}", e);
            process::exit(1);
        }
    };

    let (effective, settings) = match load_config(&cli.global, &cwd) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(e.exit_code().as_i32());
        }
    };

    let command = cli.command.command();
    let log = match BatchLog::create(&settings.log_dir, command, cli.global.verbose) {
        Ok(log) => log,
        Err(source) => {
            let e = FatalError::Logging {
                path: settings.log_dir.clone(),
                source,
            };
            eprintln!("{}", e);
            process::exit(e.exit_code().as_i32());
        }
    };

    let code = tracing::dispatcher::with_default(&log.dispatch(), || {
        for source in &effective.sources {
            debug!(
                "config layer {:?}: {}",
                source.origin,
                source.path.as_deref().unwrap_or("-")
            );
        }

        match run(&cli, &settings, &log, &cwd) {
            Ok(code) => code,
            Err(e) => {
                error!("{}", e);
                error!("Log available at: {}", log.path().display());
                e.exit_code()
            }
        }
    });

    // flush the background log writers before exiting
    drop(log);
    process::exit(code.as_i32());
}

/// Merge the configuration layers and anchor relative paths at `cwd`.
fn load_config(global: &GlobalArgs, cwd: &Path) -> Result<(EffectiveConfig, MarshalConfig), FatalError> {
    let project = global
        .config
        .clone()
        .unwrap_or_else(|| cwd.join(PROJECT_CONFIG_FILE));
    if global.config.is_some() && !project.exists() {
        return Err(FatalError::Config(ConfigError::IoError(format!(
            "config file {} does not exist",
            project.display()
        ))));
    }

    let cli_overrides = global.werr.then(|| serde_json::json!({ "werr": true }));
    let user = default_user_config_path();
    let effective = EffectiveConfig::build(user.as_deref(), Some(&project), cli_overrides)?;
    let settings = effective.settings()?.anchored(cwd);
    Ok((effective, settings))
}

fn run(cli: &Cli, settings: &MarshalConfig, log: &BatchLog, cwd: &Path) -> Result<ExitCode, FatalError> {
    let command = cli.command.command();
    let inputs: Vec<PathBuf> = cli
        .command
        .inputs()
        .into_iter()
        .map(|p| if p.is_relative() { cwd.join(p) } else { p })
        .collect();
    let workdir = cli
        .global
        .workdir
        .as_ref()
        .map(|p| if p.is_relative() { cwd.join(p) } else { p.clone() });

    let search = SearchPath::resolve(
        &settings.builtin_workload_dir(),
        &settings.workload_dirs,
        workdir.as_deref(),
        &inputs,
    );
    debug!("Workload search path: {:?}", search.iter().collect::<Vec<_>>());

    let catalog = ConfigCatalog::load(&search, &settings.image_dir)?;
    check_warnings(&catalog, settings.werr)?;
    debug!("Loaded {} workloads", catalog.len());

    let mut handler = make_handler(&cli.command, settings, cli.global.verbose);
    let nodisk = cli.global.initramfs || cli.global.no_disk;
    let result = BatchProcessor::new(&catalog, log)
        .nodisk(nodisk)
        .run(&inputs, handler.as_mut())?;

    let summary = BatchSummary::new(command, result, log.path().to_path_buf());
    if command == Command::Test {
        let path = log.dir().join(TEST_SUMMARY_FILE);
        if let Err(e) = summary.write_to_file(&path) {
            warn!("Failed to write {}: {}", path.display(), e);
        }
    }

    info!("Log available at: {}", log.path().display());
    if summary.exit_code().is_success() {
        info!("{}", summary.human_summary);
    } else {
        error!("{}", summary.human_summary);
    }
    Ok(summary.exit_code())
}

fn make_handler(command: &Commands, settings: &MarshalConfig, verbose: bool) -> Box<dyn CommandHandler> {
    let launcher = || SimLauncher::new(SimSettings::from_config(settings));

    match command {
        Commands::Build { bin_only, img_only, .. } => Box::new(BuildHandler::new(
            ScriptBuilder::new(),
            BuildTargets::from_flags(*bin_only, *img_only),
        )),
        Commands::Launch { spike, jobs, all, .. } => Box::new(LaunchHandler::new(
            launcher(),
            Simulator::from_spike_flag(*spike),
            *all,
            jobs.clone(),
        )),
        Commands::Test { spike, manual, .. } => Box::new(TestHandler::new(
            RefTester::new(ScriptBuilder::new(), launcher()),
            TestOptions {
                simulator: Simulator::from_spike_flag(*spike),
                verbose,
                manual: manual.clone(),
            },
        )),
        Commands::Clean { .. } => Box::new(CleanHandler::new()),
        Commands::Install { target, .. } => Box::new(InstallHandler::new(
            FireSimInstaller::new(settings.install_targets.clone()),
            target.clone().unwrap_or_else(|| settings.default_target.clone()),
        )),
    }
}
