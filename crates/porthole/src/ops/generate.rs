use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use crossbeam_channel::unbounded;

use porthole_driver::{GenerationSession, SessionOutcome};
use porthole_engine::{EngineInput, SignatureEngine};
use porthole_files::{all_project_file_paths, ProjectFile};
use porthole_paths::{DirPath, ProjectFilePath, MODULE_FILE_EXTENSION};
use porthole_project::{ElmConfig, SUPPORTED_ELM_VERSIONS};

use crate::ExitStatus;

/// Suffix required of the output path; declarations live in `.d.ts` files.
const DECLARATION_FILE_SUFFIX: &str = ".d.ts";

#[derive(clap::Args)]
#[group(skip)] // the top-level `Args` already claims the implicit group name
pub struct Args {
    /// Elm module files to generate declarations for
    #[clap(value_name = "MODULE")]
    modules: Vec<String>,

    /// Path of the declaration file to write
    #[clap(long, value_name = "PATH")]
    output: Option<String>,

    /// Namespace to use in the declarations instead of the module name
    #[clap(long = "tsModule", value_name = "NAME")]
    ts_module: Option<String>,
}

impl Args {
    /// True when the invocation carries no arguments at all.
    pub(crate) fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.output.is_none() && self.ts_module.is_none()
    }
}

/// This function is invoked when the executable is run with module
/// arguments, indicating that a user requested declarations for a project
/// in the current directory.
pub fn generate(args: Args) -> Result<ExitStatus, anyhow::Error> {
    log::trace!("starting declaration generation");

    let output = validate_args(&args)?;

    let current_dir = env::current_dir().expect("could not determine current working directory");
    let config = ElmConfig::from_dir(&current_dir)?;
    if !config.is_supported_version() {
        bail!(
            "Elm version `{}` is not supported; supported versions are {}",
            config.elm_version(),
            SUPPORTED_ELM_VERSIONS.join(" and ")
        );
    }
    log::info!("project declares Elm {}", config.elm_version());

    let source_directories = config.source_dir_paths();
    let entry_modules = resolve_entry_modules(&args.modules, &source_directories)?;
    let project_files = all_project_file_paths(&source_directories)
        .into_iter()
        .map(ProjectFile::unloaded)
        .collect();

    let (engine_sender, engine_receiver) = unbounded();
    let engine = SignatureEngine::new(Box::new(move |message| {
        engine_sender
            .send(message)
            .expect("engine message receiver dropped");
    }));

    let (terminate_sender, terminate_receiver) = unbounded();
    if let Err(error) = ctrlc::set_handler(move || {
        let _ = terminate_sender.send(());
    }) {
        log::warn!("could not install the termination handler: {error}");
    }

    let session = GenerationSession::new(
        Box::new(engine),
        engine_receiver,
        terminate_receiver,
        &output,
    );
    let outcome = session.run(EngineInput {
        entry_modules,
        project_files,
        ts_module: args.ts_module,
    })?;

    match outcome {
        SessionOutcome::Written { output } => {
            log::info!("wrote declarations to `{}`", output.display());
            Ok(ExitStatus::Success)
        }
        SessionOutcome::ErrorReported(message) => {
            eprintln!("{message}");
            Ok(ExitStatus::Error)
        }
        SessionOutcome::TerminatedEarly => {
            println!("Process terminated early, no output written.");
            Ok(ExitStatus::TerminatedEarly)
        }
    }
}

/// Checks the shape of the invocation: at least one module file with the
/// module extension, and an output path that names a declaration file.
fn validate_args(args: &Args) -> Result<PathBuf, anyhow::Error> {
    if args.modules.is_empty() {
        bail!("no input modules; pass at least one .{MODULE_FILE_EXTENSION} file");
    }
    for module in &args.modules {
        if !is_module_file(module) {
            bail!("`{module}` is not an .{MODULE_FILE_EXTENSION} module file");
        }
    }
    let output = args.output.as_deref().ok_or_else(|| {
        anyhow!("missing required flag --output=<path to {DECLARATION_FILE_SUFFIX} file>")
    })?;
    if !output.ends_with(DECLARATION_FILE_SUFFIX) {
        bail!("`{output}` is not a {DECLARATION_FILE_SUFFIX} declaration file");
    }
    Ok(PathBuf::from(output))
}

fn is_module_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .map_or(false, |extension| extension == MODULE_FILE_EXTENSION)
}

/// Resolves each module argument to its identity in the project and checks
/// that the file exists.
fn resolve_entry_modules(
    modules: &[String],
    source_directories: &[DirPath],
) -> Result<Vec<ProjectFilePath>, anyhow::Error> {
    modules
        .iter()
        .map(|module| {
            let path = ProjectFilePath::resolve(module, source_directories)
                .ok_or_else(|| anyhow!("`{module}` does not name a module file"))?;
            let file = path.to_file_path();
            if !file.is_file() {
                bail!("could not find the module file `{}`", file.display());
            }
            Ok(path)
        })
        .collect()
}
