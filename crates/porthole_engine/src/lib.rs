//! The boundary between the host process and a declaration engine.
//!
//! An engine turns Elm modules into TypeScript declarations. It never
//! touches the filesystem itself: the host starts it with an
//! [`EngineInput`], answers its file requests, and receives the finished
//! declaration text (or an error) back through a message sink.

mod signature;

pub use signature::SignatureEngine;

use porthole_files::ProjectFile;
use porthole_paths::ProjectFilePath;

/// Everything an engine is given when it starts.
#[derive(Debug, Clone)]
pub struct EngineInput {
    /// The modules declarations are generated for.
    pub entry_modules: Vec<ProjectFilePath>,

    /// Every module file known to the project. Contents are `None` for
    /// files that have not been read; the engine requests those through
    /// [`EngineMessage::FetchFile`] when it needs them.
    pub project_files: Vec<ProjectFile>,

    /// Overrides the module name used in the generated declarations.
    pub ts_module: Option<String>,
}

/// A message sent from a running [`DeclarationEngine`] to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    /// The engine needs the contents of a project file to continue. The
    /// host answers through [`DeclarationEngine::file_fetched`]; at most
    /// one request is outstanding at any time.
    FetchFile(ProjectFilePath),

    /// Generation succeeded and this declaration text is ready to be
    /// written. No further messages follow.
    WriteFile(String),

    /// Generation failed with a message for the user. No further messages
    /// follow.
    ReportError(String),
}

impl EngineMessage {
    /// Returns true for the messages that end a run.
    pub fn is_terminal(&self) -> bool {
        match self {
            EngineMessage::FetchFile(_) => false,
            EngineMessage::WriteFile(_) | EngineMessage::ReportError(_) => true,
        }
    }
}

pub type Sender = Box<dyn Fn(EngineMessage) + Send>;

/// A declaration engine as seen by the host.
///
/// The engine communicates exclusively through the [`Sender`] it was
/// constructed with: after [`DeclarationEngine::start`] it emits any number
/// of `FetchFile` requests, each answered before the next arrives, and
/// exactly one terminal message.
pub trait DeclarationEngine {
    /// Starts generation over the given input.
    fn start(&mut self, input: EngineInput);

    /// Hands the engine the contents of the file it asked for. The file
    /// carries the identity of the request it answers.
    fn file_fetched(&mut self, file: ProjectFile);
}
