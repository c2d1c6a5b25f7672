//! Runs a declaration engine to completion.
//!
//! A [`GenerationSession`] owns a connected engine and processes its
//! messages one at a time: file requests are answered from disk, and the
//! terminal message decides the [`SessionOutcome`]. External termination
//! requests (delivered over a channel, typically from a signal handler)
//! end the run early, with one exception: once the output write has
//! started it always runs to completion, so a half-written declaration
//! file is never left behind.

use std::fs;
use std::io;
use std::path::PathBuf;

use crossbeam_channel::{never, select, Receiver, RecvError, TryRecvError};

use porthole_engine::{DeclarationEngine, EngineInput, EngineMessage};
use porthole_files::read_project_file;
use porthole_paths::ProjectFilePath;

/// Lifecycle of a [`GenerationSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed but not started.
    Idle,
    /// Waiting on engine messages.
    Running,
    /// The output write is in progress; termination requests are ignored
    /// until it finishes.
    Writing,
    /// The engine reported a generation error.
    ErrorReported,
    /// The session is over.
    Terminated,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The declaration file was written.
    Written { output: PathBuf },
    /// The engine reported an error; nothing was written.
    ErrorReported(String),
    /// A termination request ended the run; nothing was written.
    TerminatedEarly,
}

/// An error that ends a session without a usable result.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The engine asked for a file the project does not have.
    #[error("module file `{request}` does not exist")]
    FetchMiss { request: ProjectFilePath },

    #[error("could not read module file `{request}`")]
    FetchFailed {
        request: ProjectFilePath,
        source: io::Error,
    },

    #[error("could not write declarations to `{}`", .output.display())]
    WriteFailure { output: PathBuf, source: io::Error },

    /// The engine emitted a second terminal message. One run produces one
    /// result; two means the engine broke its protocol.
    #[error("the declaration engine emitted more than one terminal message")]
    MultipleTerminalMessages,

    #[error("the declaration engine disconnected before finishing")]
    EngineDisconnected,
}

/// An event the session loop processes.
enum Event {
    Engine(EngineMessage),
    Terminate,
}

/// Outcome of handling a single event.
enum LoopState {
    Continue,
    Finished(SessionOutcome),
}

/// A single generation run: one engine, one output file, one result.
pub struct GenerationSession {
    engine: Box<dyn DeclarationEngine>,
    engine_receiver: Receiver<EngineMessage>,
    terminate_receiver: Option<Receiver<()>>,
    output: PathBuf,
    state: SessionState,
}

impl GenerationSession {
    /// Constructs a session around a connected engine.
    ///
    /// `engine_receiver` is the channel behind the sender the engine was
    /// constructed with; `terminate_receiver` delivers external
    /// termination requests.
    pub fn new(
        engine: Box<dyn DeclarationEngine>,
        engine_receiver: Receiver<EngineMessage>,
        terminate_receiver: Receiver<()>,
        output: impl Into<PathBuf>,
    ) -> GenerationSession {
        GenerationSession {
            engine,
            engine_receiver,
            terminate_receiver: Some(terminate_receiver),
            output: output.into(),
            state: SessionState::Idle,
        }
    }

    /// The state the session is currently in.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Starts the engine over `input` and processes its messages until it
    /// finishes, a termination request arrives, or an error ends the run.
    pub fn run(mut self, input: EngineInput) -> Result<SessionOutcome, SessionError> {
        log::trace!("starting declaration engine");
        self.state = SessionState::Running;
        self.engine.start(input);
        loop {
            let event = self.next_event()?;
            match self.handle_event(event)? {
                LoopState::Continue => {}
                LoopState::Finished(outcome) => return Ok(outcome),
            }
        }
    }

    /// Blocks until there is something to do. A termination request that
    /// is already pending wins over engine messages, so a run that was
    /// asked to stop cannot race its own engine to the finish line.
    fn next_event(&mut self) -> Result<Event, SessionError> {
        loop {
            if let Some(terminate) = &self.terminate_receiver {
                match terminate.try_recv() {
                    Ok(()) => return Ok(Event::Terminate),
                    Err(TryRecvError::Disconnected) => self.terminate_receiver = None,
                    Err(TryRecvError::Empty) => {}
                }
            }

            let never = never();
            let terminate = self.terminate_receiver.as_ref().unwrap_or(&never);
            select! {
                recv(self.engine_receiver) -> message => {
                    return match message {
                        Ok(message) => Ok(Event::Engine(message)),
                        Err(RecvError) => Err(SessionError::EngineDisconnected),
                    };
                }
                recv(terminate) -> message => {
                    if message.is_ok() {
                        return Ok(Event::Terminate);
                    }
                    // Disconnected: the next iteration drops the channel
                    // and falls back to waiting on the engine alone.
                }
            }
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<LoopState, SessionError> {
        match event {
            Event::Engine(EngineMessage::FetchFile(request)) => {
                self.handle_fetch(request)?;
                Ok(LoopState::Continue)
            }
            Event::Engine(EngineMessage::WriteFile(declarations)) => {
                self.handle_write(&declarations)
            }
            Event::Engine(EngineMessage::ReportError(message)) => {
                self.check_single_terminal()?;
                self.state = SessionState::ErrorReported;
                Ok(LoopState::Finished(SessionOutcome::ErrorReported(message)))
            }
            Event::Terminate => {
                if self.state == SessionState::Writing {
                    // The write always runs to completion; stopping now
                    // would leave a torn output file behind.
                    log::trace!("ignoring termination request during write");
                    Ok(LoopState::Continue)
                } else {
                    self.state = SessionState::Terminated;
                    Ok(LoopState::Finished(SessionOutcome::TerminatedEarly))
                }
            }
        }
    }

    /// Answers a fetch request from disk. The reply carries the exact
    /// identity that was requested, so the engine matches it structurally.
    fn handle_fetch(&mut self, request: ProjectFilePath) -> Result<(), SessionError> {
        log::trace!("engine requested `{request}`");
        let file = match read_project_file(&request) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(SessionError::FetchMiss { request });
            }
            Err(source) => return Err(SessionError::FetchFailed { request, source }),
        };
        self.engine.file_fetched(file);
        Ok(())
    }

    fn handle_write(&mut self, declarations: &str) -> Result<LoopState, SessionError> {
        self.check_single_terminal()?;
        self.state = SessionState::Writing;
        log::trace!("writing declarations to `{}`", self.output.display());
        self.write_declarations(declarations)?;
        self.state = SessionState::Terminated;
        Ok(LoopState::Finished(SessionOutcome::Written {
            output: self.output.clone(),
        }))
    }

    /// Creates the output's parent directory as needed and writes the
    /// declaration file.
    fn write_declarations(&self, declarations: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| SessionError::WriteFailure {
                    output: self.output.clone(),
                    source,
                })?;
            }
        }
        fs::write(&self.output, declarations).map_err(|source| SessionError::WriteFailure {
            output: self.output.clone(),
            source,
        })
    }

    /// A terminal message must be the last one the engine sends. If
    /// another terminal message is already queued behind the one being
    /// handled, the session fails rather than guessing which result to
    /// keep.
    fn check_single_terminal(&self) -> Result<(), SessionError> {
        for message in self.engine_receiver.try_iter() {
            if message.is_terminal() {
                return Err(SessionError::MultipleTerminalMessages);
            }
            log::warn!("dropping engine message queued after a terminal message");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use crossbeam_channel::{unbounded, Receiver};
    use serial_test::serial;

    use porthole_engine::{DeclarationEngine, EngineInput, EngineMessage, Sender};
    use porthole_files::ProjectFile;
    use porthole_paths::{DirPath, ModulePath, ProjectFilePath};

    use super::{
        Event, GenerationSession, LoopState, SessionError, SessionOutcome, SessionState,
    };

    /// Plays a fixed script: some messages at start, then one batch per
    /// fetch reply. Received replies are logged for inspection.
    struct ScriptedEngine {
        sender: Sender,
        at_start: Vec<EngineMessage>,
        on_reply: VecDeque<Vec<EngineMessage>>,
        fetched: Arc<Mutex<Vec<ProjectFile>>>,
    }

    impl DeclarationEngine for ScriptedEngine {
        fn start(&mut self, _input: EngineInput) {
            for message in self.at_start.drain(..) {
                (self.sender)(message);
            }
        }

        fn file_fetched(&mut self, file: ProjectFile) {
            self.fetched.lock().unwrap().push(file);
            for message in self.on_reply.pop_front().unwrap_or_default() {
                (self.sender)(message);
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn scripted(
        at_start: Vec<EngineMessage>,
        on_reply: Vec<Vec<EngineMessage>>,
    ) -> (
        Box<dyn DeclarationEngine>,
        Receiver<EngineMessage>,
        Arc<Mutex<Vec<ProjectFile>>>,
    ) {
        let (sender, receiver) = unbounded();
        let fetched = Arc::new(Mutex::new(Vec::new()));
        let engine = ScriptedEngine {
            sender: Box::new(move |message| sender.send(message).unwrap()),
            at_start,
            on_reply: on_reply.into(),
            fetched: Arc::clone(&fetched),
        };
        (Box::new(engine), receiver, fetched)
    }

    fn input() -> EngineInput {
        EngineInput {
            entry_modules: vec![],
            project_files: vec![],
            ts_module: None,
        }
    }

    fn main_module() -> ProjectFilePath {
        ProjectFilePath::new(DirPath::from("src"), ModulePath::new(vec![], "Main"))
    }

    #[test]
    fn writes_declarations_and_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("types").join("app.d.ts");

        let (engine, receiver, _) = scripted(
            vec![EngineMessage::WriteFile("declarations\n".to_owned())],
            vec![],
        );
        let (_terminate_sender, terminate_receiver) = unbounded();
        let session = GenerationSession::new(engine, receiver, terminate_receiver, &output);

        let outcome = session.run(input()).unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::Written {
                output: output.clone(),
            }
        );
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "declarations\n");
    }

    #[test]
    #[serial]
    fn answers_fetches_with_the_requested_identity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/Main.elm"), "module Main exposing (..)\n").unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let (engine, receiver, fetched) = scripted(
            vec![EngineMessage::FetchFile(main_module())],
            vec![vec![EngineMessage::WriteFile("done".to_owned())]],
        );
        let (_terminate_sender, terminate_receiver) = unbounded();
        let session =
            GenerationSession::new(engine, receiver, terminate_receiver, "app.d.ts");

        let outcome = session.run(input()).unwrap();
        assert!(matches!(outcome, SessionOutcome::Written { .. }));
        assert_eq!(
            *fetched.lock().unwrap(),
            vec![ProjectFile {
                path: main_module(),
                contents: Some("module Main exposing (..)\n".to_owned()),
            }]
        );
    }

    #[test]
    #[serial]
    fn a_missing_module_file_fails_the_session() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let (engine, receiver, _) =
            scripted(vec![EngineMessage::FetchFile(main_module())], vec![]);
        let (_terminate_sender, terminate_receiver) = unbounded();
        let session =
            GenerationSession::new(engine, receiver, terminate_receiver, "app.d.ts");

        match session.run(input()) {
            Err(SessionError::FetchMiss { request }) => assert_eq!(request, main_module()),
            other => panic!("expected a fetch miss, got {other:?}"),
        }
    }

    #[test]
    fn a_reported_error_carries_the_engine_message() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("app.d.ts");

        let (engine, receiver, _) = scripted(
            vec![EngineMessage::ReportError("no main program".to_owned())],
            vec![],
        );
        let (_terminate_sender, terminate_receiver) = unbounded();
        let session = GenerationSession::new(engine, receiver, terminate_receiver, &output);

        let outcome = session.run(input()).unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::ErrorReported("no main program".to_owned())
        );
        assert!(!output.exists());
    }

    #[test]
    fn a_second_terminal_message_fails_before_anything_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("app.d.ts");

        let (engine, receiver, _) = scripted(
            vec![
                EngineMessage::WriteFile("first".to_owned()),
                EngineMessage::ReportError("second".to_owned()),
            ],
            vec![],
        );
        let (_terminate_sender, terminate_receiver) = unbounded();
        let session = GenerationSession::new(engine, receiver, terminate_receiver, &output);

        assert!(matches!(
            session.run(input()),
            Err(SessionError::MultipleTerminalMessages)
        ));
        assert!(!output.exists());
    }

    #[test]
    fn a_pending_termination_request_wins_over_engine_messages() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("app.d.ts");

        let (engine, receiver, _) = scripted(
            vec![EngineMessage::WriteFile("too late".to_owned())],
            vec![],
        );
        let (terminate_sender, terminate_receiver) = unbounded();
        terminate_sender.send(()).unwrap();
        let session = GenerationSession::new(engine, receiver, terminate_receiver, &output);

        let outcome = session.run(input()).unwrap();
        assert_eq!(outcome, SessionOutcome::TerminatedEarly);
        assert!(!output.exists());
    }

    #[test]
    fn termination_is_ignored_while_writing() {
        let (engine, receiver, _) = scripted(vec![], vec![]);
        let (_terminate_sender, terminate_receiver) = unbounded();
        let mut session =
            GenerationSession::new(engine, receiver, terminate_receiver, "app.d.ts");

        session.state = SessionState::Writing;
        let handled = session.handle_event(Event::Terminate).unwrap();
        assert!(matches!(handled, LoopState::Continue));
        assert_eq!(session.state(), SessionState::Writing);

        session.state = SessionState::Running;
        let handled = session.handle_event(Event::Terminate).unwrap();
        assert!(matches!(
            handled,
            LoopState::Finished(SessionOutcome::TerminatedEarly)
        ));
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[test]
    fn a_disconnected_engine_channel_ends_the_session() {
        struct InertEngine;
        impl DeclarationEngine for InertEngine {
            fn start(&mut self, _input: EngineInput) {}
            fn file_fetched(&mut self, _file: ProjectFile) {}
        }

        let (sender, receiver) = unbounded::<EngineMessage>();
        drop(sender);
        let (_terminate_sender, terminate_receiver) = unbounded();
        let session =
            GenerationSession::new(Box::new(InertEngine), receiver, terminate_receiver, "app.d.ts");

        assert!(matches!(
            session.run(input()),
            Err(SessionError::EngineDisconnected)
        ));
    }

    #[test]
    fn a_dropped_termination_channel_does_not_end_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("app.d.ts");

        let (engine, receiver, _) = scripted(
            vec![EngineMessage::WriteFile("declarations".to_owned())],
            vec![],
        );
        let (terminate_sender, terminate_receiver) = unbounded();
        drop(terminate_sender);
        let session = GenerationSession::new(engine, receiver, terminate_receiver, &output);

        let outcome = session.run(input()).unwrap();
        assert!(matches!(outcome, SessionOutcome::Written { .. }));
        assert!(output.exists());
    }
}
