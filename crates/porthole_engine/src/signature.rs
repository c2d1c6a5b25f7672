use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use porthole_files::ProjectFile;
use porthole_paths::{ModulePath, ProjectFilePath};

use crate::{DeclarationEngine, EngineInput, EngineMessage, Sender};

/// A declaration engine that derives the TypeScript interface of an Elm
/// program from the signatures spelled out in its source.
///
/// The first entry module names the program and provides the `main :
/// Program flags model msg` annotation its init flags are read from. Port
/// declarations are collected from every `port module` reachable from the
/// entries through imports, walking one module at a time and requesting
/// contents from the host as needed.
pub struct SignatureEngine {
    sender: Sender,
    /// Lookup from dotted module name to file identity. The first file
    /// declared for a name wins.
    modules: FxHashMap<ModulePath, ProjectFilePath>,
    /// Source text per file, as provided up front or fetched on demand.
    contents: FxHashMap<ProjectFilePath, String>,
    /// Files queued for analysis. When a fetch is outstanding it is for
    /// the front of this queue.
    queue: VecDeque<ProjectFilePath>,
    /// Files that have ever been queued; keeps import cycles finite.
    enqueued: FxHashSet<ProjectFilePath>,
    /// The fetch request the host has not answered yet.
    outstanding: Option<ProjectFilePath>,
    /// Ports collected so far, in discovery order.
    ports: Vec<Port>,
    program: Option<Program>,
    ts_module: Option<String>,
    entry_modules: Vec<ProjectFilePath>,
}

/// Direction of a port, seen from the Elm program.
enum PortDirection {
    /// A `(payload -> msg) -> Sub msg` port. Data flows into the program,
    /// so the JavaScript side gets a `send` function.
    Incoming,
    /// A `payload -> Cmd msg` port. Data flows out of the program, so the
    /// JavaScript side gets a `subscribe` function.
    Outgoing,
}

struct Port {
    name: String,
    direction: PortDirection,
    /// TypeScript spelling of the payload type.
    payload: String,
}

/// Facts about the entry program, read from its module.
struct Program {
    /// Dotted name segments from the module header.
    name: Vec<String>,
    /// TypeScript spelling of the init flags.
    flags: String,
}

impl SignatureEngine {
    /// Constructs the engine with the sink it reports through.
    pub fn new(sender: Sender) -> SignatureEngine {
        SignatureEngine {
            sender,
            modules: FxHashMap::default(),
            contents: FxHashMap::default(),
            queue: VecDeque::new(),
            enqueued: FxHashSet::default(),
            outstanding: None,
            ports: Vec::new(),
            program: None,
            ts_module: None,
            entry_modules: Vec::new(),
        }
    }

    fn send(&self, message: EngineMessage) {
        (self.sender)(message);
    }

    /// Analyzes queued files until one needs to be fetched or the queue
    /// runs dry.
    fn pump(&mut self) {
        while let Some(path) = self.queue.front().cloned() {
            match self.contents.get(&path).cloned() {
                Some(text) => {
                    self.queue.pop_front();
                    if let Err(message) = self.analyze(&path, &text) {
                        self.send(EngineMessage::ReportError(message));
                        return;
                    }
                }
                None => {
                    self.outstanding = Some(path.clone());
                    self.send(EngineMessage::FetchFile(path));
                    return;
                }
            }
        }
        self.finish();
    }

    /// Reads one module's facts and queues the modules it imports.
    fn analyze(&mut self, path: &ProjectFilePath, text: &str) -> Result<(), String> {
        let header = parse_module_header(text);

        if self.program.is_none() && self.entry_modules.contains(path) {
            let header = header
                .as_ref()
                .ok_or_else(|| format!("could not find a module declaration in `{path}`"))?;
            self.program = Some(Program {
                name: header.name.clone(),
                flags: parse_main_flags(text)
                    .map(|flags| ts_type(&flags))
                    .unwrap_or_else(|| "unknown".to_owned()),
            });
        }

        if header.map_or(false, |header| header.is_port_module) {
            self.ports.extend(parse_ports(text));
        }

        for import in parse_imports(text) {
            if let Some(target) = self.modules.get(&import) {
                if self.enqueued.insert(target.clone()) {
                    self.queue.push_back(target.clone());
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        let program = match self.program.take() {
            Some(program) => program,
            None => {
                self.send(EngineMessage::ReportError(
                    "could not find a main program in the given modules".to_owned(),
                ));
                return;
            }
        };
        let name = match &self.ts_module {
            Some(ts_module) => ts_module.split('.').map(str::to_owned).collect(),
            None => program.name,
        };
        let declarations = render_declarations(&name, &program.flags, &self.ports);
        self.send(EngineMessage::WriteFile(declarations));
    }
}

impl DeclarationEngine for SignatureEngine {
    fn start(&mut self, input: EngineInput) {
        for file in input.project_files {
            self.modules
                .entry(file.path.module_path.clone())
                .or_insert_with(|| file.path.clone());
            if let Some(contents) = file.contents {
                self.contents.insert(file.path, contents);
            }
        }
        self.ts_module = input.ts_module;
        for path in &input.entry_modules {
            if self.enqueued.insert(path.clone()) {
                self.queue.push_back(path.clone());
            }
        }
        self.entry_modules = input.entry_modules;
        self.pump();
    }

    fn file_fetched(&mut self, file: ProjectFile) {
        let expected = match self.outstanding.take() {
            Some(expected) => expected,
            None => {
                log::warn!("dropping unsolicited file `{}`", file.path);
                return;
            }
        };
        if file.path != expected {
            log::warn!(
                "dropping reply for `{}` while waiting for `{expected}`",
                file.path
            );
            self.outstanding = Some(expected);
            return;
        }
        self.contents
            .insert(file.path, file.contents.unwrap_or_default());
        self.pump();
    }
}

struct ModuleHeader {
    name: Vec<String>,
    is_port_module: bool,
}

/// Finds the module declaration line and extracts the dotted module name.
fn parse_module_header(text: &str) -> Option<ModuleHeader> {
    for line in text.lines() {
        let (rest, is_port_module) = if let Some(rest) = line.strip_prefix("port module ") {
            (rest, true)
        } else if let Some(rest) = line.strip_prefix("module ") {
            (rest, false)
        } else if let Some(rest) = line.strip_prefix("effect module ") {
            (rest, false)
        } else {
            continue;
        };
        let name = rest.split_whitespace().next()?;
        return Some(ModuleHeader {
            name: name.split('.').map(str::to_owned).collect(),
            is_port_module,
        });
    }
    None
}

/// Collects the modules a source file imports.
fn parse_imports(text: &str) -> Vec<ModulePath> {
    text.lines()
        .filter_map(|line| line.strip_prefix("import "))
        .filter_map(|rest| rest.split_whitespace().next())
        .filter_map(|name| ModulePath::from_segments(name.split('.').map(str::to_owned).collect()))
        .collect()
}

/// Extracts the flags type from a `main : Program flags model msg`
/// annotation, if the file carries one.
fn parse_main_flags(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let rest = line.strip_prefix("main")?;
        let annotation = rest.trim_start().strip_prefix(':')?.trim();
        let rest = annotation
            .strip_prefix("Platform.Program")
            .or_else(|| annotation.strip_prefix("Program"))?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        first_type_argument(rest.trim_start())
    })
}

/// Takes the first type argument off a type application, keeping a
/// parenthesized argument together.
fn first_type_argument(s: &str) -> Option<String> {
    if s.starts_with('(') {
        let mut depth = 0usize;
        for (index, ch) in s.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(s[..=index].to_owned());
                    }
                }
                _ => {}
            }
        }
        None
    } else {
        s.split_whitespace().next().map(str::to_owned)
    }
}

/// Collects the port declarations of a port module.
fn parse_ports(text: &str) -> Vec<Port> {
    text.lines().filter_map(parse_port_line).collect()
}

fn parse_port_line(line: &str) -> Option<Port> {
    let rest = line.strip_prefix("port ")?;
    if rest.starts_with("module ") {
        return None;
    }
    let (name, annotation) = rest.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    // Normalize interior whitespace so the shape checks below are stable.
    let annotation = annotation.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(payload) = incoming_payload(&annotation) {
        Some(Port {
            name: name.to_owned(),
            direction: PortDirection::Incoming,
            payload: ts_type(payload),
        })
    } else {
        annotation.strip_suffix("-> Cmd msg").map(|payload| Port {
            name: name.to_owned(),
            direction: PortDirection::Outgoing,
            payload: ts_type(payload),
        })
    }
}

/// Matches the `(payload -> msg) -> Sub msg` shape of an incoming port and
/// returns the payload type.
fn incoming_payload(annotation: &str) -> Option<&str> {
    let callback = annotation.strip_suffix("-> Sub msg")?.trim();
    let inner = callback.strip_prefix('(')?.strip_suffix(')')?;
    inner.strip_suffix("-> msg").map(str::trim)
}

/// TypeScript spelling of an Elm type, as far as flag and port payloads
/// can express one. Types without a stable mapping become `unknown`.
fn ts_type(elm_type: &str) -> String {
    let elm_type = elm_type.trim();
    match elm_type {
        "String" => "string".to_owned(),
        "Int" | "Float" => "number".to_owned(),
        "Bool" => "boolean".to_owned(),
        "()" => "null".to_owned(),
        "Value" | "Json.Decode.Value" | "Json.Encode.Value" => "unknown".to_owned(),
        _ => {
            if let Some(inner) = strip_outer_parens(elm_type) {
                ts_type(inner)
            } else if let Some(item) = elm_type
                .strip_prefix("List ")
                .or_else(|| elm_type.strip_prefix("Array "))
            {
                let item = ts_type(item);
                if item.contains(' ') {
                    format!("({item})[]")
                } else {
                    format!("{item}[]")
                }
            } else if let Some(item) = elm_type.strip_prefix("Maybe ") {
                format!("{} | null", ts_type(item))
            } else {
                "unknown".to_owned()
            }
        }
    }
}

/// Strips one pair of parentheses if they wrap the whole type.
fn strip_outer_parens(elm_type: &str) -> Option<&str> {
    let inner = elm_type.strip_prefix('(')?.strip_suffix(')')?;
    if inner.contains(',') || inner.contains("->") {
        return None;
    }
    let mut depth = 0i32;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Renders the declaration file for a program with the given dotted name,
/// init flags, and ports.
fn render_declarations(name: &[String], flags: &str, ports: &[Port]) -> String {
    let mut out = String::new();
    out.push_str(
        "// WARNING: Do not manually modify this file. It was generated using porthole.\n",
    );
    out.push_str("// Type definitions for using Elm programs in TypeScript\n\n");
    out.push_str("export namespace Elm {\n");

    for (depth, segment) in name.iter().enumerate() {
        let indent = "  ".repeat(depth + 1);
        out.push_str(&format!("{indent}namespace {segment} {{\n"));
    }

    let indent = "  ".repeat(name.len() + 1);
    out.push_str(&format!("{indent}export interface App {{\n"));
    if ports.is_empty() {
        out.push_str(&format!("{indent}  ports: {{}};\n"));
    } else {
        out.push_str(&format!("{indent}  ports: {{\n"));
        for port in ports {
            out.push_str(&format!("{indent}    {}: {{\n", port.name));
            match port.direction {
                PortDirection::Outgoing => out.push_str(&format!(
                    "{indent}      subscribe(callback: (data: {}) => void): void;\n",
                    port.payload
                )),
                PortDirection::Incoming => out.push_str(&format!(
                    "{indent}      send(data: {}): void;\n",
                    port.payload
                )),
            }
            out.push_str(&format!("{indent}    }};\n"));
        }
        out.push_str(&format!("{indent}  }};\n"));
    }
    out.push_str(&format!("{indent}}}\n"));

    out.push_str(&format!("{indent}export function init(options: {{\n"));
    out.push_str(&format!("{indent}  node?: HTMLElement | null;\n"));
    out.push_str(&format!("{indent}  flags: {flags};\n"));
    out.push_str(&format!("{indent}}}): Elm.{}.App;\n", name.join(".")));

    for depth in (0..name.len()).rev() {
        let indent = "  ".repeat(depth + 1);
        out.push_str(&format!("{indent}}}\n"));
    }
    out.push_str("}\n");
    out
}
