//! Evaluation of configuration modules.
//!
//! An evaluator is built for exactly one evaluation and dropped right after,
//! so nothing (caches, resolved imports, server processes) carries over from
//! one resource to the next.

use std::collections::BTreeMap;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::resource::ModuleSource;
use super::value::{Composite, Value};
use super::wire::{
    decode_value, CloseEvaluator, CreateEvaluatorRequest, EvaluateRequest, ResultBytes,
    ServerMessage, CLOSE_EVALUATOR, CREATE_EVALUATOR_REQUEST, CREATE_EVALUATOR_RESPONSE,
    EVALUATE_REQUEST, EVALUATE_RESPONSE, LOG_MESSAGE,
};
use super::ConfigError;

/// Environment variable naming the `pkl` executable to use.
pub const PKL_EXEC_ENV: &str = "PKL_EXEC";

/// Evaluates module sources into value trees.
pub trait Evaluator {
    fn evaluate(&mut self, source: &ModuleSource) -> Result<Value, ConfigError>;
}

/// Produces a fresh [`Evaluator`] per evaluation. Dropping the evaluator
/// releases whatever it acquired.
pub trait EvaluatorBuilder {
    type Evaluator: Evaluator;

    fn build(&self) -> Result<Self::Evaluator, ConfigError>;
}

/// Evaluates `source` with an evaluator that lives only for this call and
/// returns the module it produced.
pub fn evaluate_module<B>(
    builder: &B,
    source: &ModuleSource,
    name: &str,
) -> Result<Composite, ConfigError>
where
    B: EvaluatorBuilder + ?Sized,
{
    let root = {
        let mut evaluator = builder.build()?;
        evaluator.evaluate(source)?
    };
    Composite::from_value(name, root).ok_or_else(|| ConfigError::NotAModule { uri: source.uri() })
}

/// Module URI schemes a server evaluator may import from.
const ALLOWED_MODULES: &[&str] = &[
    "pkl:",
    "repl:",
    "file:",
    "http:",
    "https:",
    "modulepath:",
    "package:",
    "projectpackage:",
];

/// Resource URI schemes a server evaluator may read.
const ALLOWED_RESOURCES: &[&str] = &[
    "http:",
    "https:",
    "file:",
    "env:",
    "prop:",
    "modulepath:",
    "package:",
    "projectpackage:",
];

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Builds evaluators backed by `pkl server`.
///
/// Each evaluator owns one server process. Results come back as Pkl's binary
/// encoding, so sets, maps with non-string keys, typed objects and durations
/// keep their identity.
#[derive(Debug, Clone, Default)]
pub struct ServerEvaluatorBuilder {
    program: Option<PathBuf>,
    external_properties: BTreeMap<String, String>,
    module_path: Vec<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl ServerEvaluatorBuilder {
    /// Locates `pkl` through `PKL_EXEC`, falling back to a `PATH` lookup.
    pub fn preconfigured() -> Self {
        Self::default()
    }

    /// Uses an explicit executable instead of locating one.
    #[must_use]
    pub fn with_program(mut self, program: impl AsRef<Path>) -> Self {
        self.program = Some(program.as_ref().to_path_buf());
        self
    }

    /// Sets an external property readable as `read("prop:<key>")`.
    #[must_use]
    pub fn with_external_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.external_properties.insert(key.into(), value.into());
        self
    }

    /// Adds a directory or archive searched for `modulepath:` imports.
    #[must_use]
    pub fn with_module_path(mut self, path: impl AsRef<Path>) -> Self {
        self.module_path.push(path.as_ref().to_path_buf());
        self
    }

    /// Runs the server from `dir` instead of the current directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn locate_program(&self) -> Result<PathBuf, ConfigError> {
        if let Some(program) = &self.program {
            return Ok(program.clone());
        }
        if let Some(program) = std::env::var_os(PKL_EXEC_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(program));
        }
        which::which("pkl").map_err(|e| ConfigError::EvaluatorUnavailable {
            program: PathBuf::from("pkl"),
            reason: e.to_string(),
        })
    }

    fn create_request(&self, request_id: i64, source: &ModuleSource) -> CreateEvaluatorRequest {
        let mut allowed_modules: Vec<String> =
            ALLOWED_MODULES.iter().map(|s| s.to_string()).collect();
        if let ModuleSource::Text { uri, .. } = source {
            if let Some(scheme) = uri_scheme(uri) {
                if !ALLOWED_MODULES.contains(&scheme.as_str()) {
                    allowed_modules.push(scheme);
                }
            }
        }
        CreateEvaluatorRequest {
            request_id,
            allowed_modules,
            allowed_resources: ALLOWED_RESOURCES.iter().map(|s| s.to_string()).collect(),
            module_paths: self
                .module_path
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            env: std::env::vars().collect(),
            properties: self.external_properties.clone(),
        }
    }
}

/// `https://config.example/app.pkl` has the scheme `https:`.
fn uri_scheme(uri: &str) -> Option<String> {
    let (scheme, _) = uri.split_once(':')?;
    let valid = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| format!("{scheme}:"))
}

impl EvaluatorBuilder for ServerEvaluatorBuilder {
    type Evaluator = ServerEvaluator;

    fn build(&self) -> Result<ServerEvaluator, ConfigError> {
        let program = self.locate_program()?;
        let mut command = Command::new(&program);
        command
            .arg("server")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let unavailable = |reason: String| ConfigError::EvaluatorUnavailable {
            program: program.clone(),
            reason,
        };
        let mut child = command.spawn().map_err(|e| unavailable(e.to_string()))?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(unavailable("server pipes are not available".to_string()));
        };

        debug!(program = %program.display(), pid = child.id(), "started pkl server");
        Ok(ServerEvaluator {
            program,
            settings: self.clone(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            last_request_id: 0,
            exited: false,
        })
    }
}

/// A single-use evaluator talking to its own `pkl server` process.
///
/// Dropping it closes the server's input and waits for the process to exit.
#[derive(Debug)]
pub struct ServerEvaluator {
    program: PathBuf,
    settings: ServerEvaluatorBuilder,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    last_request_id: i64,
    exited: bool,
}

impl ServerEvaluator {
    fn next_request_id(&mut self) -> i64 {
        self.last_request_id += 1;
        self.last_request_id
    }

    fn send<T: Serialize>(&mut self, code: u8, body: &T) -> Result<(), ConfigError> {
        let written = match self.stdin.as_mut() {
            Some(stdin) => rmp_serde::encode::write_named(&mut *stdin, &(code, body))
                .map_err(|e| e.to_string())
                .and_then(|()| stdin.flush().map_err(|e| e.to_string())),
            None => Err("server input is closed".to_string()),
        };
        written.map_err(|reason| self.failure(reason))
    }

    /// Reads messages until the response to `request_id` arrives.
    fn receive(&mut self, code: u8, request_id: i64) -> Result<ServerMessage, ConfigError> {
        loop {
            let (received, message): (u8, ServerMessage) =
                match rmp_serde::from_read(&mut self.stdout) {
                    Ok(message) => message,
                    Err(e) => return Err(self.failure(e.to_string())),
                };
            match received {
                LOG_MESSAGE => log_message(&message),
                _ if received == code && message.request_id == Some(request_id) => {
                    return Ok(message)
                }
                _ => trace!(code = received, "ignoring server message"),
            }
        }
    }

    /// Stops the server after a protocol failure. Whatever the server wrote to
    /// stderr replaces `reason` when present.
    fn failure(&mut self, reason: String) -> ConfigError {
        self.stdin = None;
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.exited = true;

        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        ConfigError::EvaluatorUnavailable {
            program: self.program.clone(),
            reason: if stderr.trim().is_empty() { reason } else { stderr },
        }
    }

    fn create_evaluator(&mut self, source: &ModuleSource) -> Result<i64, ConfigError> {
        let request_id = self.next_request_id();
        let request = self.settings.create_request(request_id, source);
        self.send(CREATE_EVALUATOR_REQUEST, &request)?;

        let response = self.receive(CREATE_EVALUATOR_RESPONSE, request_id)?;
        match (response.error, response.evaluator_id) {
            (Some(error), _) => Err(ConfigError::EvaluatorUnavailable {
                program: self.program.clone(),
                reason: error,
            }),
            (None, Some(evaluator_id)) => Ok(evaluator_id),
            (None, None) => {
                Err(self.failure("server did not return an evaluator id".to_string()))
            }
        }
    }

    fn shutdown(&mut self) {
        self.stdin = None;
        if self.exited {
            return;
        }
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                _ => {
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }
        self.exited = true;
    }
}

fn log_message(message: &ServerMessage) {
    let text = message.message.as_deref().unwrap_or_default();
    let frame = message.frame_uri.as_deref().unwrap_or_default();
    match message.level {
        Some(1) => warn!(frame, "{text}"),
        _ => trace!(frame, "{text}"),
    }
}

impl Evaluator for ServerEvaluator {
    fn evaluate(&mut self, source: &ModuleSource) -> Result<Value, ConfigError> {
        let uri = source.uri();
        let evaluator_id = self.create_evaluator(source)?;

        debug!(uri = %uri, evaluator_id, "evaluating module");
        let request_id = self.next_request_id();
        let request = EvaluateRequest {
            request_id,
            evaluator_id,
            module_uri: &uri,
            module_text: match source {
                ModuleSource::File(_) => None,
                ModuleSource::Text { text, .. } => Some(text.as_str()),
            },
        };
        self.send(EVALUATE_REQUEST, &request)?;
        let response = self.receive(EVALUATE_RESPONSE, request_id)?;
        self.send(CLOSE_EVALUATOR, &CloseEvaluator { evaluator_id })?;

        if let Some(message) = response.error {
            return Err(ConfigError::Evaluation { uri, message });
        }
        let Some(ResultBytes(bytes)) = response.result else {
            return Err(ConfigError::Evaluation {
                uri,
                message: "evaluator returned no result".to_string(),
            });
        };
        decode_value(&bytes).map_err(|source| ConfigError::Decode { uri, source })
    }
}

impl Drop for ServerEvaluator {
    fn drop(&mut self) {
        self.shutdown();
        trace!(program = %self.program.display(), "released pkl evaluator");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Counts evaluators handed out and released.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct Lifecycle {
        pub(crate) built: Rc<Cell<usize>>,
        pub(crate) dropped: Rc<Cell<usize>>,
        pub(crate) sources: Rc<RefCell<Vec<ModuleSource>>>,
    }

    /// Evaluator builder returning a canned result.
    #[derive(Debug, Clone)]
    pub(crate) struct StaticEvaluatorBuilder {
        pub(crate) result: Result<Value, String>,
        pub(crate) lifecycle: Lifecycle,
    }

    impl StaticEvaluatorBuilder {
        pub(crate) fn returning(value: impl Into<Value>) -> Self {
            Self {
                result: Ok(value.into()),
                lifecycle: Lifecycle::default(),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                result: Err(message.to_string()),
                lifecycle: Lifecycle::default(),
            }
        }
    }

    pub(crate) struct StaticEvaluator {
        result: Result<Value, String>,
        lifecycle: Lifecycle,
    }

    impl Evaluator for StaticEvaluator {
        fn evaluate(&mut self, source: &ModuleSource) -> Result<Value, ConfigError> {
            self.lifecycle.sources.borrow_mut().push(source.clone());
            self.result.clone().map_err(|message| ConfigError::Evaluation {
                uri: source.uri(),
                message,
            })
        }
    }

    impl Drop for StaticEvaluator {
        fn drop(&mut self) {
            self.lifecycle.dropped.set(self.lifecycle.dropped.get() + 1);
        }
    }

    impl EvaluatorBuilder for StaticEvaluatorBuilder {
        type Evaluator = StaticEvaluator;

        fn build(&self) -> Result<StaticEvaluator, ConfigError> {
            self.lifecycle.built.set(self.lifecycle.built.get() + 1);
            Ok(StaticEvaluator {
                result: self.result.clone(),
                lifecycle: self.lifecycle.clone(),
            })
        }
    }

    fn text_source() -> ModuleSource {
        ModuleSource::Text {
            uri: "mem:/app.pkl".into(),
            text: "name = \"Pigeon\"".into(),
        }
    }

    #[test]
    fn test_evaluator_released_after_success() {
        let builder = StaticEvaluatorBuilder::returning(Value::mapping([("name", "Pigeon")]));

        let module = evaluate_module(&builder, &text_source(), "app").unwrap();

        assert_eq!(module.get("name"), Some(&Value::from("Pigeon")));
        assert_eq!(builder.lifecycle.built.get(), 1);
        assert_eq!(builder.lifecycle.dropped.get(), 1);
    }

    #[test]
    fn test_evaluator_released_after_failure() {
        let builder = StaticEvaluatorBuilder::failing("Cannot find property `nmae`.");

        let result = evaluate_module(&builder, &text_source(), "app");

        match result {
            Err(ConfigError::Evaluation { uri, message }) => {
                assert_eq!(uri, "mem:/app.pkl");
                assert_eq!(message, "Cannot find property `nmae`.");
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }
        assert_eq!(builder.lifecycle.dropped.get(), 1);
    }

    #[test]
    fn test_fresh_evaluator_per_evaluation() {
        let builder = StaticEvaluatorBuilder::returning(Value::mapping([("a", 1)]));

        evaluate_module(&builder, &text_source(), "one").unwrap();
        evaluate_module(&builder, &text_source(), "two").unwrap();

        assert_eq!(builder.lifecycle.built.get(), 2);
        assert_eq!(builder.lifecycle.dropped.get(), 2);
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        let builder = StaticEvaluatorBuilder::returning(Value::list([1, 2]));

        let result = evaluate_module(&builder, &text_source(), "app");

        assert!(matches!(result, Err(ConfigError::NotAModule { .. })));
        assert_eq!(builder.lifecycle.dropped.get(), 1);
    }

    #[test]
    fn test_missing_program_is_reported() {
        let builder = ServerEvaluatorBuilder::preconfigured().with_program("/nonexistent/bin/pkl");

        let result = builder.build();

        assert!(matches!(
            result,
            Err(ConfigError::EvaluatorUnavailable { ref program, .. })
                if program == Path::new("/nonexistent/bin/pkl")
        ));
    }

    #[test]
    fn test_uri_scheme() {
        assert_eq!(uri_scheme("https://config.example/app.pkl").as_deref(), Some("https:"));
        assert_eq!(uri_scheme("mem:/app.pkl").as_deref(), Some("mem:"));
        assert_eq!(uri_scheme("app.pkl"), None);
        assert_eq!(uri_scheme("/srv/a:b.pkl"), None);
    }

    #[test]
    fn test_text_source_scheme_is_allowed() {
        let builder = ServerEvaluatorBuilder::preconfigured();
        let source = ModuleSource::Text {
            uri: "mem:/app.pkl".into(),
            text: String::new(),
        };

        let request = builder.create_request(1, &source);

        assert!(request.allowed_modules.iter().any(|m| m == "mem:"));
        assert_eq!(
            request.allowed_modules.iter().filter(|m| *m == "file:").count(),
            1
        );
    }

    /// `sh server`, run from a scratch directory, stands in for `pkl server`:
    /// it replays canned replies and records every request it receives.
    #[cfg(unix)]
    mod scripted {
        use super::*;

        #[derive(Debug, Default, serde::Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub(super) struct Recorded {
            pub evaluator_id: Option<i64>,
            pub module_uri: Option<String>,
            pub module_text: Option<String>,
            pub allowed_modules: Vec<String>,
            pub properties: BTreeMap<String, String>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        pub(super) struct Reply<'a> {
            pub request_id: i64,
            pub evaluator_id: i64,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub result: Option<Bin>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub error: Option<&'a str>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        pub(super) struct Log<'a> {
            pub evaluator_id: i64,
            pub level: i64,
            pub message: &'a str,
            pub frame_uri: &'a str,
        }

        pub(super) struct Bin(pub Vec<u8>);

        impl Serialize for Bin {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bytes(&self.0)
            }
        }

        pub(super) fn push<T: Serialize>(replies: &mut Vec<u8>, code: u8, body: &T) {
            rmp_serde::encode::write_named(replies, &(code, body)).unwrap();
        }

        pub(super) fn server(dir: &Path, replies: &[u8]) -> ServerEvaluatorBuilder {
            std::fs::write(dir.join("replies.bin"), replies).unwrap();
            std::fs::write(dir.join("server"), "cat replies.bin\ncat > requests.bin\n").unwrap();
            ServerEvaluatorBuilder::preconfigured()
                .with_program("/bin/sh")
                .with_working_dir(dir)
        }

        pub(super) fn requests(dir: &Path) -> Vec<(u8, Recorded)> {
            let bytes = std::fs::read(dir.join("requests.bin")).unwrap();
            let mut cursor = std::io::Cursor::new(bytes.as_slice());
            let mut requests = Vec::new();
            while (cursor.position() as usize) < bytes.len() {
                requests.push(rmp_serde::from_read(&mut cursor).unwrap());
            }
            requests
        }

        /// A module with one string property and an empty set.
        pub(super) fn module_bytes() -> Vec<u8> {
            rmp_serde::to_vec(&(
                0x01,
                "app",
                "https://config.example/app.pkl",
                (
                    (0x10, "host", "localhost"),
                    (0x10, "tags", (0x06, Vec::<String>::new())),
                ),
            ))
            .unwrap()
        }

        pub(super) fn replies(evaluation: Reply<'_>) -> Vec<u8> {
            let mut replies = Vec::new();
            let created = Reply {
                request_id: 1,
                evaluator_id: 7,
                result: None,
                error: None,
            };
            push(&mut replies, CREATE_EVALUATOR_RESPONSE, &created);
            let log = Log {
                evaluator_id: 7,
                level: 1,
                message: "deprecated property",
                frame_uri: "https://config.example/app.pkl",
            };
            push(&mut replies, LOG_MESSAGE, &log);
            push(&mut replies, EVALUATE_RESPONSE, &evaluation);
            replies
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_server_evaluates_text_source_under_its_uri() {
        use crate::config::flatten::flatten_module;
        use crate::config::property::{EmptyContainer, PropertyValue};

        let dir = tempfile::tempdir().unwrap();
        let replies = scripted::replies(scripted::Reply {
            request_id: 2,
            evaluator_id: 7,
            result: Some(scripted::Bin(scripted::module_bytes())),
            error: None,
        });
        let builder = scripted::server(dir.path(), &replies).with_external_property("env", "prod");
        let source = ModuleSource::Text {
            uri: "https://config.example/app.pkl".into(),
            text: "import \"base.pkl\"\nhost = \"localhost\"".into(),
        };

        let module = evaluate_module(&builder, &source, "app").unwrap();

        let properties = flatten_module(&module);
        assert_eq!(properties.get("host"), Some(&PropertyValue::Scalar("localhost".into())));
        assert_eq!(properties.get("tags"), Some(&PropertyValue::Empty(EmptyContainer::Set)));

        let requests = scripted::requests(dir.path());
        let codes: Vec<u8> = requests.iter().map(|(code, _)| *code).collect();
        assert_eq!(codes, [CREATE_EVALUATOR_REQUEST, EVALUATE_REQUEST, CLOSE_EVALUATOR]);

        let created = &requests[0].1;
        assert!(created.allowed_modules.iter().any(|m| m == "https:"));
        assert_eq!(created.properties.get("env").map(String::as_str), Some("prod"));

        let evaluated = &requests[1].1;
        assert_eq!(evaluated.evaluator_id, Some(7));
        assert_eq!(
            evaluated.module_uri.as_deref(),
            Some("https://config.example/app.pkl")
        );
        assert_eq!(
            evaluated.module_text.as_deref(),
            Some("import \"base.pkl\"\nhost = \"localhost\"")
        );
        assert_eq!(requests[2].1.evaluator_id, Some(7));
    }

    #[cfg(unix)]
    #[test]
    fn test_server_evaluates_file_source_by_uri() {
        let dir = tempfile::tempdir().unwrap();
        let replies = scripted::replies(scripted::Reply {
            request_id: 2,
            evaluator_id: 7,
            result: Some(scripted::Bin(scripted::module_bytes())),
            error: None,
        });
        let builder = scripted::server(dir.path(), &replies);
        let path = dir.path().canonicalize().unwrap().join("app.pkl");

        evaluate_module(&builder, &ModuleSource::File(path.clone()), "app").unwrap();

        let requests = scripted::requests(dir.path());
        let evaluated = &requests[1].1;
        let expected = url::Url::from_file_path(&path).unwrap().to_string();
        assert_eq!(evaluated.module_uri.as_deref(), Some(expected.as_str()));
        assert_eq!(evaluated.module_text, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_server_evaluation_error_is_verbatim() {
        let message = "–– Pkl Error ––\nCannot find property `nmae`.\n\n1 | name = nmae\n";
        let dir = tempfile::tempdir().unwrap();
        let replies = scripted::replies(scripted::Reply {
            request_id: 2,
            evaluator_id: 7,
            result: None,
            error: Some(message),
        });
        let builder = scripted::server(dir.path(), &replies);
        let source = ModuleSource::Text {
            uri: "mem:/app.pkl".into(),
            text: "name = nmae".into(),
        };

        let result = evaluate_module(&builder, &source, "app");

        match result {
            Err(ConfigError::Evaluation { uri, message: reported }) => {
                assert_eq!(uri, "mem:/app.pkl");
                assert_eq!(reported, message);
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }
        let codes: Vec<u8> = scripted::requests(dir.path()).iter().map(|(c, _)| *c).collect();
        assert_eq!(codes.last(), Some(&CLOSE_EVALUATOR));
    }

    #[cfg(unix)]
    #[test]
    fn test_server_crash_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("server"), "echo 'pkl: no such command' >&2\nexit 1\n")
            .unwrap();
        let builder = ServerEvaluatorBuilder::preconfigured()
            .with_program("/bin/sh")
            .with_working_dir(dir.path());

        let result = evaluate_module(&builder, &text_source(), "app");

        match result {
            Err(ConfigError::EvaluatorUnavailable { reason, .. }) => {
                assert_eq!(reason, "pkl: no such command\n");
            }
            other => panic!("expected an unavailable evaluator, got {other:?}"),
        }
    }
}
