use std::{
    collections::HashMap,
    fmt, fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::{LazyLock, Mutex},
};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Env,
    File,
    Stdin,
}

/// A resolved variable reference. Never cached: every statement resolves its
///  references again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub raw_value: Option<Vec<u8>>,
    pub source_kind: SourceKind,
}

impl Variable {
    pub fn value(&self) -> &[u8] {
        self.raw_value.as_deref().unwrap_or_default()
    }
}

/// Why a reference has no value. This is not an error: the expander leaves
///  the reference text in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Unset,
    UnreadableFile { path: PathBuf, reason: String },
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Unset => write!(f, "not set"),
            Missing::UnreadableFile { path, reason } => {
                write!(f, "cannot read {}: {reason}", path.display())
            }
        }
    }
}

/// Where variable values come from.
pub trait VariableSource {
    fn env(&self, name: &str) -> Option<Vec<u8>>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    /// Drains standard input. Only the first call yields bytes.
    fn take_stdin(&self) -> Vec<u8>;
}

impl<S: VariableSource + ?Sized> VariableSource for &S {
    fn env(&self, name: &str) -> Option<Vec<u8>> {
        (**self).env(name)
    }
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }
    fn take_stdin(&self) -> Vec<u8> {
        (**self).take_stdin()
    }
}

/// A reader that can be drained exactly once. Later takes yield nothing.
pub struct StdinOnce {
    reader: Mutex<Option<Box<dyn Read + Send>>>,
}

impl StdinOnce {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Mutex::new(Some(Box::new(reader))),
        }
    }

    pub fn empty() -> Self {
        Self {
            reader: Mutex::new(None),
        }
    }

    /// Hands over the reader itself, e.g. to read statements line by line.
    ///  Afterwards [StdinOnce::take] yields nothing.
    pub fn claim(&self) -> Option<Box<dyn Read + Send>> {
        self.reader
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub fn is_taken(&self) -> bool {
        self.reader
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    /// Reads everything that is left. Blocks until the producer closes the
    ///  stream.
    pub fn take(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        if let Some(mut reader) = self.claim()
            && let Err(e) = reader.read_to_end(&mut bytes)
        {
            debug!(error = %e, read = bytes.len(), "stdin read failed");
        }
        bytes
    }
}

impl fmt::Debug for StdinOnce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdinOnce")
            .field("taken", &self.is_taken())
            .finish()
    }
}

static PROCESS_STDIN: LazyLock<StdinOnce> = LazyLock::new(|| StdinOnce::new(io::stdin()));

/// The process-wide standard input, shared by every [ProcessSource].
pub fn process_stdin() -> &'static StdinOnce {
    &PROCESS_STDIN
}

/// The real process environment, file system and standard input.
#[derive(Debug, Clone, Copy)]
pub struct ProcessSource {
    stdin: &'static StdinOnce,
}

impl ProcessSource {
    pub fn new() -> Self {
        Self {
            stdin: process_stdin(),
        }
    }
}

impl Default for ProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableSource for ProcessSource {
    fn env(&self, name: &str) -> Option<Vec<u8>> {
        // `var_os` panics on these rather than reporting "unset"
        if name.is_empty() || name.contains(|c: char| c == '=' || c == '\0') {
            return None;
        }
        std::env::var_os(name).map(|v| v.into_encoded_bytes())
    }

    fn take_stdin(&self) -> Vec<u8> {
        self.stdin.take()
    }
}

/// An in-memory environment with its own standard input. Files are still
///  read from disk.
#[derive(Debug, Default)]
pub struct MapSource {
    vars: HashMap<String, Vec<u8>>,
    stdin: Option<StdinOnce>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn stdin(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(StdinOnce::new(io::Cursor::new(bytes.into())));
        self
    }
}

impl VariableSource for MapSource {
    fn env(&self, name: &str) -> Option<Vec<u8>> {
        self.vars.get(name).cloned()
    }

    fn take_stdin(&self) -> Vec<u8> {
        self.stdin.as_ref().map(StdinOnce::take).unwrap_or_default()
    }
}

/// Turns references into values.
#[derive(Debug, Clone)]
pub struct Resolver<S> {
    source: S,
}

impl<S: VariableSource> Resolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Looks up [name] in the environment. In file mode the value names a file
    ///  whose contents become the value.
    pub fn resolve(&self, name: &str, file: bool) -> Result<Variable, Missing> {
        let Some(value) = self.source.env(name) else {
            debug!(name, "no variable");
            return Err(Missing::Unset);
        };
        if !file {
            return Ok(Variable {
                name: name.to_string(),
                raw_value: Some(value),
                source_kind: SourceKind::Env,
            });
        }

        let path = path_from_bytes(value);
        match self.source.read_file(&path) {
            Ok(contents) => Ok(Variable {
                name: name.to_string(),
                raw_value: Some(contents),
                source_kind: SourceKind::File,
            }),
            Err(e) => {
                debug!(name, path = %path.display(), error = %e, "no file");
                Err(Missing::UnreadableFile {
                    path,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// The `$-` value: whatever is left on standard input, once.
    pub fn stdin(&self) -> Variable {
        Variable {
            name: "-".to_string(),
            raw_value: Some(self.source.take_stdin()),
            source_kind: SourceKind::Stdin,
        }
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::{ffi::OsString, os::unix::ffi::OsStringExt};
    PathBuf::from(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}
