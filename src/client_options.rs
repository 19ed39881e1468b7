//! Connection options, from the command line and the `[client]` section of
//!  a MySQL-style option file.
//!
//! Command-line values win: the option file only fills fields that are still
//!  unset. The file is ignored unless it is a regular file readable by its
//!  owner only, since it usually holds a password.

use std::{
    fs,
    path::{Path, PathBuf},
};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_OPTION_FILE: &str = "~/.my.cnf";
/// Overrides [DEFAULT_OPTION_FILE]. An empty value disables the file.
pub const OPTION_FILE_ENV: &str = "SQL_CNF";
/// Used as the CA when present, which turns TLS on for remote hosts.
pub const DEFAULT_CA: &str = "/etc/mysql/cacert.pem";

const LINE_PATTERN: &str = r"^([[:alnum:]-]*)\s*(?:=\s*(.*))?";

#[derive(Debug, Error)]
pub enum ClientOptionsError {
    #[error("option file pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub ssl_ca: Option<String>,
    pub ssl_cert: Option<String>,
    pub ssl_key: Option<String>,
    pub skip_ssl: bool,
}

impl ClientOptions {
    /// Sets the CA to [DEFAULT_CA] if none is given and the file is readable.
    pub fn with_default_ca(mut self) -> Self {
        if self.ssl_ca.is_none() && fs::File::open(DEFAULT_CA).is_ok() {
            self.ssl_ca = Some(DEFAULT_CA.to_string());
        }
        self
    }

    /// Default CA, then the option file found by [option_file_path].
    pub fn load(self, explicit: Option<&str>) -> Result<Self, ClientOptionsError> {
        let mut options = self.with_default_ca();
        if let Some(path) = option_file_path(explicit, |name| std::env::var(name).ok()) {
            options.read_option_file(&path)?;
        }
        Ok(options)
    }

    /// Applies the `[client]` section of [path]. Returns whether the file was
    ///  used; a missing or unsafe file is skipped.
    pub fn read_option_file(&mut self, path: &Path) -> Result<bool, ClientOptionsError> {
        let Ok(meta) = fs::metadata(path) else {
            debug!(path = %path.display(), "no option file");
            return Ok(false);
        };
        if !meta.is_file() {
            return Ok(false);
        }
        if !owner_read_only(&meta) {
            warn!(path = %path.display(), "option file is not user only read, not using");
            return Ok(false);
        }
        match fs::read(path) {
            Ok(bytes) => {
                self.apply_client_section(&String::from_utf8_lossy(&bytes))?;
                Ok(true)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open option file");
                Ok(false)
            }
        }
    }

    /// Applies the `key [= value]` lines between `[client]` and the next
    ///  section.
    pub fn apply_client_section(&mut self, text: &str) -> Result<(), ClientOptionsError> {
        let pattern = Regex::new(LINE_PATTERN)?;
        let section = text
            .lines()
            .skip_while(|line| !starts_with_ignore_case(line, "[client]"))
            .skip(1)
            .take_while(|line| !line.starts_with('['));

        for line in section {
            let line = line.trim_end_matches(|c: char| c < ' ');
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let key = caps.get(1).map_or("", |m| m.as_str());
            let value = caps.get(2).map(|m| unquote(m.as_str()));
            self.set(&key.to_ascii_lowercase(), value);
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: Option<&str>) {
        let field = match key {
            "port" => {
                if self.port.is_none() {
                    self.port = value.and_then(|v| v.trim().parse().ok());
                }
                return;
            }
            "skip-ssl" => {
                // A bare `skip-ssl` is the usual way to write it
                self.skip_ssl |= value.is_none_or(|v| !v.is_empty());
                return;
            }
            "user" => &mut self.user,
            "host" => &mut self.host,
            "password" => &mut self.password,
            "database" => &mut self.database,
            "ssl-ca" => &mut self.ssl_ca,
            "ssl-cert" => &mut self.ssl_cert,
            "ssl-key" => &mut self.ssl_key,
            _ => return,
        };
        if field.is_none()
            && let Some(value) = value
            && !value.is_empty()
        {
            *field = Some(value.to_string());
        }
    }

    /// The host to connect to; `None` means the local server.
    pub fn host(&self) -> Option<&str> {
        self.host
            .as_deref()
            .filter(|h| !h.is_empty() && !h.eq_ignore_ascii_case("localhost"))
    }

    pub fn use_tls(&self) -> bool {
        self.host().is_some()
            && (self.ssl_ca.is_some() || self.ssl_cert.is_some() || self.ssl_key.is_some())
            && !self.skip_ssl
    }
}

/// Where the option file lives: [explicit], else `$SQL_CNF`, else
///  `~/.my.cnf`. A leading `~` is `$MYSQL_HOME`, else `$HOME`, else `/etc`.
pub fn option_file_path(explicit: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let name = match explicit {
        Some(name) => name.to_string(),
        None => env(OPTION_FILE_ENV).unwrap_or_else(|| DEFAULT_OPTION_FILE.to_string()),
    };
    if name.is_empty() {
        return None;
    }
    match name.strip_prefix('~') {
        Some(rest) => {
            let home = env("MYSQL_HOME")
                .or_else(|| env("HOME"))
                .unwrap_or_else(|| "/etc".to_string());
            Some(PathBuf::from(format!("{home}{rest}")))
        }
        None => Some(PathBuf::from(name)),
    }
}

fn starts_with_ignore_case(line: &str, prefix: &str) -> bool {
    line.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

#[cfg(unix)]
fn owner_read_only(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o577 == 0o400
}

#[cfg(not(unix))]
fn owner_read_only(_meta: &fs::Metadata) -> bool {
    true
}
