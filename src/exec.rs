//! The seam to whatever actually runs statements.
//!
//! Nothing in this crate talks to a server. An [Executor] gets one complete
//!  statement at a time and reports rows, a change count or an error.

use std::{fmt, io::Write};

use thiserror::Error;
use tracing::debug;

/// Server error codes the session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// `ER_LOCK_DEADLOCK`
    LockDeadlock,
    /// `ER_UPDATE_WITHOUT_KEY_IN_SAFE_MODE`
    UpdateWithoutKeyInSafeMode,
    Other(u32),
}

impl ErrorCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            1213 => ErrorCode::LockDeadlock,
            1175 => ErrorCode::UpdateWithoutKeyInSafeMode,
            other => ErrorCode::Other(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            ErrorCode::LockDeadlock => 1213,
            ErrorCode::UpdateWithoutKeyInSafeMode => 1175,
            ErrorCode::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SQL error {code}: {message}")]
pub struct ExecError {
    pub code: ErrorCode,
    pub message: String,
}

impl ExecError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_code(code),
            message: message.into(),
        }
    }
}

/// Already-decoded rows. Rendering them is someone else's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rows(ResultSet),
    Changed { affected: u64, insert_id: u64 },
}

pub trait Executor {
    fn execute(&mut self, sql: &str) -> Result<Outcome, ExecError>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn execute(&mut self, sql: &str) -> Result<Outcome, ExecError> {
        (**self).execute(sql)
    }
}

/// Prints each statement instead of running it. Every statement "changes"
///  nothing.
#[derive(Debug)]
pub struct DryRun<W> {
    out: W,
}

impl<W: Write> DryRun<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Executor for DryRun<W> {
    fn execute(&mut self, sql: &str) -> Result<Outcome, ExecError> {
        debug!(sql, "dry run");
        writeln!(self.out, "{sql}").map_err(|e| ExecError::new(0, e.to_string()))?;
        Ok(Outcome::Changed {
            affected: 0,
            insert_id: 0,
        })
    }
}
