//! Runs a sequence of templates against an [Executor].
//!
//! Each template is expanded and executed on its own. Around that sit the
//!  transaction wrapper, the safe-update policy and a single retry on
//!  deadlock.

use std::{
    io::{self, Write},
    thread,
    time::Duration,
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::{Config, ConfigError, SafetyMode},
    exec::{ErrorCode, ExecError, Executor, Outcome},
    resolve::VariableSource,
    template::{ExpandError, Expander},
};

pub const SLOW_PAUSE: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Expand(#[from] ExpandError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A statement the session itself issues failed.
    #[error("SQL query failed: {sql}: {source}")]
    Statement {
        sql: String,
        #[source]
        source: ExecError,
    },
    #[error("cannot write report: {0}")]
    Report(#[from] io::Error),
}

pub struct Session<E, S, W> {
    config: Config,
    safety: SafetyMode,
    executor: E,
    expander: Expander<S>,
    /// Where `--id` and `--changes` reports go.
    report: W,
    in_transaction: bool,
    failures: u32,
}

impl<E, S, W> Session<E, S, W>
where
    E: Executor,
    S: VariableSource,
    W: Write,
{
    pub fn new(config: Config, executor: E, source: S, report: W) -> Result<Self, SessionError> {
        let safety = config.safety()?;
        Ok(Self {
            config,
            safety,
            executor,
            expander: Expander::new(source),
            report,
            in_transaction: false,
            failures: 0,
        })
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Opens the transaction and turns on safe updates, as configured.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.config.transaction {
            self.safe_query("START TRANSACTION")?;
            self.in_transaction = true;
        }
        if self.safety != SafetyMode::Unsafe {
            self.safe_query("SET SQL_SAFE_UPDATES=1")?;
        }
        Ok(())
    }

    /// Expands and runs one template. A statement that fails is logged and
    ///  counted rather than returned as an error; only expansion errors and
    ///  failures of statements the session issues itself are errors.
    pub fn run(&mut self, template: &str) -> Result<Option<Outcome>, SessionError> {
        let sql = if self.config.no_expand {
            template.to_string()
        } else {
            self.expander.expand(template)?
        };
        debug!(%sql, "executing");

        let mut result = self.executor.execute(&sql);
        if let Err(e) = &result
            && e.code == ErrorCode::UpdateWithoutKeyInSafeMode
            && self.safety == SafetyMode::Warn
        {
            warn!(error = %e, %sql, template, "SQL warning");
            self.safe_query("SET SQL_SAFE_UPDATES=0")?;
            result = self.executor.execute(&sql);
        }
        if let Err(e) = &result
            && e.code == ErrorCode::LockDeadlock
            && !self.config.abort_deadlock
            && !self.in_transaction
        {
            debug!(%sql, "deadlock, retrying");
            result = self.executor.execute(&sql);
        }

        let outcome = match result {
            Ok(outcome) => {
                if let Outcome::Changed { affected, insert_id } = outcome {
                    if self.config.report_id && insert_id != 0 {
                        writeln!(self.report, "{insert_id}")?;
                    }
                    if self.config.report_changes {
                        writeln!(self.report, "{affected}")?;
                    }
                    if self.config.status_changes && affected == 0 {
                        self.failures += 1;
                    }
                }
                Some(outcome)
            }
            Err(e) => {
                // The transaction is abandoned: no COMMIT at the end
                self.in_transaction = false;
                self.failures += 1;
                warn!(error = %e, %sql, template, "SQL error");
                None
            }
        };

        if self.config.slow {
            thread::sleep(SLOW_PAUSE);
        }
        Ok(outcome)
    }

    /// Commits an open transaction and returns the number of failures.
    pub fn finish(mut self) -> Result<u32, SessionError> {
        if self.in_transaction {
            self.run("COMMIT")?;
        }
        self.report.flush()?;
        Ok(self.failures)
    }

    /// Runs a statement that must succeed. Deadlocks are retried once, except
    ///  on `COMMIT`.
    fn safe_query(&mut self, sql: &str) -> Result<(), SessionError> {
        let mut result = self.executor.execute(sql);
        if let Err(e) = &result
            && e.code == ErrorCode::LockDeadlock
            && !sql.eq_ignore_ascii_case("COMMIT")
        {
            result = self.executor.execute(sql);
        }
        result.map(|_| ()).map_err(|source| SessionError::Statement {
            sql: sql.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{exec::ResultSet, resolve::MapSource};
    use std::collections::VecDeque;

    /// Records statements and answers from a script; an empty script means
    ///  success with one changed row.
    #[derive(Default)]
    struct Scripted {
        replies: VecDeque<Result<Outcome, ExecError>>,
        seen: Vec<String>,
    }

    impl Scripted {
        fn reply(mut self, reply: Result<Outcome, ExecError>) -> Self {
            self.replies.push_back(reply);
            self
        }
    }

    impl Executor for Scripted {
        fn execute(&mut self, sql: &str) -> Result<Outcome, ExecError> {
            self.seen.push(sql.to_string());
            self.replies.pop_front().unwrap_or(Ok(changed(1)))
        }
    }

    fn changed(affected: u64) -> Outcome {
        Outcome::Changed {
            affected,
            insert_id: 0,
        }
    }

    fn deadlock() -> Result<Outcome, ExecError> {
        Err(ExecError::new(1213, "Deadlock found"))
    }

    fn unsafe_update() -> Result<Outcome, ExecError> {
        Err(ExecError::new(1175, "safe update mode"))
    }

    fn session(config: Config, executor: &mut Scripted) -> Session<&mut Scripted, MapSource, Vec<u8>> {
        let source = MapSource::new().var("ID", "7").var("NAME", "O'Brien");
        Session::new(config, executor, source, Vec::new()).unwrap()
    }

    #[test]
    fn expands_and_runs() {
        let mut exec = Scripted::default();
        let mut s = session(Config::default(), &mut exec);
        s.begin().unwrap();
        s.run("UPDATE t SET name = $NAME WHERE id = $ID;").unwrap();
        assert_eq!(s.finish().unwrap(), 0);
        assert_eq!(
            exec.seen,
            ["SET SQL_SAFE_UPDATES=1", "UPDATE t SET name = 'O''Brien' WHERE id = 7"]
        );
    }

    #[test]
    fn no_expand() {
        let mut exec = Scripted::default();
        let config = Config {
            no_expand: true,
            unsafe_updates: true,
            ..Config::default()
        };
        let mut s = session(config, &mut exec);
        s.begin().unwrap();
        s.run("SELECT '$ID'").unwrap();
        s.finish().unwrap();
        assert_eq!(exec.seen, ["SELECT '$ID'"]);
    }

    #[test]
    fn transaction_commits() {
        let mut exec = Scripted::default();
        let config = Config {
            transaction: true,
            ..Config::default()
        };
        let mut s = session(config, &mut exec);
        s.begin().unwrap();
        assert!(s.in_transaction());
        s.run("DELETE FROM t WHERE id = $ID").unwrap();
        assert_eq!(s.finish().unwrap(), 0);
        assert_eq!(
            exec.seen,
            [
                "START TRANSACTION",
                "SET SQL_SAFE_UPDATES=1",
                "DELETE FROM t WHERE id = 7",
                "COMMIT"
            ]
        );
    }

    #[test]
    fn failure_abandons_transaction() {
        let mut exec = Scripted::default()
            .reply(Ok(changed(0)))
            .reply(Ok(changed(0)))
            .reply(Err(ExecError::new(1064, "syntax")));
        let config = Config {
            transaction: true,
            ..Config::default()
        };
        let mut s = session(config, &mut exec);
        s.begin().unwrap();
        assert_eq!(s.run("bad").unwrap(), None);
        assert!(!s.in_transaction());
        assert_eq!(s.finish().unwrap(), 1);
        assert_eq!(exec.seen.last().map(String::as_str), Some("bad"));
    }

    #[test]
    fn deadlock_is_retried_once() {
        let mut exec = Scripted::default().reply(deadlock());
        let mut s = session(Config::default(), &mut exec);
        assert_eq!(s.run("UPDATE t SET a = 1").unwrap(), Some(changed(1)));
        assert_eq!(s.finish().unwrap(), 0);
        assert_eq!(exec.seen.len(), 2);

        let mut exec = Scripted::default().reply(deadlock()).reply(deadlock());
        let mut s = session(Config::default(), &mut exec);
        assert_eq!(s.run("UPDATE t SET a = 1").unwrap(), None);
        assert_eq!(s.finish().unwrap(), 1);
        assert_eq!(exec.seen.len(), 2);
    }

    #[test]
    fn deadlock_not_retried_when_aborting() {
        let mut exec = Scripted::default().reply(deadlock());
        let config = Config {
            abort_deadlock: true,
            ..Config::default()
        };
        let mut s = session(config, &mut exec);
        assert_eq!(s.run("UPDATE t SET a = 1").unwrap(), None);
        assert_eq!(s.finish().unwrap(), 1);
        assert_eq!(exec.seen.len(), 1);
    }

    #[test]
    fn unsafe_update_warns_and_retries() {
        let mut exec = Scripted::default().reply(unsafe_update());
        let mut s = session(Config::default(), &mut exec);
        assert!(s.run("DELETE FROM t").unwrap().is_some());
        assert_eq!(s.finish().unwrap(), 0);
        assert_eq!(exec.seen, ["DELETE FROM t", "SET SQL_SAFE_UPDATES=0", "DELETE FROM t"]);
    }

    #[test]
    fn unsafe_update_fails_in_safe_mode() {
        let mut exec = Scripted::default().reply(unsafe_update());
        let config = Config {
            safe: true,
            ..Config::default()
        };
        let mut s = session(config, &mut exec);
        assert_eq!(s.run("DELETE FROM t").unwrap(), None);
        assert_eq!(s.finish().unwrap(), 1);
        assert_eq!(exec.seen, ["DELETE FROM t"]);
    }

    #[test]
    fn safe_queries_must_succeed() {
        let mut exec = Scripted::default().reply(deadlock()).reply(deadlock());
        let mut s = session(Config::default(), &mut exec);
        let err = s.begin().unwrap_err();
        assert!(matches!(err, SessionError::Statement { ref sql, .. } if sql == "SET SQL_SAFE_UPDATES=1"));
    }

    #[test]
    fn reports_and_status() {
        let mut exec = Scripted::default()
            .reply(Ok(Outcome::Changed {
                affected: 2,
                insert_id: 41,
            }))
            .reply(Ok(changed(0)))
            .reply(Ok(Outcome::Rows(ResultSet::default())));
        let config = Config {
            report_id: true,
            report_changes: true,
            status_changes: true,
            ..Config::default()
        };
        let mut s = session(config, &mut exec);
        s.run("INSERT INTO t VALUES (1)").unwrap();
        s.run("UPDATE t SET a = 1 WHERE 0").unwrap();
        s.run("SELECT 1").unwrap();
        assert_eq!(s.failures(), 1);
        assert_eq!(String::from_utf8(s.report.clone()).unwrap(), "41\n2\n0\n");
    }

    #[test]
    fn expansion_errors_are_returned() {
        let mut exec = Scripted::default();
        let mut s = session(Config::default(), &mut exec);
        assert!(matches!(s.run("SELECT 1; SELECT 2"), Err(SessionError::Expand(_))));
        assert!(exec.seen.is_empty());
    }

    #[test]
    fn conflicting_safety() {
        let config = Config {
            safe: true,
            unsafe_updates: true,
            ..Config::default()
        };
        let mut exec = Scripted::default();
        let err = Session::new(config, &mut exec, MapSource::new(), Vec::new()).err();
        assert!(matches!(err, Some(SessionError::Config(ConfigError::SafetyConflict))));
    }
}
