//! Subprocess driver for SMT-LIB2 compatible Horn solvers.
//!
//! Accumulates the Horn system like the text driver, but dispatches each
//! query by spawning the configured solver (Z3/Spacer or Eldarica) and
//! piping the rendered script through stdin. A background thread enforces
//! an OS-level timeout because solver-internal timeout flags are
//! heuristics that hard instances can ignore.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use contract_fv_smtlib::sort::Sort;
use contract_fv_smtlib::term::Term;

use crate::config::HornSolverConfig;
use crate::error::SolverError;
use crate::interface::ChcInterface;
use crate::result::{CexGraph, CheckResult};
use crate::smtlib2::{build_horn_script, parse_response};

/// CLI-based Horn solver.
#[derive(Debug)]
pub struct HornCliSolver {
    config: HornSolverConfig,
    relations: BTreeMap<String, Vec<Sort>>,
    variables: BTreeMap<String, Sort>,
    rules: Vec<(Term, String)>,
}

impl HornCliSolver {
    /// Create a new solver with the given configuration.
    pub fn new(config: HornSolverConfig) -> Self {
        Self {
            config,
            relations: BTreeMap::new(),
            variables: BTreeMap::new(),
            rules: Vec::new(),
        }
    }

    /// Get a reference to the solver configuration.
    pub fn config(&self) -> &HornSolverConfig {
        &self.config
    }

    /// Run one rendered script through the solver subprocess.
    fn run(&self, script_text: &str) -> Result<String, SolverError> {
        self.config.validate()?;

        let args = self.config.build_args();
        let solver_name = self.config.kind.to_string();
        tracing::debug!("dispatching CHC query to {solver_name}");

        let mut child = Command::new(&self.config.solver_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SolverError::ProcessError(format!("Failed to start {solver_name}: {e}"))
            })?;

        // Write the script to stdin and close it so the solver sees EOF.
        {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                SolverError::ProcessError(format!("Failed to open {solver_name} stdin"))
            })?;
            stdin.write_all(script_text.as_bytes()).map_err(|e| {
                SolverError::ProcessError(format!("Failed to write to {solver_name} stdin: {e}"))
            })?;
        }

        let timeout_ms = self.config.timeout_ms;
        if timeout_ms == 0 {
            let output = child.wait_with_output().map_err(|e| {
                SolverError::ProcessError(format!("Failed to wait for {solver_name}: {e}"))
            })?;
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        // The solver's own -t: flag can be ignored on hard instances, so
        // the subprocess is also bounded at the OS level. Capture the PID
        // before moving `child` into the waiting thread so the process can
        // be killed when the deadline fires.
        let child_pid = child.id();
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let result = child.wait_with_output();
            let _ = tx.send(result);
        });

        let os_timeout_ms = (timeout_ms * 3).max(10_000);
        match rx.recv_timeout(Duration::from_millis(os_timeout_ms)) {
            Ok(wait_result) => {
                let output = wait_result.map_err(|e| {
                    SolverError::ProcessError(format!("Failed to wait for {solver_name}: {e}"))
                })?;
                let _ = handle.join();
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Err(_) => {
                kill_process(child_pid);
                let _ = handle.join();
                Err(SolverError::Timeout)
            }
        }
    }
}

impl ChcInterface for HornCliSolver {
    fn register_relation(&mut self, name: &str, arg_sorts: &[Sort]) {
        self.relations
            .insert(name.to_string(), arg_sorts.to_vec());
    }

    fn declare_variable(&mut self, name: &str, sort: Sort) {
        self.variables.insert(name.to_string(), sort);
    }

    fn add_rule(&mut self, rule: &Term, name: &str) {
        self.rules.push((rule.clone(), name.to_string()));
    }

    fn query(&mut self, query: &Term) -> (CheckResult, CexGraph) {
        let script = build_horn_script(&self.relations, &self.variables, &self.rules, query);
        let result = match self.run(&script.to_string()) {
            Ok(response) => parse_response(&response),
            Err(SolverError::Timeout) => CheckResult::Unknown,
            Err(e) => {
                tracing::warn!("Horn solver failed: {e}");
                CheckResult::Error
            }
        };
        // Derivation reconstruction is not available over the text pipe.
        (result, CexGraph::default())
    }

    fn reset(&mut self) {
        self.relations.clear();
        self.variables.clear();
        self.rules.clear();
    }

    fn set_preprocessing(&mut self, enabled: bool) {
        self.config.preprocessing = enabled;
    }
}

/// Kill a process by PID at the OS level.
///
/// Errors are intentionally ignored: if the process already exited,
/// killing it is a no-op.
fn kill_process(pid: u32) {
    #[cfg(unix)]
    {
        // Safety: SIGKILL(9) is always valid; pid is obtained from a live child.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HornSolverKind;
    use std::path::PathBuf;

    #[test]
    fn missing_binary_reports_error_result() {
        let config = HornSolverConfig::new(
            HornSolverKind::Spacer,
            PathBuf::from("/definitely/not/here/z3"),
        );
        let mut solver = HornCliSolver::new(config);
        solver.register_relation("err", &[]);
        let (result, cex) = solver.query(&Term::App("err".into(), vec![]));
        assert_eq!(result, CheckResult::Error);
        assert!(cex.is_empty());
    }

    #[test]
    fn set_preprocessing_toggles_config() {
        let config = HornSolverConfig::new(HornSolverKind::Spacer, PathBuf::from("/usr/bin/z3"));
        let mut solver = HornCliSolver::new(config);
        assert!(solver.config().preprocessing);
        solver.set_preprocessing(false);
        assert!(!solver.config().preprocessing);
        assert!(solver
            .config()
            .build_args()
            .contains(&"fp.xform.slice=false".to_string()));
    }
}
