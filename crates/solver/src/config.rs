use std::fmt;
use std::path::PathBuf;

use crate::error::SolverError;

/// Supported Horn solver backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HornSolverKind {
    /// Z3's Spacer fixed-point engine.
    Spacer,
    /// Eldarica.
    Eldarica,
}

impl HornSolverKind {
    /// Binary name used for PATH lookup.
    pub fn binary_name(&self) -> &'static str {
        match self {
            HornSolverKind::Spacer => "z3",
            HornSolverKind::Eldarica => "eld",
        }
    }

    /// Common installation paths to check when PATH lookup fails.
    fn common_paths(&self) -> &'static [&'static str] {
        match self {
            HornSolverKind::Spacer => {
                &["/opt/homebrew/bin/z3", "/usr/local/bin/z3", "/usr/bin/z3"]
            }
            HornSolverKind::Eldarica => {
                &["/opt/homebrew/bin/eld", "/usr/local/bin/eld", "/usr/bin/eld"]
            }
        }
    }

    /// Build solver-specific CLI arguments for stdin mode.
    pub fn stdin_args(&self) -> Vec<String> {
        match self {
            HornSolverKind::Spacer => vec!["-in".to_string()],
            HornSolverKind::Eldarica => vec!["-in".to_string(), "-hsmt".to_string()],
        }
    }

    /// Build solver-specific timeout argument, if supported.
    pub fn timeout_arg(&self, timeout_ms: u64) -> Option<String> {
        if timeout_ms == 0 {
            return None;
        }
        match self {
            HornSolverKind::Spacer => Some(format!("-t:{timeout_ms}")),
            HornSolverKind::Eldarica => Some(format!("-t:{}", timeout_ms.div_ceil(1000))),
        }
    }

    /// Preprocessing parameters.
    ///
    /// With preprocessing off, Spacer's slicing and inlining are disabled
    /// so that counterexamples come back with a complete derivation.
    /// Eldarica has no equivalent switch.
    pub fn preprocessing_args(&self, enabled: bool) -> Vec<String> {
        match self {
            HornSolverKind::Spacer if !enabled => vec![
                "fp.xform.slice=false".to_string(),
                "fp.xform.inline_linear=false".to_string(),
                "fp.xform.inline_eager=false".to_string(),
            ],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for HornSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HornSolverKind::Spacer => write!(f, "Spacer"),
            HornSolverKind::Eldarica => write!(f, "Eldarica"),
        }
    }
}

impl std::str::FromStr for HornSolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "z3" | "spacer" => Ok(HornSolverKind::Spacer),
            "eld" | "eldarica" => Ok(HornSolverKind::Eldarica),
            _ => Err(format!("Unknown Horn solver: {s}. Valid options: spacer, eldarica")),
        }
    }
}

/// Horn solver configuration.
#[derive(Debug, Clone)]
pub struct HornSolverConfig {
    /// Which solver to use.
    pub kind: HornSolverKind,
    /// Path to the solver binary.
    pub solver_path: PathBuf,
    /// Timeout in milliseconds (0 = no timeout).
    pub timeout_ms: u64,
    /// Whether solver preprocessing is enabled.
    pub preprocessing: bool,
    /// Additional solver arguments.
    pub extra_args: Vec<String>,
}

impl HornSolverConfig {
    /// Create a new config with the given solver kind and path.
    pub fn new(kind: HornSolverKind, solver_path: PathBuf) -> Self {
        Self {
            kind,
            solver_path,
            timeout_ms: 0,
            preprocessing: true,
            extra_args: Vec::new(),
        }
    }

    /// Create config with a specific timeout (in milliseconds).
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Add extra arguments for the solver.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Auto-detect solver location for the given kind.
    ///
    /// Tries `which <binary>` first, then checks common installation paths.
    pub fn auto_detect_for(kind: HornSolverKind) -> Result<Self, SolverError> {
        let binary = kind.binary_name();

        if let Ok(output) = std::process::Command::new("which").arg(binary).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(Self::new(kind, PathBuf::from(path)));
                }
            }
        }

        for candidate in kind.common_paths() {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(Self::new(kind, path));
            }
        }

        Err(SolverError::NotFound(PathBuf::from(binary)))
    }

    /// Check that the configured binary exists.
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.solver_path.exists() {
            Ok(())
        } else {
            Err(SolverError::NotFound(self.solver_path.clone()))
        }
    }

    /// Assemble the full CLI argument vector.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.kind.stdin_args();
        if let Some(t) = self.kind.timeout_arg(self.timeout_ms) {
            args.push(t);
        }
        args.extend(self.kind.preprocessing_args(self.preprocessing));
        args.extend(self.extra_args.iter().cloned());
        args
    }
}
