//! Public and internal types for the rowfan API and orchestrator.

use std::path::PathBuf;
use std::str::FromStr;

/// How the run is wired, derived from which of the two optional streams are present.
/// Never set directly; use [`ExecutionMode::from_streams`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Source query and sink table: rows in via stdin, rows out via stdout.
    Bidirectional,
    /// Source query only: rows in via stdin, stdout inherited.
    SourceOnly,
    /// Sink table only: stdin inherited, rows out via stdout.
    SinkOnly,
    /// Neither: plain parallel execution, both streams inherited.
    Standalone,
}

impl ExecutionMode {
    /// Derive the mode from presence of a source query and a sink table.
    pub fn from_streams(has_source: bool, has_sink: bool) -> Self {
        match (has_source, has_sink) {
            (true, true) => ExecutionMode::Bidirectional,
            (true, false) => ExecutionMode::SourceOnly,
            (false, true) => ExecutionMode::SinkOnly,
            (false, false) => ExecutionMode::Standalone,
        }
    }

    /// Workers read stdin from a pipe in this mode.
    pub fn pipes_stdin(self) -> bool {
        matches!(
            self,
            ExecutionMode::Bidirectional | ExecutionMode::SourceOnly
        )
    }

    /// Workers write stdout to a pipe in this mode.
    pub fn pipes_stdout(self) -> bool {
        matches!(self, ExecutionMode::Bidirectional | ExecutionMode::SinkOnly)
    }
}

/// Supervision role a spawned process belongs to. Wait order is fixed:
/// unload first, then command, then load (see `engine::supervisor`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Unload,
    Command,
    Load,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unload => "unload",
            Role::Command => "command",
            Role::Load => "load",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire encoding between the unloader, the workers, and the loader.
/// Both encodings are newline-terminated records, so the multiplexer's
/// record-boundary contract is a line contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Tab-separated values; embedded tab/newline/backslash are escaped.
    #[default]
    Tsv,
    /// One JSON object per row, keyed by column name.
    Jsonl,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Tsv => "tsv",
            Format::Jsonl => "jsonl",
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tsv" => Ok(Format::Tsv),
            "jsonl" => Ok(Format::Jsonl),
            other => Err(format!("unknown format '{other}' (expected tsv or jsonl)")),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full options for a run. CLI flags and environment overrides are folded
/// into this once at entry (`engine::cli::setup_opts`); nothing reads the
/// environment after that point.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Command text, executed via `sh -c` by every worker.
    pub command: String,
    /// Source query. When set, rows are fanned out across worker stdin.
    pub query: Option<String>,
    /// Sink table. When set, worker stdout is collected into it.
    pub table: Option<String>,
    /// SQLite database path. Required when query or table is set.
    pub db_path: Option<PathBuf>,
    /// Number of parallel workers.
    pub num_processes: usize,
    /// Number of intermediate fan-out pipes fed by the unloader.
    pub parallel_unloads: usize,
    /// Number of intermediate fan-in pipes drained by the loader.
    pub parallel_loads: usize,
    /// First candidate directory for the pipe workspace.
    pub pipe_dir: PathBuf,
    /// Wire encoding between unloader, workers, and loader.
    pub format: Format,
    /// Verbose output.
    pub verbose: bool,
}

impl Opts {
    /// Mode implied by the presence of query and table.
    pub fn mode(&self) -> ExecutionMode {
        ExecutionMode::from_streams(self.query.is_some(), self.table.is_some())
    }
}
