use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use compiler__source::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("invalid report format '{value}'")),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CompilerFailure {
    pub kind: CompilerFailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<CompilerFailureDetail>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilerFailureKind {
    ReadInput,
    InvalidProgramModel,
    EntryPointNotFound,
    UnresolvedCallSite,
    MissingBlockGraph,
    MalformedBranch,
    UnlinkedPivot,
    MissingReturn,
    StackImbalance,
    UnboundLabel,
    BuildFailed,
    RunFailed,
}

impl CompilerFailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadInput => "read_input",
            Self::InvalidProgramModel => "invalid_program_model",
            Self::EntryPointNotFound => "entry_point_not_found",
            Self::UnresolvedCallSite => "unresolved_call_site",
            Self::MissingBlockGraph => "missing_block_graph",
            Self::MalformedBranch => "malformed_branch",
            Self::UnlinkedPivot => "unlinked_pivot",
            Self::MissingReturn => "missing_return",
            Self::StackImbalance => "stack_imbalance",
            Self::UnboundLabel => "unbound_label",
            Self::BuildFailed => "build_failed",
            Self::RunFailed => "run_failed",
        }
    }

    /// Kinds raised when an upstream phase broke its contract with a later one.
    #[must_use]
    pub fn is_invariant_violation(self) -> bool {
        matches!(
            self,
            Self::UnresolvedCallSite
                | Self::MissingBlockGraph
                | Self::MalformedBranch
                | Self::UnlinkedPivot
                | Self::MissingReturn
                | Self::StackImbalance
                | Self::UnboundLabel
        )
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CompilerFailureDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CompilerFailure {
    pub fn new(kind: CompilerFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            member: None,
            span: None,
            path: None,
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn in_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Records the span unless it is synthesized or one is already recorded,
    /// so the earliest source position wins.
    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        if self.span.is_none() && !span.is_synthesized() {
            self.span = Some(span);
        }
        self
    }

    #[must_use]
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, message: impl Into<String>) -> Self {
        self.details.push(CompilerFailureDetail {
            message: message.into(),
            path: None,
        });
        self
    }
}

impl fmt::Display for CompilerFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "error[{}]: {}", self.kind.as_str(), self.message)
    }
}

#[must_use]
pub fn render_failure(failure: &CompilerFailure, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => render_failure_text(failure),
        ReportFormat::Json => serde_json::to_string_pretty(failure)
            .unwrap_or_else(|error| format!("{{\"kind\":\"internal\",\"message\":\"{error}\"}}")),
    }
}

fn render_failure_text(failure: &CompilerFailure) -> String {
    let mut lines = vec![failure.to_string()];
    match (&failure.member, &failure.span) {
        (Some(member), Some(span)) => lines.push(format!("  --> {member} at {span}")),
        (Some(member), None) => lines.push(format!("  --> {member}")),
        (None, Some(span)) => lines.push(format!("  --> {span}")),
        (None, None) => {}
    }
    if let Some(path) = &failure.path {
        lines.push(format!("  path: {path}"));
    }
    for detail in &failure.details {
        match &detail.path {
            Some(path) => lines.push(format!("  note: {} ({path})", detail.message)),
            None => lines.push(format!("  note: {}", detail.message)),
        }
    }
    lines.join("\n")
}
