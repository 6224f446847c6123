//! Validator finding models.
//!
//! A finding is one structured problem detected in diagram source. The
//! validator returns them in source order; the repair agent receives them
//! verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a validator finding.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// The source is empty or whitespace only.
    EmptySource,
    /// The first significant line does not declare a known diagram type.
    UnknownDiagramType,
    /// A flowchart header carries an invalid direction.
    InvalidDirection,
    /// Several statements share a line without a `;` separator.
    MissingStatementSeparator,
    /// An opening bracket was never closed on its line.
    UnbalancedBrackets,
    /// A closing bracket does not match the most recent opener.
    MismatchedBracket,
    /// A brace-delimited body (ER entity, class, composite state) never closes.
    UnclosedBody,
    /// A `}` appears with no open body.
    UnexpectedBodyClose,
    /// A keyword block (`subgraph`, `loop`, `alt`, ...) is missing its `end`.
    UnclosedBlock,
    /// An `end` appears with no open block.
    UnexpectedBlockEnd,
    /// An arrow token that the diagram type does not accept.
    DisallowedArrow,
}

impl FindingKind {
    /// Fatal findings stop the scan; nothing after them is checked.
    pub fn is_fatal(self) -> bool {
        matches!(self, FindingKind::EmptySource | FindingKind::UnknownDiagramType)
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FindingKind::EmptySource => "EmptySource",
            FindingKind::UnknownDiagramType => "UnknownDiagramType",
            FindingKind::InvalidDirection => "InvalidDirection",
            FindingKind::MissingStatementSeparator => "MissingStatementSeparator",
            FindingKind::UnbalancedBrackets => "UnbalancedBrackets",
            FindingKind::MismatchedBracket => "MismatchedBracket",
            FindingKind::UnclosedBody => "UnclosedBody",
            FindingKind::UnexpectedBodyClose => "UnexpectedBodyClose",
            FindingKind::UnclosedBlock => "UnclosedBlock",
            FindingKind::UnexpectedBlockEnd => "UnexpectedBlockEnd",
            FindingKind::DisallowedArrow => "DisallowedArrow",
        };
        f.write_str(label)
    }
}

/// A single structured validation finding.
///
/// `line` is 1-based; `0` means the finding applies to the whole source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub line: usize,
    pub message: String,
}

impl Finding {
    pub fn new(kind: FindingKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] line {}: {}", self.kind, self.line, self.message)
    }
}
