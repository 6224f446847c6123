//! Line-level scanning helpers used by the validator.

use super::diagram_type::DiagramType;
use mg_protocol::finding_models::{Finding, FindingKind};

/// ER relationship cardinality markers.
const ER_CARDINALITY: &[&str] = &["||", "|o", "o|", "}o", "o{", "}|", "|{"];

/// Removes `"..."` segments. An unterminated quote swallows the rest of
/// the line.
pub(crate) fn strip_quoted(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_quote = false;
    for c in line.chars() {
        if c == '"' {
            in_quote = !in_quote;
        } else if !in_quote {
            out.push(c);
        }
    }
    out
}

/// Removes flowchart edge labels written as `|label|`.
pub(crate) fn strip_pipe_labels(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_label = false;
    for c in line.chars() {
        if c == '|' {
            in_label = !in_label;
        } else if !in_label {
            out.push(c);
        }
    }
    out
}

/// An ER line that relates two entities rather than opening a body.
pub(crate) fn is_er_relationship(line: &str) -> bool {
    line.contains("--") || line.contains("..")
}

pub(crate) fn strip_er_cardinality(line: &str) -> String {
    ER_CARDINALITY
        .iter()
        .fold(line.to_string(), |acc, token| acc.replace(token, ""))
}

/// Text before the first `:`, where class, state, ER and sequence diagrams
/// start free-form labels.
pub(crate) fn before_label(line: &str) -> &str {
    line.split_once(':').map_or(line, |(head, _)| head)
}

/// Characters not enclosed in any bracket pair.
pub(crate) fn outside_brackets(line: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn closer_for(open: char) -> char {
    match open {
        '[' => ']',
        '(' => ')',
        _ => '}',
    }
}

/// Stack-based bracket balance for one line.
///
/// Reports at most one finding per line. In flowcharts `id>text]` is the
/// asymmetric node shape, so a `>` directly after an identifier character
/// opens a `]`.
pub(crate) fn check_brackets(
    line: &str,
    number: usize,
    diagram_type: DiagramType,
) -> Option<Finding> {
    let mut stack: Vec<char> = Vec::new();
    let mut prev: Option<char> = None;

    for c in line.chars() {
        match c {
            '[' | '(' | '{' => stack.push(c),
            '>' if diagram_type == DiagramType::Flowchart
                && stack.is_empty()
                && prev.is_some_and(|p| p.is_alphanumeric() || p == '_') =>
            {
                stack.push('[');
            }
            ']' | ')' | '}' => match stack.pop() {
                Some(open) if closer_for(open) == c => {}
                Some(open) => {
                    return Some(Finding::new(
                        FindingKind::MismatchedBracket,
                        number,
                        format!("'{c}' closes '{open}', expected '{}'", closer_for(open)),
                    ));
                }
                None => {
                    return Some(Finding::new(
                        FindingKind::MismatchedBracket,
                        number,
                        format!("'{c}' has no matching opening bracket"),
                    ));
                }
            },
            _ => {}
        }
        prev = Some(c);
    }

    stack.last().map(|open| {
        Finding::new(
            FindingKind::UnbalancedBrackets,
            number,
            format!("'{open}' is never closed (expected '{}')", closer_for(*open)),
        )
    })
}

/// `->` not preceded by `-`, `.` or `=`.
fn find_single_dash_arrow(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len().saturating_sub(1)).find(|&i| {
        bytes[i] == b'-'
            && bytes[i + 1] == b'>'
            && (i == 0 || !matches!(bytes[i - 1], b'-' | b'.' | b'='))
    })
}

/// `=>` not preceded by `=`.
fn find_fat_arrow(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len().saturating_sub(1))
        .find(|&i| bytes[i] == b'=' && bytes[i + 1] == b'>' && (i == 0 || bytes[i - 1] != b'='))
}

/// Arrow tokens the diagram type does not accept.
///
/// `text` must already have quotes, labels and bracketed node text removed.
pub(crate) fn check_arrows(
    text: &str,
    number: usize,
    diagram_type: DiagramType,
) -> Option<Finding> {
    let disallowed = |token: &str, hint: &str| {
        Some(Finding::new(
            FindingKind::DisallowedArrow,
            number,
            format!("'{token}' is not a valid arrow here; {hint}"),
        ))
    };

    match diagram_type {
        DiagramType::Flowchart => {
            if find_single_dash_arrow(text).is_some() {
                return disallowed("->", "use '-->'");
            }
            if find_fat_arrow(text).is_some() {
                return disallowed("=>", "use '==>'");
            }
            None
        }
        DiagramType::Class | DiagramType::State => {
            if find_single_dash_arrow(text).is_some() {
                return disallowed("->", "use '-->'");
            }
            None
        }
        DiagramType::EntityRelationship => {
            if text.contains("->") {
                return disallowed(
                    "->",
                    "relationships use cardinality markers such as '||--o{'",
                );
            }
            None
        }
        _ => None,
    }
}
