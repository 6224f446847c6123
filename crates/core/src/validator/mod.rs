//! Diagram source validator.
//!
//! [`validate`] is a pure structural check run before any rendering. It
//! catches the mistakes generation models make most often (missing
//! statement separators, unbalanced brackets, unclosed blocks, arrows from
//! the wrong diagram family) and reports them as [`Finding`]s the repair
//! agent can act on. An empty result means the source is accepted.
//!
//! The validator does not depend on the renderer: a source it accepts may
//! still fail to render, which surfaces later as a render error.

pub mod diagram_type;
mod scan;

pub use diagram_type::{classify_input, detect_header, DiagramType, Header};

use diagram_type::significant_lines;
use mg_protocol::finding_models::{Finding, FindingKind};

const DIRECTIONS: &[&str] = &["TB", "TD", "BT", "RL", "LR"];

const SEQUENCE_BLOCKS: &[&str] = &["loop", "alt", "opt", "par", "critical", "break", "rect", "box"];

/// Validates diagram source and returns findings in scan order.
///
/// Fatal findings (`EmptySource`, `UnknownDiagramType`) are returned
/// alone; nothing else is checked after them.
pub fn validate(text: &str) -> Vec<Finding> {
    if text.trim().is_empty() {
        return vec![Finding::new(
            FindingKind::EmptySource,
            0,
            "diagram source is empty",
        )];
    }

    let Some(header) = detect_header(text) else {
        let line = significant_lines(text).next().map_or(1, |(n, _)| n);
        return vec![Finding::new(
            FindingKind::UnknownDiagramType,
            line,
            "first line must declare a diagram type such as 'graph TD', \
             'sequenceDiagram', 'classDiagram', 'stateDiagram-v2' or 'erDiagram'",
        )];
    };

    let mut scanner = Scanner::new(header.diagram_type);

    if header.diagram_type == DiagramType::Flowchart {
        if let Some(trailing) = scanner.check_flowchart_header(&header) {
            scanner.scan_line(header.line, trailing);
        }
    }

    for (number, line) in significant_lines(text).skip(1) {
        scanner.scan_line(number, line);
    }

    scanner.finish()
}

/// Scan state carried across lines.
struct Scanner {
    diagram_type: DiagramType,
    findings: Vec<Finding>,
    /// Opening line numbers of `{ ... }` bodies.
    bodies: Vec<usize>,
    /// Keyword and opening line of `... end` blocks.
    blocks: Vec<(String, usize)>,
    /// Opening line of a multi-line state `note`, whose body is free text.
    note: Option<usize>,
}

impl Scanner {
    fn new(diagram_type: DiagramType) -> Self {
        Self {
            diagram_type,
            findings: Vec::new(),
            bodies: Vec::new(),
            blocks: Vec::new(),
            note: None,
        }
    }

    /// Checks the direction and separator on a flowchart header. Returns
    /// the statements following `;` on the header line, if any.
    fn check_flowchart_header<'a>(&mut self, header: &Header<'a>) -> Option<&'a str> {
        let rest = header.rest.trim_start();
        if rest.is_empty() {
            return None;
        }
        if let Some(after) = rest.strip_prefix(';') {
            return Some(after);
        }

        let end = rest
            .find(|c: char| c.is_whitespace() || c == ';')
            .unwrap_or(rest.len());
        let (direction, remainder) = rest.split_at(end);

        if !DIRECTIONS.contains(&direction) {
            self.findings.push(Finding::new(
                FindingKind::InvalidDirection,
                header.line,
                format!(
                    "'{direction}' is not a flowchart direction; use one of {}",
                    DIRECTIONS.join(", ")
                ),
            ));
            return None;
        }

        let remainder = remainder.trim_start();
        if remainder.is_empty() {
            return None;
        }
        match remainder.strip_prefix(';') {
            Some(after) => Some(after),
            None => {
                self.findings.push(Finding::new(
                    FindingKind::MissingStatementSeparator,
                    header.line,
                    "statements after the header need a newline or ';' separator",
                ));
                None
            }
        }
    }

    fn scan_line(&mut self, number: usize, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if self.skips_note(number, line) {
            return;
        }

        self.track_blocks(number, line);

        let unquoted = scan::strip_quoted(line);
        let mut text = unquoted.trim().to_string();

        if self.diagram_type == DiagramType::EntityRelationship && scan::is_er_relationship(&text)
        {
            text = scan::strip_er_cardinality(&text);
        }

        if self.diagram_type.has_bodies() {
            if text == "}" {
                if self.bodies.pop().is_none() {
                    self.findings.push(Finding::new(
                        FindingKind::UnexpectedBodyClose,
                        number,
                        "'}' does not close any open body",
                    ));
                }
                return;
            }
            if self.opens_body(&text) {
                self.bodies.push(number);
                return;
            }
            if !self.bodies.is_empty() {
                return;
            }
        }

        let text = match self.diagram_type {
            DiagramType::Flowchart => scan::strip_pipe_labels(&text),
            DiagramType::Sequence => scan::before_label(&text).replace("-)", "-"),
            _ => text,
        };

        if self.diagram_type.checks_brackets() {
            if let Some(finding) = scan::check_brackets(&text, number, self.diagram_type) {
                self.findings.push(finding);
            }
        }

        let arrow_text = match self.diagram_type {
            DiagramType::Class | DiagramType::State | DiagramType::EntityRelationship => {
                scan::outside_brackets(scan::before_label(&text))
            }
            _ => scan::outside_brackets(&text),
        };
        if let Some(finding) = scan::check_arrows(&arrow_text, number, self.diagram_type) {
            self.findings.push(finding);
        }
    }

    fn opens_body(&self, text: &str) -> bool {
        if !text.ends_with('{') {
            return false;
        }
        match self.diagram_type {
            DiagramType::Class => text.starts_with("class ") || text.starts_with("namespace "),
            DiagramType::State => text.starts_with("state "),
            DiagramType::EntityRelationship | DiagramType::Requirement => true,
            _ => false,
        }
    }

    /// Consumes lines belonging to a multi-line state `note ... end note`.
    /// A `note` with a `:` is a one-line note and is scanned normally.
    fn skips_note(&mut self, number: usize, line: &str) -> bool {
        if self.diagram_type != DiagramType::State {
            return false;
        }
        if self.note.is_some() {
            if line == "end note" {
                self.note = None;
            }
            return true;
        }
        if line.starts_with("note ") && !line.contains(':') {
            self.note = Some(number);
            return true;
        }
        false
    }

    /// Tracks `subgraph`/`loop`/... openers and their `end`.
    fn track_blocks(&mut self, number: usize, line: &str) {
        let opens: &[&str] = match self.diagram_type {
            DiagramType::Flowchart => &["subgraph"],
            DiagramType::Sequence => SEQUENCE_BLOCKS,
            _ => return,
        };

        for statement in line.split(';') {
            let Some(keyword) = statement.split_whitespace().next() else {
                continue;
            };
            if opens.contains(&keyword) {
                self.blocks.push((keyword.to_string(), number));
            } else if keyword == "end" && self.blocks.pop().is_none() {
                self.findings.push(Finding::new(
                    FindingKind::UnexpectedBlockEnd,
                    number,
                    "'end' does not close any open block",
                ));
            }
        }
    }

    fn finish(mut self) -> Vec<Finding> {
        if let Some(line) = self.note.take() {
            self.findings.push(Finding::new(
                FindingKind::UnclosedBlock,
                line,
                "'note' block is missing its 'end note'",
            ));
        }
        for line in self.bodies.drain(..) {
            self.findings.push(Finding::new(
                FindingKind::UnclosedBody,
                line,
                "body opened with '{' is never closed",
            ));
        }
        for (keyword, line) in self.blocks.drain(..) {
            self.findings.push(Finding::new(
                FindingKind::UnclosedBlock,
                line,
                format!("'{keyword}' block is missing its 'end'"),
            ));
        }
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<FindingKind> {
        validate(text).into_iter().map(|f| f.kind).collect()
    }

    #[test]
    fn test_empty_source() {
        let findings = validate("  \n\t\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::EmptySource);
        assert_eq!(findings[0].line, 0);
    }

    #[test]
    fn test_unknown_type_is_fatal_and_alone() {
        let findings = validate("\n\ndiagram TD\n A[oops --> B");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnknownDiagramType);
        assert_eq!(findings[0].line, 3);
        assert!(findings[0].kind.is_fatal());
    }

    #[test]
    fn test_simple_flowchart_is_clean() {
        assert!(validate("graph TD\n A-->B").is_empty());
        assert!(validate("flowchart LR\n  A[Start] --> B{Decide}\n  B -->|yes| C((Done))\n  B -.-> D[(Store)]\n").is_empty());
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let text = "graph TD\n A-->B\n B-->C";
        let first = validate(text);
        let second = validate(text);
        assert!(first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_line_statements_need_separator() {
        assert_eq!(
            kinds("graph TD A-->B"),
            vec![FindingKind::MissingStatementSeparator]
        );
        assert!(validate("graph TD; A-->B; B-->C").is_empty());
    }

    #[test]
    fn test_header_statements_are_scanned() {
        assert_eq!(
            kinds("graph TD; A[x --> B"),
            vec![FindingKind::UnbalancedBrackets]
        );
    }

    #[test]
    fn test_invalid_direction() {
        let findings = validate("flowchart XY\n A-->B");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::InvalidDirection);
        assert_eq!(findings[0].line, 1);
    }

    #[test]
    fn test_unbalanced_brackets_are_reported_per_line() {
        let findings = validate("graph TD\n A[Start --> B\n B --> C(End");
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, FindingKind::UnbalancedBrackets);
        assert_eq!(findings[0].line, 2);
        assert_eq!(findings[1].line, 3);
    }

    #[test]
    fn test_brackets_inside_quotes_are_ignored() {
        assert!(validate("graph TD\n A[\"Label with ( and ]\"] --> B").is_empty());
    }

    #[test]
    fn test_mismatched_bracket() {
        assert_eq!(
            kinds("graph TD\n A[Start) --> B"),
            vec![FindingKind::MismatchedBracket]
        );
    }

    #[test]
    fn test_subgraph_blocks_must_balance() {
        assert!(validate("graph TD\n subgraph one\n A-->B\n end").is_empty());

        let findings = validate("graph TD\n subgraph one\n A-->B");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnclosedBlock);
        assert_eq!(findings[0].line, 2);

        assert_eq!(
            kinds("graph TD\n A-->B\n end"),
            vec![FindingKind::UnexpectedBlockEnd]
        );
    }

    #[test]
    fn test_sequence_blocks() {
        let ok = "sequenceDiagram\n  Alice->>Bob: Hello :)\n  loop Every minute\n    Bob-)Alice: ping\n  end\n  alt ok\n    A->>B: x\n  else fail\n    A->>B: y\n  end";
        assert!(validate(ok).is_empty());

        assert_eq!(
            kinds("sequenceDiagram\n  opt maybe\n  A->>B: hi"),
            vec![FindingKind::UnclosedBlock]
        );
    }

    #[test]
    fn test_er_cardinality_is_not_a_bracket() {
        let text = "erDiagram\n  CUSTOMER ||--o{ ORDER : places\n  ORDER ||--|{ LINE-ITEM : contains\n  CUSTOMER }|..|{ DELIVERY-ADDRESS : uses";
        assert!(validate(text).is_empty());
    }

    #[test]
    fn test_er_entity_bodies() {
        let ok = "erDiagram\n  CUSTOMER {\n    string name\n    string custNumber PK \"id (unique)\"\n  }\n  CUSTOMER ||--o{ ORDER : places";
        assert!(validate(ok).is_empty());

        let findings = validate("erDiagram\n  CUSTOMER {\n    string name\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnclosedBody);
        assert_eq!(findings[0].line, 2);

        assert_eq!(
            kinds("erDiagram\n  CUSTOMER ||--o{ ORDER : places\n  }"),
            vec![FindingKind::UnexpectedBodyClose]
        );
    }

    #[test]
    fn test_er_rejects_flow_arrows() {
        assert_eq!(
            kinds("erDiagram\n  CUSTOMER --> ORDER : places"),
            vec![FindingKind::DisallowedArrow]
        );
    }

    #[test]
    fn test_class_member_bodies() {
        let ok = "classDiagram\n  class Animal {\n    +String name\n    +eat(food) void\n  }\n  Animal <|-- Duck\n  Duck : +swim()";
        assert!(validate(ok).is_empty());

        assert_eq!(
            kinds("classDiagram\n  class Animal {\n    +eat("),
            vec![FindingKind::UnclosedBody]
        );
    }

    #[test]
    fn test_class_namespace_bodies() {
        let ok = "classDiagram\n    namespace Shapes {\n        class Square\n        class Cube\n    }\n    Square <|-- Cube\n";
        assert!(validate(ok).is_empty());

        assert_eq!(
            kinds("classDiagram\n  namespace Shapes {\n    class Square\n"),
            vec![FindingKind::UnclosedBody]
        );
    }

    #[test]
    fn test_state_note_bodies_are_free_text() {
        let ok = "stateDiagram-v2\n    [*] --> A\n    note right of A\n        waits for (retry\n    end note\n    A --> [*]\n";
        assert!(validate(ok).is_empty());

        assert!(validate("stateDiagram-v2\n  A --> B\n  note left of B : one (liner)").is_empty());
        assert_eq!(
            kinds("stateDiagram-v2\n  A --> B\n  note left of B : broken (liner"),
            vec![FindingKind::UnbalancedBrackets]
        );

        let findings = validate("stateDiagram-v2\n  A --> B\n  note left of B\n    never closed");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnclosedBlock);
        assert_eq!(findings[0].line, 3);
    }

    #[test]
    fn test_state_composite_bodies_nest() {
        let ok = "stateDiagram-v2\n  [*] --> Active\n  state Active {\n    state Inner {\n      [*] --> Idle\n    }\n  }\n  Active --> [*]";
        assert!(validate(ok).is_empty());

        assert_eq!(
            kinds("stateDiagram-v2\n  state Active {\n    state Inner {\n    }\n"),
            vec![FindingKind::UnclosedBody]
        );
    }

    #[test]
    fn test_disallowed_arrows() {
        assert_eq!(
            kinds("graph TD\n A -> B"),
            vec![FindingKind::DisallowedArrow]
        );
        assert_eq!(
            kinds("graph TD\n A => B"),
            vec![FindingKind::DisallowedArrow]
        );
        assert_eq!(
            kinds("stateDiagram-v2\n  A -> B"),
            vec![FindingKind::DisallowedArrow]
        );
        assert_eq!(
            kinds("classDiagram\n  A -> B"),
            vec![FindingKind::DisallowedArrow]
        );
    }

    #[test]
    fn test_arrows_inside_labels_are_ignored() {
        assert!(validate("graph TD\n A[\"x -> y\"] -->|a -> b| B[c => d]").is_empty());
        assert!(validate("stateDiagram-v2\n  A --> B : go -> now").is_empty());
    }

    #[test]
    fn test_mindmap_shapes_are_accepted() {
        assert!(validate("mindmap\n  root((center))\n    id)cloud(\n    id))bang((").is_empty());
    }

    #[test]
    fn test_other_families_accept_plain_content() {
        assert!(validate("pie title Pets\n  \"Dogs\" : 386\n  \"Cats\" : 85").is_empty());
        assert!(validate("gantt\n  title Plan\n  section A\n  Task :a1, 2024-01-01, 30d").is_empty());
        assert!(validate("journey\n  title Day\n  section Work\n    Code: 5: Me").is_empty());
    }

    #[test]
    fn test_comments_and_front_matter_are_skipped() {
        let text = "---\ntitle: Flow\n---\n%% comment with [ bracket\ngraph LR\n  A --> B\n  %% another ( one\n";
        assert!(validate(text).is_empty());
    }
}
