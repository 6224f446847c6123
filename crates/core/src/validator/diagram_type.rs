//! Diagram type detection and input routing.

use mg_protocol::run_models::InputKind;

/// Diagram families accepted by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramType {
    Flowchart,
    Sequence,
    Class,
    State,
    EntityRelationship,
    Journey,
    Gantt,
    Pie,
    GitGraph,
    Mindmap,
    Timeline,
    Quadrant,
    Requirement,
}

/// Header keywords, longest variants first.
const KEYWORDS: &[(&str, DiagramType)] = &[
    ("flowchart", DiagramType::Flowchart),
    ("graph", DiagramType::Flowchart),
    ("sequenceDiagram", DiagramType::Sequence),
    ("classDiagram-v2", DiagramType::Class),
    ("classDiagram", DiagramType::Class),
    ("stateDiagram-v2", DiagramType::State),
    ("stateDiagram", DiagramType::State),
    ("erDiagram", DiagramType::EntityRelationship),
    ("journey", DiagramType::Journey),
    ("gantt", DiagramType::Gantt),
    ("pie", DiagramType::Pie),
    ("gitGraph", DiagramType::GitGraph),
    ("mindmap", DiagramType::Mindmap),
    ("timeline", DiagramType::Timeline),
    ("quadrantChart", DiagramType::Quadrant),
    ("requirementDiagram", DiagramType::Requirement),
];

impl DiagramType {
    /// Whether `{ ... }` spanning several lines is part of the grammar.
    pub(crate) fn has_bodies(self) -> bool {
        matches!(
            self,
            DiagramType::Class
                | DiagramType::State
                | DiagramType::EntityRelationship
                | DiagramType::Requirement
        )
    }

    /// Mindmap shapes such as `id)cloud(` reuse brackets inverted.
    pub(crate) fn checks_brackets(self) -> bool {
        !matches!(self, DiagramType::Mindmap)
    }
}

/// A recognized diagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    pub diagram_type: DiagramType,
    /// 1-based line number of the header.
    pub line: usize,
    /// Text after the keyword on the header line.
    pub rest: &'a str,
}

/// Matches `line` (already trimmed) against the known keywords.
///
/// The keyword must be followed by whitespace, `;` or end of line, so
/// `graphs` and `pie-chart` are not headers.
pub fn match_keyword(line: &str) -> Option<(DiagramType, &str)> {
    KEYWORDS.iter().find_map(|(keyword, diagram_type)| {
        let rest = line.strip_prefix(keyword)?;
        match rest.chars().next() {
            None => Some((*diagram_type, rest)),
            Some(c) if c.is_whitespace() || c == ';' => Some((*diagram_type, rest)),
            Some(_) => None,
        }
    })
}

/// Yields `(line_number, trimmed_text)` for every line that carries
/// diagram content: blank lines, `%%` comments and directives, and a
/// leading `---` front-matter block are skipped.
pub fn significant_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut in_front_matter = false;
    let mut seen_content = false;

    text.lines().enumerate().filter_map(move |(idx, raw)| {
        let line = raw.trim();
        if in_front_matter {
            if line == "---" {
                in_front_matter = false;
            }
            return None;
        }
        if line.is_empty() || line.starts_with("%%") {
            return None;
        }
        if !seen_content && line == "---" {
            in_front_matter = true;
            seen_content = true;
            return None;
        }
        seen_content = true;
        Some((idx + 1, line))
    })
}

/// Finds the diagram header: the first significant line, if it starts
/// with a known keyword.
pub fn detect_header(text: &str) -> Option<Header<'_>> {
    let (line, first) = significant_lines(text).next()?;
    let (diagram_type, rest) = match_keyword(first)?;
    Some(Header {
        diagram_type,
        line,
        rest,
    })
}

/// Classifies raw user input for the router.
///
/// Text whose first significant line is a diagram header is treated as
/// diagram source; everything else is a natural-language request.
pub fn classify_input(text: &str) -> InputKind {
    if detect_header(text).is_some() {
        InputKind::DiagramSource
    } else {
        InputKind::NaturalLanguage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_requires_separator() {
        assert_eq!(
            match_keyword("graph TD").map(|(t, _)| t),
            Some(DiagramType::Flowchart)
        );
        assert_eq!(
            match_keyword("graph;A-->B").map(|(t, r)| (t, r)),
            Some((DiagramType::Flowchart, ";A-->B"))
        );
        assert!(match_keyword("graphs are nice").is_none());
        assert!(match_keyword("pie-chart").is_none());
    }

    #[test]
    fn test_v2_variants_are_recognized() {
        assert_eq!(
            match_keyword("stateDiagram-v2").map(|(t, _)| t),
            Some(DiagramType::State)
        );
        assert_eq!(
            match_keyword("classDiagram-v2").map(|(t, _)| t),
            Some(DiagramType::Class)
        );
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert!(match_keyword("SequenceDiagram").is_none());
        assert!(match_keyword("Graph TD").is_none());
    }

    #[test]
    fn test_header_skips_comments_and_front_matter() {
        let text = "\n---\ntitle: Demo\n---\n%%{init: {'theme':'dark'}}%%\n%% note\nsequenceDiagram\n  A->>B: hi\n";
        let header = detect_header(text).unwrap();
        assert_eq!(header.diagram_type, DiagramType::Sequence);
        assert_eq!(header.line, 7);
    }

    #[test]
    fn test_classify_input() {
        assert_eq!(classify_input("graph TD\n A-->B"), InputKind::DiagramSource);
        assert_eq!(
            classify_input("  erDiagram\n CUSTOMER ||--o{ ORDER : places"),
            InputKind::DiagramSource
        );
        assert_eq!(
            classify_input("Draw a login flow with retries"),
            InputKind::NaturalLanguage
        );
        assert_eq!(classify_input(""), InputKind::NaturalLanguage);
    }
}
