//! Mermaid diagram kinds and rendering themes.
//!
//! Only blocks whose first keyword names one of the [`DiagramKind`]s are
//! treated as diagrams; everything else stays an ordinary code block.

/// Diagram kinds recognized by their leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    Class,
    State,
    StateV2,
    EntityRelationship,
    Journey,
    Gantt,
    Pie,
    Timeline,
    GitGraph,
}

impl DiagramKind {
    /// Detect the diagram kind from Mermaid source.
    ///
    /// Looks at the first whitespace-delimited token, case-insensitively,
    /// ignoring a trailing `;` (as in `graph TD;`).
    ///
    /// Returns None if the source does not start with a recognized keyword.
    #[must_use]
    pub fn detect(source: &str) -> Option<Self> {
        let token = source.split_whitespace().next()?;
        Self::parse(token.trim_end_matches(';'))
    }

    /// Parse a diagram keyword (case-insensitive).
    #[must_use]
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "graph" | "flowchart" => Some(Self::Flowchart),
            "sequencediagram" => Some(Self::Sequence),
            "classdiagram" => Some(Self::Class),
            "statediagram" => Some(Self::State),
            "statediagram-v2" => Some(Self::StateV2),
            "erdiagram" => Some(Self::EntityRelationship),
            "journey" => Some(Self::Journey),
            "gantt" => Some(Self::Gantt),
            "pie" => Some(Self::Pie),
            "timeline" => Some(Self::Timeline),
            "gitgraph" => Some(Self::GitGraph),
            _ => None,
        }
    }

    /// Canonical Mermaid keyword for this kind.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequenceDiagram",
            Self::Class => "classDiagram",
            Self::State => "stateDiagram",
            Self::StateV2 => "stateDiagram-v2",
            Self::EntityRelationship => "erDiagram",
            Self::Journey => "journey",
            Self::Gantt => "gantt",
            Self::Pie => "pie",
            Self::Timeline => "timeline",
            Self::GitGraph => "gitGraph",
        }
    }
}

/// Mermaid CLI rendering theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Default,
    /// Neutral grayscale theme, suited for printed documents.
    #[default]
    Neutral,
    Dark,
    Forest,
}

impl Theme {
    /// Parse theme from its `mmdc -t` name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "neutral" => Some(Self::Neutral),
            "dark" => Some(Self::Dark),
            "forest" => Some(Self::Forest),
            _ => None,
        }
    }

    /// Return the theme name passed to `mmdc -t`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Neutral => "neutral",
            Self::Dark => "dark",
            Self::Forest => "forest",
        }
    }
}
