//! Name-pattern buckets that choose the shape of a generated test stub.

/// Shape of a generated test body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubKind {
    /// Call with `None` placeholders and assert the result is not `None`.
    ReturnsValue,
    /// Call with `None` placeholders and assert the result is a `bool`.
    ReturnsBool,
    /// Call with `0` placeholders and assert the result is not `None`.
    Calculates,
    /// Call with `None` placeholders and leave TODO markers.
    Todo,
}

impl StubKind {
    /// Placeholder literal passed for each positional argument.
    pub fn placeholder(&self) -> &'static str {
        match self {
            StubKind::Calculates => "0",
            _ => "None",
        }
    }
}

/// One entry of a heuristic table: a name matches when it contains any of the
/// keywords, compared case-insensitively.
#[derive(Debug, Clone, Copy)]
pub struct Bucket {
    pub keywords: &'static [&'static str],
    pub kind: StubKind,
}

impl Bucket {
    /// `lowered` must already be lowercase.
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|kw| lowered.contains(kw))
    }
}

/// Buckets for top-level functions, in precedence order.
pub const FUNCTION_BUCKETS: &[Bucket] = &[
    Bucket {
        keywords: &["get", "fetch", "retrieve"],
        kind: StubKind::ReturnsValue,
    },
    Bucket {
        keywords: &["is_", "has_", "check"],
        kind: StubKind::ReturnsBool,
    },
    Bucket {
        keywords: &["calculate", "compute", "sum"],
        kind: StubKind::Calculates,
    },
];

/// Buckets for methods, in precedence order.
pub const METHOD_BUCKETS: &[Bucket] = &[
    Bucket {
        keywords: &["get", "fetch"],
        kind: StubKind::ReturnsValue,
    },
    Bucket {
        keywords: &["is_", "has_"],
        kind: StubKind::ReturnsBool,
    },
];

/// First bucket matching `name`, or [`StubKind::Todo`].
pub fn select_stub(name: &str, buckets: &[Bucket]) -> StubKind {
    let lowered = name.to_lowercase();
    buckets
        .iter()
        .find(|bucket| bucket.matches(&lowered))
        .map_or(StubKind::Todo, |bucket| bucket.kind)
}
