/// Neutral parse tree for the tag surface syntax.
///
/// The grammar front-end lowers into these nodes; the emitter consumes
/// nothing else, so swapping the parser runtime never touches compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Free text between tags, still in source form.
    Text(String),
    Tag(TagNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    pub name: String,
    /// Bare identifier arguments (window names).
    pub idents: Vec<String>,
    /// Integer literal arguments.
    pub ints: Vec<i64>,
    /// Bracketed sub-block content (the speaker block of a dialogue tag).
    pub children: Option<Vec<Node>>,
}

impl TagNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            idents: Vec::new(),
            ints: Vec::new(),
            children: None,
        }
    }
}
