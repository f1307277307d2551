//! A named snapshot of a project: its declaration graph plus the inputs it
//! was built from.

use crate::graph::FrozenGraph;

/// One version of a project.
#[derive(Debug)]
pub struct ProjectVersion {
    pub name: String,
    /// Source files the graph was built from.
    pub files: Vec<String>,
    pub include_paths: Vec<String>,
    pub graph: FrozenGraph,
}

impl ProjectVersion {
    pub fn new(name: impl Into<String>, graph: FrozenGraph) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            include_paths: Vec::new(),
            graph,
        }
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_include_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_paths = paths.into_iter().map(Into::into).collect();
        self
    }
}
