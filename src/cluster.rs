use serde::{Deserialize, Serialize};
use std::fmt;

/// A discovered template and the count of lines merged into it.
///
/// `template.len()` is fixed at creation time and never changes; individual
/// positions may generalize from a concrete token to the wildcard marker
/// but never revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCluster {
    pub template: Vec<String>,
    pub id: usize,
    pub size: usize,
}

impl LogCluster {
    pub fn new(template: Vec<String>, id: usize) -> Self {
        Self {
            template,
            id,
            size: 1,
        }
    }

    pub fn get_template(&self) -> String {
        self.template.join(" ")
    }
}

impl fmt::Display for LogCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={{{}}} : size={{{}}} : {}",
            self.id,
            self.size,
            self.get_template()
        )
    }
}
