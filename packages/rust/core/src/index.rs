//! Program → owning school lookup.

use std::collections::HashMap;

use coursegen_shared::Catalog;

/// Reverse index from program prefix to the prefix of the school listing it.
#[derive(Debug, Clone, Default)]
pub struct ProgramIndex {
    owners: HashMap<String, String>,
}

impl ProgramIndex {
    /// Build from a catalog. When several schools list the same program, the
    /// one appearing last in catalog order wins.
    pub fn build(catalog: &Catalog) -> Self {
        let owners = catalog
            .pairs()
            .map(|(school, program)| (program.to_string(), school.to_string()))
            .collect();
        Self { owners }
    }

    pub fn school_for(&self, program: &str) -> Option<&str> {
        self.owners.get(program).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
