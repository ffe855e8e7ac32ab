//! Built-in curriculum data.

use crate::error::CurriculumError;
use crate::graph::CurriculumGraph;

const MATHS_JSON: &str = include_str!("../data/maths.json");

/// Subject key of the built-in maths taxonomy.
pub const MATHS: &str = "maths";

/// Load the built-in maths taxonomy.
pub fn builtin_graph() -> Result<CurriculumGraph, CurriculumError> {
    CurriculumGraph::from_json(MATHS_JSON)
}
