/// Common test fixtures and data structures
use super::{Deserialize, Serialize};

/// Item stored in the `tests_objects` table
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct TestObject {
    pub game: String,
    pub age: String,
    pub ux: String,
    pub number2: usize,
}

impl TestObject {
    pub const TABLE: &'static str = "tests_objects";
    pub const PARTITION_KEY: &'static str = "game";
}
