use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Item {
    pub name: String,
    /// Commission items go on commission rows, never on quantity/price lines
    #[serde(default)]
    pub commission_item: bool,
}
