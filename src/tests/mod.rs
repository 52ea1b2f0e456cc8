mod reconcile;

use crate::types::PolicySet;

pub(crate) const DATA: &[u8] = include_bytes!("resources/data.json");

pub(crate) fn data() -> PolicySet {
    crate::parse_policies(DATA).expect("fixture parses")
}
