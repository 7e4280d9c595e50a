//! Component types used by the demo scenario.

use engine_component::Component;

/// A numeric stat that several entities may share.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub val: i64,
}

impl Component for Stat {
    fn type_name() -> &'static str {
        "Stat"
    }
}

/// A free-form label.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub val: String,
}

impl Component for Label {
    fn type_name() -> &'static str {
        "Label"
    }
}
