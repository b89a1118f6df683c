//! Statement messages and the report description items rendered from them.

use serde::Serialize;
use std::fmt;

/// Phase of a statement inside a Given/When/Then chain.
///
/// The declaration order is the only legal registration order, so the derived
/// `Ord` is used to reject statements added out of sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Given,
    AndGiven,
    When,
    Then,
    AndThen,
}

impl Phase {
    /// The keyword printed in front of a statement of this phase.
    pub fn prefix(self) -> &'static str {
        match self {
            Phase::Given => "GIVEN",
            Phase::When => "WHEN",
            Phase::Then => "THEN",
            Phase::AndGiven | Phase::AndThen => "AND",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Given => "GIVEN",
            Phase::AndGiven => "AND GIVEN",
            Phase::When => "WHEN",
            Phase::Then => "THEN",
            Phase::AndThen => "AND THEN",
        };
        f.write_str(name)
    }
}

/// A registered statement: its phase and the user supplied message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StmtMsg {
    phase: Phase,
    message: String,
}

impl StmtMsg {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        StmtMsg {
            phase,
            message: message.into(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StmtMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.phase.prefix(), self.message)
    }
}

/// One line of a test report's description, e.g. `GIVEN` / `one`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionItem {
    pub prefix: String,
    pub label: String,
}

impl From<&StmtMsg> for DescriptionItem {
    fn from(msg: &StmtMsg) -> Self {
        DescriptionItem {
            prefix: msg.phase.prefix().to_string(),
            label: msg.message.clone(),
        }
    }
}

impl fmt::Display for DescriptionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.prefix, self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_phases_share_the_and_prefix() {
        assert_eq!(StmtMsg::new(Phase::AndGiven, "more").to_string(), "AND more");
        assert_eq!(StmtMsg::new(Phase::AndThen, "again").to_string(), "AND again");
        assert_eq!(StmtMsg::new(Phase::When, "act").to_string(), "WHEN act");
    }

    #[test]
    fn phases_are_ordered_by_chain_position() {
        assert!(Phase::Given < Phase::AndGiven);
        assert!(Phase::AndGiven < Phase::When);
        assert!(Phase::When < Phase::Then);
        assert!(Phase::Then < Phase::AndThen);
    }

    #[test]
    fn description_item_copies_prefix_and_label() {
        let item = DescriptionItem::from(&StmtMsg::new(Phase::Then, "is 5"));
        assert_eq!(item.prefix, "THEN");
        assert_eq!(item.label, "is 5");
    }
}
