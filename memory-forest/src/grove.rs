//! Social grove: a fixed list of other forest keepers. Connect requests are
//! remembered per client only; nothing is sent anywhere.

use crate::error::{ForestError, ForestResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Keeper {
    pub name: &'static str,
    pub color: &'static str,
}

impl Keeper {
    pub fn initial(&self) -> char {
        self.name.chars().next().unwrap_or('?')
    }
}

pub const KEEPERS: [Keeper; 3] = [
    Keeper {
        name: "Nadun",
        color: "#047857",
    },
    Keeper {
        name: "Sakuni",
        color: "#b45309",
    },
    Keeper {
        name: "Sewmini",
        color: "#0f766e",
    },
];

#[derive(Default)]
pub struct GroveState {
    sent: Mutex<HashSet<&'static str>>,
}

impl GroveState {
    /// Marks a request as sent. Returns false if it already was.
    pub fn connect(&self, name: &str) -> ForestResult<bool> {
        let keeper = KEEPERS
            .iter()
            .find(|k| k.name == name)
            .ok_or_else(|| ForestError::Validation(format!("Unknown forest keeper: {}", name)))?;
        Ok(self.sent.lock().insert(keeper.name))
    }

    pub fn is_sent(&self, name: &str) -> bool {
        self.sent.lock().contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_once_per_keeper() {
        let grove = GroveState::default();
        assert!(!grove.is_sent("Sakuni"));
        assert!(grove.connect("Sakuni").unwrap());
        assert!(grove.is_sent("Sakuni"));
        assert!(!grove.connect("Sakuni").unwrap());
        assert!(!grove.is_sent("Nadun"));
        assert!(grove.connect("Nobody").unwrap_err().is_validation());
    }
}
