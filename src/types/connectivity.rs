use serde::{Deserialize, Serialize};

/// What the connectivity collaborator last reported.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Disconnected,
    /// Connected, but over a network that may be billed per byte.
    Metered,
    Unmetered,
}

impl Connectivity {
    /// Folds the two raw signals into one value. An unmetered signal without
    /// the network signal is still treated as unmetered.
    pub fn from_flags(network: bool, unmetered: bool) -> Self {
        match (network, unmetered) {
            (_, true) => Connectivity::Unmetered,
            (true, false) => Connectivity::Metered,
            (false, false) => Connectivity::Disconnected,
        }
    }

    pub fn has_network(self) -> bool {
        self != Connectivity::Disconnected
    }

    pub fn has_unmetered_network(self) -> bool {
        self == Connectivity::Unmetered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        use Connectivity::*;

        assert_eq!(Connectivity::from_flags(false, false), Disconnected);
        assert_eq!(Connectivity::from_flags(true, false), Metered);
        assert_eq!(Connectivity::from_flags(true, true), Unmetered);
        assert_eq!(Connectivity::from_flags(false, true), Unmetered);

        assert!(!Disconnected.has_network());
        assert!(Metered.has_network());
        assert!(!Metered.has_unmetered_network());
        assert!(Unmetered.has_network() && Unmetered.has_unmetered_network());
    }
}
