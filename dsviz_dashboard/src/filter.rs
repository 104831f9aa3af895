use crate::error::ConfigError;
use dsviz_protocol::StructureKind;
use std::str::FromStr;

/// Category selected by the user. Read by the view dispatcher on every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    #[default]
    All,
    List,
    Stack,
    Queue,
    BinaryTree,
}

impl FilterState {
    pub const ALL: [FilterState; 5] = [
        FilterState::All,
        FilterState::List,
        FilterState::Stack,
        FilterState::Queue,
        FilterState::BinaryTree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterState::All => "all",
            FilterState::List => "list",
            FilterState::Stack => "stack",
            FilterState::Queue => "queue",
            FilterState::BinaryTree => "binary_tree",
        }
    }

    pub fn admits(&self, kind: &StructureKind) -> bool {
        match self {
            FilterState::All => true,
            _ => self.selects_only(kind),
        }
    }

    pub fn selects_only(&self, kind: &StructureKind) -> bool {
        matches!(
            (self, kind),
            (FilterState::List, StructureKind::List)
                | (FilterState::Stack, StructureKind::Stack)
                | (FilterState::Queue, StructureKind::Queue)
                | (FilterState::BinaryTree, StructureKind::BinaryTree)
        )
    }
}

impl FromStr for FilterState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FilterState::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownFilter(s.to_string()))
    }
}

impl std::fmt::Display for FilterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_admits_everything_known_and_unknown() {
        assert!(FilterState::All.admits(&StructureKind::Queue));
        assert!(FilterState::All.admits(&StructureKind::Other("heap".into())));
    }

    #[test]
    fn single_filter_admits_only_its_kind() {
        assert!(FilterState::Stack.admits(&StructureKind::Stack));
        assert!(!FilterState::Stack.admits(&StructureKind::List));
        assert!(!FilterState::BinaryTree.admits(&StructureKind::Other("tree".into())));
    }

    #[test]
    fn parses_names() {
        assert_eq!("binary_tree".parse::<FilterState>().unwrap(), FilterState::BinaryTree);
        assert_eq!(" Stack ".parse::<FilterState>().unwrap(), FilterState::Stack);
        assert!("heap".parse::<FilterState>().is_err());
    }
}
