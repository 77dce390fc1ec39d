//! File-level repository mutations

use bytes::Bytes;
use std::fmt;

/// Kind of file action, as understood by the commit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Create,
    Update,
    Move,
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Move => "move",
            ActionKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file mutation destined for a single commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create { path: String, content: Bytes },
    Update { path: String, content: Bytes },
    /// Rename `from_path` to `to_path`, replacing its content
    Move {
        from_path: String,
        to_path: String,
        content: Bytes,
    },
    Delete { path: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Create { .. } => ActionKind::Create,
            Action::Update { .. } => ActionKind::Update,
            Action::Move { .. } => ActionKind::Move,
            Action::Delete { .. } => ActionKind::Delete,
        }
    }

    /// Path the action writes to (or removes).
    pub fn path(&self) -> &str {
        match self {
            Action::Create { path, .. } | Action::Update { path, .. } | Action::Delete { path } => {
                path
            }
            Action::Move { to_path, .. } => to_path,
        }
    }

    /// Source path of a move.
    pub fn previous_path(&self) -> Option<&str> {
        match self {
            Action::Move { from_path, .. } => Some(from_path),
            _ => None,
        }
    }

    pub fn content(&self) -> Option<&Bytes> {
        match self {
            Action::Create { content, .. }
            | Action::Update { content, .. }
            | Action::Move { content, .. } => Some(content),
            Action::Delete { .. } => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move {
                from_path, to_path, ..
            } => write!(f, "move {} -> {}", from_path, to_path),
            other => write!(f, "{} {}", other.kind(), other.path()),
        }
    }
}

/// Per-kind counts of dashboard actions (the history write is not counted).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub created: usize,
    pub updated: usize,
    pub moved: usize,
    pub deleted: usize,
}

impl ChangeSummary {
    pub fn record(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Create => self.created += 1,
            ActionKind::Update => self.updated += 1,
            ActionKind::Move => self.moved += 1,
            ActionKind::Delete => self.deleted += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.moved + self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} ~{} >{} -{}",
            self.created, self.updated, self.moved, self.deleted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_accessors() {
        let mv = Action::Move {
            from_path: "/a.json".into(),
            to_path: "/b.json".into(),
            content: Bytes::from_static(b"{}"),
        };
        assert_eq!(mv.kind(), ActionKind::Move);
        assert_eq!(mv.path(), "/b.json");
        assert_eq!(mv.previous_path(), Some("/a.json"));
        assert_eq!(mv.to_string(), "move /a.json -> /b.json");

        let del = Action::Delete {
            path: "/a.json".into(),
        };
        assert!(del.content().is_none());
        assert!(del.previous_path().is_none());
        assert_eq!(del.to_string(), "delete /a.json");
    }

    #[test]
    fn test_change_summary() {
        let mut summary = ChangeSummary::default();
        assert!(summary.is_empty());

        summary.record(ActionKind::Create);
        summary.record(ActionKind::Create);
        summary.record(ActionKind::Update);
        summary.record(ActionKind::Delete);

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.to_string(), "+2 ~1 >0 -1");
    }
}
