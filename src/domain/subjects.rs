//! Host entities whose detail pages link into a pre-filtered audit log.

use std::fmt;

/// A user, group or repository shown by the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    User(String),
    Group(String),
    Repository { namespace: String, name: String },
}

impl Subject {
    /// Label under which the backend files entries about this kind of entity.
    pub fn label(&self) -> &'static str {
        match self {
            Subject::User(_) => "user",
            Subject::Group(_) => "group",
            Subject::Repository { .. } => "repository",
        }
    }

    /// Entity identifier as recorded in the audit log.
    pub fn entity(&self) -> String {
        match self {
            Subject::User(name) | Subject::Group(name) => name.clone(),
            Subject::Repository { namespace, name } => format!("{namespace}/{name}"),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label(), self.entity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_entity_joins_namespace_and_name() {
        let subject = Subject::Repository {
            namespace: "hitchhiker".into(),
            name: "heart-of-gold".into(),
        };
        assert_eq!(subject.label(), "repository");
        assert_eq!(subject.entity(), "hitchhiker/heart-of-gold");
    }

    #[test]
    fn user_and_group_use_their_name() {
        assert_eq!(Subject::User("trillian".into()).entity(), "trillian");
        assert_eq!(Subject::Group("crew".into()).label(), "group");
    }
}
