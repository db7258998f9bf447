use banyan_types::EntityKind;

/// Storage key of an entity record: `{kind}:{id}`.
pub fn entity_key(kind: EntityKind, id: &str) -> String {
    format!("{}:{}", kind.as_str(), id)
}

/// Scan prefix covering one entity namespace: `{kind}:`.
///
/// The `user:` namespace is shared with inbox and sent-list pointers
/// (`user:{id}:inbox:…`), so listings over it must decode tolerantly.
pub fn entity_prefix(kind: EntityKind) -> String {
    format!("{}:", kind.as_str())
}

/// The five relationship families kept in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Domains owned by a teacher.
    TeacherDomains,
    /// Papers owned by a teacher.
    TeacherPapers,
    /// Papers filed under a domain.
    DomainPapers,
    /// Messages delivered to a user.
    UserInbox,
    /// Messages sent by a user.
    UserSent,
}

impl Relation {
    /// Scan prefix enumerating every child attached to `parent`.
    pub fn prefix(&self, parent: &str) -> String {
        match self {
            Relation::TeacherDomains => format!("teacher:{}:domain:", parent),
            Relation::TeacherPapers => format!("teacher:{}:paper:", parent),
            Relation::DomainPapers => format!("domain:{}:paper:", parent),
            Relation::UserInbox => format!("user:{}:inbox:", parent),
            Relation::UserSent => format!("user:{}:sent:", parent),
        }
    }

    /// Full pointer key for one parent/child pair.
    pub fn key(&self, parent: &str, child: &str) -> String {
        format!("{}{}", self.prefix(parent), child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_keys_are_kind_prefixed() {
        assert_eq!(entity_key(EntityKind::User, "u-1"), "user:u-1");
        assert_eq!(entity_key(EntityKind::Paper, "p-1"), "paper:p-1");
        assert_eq!(entity_prefix(EntityKind::Domain), "domain:");
    }

    #[test]
    fn relation_keys_match_the_stored_layout() {
        assert_eq!(
            Relation::TeacherDomains.key("t-1", "d-1"),
            "teacher:t-1:domain:d-1"
        );
        assert_eq!(
            Relation::TeacherPapers.key("t-1", "p-1"),
            "teacher:t-1:paper:p-1"
        );
        assert_eq!(
            Relation::DomainPapers.key("d-1", "p-1"),
            "domain:d-1:paper:p-1"
        );
        assert_eq!(
            Relation::UserInbox.key("u-2", "m-1"),
            "user:u-2:inbox:m-1"
        );
        assert_eq!(Relation::UserSent.key("u-1", "m-1"), "user:u-1:sent:m-1");
    }

    #[test]
    fn relation_key_extends_its_own_prefix() {
        for relation in [
            Relation::TeacherDomains,
            Relation::TeacherPapers,
            Relation::DomainPapers,
            Relation::UserInbox,
            Relation::UserSent,
        ] {
            let key = relation.key("parent", "child");
            assert!(key.starts_with(&relation.prefix("parent")));
            assert!(key.ends_with("child"));
        }
    }
}
