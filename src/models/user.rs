use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Role/capability tags attached to a user identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTag {
    Admin,
    User,
    Grader,
    Examiner,
    Manager,
    Limited,
    Banned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub uid: String,
    pub tags: Vec<UserTag>,
    pub banned: bool,
}

impl UserEntry {
    /// Authorization predicate: the user must hold every required tag.
    pub fn requires(&self, required: &[UserTag]) -> bool {
        holds_all(&self.tags, required)
    }

    pub fn is_admin(&self) -> bool {
        holds_all(&self.tags, &[UserTag::Admin])
    }
}

/// The same predicate for callers identified only by a tag set.
pub fn holds_all(tags: &[UserTag], required: &[UserTag]) -> bool {
    required.iter().all(|t| tags.contains(t))
}

pub fn require_admin(tags: &[UserTag]) -> Result<()> {
    if holds_all(tags, &[UserTag::Admin]) {
        Ok(())
    } else {
        Err(Error::Forbidden("admin tag required".to_string()))
    }
}

/// Graders and admins may work the review queue.
pub fn require_grader(tags: &[UserTag]) -> Result<()> {
    if holds_all(tags, &[UserTag::Grader]) || holds_all(tags, &[UserTag::Admin]) {
        Ok(())
    } else {
        Err(Error::Forbidden("grader tag required".to_string()))
    }
}

/// External user directory. The core only needs lookups, ban status and
/// password checks; account storage itself lives elsewhere.
pub trait UserDirectory: Send + Sync {
    fn get_user(&self, uid: &str) -> Option<UserEntry>;
    fn verify_password(&self, uid: &str, password: &str) -> bool;
    fn set_password(&self, uid: &str, new_password: &str) -> Result<()>;
}
