//! Users: the people units are checked out to and activities are attributed to.

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, Id};

pub type UserId = Id<User>;

// ─────────────────────────────────────────────────────────────────────────────
// Permissions
// ─────────────────────────────────────────────────────────────────────────────

/// Resource kinds a permission flag can apply to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Units,
    Licenses,
    Consumables,
    Users,
    Reports,
    Admin,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    View,
    Edit,
    Add,
}

/// View/edit/add flags for one resource kind.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub view: bool,
    pub edit: bool,
    pub add: bool,
}

impl Access {
    pub const NONE: Access = Access {
        view: false,
        edit: false,
        add: false,
    };
    pub const READ_ONLY: Access = Access {
        view: true,
        edit: false,
        add: false,
    };
    pub const FULL: Access = Access {
        view: true,
        edit: true,
        add: true,
    };

    pub fn allows(&self, op: Operation) -> bool {
        match op {
            Operation::View => self.view,
            Operation::Edit => self.edit,
            Operation::Add => self.add,
        }
    }
}

/// Per-resource permission flags, persisted as one JSON document per user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub units: Access,
    pub licenses: Access,
    pub consumables: Access,
    pub users: Access,
    pub reports: Access,
    pub admin: Access,
}

impl Default for PermissionSet {
    /// New accounts may browse inventory and reports, nothing else.
    fn default() -> Self {
        Self {
            units: Access::READ_ONLY,
            licenses: Access::READ_ONLY,
            consumables: Access::READ_ONLY,
            users: Access::NONE,
            reports: Access::READ_ONLY,
            admin: Access::NONE,
        }
    }
}

impl PermissionSet {
    pub fn full() -> Self {
        Self {
            units: Access::FULL,
            licenses: Access::FULL,
            consumables: Access::FULL,
            users: Access::FULL,
            reports: Access::FULL,
            admin: Access::FULL,
        }
    }

    pub fn access(&self, resource: Resource) -> Access {
        match resource {
            Resource::Units => self.units,
            Resource::Licenses => self.licenses,
            Resource::Consumables => self.consumables,
            Resource::Users => self.users,
            Resource::Reports => self.reports,
            Resource::Admin => self.admin,
        }
    }

    pub fn allows(&self, resource: Resource, op: Operation) -> bool {
        self.access(resource).allows(op)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User record
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: Option<String>,
    pub is_admin: bool,
    pub permissions: PermissionSet,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Administrators bypass the per-resource flags.
    pub fn can(&self, resource: Resource, op: Operation) -> bool {
        self.is_admin || self.permissions.allows(resource, op)
    }

    pub fn revise(&self, patch: UserPatch) -> DomainResult<User> {
        let mut revised = self.clone();
        revised.apply_patch(patch);
        check_profile(&revised.first_name, &revised.last_name, &revised.email)?;
        Ok(revised)
    }
}

fn check_profile(first_name: &str, last_name: &str, email: &str) -> DomainResult<()> {
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(DomainError::validation("first and last name are required"));
    }
    if !email.contains('@') {
        return Err(DomainError::validation(format!("{email:?} is not an email address")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: Option<String>,
    pub is_admin: bool,
    pub permissions: PermissionSet,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            department: None,
            is_admin: false,
            permissions: PermissionSet::default(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        check_profile(&self.first_name, &self.last_name, &self.email)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<Option<String>>,
    pub is_admin: Option<bool>,
    pub permissions: Option<PermissionSet>,
}

impl Entity for User {
    type Draft = NewUser;
    type Patch = UserPatch;

    const KIND: &'static str = "user";

    fn id(&self) -> UserId {
        self.id
    }

    fn from_draft(id: UserId, draft: NewUser) -> Self {
        Self {
            id,
            username: draft.username,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            department: draft.department,
            is_admin: draft.is_admin,
            permissions: draft.permissions,
        }
    }

    fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.department {
            self.department = v;
        }
        if let Some(v) = patch.is_admin {
            self.is_admin = v;
        }
        if let Some(v) = patch.permissions {
            self.permissions = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(is_admin: bool) -> User {
        let mut draft = NewUser::new("jdoe", "Jane", "Doe", "jane@example.com");
        draft.is_admin = is_admin;
        User::from_draft(Id::new(1), draft)
    }

    #[test]
    fn default_permissions_are_read_only_inventory() {
        let user = test_user(false);
        assert!(user.can(Resource::Units, Operation::View));
        assert!(!user.can(Resource::Units, Operation::Edit));
        assert!(!user.can(Resource::Users, Operation::View));
        assert!(!user.can(Resource::Admin, Operation::View));
    }

    #[test]
    fn admins_bypass_flags() {
        let user = test_user(true);
        assert!(user.can(Resource::Users, Operation::Add));
        assert!(user.can(Resource::Admin, Operation::Edit));
    }

    #[test]
    fn permission_set_round_trips_through_json_column_shape() {
        let json = serde_json::to_value(PermissionSet::default()).unwrap();
        assert_eq!(json["units"]["view"], true);
        assert_eq!(json["users"]["add"], false);
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let mut draft = NewUser::new("  ", "Jane", "Doe", "jane@example.com");
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));
        draft.username = "jdoe".into();
        draft.email = "nope".into();
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn patch_clears_nullable_department() {
        let mut user = test_user(false);
        user.department = Some("IT".into());
        user.apply_patch(UserPatch {
            department: Some(None),
            ..UserPatch::default()
        });
        assert_eq!(user.department, None);
        assert_eq!(user.display_name(), "Jane Doe");
    }

    #[test]
    fn revise_keeps_the_profile_valid() {
        let user = test_user(false);
        let blank = UserPatch {
            last_name: Some(" ".into()),
            ..UserPatch::default()
        };
        assert!(matches!(user.revise(blank), Err(DomainError::Validation(_))));

        let promoted = user
            .revise(UserPatch {
                is_admin: Some(true),
                ..UserPatch::default()
            })
            .unwrap();
        assert!(promoted.is_admin);
        assert_eq!(promoted.username, "jdoe");
    }
}
