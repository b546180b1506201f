//! The operations this core knows how to authorize and compute.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// How a resource path addresses its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convention {
    /// `/<class>/<id>/<action>`
    GrantRecall,
    /// `/<class>/<id>/<field>/<action>`
    FieldMutation,
}

impl Convention {
    /// Number of segments produced by splitting a conforming path on `/`,
    /// counting the empty segment before the leading slash.
    pub fn segment_count(&self) -> usize {
        match self {
            Convention::GrantRecall => 4,
            Convention::FieldMutation => 5,
        }
    }
}

/// A core operation. The string form is the action literal used in paths.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    #[strum(serialize = "grantRole")]
    GrantRole,
    #[strum(serialize = "recallRole")]
    RecallRole,
    #[strum(serialize = "appendUnique")]
    #[serde(rename = "appendUnique")]
    Append,
    #[strum(serialize = "remove")]
    Remove,
    #[strum(serialize = "register")]
    Register,
    #[strum(serialize = "login")]
    Login,
    #[strum(serialize = "changePassword")]
    ChangePassword,
    #[strum(serialize = "resetPassword")]
    ResetPassword,
}

impl Operation {
    /// Human label used at the start of error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::GrantRole => "Grant role",
            Operation::RecallRole => "Recall role",
            Operation::Append => "Append",
            Operation::Remove => "Remove",
            Operation::Register => "Register",
            Operation::Login => "Login",
            Operation::ChangePassword => "Change password",
            Operation::ResetPassword => "Reset password",
        }
    }

    /// Path convention for operations that address an entity.
    pub fn convention(&self) -> Option<Convention> {
        match self {
            Operation::GrantRole | Operation::RecallRole => Some(Convention::GrantRecall),
            Operation::Append | Operation::Remove => Some(Convention::FieldMutation),
            _ => None,
        }
    }

    /// Whether the request body names roles the caller must already hold.
    pub fn mutates_roles(&self) -> bool {
        matches!(self, Operation::GrantRole | Operation::RecallRole)
    }

    /// Message naming the expected path shape.
    pub fn usage(&self) -> String {
        match self.convention() {
            Some(Convention::GrantRecall) => format!(
                "{} can only be used on user objects. Ex: '/users/{{id}}/{}'",
                self.label(),
                self
            ),
            Some(Convention::FieldMutation) => format!(
                "{} can only be used on array fields. Ex: '/groups/{{id}}/members/{}'",
                self.label(),
                self
            ),
            None => format!("{} does not address an entity.", self.label()),
        }
    }
}
