//! Engine configuration, fixed at construction time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::GatehouseError;

pub const DEFAULT_USERS_COLLECTION: &str = "users";
pub const DEFAULT_RESET_PASSWORD_LENGTH: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatehouseConfig {
    /// Collection holding accounts; role operations only address it.
    pub users_collection: String,
    /// Mail settings for password resets. Without them resets are refused.
    pub reset_password: Option<ResetPasswordConfig>,
    pub reset_password_length: usize,
}

impl Default for GatehouseConfig {
    fn default() -> Self {
        Self {
            users_collection: DEFAULT_USERS_COLLECTION.to_string(),
            reset_password: None,
            reset_password_length: DEFAULT_RESET_PASSWORD_LENGTH,
        }
    }
}

impl GatehouseConfig {
    pub fn with_reset_password(mut self, reset_password: ResetPasswordConfig) -> Self {
        self.reset_password = Some(reset_password);
        self
    }
}

/// How temporary passwords are mailed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordConfig {
    pub sender_email: String,
    pub sender_email_password: String,
    pub smtp_server: String,
    pub smtp_port: String,
    pub mail_subject: String,
    /// Body of the mail; the first `%s` receives the new password.
    pub mail_content_template: String,
}

impl ResetPasswordConfig {
    /// Build from flat settings as they come from a config file or the environment.
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, GatehouseError> {
        let setting = |name: &str| {
            settings.get(name).cloned().ok_or_else(|| {
                GatehouseError::Internal("Email reset configuration is not correct.".to_string())
            })
        };

        Ok(Self {
            sender_email: setting("senderEmail")?,
            sender_email_password: setting("senderEmailPassword")?,
            smtp_server: setting("smtpServer")?,
            smtp_port: setting("smtpPort")?,
            mail_subject: setting("mailSubject")?,
            mail_content_template: setting("mailContentTemplate")?,
        })
    }
}
