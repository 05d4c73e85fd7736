use chrono::Utc;
use haven_shared::constants::MAX_FIELD_LEN;
use haven_shared::{UserId, ValidationError};
use haven_store::{ProfilePatch, StoreError, User};
use serde::Deserialize;
use tracing::info;

use crate::error::{user_lookup, CoreError, Result};
use crate::identity::Actor;
use crate::service::Haven;

/// Profile fields a user may change. `None` keeps the current value; the
/// email address is not editable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub photo_url: Option<String>,
}

fn clean(field: &'static str, value: Option<String>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) => {
            let v = v.trim().to_string();
            if v.chars().count() > MAX_FIELD_LEN {
                return Err(ValidationError::TooLong {
                    field,
                    max: MAX_FIELD_LEN,
                }
                .into());
            }
            Ok(Some(v))
        }
    }
}

impl Haven {
    pub fn get_profile(&self, user: UserId) -> Result<User> {
        match self.db()?.get_user(user) {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => Err(CoreError::TargetNotFound(user.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_profile(&self, actor: &Actor, update: ProfileUpdate) -> Result<User> {
        let display_name = clean("display name", update.display_name)?;
        if matches!(display_name.as_deref(), Some("")) {
            return Err(ValidationError::Empty {
                field: "display name",
            }
            .into());
        }
        let patch = ProfilePatch {
            display_name,
            phone: clean("phone", update.phone)?,
            address: clean("address", update.address)?,
            photo_url: update.photo_url,
        };

        let user = self
            .db()?
            .update_profile(actor.uid, &patch, Utc::now())
            .map_err(user_lookup)?;
        info!(user_id = %actor.uid, "profile updated");
        Ok(user)
    }
}
