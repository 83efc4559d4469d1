use std::sync::Arc;

use async_trait::async_trait;

use super::{Collector, VariableKind};
use crate::api::{ApiClient, ApiError, Query, decode};
use crate::github::types::UserProfile;
use crate::record::{Record, Schema};
use crate::resource::{Resource, UserId};

pub(super) static SCHEMA: Schema = Schema {
    name: "users",
    key_column: "user_id",
    columns: &[
        "login",
        "id",
        "name",
        "company",
        "location",
        "email",
        "bio",
        "public_repos",
        "followers",
        "created_at",
    ],
};

/// Public profile of a user account.
pub struct UsersCollector {
    api: Arc<dyn ApiClient>,
}

impl UsersCollector {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for UsersCollector {
    type Target = UserId;

    fn kind(&self) -> VariableKind {
        VariableKind::Users
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    async fn collect(&self, user: &UserId) -> Result<Vec<Record>, ApiError> {
        let profile: UserProfile = decode(self.api.get(&user.route(""), &Query::new()).await?)?;
        Ok(vec![Record::new(
            user.key(),
            vec![
                profile.login,
                profile.id.to_string(),
                profile.name.unwrap_or_default(),
                profile.company.unwrap_or_default(),
                profile.location.unwrap_or_default(),
                profile.email.unwrap_or_default(),
                profile.bio.unwrap_or_default(),
                profile.public_repos.to_string(),
                profile.followers.to_string(),
                profile.created_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
            ],
        )])
    }
}
