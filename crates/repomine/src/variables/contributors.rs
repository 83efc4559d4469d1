use std::sync::Arc;

use async_trait::async_trait;

use super::{Collector, VariableKind};
use crate::api::{ApiClient, ApiError, decode, query};
use crate::fetch::Paginator;
use crate::github::types::Contributor;
use crate::record::{Record, Schema};
use crate::resource::{RepoId, Resource};

pub(super) static SCHEMA: Schema = Schema {
    name: "contributors",
    key_column: "html_url",
    columns: &["contributor", "contributor_type", "contributions"],
};

/// Contributors of a repository, anonymous ones included.
pub struct ContributorsCollector {
    api: Arc<dyn ApiClient>,
    paginator: Paginator,
}

impl ContributorsCollector {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            api,
            paginator: Paginator::default(),
        }
    }
}

#[async_trait]
impl Collector for ContributorsCollector {
    type Target = RepoId;

    fn kind(&self) -> VariableKind {
        VariableKind::Contributors
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    async fn collect(&self, repo: &RepoId) -> Result<Vec<Record>, ApiError> {
        let items = self
            .paginator
            .fetch_route(
                self.api.as_ref(),
                &repo.route("/contributors"),
                &query(&[("anon", "1")]),
            )
            .await?;

        let key = repo.key();
        items
            .into_iter()
            .map(|item| {
                let contributor: Contributor = decode(item)?;
                Ok(Record::new(
                    key.clone(),
                    vec![
                        contributor.display_name(),
                        contributor.kind,
                        contributor.contributions.to_string(),
                    ],
                ))
            })
            .collect()
    }
}
