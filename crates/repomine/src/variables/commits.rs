use std::sync::Arc;

use async_trait::async_trait;

use super::{Collector, VariableKind};
use crate::api::{ApiClient, ApiError, Query, decode};
use crate::fetch::Paginator;
use crate::github::types::CommitEntry;
use crate::record::{Record, Schema};
use crate::resource::{RepoId, Resource};

pub(super) static SCHEMA: Schema = Schema {
    name: "commits",
    key_column: "html_url",
    columns: &["sha", "author", "committed_at", "message"],
};

/// Commit history, newest first as the API returns it.
///
/// Pages are fetched strictly in order; the history is only meaningful as
/// a sequence.
pub struct CommitsCollector {
    api: Arc<dyn ApiClient>,
    paginator: Paginator,
}

impl CommitsCollector {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            api,
            paginator: Paginator::default(),
        }
    }
}

#[async_trait]
impl Collector for CommitsCollector {
    type Target = RepoId;

    fn kind(&self) -> VariableKind {
        VariableKind::Commits
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    async fn collect(&self, repo: &RepoId) -> Result<Vec<Record>, ApiError> {
        let items = self
            .paginator
            .fetch_route(self.api.as_ref(), &repo.route("/commits"), &Query::new())
            .await?;

        let key = repo.key();
        items
            .into_iter()
            .map(|item| {
                let entry: CommitEntry = decode(item)?;
                let committed_at = entry
                    .commit
                    .author
                    .as_ref()
                    .and_then(|a| a.date)
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default();
                Ok(Record::new(
                    key.clone(),
                    vec![
                        entry.sha.clone(),
                        entry.author_name(),
                        committed_at,
                        entry.summary().to_string(),
                    ],
                ))
            })
            .collect()
    }
}
