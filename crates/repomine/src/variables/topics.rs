use std::sync::Arc;

use async_trait::async_trait;

use super::{Collector, VariableKind};
use crate::api::{ApiClient, ApiError, Query, decode};
use crate::github::types::Topics;
use crate::record::{Record, Schema};
use crate::resource::{RepoId, Resource};

pub(super) static SCHEMA: Schema = Schema {
    name: "topics",
    key_column: "html_url",
    columns: &["topic"],
};

/// Repository topics, one row each.
pub struct TopicsCollector {
    api: Arc<dyn ApiClient>,
}

impl TopicsCollector {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for TopicsCollector {
    type Target = RepoId;

    fn kind(&self) -> VariableKind {
        VariableKind::Topics
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    async fn collect(&self, repo: &RepoId) -> Result<Vec<Record>, ApiError> {
        let topics: Topics = decode(self.api.get(&repo.route("/topics"), &Query::new()).await?)?;
        let key = repo.key();
        Ok(topics
            .names
            .into_iter()
            .map(|topic| Record::new(key.clone(), vec![topic]))
            .collect())
    }
}
