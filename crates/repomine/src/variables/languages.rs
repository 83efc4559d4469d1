use std::sync::Arc;

use async_trait::async_trait;

use super::{Collector, VariableKind};
use crate::api::{ApiClient, ApiError, Query};
use crate::record::{Record, Schema};
use crate::resource::{RepoId, Resource};

pub(super) static SCHEMA: Schema = Schema {
    name: "languages",
    key_column: "html_url",
    columns: &["language", "num_chars"],
};

/// Language breakdown of a repository, largest first.
pub struct LanguagesCollector {
    api: Arc<dyn ApiClient>,
}

impl LanguagesCollector {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for LanguagesCollector {
    type Target = RepoId;

    fn kind(&self) -> VariableKind {
        VariableKind::Languages
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    async fn collect(&self, repo: &RepoId) -> Result<Vec<Record>, ApiError> {
        let body = self.api.get(&repo.route("/languages"), &Query::new()).await?;
        let map = body
            .as_object()
            .ok_or_else(|| ApiError::decode("languages payload is not an object"))?;

        let mut languages = map
            .iter()
            .map(|(language, chars)| {
                chars
                    .as_u64()
                    .map(|n| (language.clone(), n))
                    .ok_or_else(|| ApiError::decode(format!("bad size for {language}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let key = repo.key();
        Ok(languages
            .into_iter()
            .map(|(language, chars)| Record::new(key.clone(), vec![language, chars.to_string()]))
            .collect())
    }
}
