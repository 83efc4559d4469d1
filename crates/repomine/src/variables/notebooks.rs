use std::sync::Arc;

use async_trait::async_trait;

use super::{Collector, VariableKind};
use crate::api::{ApiClient, ApiError, decode, query};
use crate::github::types::GitTree;
use crate::record::{Record, Schema};
use crate::resource::{RepoId, Resource};

pub(super) static SCHEMA: Schema = Schema {
    name: "jupyter_notebooks",
    key_column: "html_url",
    columns: &["path"],
};

/// Branch read when the input row does not name one.
pub const DEFAULT_BRANCH: &str = "master";

/// Paths of the Jupyter notebooks in a repository's tree.
pub struct NotebooksCollector {
    api: Arc<dyn ApiClient>,
}

impl NotebooksCollector {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for NotebooksCollector {
    type Target = RepoId;

    fn kind(&self) -> VariableKind {
        VariableKind::JupyterNotebooks
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    async fn collect(&self, repo: &RepoId) -> Result<Vec<Record>, ApiError> {
        let branch = repo.branch().unwrap_or(DEFAULT_BRANCH);
        let route = repo.route(&format!("/git/trees/{branch}"));
        let tree: GitTree = decode(self.api.get(&route, &query(&[("recursive", "1")])).await?)?;

        if tree.truncated {
            tracing::warn!(repo = %repo, "Tree listing truncated, notebooks may be missing");
        }

        let key = repo.key();
        Ok(tree
            .tree
            .into_iter()
            .filter(|entry| entry.is_blob() && entry.path.to_ascii_lowercase().ends_with(".ipynb"))
            .map(|entry| Record::new(key.clone(), vec![entry.path]))
            .collect())
    }
}
