use std::sync::Arc;

use async_trait::async_trait;

use super::{Collector, VariableKind};
use crate::api::{ApiClient, ApiError, Query, decode};
use crate::fetch::Paginator;
use crate::github::types::Repository;
use crate::record::{Record, Schema};
use crate::resource::{Resource, UserId};

pub(super) static SCHEMA: Schema = Schema {
    name: "repositories",
    key_column: "user_id",
    columns: &[
        "id",
        "owner",
        "name",
        "html_url",
        "fork",
        "default_branch",
        "language",
        "stargazers_count",
        "topics",
        "license",
        "created_at",
        "pushed_at",
    ],
};

/// Public repositories owned by a user.
///
/// The output doubles as the repositories input of the per-repository
/// collectors, so it carries `html_url`, `owner`, `name` and
/// `default_branch`.
pub struct RepositoriesCollector {
    api: Arc<dyn ApiClient>,
    paginator: Paginator,
}

impl RepositoriesCollector {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            api,
            paginator: Paginator::default(),
        }
    }
}

fn repository_values(repo: Repository) -> Vec<String> {
    vec![
        repo.id.to_string(),
        repo.owner.login,
        repo.name,
        repo.html_url,
        repo.fork.to_string(),
        repo.default_branch.unwrap_or_default(),
        repo.language.unwrap_or_default(),
        repo.stargazers_count.to_string(),
        repo.topics.join(";"),
        repo.license.map(|l| l.name).unwrap_or_default(),
        repo.created_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
        repo.pushed_at.map(|d| d.to_rfc3339()).unwrap_or_default(),
    ]
}

#[async_trait]
impl Collector for RepositoriesCollector {
    type Target = UserId;

    fn kind(&self) -> VariableKind {
        VariableKind::Repositories
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    async fn collect(&self, user: &UserId) -> Result<Vec<Record>, ApiError> {
        let items = self
            .paginator
            .fetch_route(self.api.as_ref(), &user.route("/repos"), &Query::new())
            .await?;

        let key = user.key();
        items
            .into_iter()
            .map(|item| Ok(Record::new(key.clone(), repository_values(decode(item)?))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, page};
    use serde_json::json;

    #[tokio::test]
    async fn test_repository_rows() {
        let api = Arc::new(FakeApi::new());
        api.push_page(
            "/users/octocat/repos",
            1,
            Ok(page(
                vec![json!({
                    "id": 1296269,
                    "name": "Hello-World",
                    "owner": {"login": "octocat"},
                    "html_url": "https://github.com/octocat/Hello-World",
                    "fork": false,
                    "default_branch": "main",
                    "language": null,
                    "stargazers_count": 80,
                    "topics": ["demo", "octocat"],
                    "license": {"name": "MIT License"},
                    "created_at": "2011-01-26T19:01:12Z",
                    "pushed_at": null
                })],
                0,
            )),
        );

        let records = RepositoriesCollector::new(api)
            .collect(&UserId::new("octocat").unwrap())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resource, "octocat");
        assert_eq!(
            records[0].values,
            vec![
                "1296269",
                "octocat",
                "Hello-World",
                "https://github.com/octocat/Hello-World",
                "false",
                "main",
                "",
                "80",
                "demo;octocat",
                "MIT License",
                "2011-01-26T19:01:12+00:00",
                ""
            ]
        );
        assert_eq!(records[0].values.len(), SCHEMA.columns.len());
    }
}
