use async_trait::async_trait;
use git2::{BranchType, Repository};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ensure_capability, Capability, FactRequest, FactValue, MetricSource, SourceError};

const CAPABILITIES: &[Capability] = &[Capability::Count];

/// Local git checkouts as version control system.
///
/// Identifiers are repository paths, relative to the project definition.
/// The only fact is `unmerged_branches`: branches with commits not on the
/// default branch.
#[derive(Debug, Clone)]
pub struct GitSource {
    id: String,
    name: String,
    url: Option<String>,
    base_dir: PathBuf,
}

impl GitSource {
    pub fn new(id: &str, name: &str, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: None,
            base_dir: base_dir.into(),
        }
    }

    /// Web front end of the repositories, used for drill-down urls.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.trim_end_matches('/').to_string());
        self
    }

    fn open(&self, id: &str) -> Result<Repository, SourceError> {
        Ok(Repository::open(self.base_dir.join(id))?)
    }
}

/// Names of branches, local or remote, that are not merged into the
/// default branch. Remote prefixes are stripped so `origin/x` and `x` count
/// once.
pub fn unmerged_branches(repo: &Repository, exclude: &[String]) -> Result<BTreeSet<String>, SourceError> {
    let head = repo.head()?;
    let default_branch = head.shorthand().unwrap_or_default().to_string();
    let default_oid = head
        .target()
        .ok_or_else(|| SourceError::InvalidData("HEAD does not point at a commit".into()))?;

    let mut unmerged = BTreeSet::new();
    for branch in repo.branches(None)? {
        let (branch, branch_type) = branch?;
        let Some(full_name) = branch.name()? else {
            continue;
        };
        if branch_type == BranchType::Remote && full_name.ends_with("/HEAD") {
            continue;
        }
        let name = match branch_type {
            BranchType::Remote => full_name
                .split_once('/')
                .map_or(full_name, |(_, name)| name),
            BranchType::Local => full_name,
        };
        if name == default_branch || exclude.iter().any(|excluded| excluded == name) {
            continue;
        }
        let Some(oid) = branch.get().target() else {
            continue;
        };
        let merged = oid == default_oid || repo.graph_descendant_of(default_oid, oid)?;
        if !merged {
            unmerged.insert(name.to_string());
        }
    }
    Ok(unmerged)
}

fn fact_blocking(
    source: &GitSource,
    request: &FactRequest,
    ids: &[String],
) -> Result<FactValue, SourceError> {
    match (request.capability, request.fact.as_str()) {
        (Capability::Count, "unmerged_branches") => {
            let mut total = 0;
            for id in ids {
                let branches = unmerged_branches(&source.open(id)?, &request.exclude)?;
                debug!(repository = %id, branches = ?branches, "Unmerged branches");
                total += branches.len();
            }
            Ok(FactValue::Number(total as f64))
        }
        _ => Err(SourceError::UnknownFact(request.fact.clone())),
    }
}

#[async_trait]
impl MetricSource for GitSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    fn metric_source_urls(&self, ids: &[String]) -> Vec<String> {
        match &self.url {
            Some(url) => ids.iter().map(|id| format!("{url}/{id}")).collect(),
            None => ids
                .iter()
                .map(|id| display_path(&self.base_dir.join(id)))
                .collect(),
        }
    }

    async fn fact(&self, request: &FactRequest, ids: &[String]) -> Result<FactValue, SourceError> {
        ensure_capability(self, request)?;
        if ids.is_empty() {
            return Err(SourceError::MissingIdentifier);
        }
        let source = self.clone();
        let request = request.clone();
        let ids = ids.to_vec();
        tokio::task::spawn_blocking(move || fact_blocking(&source, &request, &ids))
            .await
            .map_err(|error| SourceError::Task(error.to_string()))?
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
