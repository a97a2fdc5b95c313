//! Journal catalog: the known journals and their tags.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::lql::TagsPredicate;
use crate::model::TagMap;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JournalDesc {
    pub name: String,
    #[serde(default)]
    pub tags: TagMap,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JournalCatalog {
    #[serde(default)]
    pub journals: Vec<JournalDesc>,
}

impl JournalCatalog {
    /// Read a catalog from a YAML (or JSON) file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Catalog: Failed to open {:?}", path))?;
        let catalog: JournalCatalog = serde_yaml::from_reader(file)
            .with_context(|| format!("Catalog: Failed to parse {:?}", path))?;
        tracing::info!(
            "Catalog: {} journals loaded from {:?}",
            catalog.journals.len(),
            path
        );
        Ok(catalog)
    }

    /// Journals whose tags satisfy the predicate, in catalog order.
    pub fn select(&self, predicate: &TagsPredicate) -> Vec<&JournalDesc> {
        let selected: Vec<&JournalDesc> = self
            .journals
            .par_iter()
            .filter(|journal| predicate.matches(&journal.tags))
            .collect();
        tracing::debug!(
            "Catalog: {} of {} journals selected",
            selected.len(),
            self.journals.len()
        );
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lql::{Expression, OrCondition, XCondition, compile_tags_expr};

    fn catalog() -> JournalCatalog {
        serde_yaml::from_str(
            r#"
journals:
  - name: api-east
    tags: { region: us-east, env: prod, service: api }
  - name: api-west
    tags: { region: us-west, env: prod, service: api }
  - name: worker-east
    tags: { region: us-east, env: staging, service: worker }
  - name: scratch
"#,
        )
        .unwrap()
    }

    fn names<'a>(journals: &[&'a JournalDesc]) -> Vec<&'a str> {
        journals.iter().map(|j| j.name.as_str()).collect()
    }

    #[test]
    fn select_everything_without_expression() {
        let catalog = catalog();
        let predicate = compile_tags_expr(None).unwrap();
        assert_eq!(
            names(&catalog.select(&predicate)),
            vec!["api-east", "api-west", "worker-east", "scratch"]
        );
    }

    #[test]
    fn select_keeps_catalog_order() {
        let catalog = catalog();
        let expr = Expression::new(vec![
            OrCondition::new(vec![XCondition::cond("service", "=", "worker")]),
            OrCondition::new(vec![XCondition::cond("region", "LIKE", "us-*")]),
        ]);
        let predicate = compile_tags_expr(Some(&expr)).unwrap();
        assert_eq!(
            names(&catalog.select(&predicate)),
            vec!["api-east", "api-west", "worker-east"]
        );
    }

    #[test]
    fn journal_without_tags_matches_only_empty_comparisons() {
        let catalog = catalog();
        let expr = Expression::new(vec![OrCondition::new(vec![XCondition::cond(
            "env", "=", "",
        )])]);
        let predicate = compile_tags_expr(Some(&expr)).unwrap();
        assert_eq!(names(&catalog.select(&predicate)), vec!["scratch"]);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = JournalCatalog::load(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
        assert!(err.to_string().contains("Catalog"));
    }
}
