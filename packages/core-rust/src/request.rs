//! Data handed to the request template renderer.
//!
//! The renderer itself lives outside this crate. This module fixes the shape
//! of the context it consumes:
//!
//! ```json
//! {
//!   "offset": 0, "limit": 100, "pageStart": 1,
//!   "projects": ["id", "name"],
//!   "filters_dnf": [[{"name": "age", "operator": ">", "value": 30}]],
//!   "city": "Oslo"
//! }
//! ```
//!
//! Bound request values are flattened next to the reserved keys so templates
//! can reference them by field name.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::filter::{CriterionGroups, FilterCriterion};
use crate::types::Value;

const RESERVED_KEYS: [&str; 6] = [
    "offset",
    "limit",
    "pageStart",
    "projects",
    "filters_dnf",
    "filters_cnf",
];

/// Errors raised when a grouping cannot be rendered in the requested shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("flat filter rendering supports a single AND group, got {count} groups")]
    MultipleGroups { count: usize },
}

/// Context for rendering one page request.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateContext {
    pub offset: u64,
    pub limit: u64,
    /// Page number of this request, counting from the configured first page.
    pub page_start: u64,
    /// Output field names, when a projection was requested.
    pub projects: Option<Vec<String>>,
    pub filters: CriterionGroups,
    /// Bound request values keyed by field name.
    pub values: BTreeMap<String, Value>,
}

impl TemplateContext {
    /// Context for the first page.
    #[must_use]
    pub fn first_page(limit: u64, first_page: u64, filters: CriterionGroups) -> Self {
        Self {
            offset: 0,
            limit,
            page_start: first_page,
            projects: None,
            filters,
            values: BTreeMap::new(),
        }
    }

    /// Moves the context to the following page.
    pub fn next_page(&mut self) {
        self.offset += self.limit;
        self.page_start += 1;
    }

    /// Criteria as one flat AND list.
    ///
    /// Valid for DNF with at most one group, and for CNF whose OR groups each
    /// hold a single criterion.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MultipleGroups`] when the grouping cannot be
    /// expressed as a single AND group.
    pub fn flat(&self) -> Result<Vec<&FilterCriterion>, RenderError> {
        match &self.filters {
            CriterionGroups::Dnf(groups) => match groups.as_slice() {
                [] => Ok(Vec::new()),
                [single] => Ok(single.iter().collect()),
                _ => Err(RenderError::MultipleGroups {
                    count: groups.len(),
                }),
            },
            CriterionGroups::Cnf(groups) => {
                if groups.iter().all(|g| g.len() <= 1) {
                    Ok(groups.iter().flatten().collect())
                } else {
                    Err(RenderError::MultipleGroups {
                        count: groups.iter().filter(|g| g.len() > 1).count(),
                    })
                }
            }
        }
    }

    /// Criteria as `where` plus `and`/`or` remainder clauses, one per group.
    ///
    /// DNF groups yield `{where, and}` clauses (clauses are OR-ed); CNF groups
    /// yield `{where, or}` clauses (clauses are AND-ed).
    #[must_use]
    pub fn where_remainder(&self) -> Vec<WhereClause<'_>> {
        let is_dnf = matches!(self.filters, CriterionGroups::Dnf(_));
        self.filters
            .groups()
            .iter()
            .filter_map(|group| {
                let (first, rest) = group.split_first()?;
                let rest: Vec<&FilterCriterion> = rest.iter().collect();
                Some(if is_dnf {
                    WhereClause {
                        r#where: first,
                        and: rest,
                        or: Vec::new(),
                    }
                } else {
                    WhereClause {
                        r#where: first,
                        and: Vec::new(),
                        or: rest,
                    }
                })
            })
            .collect()
    }

    /// Criteria as one nested `filters` array tagged with its normal form.
    #[must_use]
    pub fn nested(&self) -> serde_json::Value {
        let form = match self.filters {
            CriterionGroups::Dnf(_) => "dnf",
            CriterionGroups::Cnf(_) => "cnf",
        };
        serde_json::json!({
            "form": form,
            "filters": self.filters.groups(),
        })
    }
}

/// One group rendered as a leading `where` criterion and its remainder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhereClause<'a> {
    #[serde(rename = "where")]
    pub r#where: &'a FilterCriterion,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<&'a FilterCriterion>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<&'a FilterCriterion>,
}

impl Serialize for TemplateContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("offset", &self.offset)?;
        map.serialize_entry("limit", &self.limit)?;
        map.serialize_entry("pageStart", &self.page_start)?;
        if let Some(projects) = &self.projects {
            map.serialize_entry("projects", projects)?;
        }
        map.serialize_entry(self.filters.context_key(), self.filters.groups())?;
        for (name, value) in &self.values {
            if !RESERVED_KEYS.contains(&name.as_str()) {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CompareOp;

    fn crit(name: &str, op: CompareOp, v: i64) -> FilterCriterion {
        FilterCriterion {
            name: name.to_string(),
            operator: op,
            value: Value::Int(v),
        }
    }

    #[test]
    fn serializes_reserved_keys_and_values() {
        let mut ctx = TemplateContext::first_page(
            50,
            1,
            CriterionGroups::Dnf(vec![vec![crit("age", CompareOp::Gt, 30)]]),
        );
        ctx.projects = Some(vec!["id".to_string()]);
        ctx.values
            .insert("city".to_string(), Value::String("Oslo".to_string()));
        ctx.values.insert("limit".to_string(), Value::Int(999));

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "offset": 0,
                "limit": 50,
                "pageStart": 1,
                "projects": ["id"],
                "filters_dnf": [[{"name": "age", "operator": ">", "value": 30}]],
                "city": "Oslo",
            })
        );
    }

    #[test]
    fn cnf_key_and_missing_projects() {
        let ctx = TemplateContext::first_page(10, 0, CriterionGroups::Cnf(vec![]));
        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("projects").is_none());
        assert_eq!(json["filters_cnf"], serde_json::json!([]));
    }

    #[test]
    fn next_page_advances_offset_and_page() {
        let mut ctx = TemplateContext::first_page(25, 1, CriterionGroups::Dnf(vec![]));
        ctx.next_page();
        ctx.next_page();
        assert_eq!(ctx.offset, 50);
        assert_eq!(ctx.page_start, 3);
    }

    #[test]
    fn flat_rejects_multiple_dnf_groups() {
        let ctx = TemplateContext::first_page(
            10,
            1,
            CriterionGroups::Dnf(vec![
                vec![crit("a", CompareOp::Eq, 1)],
                vec![crit("a", CompareOp::Eq, 2)],
            ]),
        );
        assert_eq!(ctx.flat(), Err(RenderError::MultipleGroups { count: 2 }));
    }

    #[test]
    fn flat_accepts_singleton_cnf_groups() {
        let ctx = TemplateContext::first_page(
            10,
            1,
            CriterionGroups::Cnf(vec![
                vec![crit("a", CompareOp::Gt, 1)],
                vec![crit("b", CompareOp::Lt, 2)],
            ]),
        );
        let flat = ctx.flat().unwrap();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].name, "b");
    }

    #[test]
    fn where_remainder_shapes() {
        let dnf = TemplateContext::first_page(
            10,
            1,
            CriterionGroups::Dnf(vec![vec![
                crit("a", CompareOp::Eq, 1),
                crit("b", CompareOp::Eq, 2),
            ]]),
        );
        let json = serde_json::to_value(dnf.where_remainder()).unwrap();
        assert_eq!(json[0]["where"]["name"], "a");
        assert_eq!(json[0]["and"][0]["name"], "b");
        assert!(json[0].get("or").is_none());

        let cnf = TemplateContext::first_page(
            10,
            1,
            CriterionGroups::Cnf(vec![vec![crit("a", CompareOp::Eq, 1)]]),
        );
        let json = serde_json::to_value(cnf.where_remainder()).unwrap();
        assert_eq!(json[0]["where"]["value"], 1);
        assert!(json[0].get("and").is_none());
    }

    #[test]
    fn nested_keeps_group_nesting() {
        let ctx = TemplateContext::first_page(
            10,
            1,
            CriterionGroups::Cnf(vec![vec![
                crit("a", CompareOp::Eq, 1),
                crit("a", CompareOp::Eq, 2),
            ]]),
        );
        let json = ctx.nested();
        assert_eq!(json["form"], "cnf");
        assert_eq!(json["filters"][0][1]["value"], 2);
    }
}
