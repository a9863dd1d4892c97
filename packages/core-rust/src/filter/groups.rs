//! Assembly of translated leaves into DNF/CNF criterion groups.

use tracing::{debug, warn};

use super::expr::Expr;
use super::translate::{FilterTranslator, Pushdown, TranslateError};
use super::{CriterionGroups, FilterCriterion};
use crate::context::ExecutionContext;

/// Predicate leaves grouped in normal form by the query planner.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterGroups {
    /// OR of AND groups.
    Dnf(Vec<Vec<Expr>>),
    /// AND of OR groups.
    Cnf(Vec<Vec<Expr>>),
}

impl Default for FilterGroups {
    fn default() -> Self {
        Self::Dnf(Vec::new())
    }
}

/// Criteria to push plus whether the host must still filter fetched rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PushdownPlan {
    pub groups: CriterionGroups,
    /// `true` when at least one leaf was not pushed, so the pushed filter is
    /// wider than the original predicate.
    pub residual: bool,
}

/// Translates every leaf and assembles the groups that can be pushed.
///
/// Declined leaves and recoverable translation failures never abort:
///
/// - DNF: the leaf is dropped from its AND group (which only widens the
///   group). A group left empty matches everything, so nothing is pushed.
/// - CNF: the whole OR group containing the leaf is dropped.
///
/// All leaves are translated before assembly, so request bindings are complete
/// and a fatal error anywhere aborts regardless of group position.
///
/// # Errors
///
/// Propagates the first fatal [`TranslateError::Unanswerable`].
pub fn plan_pushdown(
    translator: &FilterTranslator<'_>,
    filters: &FilterGroups,
    ctx: &mut ExecutionContext,
) -> Result<PushdownPlan, TranslateError> {
    let (groups, is_dnf) = match filters {
        FilterGroups::Dnf(g) => (g, true),
        FilterGroups::Cnf(g) => (g, false),
    };

    let mut translated: Vec<Vec<Option<FilterCriterion>>> = Vec::with_capacity(groups.len());
    for group in groups {
        let mut leaves = Vec::with_capacity(group.len());
        for expr in group {
            leaves.push(translate_leaf(translator, expr, ctx)?);
        }
        translated.push(leaves);
    }

    let residual = translated.iter().flatten().any(Option::is_none);

    let groups = if is_dnf {
        let and_groups: Vec<Vec<FilterCriterion>> = translated
            .into_iter()
            .map(|leaves| leaves.into_iter().flatten().collect())
            .collect();
        if and_groups.iter().any(Vec::is_empty) {
            CriterionGroups::Dnf(Vec::new())
        } else {
            CriterionGroups::Dnf(and_groups)
        }
    } else {
        let or_groups: Vec<Vec<FilterCriterion>> = translated
            .into_iter()
            .filter(|leaves| leaves.iter().all(Option::is_some))
            .map(|leaves| leaves.into_iter().flatten().collect())
            .filter(|leaves: &Vec<FilterCriterion>| !leaves.is_empty())
            .collect();
        CriterionGroups::Cnf(or_groups)
    };

    Ok(PushdownPlan { groups, residual })
}

fn translate_leaf(
    translator: &FilterTranslator<'_>,
    expr: &Expr,
    ctx: &mut ExecutionContext,
) -> Result<Option<FilterCriterion>, TranslateError> {
    match translator.translate(expr, ctx) {
        Ok(Pushdown::Criterion(criterion)) => Ok(Some(criterion)),
        Ok(Pushdown::Declined(reason)) => {
            debug!(?reason, "predicate left for post-fetch evaluation");
            Ok(None)
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(error = %e, "filter translation failed, falling back to post-fetch evaluation");
            Ok(None)
        }
    }
}
