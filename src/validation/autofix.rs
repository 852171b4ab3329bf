use crate::model::Model3do;

use super::report::ValidationReport;

/// Renumber hierarchy nodes when their sequence numbers are not dense.
pub fn fix_hierarchy_order(model: &mut Model3do) -> bool {
    let ordered = model
        .hierarchy
        .iter()
        .enumerate()
        .all(|(i, n)| n.idx == i as i32);
    if ordered {
        return false;
    }
    model.reorder_nodes();
    true
}

/// Recount `num_children` from the first-child / sibling links.
///
/// Nodes whose chains cannot be walked are left untouched.
pub fn fix_child_counts(model: &mut Model3do) -> u32 {
    let mut fixed = 0u32;
    for i in 0..model.hierarchy.len() {
        let Ok(children) = model.node_children(i) else {
            continue;
        };
        let count = children.len() as i32;
        if model.hierarchy[i].num_children != count {
            model.hierarchy[i].num_children = count;
            fixed += 1;
        }
    }
    fixed
}

/// Applies every fix whose findings in `report` are marked auto-fixable.
/// Returns the number of findings addressed.
pub fn apply_fixes(model: &mut Model3do, report: &ValidationReport) -> u32 {
    let mut fixed = 0;
    let unordered = report.fixable_count("HIERARCHY_NOT_ORDERED");
    if unordered > 0 && fix_hierarchy_order(model) {
        fixed += unordered;
    }
    if report.fixable_count("NODE_CHILD_COUNT_MISMATCH") > 0 {
        fixed += fix_child_counts(model);
    }
    if fixed > 0 {
        tracing::info!("auto-fixed {} validation findings in '{}'", fixed, model.name);
    }
    fixed
}
