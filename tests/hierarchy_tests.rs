// Hierarchy consistency tests
// Nodes are linked by parent / first-child / sibling indices. These tests check
// traversal order, repair of scrambled node lists, and rejection of cycles.

use sith_tools_lib::model::Model3do;
use sith_tools_lib::validation::{autofix, validate_model};
use sith_tools_lib::SithError;

#[path = "common/mod.rs"]
mod common;

fn names(model: &Model3do, order: &[usize]) -> Vec<String> {
    order.iter().map(|&i| model.hierarchy[i].name.clone()).collect()
}

/// Depth-first order: every child comes after its parent
#[test]
fn depth_first_ordering_verified() {
    let (model, _) = common::load_robot();
    common::print_hierarchy(&model);

    let order = model.walk_depth_first().expect("walk");
    assert_eq!(names(&model, &order), vec!["torso", "head", "tail"]);

    for (pos, &idx) in order.iter().enumerate() {
        let parent = model.hierarchy[idx].parent_idx;
        if parent >= 0 {
            let parent_pos = order
                .iter()
                .position(|&i| i == parent as usize)
                .expect("parent in walk");
            assert!(
                parent_pos < pos,
                "Node '{}' comes before its parent",
                model.hierarchy[idx].name
            );
        }
    }
}

#[test]
fn child_lists_follow_sibling_chain() {
    let (model, _) = common::load_robot();
    assert_eq!(model.root_nodes(), vec![0]);
    assert_eq!(model.node_children(0).expect("children"), vec![1, 2]);
    assert!(model.node_children(2).expect("children").is_empty());
    assert!(matches!(model.node_children(9), Err(SithError::InvalidHierarchy(_))));
}

#[test]
fn fixture_hierarchy_is_valid() {
    let (model, _) = common::load_robot();
    model.validate_hierarchy().expect("hierarchy");

    let report = validate_model(&model);
    for item in &report.items {
        println!("{}", item);
    }
    assert!(report.is_valid());
    assert_eq!(report.warning_count, 0);
}

#[test]
fn scrambled_nodes_are_reordered_and_fixed() {
    let (mut model, _) = common::load_robot();

    // Store the nodes back to front, keeping their sequence numbers and links
    model.hierarchy.reverse();
    for node in &mut model.hierarchy {
        for link in [&mut node.parent_idx, &mut node.first_child_idx, &mut node.sibling_idx] {
            if *link >= 0 {
                *link = 2 - *link;
            }
        }
    }
    model.hierarchy[0].num_children = 5;

    let report = validate_model(&model);
    assert!(report.has_code("HIERARCHY_NOT_ORDERED"));
    assert!(report.has_code("NODE_CHILD_COUNT_MISMATCH"));

    let fixed = autofix::apply_fixes(&mut model, &report);
    assert!(fixed > 0);

    let (expected, _) = common::load_robot();
    assert_eq!(model.hierarchy, expected.hierarchy);
    assert!(validate_model(&model).items.is_empty());
}

#[test]
fn sibling_cycle_is_rejected() {
    let (mut model, _) = common::load_robot();
    model.hierarchy[2].sibling_idx = 1;

    assert!(matches!(model.node_children(0), Err(SithError::InvalidHierarchy(_))));
    assert!(model.walk_depth_first().is_err());
    assert!(model.validate_hierarchy().is_err());

    let report = validate_model(&model);
    assert!(report.has_code("HIERARCHY_INVALID"));
    assert!(!report.is_valid());
}

#[test]
fn tree_lists_every_node() {
    let (model, _) = common::load_robot();
    let tree = model.hierarchy_tree().expect("tree");

    let mut out = Vec::new();
    ptree::write_tree(&tree, &mut out).expect("write tree");
    let text = String::from_utf8(out).expect("utf8");
    println!("{}", text);

    assert!(text.starts_with("robot.3do"));
    for label in ["[0] torso", "[1] head", "[2] tail"] {
        assert!(text.contains(label), "missing '{}' in tree", label);
    }
}
