//! Operations on the hierarchy node list of a [`Model3do`].
//!
//! Nodes form a first-child / next-sibling tree stored as indices into
//! `Model3do::hierarchy`, with -1 as the absent reference. Files are not
//! trusted to be acyclic, so every traversal here is bounded and reports
//! cycles as [`SithError::InvalidHierarchy`].

use ptree::item::StringItem;
use ptree::TreeBuilder;

use crate::error::{Result, SithError};

use super::{Mesh3doNode, Model3do};

fn resolve(reference: i32, len: usize) -> Option<usize> {
    usize::try_from(reference).ok().filter(|&i| i < len)
}

impl Model3do {
    /// Stable-sorts nodes by their `idx` and renumbers them 0..N-1.
    ///
    /// Parent, first-child and sibling references are rewritten to the new
    /// position of the node they pointed at. References outside the node
    /// list are cleared to -1.
    pub fn reorder_nodes(&mut self) {
        let len = self.hierarchy.len();
        let mut order: Vec<usize> = (0..len).collect();
        order.sort_by_key(|&i| self.hierarchy[i].idx);

        let mut new_pos = vec![0i32; len];
        for (pos, &old) in order.iter().enumerate() {
            new_pos[old] = pos as i32;
        }

        let remap = |reference: i32, what: &str, name: &str| -> i32 {
            if reference < 0 {
                return -1;
            }
            match resolve(reference, len) {
                Some(old) => new_pos[old],
                None => {
                    tracing::warn!(
                        "node '{}' has out of range {} reference {}, clearing it",
                        name,
                        what,
                        reference
                    );
                    -1
                }
            }
        };

        let mut nodes: Vec<Mesh3doNode> = Vec::with_capacity(len);
        for (pos, &old) in order.iter().enumerate() {
            let src = &self.hierarchy[old];
            let mut node = src.clone();
            node.idx = pos as i32;
            node.parent_idx = remap(src.parent_idx, "parent", &src.name);
            node.first_child_idx = remap(src.first_child_idx, "child", &src.name);
            node.sibling_idx = remap(src.sibling_idx, "sibling", &src.name);
            nodes.push(node);
        }
        self.hierarchy = nodes;
    }

    /// Indices of root nodes (no parent), in list order.
    pub fn root_nodes(&self) -> Vec<usize> {
        self.hierarchy
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent_idx < 0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Follows `first_child_idx` then the `sibling_idx` chain of node `idx`.
    pub fn node_children(&self, idx: usize) -> Result<Vec<usize>> {
        let len = self.hierarchy.len();
        let node = self
            .hierarchy
            .get(idx)
            .ok_or_else(|| SithError::InvalidHierarchy(format!("node {} does not exist", idx)))?;

        let mut children = Vec::new();
        let mut next = node.first_child_idx;
        while next >= 0 {
            let child = resolve(next, len).ok_or_else(|| {
                SithError::InvalidHierarchy(format!(
                    "node {} references missing child or sibling {}",
                    idx, next
                ))
            })?;
            if children.contains(&child) || children.len() >= len {
                return Err(SithError::InvalidHierarchy(format!(
                    "sibling chain of node {} loops at node {}",
                    idx, child
                )));
            }
            children.push(child);
            next = self.hierarchy[child].sibling_idx;
        }
        Ok(children)
    }

    /// Pre-order walk of every tree reachable from the root nodes.
    pub fn walk_depth_first(&self) -> Result<Vec<usize>> {
        let len = self.hierarchy.len();
        let mut visited = vec![false; len];
        let mut order = Vec::with_capacity(len);

        for root in self.root_nodes() {
            let mut stack = vec![root];
            while let Some(idx) = stack.pop() {
                if visited[idx] {
                    return Err(SithError::InvalidHierarchy(format!(
                        "node {} ('{}') is reachable more than once",
                        idx, self.hierarchy[idx].name
                    )));
                }
                visited[idx] = true;
                order.push(idx);
                stack.extend(self.node_children(idx)?.into_iter().rev());
            }
        }
        Ok(order)
    }

    /// Checks reference ranges, parent chains and child chains for cycles.
    pub fn validate_hierarchy(&self) -> Result<()> {
        let len = self.hierarchy.len();
        for (idx, node) in self.hierarchy.iter().enumerate() {
            for (what, reference) in [
                ("parent", node.parent_idx),
                ("child", node.first_child_idx),
                ("sibling", node.sibling_idx),
            ] {
                if reference >= 0 && resolve(reference, len).is_none() {
                    return Err(SithError::InvalidHierarchy(format!(
                        "node {} ('{}') has out of range {} index {}",
                        idx, node.name, what, reference
                    )));
                }
            }

            let mut steps = 0;
            let mut parent = node.parent_idx;
            while let Some(p) = resolve(parent, len) {
                steps += 1;
                if p == idx || steps > len {
                    return Err(SithError::InvalidHierarchy(format!(
                        "parent chain of node {} ('{}') contains a cycle",
                        idx, node.name
                    )));
                }
                parent = self.hierarchy[p].parent_idx;
            }
        }

        let reachable = self.walk_depth_first()?;
        if reachable.len() != len {
            tracing::warn!(
                "{} of {} hierarchy nodes are not reachable from a root node",
                len - reachable.len(),
                len
            );
        }
        Ok(())
    }

    /// Builds a printable tree of node names, for inspection output.
    pub fn hierarchy_tree(&self) -> Result<StringItem> {
        let mut tree = TreeBuilder::new(self.name.clone());
        for root in self.root_nodes() {
            self.add_node_to_tree(root, &mut tree, 0)?;
        }
        Ok(tree.build())
    }

    fn add_node_to_tree(&self, idx: usize, tree: &mut TreeBuilder, depth: usize) -> Result<()> {
        if depth > self.hierarchy.len() {
            return Err(SithError::InvalidHierarchy(format!(
                "hierarchy depth exceeded at node {}",
                idx
            )));
        }

        let node = &self.hierarchy[idx];
        let label = format!("[{}] {}", idx, node.name);
        let children = self.node_children(idx)?;
        if children.is_empty() {
            tree.add_empty_child(label);
        } else {
            tree.begin_child(label);
            for child in children {
                self.add_node_to_tree(child, tree, depth + 1)?;
            }
            tree.end_child();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, idx: i32, parent: i32, child: i32, sibling: i32) -> Mesh3doNode {
        let mut n = Mesh3doNode::new(name);
        n.idx = idx;
        n.parent_idx = parent;
        n.first_child_idx = child;
        n.sibling_idx = sibling;
        n
    }

    #[test]
    fn reorder_remaps_references_by_identity() {
        let mut model = Model3do::new("m");
        // Stored order: child_b, root, child_a. Sequence numbers put root first.
        model.hierarchy = vec![
            node("child_b", 2, 1, -1, -1),
            node("root", 0, -1, 2, -1),
            node("child_a", 1, 1, -1, 0),
        ];
        model.reorder_nodes();

        let names: Vec<&str> = model.hierarchy.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["root", "child_a", "child_b"]);
        assert_eq!(model.hierarchy[0].first_child_idx, 1);
        assert_eq!(model.hierarchy[1].parent_idx, 0);
        assert_eq!(model.hierarchy[1].sibling_idx, 2);
        assert_eq!(model.hierarchy[2].parent_idx, 0);
        for (i, n) in model.hierarchy.iter().enumerate() {
            assert_eq!(n.idx, i as i32);
        }
    }

    #[test]
    fn reorder_is_stable_for_unset_indices() {
        let mut model = Model3do::new("m");
        model.hierarchy = vec![node("a", -1, -1, -1, -1), node("b", -1, -1, -1, -1)];
        model.reorder_nodes();
        assert_eq!(model.hierarchy[0].name, "a");
        assert_eq!(model.hierarchy[1].name, "b");
        assert_eq!(model.hierarchy[1].idx, 1);
    }

    #[test]
    fn reorder_clears_out_of_range_references() {
        let mut model = Model3do::new("m");
        model.hierarchy = vec![node("a", 0, 7, -1, -1)];
        model.reorder_nodes();
        assert_eq!(model.hierarchy[0].parent_idx, -1);
    }

    #[test]
    fn reorder_twice_changes_nothing() {
        let mut model = Model3do::new("m");
        model.hierarchy = vec![
            node("leg", 3, 1, -1, -1),
            node("hip", 1, 0, 3, 2),
            node("root", 0, -1, 1, -1),
            node("arm", 2, 0, -1, 9),
            node("loose", -1, 12, -5, -1),
        ];
        model.reorder_nodes();
        let once = model.hierarchy.clone();
        model.reorder_nodes();
        assert_eq!(model.hierarchy, once);

        let len = model.hierarchy.len() as i32;
        for n in &model.hierarchy {
            for r in [n.parent_idx, n.first_child_idx, n.sibling_idx] {
                assert!(r == -1 || (0..len).contains(&r), "{} has reference {}", n.name, r);
            }
        }
    }

    #[test]
    fn walk_visits_children_in_sibling_order() {
        let mut model = Model3do::new("m");
        model.hierarchy = vec![
            node("root", 0, -1, 1, -1),
            node("a", 1, 0, 3, 2),
            node("b", 2, 0, -1, -1),
            node("a1", 3, 1, -1, -1),
        ];
        assert_eq!(model.walk_depth_first().expect("walk"), vec![0, 1, 3, 2]);
        assert_eq!(model.node_children(0).expect("children"), vec![1, 2]);
        model.validate_hierarchy().expect("valid");
    }

    #[test]
    fn sibling_cycle_is_detected() {
        let mut model = Model3do::new("m");
        model.hierarchy = vec![
            node("root", 0, -1, 1, -1),
            node("a", 1, 0, -1, 2),
            node("b", 2, 0, -1, 1),
        ];
        assert!(matches!(model.node_children(0), Err(SithError::InvalidHierarchy(_))));
        assert!(model.validate_hierarchy().is_err());
    }

    #[test]
    fn parent_cycle_is_detected() {
        let mut model = Model3do::new("m");
        model.hierarchy = vec![node("a", 0, 1, -1, -1), node("b", 1, 0, -1, -1)];
        assert!(model.validate_hierarchy().is_err());
    }

    #[test]
    fn child_pointing_back_to_root_is_detected() {
        let mut model = Model3do::new("m");
        model.hierarchy = vec![node("root", 0, -1, 0, -1)];
        assert!(model.walk_depth_first().is_err());
    }
}
