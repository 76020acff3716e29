#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Directory grouping suite files and/or nested modules.
    Module,
    /// A suite file; its children are the test cases parsed out of it.
    Suite,
    /// A single test case. Always a leaf.
    Test,
}

#[derive(Debug, Clone)]
pub struct CatalogNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub kind: NodeKind,
    pub name: String,
    /// Path relative to the catalog root. For a test node this is the path
    /// of the suite file that defines it.
    pub rel_path: String,
    /// 1-based line where a test case is defined in its suite file.
    pub line: Option<u32>,
    pub expanded: bool,
}

/// Arena-backed catalog forest, rebuilt from scratch on every scan.
#[derive(Debug, Default)]
pub struct CatalogTree {
    nodes: Vec<CatalogNode>,
    root_ids: Vec<usize>,
}

impl CatalogTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root-level node (top-level module or suite). Returns the id.
    pub fn add_root(&mut self, kind: NodeKind, name: String, rel_path: String) -> usize {
        let id = self.add_node(kind, name, rel_path, None);
        self.root_ids.push(id);
        id
    }

    /// Add a child under `parent_id`. Returns the id.
    pub fn add_child(
        &mut self,
        parent_id: usize,
        kind: NodeKind,
        name: String,
        rel_path: String,
    ) -> usize {
        let id = self.add_node(kind, name, rel_path, Some(parent_id));
        self.nodes[parent_id].children.push(id);
        id
    }

    fn add_node(
        &mut self,
        kind: NodeKind,
        name: String,
        rel_path: String,
        parent: Option<usize>,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(CatalogNode {
            id,
            parent,
            children: Vec::new(),
            kind,
            name,
            rel_path,
            line: None,
            expanded: kind == NodeKind::Module,
        });
        id
    }

    pub fn get(&self, id: usize) -> Option<&CatalogNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut CatalogNode> {
        self.nodes.get_mut(id)
    }

    pub fn is_empty(&self) -> bool {
        self.root_ids.is_empty()
    }

    /// Find a direct child of `parent` by name, or None.
    pub fn find_child_by_name(&self, parent: usize, name: &str) -> Option<usize> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    pub fn find_root_by_name(&self, name: &str) -> Option<usize> {
        self.root_ids
            .iter()
            .copied()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    /// Flat list of visible node ids (respecting expanded/collapsed state),
    /// paired with depth for indentation.
    pub fn visible_nodes(&self) -> Vec<(usize, usize)> {
        let mut result = Vec::new();
        for &root_id in &self.root_ids {
            self.collect_visible(root_id, 0, &mut result);
        }
        result
    }

    fn collect_visible(&self, id: usize, depth: usize, result: &mut Vec<(usize, usize)>) {
        result.push((id, depth));
        let node = &self.nodes[id];
        if node.expanded {
            for &child_id in &node.children {
                self.collect_visible(child_id, depth + 1, result);
            }
        }
    }

    /// Visible nodes filtered by a case-insensitive substring match on any
    /// node name. A matching node shows its subtree (honoring expansion);
    /// ancestors of a match stay visible so the path to it reads through.
    /// Collapsed branches are still searched.
    pub fn visible_nodes_filtered(&self, query: &str) -> Vec<(usize, usize)> {
        let query = query.to_lowercase();
        let mut result = Vec::new();
        for &root_id in &self.root_ids {
            self.collect_filtered(root_id, 0, &query, &mut result);
        }
        result
    }

    fn collect_filtered(
        &self,
        id: usize,
        depth: usize,
        query: &str,
        result: &mut Vec<(usize, usize)>,
    ) -> bool {
        let node = &self.nodes[id];
        if node.name.to_lowercase().contains(query) {
            self.collect_visible(id, depth, result);
            return true;
        }
        let here = result.len();
        result.push((id, depth));
        let mut any_child = false;
        for &child_id in &node.children {
            any_child |= self.collect_filtered(child_id, depth + 1, query, result);
        }
        if !any_child {
            result.truncate(here);
        }
        any_child
    }

    /// Toggle a node's expanded state. Returns the new state.
    pub fn toggle_expanded(&mut self, id: usize) -> bool {
        if let Some(node) = self.nodes.get_mut(id) {
            node.expanded = !node.expanded;
            node.expanded
        } else {
            false
        }
    }

    pub fn expand_all(&mut self) {
        for node in &mut self.nodes {
            if !node.children.is_empty() {
                node.expanded = true;
            }
        }
    }

    pub fn collapse_all(&mut self) {
        for node in &mut self.nodes {
            node.expanded = false;
        }
    }

    /// (suite count, test count) across the whole forest.
    pub fn totals(&self) -> (usize, usize) {
        let suites = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Suite)
            .count();
        let tests = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Test)
            .count();
        (suites, tests)
    }
}
