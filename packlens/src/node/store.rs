//! Node tree construction and lookup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::package::PackageGroup;

/// Node type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// The single root node of a store.
    PackageGroup,
    /// A grouping folder between the root and packages, used when containers
    /// are discovered in subdirectories of the installation root.
    PackageFolder,
    /// One container's root.
    Package,
    /// A directory inside a container.
    Directory,
    /// A leaf entry.
    File,
}

/// One entry in the store.
///
/// Created once during tree construction (or deserialized from a cache
/// file), immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable integer identity within the store.
    pub offset: u64,
    /// Type tag.
    pub kind: NodeKind,
    /// Parent offset; -1 for the root.
    pub parent: i64,
    /// Child offsets in insertion order.
    pub children: Vec<u64>,
    /// Entry name (last path segment; container name for packages).
    pub name: String,
    /// Deletion marker carried through from patch containers.
    pub deleted: bool,
}

/// Immutable offset-addressed tree over one container set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStore {
    nodes: Vec<Node>,
    /// (case-folded package name, case-folded path) → offset. Directory
    /// paths keep their trailing separator; package-level paths are empty.
    path_index: HashMap<(String, String), u64>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self {
            nodes: vec![Node {
                offset: 0,
                kind: NodeKind::PackageGroup,
                parent: -1,
                children: Vec::new(),
                name: String::new(),
                deleted: false,
            }],
            path_index: HashMap::new(),
        }
    }
}

impl NodeStore {
    /// Builds a store by walking every container's cached listfile.
    pub fn build(group: &PackageGroup) -> Self {
        let mut store = Self::default();

        // Package-folder chains are shared across containers discovered in
        // the same subdirectory.
        let mut folders: HashMap<String, u64> = HashMap::new();

        for container in 0..group.container_count() {
            let Some(name) = group.container_name(container) else {
                continue;
            };
            let name = name.to_string();

            let mut parent = 0u64;
            let mut package_label = name.as_str();
            if let Some((folder_path, package_name)) = name.rsplit_once('/') {
                parent = store.intern_folders(folder_path, &mut folders);
                package_label = package_name;
            }
            let package = store.push(NodeKind::Package, parent, package_label);
            store
                .path_index
                .insert((name.to_ascii_lowercase(), String::new()), package);

            let Some(listfile) = group.listfile(container) else {
                continue;
            };
            let mut dirs: HashMap<String, u64> = HashMap::new();
            for entry in listfile.entries() {
                store.insert_entry(&name, package, entry, &mut dirs);
            }
        }

        store
    }

    /// Interns the `a/b` folder chain under the root, returning the deepest
    /// folder's offset.
    fn intern_folders(&mut self, folder_path: &str, folders: &mut HashMap<String, u64>) -> u64 {
        let mut parent = 0u64;
        let mut prefix = String::new();
        for segment in folder_path.split('/').filter(|s| !s.is_empty()) {
            prefix.push_str(segment);
            prefix.push('/');
            let key = prefix.to_ascii_lowercase();
            parent = match folders.get(&key) {
                Some(&offset) => offset,
                None => {
                    let offset = self.push(NodeKind::PackageFolder, parent, segment);
                    folders.insert(key.clone(), offset);
                    offset
                }
            };
        }
        parent
    }

    fn insert_entry(
        &mut self,
        package_name: &str,
        package: u64,
        entry: &str,
        dirs: &mut HashMap<String, u64>,
    ) {
        let folded_package = package_name.to_ascii_lowercase();
        let mut parent = package;
        let mut dir_path = String::new();

        let mut segments = entry.split('\\').filter(|s| !s.is_empty()).peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                dir_path.push_str(segment);
                dir_path.push('\\');
                let key = dir_path.to_ascii_lowercase();
                parent = match dirs.get(&key) {
                    Some(&offset) => offset,
                    None => {
                        let offset = self.push(NodeKind::Directory, parent, segment);
                        dirs.insert(key.clone(), offset);
                        self.path_index.insert((folded_package.clone(), key), offset);
                        offset
                    }
                };
            } else {
                let offset = self.push(NodeKind::File, parent, segment);
                self.path_index.insert(
                    (folded_package.clone(), entry.to_ascii_lowercase()),
                    offset,
                );
            }
        }
    }

    fn push(&mut self, kind: NodeKind, parent: u64, name: &str) -> u64 {
        let offset = self.nodes.len() as u64;
        self.nodes.push(Node {
            offset,
            kind,
            parent: parent as i64,
            children: Vec::new(),
            name: name.to_string(),
            deleted: false,
        });
        self.nodes[parent as usize].children.push(offset);
        offset
    }

    /// Lookup by offset.
    pub fn node(&self, offset: u64) -> Option<&Node> {
        self.nodes.get(offset as usize)
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// A node's stable offset.
    pub fn node_offset(&self, node: &Node) -> u64 {
        node.offset
    }

    /// A node's display name.
    pub fn node_name<'a>(&self, node: &'a Node) -> &'a str {
        &node.name
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Lookup by (container, path), case-insensitive. Directory paths carry
    /// their trailing separator; the empty path addresses the package node.
    pub fn lookup_path(&self, package: &str, path: &str) -> Option<u64> {
        self.path_index
            .get(&(package.to_ascii_lowercase(), path.to_ascii_lowercase()))
            .copied()
    }

    /// Index-based addressing: walks child indices from the root.
    pub fn node_by_indices(&self, indices: &[usize]) -> Option<&Node> {
        let mut node = self.root();
        for &i in indices {
            let offset = *node.children.get(i)?;
            node = self.node(offset)?;
        }
        Some(node)
    }
}
