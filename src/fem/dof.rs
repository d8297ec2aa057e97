/// Degree of Freedom (DOF) manager
///
/// Node-interleaved numbering: DOF `node * dofs_per_node + component`.
/// One DOF per node for the scalar (d = 1) problem, three for elasticity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DofManager {
    num_nodes: usize,
    dofs_per_node: usize,
}

impl DofManager {
    /// Create a new DOF manager for a fixed number of DOFs per node
    pub fn new(num_nodes: usize, dofs_per_node: usize) -> Self {
        Self {
            num_nodes,
            dofs_per_node,
        }
    }

    /// Get the global DOF index for a node and component
    pub fn global_dof(&self, node_id: usize, component: usize) -> usize {
        debug_assert!(node_id < self.num_nodes);
        debug_assert!(component < self.dofs_per_node);
        node_id * self.dofs_per_node + component
    }

    /// Global DOFs of a tetrahedron, in element-matrix order
    /// (vertex-major, component-minor)
    pub fn element_dofs(&self, tet: &[usize; 4]) -> Vec<usize> {
        tet.iter()
            .flat_map(|&node| (0..self.dofs_per_node).map(move |c| node * self.dofs_per_node + c))
            .collect()
    }

    /// Get total number of DOFs
    pub fn total_dofs(&self) -> usize {
        self.num_nodes * self.dofs_per_node
    }

    /// Get DOFs per node
    pub fn dofs_per_node(&self) -> usize {
        self.dofs_per_node
    }

    /// Get number of nodes
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }
}
