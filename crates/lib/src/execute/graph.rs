//! Target dependency graph.
//!
//! Edges point from a target to each of its prerequisites. Ordering is a
//! depth-first sort that visits prerequisites in declared order, so the
//! output is deterministic and respects the order authors wrote in `depends`.

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{BuildError, ErrorKind, Result};
use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
  Unvisited,
  Visiting,
  Visited,
}

pub struct TargetGraph {
  graph: DiGraph<String, ()>,
  nodes: HashMap<String, NodeIndex>,
  /// Prerequisites per node in declared order; petgraph iterates neighbors newest first.
  prerequisites: Vec<Vec<NodeIndex>>,
  project: String,
}

impl TargetGraph {
  /// Build and validate the graph of every declared target.
  ///
  /// Fails on the first unknown prerequisite or dependency cycle, before any
  /// target runs.
  pub fn build(targets: &IndexMap<String, Target>, project: &str) -> Result<Self> {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for name in targets.keys() {
      let idx = graph.add_node(name.clone());
      nodes.insert(name.clone(), idx);
    }

    let mut prerequisites = vec![Vec::new(); graph.node_count()];
    for target in targets.values() {
      let from = nodes[&target.name];
      for dependency in &target.depends {
        let Some(&to) = nodes.get(dependency) else {
          return Err(BuildError::at(
            ErrorKind::UnknownTarget {
              name: dependency.clone(),
              project: project.to_string(),
              used_from: Some(target.name.clone()),
            },
            target.location.clone(),
          ));
        };
        graph.add_edge(from, to, ());
        prerequisites[from.index()].push(to);
      }
    }

    let dag = Self {
      graph,
      nodes,
      prerequisites,
      project: project.to_string(),
    };

    // Validate the whole graph, not only what a particular request reaches
    let all: Vec<String> = targets.keys().cloned().collect();
    dag.topo_sort(&all)?;

    Ok(dag)
  }

  /// Order the closure of `roots` so every prerequisite precedes its dependents.
  ///
  /// Roots are processed left to right with one shared visited set, so a
  /// target reachable from several roots appears once, at its first position.
  pub fn topo_sort(&self, roots: &[String]) -> Result<Vec<String>> {
    let mut states = vec![VisitState::Unvisited; self.graph.node_count()];
    let mut path = Vec::new();
    let mut order = Vec::new();

    for root in roots {
      let node = self.node(root)?;
      if states[node.index()] == VisitState::Unvisited {
        self.visit(node, &mut states, &mut path, &mut order)?;
      }
    }

    Ok(order)
  }

  fn visit(
    &self,
    node: NodeIndex,
    states: &mut [VisitState],
    path: &mut Vec<NodeIndex>,
    order: &mut Vec<String>,
  ) -> Result<()> {
    states[node.index()] = VisitState::Visiting;
    path.push(node);

    for &prerequisite in &self.prerequisites[node.index()] {
      match states[prerequisite.index()] {
        VisitState::Unvisited => self.visit(prerequisite, states, path, order)?,
        VisitState::Visiting => return Err(self.cycle_error(prerequisite, path)),
        VisitState::Visited => {}
      }
    }

    path.pop();
    states[node.index()] = VisitState::Visited;
    order.push(self.graph[node].clone());
    Ok(())
  }

  /// `a <- b <- a`: the repeated target, then the DFS path back to it.
  fn cycle_error(&self, end: NodeIndex, path: &[NodeIndex]) -> BuildError {
    let mut chain = vec![self.graph[end].clone()];
    for &node in path.iter().rev() {
      chain.push(self.graph[node].clone());
      if node == end {
        break;
      }
    }
    BuildError::new(ErrorKind::CircularDependency(chain))
  }

  fn node(&self, name: &str) -> Result<NodeIndex> {
    self.nodes.get(name).copied().ok_or_else(|| {
      BuildError::new(ErrorKind::UnknownTarget {
        name: name.to_string(),
        project: self.project.clone(),
        used_from: None,
      })
    })
  }

  /// Direct prerequisites of a target in declared order.
  pub fn dependencies(&self, name: &str) -> Result<Vec<String>> {
    let node = self.node(name)?;
    Ok(
      self.prerequisites[node.index()]
        .iter()
        .map(|&idx| self.graph[idx].clone())
        .collect(),
    )
  }

  /// Whether `target` depends on `prerequisite`, directly or transitively.
  pub fn depends_on(&self, target: &str, prerequisite: &str) -> bool {
    match (self.nodes.get(target), self.nodes.get(prerequisite)) {
      (Some(&from), Some(&to)) if from != to => has_path_connecting(&self.graph, from, to, None),
      _ => false,
    }
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }
}
