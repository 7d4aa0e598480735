use crate::config::{Config, Service};
use crate::error::{Error, Result};
use crate::service::Status;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// A declared service as seen by the dependency graph.
///
/// The graph only needs the names a service depends on; identity comes from
/// the key it is registered under.
pub trait ServiceDefinition {
    /// Names of the services this one depends on.
    fn dependency_names(&self) -> Vec<&str>;
}

/// A service defined purely by the names it depends on.
impl<T: AsRef<str>> ServiceDefinition for Vec<T> {
    fn dependency_names(&self) -> Vec<&str> {
        self.iter().map(AsRef::as_ref).collect()
    }
}

/// One service node in the dependency graph.
///
/// Adjacency is fixed when the graph is built and may be read without locking.
#[derive(Debug)]
pub struct Vertex<'a, S> {
    key: String,
    service: &'a S,
    /// `children` are the services this vertex depends on
    children: BTreeSet<String>,
    /// `parents` are the services that depend on this vertex
    parents: BTreeSet<String>,
}

impl<'a, S> Vertex<'a, S> {
    fn new(key: &str, service: &'a S) -> Self {
        Self {
            key: key.to_string(),
            service,
            children: BTreeSet::new(),
            parents: BTreeSet::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn service(&self) -> &'a S {
        self.service
    }

    pub fn children(&self) -> &BTreeSet<String> {
        &self.children
    }

    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }
}

/// Dependency graph over a borrowed service list.
///
/// Built once per operation and discarded afterwards. The only mutable state
/// is the per-vertex status, guarded by a single lock.
pub struct Graph<'a, S> {
    vertices: HashMap<String, Vertex<'a, S>>,
    status: RwLock<HashMap<String, Status>>,
}

impl<'a, S: ServiceDefinition> Graph<'a, S> {
    /// Build a graph from `(name, service)` pairs, every vertex starting in `initial_status`.
    ///
    /// Fails with [`Error::UnknownDependency`] if a service depends on a name
    /// not in the list, and with [`Error::CyclicDependency`] if the
    /// dependencies form a cycle. Nothing is visited either way.
    pub fn new<I>(services: I, initial_status: Status) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a S)>,
    {
        let mut vertices = HashMap::new();
        for (name, service) in services {
            vertices.insert(name.to_string(), Vertex::new(name, service));
        }

        // Resolve every declared dependency before touching any adjacency set
        let mut names: Vec<&String> = vertices.keys().collect();
        names.sort();

        let mut edges = Vec::new();
        for name in names {
            let vertex = &vertices[name];
            for dependency in vertex.service.dependency_names() {
                if !vertices.contains_key(dependency) {
                    return Err(Error::UnknownDependency {
                        service: name.clone(),
                        dependency: dependency.to_string(),
                    });
                }
                edges.push((name.clone(), dependency.to_string()));
            }
        }

        let status = vertices
            .keys()
            .map(|key| (key.clone(), initial_status))
            .collect();

        let mut graph = Self {
            vertices,
            status: RwLock::new(status),
        };

        for (from, to) in edges {
            graph.add_edge(&from, &to);
        }

        if let Some(cycle) = graph.find_cycle() {
            return Err(Error::CyclicDependency(cycle));
        }

        tracing::trace!("Built dependency graph with {} services", graph.len());
        Ok(graph)
    }
}

impl<'a> Graph<'a, Service> {
    /// Build a graph from every service declared in a config.
    pub fn from_config(config: &'a Config, initial_status: Status) -> Result<Self> {
        Self::new(
            config
                .services
                .iter()
                .map(|(name, service)| (name.as_str(), service)),
            initial_status,
        )
    }
}

impl<'a, S> Graph<'a, S> {
    /// Add a dependency edge (`from` depends on `to`), updating both ends.
    fn add_edge(&mut self, from: &str, to: &str) {
        if let Some(vertex) = self.vertices.get_mut(from) {
            vertex.children.insert(to.to_string());
        }
        if let Some(vertex) = self.vertices.get_mut(to) {
            vertex.parents.insert(from.to_string());
        }
    }

    /// Find a cycle through children edges and return it as a path.
    ///
    /// The first vertex of the cycle is repeated at the end.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for node in self.keys() {
            if !visited.contains(node) {
                if let Some(cycle) =
                    self.find_cycle_dfs(node, &mut visited, &mut rec_stack, &mut path)
                {
                    return Some(cycle);
                }
            }
        }

        None
    }

    fn find_cycle_dfs<'g>(
        &'g self,
        node: &'g str,
        visited: &mut HashSet<&'g str>,
        rec_stack: &mut HashSet<&'g str>,
        path: &mut Vec<&'g str>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(node);

        if let Some(vertex) = self.vertices.get(node) {
            for dep in &vertex.children {
                if !visited.contains(dep.as_str()) {
                    if let Some(cycle) = self.find_cycle_dfs(dep, visited, rec_stack, path) {
                        return Some(cycle);
                    }
                } else if rec_stack.contains(dep.as_str()) {
                    // Found cycle - extract it from path
                    let cycle_start = path.iter().position(|n| *n == dep.as_str()).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[cycle_start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
            }
        }

        rec_stack.remove(node);
        path.pop();
        None
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vertices.contains_key(key)
    }

    /// All service names, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.vertices.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn vertex(&self, key: &str) -> Option<&Vertex<'a, S>> {
        self.vertices.get(key)
    }

    pub(crate) fn vertices(&self) -> impl Iterator<Item = &Vertex<'a, S>> {
        self.vertices.values()
    }

    /// Get direct dependencies of a service
    pub fn children_of(&self, key: &str) -> Result<Vec<&str>> {
        self.vertex_or_err(key)
            .map(|v| v.children.iter().map(String::as_str).collect())
    }

    /// Get services that directly depend on the given service
    pub fn parents_of(&self, key: &str) -> Result<Vec<&str>> {
        self.vertex_or_err(key)
            .map(|v| v.parents.iter().map(String::as_str).collect())
    }

    /// Services nothing depends on, sorted.
    pub fn roots(&self) -> Vec<&str> {
        self.keys()
            .into_iter()
            .filter(|key| self.vertices[*key].parents.is_empty())
            .collect()
    }

    /// Services that depend on nothing, sorted.
    pub fn leaves(&self) -> Vec<&str> {
        self.keys()
            .into_iter()
            .filter(|key| self.vertices[*key].children.is_empty())
            .collect()
    }

    /// Every service reachable from `roots` by following dependents, roots included.
    pub fn downstream_closure<K: AsRef<str>>(&self, roots: &[K]) -> Result<BTreeSet<&str>> {
        let mut closure = BTreeSet::new();
        let mut queue = VecDeque::new();

        for root in roots {
            let vertex = self.vertex_or_err(root.as_ref())?;
            queue.push_back(vertex);
        }

        while let Some(vertex) = queue.pop_front() {
            if !closure.insert(vertex.key.as_str()) {
                continue;
            }
            for parent in &vertex.parents {
                if let Some(dependent) = self.vertices.get(parent) {
                    queue.push_back(dependent);
                }
            }
        }

        Ok(closure)
    }

    /// Current status of a service.
    pub fn status(&self, key: &str) -> Option<Status> {
        self.status.read().get(key).copied()
    }

    /// Record a new status for a service.
    pub fn set_status(&self, key: &str, status: Status) -> Result<()> {
        let mut statuses = self.status.write();
        match statuses.get_mut(key) {
            Some(current) => {
                *current = status;
                Ok(())
            }
            None => Err(Error::ServiceNotFound(key.to_string())),
        }
    }

    /// Snapshot of every service status.
    pub fn statuses(&self) -> HashMap<String, Status> {
        self.status.read().clone()
    }

    /// Direct dependencies of `key` currently in `status`, sorted.
    pub fn children_with_status(&self, key: &str, status: Status) -> Result<Vec<&str>> {
        let vertex = self.vertex_or_err(key)?;
        Ok(self.filter_by_status(&vertex.children, status))
    }

    /// Direct dependents of `key` currently in `status`, sorted.
    pub fn parents_with_status(&self, key: &str, status: Status) -> Result<Vec<&str>> {
        let vertex = self.vertex_or_err(key)?;
        Ok(self.filter_by_status(&vertex.parents, status))
    }

    fn filter_by_status<'g>(&self, keys: &'g BTreeSet<String>, status: Status) -> Vec<&'g str> {
        let statuses = self.status.read();
        keys.iter()
            .filter(|key| statuses.get(key.as_str()) == Some(&status))
            .map(String::as_str)
            .collect()
    }

    fn vertex_or_err(&self, key: &str) -> Result<&Vertex<'a, S>> {
        self.vertices
            .get(key)
            .ok_or_else(|| Error::ServiceNotFound(key.to_string()))
    }
}

impl<S> fmt::Display for Graph<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in self.keys() {
            let vertex = &self.vertices[key];
            if vertex.children.is_empty() {
                writeln!(f, "{}", key)?;
            } else {
                let deps: Vec<&str> = vertex.children.iter().map(String::as_str).collect();
                writeln!(f, "{} -> {}", key, deps.join(", "))?;
            }
        }
        Ok(())
    }
}

impl<S> fmt::Debug for Graph<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("services", &self.keys())
            .field("status", &*self.status.read())
            .finish()
    }
}
