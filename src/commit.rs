use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    hasher::hash_commit,
    model::{FileEntry, RepoId},
    object_id::ObjectId,
    snapshot::{build_snapshot, compute_change_summary, ChangeSummary, Snapshot},
    timestamp::Timestamp,
};

/// An immutable record of a repository's files at one point in time.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    #[serde(rename = "commit_hash")]
    pub hash: ObjectId,
    pub repo_id: RepoId,
    /// The message added with the commit.
    pub message: String,
    pub author: String,
    pub created_at: Timestamp,
    /// The previous commits' hashes, if there were some. Commits built by
    /// [`create_commit`] have at most one.
    pub parent_commits: Vec<ObjectId>,
    #[serde(rename = "files_snapshot")]
    pub snapshot: Snapshot,
    pub changes_summary: ChangeSummary,
}

/// Builds the commit that records `files` on top of `parent`.
///
/// Nothing is stored here; the caller decides whether the commit becomes
/// visible.
pub fn create_commit(
    repo_id: &RepoId,
    message: &str,
    author: &str,
    files: &[FileEntry],
    parent: Option<&Commit>,
    created_at: Timestamp,
) -> Result<Commit, Error> {
    let snapshot = build_snapshot(files)?;
    let changes_summary = compute_change_summary(&snapshot, parent.map(|p| &p.snapshot));
    let hash = hash_commit(repo_id, message, &created_at, &snapshot)?;
    Ok(Commit {
        hash,
        repo_id: repo_id.clone(),
        message: message.to_owned(),
        author: author.to_owned(),
        created_at,
        parent_commits: parent.map(|p| p.hash).into_iter().collect(),
        snapshot,
        changes_summary,
    })
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: ObjectId,
    pub message: String,
    pub author: String,
    pub timestamp: Timestamp,
    pub files_count: usize,
}

/// A parent link, pointing from the parent to the child.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: ObjectId,
    pub to: ObjectId,
}

/// The commits of a repository as a DAG.
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub total_commits: usize,
}

/// One node per commit and one edge per declared parent, both in the order
/// the commits are given. Edges to parents that are not among `commits` are
/// kept; see [`CommitGraph::unresolved_edges`].
pub fn build_graph<'a>(commits: impl IntoIterator<Item = &'a Commit>) -> CommitGraph {
    let mut graph = CommitGraph::default();
    for commit in commits {
        graph.nodes.push(GraphNode {
            id: commit.hash,
            message: commit.message.clone(),
            author: commit.author.clone(),
            timestamp: commit.created_at,
            files_count: commit.snapshot.len(),
        });
        graph
            .edges
            .extend(commit.parent_commits.iter().map(|&parent| GraphEdge {
                from: parent,
                to: commit.hash,
            }));
    }
    graph.total_commits = graph.nodes.len();
    graph
}

impl CommitGraph {
    fn node_ids(&self) -> BTreeSet<ObjectId> {
        self.nodes.iter().map(|node| node.id).collect()
    }

    pub fn node(&self, id: &ObjectId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub fn parents(&self, id: &ObjectId) -> impl Iterator<Item = &ObjectId> {
        let id = *id;
        self.edges
            .iter()
            .filter(move |edge| edge.to == id)
            .map(|edge| &edge.from)
    }

    pub fn children(&self, id: &ObjectId) -> impl Iterator<Item = &ObjectId> {
        let id = *id;
        self.edges
            .iter()
            .filter(move |edge| edge.from == id)
            .map(|edge| &edge.to)
    }

    /// Commits with no parent edges.
    pub fn roots(&self) -> Vec<ObjectId> {
        let children: BTreeSet<ObjectId> = self.edges.iter().map(|edge| edge.to).collect();
        self.nodes
            .iter()
            .map(|node| node.id)
            .filter(|id| !children.contains(id))
            .collect()
    }

    /// Commits nothing else names as a parent.
    pub fn heads(&self) -> Vec<ObjectId> {
        let parents: BTreeSet<ObjectId> = self.edges.iter().map(|edge| edge.from).collect();
        self.nodes
            .iter()
            .map(|node| node.id)
            .filter(|id| !parents.contains(id))
            .collect()
    }

    /// Edges whose parent is not a node of this graph.
    pub fn unresolved_edges(&self) -> Vec<&GraphEdge> {
        let ids = self.node_ids();
        self.edges
            .iter()
            .filter(|edge| !ids.contains(&edge.from))
            .collect()
    }
}

#[cfg(test)]
fn chain(len: usize) -> Vec<Commit> {
    let repo = RepoId::from("repo");
    let mut commits: Vec<Commit> = Vec::new();
    let mut file = FileEntry::text(repo.clone(), "a.txt".into(), String::new());
    for i in 0..len {
        file.set_text(format!("v{}", i));
        let ts: Timestamp = format!("2024-01-01T00:00:0{}Z", i).parse().unwrap();
        let commit = create_commit(
            &repo,
            &format!("commit {}", i),
            "tester",
            &[file.clone()],
            commits.last(),
            ts,
        )
        .unwrap();
        commits.push(commit);
    }
    commits
}

#[test]
fn test_first_commit_has_no_parent() {
    let repo = RepoId::from("repo");
    let files = [
        FileEntry::text(repo.clone(), "A".into(), "x".into()),
        FileEntry::text(repo.clone(), "B".into(), "y".into()),
    ];
    let commit = create_commit(&repo, "init", "me", &files, None, Timestamp::now()).unwrap();
    assert!(commit.parent_commits.is_empty());
    assert_eq!(commit.changes_summary.additions, 2);
    assert_eq!(commit.changes_summary.deletions, 0);
    assert_eq!(commit.changes_summary.modifications, 0);
    assert_eq!(commit.snapshot.len(), 2);
    assert_eq!(
        commit.hash,
        hash_commit(&repo, "init", &commit.created_at, &commit.snapshot).unwrap()
    );
}

#[test]
fn test_second_commit_links_parent() {
    let commits = chain(2);
    assert_eq!(commits[1].parent_commits, vec![commits[0].hash]);
    assert_eq!(commits[1].changes_summary.modifications, 1);
    assert_ne!(commits[0].hash, commits[1].hash);
}

#[test]
fn test_empty_commit_is_rejected() {
    let repo = RepoId::from("repo");
    let result = create_commit(&repo, "nothing", "me", &[], None, Timestamp::now());
    assert!(matches!(result, Err(Error::EmptyRepository)));
}

#[test]
fn test_graph_of_a_chain() {
    let commits = chain(3);
    let graph = build_graph(&commits);
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.total_commits, 3);
    assert_eq!(
        graph.edges,
        vec![
            GraphEdge {
                from: commits[0].hash,
                to: commits[1].hash,
            },
            GraphEdge {
                from: commits[1].hash,
                to: commits[2].hash,
            },
        ]
    );
    assert_eq!(graph.roots(), vec![commits[0].hash]);
    assert_eq!(graph.heads(), vec![commits[2].hash]);
    assert_eq!(graph.parents(&commits[1].hash).collect::<Vec<_>>(), vec![&commits[0].hash]);
    assert_eq!(graph.children(&commits[1].hash).collect::<Vec<_>>(), vec![&commits[2].hash]);
    assert_eq!(graph.node(&commits[2].hash).unwrap().files_count, 1);
    assert!(graph.unresolved_edges().is_empty());
}

#[test]
fn test_graph_is_a_pure_function_of_commits() {
    let commits = chain(3);
    let json = serde_json::to_string(&commits).unwrap();
    let reloaded: Vec<Commit> = serde_json::from_str(&json).unwrap();
    assert_eq!(
        serde_json::to_vec(&build_graph(&commits)).unwrap(),
        serde_json::to_vec(&build_graph(&reloaded)).unwrap()
    );
}

#[test]
fn test_dangling_parent_is_tolerated() {
    let commits = chain(3);
    let graph = build_graph(&commits[1..]);
    assert_eq!(graph.total_commits, 2);
    assert_eq!(graph.edges.len(), 2);
    let unresolved = graph.unresolved_edges();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].from, commits[0].hash);
}

#[test]
fn test_empty_graph() {
    let graph = build_graph(&[] as &[Commit]);
    assert_eq!(graph, CommitGraph::default());
    assert_eq!(graph.total_commits, 0);
}

#[test]
fn test_serialized_field_names() {
    let commit = chain(1).remove(0);
    let json = serde_json::to_value(&commit).unwrap();
    assert!(json.get("commit_hash").is_some());
    assert!(json.get("files_snapshot").is_some());
    assert_eq!(json["changes_summary"]["additions"], 1);
}
