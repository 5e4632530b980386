use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::database::models::RbsNode;
use crate::services::{double_option, Actor, ServiceError};

/// A node with its children nested, for the tree endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RbsTree {
    #[serde(flatten)]
    pub node: RbsNode,
    pub children: Vec<RbsTree>,
}

#[derive(Debug, Deserialize)]
pub struct RbsNodeCreate {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub position: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RbsNodeUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i64>>,
    pub position: Option<i64>,
}

/// Risk breakdown structure tree, scoped per user.
pub struct RbsService {
    pool: SqlitePool,
}

impl RbsService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Flat listing of the caller's nodes, parents before children.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<RbsNode>, ServiceError> {
        let nodes = sqlx::query_as::<_, RbsNode>(
            "SELECT * FROM rbs_nodes WHERE owner_id = ? \
             ORDER BY parent_id ASC, position ASC, id ASC",
        )
        .bind(actor.user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    pub async fn tree(&self, actor: &Actor) -> Result<Vec<RbsTree>, ServiceError> {
        Ok(build_tree(self.list(actor).await?))
    }

    pub async fn create(
        &self,
        input: RbsNodeCreate,
        actor: &Actor,
    ) -> Result<RbsNode, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("Name is required".to_string()));
        }
        if let Some(parent_id) = input.parent_id {
            self.get(parent_id, actor).await.map_err(|_| {
                ServiceError::NotFound(format!("Parent node {} not found", parent_id))
            })?;
        }

        let position = match input.position {
            Some(p) => p,
            None => self.next_position(input.parent_id, actor).await?,
        };

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO rbs_nodes (name, description, parent_id, owner_id, position, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.parent_id)
        .bind(actor.user_id)
        .bind(position)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let node = self.get(result.last_insert_rowid(), actor).await?;
        info!("Created RBS node {} ({})", node.id, node.name);
        Ok(node)
    }

    pub async fn update(
        &self,
        id: i64,
        input: RbsNodeUpdate,
        actor: &Actor,
    ) -> Result<RbsNode, ServiceError> {
        let mut node = self.get(id, actor).await?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::Validation("Name is required".to_string()));
            }
            node.name = name;
        }
        if let Some(value) = input.description {
            node.description = value;
        }
        if let Some(new_parent) = input.parent_id {
            if let Some(parent_id) = new_parent {
                if parent_id == id {
                    return Err(ServiceError::Validation(
                        "A node cannot be its own parent".to_string(),
                    ));
                }
                self.get(parent_id, actor).await.map_err(|_| {
                    ServiceError::NotFound(format!("Parent node {} not found", parent_id))
                })?;
                let nodes = self.list(actor).await?;
                if would_create_cycle(&nodes, id, parent_id) {
                    return Err(ServiceError::Validation(
                        "A node cannot be moved under one of its descendants".to_string(),
                    ));
                }
            }
            node.parent_id = new_parent;
        }
        if let Some(position) = input.position {
            node.position = position;
        }

        sqlx::query(
            "UPDATE rbs_nodes SET name = ?, description = ?, parent_id = ?, position = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(&node.name)
        .bind(&node.description)
        .bind(node.parent_id)
        .bind(node.position)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get(id, actor).await
    }

    /// Delete a node. Children move up to the deleted node's parent and
    /// risks categorized under it become uncategorized.
    pub async fn delete(&self, id: i64, actor: &Actor) -> Result<(), ServiceError> {
        let node = self.get(id, actor).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE rbs_nodes SET parent_id = ?, updated_at = ? WHERE parent_id = ?")
            .bind(node.parent_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE risks SET rbs_node_id = NULL WHERE rbs_node_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM rbs_nodes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Deleted RBS node {} ({})", node.id, node.name);
        Ok(())
    }

    async fn get(&self, id: i64, actor: &Actor) -> Result<RbsNode, ServiceError> {
        sqlx::query_as::<_, RbsNode>("SELECT * FROM rbs_nodes WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(actor.user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("RBS node {} not found", id)))
    }

    async fn next_position(
        &self,
        parent_id: Option<i64>,
        actor: &Actor,
    ) -> Result<i64, ServiceError> {
        let (position,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM rbs_nodes \
             WHERE owner_id = ? AND parent_id IS ?",
        )
        .bind(actor.user_id)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(position)
    }
}

/// Assemble a flat node list into nested trees. Children are ordered by
/// position within their parent, roots by position. Nodes whose parent
/// is missing from the set surface as roots rather than disappearing.
pub fn build_tree(nodes: Vec<RbsNode>) -> Vec<RbsTree> {
    let ids: HashSet<i64> = nodes.iter().map(|n| n.id).collect();
    let mut by_parent: BTreeMap<Option<i64>, Vec<RbsNode>> = BTreeMap::new();
    for node in nodes {
        let key = node.parent_id.filter(|p| ids.contains(p));
        by_parent.entry(key).or_default().push(node);
    }

    fn attach(
        parent: Option<i64>,
        by_parent: &mut BTreeMap<Option<i64>, Vec<RbsNode>>,
    ) -> Vec<RbsTree> {
        let Some(mut children) = by_parent.remove(&parent) else {
            return Vec::new();
        };
        children.sort_by_key(|n| (n.position, n.id));
        children
            .into_iter()
            .map(|node| {
                let id = node.id;
                RbsTree {
                    node,
                    children: attach(Some(id), by_parent),
                }
            })
            .collect()
    }

    attach(None, &mut by_parent)
}

/// Whether re-parenting `node_id` under `new_parent` would make the node
/// one of its own ancestors.
pub fn would_create_cycle(nodes: &[RbsNode], node_id: i64, new_parent: i64) -> bool {
    let parents: HashMap<i64, Option<i64>> =
        nodes.iter().map(|n| (n.id, n.parent_id)).collect();

    let mut current = Some(new_parent);
    let mut hops = 0;
    while let Some(id) = current {
        if id == node_id {
            return true;
        }
        hops += 1;
        if hops > nodes.len() {
            // Pre-existing corruption; treat as a cycle rather than spin
            return true;
        }
        current = parents.get(&id).copied().flatten();
    }
    false
}
