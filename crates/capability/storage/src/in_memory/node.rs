//! 节点目录内存实现

use crate::error::StorageError;
use crate::traits::NodeDirectory;
use domain::NodeRecord;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryNodeDirectory {
    nodes: RwLock<HashMap<Uuid, NodeRecord>>,
}

impl InMemoryNodeDirectory {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryNodeDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NodeDirectory for InMemoryNodeDirectory {
    async fn touch(&self, node: &NodeRecord) -> Result<(), StorageError> {
        let mut nodes = self
            .nodes
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        nodes.insert(node.uuid, node.clone());
        Ok(())
    }

    async fn list_live_nodes(
        &self,
        now_ms: i64,
        liveness_ms: i64,
    ) -> Result<Vec<NodeRecord>, StorageError> {
        let nodes = self
            .nodes
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut items: Vec<NodeRecord> = nodes
            .values()
            .filter(|node| node.is_live(now_ms, liveness_ms))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn mark_deleted(&self, uuid: Uuid) -> Result<bool, StorageError> {
        let mut nodes = self
            .nodes
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        match nodes.get_mut(&uuid) {
            Some(node) => {
                node.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
