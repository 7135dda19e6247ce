use super::core::Collection;
use crate::errors::DbError;
use crate::index::{IndexDescriptor, IndexModel};

impl Collection {
    /// Declares an index and builds it from the current documents.
    /// Re-declaring an identical index is a no-op that returns its name.
    ///
    /// # Errors
    /// Returns `IndexError` when the declaration conflicts with an existing index.
    pub fn create_index(&self, model: IndexModel) -> Result<String, DbError> {
        let _wguard = self.build_lock.write();
        let mut mgr = self.indexes.write();
        let Some(name) = mgr.create_index(model.clone())? else {
            log::info!("index {} already exists on {}", model.resolved_name(), self.namespace);
            return Ok(model.resolved_name());
        };
        // offline build from the current documents
        let start = std::time::Instant::now();
        if let Some(idx) = mgr.indexes.get_mut(&name) {
            let st = self.store.read();
            for doc in st.docs.values() {
                idx.insert(&doc.data, &doc.id);
            }
            idx.stats.build_time_ms = crate::utils::num::elapsed_ms(start);
            log::info!(
                "built index {name} on {} ({} keys, {} entries)",
                self.namespace,
                idx.stats.keys,
                idx.stats.entries
            );
        }
        Ok(name)
    }

    pub fn drop_index(&self, name: &str) -> bool {
        let _wguard = self.build_lock.write();
        self.indexes.write().drop_index(name)
    }

    pub fn list_indexes(&self) -> Vec<IndexDescriptor> {
        self.indexes.read().descriptors()
    }

    pub fn index_models(&self) -> Vec<IndexModel> {
        self.indexes.read().models()
    }
}
