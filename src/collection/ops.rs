use super::core::Collection;
use crate::document::Document;
use crate::index::{index_insert_all, index_remove_all};
use crate::types::DocumentId;

const AUDIT_TARGET: &str = "plp_bookstore::audit";

impl Collection {
    pub fn insert_document(&self, document: Document) -> DocumentId {
        let _guard = self.build_lock.read();
        let doc_id = document.id.clone();
        index_insert_all(&mut self.indexes.write(), &document.data, &doc_id);
        {
            let mut st = self.store.write();
            let seq = st.next_seq;
            st.next_seq += 1;
            st.seq_of.insert(doc_id.clone(), seq);
            st.docs.insert(seq, document);
        }
        log::debug!(target: AUDIT_TARGET, "insert ns={} id={doc_id}", self.namespace);
        doc_id
    }

    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        let st = self.store.read();
        st.seq_of.get(id).and_then(|seq| st.docs.get(seq)).cloned()
    }

    /// Replaces the payload of `id` in place, keeping its natural-order position.
    pub fn update_document(&self, id: &DocumentId, new_document: Document) -> bool {
        let _guard = self.build_lock.read();
        let mut st = self.store.write();
        let Some(seq) = st.seq_of.get(id).copied() else {
            return false;
        };
        let Some(slot) = st.docs.get_mut(&seq) else {
            return false;
        };
        let mut replacement = new_document;
        replacement.id = id.clone();
        {
            let mut mgr = self.indexes.write();
            index_remove_all(&mut mgr, &slot.data, id);
            index_insert_all(&mut mgr, &replacement.data, id);
        }
        *slot = replacement;
        drop(st);
        log::debug!(target: AUDIT_TARGET, "update ns={} id={id}", self.namespace);
        true
    }

    pub fn delete_document(&self, id: &DocumentId) -> bool {
        let _guard = self.build_lock.read();
        let removed = {
            let mut st = self.store.write();
            st.seq_of.remove(id).and_then(|seq| st.docs.remove(&seq))
        };
        match removed {
            Some(old) => {
                index_remove_all(&mut self.indexes.write(), &old.data, id);
                log::debug!(target: AUDIT_TARGET, "delete ns={} id={id}", self.namespace);
                true
            }
            None => false,
        }
    }

    /// All documents in natural order.
    pub fn get_all_documents(&self) -> Vec<Document> {
        self.store.read().docs.values().cloned().collect()
    }

    /// Ids of all documents in natural order, without cloning payloads.
    pub fn list_ids(&self) -> Vec<DocumentId> {
        self.store.read().docs.values().map(|d| d.id.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every document; index declarations stay and are emptied.
    pub fn clear(&self) -> usize {
        let _wguard = self.build_lock.write();
        let removed = {
            let mut st = self.store.write();
            let n = st.docs.len();
            st.docs.clear();
            st.seq_of.clear();
            n
        };
        let mut mgr = self.indexes.write();
        for idx in mgr.indexes.values_mut() {
            idx.map.clear();
            idx.unkeyed.clear();
            idx.stats.keys = 0;
            idx.stats.entries = 0;
        }
        removed
    }

    /// Keeps the ids in `candidates` that are still stored, in natural order.
    pub(crate) fn in_natural_order(&self, candidates: &[DocumentId]) -> Vec<DocumentId> {
        let st = self.store.read();
        let mut seqs: Vec<u64> =
            candidates.iter().filter_map(|id| st.seq_of.get(id).copied()).collect();
        seqs.sort_unstable();
        seqs.dedup();
        seqs.into_iter().filter_map(|s| st.docs.get(&s).map(|d| d.id.clone())).collect()
    }
}
