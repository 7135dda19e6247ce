use crate::collection::Collection;
use crate::document::Document;
use crate::types::DocumentId;
use std::sync::Arc;

#[derive(Clone)]
pub struct Cursor {
    pub collection: Arc<Collection>,
    pub ids: Vec<DocumentId>,
    pub pos: usize,
    pub docs: Option<Vec<Document>>, // when present, iterate these
}

impl Cursor {
    pub fn advance(&mut self) -> Option<Document> {
        if let Some(ref docs) = self.docs {
            let d = docs.get(self.pos).cloned();
            self.pos += 1;
            return d;
        }
        // ids whose document vanished since the query ran are skipped
        while let Some(id) = self.ids.get(self.pos) {
            self.pos += 1;
            if let Some(d) = self.collection.find_document(id) {
                return Some(d);
            }
        }
        None
    }

    #[must_use]
    pub fn to_vec(mut self) -> Vec<Document> {
        if let Some(docs) = self.docs.take() {
            return docs.into_iter().skip(self.pos).collect();
        }
        let mut out = Vec::with_capacity(self.ids.len().saturating_sub(self.pos));
        while let Some(d) = self.advance() {
            out.push(d);
        }
        out
    }

    /// Payloads only, in cursor order.
    #[must_use]
    pub fn into_documents(self) -> Vec<bson::Document> {
        self.to_vec().into_iter().map(Document::into_data).collect()
    }
}

impl Iterator for Cursor {
    type Item = Document;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
