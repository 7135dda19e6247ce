use crate::document::types::Metadata;
use crate::types::DocumentId;
use bson::Document as BsonDocument;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
    pub metadata: Metadata,
}

impl Document {
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        Self { id: DocumentId::new(), data, metadata: Metadata::new() }
    }

    /// Replaces the payload and bumps `updated_at`; the id is kept.
    pub fn update(&mut self, new_data: BsonDocument) {
        self.data = new_data;
        self.metadata.touch();
    }

    #[must_use]
    pub fn into_data(self) -> BsonDocument {
        self.data
    }
}

impl From<BsonDocument> for Document {
    fn from(data: BsonDocument) -> Self {
        Self::new(data)
    }
}
