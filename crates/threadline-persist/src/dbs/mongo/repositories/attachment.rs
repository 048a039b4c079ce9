use bson::doc;
use futures::TryStreamExt;
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::is_duplicate_key;
use crate::dbs::mongo::models::MongoAttachment;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoAttachmentRepository {
    collection: Collection<MongoAttachment>,
}

impl MongoAttachmentRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("attachments");
        Self { collection }
    }

    pub async fn create_indexes(&self) -> Result<()> {
        let by_message = IndexModel::builder().keys(doc! { "message_id": 1 }).build();
        self.collection.create_index(by_message).await?;
        Ok(())
    }

    pub async fn insert_attachment(&self, attachment: MongoAttachment) -> Result<()> {
        match self.collection.insert_one(&attachment).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_attachments(
        &self,
        user_id: &str,
        message_ids: &[String],
    ) -> Result<Vec<MongoAttachment>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let attachments = self
            .collection
            .find(doc! { "user_id": user_id, "message_id": { "$in": message_ids.to_vec() } })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(attachments)
    }

    pub async fn delete_for_messages(&self, message_ids: &[String]) -> Result<u64> {
        if message_ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .delete_many(doc! { "message_id": { "$in": message_ids.to_vec() } })
            .await?;
        Ok(result.deleted_count)
    }
}
