use bson::doc;
use futures::TryStreamExt;
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::models::MongoSharedChat;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoShareRepository {
    collection: Collection<MongoSharedChat>,
}

impl MongoShareRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("shared_chats");
        Self { collection }
    }

    pub async fn create_indexes(&self) -> Result<()> {
        let by_owner = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "created_at": -1 })
            .build();
        self.collection.create_index(by_owner).await?;
        Ok(())
    }

    pub async fn insert_share(&self, share: &MongoSharedChat) -> Result<()> {
        self.collection.insert_one(share).await?;
        Ok(())
    }

    pub async fn get_share(&self, share_id: &str) -> Result<Option<MongoSharedChat>> {
        Ok(self.collection.find_one(doc! { "_id": share_id }).await?)
    }

    pub async fn list_shares(&self, owner_id: &str) -> Result<Vec<MongoSharedChat>> {
        let shares = self
            .collection
            .find(doc! { "owner_id": owner_id })
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(shares)
    }

    /// Returns false when no share of that owner matched
    pub async fn delete_share(&self, owner_id: &str, share_id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": share_id, "owner_id": owner_id })
            .await?;
        Ok(result.deleted_count > 0)
    }
}
