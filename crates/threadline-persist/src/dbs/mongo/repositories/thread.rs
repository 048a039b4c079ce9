use bson::{doc, DateTime};
use futures::TryStreamExt;
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::is_duplicate_key;
use crate::dbs::mongo::models::MongoThread;
use crate::error::{PersistError, Result};
use crate::models::{NewThread, ThreadStatus};

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("threads");
        Self { collection }
    }

    pub async fn create_indexes(&self) -> Result<()> {
        let unique = IndexModel::builder()
            .keys(doc! { "user_id": 1, "thread_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let recent = IndexModel::builder()
            .keys(doc! { "user_id": 1, "updated_at": -1 })
            .build();

        self.collection.create_indexes([unique, recent]).await?;
        Ok(())
    }

    /// Atomic get-or-create on the unique `(user_id, thread_id)` key
    pub async fn ensure_thread(&self, thread: NewThread) -> Result<MongoThread> {
        let filter = doc! { "user_id": thread.user_id.as_str(), "thread_id": thread.thread_id.as_str() };
        let now = DateTime::now();
        let update = doc! {
            "$setOnInsert": {
                "user_id": thread.user_id.as_str(),
                "thread_id": thread.thread_id.as_str(),
                "model": thread.model.as_str(),
                "title": thread.title.as_str(),
                "status": ThreadStatus::Generating.as_str(),
                "created_at": now,
                "updated_at": now,
            }
        };

        let upserted = self
            .collection
            .find_one_and_update(filter.clone(), update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;

        match upserted {
            Ok(Some(found)) => Ok(found),
            // Two upserts racing on the unique index: the loser reads the winner's row
            Err(e) if is_duplicate_key(&e) => self
                .collection
                .find_one(filter)
                .await?
                .ok_or_else(|| PersistError::ThreadNotFound(thread.thread_id.clone())),
            Ok(None) => Err(PersistError::Internal(
                "upsert returned no document".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<MongoThread>> {
        let filter = doc! { "user_id": user_id, "thread_id": thread_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// List threads for a user
    pub async fn list_threads(&self, user_id: &str, limit: Option<i64>) -> Result<Vec<MongoThread>> {
        let filter = doc! { "user_id": user_id };
        let mut find = self.collection.find(filter).sort(doc! { "updated_at": -1 });

        if let Some(limit) = limit {
            find = find.limit(limit);
        }

        let threads = find.await?.try_collect().await?;
        Ok(threads)
    }

    /// `$set` the given fields plus `updated_at`; NotFound when nothing matched
    pub async fn update_fields(
        &self,
        user_id: &str,
        thread_id: &str,
        mut fields: bson::Document,
    ) -> Result<()> {
        fields.insert("updated_at", DateTime::now());
        let filter = doc! { "user_id": user_id, "thread_id": thread_id };

        let result = self
            .collection
            .update_one(filter, doc! { "$set": fields })
            .await?;

        if result.matched_count == 0 {
            return Err(PersistError::ThreadNotFound(thread_id.to_string()));
        }
        Ok(())
    }

    /// Delete thread; returns false when it did not exist
    pub async fn delete_thread(&self, user_id: &str, thread_id: &str) -> Result<bool> {
        let filter = doc! { "user_id": user_id, "thread_id": thread_id };
        let result = self.collection.delete_one(filter).await?;
        Ok(result.deleted_count > 0)
    }
}
