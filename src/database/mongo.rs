//! MongoDB-backed store.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOptions, IndexOptions, ReplaceOptions, UpdateOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use super::models::{GroupMember, GroupNote, PointBalance};
use super::store::{Store, StoreError, StoreResult};

const MEMBERS: &str = "group_members";
const BALANCES: &str = "point_balances";
const NOTES: &str = "group_notes";

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::BsonDeserialization(_) => Self::Corrupt(err.to_string()),
            _ => Self::Backend(err.to_string()),
        }
    }
}

/// BSON has no unsigned integers; Telegram ids and tallies fit in i64.
fn bson_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Store over the `group_members`, `point_balances` and `group_notes`
/// collections.
#[derive(Debug, Clone)]
pub struct MongoStore {
    members: Collection<GroupMember>,
    balances: Collection<PointBalance>,
    notes: Collection<GroupNote>,
}

impl MongoStore {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if connection or index creation fails.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        let db = client.database(db_name);
        let store = Self {
            members: db.collection(MEMBERS),
            balances: db.collection(BALANCES),
            notes: db.collection(NOTES),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Unique keys backing the idempotent upserts.
    async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.members
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "group_id": 1, "user_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        self.balances
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "group_id": 1, "user_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        self.balances
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "group_id": 1, "points": -1 })
                    .build(),
            )
            .await?;
        self.notes
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "group_id": 1, "tag": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;

        debug!("MongoDB indexes ensured");
        Ok(())
    }

    fn member_filter(group_id: i64, user_id: u64) -> Document {
        doc! { "group_id": group_id, "user_id": bson_int(user_id) }
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn get_member(&self, group_id: i64, user_id: u64) -> StoreResult<Option<GroupMember>> {
        Ok(self
            .members
            .find_one(Self::member_filter(group_id, user_id))
            .await?)
    }

    async fn ensure_member(&self, group_id: i64, user_id: u64) -> StoreResult<bool> {
        let filter = Self::member_filter(group_id, user_id);
        let upsert = UpdateOptions::builder().upsert(true).build();

        let member = GroupMember::new(group_id, user_id);
        let result = self
            .members
            .update_one(
                filter.clone(),
                doc! { "$setOnInsert": { "joined_at": member.joined_at } },
            )
            .with_options(upsert.clone())
            .await?;

        self.balances
            .update_one(
                filter,
                doc! { "$setOnInsert": { "points": 0_i64, "increment": 1_i64 } },
            )
            .with_options(upsert)
            .await?;

        Ok(result.upserted_id.is_some())
    }

    async fn remove_member(&self, group_id: i64, user_id: u64) -> StoreResult<bool> {
        let filter = Self::member_filter(group_id, user_id);
        self.balances.delete_one(filter.clone()).await?;
        let result = self.members.delete_one(filter).await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_members(&self, group_id: i64) -> StoreResult<Vec<GroupMember>> {
        let cursor = self.members.find(doc! { "group_id": group_id }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn balance(&self, group_id: i64, user_id: u64) -> StoreResult<PointBalance> {
        let filter = Self::member_filter(group_id, user_id);
        if let Some(balance) = self.balances.find_one(filter.clone()).await? {
            return Ok(balance);
        }

        self.ensure_member(group_id, user_id).await?;
        self.balances.find_one(filter).await?.ok_or_else(|| {
            StoreError::Corrupt(format!(
                "balance of {} in {} missing after upsert",
                user_id, group_id
            ))
        })
    }

    async fn save_balance(&self, balance: &PointBalance) -> StoreResult<()> {
        self.balances
            .update_one(
                Self::member_filter(balance.group_id, balance.user_id),
                doc! { "$set": {
                    "points": bson_int(balance.points),
                    "increment": bson_int(balance.increment),
                } },
            )
            .await?;
        Ok(())
    }

    async fn top_balances(&self, group_id: i64, limit: usize) -> StoreResult<Vec<PointBalance>> {
        let options = FindOptions::builder()
            .sort(doc! { "points": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();
        let cursor = self
            .balances
            .find(doc! { "group_id": group_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_note(&self, group_id: i64, tag: &str) -> StoreResult<Option<GroupNote>> {
        Ok(self
            .notes
            .find_one(doc! { "group_id": group_id, "tag": tag })
            .await?)
    }

    async fn save_note(&self, note: &GroupNote) -> StoreResult<()> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.notes
            .replace_one(doc! { "group_id": note.group_id, "tag": &note.tag }, note)
            .with_options(options)
            .await?;
        Ok(())
    }

    async fn remove_note(&self, group_id: i64, tag: &str) -> StoreResult<bool> {
        let result = self
            .notes
            .delete_one(doc! { "group_id": group_id, "tag": tag })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_notes(&self, group_id: i64) -> StoreResult<Vec<String>> {
        let raw: Collection<Document> = self.notes.clone_with_type();
        let options = FindOptions::builder()
            .projection(doc! { "tag": 1, "_id": 0 })
            .sort(doc! { "tag": 1 })
            .build();

        let docs: Vec<Document> = raw
            .find(doc! { "group_id": group_id })
            .with_options(options)
            .await?
            .try_collect()
            .await?;

        docs.iter()
            .map(|doc| {
                doc.get_str("tag")
                    .map(str::to_string)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))
            })
            .collect()
    }
}
