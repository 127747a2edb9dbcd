// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (credentials, profile and running emission total)
//! - Activities (logged actions with their computed emission)
//!
//! Activity writes adjust the owner's `totalEmissions` with a server-side
//! increment committed in the same transaction as the activity itself.

use crate::db::collections;
use crate::error::AppError;
use crate::models::user::TOTAL_EMISSIONS_FIELD;
use crate::models::{Activity, User};
use firestore::{FirestoreConsistencySelector, FirestoreWritePrecondition};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email address.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("email").eq(email)]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Create a new user. Fails if the document already exists.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let _: User = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Update only the user's display name.
    ///
    /// Field-masked so concurrent total increments are not overwritten.
    pub async fn update_user_name(&self, user: &User) -> Result<(), AppError> {
        let _: User = self
            .get_client()?
            .fluent()
            .update()
            .fields(["name"])
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Get an activity by ID.
    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All activities owned by a user, unordered.
    ///
    /// Date filtering happens in memory so no composite index is needed.
    pub async fn get_activities_for_user(&self, user_id: &str) -> Result<Vec<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(|q| q.for_all([q.field("userId").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a new activity and add its emission to the owner's total.
    pub async fn create_activity(&self, activity: &Activity) -> Result<(), AppError> {
        let client = self.get_client()?;
        let owner_exists = self.owner_exists(activity).await?;
        let mut transaction = Self::begin(client).await?;

        Self::add_activity_write(client, &mut transaction, activity, false)?;
        if owner_exists {
            Self::add_total_increment(
                client,
                &mut transaction,
                &activity.user_id,
                activity.co2_emission,
            )?;
        }
        Self::commit(transaction).await?;

        tracing::info!(
            user_id = %activity.user_id,
            activity_id = %activity.id,
            co2_emission = activity.co2_emission,
            "Activity created"
        );
        Ok(())
    }

    /// Overwrite an existing activity, adjusting the owner's total by the
    /// change in emission.
    ///
    /// The previous emission is read inside the transaction, so a concurrent
    /// update or delete of the same activity aborts the commit instead of
    /// skewing the total. Fails with `NotFound` if the activity is gone.
    pub async fn update_activity(&self, activity: &Activity) -> Result<(), AppError> {
        let client = self.get_client()?;
        let owner_exists = self.owner_exists(activity).await?;
        let mut transaction = Self::begin(client).await?;

        let stored = match Self::stored_activity(client, &transaction, activity).await {
            Ok(stored) => stored,
            Err(e) => {
                Self::rollback(transaction).await;
                return Err(e);
            }
        };

        Self::add_activity_write(client, &mut transaction, activity, true)?;
        let delta = activity.co2_emission - stored.co2_emission;
        if owner_exists && delta != 0.0 {
            Self::add_total_increment(client, &mut transaction, &activity.user_id, delta)?;
        }
        Self::commit(transaction).await?;

        tracing::info!(
            user_id = %activity.user_id,
            activity_id = %activity.id,
            delta,
            "Activity updated"
        );
        Ok(())
    }

    /// Delete an activity and subtract its stored emission from the owner's
    /// total. Fails with `NotFound` if it was already deleted.
    pub async fn delete_activity(&self, activity: &Activity) -> Result<(), AppError> {
        let client = self.get_client()?;
        let owner_exists = self.owner_exists(activity).await?;
        let mut transaction = Self::begin(client).await?;

        let stored = match Self::stored_activity(client, &transaction, activity).await {
            Ok(stored) => stored,
            Err(e) => {
                Self::rollback(transaction).await;
                return Err(e);
            }
        };

        client
            .fluent()
            .delete()
            .from(collections::ACTIVITIES)
            .document_id(&activity.id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add deletion to transaction: {}", e))
            })?;

        if owner_exists {
            Self::add_total_increment(
                client,
                &mut transaction,
                &activity.user_id,
                -stored.co2_emission,
            )?;
        }
        Self::commit(transaction).await?;

        tracing::info!(
            user_id = %activity.user_id,
            activity_id = %activity.id,
            "Activity deleted"
        );
        Ok(())
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Increments must not resurrect a deleted user, so writes for an
    /// ownerless activity skip the total update.
    async fn owner_exists(&self, activity: &Activity) -> Result<bool, AppError> {
        let exists = self.get_user(&activity.user_id).await?.is_some();
        if !exists {
            tracing::warn!(
                user_id = %activity.user_id,
                activity_id = %activity.id,
                "Owner not found, writing activity without total update"
            );
        }
        Ok(exists)
    }

    async fn begin(
        client: &firestore::FirestoreDb,
    ) -> Result<firestore::FirestoreTransaction<'_>, AppError> {
        client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))
    }

    async fn commit(transaction: firestore::FirestoreTransaction<'_>) -> Result<(), AppError> {
        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    async fn rollback(transaction: firestore::FirestoreTransaction<'_>) {
        if let Err(e) = transaction.rollback().await {
            tracing::warn!(error = %e, "Transaction rollback failed");
        }
    }

    /// Read the stored copy of `activity` as part of `transaction` and check
    /// it still belongs to the same user.
    async fn stored_activity(
        client: &firestore::FirestoreDb,
        transaction: &firestore::FirestoreTransaction<'_>,
        activity: &Activity,
    ) -> Result<Activity, AppError> {
        let stored: Option<Activity> = client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(&activity.id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let stored = stored.ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;
        if stored.user_id != activity.user_id {
            return Err(AppError::Forbidden(
                "Not authorized to modify this activity".to_string(),
            ));
        }
        Ok(stored)
    }

    /// Queue the activity document write. With `must_exist` the write fails
    /// rather than recreating a deleted document.
    fn add_activity_write(
        client: &firestore::FirestoreDb,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        activity: &Activity,
        must_exist: bool,
    ) -> Result<(), AppError> {
        let update = client.fluent().update().in_col(collections::ACTIVITIES);
        let update = if must_exist {
            update.precondition(FirestoreWritePrecondition::Exists(true))
        } else {
            update
        };
        update
            .document_id(&activity.id)
            .object(activity)
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add activity to transaction: {}", e))
            })?;
        Ok(())
    }

    /// Queue an atomic increment of a user's `totalEmissions`.
    fn add_total_increment(
        client: &firestore::FirestoreDb,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        user_id: &str,
        delta: f64,
    ) -> Result<(), AppError> {
        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user_id)
            .transforms(|t| t.fields([t.field(TOTAL_EMISSIONS_FIELD).increment(delta)]))
            .only_transform()
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add total increment to transaction: {}", e))
            })?;
        Ok(())
    }
}
