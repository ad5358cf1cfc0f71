//! # Ledger Facade
//!
//! The four user-facing operations, composed from the session issuer, the
//! password hasher and the ledger store.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledger Facade                                    │
//! │                                                                         │
//! │  authenticate(name, password)                                          │
//! │    validate ─► hash ─► users().authenticate ─► verify ─► issue token   │
//! │                                                                         │
//! │  account_summary(token)                                                │
//! │    resolve ─► balance + inventory + history                            │
//! │                                                                         │
//! │  transfer(token, to, amount)                                           │
//! │    resolve ─► validate ─► ledger().send_coin                           │
//! │                                                                         │
//! │  purchase(token, item)                                                 │
//! │    resolve ─► validate ─► ledger().buy_item                            │
//! │                                                                         │
//! │  DbError ─► LedgerError (NotFound → UserNotFound / ItemNotFound,       │
//! │                          storage failures → Storage)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No operation is retried here. A `Storage` failure left the ledger
//! unchanged and the caller may try again.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::SessionIssuer;
use crate::password::CredentialHasher;
use coinshop_core::validation::{
    validate_item_name, validate_password, validate_transfer_amount, validate_username,
};
use coinshop_core::{AccountSummary, Coins, LedgerError, LedgerResult, UserId, ValidationError};
use coinshop_db::{Database, DbError, Entity};

/// Entry point for every ledger operation.
///
/// Cheap to clone; clones share the pool, issuer and hasher.
#[derive(Clone)]
pub struct LedgerFacade {
    db: Database,
    sessions: Arc<SessionIssuer>,
    hasher: CredentialHasher,
}

impl LedgerFacade {
    /// Creates a facade over an already connected store.
    pub fn new(db: Database, sessions: SessionIssuer, hasher: CredentialHasher) -> Self {
        LedgerFacade {
            db,
            sessions: Arc::new(sessions),
            hasher,
        }
    }

    /// Signs in `username`, registering it on first use. Returns a token.
    pub async fn authenticate(&self, username: &str, password: &str) -> LedgerResult<String> {
        if validate_username(username).is_err() || validate_password(password).is_err() {
            warn!("Rejected sign-in with empty or oversized credentials");
            return Err(LedgerError::InvalidCredentials);
        }

        let candidate_hash = self.hash_password(password).await?;

        let user = self
            .db
            .users()
            .authenticate(username, &candidate_hash)
            .await
            .map_err(ledger_error)?;

        if !self.verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Password mismatch");
            return Err(LedgerError::InvalidCredentials);
        }

        let token = self.sessions.issue(user.id)?;
        info!(user_id = %user.id, "Session issued");
        Ok(token)
    }

    /// Balance, inventory and transfer history of the token's user.
    pub async fn account_summary(&self, token: &str) -> LedgerResult<AccountSummary> {
        let user_id = self.resolve(token)?;
        let ledger = self.db.ledger();

        let balance = ledger.get_balance(user_id).await.map_err(ledger_error)?;
        let inventory = ledger.get_inventory(user_id).await.map_err(ledger_error)?;
        let history = ledger.get_coin_history(user_id).await.map_err(ledger_error)?;

        Ok(AccountSummary {
            balance,
            inventory,
            history,
        })
    }

    /// Sends `amount` coins from the token's user to `to_username`.
    pub async fn transfer(&self, token: &str, to_username: &str, amount: Coins) -> LedgerResult<()> {
        let user_id = self.resolve(token)?;

        validate_transfer_amount(amount)?;
        validate_username(to_username)?;

        self.db
            .ledger()
            .send_coin(user_id, to_username, amount)
            .await
            .map_err(ledger_error)
    }

    /// Buys one unit of `item` for the token's user.
    pub async fn purchase(&self, token: &str, item: &str) -> LedgerResult<()> {
        let user_id = self.resolve(token)?;

        validate_item_name(item)?;

        self.db
            .ledger()
            .buy_item(user_id, item)
            .await
            .map(|_| ())
            .map_err(ledger_error)
    }

    /// True when the store answers queries.
    pub async fn is_healthy(&self) -> bool {
        self.db.health_check().await
    }

    fn resolve(&self, token: &str) -> LedgerResult<UserId> {
        self.sessions.resolve(token).map_err(|e| {
            warn!("Rejected token");
            e.into()
        })
    }

    async fn hash_password(&self, password: &str) -> LedgerResult<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| LedgerError::Storage(format!("hash password: {}", e)))?
            .map_err(LedgerError::from)
    }

    async fn verify_password(&self, password: &str, stored_hash: &str) -> LedgerResult<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(|e| LedgerError::Storage(format!("verify password: {}", e)))
    }
}

/// Translates a store error into the ledger taxonomy.
fn ledger_error(err: DbError) -> LedgerError {
    match err {
        DbError::NotFound {
            entity: Entity::User,
            key,
        } => LedgerError::UserNotFound(key),
        DbError::NotFound {
            entity: Entity::Item,
            key,
        } => LedgerError::ItemNotFound(key),
        DbError::InsufficientBalance { requested, .. } => {
            LedgerError::InsufficientBalance { requested }
        }
        DbError::SelfTransfer => LedgerError::InvalidRequest(ValidationError::SelfTransfer),
        other => LedgerError::Storage(other.to_string()),
    }
}

// =============================================================================
// Test Support
// =============================================================================

/// A facade over a fresh in-memory store with cheap password hashing.
#[cfg(test)]
pub(crate) async fn facade_for_tests() -> LedgerFacade {
    use coinshop_db::DbConfig;

    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    LedgerFacade::new(
        db,
        SessionIssuer::new("test-secret", None),
        CredentialHasher::new(8, 1, 1).unwrap(),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
