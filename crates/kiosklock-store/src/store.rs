//! The `TokenStore`: lookup and mutation primitives over the token
//! collection, with full-snapshot file persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use kiosklock_protocol::{
    BatchId, Token, TokenId, TokenStatus, credential,
};
use rand::Rng;

use crate::StoreError;

/// The durable collection of token records.
///
/// Records are held in a `Vec`, not a map: the persisted layout is an
/// *ordered* collection and must round-trip in issuance order. Lookups
/// are linear scans, which is fine at the bounded record counts this
/// system runs at (thousands per event, tens of thousands worst case).
///
/// ## Persistence model
///
/// Every mutating method rewrites the entire backing file synchronously
/// before returning. The disk therefore always holds a single consistent
/// snapshot, and "last write wins" is the whole durability story. A
/// failed write is logged and the in-memory state stays authoritative
/// until the next successful one.
pub struct TokenStore {
    /// Backing file. `None` for an in-memory store (tests, dry runs),
    /// in which case every persistence call is a successful no-op.
    path: Option<PathBuf>,

    /// All token records, in issuance order.
    tokens: Vec<Token>,
}

impl TokenStore {
    /// Loads the store from `path`, leniently.
    ///
    /// A missing, empty, or unparseable file yields an empty store; the
    /// warning in the log is the only observable effect. This can never
    /// fail fatally — a kiosk that refuses to boot over a corrupt file
    /// is worse than one that boots locked with zero tokens.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tokens = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => {
                tracing::warn!(path = %path.display(), "token store file is empty, starting with no tokens");
                Vec::new()
            }
            Ok(raw) => match serde_json::from_str::<Vec<Token>>(&raw) {
                Ok(tokens) => {
                    tracing::info!(
                        path = %path.display(),
                        count = tokens.len(),
                        "token store loaded"
                    );
                    tokens
                }
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        %error,
                        "token store file unparseable, starting with no tokens"
                    );
                    Vec::new()
                }
            },
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "token store file unreadable, starting with no tokens"
                );
                Vec::new()
            }
        };

        Self {
            path: Some(path),
            tokens,
        }
    }

    /// Creates an empty store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tokens: Vec::new(),
        }
    }

    /// Crash-orphan recovery, run once at startup before any request is
    /// served: every record still `in_use` belonged to a session that
    /// died with the process, and is forced to `cancelled`.
    ///
    /// Returns the number of orphans recovered. Persists immediately if
    /// there were any.
    pub fn reconcile_startup(&mut self) -> usize {
        let recovered = self.mutate_matching(
            |t| t.status == TokenStatus::InUse,
            |t| {
                t.status = TokenStatus::Cancelled;
                t.completed_at = None;
            },
        );
        if recovered > 0 {
            tracing::warn!(
                count = recovered,
                "cancelled orphaned in_use tokens from a previous run"
            );
        }
        recovered
    }

    /// Writes the full snapshot to the backing file.
    ///
    /// # Errors
    /// Returns [`StoreError`] if serialization or the write fails. An
    /// in-memory store always succeeds.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(&self.tokens)?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Lenient save: a failure is logged and swallowed, leaving the
    /// in-memory state authoritative. This is what the mutation paths
    /// use — a full disk must not take the station down mid-event.
    pub fn persist(&self) {
        if let Err(error) = self.save() {
            tracing::error!(%error, "token store write failed, in-memory state remains authoritative");
        }
    }

    // -- Lookup ------------------------------------------------------------

    /// Finds a token by id.
    pub fn find_by_id(&self, id: &TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == *id)
    }

    /// Finds a token by id, requiring it to belong to `batch`.
    pub fn find_by_id_and_batch(
        &self,
        id: &TokenId,
        batch: &BatchId,
    ) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.id == *id && t.batch_id == *batch)
    }

    /// Returns references to every token matching the predicate.
    pub fn filter(&self, pred: impl Fn(&Token) -> bool) -> Vec<&Token> {
        self.tokens.iter().filter(|t| pred(t)).collect()
    }

    /// Iterates all tokens in issuance order.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Returns the number of tokens in the store.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if the store holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Counts tokens by status, optionally restricted to one batch.
    pub fn counts_by_status(
        &self,
        batch: Option<&BatchId>,
    ) -> BTreeMap<TokenStatus, usize> {
        let mut counts = BTreeMap::new();
        for token in &self.tokens {
            if batch.is_some_and(|b| token.batch_id != *b) {
                continue;
            }
            *counts.entry(token.status).or_insert(0) += 1;
        }
        counts
    }

    // -- Mutation ----------------------------------------------------------

    /// Applies `f` to the token with the given id, then rewrites the
    /// snapshot. Returns `false` (and writes nothing) if no such token
    /// exists.
    pub fn mutate(
        &mut self,
        id: &TokenId,
        f: impl FnOnce(&mut Token),
    ) -> bool {
        let Some(token) = self.tokens.iter_mut().find(|t| t.id == *id)
        else {
            return false;
        };
        f(token);
        self.persist();
        true
    }

    /// Applies `f` to every token matching the predicate, then rewrites
    /// the snapshot once. Returns the number of tokens touched; writes
    /// nothing when that number is zero.
    pub fn mutate_matching(
        &mut self,
        pred: impl Fn(&Token) -> bool,
        mut f: impl FnMut(&mut Token),
    ) -> usize {
        let mut touched = 0;
        for token in self.tokens.iter_mut().filter(|t| pred(t)) {
            f(token);
            touched += 1;
        }
        if touched > 0 {
            self.persist();
        }
        touched
    }

    /// Inserts a new token record and rewrites the snapshot.
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateId`] if the id already exists —
    /// ids are unique across the entire store, for all time.
    pub fn insert(&mut self, token: Token) -> Result<(), StoreError> {
        if self.find_by_id(&token.id).is_some() {
            return Err(StoreError::DuplicateId(token.id));
        }
        self.tokens.push(token);
        self.persist();
        Ok(())
    }

    /// Mints `count` fresh tokens into `batch`, each with a random id
    /// and a credential signed with `secret`. One snapshot rewrite for
    /// the whole batch. Returns the new ids in issuance order.
    pub fn issue_batch(
        &mut self,
        batch: &BatchId,
        count: usize,
        secret: &str,
    ) -> Vec<TokenId> {
        let now = Utc::now();
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            // Re-roll on the (cosmically unlikely) id collision rather
            // than violate the uniqueness invariant.
            let id = loop {
                let candidate = TokenId(generate_id());
                if self.find_by_id(&candidate).is_none() {
                    break candidate;
                }
            };
            let cred = credential::encode(batch, &id, secret);
            self.tokens.push(Token::issued(
                id.clone(),
                batch.clone(),
                cred,
                now,
            ));
            ids.push(id);
        }
        self.persist();
        tracing::info!(%batch, count, "issued token batch");
        ids
    }
}

/// Generates a random 32-character hex string (128 bits of entropy) for
/// use as a token id. Collisions are checked against the store anyway.
fn generate_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
