//! In-memory wallet records with per-wallet locking.
//!
//! Each wallet record sits behind its own async mutex. A mutation locks the
//! wallet, runs the game logic on a clone and commits the clone only when the
//! logic succeeds and the new version has been handed to persistence, so a
//! failed request never leaves a half-applied record.
//! Population-wide data (scores and phase-1 card values) lives in a separate
//! index refreshed on commit. Only a payment spanning several wallets holds
//! more than one wallet lock, and it takes them in wallet order.
//!
//! Mutations hold the settlement gate shared. Settlement takes it exclusively,
//! so its snapshot never observes a request mid-flight.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use ridethebus_execution::payout::Stake;
use ridethebus_execution::{CardCensus, Standings};
use ridethebus_types::game::WalletRecord;
use tokio::sync::{Mutex as AsyncMutex, RwLock as AsyncRwLock, RwLockWriteGuard};
use tracing::warn;

use crate::persistence::{PersistenceUnavailable, RecordPersistence};

type Slot = Arc<AsyncMutex<Option<WalletRecord>>>;

/// Scores and card values of every registered wallet.
#[derive(Debug, Default)]
pub struct Population {
    points: HashMap<String, u32>,
    census: CardCensus,
}

impl Population {
    fn observe(&mut self, record: &WalletRecord) {
        self.points
            .insert(record.player.wallet.clone(), record.player.points);
        self.census.observe(record);
    }

    pub fn standings(&self) -> Option<Standings> {
        Standings::from_points(self.points.values().copied())
    }

    pub fn census(&self) -> &CardCensus {
        &self.census
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Stake credited to one wallet by a payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credit {
    pub wallet: String,
    pub amount: u64,
    /// Stake still owed after this credit.
    pub pending: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The signature was already processed; nothing changed.
    Duplicate,
    Applied {
        credited: Vec<Credit>,
        unknown: Vec<String>,
    },
}

pub struct Store {
    wallets: Mutex<HashMap<String, Slot>>,
    population: RwLock<Population>,
    signatures: Mutex<HashSet<String>>,
    gate: AsyncRwLock<()>,
    persistence: Option<RecordPersistence>,
}

impl Store {
    pub fn new(
        records: Vec<WalletRecord>,
        signatures: HashSet<String>,
        persistence: Option<RecordPersistence>,
    ) -> Self {
        let mut population = Population::default();
        let mut wallets = HashMap::with_capacity(records.len());
        for record in records {
            population.observe(&record);
            wallets.insert(
                record.player.wallet.clone(),
                Arc::new(AsyncMutex::new(Some(record))),
            );
        }
        Self {
            wallets: Mutex::new(wallets),
            population: RwLock::new(population),
            signatures: Mutex::new(signatures),
            gate: AsyncRwLock::new(()),
            persistence,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Vec::new(), HashSet::new(), None)
    }

    pub fn persistence(&self) -> Option<&RecordPersistence> {
        self.persistence.as_ref()
    }

    fn slot(&self, wallet: &str, create: bool) -> Option<Slot> {
        let mut wallets = match self.wallets.lock() {
            Ok(wallets) => wallets,
            Err(poisoned) => {
                warn!("wallet map lock poisoned; recovering");
                poisoned.into_inner()
            }
        };
        if create {
            return Some(wallets.entry(wallet.to_string()).or_default().clone());
        }
        wallets.get(wallet).cloned()
    }

    fn population(&self) -> std::sync::RwLockReadGuard<'_, Population> {
        match self.population.read() {
            Ok(population) => population,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Reads a wallet under its lock.
    pub async fn read<T>(
        &self,
        wallet: &str,
        f: impl FnOnce(Option<&WalletRecord>, &Population) -> T,
    ) -> T {
        let Some(slot) = self.slot(wallet, false) else {
            return f(None, &self.population());
        };
        let guard = slot.lock().await;
        f(guard.as_ref(), &self.population())
    }

    /// Applies `f` to a registered wallet (or to `None`).
    pub async fn update<T, E>(
        &self,
        wallet: &str,
        f: impl FnOnce(&mut Option<WalletRecord>, &Population) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<PersistenceUnavailable>,
    {
        self.apply(wallet, false, f).await
    }

    /// Like [`Store::update`], but may create the wallet's record.
    pub async fn upsert<T, E>(
        &self,
        wallet: &str,
        f: impl FnOnce(&mut Option<WalletRecord>, &Population) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<PersistenceUnavailable>,
    {
        self.apply(wallet, true, f).await
    }

    async fn apply<T, E>(
        &self,
        wallet: &str,
        create: bool,
        f: impl FnOnce(&mut Option<WalletRecord>, &Population) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<PersistenceUnavailable>,
    {
        let _gate = self.gate.read().await;
        let Some(slot) = self.slot(wallet, create) else {
            let mut absent = None;
            return f(&mut absent, &self.population());
        };
        let mut guard = slot.lock().await;

        let mut working = guard.clone();
        let result = f(&mut working, &self.population())?;
        if working == *guard {
            return Ok(result);
        }

        if let Some(record) = working.as_mut() {
            record.version += 1;
            if let Some(persistence) = &self.persistence {
                persistence.persist_record(record.clone()).await?;
            }
            let mut population = match self.population.write() {
                Ok(population) => population,
                Err(poisoned) => poisoned.into_inner(),
            };
            population.observe(record);
        }
        *guard = working;
        Ok(result)
    }

    /// Applies one confirmed payment as a unit: every credited wallet and the
    /// signature are persisted in one write before any of them is committed.
    ///
    /// Credits to the same wallet are summed. Wallets without a record are
    /// reported in `unknown` and left alone. Wallet locks are taken in wallet
    /// order.
    pub async fn credit_payment(
        &self,
        signature: &str,
        credits: Vec<(String, u64)>,
    ) -> Result<PaymentOutcome, PersistenceUnavailable> {
        let _gate = self.gate.read().await;
        let fresh = self.lock_signatures().insert(signature.to_string());
        if !fresh {
            return Ok(PaymentOutcome::Duplicate);
        }

        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        for (wallet, amount) in credits {
            let total = totals.entry(wallet).or_default();
            *total = total.saturating_add(amount);
        }

        let mut unknown = Vec::new();
        let mut guards = Vec::with_capacity(totals.len());
        for (wallet, amount) in totals {
            let Some(slot) = self.slot(&wallet, false) else {
                unknown.push(wallet);
                continue;
            };
            let guard = slot.lock_owned().await;
            if guard.is_none() {
                unknown.push(wallet);
                continue;
            }
            guards.push((amount, guard));
        }

        let mut credited = Vec::with_capacity(guards.len());
        let mut updated = Vec::with_capacity(guards.len());
        for (amount, guard) in &guards {
            let Some(record) = guard.as_ref() else {
                continue;
            };
            let mut working = record.clone();
            working.pending.pending_amount = working.pending.pending_amount.saturating_sub(*amount);
            working.player.staked = working.player.staked.saturating_add(*amount);
            working.version += 1;
            credited.push(Credit {
                wallet: working.player.wallet.clone(),
                amount: *amount,
                pending: working.pending.pending_amount,
            });
            updated.push(working);
        }

        if let Some(persistence) = &self.persistence {
            if let Err(err) = persistence
                .persist_payment(updated.clone(), signature.to_string())
                .await
            {
                self.lock_signatures().remove(signature);
                return Err(err);
            }
        }

        {
            let mut population = match self.population.write() {
                Ok(population) => population,
                Err(poisoned) => poisoned.into_inner(),
            };
            for record in &updated {
                population.observe(record);
            }
        }
        for ((_, guard), record) in guards.iter_mut().zip(updated) {
            **guard = Some(record);
        }
        Ok(PaymentOutcome::Applied { credited, unknown })
    }

    fn lock_signatures(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        match self.signatures.lock() {
            Ok(signatures) => signatures,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Blocks every mutation until the returned guard drops.
    pub async fn freeze(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    /// Stakes of every registered wallet. Callers hold [`Store::freeze`] to
    /// get one consistent view.
    pub async fn stakes(&self) -> Vec<Stake> {
        let slots: Vec<Slot> = {
            let wallets = match self.wallets.lock() {
                Ok(wallets) => wallets,
                Err(poisoned) => poisoned.into_inner(),
            };
            wallets.values().cloned().collect()
        };
        let mut stakes = Vec::with_capacity(slots.len());
        for slot in slots {
            let guard = slot.lock().await;
            if let Some(record) = guard.as_ref() {
                stakes.push(stake_of(record));
            }
        }
        stakes.sort_by(|a, b| a.wallet.cmp(&b.wallet));
        stakes
    }

    pub fn population_size(&self) -> usize {
        self.population().len()
    }
}

pub fn stake_of(record: &WalletRecord) -> Stake {
    Stake {
        wallet: record.player.wallet.clone(),
        points: record.player.points,
        staked: record.player.staked,
    }
}
