use anyhow::Context;
use ridethebus_execution::GameError;
use ridethebus_types::game::WalletRecord;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

/// The background writer is gone; nothing queued now would reach disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("record persistence unavailable")]
pub struct PersistenceUnavailable;

enum PersistRequest {
    /// Records and an optional payment signature, written in one transaction.
    Write {
        records: Vec<WalletRecord>,
        signature: Option<String>,
    },
    Flush(oneshot::Sender<()>),
}

/// Everything persisted by a previous run.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub records: Vec<WalletRecord>,
    pub signatures: HashSet<String>,
}

/// Writes committed wallet records to SQLite on a background thread.
pub struct RecordPersistence {
    sender: mpsc::Sender<PersistRequest>,
}

impl RecordPersistence {
    pub fn load_and_start_sqlite(
        path: &Path,
        buffer_size: usize,
    ) -> anyhow::Result<(Self, Snapshot)> {
        let snapshot = load_snapshot(path)?;

        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let path = path.to_path_buf();
        std::thread::spawn(move || {
            persistence_worker(path, receiver);
        });

        Ok((Self { sender }, snapshot))
    }

    /// Queues `record`, waiting for room when the writer is behind.
    pub async fn persist_record(&self, record: WalletRecord) -> Result<(), PersistenceUnavailable> {
        self.send(PersistRequest::Write {
            records: vec![record],
            signature: None,
        })
        .await
    }

    /// Queues the records credited by one payment together with its
    /// signature. Both land on disk or neither does.
    pub async fn persist_payment(
        &self,
        records: Vec<WalletRecord>,
        signature: String,
    ) -> Result<(), PersistenceUnavailable> {
        self.send(PersistRequest::Write {
            records,
            signature: Some(signature),
        })
        .await
    }

    async fn send(&self, request: PersistRequest) -> Result<(), PersistenceUnavailable> {
        self.sender.send(request).await.map_err(|_| {
            error!("record persistence worker stopped");
            PersistenceUnavailable
        })
    }

    /// A handle whose writer has already stopped.
    #[cfg(test)]
    pub(crate) fn disconnected() -> Self {
        let (sender, _) = mpsc::channel(1);
        Self { sender }
    }

    /// Resolves once every request queued before it has been written.
    pub async fn flush(&self) {
        let (reply, done) = oneshot::channel();
        if self.sender.send(PersistRequest::Flush(reply)).await.is_err() {
            warn!("record persistence worker stopped before flush");
            return;
        }
        let _ = done.await;
    }
}

impl From<PersistenceUnavailable> for GameError {
    fn from(err: PersistenceUnavailable) -> Self {
        GameError::Transient(err.to_string())
    }
}

/// Reads every persisted record and signature without starting a writer.
pub fn load_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let conn = Connection::open(path).context("open record persistence db")?;
    init_schema_sqlite(&conn)?;
    let records = load_records_sqlite(&conn)?;
    let signatures = load_signatures_sqlite(&conn)?;
    Ok(Snapshot {
        records,
        signatures,
    })
}

fn init_schema_sqlite(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         CREATE TABLE IF NOT EXISTS wallets (
             wallet TEXT PRIMARY KEY,
             record TEXT NOT NULL,
             version INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS signatures (
             signature TEXT PRIMARY KEY
         );",
    )
    .context("init record persistence schema")?;
    Ok(())
}

fn load_records_sqlite(conn: &Connection) -> anyhow::Result<Vec<WalletRecord>> {
    let mut stmt = conn.prepare("SELECT wallet, record FROM wallets ORDER BY wallet ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (wallet, json) = row?;
        let record: WalletRecord = serde_json::from_str(&json)
            .with_context(|| format!("decode persisted record for {wallet}"))?;
        record
            .validate_invariants()
            .with_context(|| format!("persisted record for {wallet} is inconsistent"))?;
        records.push(record);
    }
    Ok(records)
}

fn load_signatures_sqlite(conn: &Connection) -> anyhow::Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT signature FROM signatures")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut signatures = HashSet::new();
    for row in rows {
        signatures.insert(row?);
    }
    Ok(signatures)
}

fn write_batch(
    conn: &mut Connection,
    records: &[WalletRecord],
    signature: Option<&str>,
) -> anyhow::Result<()> {
    let tx = conn.transaction()?;
    for record in records {
        let json = serde_json::to_string(record).context("encode record")?;
        // Never overwrite a newer version with an older one.
        tx.execute(
            "INSERT INTO wallets (wallet, record, version) VALUES (?1, ?2, ?3)
             ON CONFLICT(wallet) DO UPDATE SET record = excluded.record, version = excluded.version
             WHERE excluded.version >= wallets.version",
            params![record.player.wallet, json, record.version as i64],
        )?;
    }
    if let Some(signature) = signature {
        tx.execute(
            "INSERT OR IGNORE INTO signatures (signature) VALUES (?1)",
            params![signature],
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn persistence_worker(path: PathBuf, mut receiver: mpsc::Receiver<PersistRequest>) {
    let mut conn = match Connection::open(&path) {
        Ok(conn) => conn,
        Err(err) => {
            error!("Record persistence open failed: {err}");
            return;
        }
    };

    if let Err(err) = init_schema_sqlite(&conn) {
        error!("Record persistence init failed: {err}");
        return;
    }

    while let Some(request) = receiver.blocking_recv() {
        match request {
            PersistRequest::Write { records, signature } => {
                if let Err(err) = write_batch(&mut conn, &records, signature.as_deref()) {
                    let wallets: Vec<&str> = records
                        .iter()
                        .map(|record| record.player.wallet.as_str())
                        .collect();
                    error!(
                        ?wallets,
                        signature = signature.as_deref(),
                        "Record persistence write failed: {err:#}"
                    );
                }
            }
            PersistRequest::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
}
