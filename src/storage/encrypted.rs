//! SQLite-backed result store. The full result payload is AES-GCM encrypted;
//! only the risk summary and anonymous round counters stay queryable in clear.
//! Key derived from a deployment secret.

use super::{subject_hash, RoundDetail, StoredResult};
use crate::error::{Result, ScreeningError};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out[..h.as_ref().len().min(KEY_LEN)].copy_from_slice(h.as_ref());
    out
}

fn crypto_err(e: impl std::fmt::Debug) -> ScreeningError {
    ScreeningError::Storage(format!("crypto: {e:?}"))
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(crypto_err)?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher.encrypt((&nonce).into(), plaintext).map_err(crypto_err)?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>> {
    let raw = BASE64.decode(encoded).map_err(crypto_err)?;
    if raw.len() < NONCE_LEN {
        return Err(ScreeningError::Storage("payload too short".into()));
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(crypto_err)?;
    cipher.decrypt(nonce.into(), ct).map_err(crypto_err)
}

pub struct SecureStore {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

impl SecureStore {
    /// Open or create DB at path. Key is derived from `secret`.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id TEXT PRIMARY KEY,
                ts INTEGER NOT NULL,
                subject_hash TEXT NOT NULL,
                risk_level TEXT NOT NULL,
                probability REAL NOT NULL,
                payload_enc TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_results_ts ON results(ts);
            CREATE INDEX IF NOT EXISTS idx_results_subject ON results(subject_hash);
            CREATE TABLE IF NOT EXISTS rounds (
                result_id TEXT NOT NULL REFERENCES results(id) ON DELETE CASCADE,
                round_number INTEGER NOT NULL,
                activity TEXT NOT NULL,
                clicks INTEGER NOT NULL,
                hits INTEGER NOT NULL,
                misses INTEGER NOT NULL,
                score REAL NOT NULL,
                time_seconds REAL NOT NULL,
                PRIMARY KEY (result_id, round_number)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            key: derive_key(secret),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ScreeningError::Storage("connection lock poisoned".into()))
    }

    /// Insert a result with its round detail (payload stored encrypted).
    pub fn insert_result(&self, result: &StoredResult) -> Result<()> {
        let payload = serde_json::to_string(result)?;
        let enc = encrypt(&self.key, payload.as_bytes())?;
        let a = &result.assessment;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO results (id, ts, subject_hash, risk_level, probability, payload_enc) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                a.id,
                a.ts,
                subject_hash(result.subject()),
                a.risk_level.as_str(),
                a.probability_dyslexia,
                enc
            ],
        )?;
        tx.execute("DELETE FROM rounds WHERE result_id = ?1", params![a.id])?;
        for r in &result.rounds {
            tx.execute(
                "INSERT INTO rounds (result_id, round_number, activity, clicks, hits, misses, score, time_seconds) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    a.id,
                    r.round_number as i64,
                    r.activity,
                    r.clicks,
                    r.hits,
                    r.misses,
                    r.score,
                    r.time_seconds
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Read result by id (decrypt payload)
    pub fn get_result(&self, id: &str) -> Result<Option<StoredResult>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT payload_enc FROM results WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            let enc: String = row.get(0)?;
            return Ok(Some(self.open_payload(&enc)?));
        }
        Ok(None)
    }

    /// All results of one child/user, newest first.
    pub fn results_for_subject(&self, subject: &str) -> Result<Vec<StoredResult>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT payload_enc FROM results WHERE subject_hash = ?1 ORDER BY ts DESC")?;
        let payloads = stmt
            .query_map(params![subject_hash(subject)], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        payloads.iter().map(|enc| self.open_payload(enc)).collect()
    }

    pub fn rounds(&self, result_id: &str) -> Result<Vec<RoundDetail>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT round_number, activity, clicks, hits, misses, score, time_seconds \
             FROM rounds WHERE result_id = ?1 ORDER BY round_number",
        )?;
        let rows = stmt.query_map(params![result_id], |row| {
            Ok(RoundDetail {
                round_number: row.get::<_, i64>(0)? as usize,
                activity: row.get(1)?,
                clicks: row.get(2)?,
                hits: row.get(3)?,
                misses: row.get(4)?,
                score: row.get(5)?,
                time_seconds: row.get(6)?,
            })
        })?;
        let out = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(out)
    }

    /// Retention: delete results older than given timestamp
    pub fn prune_before(&self, ts: i64) -> Result<u64> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM rounds WHERE result_id IN (SELECT id FROM results WHERE ts < ?1)",
            params![ts],
        )?;
        let n = conn.execute("DELETE FROM results WHERE ts < ?1", params![ts])?;
        Ok(n as u64)
    }

    fn open_payload(&self, enc: &str) -> Result<StoredResult> {
        let plain = decrypt(&self.key, enc)?;
        Ok(serde_json::from_slice(&plain)?)
    }
}
