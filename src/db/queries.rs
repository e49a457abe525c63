use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::keys::{self, KeyPepper};
use crate::models::{
    Activation, ActivationMeta, IssueLicense, IssuedLicense, License, LicenseDetails,
    LicenseStatus, LicenseSummary,
};

use super::from_row::{ACTIVATION_COLS, LICENSE_COLS, query_all, query_one};

/// Bounded retry for the generate-check-insert loop on issuance.
const MAX_GENERATION_ATTEMPTS: usize = 20;

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 200;

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trim an optional text field and cap its length. Empty input becomes `None`.
fn clean_text(value: Option<&str>, max_len: usize) -> Option<String> {
    let text = value?.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(max_len).collect())
}

fn is_unique_violation(err: &rusqlite::Error, column_hint: &str) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(column_hint)
    )
}

// ============ Issuance ============

struct LicenseDraft {
    product_id: String,
    plan: String,
    status: LicenseStatus,
    max_activations: i64,
    expires_at: Option<i64>,
    customer_email: Option<String>,
    order_ref: Option<String>,
    notes: Option<String>,
}

/// Issue a new license. When the caller supplies a key, a duplicate hash
/// is a conflict; otherwise keys are generated and checked against the
/// store, retrying up to [`MAX_GENERATION_ATTEMPTS`] times.
///
/// The pre-insert existence check is only an optimization: the UNIQUE
/// constraint on `key_hash` is the authoritative duplicate signal, so a
/// constraint violation on insert is caught and mapped rather than
/// bubbled up as a database error.
pub fn issue_license(
    conn: &Connection,
    pepper: &KeyPepper,
    default_product_id: &str,
    input: &IssueLicense,
) -> Result<IssuedLicense> {
    let status = input
        .status
        .as_deref()
        .and_then(|s| s.trim().parse::<LicenseStatus>().ok())
        .unwrap_or(LicenseStatus::Active);

    let expires_at = input.expires_at.or_else(|| {
        input
            .days
            .filter(|d| *d > 0)
            .map(|d| now().saturating_add(d.saturating_mul(86_400)))
    });

    let draft = LicenseDraft {
        product_id: clean_text(input.product_id.as_deref(), 80)
            .unwrap_or_else(|| default_product_id.to_string()),
        plan: clean_text(input.plan.as_deref(), 80).unwrap_or_else(|| "pro".to_string()),
        status,
        max_activations: input.max_activations.filter(|m| *m > 0).unwrap_or(1),
        expires_at,
        customer_email: clean_text(input.customer_email.as_deref(), 255),
        order_ref: clean_text(input.order_ref.as_deref(), 255),
        notes: clean_text(input.notes.as_deref(), 1000),
    };

    let provided = input
        .license_key
        .as_deref()
        .map(keys::normalize)
        .filter(|k| !k.is_empty());

    if let Some(plain_key) = provided {
        return match try_insert_license(conn, pepper, &plain_key, &draft)? {
            Some(issued) => Ok(issued),
            None => Err(AppError::Conflict("License key already exists".to_string())),
        };
    }

    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let candidate = keys::generate(keys::DEFAULT_KEY_PREFIX, 4, 4);
        if key_hash_exists(conn, &keys::hash(&candidate, pepper))? {
            continue;
        }
        if let Some(issued) = try_insert_license(conn, pepper, &candidate, &draft)? {
            return Ok(issued);
        }
        // Lost the race on this candidate; pick a new one.
    }

    Err(AppError::Internal(format!(
        "Could not generate a unique license key after {} attempts",
        MAX_GENERATION_ATTEMPTS
    )))
}

/// Insert a license row. Returns `None` when the key hash already exists.
fn try_insert_license(
    conn: &Connection,
    pepper: &KeyPepper,
    plain_key: &str,
    draft: &LicenseDraft,
) -> Result<Option<IssuedLicense>> {
    let id = gen_id();
    let key_hash = keys::hash(plain_key, pepper);
    let key_hint = keys::mask(plain_key);
    let ts = now();

    let inserted = conn.execute(
        "INSERT INTO licenses (id, key_hash, key_hint, product_id, plan, status, max_activations, expires_at, customer_email, order_ref, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            &id,
            &key_hash,
            &key_hint,
            &draft.product_id,
            &draft.plan,
            draft.status.as_str(),
            draft.max_activations,
            draft.expires_at,
            &draft.customer_email,
            &draft.order_ref,
            &draft.notes,
            ts,
            ts
        ],
    );

    match inserted {
        Ok(_) => Ok(Some(IssuedLicense {
            id,
            license_key: plain_key.to_string(),
            key_hint,
            product_id: draft.product_id.clone(),
            plan: draft.plan.clone(),
            status: draft.status,
            max_activations: draft.max_activations,
            expires_at: draft.expires_at,
            customer_email: draft.customer_email.clone(),
            order_ref: draft.order_ref.clone(),
        })),
        Err(e) if is_unique_violation(&e, "key_hash") => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn key_hash_exists(conn: &Connection, key_hash: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM licenses WHERE key_hash = ?1",
            params![key_hash],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(found.is_some())
}

// ============ Lookup & state transitions ============

/// Look up a license by plaintext key and product id.
pub fn find_license(
    conn: &Connection,
    pepper: &KeyPepper,
    license_key: &str,
    product_id: &str,
) -> Result<Option<License>> {
    let key_hash = keys::hash(license_key, pepper);
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE key_hash = ?1 AND product_id = ?2", LICENSE_COLS),
        &[&key_hash, &product_id],
    )
}

/// Apply the lazy expiry transition and persist it when it fires.
/// Every license-touching operation goes through here first.
pub fn refresh_expiry(conn: &Connection, license: License) -> Result<License> {
    let ts = now();
    let (license, changed) = license.expire_if_due(ts);
    if changed {
        conn.execute(
            "UPDATE licenses SET status = 'expired', updated_at = ?1 WHERE id = ?2",
            params![ts, &license.id],
        )?;
        tracing::info!(license_id = %license.id, "license expired lazily on touch");
    }
    Ok(license)
}

// ============ Activations ============

/// Result of attempting to bind a machine to a license.
pub enum ActivationOutcome {
    /// The machine was already activated; metadata was refreshed.
    Existing(Activation),
    /// A new activation row was created.
    Created(Activation),
    /// The activation limit is reached; nothing was written.
    LimitReached { count: i64, max: i64 },
}

/// Atomically bind a machine to a license, enforcing `max_activations`.
///
/// The whole check-then-insert runs inside one IMMEDIATE transaction so
/// two concurrent first activations cannot both observe "below limit".
/// A unique-constraint failure on insert means the same machine raced
/// itself; the losing writer falls back to the refresh path.
pub fn acquire_activation_atomic(
    conn: &mut Connection,
    license_id: &str,
    max_activations: i64,
    machine_id: &str,
    meta: &ActivationMeta,
) -> Result<ActivationOutcome> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

    if let Some(existing) = touch_activation(&tx, license_id, machine_id, meta)? {
        tx.commit()?;
        return Ok(ActivationOutcome::Existing(existing));
    }

    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM activations WHERE license_id = ?1",
        params![license_id],
        |row| row.get(0),
    )?;

    if count >= max_activations {
        return Ok(ActivationOutcome::LimitReached {
            count,
            max: max_activations,
        });
    }

    let id = gen_id();
    let ts = now();
    let inserted = tx.execute(
        "INSERT INTO activations (id, license_id, machine_id, platform, arch, app_version, first_activated_at, last_validated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &id,
            license_id,
            machine_id,
            &meta.platform,
            &meta.arch,
            &meta.app_version,
            ts,
            ts
        ],
    );

    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e, "machine_id") => {
            // Same machine raced us between the lookup and the insert;
            // treat the losing writer as a refresh.
            let existing = touch_activation(&tx, license_id, machine_id, meta)?
                .ok_or_else(|| AppError::Internal("activation vanished mid-transaction".into()))?;
            tx.commit()?;
            return Ok(ActivationOutcome::Existing(existing));
        }
        Err(e) => return Err(e.into()),
    }

    tx.commit()?;

    Ok(ActivationOutcome::Created(Activation {
        id,
        license_id: license_id.to_string(),
        machine_id: machine_id.to_string(),
        platform: meta.platform.clone(),
        arch: meta.arch.clone(),
        app_version: meta.app_version.clone(),
        first_activated_at: ts,
        last_validated_at: ts,
    }))
}

/// Refresh metadata and the last-validated timestamp for an existing
/// activation. Returns `None` when the machine was never activated.
pub fn touch_activation(
    conn: &Connection,
    license_id: &str,
    machine_id: &str,
    meta: &ActivationMeta,
) -> Result<Option<Activation>> {
    query_one(
        conn,
        &format!(
            "UPDATE activations SET platform = ?1, arch = ?2, app_version = ?3, last_validated_at = ?4
             WHERE license_id = ?5 AND machine_id = ?6
             RETURNING {}",
            ACTIVATION_COLS
        ),
        &[
            &meta.platform,
            &meta.arch,
            &meta.app_version,
            &now(),
            &license_id,
            &machine_id,
        ],
    )
}

pub fn count_activations(conn: &Connection, license_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM activations WHERE license_id = ?1",
        params![license_id],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

pub fn list_activations(conn: &Connection, license_id: &str) -> Result<Vec<Activation>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM activations WHERE license_id = ?1 ORDER BY first_activated_at ASC, id ASC",
            ACTIVATION_COLS
        ),
        &[&license_id],
    )
}

// ============ Admin operations ============

pub struct RevokeOutcome {
    pub updated: bool,
    pub message: String,
}

/// Revoke a license by key. Terminal and idempotent: revoking an
/// already-revoked license still reports success.
pub fn revoke_license(
    conn: &Connection,
    pepper: &KeyPepper,
    license_key: &str,
    product_id: &str,
    reason: Option<&str>,
) -> Result<RevokeOutcome> {
    let Some(license) = find_license(conn, pepper, license_key, product_id)? else {
        return Ok(RevokeOutcome {
            updated: false,
            message: "License not found".to_string(),
        });
    };

    let note = clean_text(reason, 1000)
        .or(license.notes)
        .unwrap_or_else(|| "Revoked by admin".to_string());

    conn.execute(
        "UPDATE licenses SET status = 'revoked', notes = ?1, updated_at = ?2 WHERE id = ?3",
        params![&note, now(), &license.id],
    )?;

    Ok(RevokeOutcome {
        updated: true,
        message: "License revoked".to_string(),
    })
}

/// Newest-first license summaries with computed activation counts.
/// The limit is clamped to 1..=200; `None` means 20.
pub fn list_licenses(conn: &Connection, limit: Option<i64>) -> Result<Vec<LicenseSummary>> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let mut stmt = conn.prepare(
        "SELECT l.id, l.key_hint, l.product_id, l.plan, l.status, l.max_activations,
                COALESCE(a.activation_count, 0), l.expires_at, l.customer_email, l.order_ref,
                l.created_at, l.updated_at
         FROM licenses l
         LEFT JOIN (
             SELECT license_id, COUNT(*) AS activation_count
             FROM activations
             GROUP BY license_id
         ) a ON a.license_id = l.id
         ORDER BY l.created_at DESC, l.id DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map(params![limit], |row| {
            let status: String = row.get(4)?;
            Ok(LicenseSummary {
                id: row.get(0)?,
                key_hint: row.get(1)?,
                product_id: row.get(2)?,
                plan: row.get(3)?,
                status: status.parse().map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        4,
                        "status".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?,
                max_activations: row.get(5)?,
                activation_count: row.get(6)?,
                expires_at: row.get(7)?,
                customer_email: row.get(8)?,
                order_ref: row.get(9)?,
                created_at: row.get(10)?,
                updated_at: row.get(11)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Full admin view of one license with its activations, oldest first.
pub fn license_details(
    conn: &Connection,
    pepper: &KeyPepper,
    license_key: &str,
    product_id: &str,
) -> Result<Option<LicenseDetails>> {
    let Some(license) = find_license(conn, pepper, license_key, product_id)? else {
        return Ok(None);
    };

    let activations = list_activations(conn, &license.id)?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Some(LicenseDetails {
        id: license.id,
        key_hint: license.key_hint,
        product_id: license.product_id,
        plan: license.plan,
        status: license.status,
        max_activations: license.max_activations,
        expires_at: license.expires_at,
        customer_email: license.customer_email,
        order_ref: license.order_ref,
        notes: license.notes,
        created_at: license.created_at,
        updated_at: license.updated_at,
        activations,
    }))
}
