use rusqlite::Connection;

/// Initialize the license server schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Licenses. The plaintext key never lands here; key_hash is the
        -- peppered HMAC and key_hint the masked display form.
        CREATE TABLE IF NOT EXISTS licenses (
            id TEXT PRIMARY KEY,
            key_hash TEXT NOT NULL UNIQUE,
            key_hint TEXT NOT NULL,
            product_id TEXT NOT NULL,
            plan TEXT NOT NULL DEFAULT 'pro',
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'revoked', 'expired')),
            max_activations INTEGER NOT NULL DEFAULT 1,
            expires_at INTEGER,
            customer_email TEXT,
            order_ref TEXT,
            notes TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_licenses_product_status ON licenses(product_id, status);

        -- Activations: one row per (license, machine). The unique
        -- constraint is the backstop for racing first activations from
        -- the same machine.
        CREATE TABLE IF NOT EXISTS activations (
            id TEXT PRIMARY KEY,
            license_id TEXT NOT NULL REFERENCES licenses(id) ON DELETE CASCADE,
            machine_id TEXT NOT NULL,
            platform TEXT,
            arch TEXT,
            app_version TEXT,
            first_activated_at INTEGER NOT NULL,
            last_validated_at INTEGER NOT NULL,
            UNIQUE (license_id, machine_id)
        );
        CREATE INDEX IF NOT EXISTS idx_activations_license ON activations(license_id);
        CREATE INDEX IF NOT EXISTS idx_activations_machine ON activations(machine_id);
        "#,
    )
}
