use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            revoked_at  TEXT
        );

        CREATE TABLE IF NOT EXISTS counties (
            id      INTEGER PRIMARY KEY,
            code    TEXT NOT NULL UNIQUE,
            name    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sub_counties (
            id          INTEGER PRIMARY KEY,
            county_id   INTEGER NOT NULL REFERENCES counties(id),
            name        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS wards (
            id              INTEGER PRIMARY KEY,
            sub_county_id   INTEGER NOT NULL REFERENCES sub_counties(id),
            name            TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id                      TEXT PRIMARY KEY REFERENCES users(id),
            email                   TEXT NOT NULL,
            full_name               TEXT NOT NULL,
            phone_number            TEXT,
            county_id               INTEGER REFERENCES counties(id),
            sub_county_id           INTEGER REFERENCES sub_counties(id),
            ward_id                 INTEGER REFERENCES wards(id),
            profile_picture_url     TEXT,
            show_phone_number       INTEGER NOT NULL DEFAULT 0,
            notifications_enabled   INTEGER NOT NULL DEFAULT 1,
            user_type               TEXT NOT NULL DEFAULT 'buyer',
            created_at              TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at              TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS stores (
            id                  TEXT PRIMARY KEY,
            owner_id            TEXT NOT NULL REFERENCES profiles(id),
            name                TEXT NOT NULL,
            description         TEXT,
            phone_number        TEXT,
            email               TEXT,
            show_phone_number   INTEGER NOT NULL DEFAULT 0,
            store_image_url     TEXT,
            county_id           INTEGER REFERENCES counties(id),
            sub_county_id       INTEGER REFERENCES sub_counties(id),
            ward_id             INTEGER REFERENCES wards(id),
            is_active           INTEGER NOT NULL DEFAULT 1,
            created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_stores_owner
            ON stores(owner_id, is_active);

        CREATE TABLE IF NOT EXISTS products (
            id                  TEXT PRIMARY KEY,
            store_id            TEXT NOT NULL REFERENCES stores(id),
            title               TEXT NOT NULL,
            description         TEXT,
            category            TEXT NOT NULL,
            subcategory         TEXT,
            price               REAL NOT NULL DEFAULT 0,
            unit                TEXT NOT NULL DEFAULT 'piece',
            quantity_available  INTEGER NOT NULL DEFAULT 0,
            county_id           INTEGER REFERENCES counties(id),
            sub_county_id       INTEGER REFERENCES sub_counties(id),
            ward_id             INTEGER REFERENCES wards(id),
            is_active           INTEGER NOT NULL DEFAULT 1,
            created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_products_listing
            ON products(is_active, created_at);

        CREATE INDEX IF NOT EXISTS idx_products_store
            ON products(store_id);

        CREATE TABLE IF NOT EXISTS product_images (
            id          TEXT PRIMARY KEY,
            product_id  TEXT NOT NULL REFERENCES products(id),
            image_url   TEXT NOT NULL,
            is_primary  INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_product_images_product
            ON product_images(product_id);

        CREATE TABLE IF NOT EXISTS chats (
            id              TEXT PRIMARY KEY,
            buyer_id        TEXT NOT NULL REFERENCES profiles(id),
            seller_id       TEXT NOT NULL REFERENCES profiles(id),
            product_id      TEXT NOT NULL REFERENCES products(id),
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            last_message_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE(buyer_id, seller_id, product_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            chat_id     TEXT NOT NULL REFERENCES chats(id),
            sender_id   TEXT NOT NULL REFERENCES profiles(id),
            content     TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages(chat_id, created_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            type        TEXT NOT NULL,
            title       TEXT NOT NULL,
            message     TEXT,
            related_id  TEXT,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);
        ",
    )?;

    seed_locations(conn)?;

    info!("Database migrations complete");
    Ok(())
}

/// Kenya's 47 counties (id = official code) and a starter set of
/// sub-counties and wards.
fn seed_locations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        INSERT OR IGNORE INTO counties (id, code, name) VALUES
            (1, '001', 'Mombasa'),
            (2, '002', 'Kwale'),
            (3, '003', 'Kilifi'),
            (4, '004', 'Tana River'),
            (5, '005', 'Lamu'),
            (6, '006', 'Taita-Taveta'),
            (7, '007', 'Garissa'),
            (8, '008', 'Wajir'),
            (9, '009', 'Mandera'),
            (10, '010', 'Marsabit'),
            (11, '011', 'Isiolo'),
            (12, '012', 'Meru'),
            (13, '013', 'Tharaka-Nithi'),
            (14, '014', 'Embu'),
            (15, '015', 'Kitui'),
            (16, '016', 'Machakos'),
            (17, '017', 'Makueni'),
            (18, '018', 'Nyandarua'),
            (19, '019', 'Nyeri'),
            (20, '020', 'Kirinyaga'),
            (21, '021', 'Murang''a'),
            (22, '022', 'Kiambu'),
            (23, '023', 'Turkana'),
            (24, '024', 'West Pokot'),
            (25, '025', 'Samburu'),
            (26, '026', 'Trans Nzoia'),
            (27, '027', 'Uasin Gishu'),
            (28, '028', 'Elgeyo-Marakwet'),
            (29, '029', 'Nandi'),
            (30, '030', 'Baringo'),
            (31, '031', 'Laikipia'),
            (32, '032', 'Nakuru'),
            (33, '033', 'Narok'),
            (34, '034', 'Kajiado'),
            (35, '035', 'Kericho'),
            (36, '036', 'Bomet'),
            (37, '037', 'Kakamega'),
            (38, '038', 'Vihiga'),
            (39, '039', 'Bungoma'),
            (40, '040', 'Busia'),
            (41, '041', 'Siaya'),
            (42, '042', 'Kisumu'),
            (43, '043', 'Homa Bay'),
            (44, '044', 'Migori'),
            (45, '045', 'Kisii'),
            (46, '046', 'Nyamira'),
            (47, '047', 'Nairobi');

        INSERT OR IGNORE INTO sub_counties (id, county_id, name) VALUES
            (1, 47, 'Westlands'),
            (2, 47, 'Dagoretti North'),
            (3, 47, 'Langata'),
            (4, 47, 'Kasarani'),
            (5, 32, 'Nakuru Town East'),
            (6, 32, 'Naivasha'),
            (7, 32, 'Njoro'),
            (8, 22, 'Kiambu Town'),
            (9, 22, 'Thika Town'),
            (10, 22, 'Limuru'),
            (11, 12, 'Imenti North'),
            (12, 27, 'Kapseret');

        INSERT OR IGNORE INTO wards (id, sub_county_id, name) VALUES
            (1, 1, 'Parklands/Highridge'),
            (2, 1, 'Kangemi'),
            (3, 4, 'Githurai'),
            (4, 6, 'Lake View'),
            (5, 6, 'Hells Gate'),
            (6, 7, 'Njoro'),
            (7, 7, 'Mau Narok'),
            (8, 9, 'Township'),
            (9, 9, 'Hospital'),
            (10, 10, 'Ngecha Tigoni'),
            (11, 11, 'Municipality'),
            (12, 12, 'Langas');
        ",
    )?;
    Ok(())
}
