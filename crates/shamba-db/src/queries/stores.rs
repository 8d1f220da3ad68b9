use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};
use uuid::Uuid;

use shamba_types::api::{CreateStoreRequest, StoreQuery, UpdateStoreRequest};
use shamba_types::models::{Page, PAGE_SIZE, Store, StoreDetail, StoreSummary, page_offset};

use super::accounts::query_profile;
use super::products::query_store_cards;
use super::{Filter, OptionalExt, search_term};
use crate::Database;
use crate::models::{STORE_COLUMNS, location_from_row, now_timestamp, public_profile, store_from_row};

const STORE_JOINS: &str = "FROM stores s
     LEFT JOIN counties c ON c.id = s.county_id
     LEFT JOIN sub_counties sc ON sc.id = s.sub_county_id
     LEFT JOIN wards w ON w.id = s.ward_id";

impl Database {
    pub fn insert_store(&self, id: Uuid, owner_id: Uuid, req: &CreateStoreRequest) -> Result<Store> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO stores (id, owner_id, name, description, phone_number, email,
                    show_phone_number, store_image_url, county_id, sub_county_id, ward_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id.to_string(),
                    owner_id.to_string(),
                    req.name.trim(),
                    req.description,
                    req.phone_number,
                    req.email,
                    req.show_phone_number,
                    req.store_image_url,
                    req.county_id,
                    req.sub_county_id,
                    req.ward_id,
                ],
            )?;
            query_store(conn, id)?.ok_or_else(|| anyhow::anyhow!("store {} vanished after insert", id))
        })
    }

    /// Any store by id, active or not.
    pub fn get_store(&self, id: Uuid) -> Result<Option<Store>> {
        self.with_conn(|conn| query_store(conn, id))
    }

    /// Read-modify-write of one store row.
    pub fn update_store(&self, id: Uuid, req: &UpdateStoreRequest) -> Result<Option<Store>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(mut store) = query_store(&tx, id)? else {
                return Ok(None);
            };
            req.apply(&mut store);
            tx.execute(
                "UPDATE stores SET
                    name = ?2,
                    description = ?3,
                    phone_number = ?4,
                    email = ?5,
                    show_phone_number = ?6,
                    store_image_url = ?7,
                    county_id = ?8,
                    sub_county_id = ?9,
                    ward_id = ?10,
                    is_active = ?11,
                    updated_at = ?12
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    store.name,
                    store.description,
                    store.phone_number,
                    store.email,
                    store.show_phone_number,
                    store.store_image_url,
                    store.county_id,
                    store.sub_county_id,
                    store.ward_id,
                    store.is_active,
                    now_timestamp(),
                ],
            )?;
            let updated = query_store(&tx, id)?;
            tx.commit()?;
            Ok(updated)
        })
    }

    /// The owner's active stores, most recent first.
    pub fn active_stores_for_owner(&self, owner_id: Uuid) -> Result<Vec<Store>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM stores s
                 WHERE s.owner_id = ?1 AND s.is_active = 1
                 ORDER BY s.created_at DESC, s.rowid DESC",
                STORE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id.to_string()], store_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Active stores matching `query`, newest first, one page at a time.
    pub fn list_stores(&self, query: &StoreQuery) -> Result<Page<StoreSummary>> {
        let mut filter = Filter::default();
        filter.push("s.is_active = 1", []);
        if let Some(term) = search_term(query.search.as_deref()) {
            filter.search(&["s.name", "s.description"], term);
        }
        if let Some(county_id) = query.county_id {
            filter.push("s.county_id = ?", [Value::Integer(county_id)]);
        }
        let page = query.page.unwrap_or(1).max(1);

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM stores s {}", filter.where_sql()),
                params_from_iter(filter.params()),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {}, c.name AS county_name, sc.name AS sub_county_name, w.name AS ward_name,
                    (SELECT COUNT(*) FROM products p
                     WHERE p.store_id = s.id AND p.is_active = 1) AS product_count
                 {} {}
                 ORDER BY s.created_at DESC, s.rowid DESC
                 LIMIT ? OFFSET ?",
                STORE_COLUMNS,
                STORE_JOINS,
                filter.where_sql()
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(
                    params_from_iter(filter.params_with_page(PAGE_SIZE, page_offset(page))),
                    |row| {
                        Ok(StoreSummary {
                            store: store_from_row(row)?,
                            location: location_from_row(row)?,
                            product_count: row.get("product_count")?,
                        })
                    },
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Page::new(items, page, total as u64))
        })
    }

    /// Active store with its owner and active products. None when missing or inactive.
    pub fn store_detail(&self, id: Uuid) -> Result<Option<StoreDetail>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, c.name AS county_name, sc.name AS sub_county_name, w.name AS ward_name
                 {} WHERE s.id = ?1 AND s.is_active = 1",
                STORE_COLUMNS, STORE_JOINS
            );
            let found = conn
                .query_row(&sql, [id.to_string()], |row| {
                    Ok((store_from_row(row)?, location_from_row(row)?))
                })
                .optional()?;
            let Some((store, location)) = found else {
                return Ok(None);
            };

            let owner = query_profile(conn, store.owner_id)?.map(|p| public_profile(&p, true));
            let products = query_store_cards(conn, id, false)?;

            Ok(Some(StoreDetail { store, location, owner, products }))
        })
    }
}

pub(crate) fn query_store(conn: &Connection, id: Uuid) -> Result<Option<Store>> {
    let sql = format!("SELECT {} FROM stores s WHERE s.id = ?1", STORE_COLUMNS);
    conn.query_row(&sql, [id.to_string()], store_from_row).optional()
}
