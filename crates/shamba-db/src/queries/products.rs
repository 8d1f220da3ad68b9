use std::collections::HashMap;

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::debug;
use uuid::Uuid;

use shamba_types::api::{CreateProductRequest, ProductQuery, UpdateProductRequest};
use shamba_types::models::{
    Page, PAGE_SIZE, Product, ProductCard, ProductDetail, ProductImage, StoreContact, page_offset,
};

use super::accounts::query_profile;
use super::stores::query_store;
use super::{Filter, OptionalExt, search_term};
use crate::Database;
use crate::models::{
    PRODUCT_COLUMNS, image_from_row, location_from_row, now_timestamp, product_from_row,
    public_profile,
};

const CARD_SELECT: &str = "s.name AS store_name, sco.name AS store_county,
     c.name AS county_name, sc.name AS sub_county_name, w.name AS ward_name";

const CARD_JOINS: &str = "FROM products p
     JOIN stores s ON s.id = p.store_id
     LEFT JOIN counties sco ON sco.id = s.county_id
     LEFT JOIN counties c ON c.id = p.county_id
     LEFT JOIN sub_counties sc ON sc.id = p.sub_county_id
     LEFT JOIN wards w ON w.id = p.ward_id";

/// Publicly visible: the product and its store are both active.
const VISIBLE: &str = "p.is_active = 1 AND s.is_active = 1";

impl Database {
    pub fn insert_product(&self, id: Uuid, store_id: Uuid, req: &CreateProductRequest) -> Result<Product> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO products (id, store_id, title, description, category, subcategory,
                    price, unit, quantity_available, county_id, sub_county_id, ward_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    id.to_string(),
                    store_id.to_string(),
                    req.title.trim(),
                    req.description,
                    req.category.as_str(),
                    req.subcategory,
                    req.price,
                    req.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()).unwrap_or("piece"),
                    req.quantity_available,
                    req.county_id,
                    req.sub_county_id,
                    req.ward_id,
                ],
            )?;
            query_product(conn, id)?.ok_or_else(|| anyhow::anyhow!("product {} vanished after insert", id))
        })
    }

    /// Attach an image. A new primary image demotes the previous one.
    pub fn add_product_image(
        &self,
        id: Uuid,
        product_id: Uuid,
        image_url: &str,
        is_primary: bool,
    ) -> Result<ProductImage> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if is_primary {
                tx.execute(
                    "UPDATE product_images SET is_primary = 0 WHERE product_id = ?1",
                    [product_id.to_string()],
                )?;
            }
            tx.execute(
                "INSERT INTO product_images (id, product_id, image_url, is_primary)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), product_id.to_string(), image_url, is_primary],
            )?;
            tx.commit()?;
            Ok(ProductImage {
                id,
                image_url: image_url.to_string(),
                is_primary,
            })
        })
    }

    /// Any product by id, active or not.
    pub fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        self.with_conn(|conn| query_product(conn, id))
    }

    /// Read-modify-write of one product row.
    pub fn update_product(&self, id: Uuid, req: &UpdateProductRequest) -> Result<Option<Product>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(mut product) = query_product(&tx, id)? else {
                return Ok(None);
            };
            req.apply(&mut product);
            tx.execute(
                "UPDATE products SET
                    title = ?2,
                    description = ?3,
                    category = ?4,
                    subcategory = ?5,
                    price = ?6,
                    unit = ?7,
                    quantity_available = ?8,
                    county_id = ?9,
                    sub_county_id = ?10,
                    ward_id = ?11,
                    is_active = ?12,
                    updated_at = ?13
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    product.title,
                    product.description,
                    product.category.as_str(),
                    product.subcategory,
                    product.price,
                    product.unit,
                    product.quantity_available,
                    product.county_id,
                    product.sub_county_id,
                    product.ward_id,
                    product.is_active,
                    now_timestamp(),
                ],
            )?;
            let updated = query_product(&tx, id)?;
            tx.commit()?;
            Ok(updated)
        })
    }

    /// Visible products matching `query`, newest first, one page at a time.
    pub fn list_products(&self, query: &ProductQuery) -> Result<Page<ProductCard>> {
        let mut filter = Filter::default();
        filter.push(VISIBLE, []);
        if let Some(term) = search_term(query.search.as_deref()) {
            filter.search(&["p.title", "p.description"], term);
        }
        if let Some(category) = query.category {
            filter.push("p.category = ?", [Value::Text(category.as_str().to_string())]);
        }
        if let Some(county_id) = query.county_id {
            filter.push("p.county_id = ?", [Value::Integer(county_id)]);
        }
        if let Some(min) = query.min_price.filter(|m| *m > 0.0) {
            filter.push("p.price >= ?", [Value::Real(min)]);
        }
        if let Some(max) = query.max_price {
            filter.push("p.price <= ?", [Value::Real(max)]);
        }
        let page = query.page.unwrap_or(1).max(1);

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM products p JOIN stores s ON s.id = p.store_id {}",
                    filter.where_sql()
                ),
                params_from_iter(filter.params()),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {}, {} {} {}
                 ORDER BY p.created_at DESC, p.rowid DESC
                 LIMIT ? OFFSET ?",
                PRODUCT_COLUMNS,
                CARD_SELECT,
                CARD_JOINS,
                filter.where_sql()
            );
            let items = query_cards(
                conn,
                &sql,
                filter.params_with_page(PAGE_SIZE, page_offset(page)),
            )?;
            debug!("product listing page {} -> {} of {}", page, items.len(), total);

            Ok(Page::new(items, page, total as u64))
        })
    }

    /// The newest visible products, for the home page.
    pub fn featured_products(&self, limit: u32) -> Result<Vec<ProductCard>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, {} {} WHERE {}
                 ORDER BY p.created_at DESC, p.rowid DESC
                 LIMIT ?",
                PRODUCT_COLUMNS, CARD_SELECT, CARD_JOINS, VISIBLE
            );
            query_cards(conn, &sql, vec![Value::Integer(limit as i64)])
        })
    }

    /// A visible product with its store contact and seller. None when
    /// missing or inactive.
    pub fn product_detail(&self, id: Uuid) -> Result<Option<ProductDetail>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, {} {} WHERE p.id = ? AND {}",
                PRODUCT_COLUMNS, CARD_SELECT, CARD_JOINS, VISIBLE
            );
            let Some(card) = query_cards(conn, &sql, vec![Value::Text(id.to_string())])?
                .into_iter()
                .next()
            else {
                return Ok(None);
            };

            let Some(store) = query_store(conn, card.product.store_id)? else {
                return Ok(None);
            };
            let seller = query_profile(conn, store.owner_id)?.map(|p| public_profile(&p, false));
            let contact = StoreContact {
                id: store.id,
                name: store.name,
                description: store.description,
                phone_number: if store.show_phone_number { store.phone_number } else { None },
                email: store.email,
            };

            Ok(Some(ProductDetail { card, store: contact, seller }))
        })
    }

    /// Products of one store, newest first.
    pub fn store_products(&self, store_id: Uuid, include_inactive: bool) -> Result<Vec<ProductCard>> {
        self.with_conn(|conn| query_store_cards(conn, store_id, include_inactive))
    }
}

pub(crate) fn query_product(conn: &Connection, id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products p WHERE p.id = ?1", PRODUCT_COLUMNS);
    conn.query_row(&sql, [id.to_string()], product_from_row).optional()
}

pub(crate) fn query_store_cards(
    conn: &Connection,
    store_id: Uuid,
    include_inactive: bool,
) -> Result<Vec<ProductCard>> {
    let active = if include_inactive { "" } else { "AND p.is_active = 1" };
    let sql = format!(
        "SELECT {}, {} {} WHERE p.store_id = ? {}
         ORDER BY p.created_at DESC, p.rowid DESC",
        PRODUCT_COLUMNS, CARD_SELECT, CARD_JOINS, active
    );
    query_cards(conn, &sql, vec![Value::Text(store_id.to_string())])
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<ProductCard> {
    Ok(ProductCard {
        product: product_from_row(row)?,
        store_name: row.get("store_name")?,
        store_county: row.get("store_county")?,
        location: location_from_row(row)?,
        images: Vec::new(),
    })
}

/// Run a card query, then batch-load images for every returned product.
fn query_cards(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<Vec<ProductCard>> {
    let mut stmt = conn.prepare(sql)?;
    let mut cards = stmt
        .query_map(params_from_iter(params), card_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let ids: Vec<String> = cards.iter().map(|c| c.product.id.to_string()).collect();
    let mut images = images_for_products(conn, &ids)?;
    for card in &mut cards {
        if let Some(list) = images.remove(&card.product.id.to_string()) {
            card.images = list;
        }
    }
    Ok(cards)
}

/// Images grouped by product id, primary first.
fn images_for_products(conn: &Connection, product_ids: &[String]) -> Result<HashMap<String, Vec<ProductImage>>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=product_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT id, product_id, image_url, is_primary FROM product_images
         WHERE product_id IN ({})
         ORDER BY is_primary DESC, created_at, rowid",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(product_ids), |row| {
            Ok((row.get::<_, String>("product_id")?, image_from_row(row)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut grouped: HashMap<String, Vec<ProductImage>> = HashMap::new();
    for (product_id, image) in rows {
        grouped.entry(product_id).or_default().push(image);
    }
    Ok(grouped)
}
