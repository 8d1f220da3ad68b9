use anyhow::Result;
use rusqlite::{Connection, params};
use uuid::Uuid;

use shamba_types::api::UpdateProfileRequest;
use shamba_types::models::{Profile, UserType};

use super::OptionalExt;
use crate::Database;
use crate::models::{PROFILE_COLUMNS, UserRow, now_timestamp, profile_from_row};

impl Database {
    // -- Users --

    /// Insert the identity and its profile in one transaction.
    pub fn create_account(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
        full_name: &str,
        phone_number: Option<&str>,
        user_type: UserType,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id.to_string(), email, password_hash),
            )?;
            tx.execute(
                "INSERT INTO profiles (id, email, full_name, phone_number, user_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.to_string(), email, full_name.trim(), phone_number, user_type.as_str()],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                [email],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: Uuid, user_id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id) VALUES (?1, ?2)",
                (id.to_string(), user_id.to_string()),
            )?;
            Ok(())
        })
    }

    pub fn session_is_active(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let active: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sessions
                 WHERE id = ?1 AND user_id = ?2 AND revoked_at IS NULL)",
                (id.to_string(), user_id.to_string()),
                |row| row.get(0),
            )?;
            Ok(active)
        })
    }

    pub fn revoke_session(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET revoked_at = ?2 WHERE id = ?1 AND revoked_at IS NULL",
                (id.to_string(), now_timestamp()),
            )?;
            Ok(())
        })
    }

    // -- Profiles --

    pub fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    /// Read the row, merge the fields `req` names (explicit nulls clear),
    /// write it back. `None` when there is no such profile.
    pub fn update_profile(&self, id: Uuid, req: &UpdateProfileRequest) -> Result<Option<Profile>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(mut profile) = query_profile(&tx, id)? else {
                return Ok(None);
            };
            req.apply(&mut profile);
            tx.execute(
                "UPDATE profiles SET
                    full_name = ?2,
                    phone_number = ?3,
                    county_id = ?4,
                    sub_county_id = ?5,
                    ward_id = ?6,
                    show_phone_number = ?7,
                    notifications_enabled = ?8,
                    user_type = ?9,
                    profile_picture_url = ?10,
                    updated_at = ?11
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    profile.full_name,
                    profile.phone_number,
                    profile.county_id,
                    profile.sub_county_id,
                    profile.ward_id,
                    profile.show_phone_number,
                    profile.notifications_enabled,
                    profile.user_type.as_str(),
                    profile.profile_picture_url,
                    now_timestamp(),
                ],
            )?;
            let updated = query_profile(&tx, id)?;
            tx.commit()?;
            Ok(updated)
        })
    }
}

pub(crate) fn query_profile(conn: &Connection, id: Uuid) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles p WHERE p.id = ?1", PROFILE_COLUMNS);
    conn.query_row(&sql, [id.to_string()], profile_from_row).optional()
}

/// Whether the profile wants notifications. Missing profiles don't.
pub(crate) fn notifications_enabled(conn: &Connection, id: Uuid) -> Result<bool> {
    let enabled: Option<bool> = conn
        .query_row(
            "SELECT notifications_enabled FROM profiles WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(enabled.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil;

    #[test]
    fn account_creates_profile_with_defaults() {
        let db = Database::open_in_memory().unwrap();
        let id = testutil::account(&db, "otieno@example.com", UserType::Seller);

        let profile = db.get_profile(id).unwrap().unwrap();
        assert_eq!(profile.user_type, UserType::Seller);
        assert!(profile.notifications_enabled);
        assert!(!profile.show_phone_number);
    }

    #[test]
    fn email_is_unique_ignoring_case() {
        let db = Database::open_in_memory().unwrap();
        testutil::account(&db, "achieng@example.com", UserType::Buyer);
        let dup = db.create_account(
            Uuid::new_v4(),
            "Achieng@Example.com",
            "hash",
            "Achieng",
            None,
            UserType::Buyer,
        );
        assert!(dup.is_err());
        assert!(db.get_user_by_email("ACHIENG@example.com").unwrap().is_some());
    }

    #[test]
    fn revoked_session_is_inactive() {
        let db = Database::open_in_memory().unwrap();
        let user = testutil::account(&db, "kiprop@example.com", UserType::Buyer);
        let sid = Uuid::new_v4();
        db.create_session(sid, user).unwrap();
        assert!(db.session_is_active(sid, user).unwrap());

        db.revoke_session(sid).unwrap();
        assert!(!db.session_is_active(sid, user).unwrap());
    }

    #[test]
    fn profile_update_keeps_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        let id = testutil::account(&db, "njeri@example.com", UserType::Buyer);
        let before = db.get_profile(id).unwrap().unwrap();

        let req = UpdateProfileRequest {
            phone_number: Some(Some("0712345678".into())),
            show_phone_number: Some(true),
            ..Default::default()
        };
        let after = db.update_profile(id, &req).unwrap().unwrap();
        assert_eq!(after.full_name, before.full_name);
        assert_eq!(after.phone_number.as_deref(), Some("0712345678"));
        assert!(after.show_phone_number);

        assert!(db.update_profile(Uuid::new_v4(), &req).unwrap().is_none());
    }

    #[test]
    fn explicit_null_clears_a_field() {
        let db = Database::open_in_memory().unwrap();
        let id = testutil::account(&db, "wafula@example.com", UserType::Buyer);
        let set = UpdateProfileRequest {
            county_id: Some(Some(47)),
            sub_county_id: Some(Some(1)),
            profile_picture_url: Some(Some("http://x/a.png".into())),
            ..Default::default()
        };
        db.update_profile(id, &set).unwrap();

        let clear = UpdateProfileRequest {
            county_id: Some(Some(32)),
            sub_county_id: Some(None),
            profile_picture_url: Some(None),
            ..Default::default()
        };
        let after = db.update_profile(id, &clear).unwrap().unwrap();
        assert_eq!(after.county_id, Some(32));
        assert_eq!(after.sub_county_id, None);
        assert_eq!(after.profile_picture_url, None);
    }

}
