use anyhow::Result;
use rusqlite::{Connection, params};
use tracing::debug;
use uuid::Uuid;

use shamba_types::models::Notification;

use super::accounts::notifications_enabled;
use crate::Database;
use crate::models::{NewNotification, notification_from_row};

impl Database {
    pub fn insert_notification(&self, notification: &NewNotification) -> Result<()> {
        self.with_conn(|conn| insert_notification(conn, notification))
    }

    /// Newest first.
    pub fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, type, title, message, related_id, is_read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id.to_string()], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when the notification does not exist or belongs to someone else.
    pub fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                (id.to_string(), user_id.to_string()),
            )?;
            Ok(changed == 1)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u32> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
            )?;
            Ok(changed as u32)
        })
    }
}

pub(crate) fn insert_notification(conn: &Connection, n: &NewNotification) -> Result<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, type, title, message, related_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            n.id.to_string(),
            n.user_id.to_string(),
            n.kind.as_str(),
            n.title,
            n.message,
            n.related_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

/// Insert `n` unless its recipient switched notifications off.
pub(crate) fn notify_if_enabled(conn: &Connection, n: &NewNotification) -> Result<bool> {
    if !notifications_enabled(conn, n.user_id)? {
        debug!("notifications disabled for {}, skipping {}", n.user_id, n.kind.as_str());
        return Ok(false);
    }
    insert_notification(conn, n)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil;
    use shamba_types::api::UpdateProfileRequest;
    use shamba_types::models::{NotificationType, UserType};

    fn system(user_id: Uuid, title: &str) -> NewNotification {
        NewNotification {
            id: Uuid::new_v4(),
            user_id,
            kind: NotificationType::System,
            title: title.into(),
            message: Some("body".into()),
            related_id: None,
        }
    }

    #[test]
    fn mark_read_is_owner_scoped() {
        let db = Database::open_in_memory().unwrap();
        let alice = testutil::account(&db, "alice@example.com", UserType::Buyer);
        let bob = testutil::account(&db, "bob@example.com", UserType::Buyer);

        let n = system(alice, "Welcome");
        db.insert_notification(&n).unwrap();
        db.insert_notification(&system(alice, "Second")).unwrap();

        assert!(!db.mark_notification_read(n.id, bob).unwrap());
        assert!(db.mark_notification_read(n.id, alice).unwrap());

        let list = db.list_notifications(alice).unwrap();
        assert_eq!(list[0].title, "Second");
        assert_eq!(list.iter().filter(|n| !n.is_read).count(), 1);

        assert_eq!(db.mark_all_notifications_read(alice).unwrap(), 1);
        assert_eq!(db.mark_all_notifications_read(alice).unwrap(), 0);
    }

    #[test]
    fn disabled_recipients_are_skipped() {
        let db = Database::open_in_memory().unwrap();
        let user = testutil::account(&db, "quiet@example.com", UserType::Seller);
        let off = UpdateProfileRequest { notifications_enabled: Some(false), ..Default::default() };
        db.update_profile(user, &off).unwrap();

        let sent = db.with_conn(|conn| notify_if_enabled(conn, &system(user, "Ping"))).unwrap();
        assert!(!sent);
        assert!(db.list_notifications(user).unwrap().is_empty());
    }
}
