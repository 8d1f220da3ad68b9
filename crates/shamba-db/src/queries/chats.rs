use anyhow::Result;
use rusqlite::{Connection, params};
use uuid::Uuid;

use shamba_types::models::{ChatSummary, Counterpart, Message};

use super::OptionalExt;
use super::notifications::notify_if_enabled;
use crate::Database;
use crate::models::{ChatRow, NewNotification, message_from_row, now_timestamp, time_col, uuid_col};

const UNKNOWN_USER: &str = "Unknown User";

impl Database {
    /// Find or create the chat for (buyer, seller, product), post `content`
    /// from the buyer and raise `inquiry` for the seller. Returns the chat id
    /// and whether the chat was created by this call.
    ///
    /// The UNIQUE constraint on the triple makes concurrent first contacts
    /// converge on a single chat.
    pub fn open_chat(
        &self,
        new_chat_id: Uuid,
        buyer_id: Uuid,
        seller_id: Uuid,
        product_id: Uuid,
        content: &str,
        inquiry: NewNotification,
    ) -> Result<(Uuid, bool)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let created = tx.execute(
                "INSERT INTO chats (id, buyer_id, seller_id, product_id) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(buyer_id, seller_id, product_id) DO NOTHING",
                (
                    new_chat_id.to_string(),
                    buyer_id.to_string(),
                    seller_id.to_string(),
                    product_id.to_string(),
                ),
            )? == 1;

            let chat_id: String = tx.query_row(
                "SELECT id FROM chats WHERE buyer_id = ?1 AND seller_id = ?2 AND product_id = ?3",
                (buyer_id.to_string(), seller_id.to_string(), product_id.to_string()),
                |row| row.get(0),
            )?;
            let chat_id: Uuid = chat_id.parse()?;

            insert_message(&tx, Uuid::new_v4(), chat_id, buyer_id, content)?;
            notify_if_enabled(&tx, &NewNotification { related_id: Some(chat_id), ..inquiry })?;

            tx.commit()?;
            Ok((chat_id, created))
        })
    }

    pub fn get_chat(&self, id: Uuid) -> Result<Option<ChatRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, buyer_id, seller_id, product_id FROM chats WHERE id = ?1",
                [id.to_string()],
                |row| {
                    Ok(ChatRow {
                        id: uuid_col(row, "id")?,
                        buyer_id: uuid_col(row, "buyer_id")?,
                        seller_id: uuid_col(row, "seller_id")?,
                        product_id: uuid_col(row, "product_id")?,
                    })
                },
            )
            .optional()
        })
    }

    /// Chats the user takes part in, most recently active first.
    pub fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ch.id, ch.buyer_id, ch.seller_id, ch.product_id, ch.created_at,
                        ch.last_message_at, pr.title AS product_title,
                        bp.full_name AS buyer_name, bp.profile_picture_url AS buyer_avatar,
                        sp.full_name AS seller_name, sp.profile_picture_url AS seller_avatar,
                        (SELECT m.content FROM messages m WHERE m.chat_id = ch.id
                         ORDER BY m.created_at DESC, m.rowid DESC LIMIT 1) AS last_message,
                        (SELECT COUNT(*) FROM messages m WHERE m.chat_id = ch.id
                         AND m.sender_id != ?1 AND m.is_read = 0) AS unread_count
                 FROM chats ch
                 JOIN products pr ON pr.id = ch.product_id
                 LEFT JOIN profiles bp ON bp.id = ch.buyer_id
                 LEFT JOIN profiles sp ON sp.id = ch.seller_id
                 WHERE ch.buyer_id = ?1 OR ch.seller_id = ?1
                 ORDER BY ch.last_message_at DESC, ch.rowid DESC",
            )?;

            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    let buyer_id = uuid_col(row, "buyer_id")?;
                    let seller_id = uuid_col(row, "seller_id")?;
                    let (id, name, avatar) = if buyer_id == user_id {
                        (seller_id, row.get::<_, Option<String>>("seller_name")?, row.get("seller_avatar")?)
                    } else {
                        (buyer_id, row.get::<_, Option<String>>("buyer_name")?, row.get("buyer_avatar")?)
                    };

                    Ok(ChatSummary {
                        id: uuid_col(row, "id")?,
                        buyer_id,
                        seller_id,
                        product_id: uuid_col(row, "product_id")?,
                        product_title: row.get("product_title")?,
                        counterpart: Counterpart {
                            id,
                            name: name.unwrap_or_else(|| UNKNOWN_USER.to_string()),
                            avatar_url: avatar,
                        },
                        last_message: row.get("last_message")?,
                        unread_count: row.get("unread_count")?,
                        last_message_at: time_col(row, "last_message_at")?,
                        created_at: time_col(row, "created_at")?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Messages of a chat in send order, then mark everything the reader did
    /// not send as read. Returns the messages as they were before marking and
    /// how many were marked.
    pub fn read_messages(&self, chat_id: Uuid, reader_id: Uuid) -> Result<(Vec<Message>, u32)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let messages = query_messages(&tx, chat_id)?;
            let marked = tx.execute(
                "UPDATE messages SET is_read = 1
                 WHERE chat_id = ?1 AND sender_id != ?2 AND is_read = 0",
                (chat_id.to_string(), reader_id.to_string()),
            )?;
            tx.commit()?;
            Ok((messages, marked as u32))
        })
    }

    /// Append a message, bump the chat's activity time and notify the
    /// counterpart.
    pub fn send_message(
        &self,
        id: Uuid,
        chat: &ChatRow,
        sender_id: Uuid,
        content: &str,
        notification: NewNotification,
    ) -> Result<Message> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_message(&tx, id, chat.id, sender_id, content)?;
            notify_if_enabled(&tx, &notification)?;
            let message = tx.query_row(
                "SELECT id, chat_id, sender_id, content, is_read, created_at
                 FROM messages WHERE id = ?1",
                [id.to_string()],
                message_from_row,
            )?;
            tx.commit()?;
            Ok(message)
        })
    }
}

fn insert_message(conn: &Connection, id: Uuid, chat_id: Uuid, sender_id: Uuid, content: &str) -> Result<()> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id.to_string(), chat_id.to_string(), sender_id.to_string(), content, now],
    )?;
    conn.execute(
        "UPDATE chats SET last_message_at = ?2 WHERE id = ?1",
        (chat_id.to_string(), now),
    )?;
    Ok(())
}

fn query_messages(conn: &Connection, chat_id: Uuid) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_id, sender_id, content, is_read, created_at
         FROM messages
         WHERE chat_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt
        .query_map([chat_id.to_string()], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
