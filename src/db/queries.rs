use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingRecord, BookingSettings, BookingStatus, PaymentStatus, Professional,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, professional_user_id, card_id, service_id, service_name, \
     customer_name, customer_email, date_time, status, professional_id, professional_name, \
     created_at, payment_status, stripe_checkout_session_id, idempotency_key";

// ── Booking settings ──

pub fn get_booking_settings(
    conn: &Connection,
    card_id: &str,
) -> anyhow::Result<Option<BookingSettings>> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM booking_settings WHERE card_id = ?1",
            params![card_id],
            |row| row.get(0),
        )
        .optional()?;

    document
        .map(|doc| {
            serde_json::from_str(&doc)
                .with_context(|| format!("corrupt booking settings for card {card_id}"))
        })
        .transpose()
}

pub fn save_booking_settings(
    conn: &Connection,
    card_id: &str,
    settings: &BookingSettings,
) -> anyhow::Result<()> {
    let document = serde_json::to_string(settings)?;
    let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();

    conn.execute(
        "INSERT INTO booking_settings (card_id, document, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(card_id) DO UPDATE SET
           document = excluded.document,
           updated_at = excluded.updated_at",
        params![card_id, document, now],
    )?;
    Ok(())
}

// ── Professionals ──

pub fn list_professionals(conn: &Connection, owner_id: &str) -> anyhow::Result<Vec<Professional>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, image_url FROM professionals
         WHERE owner_id = ?1 ORDER BY created_at ASC, name ASC",
    )?;

    let rows = stmt.query_map(params![owner_id], |row| {
        Ok(Professional {
            id: row.get(0)?,
            name: row.get(1)?,
            image_url: row.get(2)?,
        })
    })?;

    let mut professionals = vec![];
    for row in rows {
        professionals.push(row?);
    }
    Ok(professionals)
}

pub fn add_professional(
    conn: &Connection,
    owner_id: &str,
    professional: &Professional,
) -> anyhow::Result<()> {
    let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
    conn.execute(
        "INSERT INTO professionals (id, owner_id, name, image_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            professional.id,
            owner_id,
            professional.name,
            professional.image_url,
            now,
        ],
    )?;
    Ok(())
}

// ── Bookings ──

/// Inserts a booking and returns its id. A repeated idempotency key returns
/// the id stored the first time and writes nothing.
pub fn create_booking(
    conn: &Connection,
    owner_id: &str,
    record: &BookingRecord,
) -> anyhow::Result<String> {
    if let Some(key) = &record.idempotency_key {
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM bookings WHERE idempotency_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            tracing::info!(booking_id = %id, "duplicate submission, returning existing booking");
            return Ok(id);
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    let date_time = record.date_time.format(TIMESTAMP_FORMAT).to_string();
    let created_at = record.created_at.format(TIMESTAMP_FORMAT).to_string();

    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            id,
            owner_id,
            record.card_id,
            record.service_id,
            record.service_name,
            record.customer_name,
            record.customer_email,
            date_time,
            record.status.as_str(),
            record.professional_id,
            record.professional_name,
            created_at,
            record.payment_status.map(|p| p.as_str()),
            record.stripe_checkout_session_id,
            record.idempotency_key,
        ],
    )?;
    Ok(id)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let mut stmt = conn.prepare(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], |row| Ok(parse_booking_row(row)))?;
    let booking = match rows.next() {
        Some(row) => Some(row??),
        None => None,
    };
    Ok(booking)
}

pub fn list_bookings(
    conn: &Connection,
    owner_id: &str,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE professional_user_id = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY date_time DESC LIMIT ?3"
    ))?;

    let rows = stmt.query_map(
        params![owner_id, status_filter.map(|s| s.as_str()), limit],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_timestamp(value: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .with_context(|| format!("invalid timestamp in bookings table: {value}"))
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_time_str: String = row.get(7)?;
    let status_str: String = row.get(8)?;
    let created_at_str: String = row.get(11)?;
    let payment_status: Option<String> = row.get(12)?;

    Ok(Booking {
        id: row.get(0)?,
        record: BookingRecord {
            professional_user_id: row.get(1)?,
            card_id: row.get(2)?,
            service_id: row.get(3)?,
            service_name: row.get(4)?,
            customer_name: row.get(5)?,
            customer_email: row.get(6)?,
            date_time: parse_timestamp(&date_time_str)?,
            status: BookingStatus::parse(&status_str),
            professional_id: row.get(9)?,
            professional_name: row.get(10)?,
            created_at: parse_timestamp(&created_at_str)?,
            payment_status: payment_status.as_deref().and_then(PaymentStatus::parse),
            stripe_checkout_session_id: row.get(13)?,
            idempotency_key: row.get(14)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::BookingService;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn record(key: Option<&str>, when: &str) -> BookingRecord {
        BookingRecord {
            professional_user_id: "owner-1".to_string(),
            card_id: "card-1".to_string(),
            service_id: "svc1".to_string(),
            service_name: "Cut".to_string(),
            customer_name: "Ana".to_string(),
            customer_email: "ana@x.com".to_string(),
            date_time: dt(when),
            status: BookingStatus::Pending,
            professional_id: None,
            professional_name: None,
            created_at: dt("2025-06-01 08:00"),
            payment_status: None,
            stripe_checkout_session_id: None,
            idempotency_key: key.map(str::to_string),
        }
    }

    #[test]
    fn test_settings_roundtrip_and_upsert() {
        let conn = setup_db();
        assert!(get_booking_settings(&conn, "card-1").unwrap().is_none());

        let mut settings = BookingSettings {
            enabled: true,
            allow_professional_selection: false,
            services: vec![BookingService {
                id: "svc1".to_string(),
                name: "Cut".to_string(),
                duration_minutes: 30,
                price: Some(20.0),
                description: None,
            }],
            availability: Default::default(),
        };
        save_booking_settings(&conn, "card-1", &settings).unwrap();
        settings.enabled = false;
        save_booking_settings(&conn, "card-1", &settings).unwrap();

        let loaded = get_booking_settings(&conn, "card-1").unwrap().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_professionals_are_owner_scoped() {
        let conn = setup_db();
        let pat = Professional {
            id: "P1".to_string(),
            name: "Pat".to_string(),
            image_url: Some("https://img/p1.png".to_string()),
        };
        add_professional(&conn, "owner-1", &pat).unwrap();

        assert_eq!(list_professionals(&conn, "owner-1").unwrap(), vec![pat]);
        assert!(list_professionals(&conn, "owner-2").unwrap().is_empty());
    }

    #[test]
    fn test_create_and_get_booking() {
        let conn = setup_db();
        let id = create_booking(&conn, "owner-1", &record(None, "2025-06-16 10:00")).unwrap();

        let booking = get_booking_by_id(&conn, &id).unwrap().unwrap();
        assert_eq!(booking.record.customer_name, "Ana");
        assert_eq!(booking.record.date_time, dt("2025-06-16 10:00"));
        assert_eq!(booking.record.status, BookingStatus::Pending);
        assert!(get_booking_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_idempotency_key_deduplicates() {
        let conn = setup_db();
        let first = create_booking(&conn, "owner-1", &record(Some("k1"), "2025-06-16 10:00")).unwrap();
        let again = create_booking(&conn, "owner-1", &record(Some("k1"), "2025-06-16 10:00")).unwrap();
        assert_eq!(first, again);

        // keyless writes are never merged
        create_booking(&conn, "owner-1", &record(None, "2025-06-16 10:00")).unwrap();
        create_booking(&conn, "owner-1", &record(None, "2025-06-16 10:00")).unwrap();
        assert_eq!(list_bookings(&conn, "owner-1", None, 50).unwrap().len(), 3);
    }

    #[test]
    fn test_list_bookings_filters() {
        let conn = setup_db();
        create_booking(&conn, "owner-1", &record(None, "2025-06-16 10:00")).unwrap();
        let mut confirmed = record(None, "2025-06-17 10:00");
        confirmed.status = BookingStatus::Confirmed;
        create_booking(&conn, "owner-1", &confirmed).unwrap();
        create_booking(&conn, "owner-2", &record(None, "2025-06-18 10:00")).unwrap();

        let all = list_bookings(&conn, "owner-1", None, 50).unwrap();
        assert_eq!(all.len(), 2);
        // newest appointment first
        assert_eq!(all[0].record.date_time, dt("2025-06-17 10:00"));

        let pending = list_bookings(&conn, "owner-1", Some(BookingStatus::Pending), 50).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(list_bookings(&conn, "owner-1", None, 1).unwrap().len(), 1);
    }
}
