//! Payment provider event de-duplication.

use sqlx::PgConnection;

/// Record that an event is being applied. Returns `false` if it was seen
/// before, in which case the caller should skip it.
///
/// Call inside the transaction that applies the event so a failed attempt
/// leaves no record and the provider's retry is processed.
///
/// # Errors
///
/// Returns `sqlx::Error` if the insert fails.
pub async fn record_event(
    conn: &mut PgConnection,
    event_id: &str,
    event_type: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO store.webhook_event (event_id, event_type) VALUES ($1, $2) \
         ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
