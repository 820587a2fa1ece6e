use diesel::prelude::*;
use log::info;

use super::schema::predictions;
use crate::models::prediction::Prediction;

// Keeps each INSERT well under the Postgres bind parameter limit.
const INSERT_CHUNK: usize = 1000;

/// Drops every stored prediction and writes `rows` in their place.
pub fn replace_all(conn: &mut PgConnection, rows: &[Prediction]) -> QueryResult<usize> {
    conn.transaction(|conn| {
        let deleted = diesel::delete(predictions::table).execute(conn)?;
        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_CHUNK) {
            inserted += diesel::insert_into(predictions::table)
                .values(chunk)
                .execute(conn)?;
        }
        info!("Replaced {deleted} prediction rows with {inserted}");
        Ok(inserted)
    })
}

pub fn get_for_property(
    conn: &mut PgConnection,
    target_property_id: i32,
) -> QueryResult<Option<Prediction>> {
    predictions::table
        .filter(predictions::property_id.eq(target_property_id))
        .order(predictions::prediction_id)
        .select(Prediction::as_select())
        .first(conn)
        .optional()
}

pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<Prediction>> {
    predictions::table
        .order(predictions::prediction_id)
        .select(Prediction::as_select())
        .load(conn)
}
