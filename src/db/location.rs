use diesel::prelude::*;

use super::schema::locations;
use crate::models::location::Location;

pub fn insert(conn: &mut PgConnection, new_location: &Location) -> QueryResult<Location> {
    diesel::insert_into(locations::table)
        .values(new_location)
        .returning(Location::as_returning())
        .get_result(conn)
}

pub fn get(conn: &mut PgConnection, id: i32) -> QueryResult<Option<Location>> {
    locations::table
        .find(id)
        .select(Location::as_select())
        .first(conn)
        .optional()
}

pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<Location>> {
    locations::table
        .order(locations::location_id)
        .select(Location::as_select())
        .load(conn)
}
