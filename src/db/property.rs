use diesel::prelude::*;

use super::schema::properties;
use crate::models::property::Property;

pub fn insert(conn: &mut PgConnection, new_property: &Property) -> QueryResult<Property> {
    diesel::insert_into(properties::table)
        .values(new_property)
        .returning(Property::as_returning())
        .get_result(conn)
}

pub fn get(conn: &mut PgConnection, id: i32) -> QueryResult<Option<Property>> {
    properties::table
        .find(id)
        .select(Property::as_select())
        .first(conn)
        .optional()
}

pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<Property>> {
    properties::table
        .order(properties::property_id)
        .select(Property::as_select())
        .load(conn)
}
