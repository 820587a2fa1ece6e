use diesel::prelude::*;

use super::schema::property_types;
use crate::models::property_type::PropertyType;

pub fn insert(conn: &mut PgConnection, new_type: &PropertyType) -> QueryResult<PropertyType> {
    diesel::insert_into(property_types::table)
        .values(new_type)
        .returning(PropertyType::as_returning())
        .get_result(conn)
}

pub fn get(conn: &mut PgConnection, id: i32) -> QueryResult<Option<PropertyType>> {
    property_types::table
        .find(id)
        .select(PropertyType::as_select())
        .first(conn)
        .optional()
}

pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<PropertyType>> {
    property_types::table
        .order(property_types::type_id)
        .select(PropertyType::as_select())
        .load(conn)
}
