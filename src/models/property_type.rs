use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::db::schema::property_types)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PropertyType {
    pub type_id: i32,
    pub type_name: Option<String>,
}
