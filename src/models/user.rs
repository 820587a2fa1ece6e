use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::db::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub user_id: i32,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    /// Agent, Owner or Buyer.
    pub user_type: Option<String>,
}
