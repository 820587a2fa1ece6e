use diesel::prelude::*;

use super::schema::users;
use crate::models::user::User;

pub fn insert(conn: &mut PgConnection, new_user: &User) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(new_user)
        .returning(User::as_returning())
        .get_result(conn)
}

pub fn get(conn: &mut PgConnection, id: i32) -> QueryResult<Option<User>> {
    users::table
        .find(id)
        .select(User::as_select())
        .first(conn)
        .optional()
}

pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<User>> {
    users::table
        .order(users::user_id)
        .select(User::as_select())
        .load(conn)
}
