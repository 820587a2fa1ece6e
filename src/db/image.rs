use diesel::prelude::*;

use super::schema::images;
use crate::models::image::Image;

pub fn insert(conn: &mut PgConnection, new_image: &Image) -> QueryResult<Image> {
    diesel::insert_into(images::table)
        .values(new_image)
        .returning(Image::as_returning())
        .get_result(conn)
}

pub fn get(conn: &mut PgConnection, id: i32) -> QueryResult<Option<Image>> {
    images::table
        .find(id)
        .select(Image::as_select())
        .first(conn)
        .optional()
}

pub fn get_all(conn: &mut PgConnection) -> QueryResult<Vec<Image>> {
    images::table
        .order(images::image_id)
        .select(Image::as_select())
        .load(conn)
}
