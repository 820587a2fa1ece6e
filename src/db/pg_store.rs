use diesel::{
    r2d2::{ConnectionManager, PooledConnection},
    result::Error as DieselError,
    PgConnection, QueryResult,
};
use log::{info, warn};

use super::{
    image, location, prediction, property, property_type, user, PgPool, Store, StoreError,
};
use crate::models::{
    image::Image, location::Location, prediction::Prediction, property::Property,
    property_type::PropertyType, user::User,
};

type Conn = PooledConnection<ConnectionManager<PgConnection>>;

/// [`Store`] over a Postgres pool. Every call checks out one connection and
/// hands it back when the call returns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<Conn, StoreError> {
        self.pool
            .get()
            .map_err(|e| StoreError::Pool(e.to_string()))
    }

    fn create_unique<T>(
        &self,
        entity: &str,
        id: i32,
        exists: impl FnOnce(&mut PgConnection) -> QueryResult<bool>,
        insert: impl FnOnce(&mut PgConnection) -> QueryResult<T>,
    ) -> Result<T, StoreError> {
        let mut pooled = self.connection()?;
        let conn: &mut PgConnection = &mut pooled;

        if exists(conn)? {
            warn!("Refusing to create {entity} {id}: already exists");
            return Err(StoreError::Conflict(format!("{entity} {id} already exists")));
        }

        let created = insert(conn).map_err(|e| insert_error(entity, id, e))?;
        info!("Created {entity} {id}");
        Ok(created)
    }
}

/// A unique violation here means a concurrent insert of the same id won.
fn insert_error(entity: &str, id: i32, err: DieselError) -> StoreError {
    match StoreError::from(err) {
        StoreError::Conflict(_) => StoreError::Conflict(format!("{entity} {id} already exists")),
        other => other,
    }
}

impl Store for PgStore {
    fn create_user(&self, new_user: User) -> Result<User, StoreError> {
        let id = new_user.user_id;
        self.create_unique(
            "User",
            id,
            |conn| user::get(conn, id).map(|u| u.is_some()),
            |conn| user::insert(conn, &new_user),
        )
    }

    fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(user::get(&mut *self.connection()?, id)?)
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(user::get_all(&mut *self.connection()?)?)
    }

    fn create_location(&self, new_location: Location) -> Result<Location, StoreError> {
        let id = new_location.location_id;
        self.create_unique(
            "Location",
            id,
            |conn| location::get(conn, id).map(|l| l.is_some()),
            |conn| location::insert(conn, &new_location),
        )
    }

    fn get_location(&self, id: i32) -> Result<Option<Location>, StoreError> {
        Ok(location::get(&mut *self.connection()?, id)?)
    }

    fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        Ok(location::get_all(&mut *self.connection()?)?)
    }

    fn create_property_type(&self, new_type: PropertyType) -> Result<PropertyType, StoreError> {
        let id = new_type.type_id;
        self.create_unique(
            "PropertyType",
            id,
            |conn| property_type::get(conn, id).map(|t| t.is_some()),
            |conn| property_type::insert(conn, &new_type),
        )
    }

    fn get_property_type(&self, id: i32) -> Result<Option<PropertyType>, StoreError> {
        Ok(property_type::get(&mut *self.connection()?, id)?)
    }

    fn list_property_types(&self) -> Result<Vec<PropertyType>, StoreError> {
        Ok(property_type::get_all(&mut *self.connection()?)?)
    }

    fn create_property(&self, new_property: Property) -> Result<Property, StoreError> {
        let id = new_property.property_id;
        self.create_unique(
            "Property",
            id,
            |conn| property::get(conn, id).map(|p| p.is_some()),
            |conn| property::insert(conn, &new_property),
        )
    }

    fn get_property(&self, id: i32) -> Result<Option<Property>, StoreError> {
        Ok(property::get(&mut *self.connection()?, id)?)
    }

    fn list_properties(&self) -> Result<Vec<Property>, StoreError> {
        Ok(property::get_all(&mut *self.connection()?)?)
    }

    fn create_image(&self, new_image: Image) -> Result<Image, StoreError> {
        let id = new_image.image_id;
        self.create_unique(
            "Image",
            id,
            |conn| image::get(conn, id).map(|i| i.is_some()),
            |conn| image::insert(conn, &new_image),
        )
    }

    fn get_image(&self, id: i32) -> Result<Option<Image>, StoreError> {
        Ok(image::get(&mut *self.connection()?, id)?)
    }

    fn list_images(&self) -> Result<Vec<Image>, StoreError> {
        Ok(image::get_all(&mut *self.connection()?)?)
    }

    fn replace_predictions(&self, rows: Vec<Prediction>) -> Result<usize, StoreError> {
        Ok(prediction::replace_all(&mut *self.connection()?, &rows)?)
    }

    fn get_prediction(&self, property_id: i32) -> Result<Option<Prediction>, StoreError> {
        Ok(prediction::get_for_property(
            &mut *self.connection()?,
            property_id,
        )?)
    }

    fn list_predictions(&self) -> Result<Vec<Prediction>, StoreError> {
        Ok(prediction::get_all(&mut *self.connection()?)?)
    }
}
