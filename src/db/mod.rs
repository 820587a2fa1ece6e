pub mod image;
pub mod location;
pub mod pg_store;
pub mod prediction;
pub mod property;
pub mod property_type;
pub mod schema;
pub mod user;

use anyhow::{Context, Result};
use diesel::{
    r2d2::{ConnectionManager, Pool},
    result::{DatabaseErrorKind, Error as DieselError},
    PgConnection, RunQueryDsl,
};
use log::info;
use thiserror::Error;

use crate::{
    config::Config,
    models::{
        image::Image, location::Location, prediction::Prediction, property::Property,
        property_type::PropertyType, user::User,
    },
};

pub use pg_store::PgStore;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidReference(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("could not get a database connection: {0}")]
    Pool(String),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                StoreError::InvalidReference(
                    info.details().unwrap_or(info.message()).to_string(),
                )
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Row storage for every entity the service exposes. Lookups return
/// `Ok(None)` when the id does not exist; creates fail with
/// [`StoreError::Conflict`] when it already does.
pub trait Store: Send + Sync {
    fn create_user(&self, user: User) -> Result<User, StoreError>;
    fn get_user(&self, id: i32) -> Result<Option<User>, StoreError>;
    fn list_users(&self) -> Result<Vec<User>, StoreError>;

    fn create_location(&self, location: Location) -> Result<Location, StoreError>;
    fn get_location(&self, id: i32) -> Result<Option<Location>, StoreError>;
    fn list_locations(&self) -> Result<Vec<Location>, StoreError>;

    fn create_property_type(&self, property_type: PropertyType)
        -> Result<PropertyType, StoreError>;
    fn get_property_type(&self, id: i32) -> Result<Option<PropertyType>, StoreError>;
    fn list_property_types(&self) -> Result<Vec<PropertyType>, StoreError>;

    fn create_property(&self, property: Property) -> Result<Property, StoreError>;
    fn get_property(&self, id: i32) -> Result<Option<Property>, StoreError>;
    fn list_properties(&self) -> Result<Vec<Property>, StoreError>;

    fn create_image(&self, image: Image) -> Result<Image, StoreError>;
    fn get_image(&self, id: i32) -> Result<Option<Image>, StoreError>;
    fn list_images(&self) -> Result<Vec<Image>, StoreError>;

    /// Replaces the whole predictions table, returning the number of rows written.
    fn replace_predictions(&self, rows: Vec<Prediction>) -> Result<usize, StoreError>;
    fn get_prediction(&self, property_id: i32) -> Result<Option<Prediction>, StoreError>;
    fn list_predictions(&self) -> Result<Vec<Prediction>, StoreError>;
}

const CREATE_TABLES: [&str; 6] = [
    r#"CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY,
        username TEXT,
        email TEXT,
        phone_number TEXT,
        user_type TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS locations (
        location_id INTEGER PRIMARY KEY,
        region TEXT,
        city TEXT,
        district TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS property_types (
        type_id INTEGER PRIMARY KEY,
        type_name TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS properties (
        property_id INTEGER PRIMARY KEY,
        title TEXT,
        type_id INTEGER REFERENCES property_types (type_id),
        deal_type TEXT,
        status TEXT,
        user_id INTEGER REFERENCES users (user_id),
        location_id INTEGER REFERENCES locations (location_id),
        post_date DATE NOT NULL,
        sell_date DATE,
        size_sqm DOUBLE PRECISION,
        floor INTEGER,
        rooms INTEGER,
        year_built INTEGER,
        renovation_status TEXT,
        estimated_saleprice DOUBLE PRECISION,
        estimated_rentprice DOUBLE PRECISION
    )"#,
    r#"CREATE TABLE IF NOT EXISTS images (
        image_id INTEGER PRIMARY KEY,
        property_id INTEGER REFERENCES properties (property_id),
        image_url TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS predictions (
        prediction_id INTEGER PRIMARY KEY,
        property_id INTEGER NOT NULL REFERENCES properties (property_id) ON DELETE CASCADE,
        predicted_sale_price DOUBLE PRECISION NOT NULL,
        predicted_rent_price DOUBLE PRECISION NOT NULL,
        prob_sold_within_5_months DOUBLE PRECISION NOT NULL
    )"#,
];

pub fn establish_pool(config: &Config) -> Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(&config.db_path);
    Pool::builder()
        .max_size(config.pool_size())
        .build(manager)
        .context("Failed to build database connection pool")
}

pub fn create_tables(pool: &PgPool) -> Result<()> {
    let mut conn = pool
        .get()
        .context("Failed to get connection for table creation")?;

    for statement in CREATE_TABLES {
        diesel::sql_query(statement)
            .execute(&mut *conn)
            .context("Failed to create tables")?;
    }

    info!("Database tables ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database_error(kind: DatabaseErrorKind, message: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(message.to_string()))
    }

    #[test]
    fn unique_violation_is_a_conflict() {
        let err = StoreError::from(database_error(
            DatabaseErrorKind::UniqueViolation,
            "duplicate key value violates unique constraint \"users_pkey\"",
        ));
        assert_eq!(
            err,
            StoreError::Conflict(
                "duplicate key value violates unique constraint \"users_pkey\"".to_string()
            )
        );
    }

    #[test]
    fn foreign_key_violation_is_an_invalid_reference() {
        let err = StoreError::from(database_error(
            DatabaseErrorKind::ForeignKeyViolation,
            "insert on table \"properties\" violates foreign key constraint",
        ));
        assert!(matches!(err, StoreError::InvalidReference(m) if m.contains("foreign key")));
    }

    #[test]
    fn other_failures_are_database_errors() {
        assert_eq!(
            StoreError::from(DieselError::NotFound),
            StoreError::Database("Record not found".to_string())
        );
        assert!(matches!(
            StoreError::from(database_error(
                DatabaseErrorKind::SerializationFailure,
                "could not serialize access"
            )),
            StoreError::Database(_)
        ));
    }
}
