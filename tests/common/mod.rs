#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;

use estatia::{
    config::{self, Config},
    db::{Store, StoreError},
    ml::{encoder::PropertyFeatures, Models},
    models::{
        image::Image, location::Location, prediction::Prediction, property::Property,
        property_type::PropertyType, user::User,
    },
    services::predictions::PredictionService,
};

/// Store kept in process memory, with the same conflict and reference rules
/// as the Postgres one.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<BTreeMap<i32, User>>,
    locations: Mutex<BTreeMap<i32, Location>>,
    property_types: Mutex<BTreeMap<i32, PropertyType>>,
    properties: Mutex<BTreeMap<i32, Property>>,
    images: Mutex<BTreeMap<i32, Image>>,
    predictions: Mutex<BTreeMap<i32, Prediction>>,
}

fn insert<T: Clone>(
    table: &Mutex<BTreeMap<i32, T>>,
    entity: &str,
    id: i32,
    row: T,
) -> Result<T, StoreError> {
    let mut table = table.lock().unwrap();
    if table.contains_key(&id) {
        return Err(StoreError::Conflict(format!("{entity} {id} already exists")));
    }
    table.insert(id, row.clone());
    Ok(row)
}

fn check_reference<T>(
    table: &Mutex<BTreeMap<i32, T>>,
    column: &str,
    id: Option<i32>,
) -> Result<(), StoreError> {
    match id {
        Some(id) if !table.lock().unwrap().contains_key(&id) => Err(
            StoreError::InvalidReference(format!("{column} {id} does not exist")),
        ),
        _ => Ok(()),
    }
}

impl Store for MemoryStore {
    fn create_user(&self, user: User) -> Result<User, StoreError> {
        insert(&self.users, "User", user.user_id, user)
    }

    fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().unwrap().values().cloned().collect())
    }

    fn create_location(&self, location: Location) -> Result<Location, StoreError> {
        insert(&self.locations, "Location", location.location_id, location)
    }

    fn get_location(&self, id: i32) -> Result<Option<Location>, StoreError> {
        Ok(self.locations.lock().unwrap().get(&id).cloned())
    }

    fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        Ok(self.locations.lock().unwrap().values().cloned().collect())
    }

    fn create_property_type(
        &self,
        property_type: PropertyType,
    ) -> Result<PropertyType, StoreError> {
        insert(
            &self.property_types,
            "PropertyType",
            property_type.type_id,
            property_type,
        )
    }

    fn get_property_type(&self, id: i32) -> Result<Option<PropertyType>, StoreError> {
        Ok(self.property_types.lock().unwrap().get(&id).cloned())
    }

    fn list_property_types(&self) -> Result<Vec<PropertyType>, StoreError> {
        Ok(self.property_types.lock().unwrap().values().cloned().collect())
    }

    fn create_property(&self, property: Property) -> Result<Property, StoreError> {
        check_reference(&self.locations, "location_id", property.location_id)?;
        check_reference(&self.users, "user_id", property.user_id)?;
        check_reference(&self.property_types, "type_id", property.type_id)?;
        insert(&self.properties, "Property", property.property_id, property)
    }

    fn get_property(&self, id: i32) -> Result<Option<Property>, StoreError> {
        Ok(self.properties.lock().unwrap().get(&id).cloned())
    }

    fn list_properties(&self) -> Result<Vec<Property>, StoreError> {
        Ok(self.properties.lock().unwrap().values().cloned().collect())
    }

    fn create_image(&self, image: Image) -> Result<Image, StoreError> {
        check_reference(&self.properties, "property_id", image.property_id)?;
        insert(&self.images, "Image", image.image_id, image)
    }

    fn get_image(&self, id: i32) -> Result<Option<Image>, StoreError> {
        Ok(self.images.lock().unwrap().get(&id).cloned())
    }

    fn list_images(&self) -> Result<Vec<Image>, StoreError> {
        Ok(self.images.lock().unwrap().values().cloned().collect())
    }

    fn replace_predictions(&self, rows: Vec<Prediction>) -> Result<usize, StoreError> {
        let mut table = self.predictions.lock().unwrap();
        table.clear();
        let written = rows.len();
        for row in rows {
            table.insert(row.prediction_id, row);
        }
        Ok(written)
    }

    fn get_prediction(&self, property_id: i32) -> Result<Option<Prediction>, StoreError> {
        Ok(self
            .predictions
            .lock()
            .unwrap()
            .values()
            .find(|p| p.property_id == property_id)
            .cloned())
    }

    fn list_predictions(&self) -> Result<Vec<Prediction>, StoreError> {
        Ok(self.predictions.lock().unwrap().values().cloned().collect())
    }
}

pub fn fixture_dir() -> String {
    format!("{}/tests/fixtures", env!("CARGO_MANIFEST_DIR"))
}

pub fn test_config() -> Config {
    Config {
        model_dir: fixture_dir(),
        ..config::create_test_config()
    }
}

pub fn fixture_models() -> Arc<Models> {
    Arc::new(Models::load(fixture_dir()).unwrap())
}

pub fn service(store: Arc<dyn Store>, config: &Config) -> PredictionService {
    PredictionService::new(store, fixture_models(), config)
}

pub fn kentron() -> Location {
    Location {
        location_id: 1,
        region: Some("Yerevan".to_string()),
        city: Some("Yerevan".to_string()),
        district: Some("Kentron".to_string()),
    }
}

pub fn apartment(property_id: i32, location_id: Option<i32>) -> Property {
    Property {
        property_id,
        title: Some("Two bedroom flat".to_string()),
        type_id: None,
        deal_type: Some("Sale".to_string()),
        status: Some("Active".to_string()),
        user_id: None,
        location_id,
        post_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        sell_date: None,
        size_sqm: Some(75.0),
        floor: Some(2),
        rooms: Some(3),
        year_built: Some(2010),
        renovation_status: Some("Partially Renovated".to_string()),
        estimated_saleprice: None,
        estimated_rentprice: None,
    }
}

pub fn apartment_features() -> PropertyFeatures {
    PropertyFeatures {
        size_sqm: 75.0,
        rooms: 3,
        floor: 2,
        year_built: 2010,
        district: "Kentron".to_string(),
        renovation_status: "Partially Renovated".to_string(),
    }
}

/// Store holding the Kentron location and one complete apartment (id 10).
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    store.create_location(kentron()).unwrap();
    store.create_property(apartment(10, Some(1))).unwrap();
    store
}

pub fn rounded(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
