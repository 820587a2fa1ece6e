use chrono::{Local, NaiveDate};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ml::encoder::PropertyFeatures;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::db::schema::properties)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Property {
    pub property_id: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub type_id: Option<i32>,
    /// Sale or Rent.
    #[serde(default)]
    pub deal_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub user_id: Option<i32>,
    #[serde(default)]
    pub location_id: Option<i32>,
    #[serde(default = "today")]
    pub post_date: NaiveDate,
    #[serde(default)]
    pub sell_date: Option<NaiveDate>,
    #[serde(default)]
    pub size_sqm: Option<f64>,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub rooms: Option<i32>,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub renovation_status: Option<String>,
    #[serde(default)]
    pub estimated_saleprice: Option<f64>,
    #[serde(default)]
    pub estimated_rentprice: Option<f64>,
}

impl Property {
    /// Model inputs for this property, given the district of its location.
    /// Errors name every missing field.
    pub fn features(&self, district: Option<&str>) -> Result<PropertyFeatures, String> {
        let mut missing = Vec::new();
        if self.size_sqm.is_none() {
            missing.push("size_sqm");
        }
        if self.rooms.is_none() {
            missing.push("rooms");
        }
        if self.floor.is_none() {
            missing.push("floor");
        }
        if self.year_built.is_none() {
            missing.push("year_built");
        }
        if district.is_none() {
            missing.push("district");
        }
        if self.renovation_status.is_none() {
            missing.push("renovation_status");
        }

        match (
            self.size_sqm,
            self.rooms,
            self.floor,
            self.year_built,
            district,
            self.renovation_status.as_ref(),
        ) {
            (
                Some(size_sqm),
                Some(rooms),
                Some(floor),
                Some(year_built),
                Some(district),
                Some(renovation_status),
            ) => Ok(PropertyFeatures {
                size_sqm,
                rooms,
                floor,
                year_built,
                district: district.to_string(),
                renovation_status: renovation_status.clone(),
            }),
            _ => Err(format!(
                "property {} is missing {}",
                self.property_id,
                missing.join(", ")
            )),
        }
    }
}
