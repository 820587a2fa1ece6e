use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// One row of the batch predictions written by the training job.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::db::schema::predictions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Prediction {
    pub prediction_id: i32,
    pub property_id: i32,
    pub predicted_sale_price: f64,
    pub predicted_rent_price: f64,
    pub prob_sold_within_5_months: f64,
}
