mod common;

#[cfg(test)]
mod encoder {
    use estatia::ml::encoder::{EncodeError, UnseenCategoryPolicy};

    use crate::common::{apartment_features, fixture_models};

    #[test]
    fn in_vocabulary_row_matches_feature_names() {
        let models = fixture_models();
        let layout = &models.sale.layout;
        let row = layout
            .encode(&apartment_features(), &[], UnseenCategoryPolicy::Reject)
            .unwrap();

        assert_eq!(row.columns, layout.feature_names);
        assert_eq!(
            row.values,
            vec![75.0, 3.0, 2.0, 2010.0, 0.0, 1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn baseline_category_has_no_indicator_but_is_accepted() {
        let models = fixture_models();
        let mut features = apartment_features();
        features.renovation_status = "Newly Renovated".to_string();

        let row = models
            .sale
            .layout
            .encode(&features, &[], UnseenCategoryPolicy::Reject)
            .unwrap();
        assert_eq!(row.get("renovation_status_Not Renovated"), Some(0.0));
        assert_eq!(row.get("renovation_status_Partially Renovated"), Some(0.0));
        assert_eq!(row.get("renovation_status_Newly Renovated"), None);
    }

    #[test]
    fn unseen_category_zero_fills_every_indicator() {
        let models = fixture_models();
        let mut features = apartment_features();
        features.district = "Nor Nork".to_string();

        let row = models
            .sale
            .layout
            .encode(&features, &[], UnseenCategoryPolicy::ZeroFill)
            .unwrap();
        let district_total: f64 = row
            .columns
            .iter()
            .zip(&row.values)
            .filter(|(c, _)| c.starts_with("district_"))
            .map(|(_, v)| v)
            .sum();
        assert_eq!(district_total, 0.0);
        assert_eq!(row.get("size_sqm"), Some(75.0));
    }

    #[test]
    fn unseen_category_rejected_names_column_and_value() {
        let models = fixture_models();
        let mut features = apartment_features();
        features.renovation_status = "Gutted".to_string();

        assert_eq!(
            models
                .rent
                .layout
                .encode(&features, &[], UnseenCategoryPolicy::Reject),
            Err(EncodeError::UnseenCategory {
                column: "renovation_status".to_string(),
                value: "Gutted".to_string(),
            })
        );
    }
}
