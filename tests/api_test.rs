mod common;

#[cfg(test)]
mod http_api {
    use std::{net::SocketAddr, sync::Arc};

    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use estatia::{
        db::Store,
        web::{self, AppState},
    };

    use crate::common::{rounded, service, test_config, MemoryStore};

    async fn spawn_server() -> SocketAddr {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::default());
        let predictions = Arc::new(service(store.clone(), &test_config()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(web::start_http_server(
            listener,
            AppState { store, predictions },
            std::future::pending(),
        ));
        addr
    }

    fn apartment_json(property_id: i32, location_id: i32) -> Value {
        json!({
            "property_id": property_id,
            "title": "Two bedroom flat",
            "deal_type": "Sale",
            "location_id": location_id,
            "post_date": "2024-01-15",
            "size_sqm": 75.0,
            "rooms": 3,
            "floor": 2,
            "year_built": 2010,
            "renovation_status": "Partially Renovated"
        })
    }

    async fn post(client: &reqwest::Client, url: String, body: &Value) -> reqwest::Response {
        client.post(url).json(body).send().await.unwrap()
    }

    #[tokio::test]
    async fn user_crud_and_conflicts() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();
        let user = json!({
            "user_id": 1,
            "username": "ani",
            "email": "ani@example.com",
            "phone_number": null,
            "user_type": "Agent"
        });

        let created = post(&client, format!("{base}/users/"), &user).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(created.json::<Value>().await.unwrap(), user);

        let fetched = client.get(format!("{base}/users/1")).send().await.unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
        assert_eq!(fetched.json::<Value>().await.unwrap(), user);

        let all: Vec<Value> = client
            .get(format!("{base}/users/"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_create_keeps_the_first_row() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();

        // (route, entity, id, first body, second body with the same id, field, kept value)
        let cases = [
            (
                "users",
                "User",
                1,
                json!({ "user_id": 1, "username": "ani" }),
                json!({ "user_id": 1, "username": "aram" }),
                "username",
                "ani",
            ),
            (
                "locations",
                "Location",
                2,
                json!({ "location_id": 2, "city": "Yerevan", "district": "Arabkir" }),
                json!({ "location_id": 2, "city": "Yerevan", "district": "Kentron" }),
                "district",
                "Arabkir",
            ),
            (
                "property_types",
                "PropertyType",
                3,
                json!({ "type_id": 3, "type_name": "Apartment" }),
                json!({ "type_id": 3, "type_name": "House" }),
                "type_name",
                "Apartment",
            ),
            (
                "images",
                "Image",
                4,
                json!({ "image_id": 4, "image_url": "https://img.example/4a.jpg" }),
                json!({ "image_id": 4, "image_url": "https://img.example/4b.jpg" }),
                "image_url",
                "https://img.example/4a.jpg",
            ),
            (
                "properties",
                "Property",
                5,
                json!({ "property_id": 5, "title": "Studio" }),
                json!({ "property_id": 5, "title": "Penthouse" }),
                "title",
                "Studio",
            ),
        ];

        for (route, entity, id, first, second, field, kept) in cases {
            let created = post(&client, format!("{base}/{route}/"), &first).await;
            assert_eq!(created.status(), StatusCode::CREATED, "{route}");

            let duplicate = post(&client, format!("{base}/{route}/"), &second).await;
            assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST, "{route}");
            assert_eq!(
                duplicate.json::<Value>().await.unwrap(),
                json!({ "detail": format!("{entity} {id} already exists") })
            );

            let stored: Value = client
                .get(format!("{base}/{route}/{id}"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(stored[field], kept, "{route}");

            let missing = client
                .get(format!("{base}/{route}/999"))
                .send()
                .await
                .unwrap();
            assert_eq!(missing.status(), StatusCode::NOT_FOUND, "{route}");
            assert_eq!(
                missing.json::<Value>().await.unwrap(),
                json!({ "detail": format!("{entity} not found") })
            );
        }
    }

    #[tokio::test]
    async fn malformed_requests_get_json_details() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();

        let partial = json!({ "size_sqm": 75.0 });
        let response = post(&client, format!("{base}/predict/cox"), &partial).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("rooms"));

        let response = client.get(format!("{base}/users/abc")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("abc"));

        let response = client
            .post(format!("{base}/locations/"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>().await.unwrap()["detail"].is_string());
    }

    #[tokio::test]
    async fn property_with_unknown_location_is_rejected() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();

        let response = post(&client, format!("{base}/properties/"), &apartment_json(10, 99)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let missing = client
            .get(format!("{base}/properties/10"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn predictions_for_a_new_listing() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();

        let location = json!({
            "location_id": 1,
            "region": "Yerevan",
            "city": "Yerevan",
            "district": "Kentron"
        });
        let response = post(&client, format!("{base}/locations/"), &location).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let response = post(&client, format!("{base}/properties/"), &apartment_json(10, 1)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let sale: Value = client
            .get(format!("{base}/predict/sale/10"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let rent: Value = client
            .get(format!("{base}/predict/rent/10"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let sale_price = sale["predicted_price"].as_f64().unwrap();
        let rent_price = rent["predicted_price"].as_f64().unwrap();
        assert!(sale_price > rent_price);
        assert!(rent_price > 0.0);

        let combined = client
            .get(format!("{base}/predict/cox/10"))
            .send()
            .await
            .unwrap();
        assert_eq!(combined.status(), StatusCode::OK);
        let combined: Value = combined.json().await.unwrap();
        assert_eq!(combined["property_id"], 10);
        assert_eq!(combined["predicted_sale_price"].as_f64().unwrap(), sale_price);
        assert_eq!(combined["predicted_rent_price"].as_f64().unwrap(), rent_price);
        let probability = combined["prob_sold_within_5_months"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&probability));
        assert_eq!(rounded(probability, 2), 0.56);
    }

    #[tokio::test]
    async fn unknown_property_prediction_is_not_found() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();

        for route in ["sale", "rent", "cox"] {
            let response = client
                .get(format!("{base}/predict/{route}/999"))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(
                response.json::<Value>().await.unwrap(),
                json!({ "detail": "Property 999 not found" })
            );
        }
    }

    #[tokio::test]
    async fn incomplete_property_is_a_bad_request() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();

        let property = json!({ "property_id": 11, "size_sqm": 50.0 });
        let response = post(&client, format!("{base}/properties/"), &property).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = client
            .get(format!("{base}/predict/sale/11"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["detail"],
            "property 11 is missing rooms, floor, year_built, district, renovation_status"
        );
    }

    #[tokio::test]
    async fn raw_feature_prediction() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();

        let features = json!({
            "size_sqm": 75.0,
            "rooms": 3,
            "floor": 2,
            "year_built": 2010,
            "district": "Kentron",
            "renovation_status": "Partially Renovated"
        });
        let response = post(&client, format!("{base}/predict/cox"), &features).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["property_id"], Value::Null);
        assert_eq!(rounded(body["predicted_sale_price"].as_f64().unwrap(), 2), 155500.0);

        let unseen = json!({
            "size_sqm": 75.0,
            "rooms": 3,
            "floor": 2,
            "year_built": 2010,
            "district": "Shengavit",
            "renovation_status": "Partially Renovated"
        });
        let response = post(&client, format!("{base}/predict/cox"), &unseen).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stored_predictions_before_training() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();

        let all: Vec<Value> = client
            .get(format!("{base}/predictions/"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(all.is_empty());

        let missing = client
            .get(format!("{base}/predictions/10"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preflight_gets_cors_headers() {
        let base = format!("http://{}", spawn_server().await);
        let client = reqwest::Client::new();

        let response = client
            .request(reqwest::Method::OPTIONS, format!("{base}/users/"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }
}
