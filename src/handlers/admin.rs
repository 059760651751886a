use axum::{extract::State, http::StatusCode, response::Json};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::app::AppState;
use crate::models::{
    CategoryType, CreateCategoryRequest, DishRequest, FlavorRequest, SaleStatus,
    SetmealDishRequest, SetmealRequest,
};

/// Response for seeding operations
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub message: String,
    pub categories_created: usize,
    pub dishes_created: usize,
    pub setmeals_created: usize,
    pub errors: Vec<String>,
    pub timestamp: String,
}

/// Response for table setup operations
#[derive(Debug, Serialize)]
pub struct SetupTablesResponse {
    pub message: String,
    pub tables_created: Vec<String>,
    pub timestamp: String,
}

struct SampleDish {
    name: &'static str,
    price: Decimal,
    flavors: &'static [(&'static str, &'static [&'static str])],
}

struct SampleCategory {
    name: &'static str,
    sort: i32,
    dishes: &'static [SampleDish],
}

const SPICE: (&str, &[&str]) = ("Spice", &["Mild", "Medium", "Hot"]);
const TEMPERATURE: (&str, &[&str]) = ("Temperature", &["Hot", "Iced"]);

const SAMPLE_MENU: &[SampleCategory] = &[
    SampleCategory {
        name: "Hunan Classics",
        sort: 1,
        dishes: &[
            SampleDish {
                name: "Steamed Fish Head with Chili",
                price: dec!(68),
                flavors: &[SPICE],
            },
            SampleDish {
                name: "Stir-fried Pork with Peppers",
                price: dec!(38),
                flavors: &[SPICE],
            },
        ],
    },
    SampleCategory {
        name: "Staples",
        sort: 2,
        dishes: &[
            SampleDish {
                name: "Steamed Rice",
                price: dec!(2),
                flavors: &[],
            },
            SampleDish {
                name: "Egg Fried Rice",
                price: dec!(16),
                flavors: &[],
            },
        ],
    },
    SampleCategory {
        name: "Drinks",
        sort: 3,
        dishes: &[SampleDish {
            name: "Plum Juice",
            price: dec!(8),
            flavors: &[TEMPERATURE],
        }],
    },
];

/// Set up the required DynamoDB tables
#[instrument(name = "setup_tables", skip(state))]
pub async fn setup_tables(
    State(state): State<AppState>,
) -> Result<Json<SetupTablesResponse>, (StatusCode, Json<Value>)> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    let Some(table_manager) = state.table_manager.as_ref() else {
        info!("In-memory storage, no tables to create");
        return Ok(Json(SetupTablesResponse {
            message: "In-memory storage needs no tables".to_string(),
            tables_created: Vec::new(),
            timestamp,
        }));
    };

    info!("Setting up DynamoDB tables");

    match table_manager.create_all_tables().await {
        Ok(tables_created) => {
            info!("Successfully created tables: {:?}", tables_created);
            Ok(Json(SetupTablesResponse {
                message: format!("Successfully created {} tables", tables_created.len()),
                tables_created,
                timestamp,
            }))
        }
        Err(err) => {
            error!("Failed to create tables: {}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to create tables",
                    "message": err.to_string(),
                    "timestamp": timestamp,
                })),
            ))
        }
    }
}

/// Seed a small sample menu: dish categories with dishes, and one combo category
/// holding a lunch set built from them
#[instrument(name = "seed_database", skip(state))]
pub async fn seed_database(
    State(state): State<AppState>,
) -> Result<Json<SeedResponse>, (StatusCode, Json<Value>)> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    info!("Seeding database with sample menu");

    let mut categories_created = 0;
    let mut dishes = Vec::new();
    let mut errors = Vec::new();

    for sample in SAMPLE_MENU {
        let category = match state
            .categories
            .create(CreateCategoryRequest {
                category_type: CategoryType::Dish,
                name: sample.name.to_string(),
                sort: sample.sort,
            })
            .await
        {
            Ok(category) => {
                categories_created += 1;
                category
            }
            Err(err) => {
                warn!("Failed to seed category {}: {}", sample.name, err);
                errors.push(format!("{}: {}", sample.name, err));
                continue;
            }
        };

        for (index, dish) in sample.dishes.iter().enumerate() {
            match state.dishes.save_with_flavor(sample_dish(category.id, index, dish)).await {
                Ok(view) => {
                    info!("Successfully seeded dish: {}", view.dish.name);
                    dishes.push(view.dish);
                }
                Err(err) => {
                    warn!("Failed to seed dish {}: {}", dish.name, err);
                    errors.push(format!("{}: {}", dish.name, err));
                }
            }
        }
    }

    let mut setmeals_created = 0;
    if dishes.len() >= 2 {
        let combo = state
            .categories
            .create(CreateCategoryRequest {
                category_type: CategoryType::Setmeal,
                name: "Lunch Sets".to_string(),
                sort: 10,
            })
            .await;
        match combo {
            Ok(category) => {
                categories_created += 1;
                let request = SetmealRequest {
                    category_id: category.id,
                    name: "Hunan Lunch for One".to_string(),
                    price: dec!(45),
                    status: Some(SaleStatus::OnSale),
                    code: String::new(),
                    description: Some("A house classic with rice".to_string()),
                    image: None,
                    setmeal_dishes: dishes
                        .iter()
                        .take(2)
                        .enumerate()
                        .map(|(index, dish)| SetmealDishRequest {
                            dish_id: dish.id,
                            name: dish.name.clone(),
                            price: dish.price,
                            copies: 1,
                            sort: index as i32,
                        })
                        .collect(),
                };
                match state.setmeals.save_with_dishes(request).await {
                    Ok(_) => setmeals_created += 1,
                    Err(err) => {
                        warn!("Failed to seed combo: {}", err);
                        errors.push(format!("Hunan Lunch for One: {}", err));
                    }
                }
            }
            Err(err) => {
                warn!("Failed to seed combo category: {}", err);
                errors.push(format!("Lunch Sets: {}", err));
            }
        }
    }

    let created = categories_created + dishes.len() + setmeals_created;
    if created == 0 && !errors.is_empty() {
        error!("Database seeding failed with {} errors", errors.len());
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to seed database",
                "details": errors,
                "timestamp": timestamp,
            })),
        ));
    }

    if errors.is_empty() {
        info!("Successfully seeded database with {} records", created);
    } else {
        warn!("Database seeding completed with {} errors", errors.len());
    }

    Ok(Json(SeedResponse {
        message: format!(
            "Seeded {} categories, {} dishes, {} combos",
            categories_created,
            dishes.len(),
            setmeals_created
        ),
        categories_created,
        dishes_created: dishes.len(),
        setmeals_created,
        errors,
        timestamp,
    }))
}

fn sample_dish(category_id: i64, index: usize, sample: &SampleDish) -> DishRequest {
    DishRequest {
        id: None,
        name: sample.name.to_string(),
        category_id,
        price: sample.price,
        code: String::new(),
        image: None,
        description: None,
        status: Some(SaleStatus::OnSale),
        sort: index as i32,
        flavors: sample
            .flavors
            .iter()
            .map(|(name, values)| FlavorRequest {
                name: name.to_string(),
                value: values.iter().map(|value| value.to_string()).collect(),
            })
            .collect(),
    }
}
