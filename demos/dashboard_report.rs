use chrono::{TimeZone, Utc};
use sales_performance::*;
use std::collections::HashMap;

fn order(
    day: u32,
    hour: u32,
    channel: &str,
    category: &str,
    product: &str,
    price: u64,
    sold: bool,
) -> OrderItemRecord {
    OrderItemRecord {
        channel_order_date: Some(Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()),
        sales_channel: Some(channel.to_string()),
        category_name: Some(category.to_string()),
        product_name: Some(product.to_string()),
        option_code: None,
        unit: 1,
        price,
        delivery_charge: 3_000,
        sold,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("📊 Sales Performance Dashboard Demo\n");
    println!("Order items are stored in UTC and reported in KST (+9).");
    println!("Days and channels without activity still appear with zero metrics.\n");

    let store = InMemoryOrderItemStore::new(vec![
        // 2024-01-01 20:00 UTC is already 2024-01-02 in Seoul
        order(1, 20, "Naver", "Outer", "Wool Coat", 129_000, true),
        order(2, 2, "Coupang", "Outer", "Down Jacket", 189_000, true),
        order(2, 3, " ", "Top", "Oxford Shirt", 39_000, false),
        order(4, 1, "Naver", "Top", "Oxford Shirt", 39_000, true),
    ]);
    let catalog = StaticCatalog::new()
        .with_category("Outer", ["Wool Coat", "Down Jacket"])
        .with_category("Top", ["Oxford Shirt", "Knit Sweater"])
        .with_category("Accessories", ["Scarf"]);

    let config = EngineConfig::from_json_str(
        r#"{ "defaultUtcOffsetHours": 9, "leaderboardLimit": 3 }"#,
    )?;
    let engine = SalesPerformanceEngine::with_config(store, catalog, config)?;

    let params: HashMap<String, String> = [
        ("startDate", "2023-12-31T15:00:00.000Z"),
        ("endDate", "2024-01-07T14:59:59.999Z"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let filter = engine.parse_filter(&params)?;

    println!("📋 Filter:");
    println!("{}\n", serde_json::to_string_pretty(&filter)?);

    let overview = engine.overview(&filter).await?;
    println!("📅 Dashboard:");
    for day in &overview.dashboard {
        println!(
            "  {}  orders {:>2}  order amount {:>8}  sales amount {:>8}",
            day.bucket,
            day.metrics.order_registration,
            day.metrics.order_pay_amount,
            day.metrics.sales_pay_amount
        );
    }

    println!("\n🗂  Categories and products:");
    for category in engine.category_product_performance(&filter).await? {
        println!(
            "  {} (sales {})",
            category.category, category.total.sales_pay_amount
        );
        for product in &category.products {
            println!(
                "    - {:<14} {:>8}",
                product.label, product.metrics.sales_pay_amount
            );
        }
    }

    println!("\n🏆 Best products:");
    for (rank, product) in engine.best_products(&filter).await?.iter().enumerate() {
        println!(
            "  {}. {} ({})",
            rank + 1,
            product.label,
            product.metrics.sales_pay_amount
        );
    }

    println!("\n📦 Channel breakdown (JSON):");
    println!("{}", serde_json::to_string_pretty(&overview.channels)?);

    Ok(())
}
