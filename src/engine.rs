use crate::config::EngineConfig;
use crate::dimension::{
    expand, expand_dates, expand_nested, expand_without_dates, known_keys, DimensionKey,
    KnownDimensions,
};
use crate::error::{Result, SalesPerformanceError};
use crate::merge::merge;
use crate::projection::{
    by_date, by_dimension, flat_series, leaderboard, CategoryProductPerformance,
    DateDimensionPerformance, DatePerformance, DimensionPerformance, PerformanceOverview,
};
use crate::provider::{AggregateQuery, AggregateQueryProvider, CatalogLookup};
use crate::schema::{AggregateRow, BucketGranularity, DateBucket, DimensionMode, SearchFilter};
use crate::skeleton::CalendarSkeleton;
use crate::utils::offset_from_hours;
use futures::future::try_join_all;
use log::{debug, info};
use std::collections::HashMap;

/// Report operations over an aggregate provider and a catalog.
///
/// Every call is independent: skeleton, provider rows and merged entries live
/// only for the duration of the call.
pub struct SalesPerformanceEngine<P, C> {
    provider: P,
    catalog: C,
    config: EngineConfig,
}

impl<P, C> SalesPerformanceEngine<P, C>
where
    P: AggregateQueryProvider,
    C: CatalogLookup,
{
    pub fn new(provider: P, catalog: C) -> Self {
        Self {
            provider,
            catalog,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(provider: P, catalog: C, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            catalog,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses request parameters, applying the configured default offset.
    pub fn parse_filter(&self, params: &HashMap<String, String>) -> Result<SearchFilter> {
        SearchFilter::from_params_or(params, self.config.default_utc_offset_hours)
    }

    /// Headline totals: one entry per bucket.
    pub async fn dashboard(&self, filter: &SearchFilter) -> Result<Vec<DatePerformance>> {
        let skeleton = self.skeleton(filter)?;
        let query = self.query_for(filter, DimensionMode::Total, true)?;
        let rows = self.fetch(&query).await?;

        let merged = merge(&expand_dates(&skeleton), &rows)?;
        info!(
            "Dashboard built: {} buckets from {} aggregate rows",
            merged.len(),
            rows.len()
        );

        Ok(flat_series(&merged))
    }

    pub async fn channel_performance(
        &self,
        filter: &SearchFilter,
    ) -> Result<Vec<DateDimensionPerformance>> {
        self.dated_breakdown(filter, DimensionMode::SalesChannel)
            .await
    }

    pub async fn category_performance(
        &self,
        filter: &SearchFilter,
    ) -> Result<Vec<DateDimensionPerformance>> {
        self.dated_breakdown(filter, DimensionMode::Category).await
    }

    pub async fn product_option_performance(
        &self,
        filter: &SearchFilter,
    ) -> Result<Vec<DateDimensionPerformance>> {
        self.dated_breakdown(filter, DimensionMode::ProductOption)
            .await
    }

    /// Categories, each with its products ranked by sales pay amount. No date axis.
    pub async fn category_product_performance(
        &self,
        filter: &SearchFilter,
    ) -> Result<Vec<CategoryProductPerformance>> {
        let query = self.query_for(filter, DimensionMode::CategoryProduct, false)?;
        let (rows, categories) =
            futures::try_join!(self.fetch(&query), self.category_names())?;

        let category_keys = known_keys(&categories, &rows);
        let product_seeds =
            try_join_all(category_keys.iter().map(|key| self.product_names(key))).await?;

        let parents: Vec<(DimensionKey, Vec<DimensionKey>)> = category_keys
            .into_iter()
            .zip(product_seeds)
            .map(|(category, products)| {
                let children = KnownDimensions::new()
                    .seed(&products)
                    .observe(
                        rows.iter()
                            .filter(|row| row.dimension_key() == category)
                            .map(|row| row.sub_dimension.as_deref()),
                    )
                    .into_keys();
                (category, children)
            })
            .collect();

        let merged = merge(&expand_nested(&parents), &rows)?;
        info!(
            "Category/product breakdown built: {} categories, {} entries",
            parents.len(),
            merged.len()
        );

        Ok(by_dimension(&merged))
    }

    pub async fn best_products(&self, filter: &SearchFilter) -> Result<Vec<DimensionPerformance>> {
        self.ranked(filter, DimensionMode::Product).await
    }

    pub async fn best_options(&self, filter: &SearchFilter) -> Result<Vec<DimensionPerformance>> {
        self.ranked(filter, DimensionMode::ProductOption).await
    }

    /// Dashboard, channel and category breakdowns for the same filter, queried
    /// concurrently. Any failure fails the whole overview.
    pub async fn overview(&self, filter: &SearchFilter) -> Result<PerformanceOverview> {
        let (dashboard, channels, categories) = futures::try_join!(
            self.dashboard(filter),
            self.channel_performance(filter),
            self.category_performance(filter)
        )?;

        Ok(PerformanceOverview {
            dashboard,
            channels,
            categories,
        })
    }

    async fn dated_breakdown(
        &self,
        filter: &SearchFilter,
        mode: DimensionMode,
    ) -> Result<Vec<DateDimensionPerformance>> {
        let skeleton = self.skeleton(filter)?;
        let query = self.query_for(filter, mode, true)?;
        let (rows, seed) = futures::try_join!(self.fetch(&query), self.seed_labels(filter, mode))?;

        let keys = known_keys(&seed, &rows);
        let merged = merge(&expand(&skeleton, &keys), &rows)?;
        info!(
            "{:?} breakdown built: {} buckets x {} keys",
            mode,
            skeleton.len(),
            keys.len()
        );

        Ok(by_date(&merged))
    }

    async fn ranked(
        &self,
        filter: &SearchFilter,
        mode: DimensionMode,
    ) -> Result<Vec<DimensionPerformance>> {
        let query = self.query_for(filter, mode, false)?;
        let (rows, seed) = futures::try_join!(self.fetch(&query), self.seed_labels(filter, mode))?;

        let keys = known_keys(&seed, &rows);
        let merged = merge(&expand_without_dates(&keys), &rows)?;
        let ranked = leaderboard(&merged, self.config.leaderboard_limit);
        info!(
            "{:?} leaderboard built: {} of {} keys ranked",
            mode,
            ranked.len(),
            keys.len()
        );

        Ok(ranked)
    }

    fn granularity(&self, filter: &SearchFilter) -> BucketGranularity {
        filter.granularity.unwrap_or(self.config.granularity)
    }

    fn skeleton(&self, filter: &SearchFilter) -> Result<Vec<DateBucket>> {
        CalendarSkeleton::new(self.granularity(filter)).build(filter)
    }

    fn query_for(
        &self,
        filter: &SearchFilter,
        dimension_mode: DimensionMode,
        group_by_bucket: bool,
    ) -> Result<AggregateQuery> {
        offset_from_hours(filter.utc_offset_hours)?;

        Ok(AggregateQuery {
            calendar: filter.calendar_source()?,
            utc_offset_hours: filter.utc_offset_hours,
            granularity: self.granularity(filter),
            dimension_mode,
            group_by_bucket,
            dimension_constraint: filter.dimension_constraint.clone(),
        })
    }

    async fn fetch(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>> {
        debug!(
            "Querying provider: {:?}, grouped by bucket: {}",
            query.dimension_mode, query.group_by_bucket
        );
        self.provider
            .query(query)
            .await
            .map_err(|e| SalesPerformanceError::ProviderFailure(e.to_string()))
    }

    // Labels that must appear even without activity.
    async fn seed_labels(&self, filter: &SearchFilter, mode: DimensionMode) -> Result<Vec<String>> {
        match mode {
            DimensionMode::Category | DimensionMode::CategoryProduct => self.category_names().await,
            DimensionMode::ProductOption => Ok(filter
                .dimension_constraint
                .iter()
                .flatten()
                .cloned()
                .collect()),
            DimensionMode::Total | DimensionMode::SalesChannel | DimensionMode::Product => {
                Ok(Vec::new())
            }
        }
    }

    async fn category_names(&self) -> Result<Vec<String>> {
        self.catalog
            .list_category_names()
            .await
            .map_err(|e| SalesPerformanceError::CatalogFailure(e.to_string()))
    }

    async fn product_names(&self, category: &DimensionKey) -> Result<Vec<String>> {
        if category.is_unassigned() {
            return Ok(Vec::new());
        }
        self.catalog
            .list_product_names_by_category(&category.label)
            .await
            .map_err(|e| SalesPerformanceError::CatalogFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryOrderItemStore, OrderItemRecord, StaticCatalog};
    use chrono::{TimeZone, Utc};

    fn record(day: u32, hour: u32, product: &str, price: u64, sold: bool) -> OrderItemRecord {
        OrderItemRecord {
            channel_order_date: Some(Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()),
            category_name: Some("Outer".to_string()),
            product_name: Some(product.to_string()),
            unit: 1,
            price,
            sold,
            ..Default::default()
        }
    }

    fn filter() -> SearchFilter {
        SearchFilter::range(
            Utc.with_ymd_and_hms(2023, 12, 31, 15, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 3, 14, 59, 59).unwrap(),
            9,
        )
    }

    #[tokio::test]
    async fn test_category_breakdown_seeds_catalog() {
        let store = InMemoryOrderItemStore::new(vec![record(1, 3, "Coat", 100, true)]);
        let catalog = StaticCatalog::new()
            .with_category("Outer", ["Coat"])
            .with_category("Top", ["Shirt"]);
        let engine = SalesPerformanceEngine::new(store, catalog);

        let series = engine.category_performance(&filter()).await.unwrap();

        assert_eq!(series.len(), 3);
        for day in &series {
            let labels: Vec<_> = day.performances.iter().map(|p| p.label.as_str()).collect();
            assert_eq!(labels, vec!["Outer", "Top", crate::UNASSIGNED_LABEL]);
        }
        assert_eq!(series[0].performances[0].metrics.sales_pay_amount, 100);
        assert!(series[1].performances[0].metrics.is_zero());
    }

    #[tokio::test]
    async fn test_best_products_respects_limit() {
        let store = InMemoryOrderItemStore::new(vec![
            record(1, 3, "Coat", 300, true),
            record(2, 3, "Jacket", 900, true),
            record(2, 4, "Vest", 500, true),
        ]);
        let config = EngineConfig {
            leaderboard_limit: Some(2),
            ..EngineConfig::default()
        };
        let engine =
            SalesPerformanceEngine::with_config(store, StaticCatalog::new(), config).unwrap();

        let best = engine.best_products(&filter()).await.unwrap();
        let labels: Vec<_> = best.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Jacket", "Vest"]);
    }

    #[tokio::test]
    async fn test_missing_bounds_fail_before_querying() {
        let engine = SalesPerformanceEngine::new(
            InMemoryOrderItemStore::default(),
            StaticCatalog::new(),
        );

        let result = engine.dashboard(&SearchFilter::default()).await;
        assert!(matches!(
            result,
            Err(SalesPerformanceError::MissingParameter(_))
        ));
    }

    #[test]
    fn test_parse_filter_uses_configured_offset() {
        let config = EngineConfig {
            default_utc_offset_hours: 9,
            ..EngineConfig::default()
        };
        let engine = SalesPerformanceEngine::with_config(
            InMemoryOrderItemStore::default(),
            StaticCatalog::new(),
            config,
        )
        .unwrap();

        let params: HashMap<String, String> = [(
            "date".to_string(),
            "2024-01-01T00:00:00.000Z".to_string(),
        )]
        .into_iter()
        .collect();
        assert_eq!(engine.parse_filter(&params).unwrap().utc_offset_hours, 9);
    }
}
