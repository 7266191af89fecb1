use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::ranking::RankedCrop;
use crate::catalog::{CropProfile, DemandLevel, MarketQuote, Zone};
use crate::error::AppError;
use crate::store::Store;

/// A crop with the zone's current market conditions attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCrop {
    #[serde(flatten)]
    pub crop: CropProfile,
    #[serde(rename = "affinite", default)]
    pub affinity: Option<f64>,
    #[serde(rename = "prix_moyen", default)]
    pub average_price: Option<f64>,
    #[serde(rename = "saison", default)]
    pub season: Option<String>,
    #[serde(rename = "niveau_demande", default)]
    pub demand: Option<DemandLevel>,
}

impl EnrichedCrop {
    pub fn is_priced(&self) -> bool {
        self.average_price.is_some()
    }
}

/// Most recent quote by validity start. Undated quotes rank oldest.
fn latest<'a>(quotes: impl Iterator<Item = &'a MarketQuote>) -> Option<&'a MarketQuote> {
    quotes.max_by_key(|q| q.valid_from)
}

/// Attach the latest priced quote for (`zone_id`, crop) to each crop.
/// Crops with no priced quote keep empty market fields.
pub fn enrich_crops(
    zone_id: i64,
    crops: Vec<RankedCrop>,
    quotes: &[MarketQuote],
) -> Vec<EnrichedCrop> {
    let mut by_crop: HashMap<i64, Vec<&MarketQuote>> = HashMap::new();
    for quote in quotes
        .iter()
        .filter(|q| q.zone_id == zone_id && q.average_price.is_some())
    {
        by_crop.entry(quote.crop_id).or_default().push(quote);
    }

    crops
        .into_iter()
        .map(|ranked| {
            let quote = by_crop
                .get(&ranked.crop.id)
                .and_then(|qs| latest(qs.iter().copied()));
            EnrichedCrop {
                affinity: Some(ranked.affinity),
                average_price: quote.and_then(|q| q.average_price),
                season: quote.and_then(|q| q.season.clone()),
                demand: quote.and_then(|q| q.demand),
                crop: ranked.crop,
            }
        })
        .collect()
}

/// Resolve `zone_id` and enrich `crops` with its market data.
pub async fn enrich_for_zone(
    store: &dyn Store,
    zone_id: i64,
    crops: Vec<RankedCrop>,
) -> Result<(Zone, Vec<EnrichedCrop>), AppError> {
    let zone = store
        .zone(zone_id)
        .await?
        .ok_or(AppError::ZoneNotFound(zone_id))?;
    let quotes = store.market_quotes().await?;
    let enriched = enrich_crops(zone_id, crops, &quotes);
    tracing::debug!(
        zone_id,
        crops = enriched.len(),
        priced = enriched.iter().filter(|c| c.is_priced()).count(),
        "enriched crops with market data"
    );
    Ok((zone, enriched))
}

// -- Market browsing --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketFilters {
    #[serde(default)]
    pub id_zone: Option<i64>,
    #[serde(default)]
    pub id_culture: Option<i64>,
    /// Case-insensitive substring of the season label.
    #[serde(default)]
    pub saison: Option<String>,
    /// Free text over crop name and type, zone name, country and city.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<DateTime<Utc>>,
}

/// A quote joined with its crop and zone names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketItem {
    #[serde(flatten)]
    pub quote: MarketQuote,
    pub nom_culture: String,
    pub type_culture: String,
    pub nom_zone: String,
    pub nom_pays: String,
    pub nom_ville: String,
}

impl MarketItem {
    fn matches_text(&self, needle: &str) -> bool {
        [
            &self.nom_culture,
            &self.type_culture,
            &self.nom_zone,
            &self.nom_pays,
            &self.nom_ville,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

fn quote_matches(quote: &MarketQuote, filters: &MarketFilters) -> bool {
    if filters.id_zone.is_some_and(|z| z != quote.zone_id) {
        return false;
    }
    if filters.id_culture.is_some_and(|c| c != quote.crop_id) {
        return false;
    }
    if let Some(season) = filters.saison.as_deref().filter(|s| !s.is_empty()) {
        let season = season.to_lowercase();
        let label = quote.season.as_deref().unwrap_or_default().to_lowercase();
        if !label.contains(&season) {
            return false;
        }
    }
    if let Some(from) = filters.start_date {
        if !quote.valid_from.is_some_and(|start| start >= from) {
            return false;
        }
    }
    if let Some(to) = filters.end_date {
        if !quote.valid_to.is_some_and(|end| end <= to) {
            return false;
        }
    }
    true
}

pub fn filter_market(
    quotes: &[MarketQuote],
    crops: &[CropProfile],
    zones: &[Zone],
    filters: &MarketFilters,
) -> Vec<MarketItem> {
    let crops: HashMap<i64, &CropProfile> = crops.iter().map(|c| (c.id, c)).collect();
    let zones: HashMap<i64, &Zone> = zones.iter().map(|z| (z.id, z)).collect();
    let needle = filters
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    quotes
        .iter()
        .filter(|q| quote_matches(q, filters))
        .map(|q| {
            let crop = crops.get(&q.crop_id);
            let zone = zones.get(&q.zone_id);
            MarketItem {
                quote: q.clone(),
                nom_culture: crop.map(|c| c.name.clone()).unwrap_or_default(),
                type_culture: crop.map(|c| c.crop_type.clone()).unwrap_or_default(),
                nom_zone: zone.map(|z| z.name.clone()).unwrap_or_default(),
                nom_pays: zone.map(|z| z.country.clone()).unwrap_or_default(),
                nom_ville: zone.map(|z| z.city.clone()).unwrap_or_default(),
            }
        })
        .filter(|item| needle.as_deref().map_or(true, |n| item.matches_text(n)))
        .collect()
}

pub async fn browse_market(
    store: &dyn Store,
    filters: &MarketFilters,
) -> Result<Vec<MarketItem>, AppError> {
    let quotes = store.market_quotes().await?;
    let crops = store.crops().await?;
    let zones = store.zones().await?;
    Ok(filter_market(&quotes, &crops, &zones, filters))
}

// -- Price history --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropPriceHistory {
    pub culture: CropProfile,
    #[serde(rename = "chartData")]
    pub points: Vec<PricePoint>,
}

/// Dated, priced quotes for one crop across all zones, oldest first.
pub fn price_points(crop_id: i64, quotes: &[MarketQuote]) -> Vec<PricePoint> {
    let mut points: Vec<PricePoint> = quotes
        .iter()
        .filter(|q| q.crop_id == crop_id)
        .filter_map(|q| match (q.valid_from, q.average_price) {
            (Some(date), Some(price)) => Some(PricePoint { date, price }),
            _ => None,
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

pub async fn price_history(store: &dyn Store, crop_id: i64) -> Result<CropPriceHistory, AppError> {
    let culture = store
        .crops()
        .await?
        .into_iter()
        .find(|c| c.id == crop_id)
        .ok_or(AppError::CropNotFound(crop_id))?;
    let quotes = store.market_quotes().await?;
    Ok(CropPriceHistory {
        points: price_points(crop_id, &quotes),
        culture,
    })
}

// -- Catalog views --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropWithPrice {
    #[serde(flatten)]
    pub crop: CropProfile,
    pub prix_actuel: Option<f64>,
}

/// Every crop with the price of its most recent quote in any zone.
pub fn current_prices(crops: Vec<CropProfile>, quotes: &[MarketQuote]) -> Vec<CropWithPrice> {
    crops
        .into_iter()
        .map(|crop| {
            let prix_actuel =
                latest(quotes.iter().filter(|q| q.crop_id == crop.id)).and_then(|q| q.average_price);
            CropWithPrice { crop, prix_actuel }
        })
        .collect()
}

pub async fn crops_with_current_price(store: &dyn Store) -> Result<Vec<CropWithPrice>, AppError> {
    let crops = store.crops().await?;
    let quotes = store.market_quotes().await?;
    Ok(current_prices(crops, &quotes))
}

/// Crops quoted in `zone_id`, in catalog order, with the zone's latest
/// priced quote attached.
pub async fn zone_crops(store: &dyn Store, zone_id: i64) -> Result<Vec<EnrichedCrop>, AppError> {
    if store.zone(zone_id).await?.is_none() {
        return Err(AppError::ZoneNotFound(zone_id));
    }
    let quotes = store.market_quotes().await?;
    let crops = store.crops().await?;

    let mut enriched = Vec::new();
    for crop in crops {
        if !quotes.iter().any(|q| q.zone_id == zone_id && q.crop_id == crop.id) {
            continue;
        }
        let priced = latest(
            quotes
                .iter()
                .filter(|q| q.zone_id == zone_id && q.crop_id == crop.id && q.average_price.is_some()),
        );
        enriched.push(EnrichedCrop {
            affinity: None,
            average_price: priced.and_then(|q| q.average_price),
            season: priced.and_then(|q| q.season.clone()),
            demand: priced.and_then(|q| q.demand),
            crop,
        });
    }
    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{crop, seeded_store, zone};
    use chrono::TimeZone;

    fn quote(zone_id: i64, crop_id: i64, price: Option<f64>, month: u32) -> MarketQuote {
        MarketQuote {
            zone_id,
            crop_id,
            average_price: price,
            season: Some(format!("saison-{}", month)),
            demand: Some(DemandLevel::Medium),
            valid_from: Some(Utc.with_ymd_and_hms(2025, month, 1, 0, 0, 0).unwrap()),
            valid_to: Some(Utc.with_ymd_and_hms(2025, month, 28, 0, 0, 0).unwrap()),
        }
    }

    fn ranked(id: i64, name: &str, affinity: f64) -> RankedCrop {
        RankedCrop {
            crop: crop(id, name),
            affinity,
            notes: None,
        }
    }

    // ── Enrichment ──

    #[test]
    fn test_latest_priced_quote_wins() {
        let quotes = vec![
            quote(1, 1, Some(100.0), 3),
            quote(1, 1, Some(120.0), 6),
            quote(1, 1, None, 9),
            quote(2, 1, Some(999.0), 12),
        ];
        let enriched = enrich_crops(1, vec![ranked(1, "Maïs", 9.0)], &quotes);
        assert_eq!(enriched[0].average_price, Some(120.0));
        assert_eq!(enriched[0].season.as_deref(), Some("saison-6"));
        assert_eq!(enriched[0].affinity, Some(9.0));
    }

    #[test]
    fn test_unquoted_crop_kept_without_market_fields() {
        let enriched = enrich_crops(1, vec![ranked(1, "A", 9.0), ranked(2, "B", 5.0)], &[quote(1, 1, Some(10.0), 1)]);
        assert_eq!(enriched.len(), 2);
        assert!(enriched[0].is_priced());
        assert!(!enriched[1].is_priced());
        assert!(enriched[1].demand.is_none());
    }

    #[tokio::test]
    async fn test_unknown_zone_is_an_error() {
        let store = seeded_store();
        let err = enrich_for_zone(&store, 404, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::ZoneNotFound(404)));
    }

    #[tokio::test]
    async fn test_seeded_zone_enrichment() {
        let store = seeded_store();
        let (zone, enriched) = enrich_for_zone(&store, 1, vec![ranked(1, "Maïs", 9.0)])
            .await
            .unwrap();
        assert_eq!(zone.name, "Bassin arachidier");
        assert_eq!(enriched[0].average_price, Some(225.0));
        assert_eq!(enriched[0].demand, Some(DemandLevel::High));
    }

    // ── Browsing ──

    #[test]
    fn test_filters_combine() {
        let quotes = vec![quote(1, 1, Some(10.0), 3), quote(1, 2, Some(20.0), 6), quote(2, 1, Some(30.0), 6)];
        let crops = vec![crop(1, "Maïs"), crop(2, "Tomate")];
        let zones = vec![zone(1, "Sahel"), zone(2, "Gharb")];

        let filters = MarketFilters {
            id_culture: Some(1),
            ..MarketFilters::default()
        };
        assert_eq!(filter_market(&quotes, &crops, &zones, &filters).len(), 2);

        let filters = MarketFilters {
            saison: Some("SAISON-6".into()),
            search: Some("gharb".into()),
            ..MarketFilters::default()
        };
        let items = filter_market(&quotes, &crops, &zones, &filters);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].nom_culture, "Maïs");
        assert_eq!(items[0].nom_zone, "Gharb");
    }

    #[test]
    fn test_validity_window_filters() {
        let quotes = vec![quote(1, 1, Some(10.0), 3), quote(1, 1, Some(11.0), 6)];
        let filters = MarketFilters {
            start_date: Some(Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()),
            ..MarketFilters::default()
        };
        let items = filter_market(&quotes, &[], &[], &filters);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quote.average_price, Some(11.0));
        assert_eq!(items[0].nom_culture, "");

        let filters = MarketFilters {
            end_date: Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()),
            ..MarketFilters::default()
        };
        assert_eq!(filter_market(&quotes, &[], &[], &filters).len(), 1);
    }

    #[test]
    fn test_market_item_wire_shape() {
        let items = filter_market(&[quote(1, 1, Some(10.0), 3)], &[crop(1, "Maïs")], &[zone(1, "Sahel")], &MarketFilters::default());
        let value = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(value["id_culture"], 1);
        assert_eq!(value["prix_moyen"], 10.0);
        assert_eq!(value["nom_ville"], "Thiès");
    }

    // ── History and catalog views ──

    #[test]
    fn test_price_points_ascending_and_priced_only() {
        let quotes = vec![quote(1, 1, Some(12.0), 9), quote(2, 1, None, 5), quote(1, 1, Some(10.0), 2)];
        let points = price_points(1, &quotes);
        assert_eq!(points.iter().map(|p| p.price).collect::<Vec<_>>(), vec![10.0, 12.0]);
    }

    #[tokio::test]
    async fn test_price_history_unknown_crop() {
        let store = seeded_store();
        assert!(matches!(price_history(&store, 77).await, Err(AppError::CropNotFound(77))));
        let history = price_history(&store, 1).await.unwrap();
        assert_eq!(history.points.len(), 3);
    }

    #[test]
    fn test_current_price_uses_latest_quote_any_zone() {
        let quotes = vec![quote(1, 1, Some(10.0), 2), quote(2, 1, Some(14.0), 8), quote(1, 2, None, 4)];
        let prices = current_prices(vec![crop(1, "A"), crop(2, "B"), crop(3, "C")], &quotes);
        assert_eq!(prices[0].prix_actuel, Some(14.0));
        assert_eq!(prices[1].prix_actuel, None);
        assert_eq!(prices[2].prix_actuel, None);
    }

    #[tokio::test]
    async fn test_zone_crops_lists_quoted_crops_once() {
        let store = seeded_store();
        let crops = zone_crops(&store, 2).await.unwrap();
        let ids: Vec<i64> = crops.iter().map(|c| c.crop.id).collect();
        assert_eq!(ids, vec![1, 2, 5]);
        // Tomato is quoted in zone 2 but without a price.
        assert!(!crops[1].is_priced());
    }
}
