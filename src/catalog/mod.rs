pub mod schema;

pub use schema::{
    CropProfile, CropSoilAffinity, DemandLevel, MarketQuote, SoilProfile, Zone, FALLBACK_COLOR,
};
