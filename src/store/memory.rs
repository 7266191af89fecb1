use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::seed::SeedData;
use super::{ParcelRow, PlanRow, Store, StoredParcel, StoredPlan};
use crate::catalog::{CropProfile, CropSoilAffinity, MarketQuote, SoilProfile, Zone};
use crate::error::AppError;

/// Store operations that can be made to fail, for exercising error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Soils,
    Crops,
    Affinities,
    Zones,
    Quotes,
    InsertPlan,
    InsertParcels,
    Plans,
}

#[derive(Default)]
struct Tables {
    plans: Vec<StoredPlan>,
    next_plan_id: i64,
    next_parcel_id: i64,
}

/// Process-local store backed by seed data. Plans live only as long as the process.
pub struct InMemoryStore {
    reference: SeedData,
    tables: Mutex<Tables>,
    faults: Mutex<HashSet<StoreOp>>,
}

impl InMemoryStore {
    pub fn new(reference: SeedData) -> Self {
        Self {
            reference,
            tables: Mutex::new(Tables {
                next_plan_id: 1,
                next_parcel_id: 1,
                ..Tables::default()
            }),
            faults: Mutex::new(HashSet::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(SeedData::default())
    }

    pub fn from_seed_file(path: &Path) -> Result<Self, AppError> {
        let seed = SeedData::load(path)?;
        tracing::info!(
            path = %path.display(),
            soils = seed.sols.len(),
            crops = seed.cultures.len(),
            zones = seed.zones.len(),
            quotes = seed.culture_marches.len(),
            "loaded seed data"
        );
        Ok(Self::new(seed))
    }

    #[cfg(test)]
    pub(crate) fn fail_on(&self, op: StoreOp) {
        lock(&self.faults).insert(op);
    }

    fn check(&self, op: StoreOp) -> Result<(), AppError> {
        if lock(&self.faults).contains(&op) {
            return Err(AppError::DataAccess(format!("{:?} unavailable", op)));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Store for InMemoryStore {
    async fn soils(&self) -> Result<Vec<SoilProfile>, AppError> {
        self.check(StoreOp::Soils)?;
        Ok(self.reference.sols.clone())
    }

    async fn soil(&self, soil_id: i64) -> Result<Option<SoilProfile>, AppError> {
        self.check(StoreOp::Soils)?;
        Ok(self.reference.sols.iter().find(|s| s.id == soil_id).cloned())
    }

    async fn crops(&self) -> Result<Vec<CropProfile>, AppError> {
        self.check(StoreOp::Crops)?;
        Ok(self.reference.cultures.clone())
    }

    async fn affinities_for_soil(&self, soil_id: i64) -> Result<Vec<CropSoilAffinity>, AppError> {
        self.check(StoreOp::Affinities)?;
        Ok(self
            .reference
            .culture_sol
            .iter()
            .filter(|a| a.soil_id == soil_id)
            .cloned()
            .collect())
    }

    async fn zones(&self) -> Result<Vec<Zone>, AppError> {
        self.check(StoreOp::Zones)?;
        let mut zones = self.reference.zones.clone();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(zones)
    }

    async fn zone(&self, zone_id: i64) -> Result<Option<Zone>, AppError> {
        self.check(StoreOp::Zones)?;
        Ok(self.reference.zones.iter().find(|z| z.id == zone_id).cloned())
    }

    async fn market_quotes(&self) -> Result<Vec<MarketQuote>, AppError> {
        self.check(StoreOp::Quotes)?;
        Ok(self.reference.culture_marches.clone())
    }

    async fn insert_plan(&self, row: PlanRow) -> Result<i64, AppError> {
        self.check(StoreOp::InsertPlan)?;
        let mut tables = lock(&self.tables);
        let id = tables.next_plan_id;
        tables.next_plan_id += 1;
        tables.plans.push(StoredPlan {
            id_plan: id,
            row,
            parcelles: Vec::new(),
        });
        Ok(id)
    }

    async fn insert_parcels(&self, rows: Vec<ParcelRow>) -> Result<(), AppError> {
        self.check(StoreOp::InsertParcels)?;
        let mut tables = lock(&self.tables);

        // The batch is all-or-nothing: validate every foreign key first.
        for row in &rows {
            if !tables.plans.iter().any(|p| p.id_plan == row.id_plan) {
                return Err(AppError::DataAccess(format!(
                    "parcel references missing plan {}",
                    row.id_plan
                )));
            }
        }

        for row in rows {
            let id = tables.next_parcel_id;
            tables.next_parcel_id += 1;
            if let Some(plan) = tables.plans.iter_mut().find(|p| p.id_plan == row.id_plan) {
                plan.parcelles.push(StoredParcel { id_parcelle: id, row });
            }
        }
        Ok(())
    }

    async fn plans(&self) -> Result<Vec<StoredPlan>, AppError> {
        self.check(StoreOp::Plans)?;
        let tables = lock(&self.tables);
        let mut plans = tables.plans.clone();
        plans.sort_by(|a, b| b.id_plan.cmp(&a.id_plan));
        Ok(plans)
    }

    async fn plan(&self, plan_id: i64) -> Result<Option<StoredPlan>, AppError> {
        self.check(StoreOp::Plans)?;
        let tables = lock(&self.tables);
        Ok(tables.plans.iter().find(|p| p.id_plan == plan_id).cloned())
    }
}
