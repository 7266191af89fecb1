use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No soil profiles available for matching")]
    NoSoilData,

    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Zone {0} not found")]
    ZoneNotFound(i64),

    #[error("Soil {0} not found")]
    SoilNotFound(i64),

    #[error("Crop {0} not found")]
    CropNotFound(i64),

    #[error("Plan {0} not found")]
    PlanNotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("AI provider error: {0}")]
    AiProviderError(String),

    #[error("Unparsable model response: {0}")]
    UnparsableModelResponse(String),

    #[error("Model response contained no usable plan")]
    EmptyPlanSet,

    #[error("Failed to save plan: {0}")]
    PlanInsertFailed(String),

    #[error("Plan {plan_id} was saved but its parcels were not: {message}")]
    ParcelInsertFailed { plan_id: i64, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl AppError {
    /// Id of a plan row left behind by a partially failed save.
    pub fn orphaned_plan_id(&self) -> Option<i64> {
        match self {
            AppError::ParcelInsertFailed { plan_id, .. } => Some(*plan_id),
            _ => None,
        }
    }
}

// In-process callers (the UI layer) receive errors as their display string.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_as_display_string() {
        let err = AppError::ZoneNotFound(7);
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Zone 7 not found\"");
    }

    #[test]
    fn test_orphaned_plan_id_only_for_parcel_failures() {
        let partial = AppError::ParcelInsertFailed {
            plan_id: 42,
            message: "constraint violated".into(),
        };
        assert_eq!(partial.orphaned_plan_id(), Some(42));
        assert_eq!(AppError::PlanInsertFailed("x".into()).orphaned_plan_id(), None);
    }
}
