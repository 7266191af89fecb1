use serde::{Deserialize, Serialize};

use crate::catalog::SoilProfile;
use crate::error::AppError;

/// A soil reading, from the field sensor or typed in by hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    pub ph: f64,
    #[serde(rename = "humidite")]
    pub humidity: f64,
    #[serde(rename = "salinite")]
    pub salinity: f64,
}

impl SoilReading {
    pub fn new(ph: f64, humidity: f64, salinity: f64) -> Self {
        Self { ph, humidity, salinity }
    }

    fn ensure_finite(&self) -> Result<(), AppError> {
        for (label, value) in [
            ("ph", self.ph),
            ("humidite", self.humidity),
            ("salinite", self.salinity),
        ] {
            if !value.is_finite() {
                return Err(AppError::InvalidInput(format!(
                    "{} must be a finite number, got {}",
                    label, value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoilMatch<'a> {
    pub profile: &'a SoilProfile,
    pub distance: f64,
}

/// Unweighted Euclidean distance over the raw (pH, %, ‰) values.
pub fn distance(profile: &SoilProfile, reading: &SoilReading) -> f64 {
    let d_ph = profile.ph - reading.ph;
    let d_hum = profile.humidity - reading.humidity;
    let d_sal = profile.salinity - reading.salinity;
    (d_ph * d_ph + d_hum * d_hum + d_sal * d_sal).sqrt()
}

/// Find the catalog entry nearest to `reading`.
///
/// Ties go to the earliest entry in catalog order. An empty catalog is an
/// error rather than a guess.
pub fn match_soil<'a>(
    reading: &SoilReading,
    catalog: &'a [SoilProfile],
) -> Result<SoilMatch<'a>, AppError> {
    reading.ensure_finite()?;

    let mut best: Option<SoilMatch<'a>> = None;
    for profile in catalog {
        let d = distance(profile, reading);
        match &best {
            Some(current) if d >= current.distance => {}
            _ => best = Some(SoilMatch { profile, distance: d }),
        }
    }

    best.ok_or(AppError::NoSoilData)
}
