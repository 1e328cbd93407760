//! Equal-area planar projection used for every measurement in the grid.
//!
//! All geometry handled by this crate lives in EPSG:5070 (NAD83 / Conus Albers):
//! an Albers equal-area conic on the GRS80 ellipsoid, in metres. Boundaries,
//! station coordinates and grid spacing must all be expressed in this system
//! before they reach the grid builder or the aggregator.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Metres per statute mile.
pub const METERS_PER_MILE: f64 = 1609.34;

/// Metres per kilometre.
pub const METERS_PER_KILOMETER: f64 = 1000.0;

/// Albers equal-area conic parameters on an ellipsoid. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlbersParams {
    /// Semi-major axis in metres.
    pub a: f64,
    /// Inverse flattening.
    pub inv_f: f64,
    pub lat_origin: f64,
    pub lon_origin: f64,
    pub standard_parallel_1: f64,
    pub standard_parallel_2: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl AlbersParams {
    /// EPSG:5070, NAD83 / Conus Albers.
    pub const CONUS: Self = Self {
        a: 6_378_137.0,
        inv_f: 298.257_222_101,
        lat_origin: 23.0,
        lon_origin: -96.0,
        standard_parallel_1: 29.5,
        standard_parallel_2: 45.5,
        false_easting: 0.0,
        false_northing: 0.0,
    };
}

/// A ready-to-use Albers projection: the cone constants are derived once from
/// [`AlbersParams`] and reused by every [`forward`](Self::forward) call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlbersEqualArea {
    params: AlbersParams,
    /// First eccentricity squared.
    e2: f64,
    e: f64,
    /// Cone constant (Snyder 14-14).
    n: f64,
    /// Snyder 14-13.
    c: f64,
    /// Radius of the origin parallel.
    rho0: f64,
}

impl AlbersEqualArea {
    pub fn new(params: AlbersParams) -> Self {
        let f = 1.0 / params.inv_f;
        let e2 = 2.0 * f - f * f;
        let e = e2.sqrt();

        let phi1 = params.standard_parallel_1.to_radians();
        let phi2 = params.standard_parallel_2.to_radians();
        let (m1, m2) = (m(e2, phi1), m(e2, phi2));
        let (q1, q2) = (q(e2, e, phi1), q(e2, e, phi2));

        let n = (m1 * m1 - m2 * m2) / (q2 - q1);
        let c = m1 * m1 + n * q1;

        let mut projection = Self {
            params,
            e2,
            e,
            n,
            c,
            rho0: 0.0,
        };
        projection.rho0 = projection.rho(params.lat_origin.to_radians());
        projection
    }

    /// EPSG:5070.
    pub fn conus() -> Self {
        Self::new(AlbersParams::CONUS)
    }

    pub fn params(&self) -> &AlbersParams {
        &self.params
    }

    fn rho(&self, phi: f64) -> f64 {
        self.params.a * (self.c - self.n * q(self.e2, self.e, phi)).max(0.0).sqrt() / self.n
    }

    /// Projects geographic degrees `(lon, lat)` to planar metres `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::LatitudeOutOfRange`] for latitudes outside `[-90, 90]`.
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GridError::LatitudeOutOfRange(lat));
        }

        let rho_p = self.rho(lat.to_radians());
        let theta = self.n * (lon - self.params.lon_origin).to_radians();

        let x = self.params.false_easting + rho_p * theta.sin();
        let y = self.params.false_northing + self.rho0 - rho_p * theta.cos();
        Ok((x, y))
    }
}

/// Authalic `q` term (Snyder 3-12).
fn q(e2: f64, e: f64, phi: f64) -> f64 {
    let sin_phi = phi.sin();
    let es = e * sin_phi;
    (1.0 - e2)
        * (sin_phi / (1.0 - e2 * sin_phi * sin_phi)
            - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

/// Parallel radius factor `m` (Snyder 14-15).
fn m(e2: f64, phi: f64) -> f64 {
    let sin_phi = phi.sin();
    phi.cos() / (1.0 - e2 * sin_phi * sin_phi).sqrt()
}

/// Ground-distance unit a grid spacing is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
    /// Native projection unit.
    Meters,
}

impl DistanceUnit {
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            DistanceUnit::Miles => value * METERS_PER_MILE,
            DistanceUnit::Kilometers => value * METERS_PER_KILOMETER,
            DistanceUnit::Meters => value,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Meters => "m",
        }
    }
}

/// Grid spacing as requested by the caller, before conversion to projection units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpacing {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl GridSpacing {
    pub fn new(value: f64, unit: DistanceUnit) -> Self {
        Self { value, unit }
    }

    pub fn miles(value: f64) -> Self {
        Self::new(value, DistanceUnit::Miles)
    }

    pub fn meters(value: f64) -> Self {
        Self::new(value, DistanceUnit::Meters)
    }

    /// Side length of one lattice square in projection units.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidSpacing`] unless the value is finite and positive.
    pub fn projected(&self) -> Result<f64> {
        if !self.value.is_finite() || self.value <= 0.0 {
            return Err(GridError::InvalidSpacing(self.value));
        }
        Ok(self.unit.to_meters(self.value))
    }

    /// Key under which the clipped cells for this spacing are cached, e.g. `20mi`.
    pub fn cache_key(&self) -> String {
        format!("{}{}", self.value, self.unit.suffix())
    }
}
