//! Coordinate reference system identification
//!
//! The detector never reprojects between different reference systems (that
//! is left to the host I/O layer); it only needs to identify a CRS, attach
//! it to outputs, and check that two rasters agree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A coordinate reference system, identified by EPSG code, WKT, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    epsg: Option<u32>,
    wkt: Option<String>,
}

impl Crs {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic coordinates (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// EPSG code, if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// WKT representation, if known
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether this CRS uses geographic (degree) coordinates.
    ///
    /// Only EPSG:4326 is recognized; projected systems report false.
    pub fn is_geographic(&self) -> bool {
        self.epsg == Some(4326)
    }

    /// Check whether two CRS refer to the same system.
    ///
    /// EPSG codes are compared when both are present, otherwise WKT strings.
    /// Comparison by WKT is textual and may report false negatives for
    /// differently-formatted but equivalent definitions.
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// A short display identifier for diagnostics
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(40)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}
