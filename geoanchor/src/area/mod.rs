//! Area of interest extraction from KML/KMZ documents.
//!
//! The first `coordinates` element of the document becomes a [`Polygon`],
//! which is reduced to a single center point for mosaic building.
//!
//! # Example
//!
//! ```
//! use geoanchor::area::extract_area;
//!
//! let kml = br#"<kml xmlns="http://www.opengis.net/kml/2.2">
//!   <Placemark><Polygon><outerBoundaryIs><LinearRing>
//!     <coordinates>10,50,0 12,50,0 12,52,0 10,52,0</coordinates>
//!   </LinearRing></outerBoundaryIs></Polygon></Placemark>
//! </kml>"#;
//!
//! let polygon = extract_area(kml).unwrap();
//! let center = polygon.centroid().unwrap();
//! assert_eq!((center.lon, center.lat), (11.0, 51.0));
//! ```

mod decode;

use std::path::Path;

use thiserror::Error;

use crate::coord::GeoPoint;

/// KML 2.2 namespace.
pub const KML_22_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Legacy Google Earth KML 2.0 namespace.
pub const KML_20_NAMESPACE: &str = "http://earth.google.com/kml/2.0";

const COORDINATES_TAG: &str = "coordinates";

/// Errors raised while reading an area document.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The KMZ archive could not be read.
    #[error("Invalid KMZ archive: {0}")]
    Archive(String),

    /// The KMZ archive holds no `.kml` entry.
    #[error("KMZ archive contains no .kml file")]
    NoKmlEntry,

    /// The document is not well-formed XML.
    #[error("Malformed KML: {0}")]
    Xml(String),

    /// No `coordinates` element was found.
    #[error("No coordinates element found in KML")]
    NoCoordinates,

    /// The coordinates element held no usable `lon,lat` pair.
    #[error("Coordinate list is empty")]
    EmptyCoordinates,

    /// The document could not be read from disk.
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// An ordered ring of (longitude, latitude) vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<GeoPoint>,
}

impl Polygon {
    /// Creates a polygon from its vertices.
    pub fn new(vertices: Vec<GeoPoint>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Arithmetic mean of the vertex longitudes and latitudes.
    ///
    /// This is neither area-weighted nor geodesic. A closed ring that
    /// repeats its first vertex counts that vertex twice.
    pub fn centroid(&self) -> Result<GeoPoint, FormatError> {
        if self.vertices.is_empty() {
            return Err(FormatError::EmptyCoordinates);
        }

        let n = self.vertices.len() as f64;
        let (lon_sum, lat_sum) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(lon, lat), p| (lon + p.lon, lat + p.lat));

        Ok(GeoPoint::new(lon_sum / n, lat_sum / n))
    }
}

/// Parses a KML document, or a KMZ archive holding one, into a polygon.
///
/// Tokens in the coordinate list that are not `lon,lat[,alt]` are skipped.
///
/// # Errors
///
/// Returns `FormatError` if the archive has no `.kml` entry, the XML is
/// malformed, no `coordinates` element exists, or no token parses.
pub fn extract_area(bytes: &[u8]) -> Result<Polygon, FormatError> {
    let kml = decode::unwrap_container(bytes)?;
    let text = decode::decode_text(&kml);
    let text = decode::clean_text(&text);

    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| FormatError::Xml(e.to_string()))?;

    let coordinates = [Some(KML_22_NAMESPACE), Some(KML_20_NAMESPACE), None]
        .into_iter()
        .find_map(|ns| find_coordinates(&doc, ns))
        .ok_or(FormatError::NoCoordinates)?;

    let vertices = parse_coordinates(&coordinates);
    if vertices.is_empty() {
        return Err(FormatError::EmptyCoordinates);
    }

    tracing::debug!(vertices = vertices.len(), "Parsed KML polygon");
    Ok(Polygon::new(vertices))
}

/// Parses a document and returns its centroid.
pub fn extract_center(bytes: &[u8]) -> Result<GeoPoint, FormatError> {
    extract_area(bytes)?.centroid()
}

/// Reads and parses a KML or KMZ file.
pub fn extract_area_from_path(path: &Path) -> Result<Polygon, FormatError> {
    let bytes = std::fs::read(path).map_err(|e| FormatError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    extract_area(&bytes)
}

fn find_coordinates(doc: &roxmltree::Document<'_>, namespace: Option<&str>) -> Option<String> {
    let node = doc.descendants().find(|n| {
        n.is_element()
            && n.tag_name().name() == COORDINATES_TAG
            && n.tag_name().namespace() == namespace
    })?;

    Some(
        node.descendants()
            .filter(|d| d.is_text())
            .filter_map(|d| d.text())
            .collect(),
    )
}

/// Parses whitespace-separated `lon,lat[,alt]` tokens, skipping bad ones.
fn parse_coordinates(text: &str) -> Vec<GeoPoint> {
    text.split_whitespace()
        .filter_map(|token| {
            let mut parts = token.split(',');
            let lon = parts.next()?.trim().parse::<f64>().ok()?;
            let lat = parts.next()?.trim().parse::<f64>().ok()?;
            Some(GeoPoint::new(lon, lat))
        })
        .collect()
}
