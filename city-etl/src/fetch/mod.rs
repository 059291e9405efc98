//! Extraction des données sources (HTTP, API data.taipei, GeoJSON, KML,
//! XML, shapefiles zippés)

pub mod data_taipei;
pub mod geojson;
pub mod http;
pub mod kml;
pub mod permit_xml;
pub mod record;
pub mod shp;

#[cfg(test)]
pub(crate) mod test_server;

pub use data_taipei::{DataTaipei, Record};
pub use geojson::{parse_feature_collection, read_feature_collection};
pub use http::HttpFetcher;
pub use kml::{parse_kml, read_kml};
pub use permit_xml::{parse_permits, read_permits};
pub use record::{json_value, text_of};
pub use shp::{find_shp, read_shapefile, unzip_to};
