//! METS/MODS handling: parsing, read-only projections, enrichment.

pub mod enrich;
pub mod store;
pub mod xml;

pub use enrich::Enricher;
pub use store::{DescriptiveData, MetadataStore, NOT_AVAILABLE};
pub use xml::{XmlElement, XmlNode, XmlTree};
