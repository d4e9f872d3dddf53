pub mod api;
pub mod diskpart;
pub mod errors;
pub mod fixtures;
pub mod links;
pub mod timestomp;
pub mod version;
pub mod workspace;
