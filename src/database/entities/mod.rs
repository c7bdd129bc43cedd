pub mod aois;
pub mod canopy_statuses;
pub mod countries;
pub mod crown_diameters;
pub mod geographical_zones;
pub mod ggz;
pub mod groups;
pub mod metadata;
pub mod photos;
pub mod survey_data;
pub mod tree_species;
pub mod user_groups;
pub mod user_sessions;
pub mod users;
