pub mod app_ids;
pub mod certificates;
