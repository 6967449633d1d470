pub mod app_id;
pub mod certificate;
pub mod cleanup;
pub mod update;
