pub mod status;
pub mod track;
