pub mod commit;
pub mod parse;
pub mod plan;
pub mod sources;
pub mod status;
