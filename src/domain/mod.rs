pub mod entity;
pub mod field;
pub mod geom;
