mod decl;
mod model;
mod value;

pub use decl::*;
pub use model::RecordModel;
pub use value::FieldValue;
