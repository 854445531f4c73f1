mod explanation_error;
mod feasibility;

pub use explanation_error::ExplanationError;
pub use feasibility::Feasibility;
