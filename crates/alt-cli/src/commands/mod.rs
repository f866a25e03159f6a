//! CLI command implementations

pub mod inspect;
pub mod quantize;
pub mod show;
pub mod validate;

pub use inspect::InspectCommand;
pub use quantize::{QuantReport, QuantizeCommand};
pub use show::ShowCommand;
pub use validate::ValidateCommand;
