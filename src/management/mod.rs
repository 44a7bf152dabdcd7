mod export;
mod token;

pub use export::{ExportSummary, PlaylistExporter, render};
pub use token::TokenManager;
