pub mod filename;
pub mod release_name;
pub mod size;

pub use filename::parse_filename;
pub use release_name::ReleaseName;
pub use size::{UnitBase, format_duration, format_size, parse_size_text};
