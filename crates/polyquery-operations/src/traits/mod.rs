mod generator;

pub use generator::QueryGenerator;
pub use polyquery_strategy::{DocumentDriver, RelationalDriver};
