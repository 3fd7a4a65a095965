mod gemini;
mod mongo;
mod postgres;

pub use gemini::{GeminiGenerator, GeminiSettings};
pub use mongo::MongoDriver;
pub use postgres::PostgresDriver;
