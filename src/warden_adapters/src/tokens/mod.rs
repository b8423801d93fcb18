pub mod jwt_token_writer;

pub use jwt_token_writer::{Claims, JwtTokenWriter};
