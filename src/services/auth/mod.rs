pub mod factory;
pub mod jwt;

pub use factory::build_token_authority;
pub use jwt::JwtTokenAuthority;
