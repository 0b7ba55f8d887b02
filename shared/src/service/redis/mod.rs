pub mod core;

pub use self::core::redis_get_key::KeyType;
