pub mod dispatch;
pub mod dump;
pub mod http;
pub mod upload;
